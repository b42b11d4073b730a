//! Proof system operations
//!
//! Key generation, proving and verification over KZG commitments on BN254
//! with SHPLONK openings and a Blake2b transcript. The rest of the crate
//! only goes through these three functions.

use halo2_base::{
    gates::circuit::builder::BaseCircuitBuilder,
    halo2_proofs::{
        halo2curves::bn256::{Bn256, Fr, G1Affine},
        plonk::{create_proof, keygen_pk, keygen_vk, verify_proof, ProvingKey, VerifyingKey},
        poly::{
            commitment::ParamsProver,
            kzg::{
                commitment::{KZGCommitmentScheme, ParamsKZG},
                multiopen::{ProverSHPLONK, VerifierSHPLONK},
                strategy::SingleStrategy,
            },
        },
        transcript::{
            Blake2bRead, Blake2bWrite, Challenge255, TranscriptReadBuffer, TranscriptWriterBuffer,
        },
    },
};
use rand::rngs::OsRng;

use claim_core::{ClaimError, Result};

/// Generate the proving key (and with it the verifying key) for a circuit
/// laid out in keygen stage
pub fn keygen(
    params: &ParamsKZG<Bn256>,
    builder: &BaseCircuitBuilder<Fr>,
) -> Result<ProvingKey<G1Affine>> {
    let vk = keygen_vk(params, builder)
        .map_err(|e| ClaimError::Backend(format!("verifying key generation failed: {e:?}")))?;
    keygen_pk(params, vk, builder)
        .map_err(|e| ClaimError::Backend(format!("proving key generation failed: {e:?}")))
}

/// Create a proof for a circuit in prover stage with one instance column
///
/// Halo2 does not check the witness here: an unsatisfied circuit still yields
/// bytes, which then fail [`verify`].
pub fn prove(
    params: &ParamsKZG<Bn256>,
    pk: &ProvingKey<G1Affine>,
    builder: BaseCircuitBuilder<Fr>,
    instances: &[Fr],
) -> Result<Vec<u8>> {
    let mut transcript = Blake2bWrite::<_, G1Affine, Challenge255<_>>::init(vec![]);
    create_proof::<
        KZGCommitmentScheme<Bn256>,
        ProverSHPLONK<'_, Bn256>,
        Challenge255<G1Affine>,
        _,
        Blake2bWrite<Vec<u8>, G1Affine, Challenge255<G1Affine>>,
        _,
    >(params, pk, &[builder], &[&[instances]], OsRng, &mut transcript)
    .map_err(|e| ClaimError::Backend(format!("proof generation failed: {e:?}")))?;
    Ok(transcript.finalize())
}

/// Check a proof against the verifying key and instance column
pub fn verify(
    params: &ParamsKZG<Bn256>,
    vk: &VerifyingKey<G1Affine>,
    proof: &[u8],
    instances: &[Fr],
) -> Result<()> {
    let verifier_params = params.verifier_params();
    let strategy = SingleStrategy::new(params);
    let mut transcript = Blake2bRead::<_, G1Affine, Challenge255<_>>::init(proof);
    verify_proof::<
        KZGCommitmentScheme<Bn256>,
        VerifierSHPLONK<'_, Bn256>,
        Challenge255<G1Affine>,
        Blake2bRead<&[u8], G1Affine, Challenge255<G1Affine>>,
        SingleStrategy<'_, Bn256>,
    >(verifier_params, vk, strategy, &[&[instances]], &mut transcript)
    .map_err(|e| ClaimError::VerificationMismatch(format!("proof rejected: {e:?}")))
}

/// Instance cells for public input bytes, one byte per cell
pub fn byte_instances(bytes: &[u8]) -> Vec<Fr> {
    bytes.iter().map(|b| Fr::from(*b as u64)).collect()
}


#[cfg(test)]
mod tests {
    use super::test_circuit::*;
    use super::*;
    use crate::srs::Srs;

    #[test]
    fn test_prove_and_verify() {
        let srs = Srs::insecure_test(K);
        let (builder, circuit_params) = keygen_builder();
        let pk = keygen(srs.params(), &builder).unwrap();
        let break_points = builder.break_points();

        let prover = prover_builder(circuit_params, break_points, 6, 7);
        let proof = prove(srs.params(), &pk, prover, &[Fr::from(42)]).unwrap();

        verify(srs.params(), pk.get_vk(), &proof, &[Fr::from(42)]).unwrap();
        assert!(matches!(
            verify(srs.params(), pk.get_vk(), &proof, &[Fr::from(43)]),
            Err(ClaimError::VerificationMismatch(_))
        ));
    }

    #[test]
    fn test_rejects_tampered_proof() {
        let srs = Srs::insecure_test(K);
        let (builder, circuit_params) = keygen_builder();
        let pk = keygen(srs.params(), &builder).unwrap();
        let break_points = builder.break_points();

        let prover = prover_builder(circuit_params, break_points, 2, 9);
        let mut proof = prove(srs.params(), &pk, prover, &[Fr::from(18)]).unwrap();
        let mid = proof.len() / 2;
        proof[mid] ^= 0x01;
        assert!(verify(srs.params(), pk.get_vk(), &proof, &[Fr::from(18)]).is_err());
    }

    #[test]
    fn test_byte_instances() {
        assert_eq!(byte_instances(&[0, 255]), vec![Fr::from(0), Fr::from(255)]);
    }
}
