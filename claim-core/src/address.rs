//! Bitcoin address decoding
//!
//! Turns an address string into the identifier a claim circuit proves
//! knowledge of. Checksums and network prefixes are validated by the
//! `bitcoin` crate; this module only classifies the output script and slices
//! out the hash, program or key.

use bitcoin::address::NetworkUnchecked;
use bitcoin::hashes::{hash160, Hash};
use bitcoin::secp256k1::PublicKey;
use bitcoin::{Address, Network, Script};

use crate::types::{AddressType, ClaimIdentifier};
use crate::{ClaimError, Result};

/// A decoded address: its script family and claim identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub address_type: AddressType,
    pub identifier: ClaimIdentifier,
}

/// Decode an address string for `network`
///
/// Besides regular base58 and bech32(m) addresses, a 66 character hex string
/// holding a compressed public key is accepted as a P2PK "address".
///
/// P2SH addresses fail with `UnsupportedScript` here because the wrapped
/// script is not visible; use [`parse_p2sh_address`] with the redeem script.
pub fn parse_address(address: &str, network: Network) -> Result<ParsedAddress> {
    if let Some(parsed) = parse_p2pk(address)? {
        return Ok(parsed);
    }

    let checked = decode_for_network(address, network)?;
    let address_type = classify(&checked);
    let script = checked.script_pubkey();
    let bytes = script.as_bytes();

    // Script layouts:
    //   P2PKH  OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
    //   P2WPKH OP_0 <20>
    //   P2WSH  OP_0 <32>
    //   P2TR   OP_1 <32>
    let identifier = match address_type {
        AddressType::P2pkh => &bytes[3..23],
        AddressType::P2wpkh => &bytes[2..22],
        AddressType::P2wsh | AddressType::P2tr => &bytes[2..34],
        AddressType::P2sh => {
            return Err(ClaimError::UnsupportedScript(
                "P2SH address wraps an unknown script; supply the redeem script".into(),
            ))
        }
        AddressType::P2pk | AddressType::Unknown => {
            return Err(ClaimError::UnsupportedAddress(format!(
                "{address} has no claimable script type"
            )))
        }
    };

    tracing::debug!("Parsed {:?} address {}", address_type, address);
    Ok(ParsedAddress {
        address_type,
        identifier: ClaimIdentifier::new(address_type.circuit_type()?, identifier)?,
    })
}

/// Decode a P2SH address whose redeem script is known
///
/// Only P2SH-wrapped P2WPKH resolves; the redeem script must be a version 0
/// key-hash program and must hash to the address' script hash.
pub fn parse_p2sh_address(
    address: &str,
    network: Network,
    redeem_script: &Script,
) -> Result<ParsedAddress> {
    let checked = decode_for_network(address, network)?;
    if classify(&checked) != AddressType::P2sh {
        return Err(ClaimError::InvalidAddress(format!("{address} is not a P2SH address")));
    }
    if !redeem_script.is_p2wpkh() {
        return Err(ClaimError::UnsupportedScript(
            "only P2SH-wrapped P2WPKH can be claimed".into(),
        ));
    }

    // OP_HASH160 <20> OP_EQUAL
    let script = checked.script_pubkey();
    let script_hash = &script.as_bytes()[2..22];
    let redeem_hash = hash160::Hash::hash(redeem_script.as_bytes()).to_byte_array();
    if redeem_hash.as_slice() != script_hash {
        return Err(ClaimError::InvalidAddress(
            "redeem script does not match the address script hash".into(),
        ));
    }

    Ok(ParsedAddress {
        address_type: AddressType::P2sh,
        identifier: ClaimIdentifier::new(AddressType::P2sh.circuit_type()?, script_hash)?,
    })
}

fn decode_for_network(address: &str, network: Network) -> Result<Address> {
    let unchecked: Address<NetworkUnchecked> = address
        .parse()
        .map_err(|e| ClaimError::InvalidAddress(format!("{address}: {e}")))?;
    unchecked
        .require_network(network)
        .map_err(|e| ClaimError::InvalidAddress(format!("{address}: {e}")))
}

fn classify(address: &Address) -> AddressType {
    match address.address_type() {
        Some(bitcoin::AddressType::P2pkh) => AddressType::P2pkh,
        Some(bitcoin::AddressType::P2sh) => AddressType::P2sh,
        Some(bitcoin::AddressType::P2wpkh) => AddressType::P2wpkh,
        Some(bitcoin::AddressType::P2wsh) => AddressType::P2wsh,
        Some(bitcoin::AddressType::P2tr) => AddressType::P2tr,
        _ => AddressType::Unknown,
    }
}

/// Hex compressed public key; `Ok(None)` when the string is not P2PK shaped
fn parse_p2pk(address: &str) -> Result<Option<ParsedAddress>> {
    let shaped = address.len() == 66
        && (address.starts_with("02") || address.starts_with("03"))
        && address.bytes().all(|b| b.is_ascii_hexdigit());
    if !shaped {
        return Ok(None);
    }

    let bytes = hex::decode(address).map_err(|e| ClaimError::InvalidAddress(e.to_string()))?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| ClaimError::InvalidAddress(format!("invalid public key: {e}")))?;

    Ok(Some(ParsedAddress {
        address_type: AddressType::P2pk,
        identifier: ClaimIdentifier::new(AddressType::P2pk.circuit_type()?, bytes)?,
    }))
}
