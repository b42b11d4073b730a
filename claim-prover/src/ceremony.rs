//! Ceremony SRS
//!
//! Loads KZG parameters from a public powers-of-tau ceremony file in the
//! snarkjs `.ptau` format. The file is downloaded once, checked against a
//! pinned SHA-256 digest and cached together with two derived files:
//!
//! * `bn254_p<power>.ptau` - the ceremony file itself
//! * `bn254_p<power>_n<rows>.canonical` - the first `rows` tau·G1 points and
//!   the two G2 points
//! * `bn254_p<power>_n<rows>.lagrange` - Halo2 `ParamsKZG` in raw form,
//!   including the Lagrange basis
//!
//! Every file is written to a temporary path and renamed into place, and is
//! removed again on any failure.

use halo2_base::halo2_proofs::{
    arithmetic::g_to_lagrange,
    halo2curves::{
        bn256::{Bn256, Fq, G1Affine, G2Affine, G1},
        serde::SerdeObject,
    },
    poly::{commitment::Params, kzg::commitment::ParamsKZG},
    SerdeFormat,
};
use ff::{Field, PrimeField};
use group::prime::PrimeCurveAffine;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use claim_core::{ClaimError, Result};

use crate::srs::{Srs, SrsOrigin};

/// Download timeout used unless configured otherwise
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const PTAU_MAGIC: &[u8; 4] = b"ptau";
const SECTION_HEADER: u32 = 1;
const SECTION_TAU_G1: u32 = 2;
const SECTION_TAU_G2: u32 = 3;
const G1_BYTES: usize = 64;
const G2_BYTES: usize = 128;

fn base_field_modulus() -> BigUint {
    BigUint::from_bytes_le((-Fq::ONE).to_repr().as_ref()) + 1u32
}

fn integrity(msg: impl Into<String>) -> ClaimError {
    ClaimError::SetupIntegrityFailure(msg.into())
}

/// Where to get the ceremony file and how to recognize it
#[derive(Debug, Clone)]
pub struct CeremonyConfig {
    /// Download URL of the `.ptau` file
    pub url: String,
    /// Ceremony power; the file holds at least 2^power tau·G1 points
    pub power: u32,
    /// Pinned SHA-256 digest of the whole file
    pub expected_sha256: [u8; 32],
    /// Directory for the ceremony file and derived caches
    pub cache_dir: PathBuf,
    /// Upper bound for the download
    pub timeout: Duration,
}

impl CeremonyConfig {
    /// Create a configuration from a hex digest
    pub fn new(
        url: impl Into<String>,
        power: u32,
        expected_sha256_hex: &str,
        cache_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let digest = hex::decode(expected_sha256_hex)
            .map_err(|e| integrity(format!("bad ceremony digest: {e}")))?;
        let expected_sha256: [u8; 32] = digest
            .try_into()
            .map_err(|_| integrity("ceremony digest must be 32 bytes"))?;
        Ok(Self {
            url: url.into(),
            power,
            expected_sha256,
            cache_dir: cache_dir.into(),
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the cached ceremony file
    pub fn ceremony_path(&self) -> PathBuf {
        self.cache_dir.join(format!("bn254_p{}.ptau", self.power))
    }

    // Derived caches carry the pinned digest so a re-pinned ceremony never
    // reuses points taken from another file
    fn derived_stem(&self, rows: usize) -> String {
        format!(
            "bn254_p{}_{}_n{}",
            self.power,
            hex::encode(&self.expected_sha256[..8]),
            rows
        )
    }

    fn canonical_path(&self, rows: usize) -> PathBuf {
        self.cache_dir
            .join(format!("{}.canonical", self.derived_stem(rows)))
    }

    fn lagrange_path(&self, rows: usize) -> PathBuf {
        self.cache_dir
            .join(format!("{}.lagrange", self.derived_stem(rows)))
    }

    fn origin(&self) -> SrsOrigin {
        SrsOrigin::Ceremony {
            power: self.power,
            sha256: self.expected_sha256,
        }
    }
}

/// The ceremony points a KZG setup of `n` rows needs
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSrs {
    /// tau^i·G1 for i in 0..n
    pub g1: Vec<G1Affine>,
    /// G2 generator
    pub g2: G2Affine,
    /// tau·G2
    pub s_g2: G2Affine,
}

impl CanonicalSrs {
    pub fn rows(&self) -> usize {
        self.g1.len()
    }

    /// Write as `u32 LE n`, `n` raw G1 points and two raw G2 points
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&(self.g1.len() as u32).to_le_bytes())?;
        for point in &self.g1 {
            point.write_raw(writer)?;
        }
        self.g2.write_raw(writer)?;
        self.s_g2.write_raw(writer)
    }

    /// Read and validate a canonical file
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut len = [0u8; 4];
        reader.read_exact(&mut len)?;
        let n = u32::from_le_bytes(len) as usize;
        if !n.is_power_of_two() {
            return Err(integrity(format!("canonical SRS has {n} points")));
        }
        let g1 = (0..n)
            .map(|i| read_g1(reader, i))
            .collect::<Result<Vec<_>>>()?;
        let g2 = read_g2(reader, 0)?;
        let s_g2 = read_g2(reader, 1)?;
        let srs = Self { g1, g2, s_g2 };
        srs.check_generators()?;
        Ok(srs)
    }

    fn check_generators(&self) -> Result<()> {
        if self.g1.first() != Some(&G1Affine::generator()) {
            return Err(integrity("first tau·G1 point is not the G1 generator"));
        }
        if self.g2 != G2Affine::generator() {
            return Err(integrity("first tau·G2 point is not the G2 generator"));
        }
        Ok(())
    }

    /// Derive the Lagrange basis and write Halo2 raw parameters
    ///
    /// The output is exactly what `ParamsKZG::read_custom` expects for
    /// `SerdeFormat::RawBytes`.
    pub fn write_params<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let k = self.g1.len().trailing_zeros();
        let projective: Vec<G1> = self.g1.iter().map(|p| p.to_curve()).collect();
        let lagrange: Vec<G1Affine> = g_to_lagrange(projective, k);

        writer.write_all(&k.to_le_bytes())?;
        for point in self.g1.iter().chain(lagrange.iter()) {
            point.write_raw(writer)?;
        }
        self.g2.write_raw(writer)?;
        self.s_g2.write_raw(writer)
    }
}

fn read_g1<R: Read>(reader: &mut R, index: usize) -> Result<G1Affine> {
    let mut buf = [0u8; G1_BYTES];
    reader
        .read_exact(&mut buf)
        .map_err(|e| integrity(format!("tau·G1 point {index}: {e}")))?;
    let point = G1Affine::from_raw_bytes(&buf)
        .ok_or_else(|| integrity(format!("tau·G1 point {index} is not a canonical curve point")))?;
    if bool::from(point.is_identity()) {
        return Err(integrity(format!("tau·G1 point {index} is the identity")));
    }
    Ok(point)
}

fn read_g2<R: Read>(reader: &mut R, index: usize) -> Result<G2Affine> {
    let mut buf = [0u8; G2_BYTES];
    reader
        .read_exact(&mut buf)
        .map_err(|e| integrity(format!("tau·G2 point {index}: {e}")))?;
    let point = G2Affine::from_raw_bytes(&buf)
        .ok_or_else(|| integrity(format!("tau·G2 point {index} is not a canonical curve point")))?;
    if bool::from(point.is_identity()) {
        return Err(integrity(format!("tau·G2 point {index} is the identity")));
    }
    Ok(point)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| integrity(format!("truncated ceremony file: {e}")))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf)
        .map_err(|e| integrity(format!("truncated ceremony file: {e}")))?;
    Ok(u64::from_le_bytes(buf))
}

/// Parse the first `n` tau·G1 points and the two G2 points of a `.ptau` file
///
/// Layout: magic, version, section count, then sections of
/// `(u32 type, u64 size, body)`. Section 1 holds the field size, the base
/// field prime and the power; sections 2 and 3 hold tau·G1 and tau·G2
/// points in Montgomery little-endian form.
pub fn parse_ptau<R: Read + Seek>(reader: &mut R, n: usize) -> Result<CanonicalSrs> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| integrity(format!("truncated ceremony file: {e}")))?;
    if &magic != PTAU_MAGIC {
        return Err(integrity("not a ptau file"));
    }
    let version = read_u32(reader)?;
    let num_sections = read_u32(reader)?;
    tracing::debug!("ptau version {} with {} sections", version, num_sections);

    let mut sections: HashMap<u32, (u64, u64)> = HashMap::new();
    for _ in 0..num_sections {
        let kind = read_u32(reader)?;
        let size = read_u64(reader)?;
        let offset = reader.stream_position()?;
        sections.insert(kind, (offset, size));
        let skip = i64::try_from(size)
            .map_err(|_| integrity(format!("ptau section {kind} size {size} is out of range")))?;
        reader.seek(SeekFrom::Current(skip))?;
    }
    let section = |kind: u32| {
        sections
            .get(&kind)
            .copied()
            .ok_or_else(|| integrity(format!("ptau section {kind} missing")))
    };

    // Header
    let (offset, _) = section(SECTION_HEADER)?;
    reader.seek(SeekFrom::Start(offset))?;
    let n8 = read_u32(reader)? as usize;
    if n8 != 32 {
        return Err(integrity(format!("unexpected field size {n8}")));
    }
    let mut prime = [0u8; 32];
    reader
        .read_exact(&mut prime)
        .map_err(|e| integrity(format!("truncated ceremony header: {e}")))?;
    if BigUint::from_bytes_le(&prime) != base_field_modulus() {
        return Err(integrity("ceremony is not over the BN254 base field"));
    }
    let power = read_u32(reader)?;
    if power >= usize::BITS {
        return Err(integrity(format!("ceremony power {power} is out of range")));
    }
    if n > (1usize << power) {
        return Err(integrity(format!(
            "ceremony power {power} holds fewer than {n} points"
        )));
    }

    // tau·G1
    let (offset, size) = section(SECTION_TAU_G1)?;
    if (size as usize) < n * G1_BYTES {
        return Err(integrity(format!("tau·G1 section holds fewer than {n} points")));
    }
    reader.seek(SeekFrom::Start(offset))?;
    let g1 = (0..n)
        .map(|i| read_g1(reader, i))
        .collect::<Result<Vec<_>>>()?;

    // tau·G2
    let (offset, size) = section(SECTION_TAU_G2)?;
    if (size as usize) < 2 * G2_BYTES {
        return Err(integrity("tau·G2 section holds fewer than 2 points"));
    }
    reader.seek(SeekFrom::Start(offset))?;
    let g2 = read_g2(reader, 0)?;
    let s_g2 = read_g2(reader, 1)?;

    let srs = CanonicalSrs { g1, g2, s_g2 };
    srs.check_generators()?;
    Ok(srs)
}

/// SHA-256 of a file, streamed
fn sha256_file(path: &Path) -> Result<[u8; 32]> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().into())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Write `path` through a temporary file, removing it if `write` fails
fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<()> {
    let tmp = partial_path(path);
    let result = (|| -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        write(&mut writer)?;
        writer.flush()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}

/// Stream the ceremony file to disk, hashing as it arrives
fn download(config: &CeremonyConfig, dest: &Path) -> Result<()> {
    let tmp = partial_path(dest);
    tracing::info!("Downloading ceremony file from {}", config.url);

    let result = (|| -> Result<[u8; 32]> {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        let response = agent
            .get(&config.url)
            .call()
            .map_err(|e| integrity(format!("ceremony download failed: {e}")))?;
        let mut reader = response.into_reader();
        let mut writer = BufWriter::new(File::create(&tmp)?);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 1 << 20];
        let mut total = 0u64;
        loop {
            let read = reader
                .read(&mut buf)
                .map_err(|e| integrity(format!("ceremony download interrupted: {e}")))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
            writer.write_all(&buf[..read])?;
            total += read as u64;
        }
        writer.flush()?;
        tracing::debug!("Downloaded {} bytes", total);
        Ok(hasher.finalize().into())
    })();

    match result {
        Ok(digest) if digest == config.expected_sha256 => {
            fs::rename(&tmp, dest)?;
            Ok(())
        }
        Ok(digest) => {
            let _ = fs::remove_file(&tmp);
            Err(integrity(format!(
                "ceremony digest {} does not match pinned {}",
                hex::encode(digest),
                hex::encode(config.expected_sha256)
            )))
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Make sure a ceremony file with the pinned digest sits in the cache
///
/// A cached file with the wrong digest is deleted and downloaded again.
pub fn ensure_ceremony_file(config: &CeremonyConfig) -> Result<PathBuf> {
    let path = config.ceremony_path();
    if path.exists() {
        if sha256_file(&path)? == config.expected_sha256 {
            tracing::debug!("Using cached ceremony file {:?}", path);
            return Ok(path);
        }
        tracing::warn!("Cached ceremony file {:?} has the wrong digest, removing it", path);
        fs::remove_file(&path)?;
    }
    fs::create_dir_all(&config.cache_dir)?;
    download(config, &path)?;
    Ok(path)
}

fn load_canonical(config: &CeremonyConfig, rows: usize) -> Result<CanonicalSrs> {
    let path = config.canonical_path(rows);
    if path.exists() {
        let loaded = File::open(&path)
            .map_err(ClaimError::from)
            .and_then(|f| CanonicalSrs::read(&mut BufReader::new(f)));
        match loaded {
            Ok(srs) if srs.rows() == rows => return Ok(srs),
            Ok(srs) => tracing::warn!(
                "Canonical SRS {:?} has {} points, expected {}; rebuilding",
                path,
                srs.rows(),
                rows
            ),
            Err(e) => tracing::warn!("Failed to load canonical SRS {:?}: {}; rebuilding", path, e),
        }
        let _ = fs::remove_file(&path);
    }

    let ceremony = ensure_ceremony_file(config)?;
    let mut reader = BufReader::new(File::open(&ceremony)?);
    let srs = parse_ptau(&mut reader, rows)?;
    write_atomically(&path, |w| srs.write(w))?;
    Ok(srs)
}

fn read_params(path: &Path) -> Result<ParamsKZG<Bn256>> {
    let mut reader = BufReader::new(File::open(path)?);
    Ok(ParamsKZG::<Bn256>::read_custom(&mut reader, SerdeFormat::RawBytes)?)
}

/// Load KZG parameters for at least `min_rows` rows from the ceremony
///
/// Rows are rounded up to a power of two. Cached Lagrange parameters are
/// used when present and well formed; otherwise they are rebuilt from the
/// canonical points, which in turn come from the verified ceremony file.
pub fn load_ceremony_srs(config: &CeremonyConfig, min_rows: usize) -> Result<Srs> {
    let rows = min_rows.max(2).next_power_of_two();
    let k = rows.trailing_zeros();
    if k > config.power {
        return Err(integrity(format!(
            "{rows} rows need power {k}, ceremony has power {}",
            config.power
        )));
    }

    let lagrange = config.lagrange_path(rows);
    if lagrange.exists() {
        match read_params(&lagrange) {
            Ok(params) if params.k() == k => {
                tracing::info!("Loaded ceremony SRS for k={} from {:?}", k, lagrange);
                return Ok(Srs::from_params(params, config.origin()));
            }
            Ok(params) => tracing::warn!(
                "Cached SRS {:?} has k={}, expected {}; rebuilding",
                lagrange,
                params.k(),
                k
            ),
            Err(e) => tracing::warn!("Failed to load cached SRS {:?}: {}; rebuilding", lagrange, e),
        }
        let _ = fs::remove_file(&lagrange);
    }

    fs::create_dir_all(&config.cache_dir)?;
    let canonical = load_canonical(config, rows)?;
    tracing::info!("Deriving Lagrange basis for k={}", k);
    write_atomically(&lagrange, |w| canonical.write_params(w))?;

    let params = match read_params(&lagrange) {
        Ok(params) => params,
        Err(e) => {
            let _ = fs::remove_file(&lagrange);
            return Err(e);
        }
    };
    tracing::info!("Ceremony SRS ready: k={}, {}", k, config.origin());
    Ok(Srs::from_params(params, config.origin()))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::backend;
    use crate::backend::test_circuit;
    use halo2_base::halo2_proofs::halo2curves::bn256::Fr;
    use std::io::Cursor;

    fn parse(bytes: &[u8], n: usize) -> Result<CanonicalSrs> {
        parse_ptau(&mut Cursor::new(bytes), n)
    }

    fn config_for(dir: &Path, bytes: &[u8], url: &str) -> CeremonyConfig {
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        CeremonyConfig::new(url, 8, &hex::encode(digest), dir).unwrap()
    }

    #[test]
    fn test_parse_synthetic_ptau() {
        let bytes = synthetic_ptau(4, Fr::from(5));
        let srs = parse(&bytes, 8).unwrap();
        assert_eq!(srs.rows(), 8);
        assert_eq!(srs.g1[0], G1Affine::generator());
        assert_eq!(srs.g2, G2Affine::generator());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = synthetic_ptau(3, Fr::from(5));
        bytes[0] = b'x';
        assert!(matches!(parse(&bytes, 8), Err(ClaimError::SetupIntegrityFailure(_))));
    }

    #[test]
    fn test_rejects_wrong_prime() {
        let mut bytes = synthetic_ptau(3, Fr::from(5));
        // first byte of q in the header section
        bytes[12 + 12 + 4] ^= 0x01;
        let err = parse(&bytes, 8).unwrap_err();
        assert!(err.to_string().contains("BN254"));
    }

    #[test]
    fn test_rejects_insufficient_points() {
        let bytes = synthetic_ptau(3, Fr::from(5));
        assert!(matches!(parse(&bytes, 16), Err(ClaimError::SetupIntegrityFailure(_))));
    }

    #[test]
    fn test_rejects_off_curve_point() {
        let mut bytes = synthetic_ptau(3, Fr::from(5));
        let y_low = g1_offset(3) + 32;
        bytes[y_low] ^= 0x01;
        let err = parse(&bytes, 8).unwrap_err();
        assert!(err.to_string().contains("point 3"));
    }

    #[test]
    fn test_rejects_identity_point() {
        let mut bytes = synthetic_ptau(3, Fr::from(5));
        let start = g1_offset(2);
        bytes[start..start + G1_BYTES].fill(0);
        assert!(matches!(parse(&bytes, 8), Err(ClaimError::SetupIntegrityFailure(_))));
    }

    #[test]
    fn test_rejects_non_generator_start() {
        let mut bytes = synthetic_ptau(3, Fr::from(5));
        let (a, b) = (g1_offset(0), g1_offset(1));
        let first: Vec<u8> = bytes[a..a + G1_BYTES].to_vec();
        let second: Vec<u8> = bytes[b..b + G1_BYTES].to_vec();
        bytes[a..a + G1_BYTES].copy_from_slice(&second);
        bytes[b..b + G1_BYTES].copy_from_slice(&first);
        let err = parse(&bytes, 8).unwrap_err();
        assert!(err.to_string().contains("generator"));
    }

    #[test]
    fn test_canonical_round_trip() {
        let srs = parse(&synthetic_ptau(3, Fr::from(7)), 8).unwrap();
        let mut buf = Vec::new();
        srs.write(&mut buf).unwrap();
        assert_eq!(CanonicalSrs::read(&mut buf.as_slice()).unwrap(), srs);
    }

    #[test]
    fn test_ceremony_srs_proves_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = synthetic_ptau(8, Fr::from(0x1234_5678u64));
        let config = config_for(dir.path(), &bytes, "http://127.0.0.1:9/unused.ptau");
        fs::write(config.ceremony_path(), &bytes).unwrap();

        let srs = load_ceremony_srs(&config, 1 << test_circuit::K).unwrap();
        assert_eq!(srs.k(), test_circuit::K);
        assert!(!srs.origin().is_insecure());
        assert!(config.canonical_path(256).exists());
        assert!(config.lagrange_path(256).exists());
        assert!(config
            .lagrange_path(256)
            .to_string_lossy()
            .contains(&hex::encode(&config.expected_sha256[..8])));

        let (builder, circuit_params) = test_circuit::keygen_builder();
        let pk = backend::keygen(srs.params(), &builder).unwrap();
        let prover = test_circuit::prover_builder(circuit_params, builder.break_points(), 4, 5);
        let proof = backend::prove(srs.params(), &pk, prover, &[Fr::from(20)]).unwrap();
        backend::verify(srs.params(), pk.get_vk(), &proof, &[Fr::from(20)]).unwrap();

        // second load comes from the Lagrange cache, even without the ceremony file
        fs::remove_file(config.ceremony_path()).unwrap();
        let cached = load_ceremony_srs(&config, 200).unwrap();
        assert_eq!(cached.fingerprint(), srs.fingerprint());
    }

    #[test]
    fn test_repinned_ceremony_does_not_reuse_derived_caches() {
        let dir = tempfile::tempdir().unwrap();
        let first = synthetic_ptau(8, Fr::from(5));
        let config = config_for(dir.path(), &first, "http://127.0.0.1:9/unused.ptau");
        fs::write(config.ceremony_path(), &first).unwrap();
        let old = load_ceremony_srs(&config, 256).unwrap();

        // same power, same directory, different file
        let second = synthetic_ptau(8, Fr::from(7));
        let repinned = config_for(dir.path(), &second, "http://127.0.0.1:9/unused.ptau");
        fs::write(repinned.ceremony_path(), &second).unwrap();
        let loaded = load_ceremony_srs(&repinned, 256).unwrap();

        let fresh_dir = tempfile::tempdir().unwrap();
        let fresh_config = config_for(fresh_dir.path(), &second, "http://127.0.0.1:9/unused.ptau");
        fs::write(fresh_config.ceremony_path(), &second).unwrap();
        let fresh = load_ceremony_srs(&fresh_config, 256).unwrap();

        assert_eq!(loaded.params().get_g()[1], fresh.params().get_g()[1]);
        assert_ne!(loaded.params().get_g()[1], old.params().get_g()[1]);
        assert_eq!(loaded.fingerprint(), fresh.fingerprint());
    }

    #[test]
    fn test_rejects_oversized_power() {
        let mut bytes = synthetic_ptau(3, Fr::from(5));
        // power follows n8 and q in the header section
        let power_at = 12 + 12 + 4 + 32;
        bytes[power_at..power_at + 4].copy_from_slice(&200u32.to_le_bytes());
        let err = parse(&bytes, 8).unwrap_err();
        assert!(matches!(err, ClaimError::SetupIntegrityFailure(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_rejects_oversized_section() {
        let mut bytes = synthetic_ptau(3, Fr::from(5));
        // size field of the first section
        bytes[16..24].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(parse(&bytes, 8), Err(ClaimError::SetupIntegrityFailure(_))));
    }

    #[test]
    fn test_cached_ceremony_with_wrong_digest_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = synthetic_ptau(3, Fr::from(5));
        let config = config_for(dir.path(), b"something else", "http://127.0.0.1:9/unused.ptau")
            .with_timeout(Duration::from_secs(2));
        fs::write(config.ceremony_path(), &bytes).unwrap();

        // nothing listens on port 9, so the re-download fails too
        assert!(ensure_ceremony_file(&config).is_err());
        assert!(!config.ceremony_path().exists());
        assert!(!partial_path(&config.ceremony_path()).exists());
    }

    #[test]
    fn test_rejects_power_too_small() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), b"unused", "http://127.0.0.1:9/unused.ptau");
        assert!(matches!(
            load_ceremony_srs(&config, 1 << 9),
            Err(ClaimError::SetupIntegrityFailure(_))
        ));
    }

    #[test]
    fn test_config_rejects_bad_digest() {
        assert!(CeremonyConfig::new("http://x", 20, "abcd", "/tmp").is_err());
        assert!(CeremonyConfig::new("http://x", 20, "zz", "/tmp").is_err());
    }
}
