// signing.rs — Policy bundle hashing and Ed25519 signature verification.
//
// A bundle is a small JSON manifest pinning a policy file by SHA-256 and
// optionally carrying a detached Ed25519 signature over the raw policy
// bytes. Hash verification needs no keys; signature verification takes a
// PEM-encoded public key (SubjectPublicKeyInfo, the format openssl emits).

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ring::signature::{UnparsedPublicKey, ED25519};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SigningError;

/// DER prefix of an Ed25519 SubjectPublicKeyInfo document. The raw
/// 32-byte key follows immediately after.
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Detached signature section of a bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleSignature {
    pub algorithm: String,
    pub sig_b64: String,
}

/// Signed, hashed manifest of a policy file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBundle {
    pub version: u32,
    pub policy_file: String,
    pub policy_sha256: String,
    #[serde(default)]
    pub signature: BundleSignature,
}

/// Build a bundle document for a policy file.
pub fn build_policy_bundle(
    policy_path: impl AsRef<Path>,
    signature_b64: &str,
) -> Result<PolicyBundle, SigningError> {
    let policy_path = policy_path.as_ref();
    let content = read(policy_path)?;
    Ok(PolicyBundle {
        version: 1,
        policy_file: policy_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        policy_sha256: format!("{:x}", Sha256::digest(&content)),
        signature: BundleSignature {
            algorithm: "ed25519".to_string(),
            sig_b64: signature_b64.to_string(),
        },
    })
}

/// Build a bundle and write it as pretty-printed JSON.
pub fn write_bundle(
    policy_path: impl AsRef<Path>,
    out_path: impl AsRef<Path>,
    signature_b64: &str,
) -> Result<PathBuf, SigningError> {
    let bundle = build_policy_bundle(policy_path, signature_b64)?;
    let out = out_path.as_ref().to_path_buf();
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SigningError::WriteFailed {
            path: out.clone(),
            source,
        })?;
    }
    let text = serde_json::to_string_pretty(&bundle)?;
    std::fs::write(&out, text).map_err(|source| SigningError::WriteFailed {
        path: out.clone(),
        source,
    })?;
    Ok(out)
}

/// Recompute the policy file's SHA-256 and compare against the bundle.
pub fn verify_bundle_hash(
    policy_path: impl AsRef<Path>,
    bundle_path: impl AsRef<Path>,
) -> Result<bool, SigningError> {
    let policy_bytes = read(policy_path.as_ref())?;
    let bundle = load_bundle(bundle_path.as_ref())?;
    Ok(format!("{:x}", Sha256::digest(&policy_bytes)) == bundle.policy_sha256)
}

/// Verify the bundle's detached Ed25519 signature over the policy bytes.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify.
/// A missing signature or a key that is not Ed25519 is a [`SigningError`].
pub fn verify_bundle_signature(
    policy_path: impl AsRef<Path>,
    bundle_path: impl AsRef<Path>,
    public_key_pem: impl AsRef<Path>,
) -> Result<bool, SigningError> {
    let bundle = load_bundle(bundle_path.as_ref())?;
    if bundle.signature.sig_b64.is_empty() {
        return Err(SigningError::MissingSignature);
    }
    let signature = BASE64
        .decode(bundle.signature.sig_b64.as_bytes())
        .map_err(|_| SigningError::BadSignatureEncoding)?;

    let key = load_ed25519_public_key(public_key_pem.as_ref())?;
    let policy_bytes = read(policy_path.as_ref())?;
    Ok(UnparsedPublicKey::new(&ED25519, &key)
        .verify(&policy_bytes, &signature)
        .is_ok())
}

fn load_bundle(path: &Path) -> Result<PolicyBundle, SigningError> {
    let text = read(path)?;
    Ok(serde_json::from_slice(&text)?)
}

/// Extract the raw 32-byte key from a PEM "PUBLIC KEY" block.
fn load_ed25519_public_key(path: &Path) -> Result<Vec<u8>, SigningError> {
    let pem = String::from_utf8_lossy(&read(path)?).into_owned();
    let body = pem
        .split("-----BEGIN PUBLIC KEY-----")
        .nth(1)
        .and_then(|rest| rest.split("-----END PUBLIC KEY-----").next())
        .ok_or_else(|| SigningError::NotEd25519("no PEM PUBLIC KEY block".to_string()))?;
    let der: String = body.split_whitespace().collect();
    let der = BASE64
        .decode(der.as_bytes())
        .map_err(|_| SigningError::NotEd25519("PEM body is not valid base64".to_string()))?;

    if der.len() != ED25519_SPKI_PREFIX.len() + 32 || der[..12] != ED25519_SPKI_PREFIX {
        return Err(SigningError::NotEd25519(
            "key is not an ed25519 SubjectPublicKeyInfo".to_string(),
        ));
    }
    Ok(der[12..].to_vec())
}

fn read(path: &Path) -> Result<Vec<u8>, SigningError> {
    std::fs::read(path).map_err(|source| SigningError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::rand::SystemRandom;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn pem_for(key: &Ed25519KeyPair, dir: &Path) -> PathBuf {
        let mut spki = ED25519_SPKI_PREFIX.to_vec();
        spki.extend_from_slice(key.public_key().as_ref());
        let pem = format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
            BASE64.encode(spki)
        );
        write_file(dir, "pub.pem", pem.as_bytes())
    }

    #[test]
    fn hash_round_trip_and_tamper_detection() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write_file(dir.path(), "policy.yaml", b"policy_id: signed\n");
        let bundle = dir.path().join("bundle.json");
        write_bundle(&policy, &bundle, "").unwrap();

        assert!(verify_bundle_hash(&policy, &bundle).unwrap());

        // Any one-byte change to the policy must fail the hash check.
        std::fs::write(&policy, b"policy_id: Signed\n").unwrap();
        assert!(!verify_bundle_hash(&policy, &bundle).unwrap());
    }

    #[test]
    fn bundle_records_file_name_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write_file(dir.path(), "edge.yaml", b"policy_id: edge\n");
        let bundle = build_policy_bundle(&policy, "").unwrap();
        assert_eq!(bundle.version, 1);
        assert_eq!(bundle.policy_file, "edge.yaml");
        assert_eq!(bundle.signature.algorithm, "ed25519");
    }

    #[test]
    fn signature_verifies_with_matching_key() {
        let dir = tempfile::tempdir().unwrap();
        let content = b"policy_id: signed\ndefault_decision: deny\n";
        let policy = write_file(dir.path(), "policy.yaml", content);

        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let sig = BASE64.encode(key.sign(content));

        let bundle = dir.path().join("bundle.json");
        write_bundle(&policy, &bundle, &sig).unwrap();
        let pem = pem_for(&key, dir.path());

        assert!(verify_bundle_signature(&policy, &bundle, &pem).unwrap());
    }

    #[test]
    fn signature_over_different_bytes_fails() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write_file(dir.path(), "policy.yaml", b"policy_id: signed\n");

        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let sig = BASE64.encode(key.sign(b"something else entirely"));

        let bundle = dir.path().join("bundle.json");
        write_bundle(&policy, &bundle, &sig).unwrap();
        let pem = pem_for(&key, dir.path());

        // Well-formed but wrong signature: Ok(false), not an error.
        assert!(!verify_bundle_signature(&policy, &bundle, &pem).unwrap());
    }

    #[test]
    fn missing_signature_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write_file(dir.path(), "policy.yaml", b"policy_id: x\n");
        let bundle = dir.path().join("bundle.json");
        write_bundle(&policy, &bundle, "").unwrap();
        let pem = write_file(dir.path(), "pub.pem", b"irrelevant");

        let err = verify_bundle_signature(&policy, &bundle, &pem).unwrap_err();
        assert!(matches!(err, SigningError::MissingSignature));
    }

    #[test]
    fn non_ed25519_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write_file(dir.path(), "policy.yaml", b"policy_id: x\n");
        let bundle = dir.path().join("bundle.json");
        write_bundle(&policy, &bundle, &BASE64.encode([0u8; 64])).unwrap();

        // An RSA-sized SPKI body will not carry the Ed25519 prefix.
        let pem = format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
            BASE64.encode([0u8; 270])
        );
        let pem = write_file(dir.path(), "rsa.pem", pem.as_bytes());

        let err = verify_bundle_signature(&policy, &bundle, &pem).unwrap_err();
        assert!(matches!(err, SigningError::NotEd25519(_)));
    }
}
