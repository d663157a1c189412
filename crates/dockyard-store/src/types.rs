//! Records stored in the database.

use dockyard_core::{EngineId, EngineSpec};
use serde::{Deserialize, Serialize};

/// A persisted engine definition.
///
/// The certificate fields are opaque PEM blobs. Secure transport is only
/// configured when all three are present and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine identity, address and capacity.
    pub engine: EngineSpec,
    /// CA certificate used to verify the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<Vec<u8>>,
    /// Client certificate presented to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<Vec<u8>>,
    /// Private key for the client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<Vec<u8>>,
}

/// Certificate material available for an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateMaterial<'a> {
    /// No certificate field is set.
    Absent,
    /// Some, but not all, certificate fields are set.
    Incomplete,
    /// All three fields are set.
    Complete {
        /// CA certificate PEM.
        ca: &'a [u8],
        /// Client certificate PEM.
        certificate: &'a [u8],
        /// Client key PEM.
        key: &'a [u8],
    },
}

impl EngineConfig {
    /// Create a config for an engine reached over plain transport.
    #[must_use]
    pub fn new(engine: EngineSpec) -> Self {
        Self {
            engine,
            ca_certificate: None,
            client_certificate: None,
            client_key: None,
        }
    }

    /// Attach certificate material.
    #[must_use]
    pub fn with_certificates(
        mut self,
        ca_certificate: Vec<u8>,
        client_certificate: Vec<u8>,
        client_key: Vec<u8>,
    ) -> Self {
        self.ca_certificate = Some(ca_certificate);
        self.client_certificate = Some(client_certificate);
        self.client_key = Some(client_key);
        self
    }

    /// The engine ID.
    #[must_use]
    pub const fn id(&self) -> &EngineId {
        &self.engine.id
    }

    /// Classify the certificate material of this engine.
    ///
    /// Empty blobs count as absent.
    #[must_use]
    pub fn certificates(&self) -> CertificateMaterial<'_> {
        match (
            present(&self.ca_certificate),
            present(&self.client_certificate),
            present(&self.client_key),
        ) {
            (None, None, None) => CertificateMaterial::Absent,
            (Some(ca), Some(certificate), Some(key)) => CertificateMaterial::Complete {
                ca,
                certificate,
                key,
            },
            _ => CertificateMaterial::Incomplete,
        }
    }
}

fn present(field: &Option<Vec<u8>>) -> Option<&[u8]> {
    field.as_deref().filter(|bytes| !bytes.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::new(EngineSpec::new(
            EngineId::new("e1").unwrap(),
            "tcp://127.0.0.1:2376",
        ))
    }

    #[test]
    fn no_certificates_is_absent() {
        assert_eq!(config().certificates(), CertificateMaterial::Absent);
    }

    #[test]
    fn all_certificates_is_complete() {
        let cfg = config().with_certificates(b"ca".to_vec(), b"cert".to_vec(), b"key".to_vec());
        assert_eq!(
            cfg.certificates(),
            CertificateMaterial::Complete {
                ca: b"ca",
                certificate: b"cert",
                key: b"key",
            }
        );
    }

    #[test]
    fn missing_key_is_incomplete() {
        let mut cfg = config();
        cfg.ca_certificate = Some(b"ca".to_vec());
        cfg.client_certificate = Some(b"cert".to_vec());
        assert_eq!(cfg.certificates(), CertificateMaterial::Incomplete);
    }

    #[test]
    fn empty_blob_counts_as_absent() {
        let cfg = config().with_certificates(b"ca".to_vec(), b"cert".to_vec(), Vec::new());
        assert_eq!(cfg.certificates(), CertificateMaterial::Incomplete);

        let cfg = config().with_certificates(Vec::new(), Vec::new(), Vec::new());
        assert_eq!(cfg.certificates(), CertificateMaterial::Absent);
    }
}
