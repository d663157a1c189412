//! Mutual-TLS client configuration for engines.
//!
//! Engines that carry a CA certificate, a client certificate and a client key
//! are reached over TLS. The material is PEM as stored in the engine config.

use std::io::BufReader;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use thiserror::Error;

/// Errors that can occur while building a TLS configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The PEM data could not be read.
    #[error("invalid PEM data: {0}")]
    Pem(#[from] std::io::Error),

    /// The CA bundle contains no certificate.
    #[error("no CA certificate found")]
    NoCaCertificate,

    /// The client certificate chain is empty.
    #[error("no client certificate found")]
    NoClientCertificate,

    /// The client key PEM contains no private key.
    #[error("no private key found")]
    NoPrivateKey,

    /// rustls rejected the material.
    #[error("TLS configuration error: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Build a client configuration that verifies the engine against `ca_pem` and
/// authenticates with `cert_pem`/`key_pem`.
///
/// # Errors
///
/// Returns an error if any PEM blob is malformed or empty, or if the
/// certificate and key do not form a usable client identity.
pub fn client_config(
    ca_pem: &[u8],
    cert_pem: &[u8],
    key_pem: &[u8],
) -> Result<ClientConfig, TlsError> {
    let mut roots = RootCertStore::empty();
    let ca_certs = read_certs(ca_pem)?;
    if ca_certs.is_empty() {
        return Err(TlsError::NoCaCertificate);
    }
    for cert in ca_certs {
        roots.add(cert)?;
    }

    let chain = read_certs(cert_pem)?;
    if chain.is_empty() {
        return Err(TlsError::NoClientCertificate);
    }

    let key = read_key(key_pem)?;

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_client_auth_cert(chain, key)?;

    Ok(config)
}

fn read_certs(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = BufReader::new(pem);
    Ok(rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?)
}

fn read_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = BufReader::new(pem);
    rustls_pemfile::private_key(&mut reader)?.ok_or(TlsError::NoPrivateKey)
}
