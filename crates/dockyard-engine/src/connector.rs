//! Building engine handles from stored engine specs.

use std::sync::Arc;
use std::time::Duration;

use dockyard_core::EngineSpec;

use crate::client::{Engine, Transport};
use crate::error::{EngineError, Result};
use crate::http::{base_url, HttpEngineClient};

/// Creates connected engine handles.
///
/// The manager goes through this trait so tests can substitute in-memory
/// engines for real ones.
pub trait Connector: Send + Sync {
    /// Build an engine handle for `spec`, over TLS when `tls` is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is unusable or the client cannot be
    /// configured.
    fn connect(
        &self,
        spec: &EngineSpec,
        tls: Option<Arc<rustls::ClientConfig>>,
    ) -> Result<Engine>;
}

/// Connector producing [`HttpEngineClient`]s.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
    connect_timeout: Duration,
}

impl HttpConnector {
    /// Create a connector whose clients time out after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Connector for HttpConnector {
    fn connect(
        &self,
        spec: &EngineSpec,
        tls: Option<Arc<rustls::ClientConfig>>,
    ) -> Result<Engine> {
        let transport = if tls.is_some() {
            Transport::Tls
        } else {
            Transport::Plain
        };
        let url = base_url(&spec.addr, transport)?;

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout);
        if let Some(config) = tls {
            builder = builder.use_preconfigured_tls((*config).clone());
        }
        let client = builder
            .build()
            .map_err(|e| EngineError::ClientBuild(e.to_string()))?;

        tracing::debug!(
            engine_id = %spec.id,
            url = %url,
            transport = ?transport,
            "Configured engine client"
        );

        Ok(Engine::new(
            spec.clone(),
            transport,
            Arc::new(HttpEngineClient::with_client(client, url)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockyard_core::EngineId;

    fn spec(addr: &str) -> EngineSpec {
        EngineSpec::new(EngineId::new("e1").unwrap(), addr)
    }

    #[test]
    fn plain_connection() {
        let engine = HttpConnector::default()
            .connect(&spec("tcp://127.0.0.1:2375"), None)
            .unwrap();

        assert_eq!(engine.transport(), Transport::Plain);
        assert_eq!(engine.id().as_str(), "e1");
    }

    #[test]
    fn unsupported_address_rejected() {
        let result = HttpConnector::default().connect(&spec("unix:///var/run/docker.sock"), None);

        assert!(matches!(result, Err(EngineError::UnsupportedAddress(_))));
    }
}
