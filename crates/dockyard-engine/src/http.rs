//! HTTP client for the Docker Engine API.
//!
//! This module provides the `HttpEngineClient`, which places containers on a
//! single engine. Placement metadata (reserved CPU, memory and workload type)
//! travels as container labels so that it can be recovered when listing.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use dockyard_core::{ContainerId, ContainerState, ImageSpec, WorkloadType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ContainerSummary, EngineClient, EngineInfo, Transport};
use crate::error::{EngineError, Result};

/// Label carrying the reserved CPU share of a container.
pub const CPUS_LABEL: &str = "dockyard.cpus";
/// Label carrying the reserved memory (MB) of a container.
pub const MEMORY_LABEL: &str = "dockyard.memory";
/// Label carrying the workload type of a container.
pub const TYPE_LABEL: &str = "dockyard.type";

const CPU_SHARES_PER_CPU: f64 = 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Map an engine address to the base URL of its API.
///
/// `tcp://` addresses take the scheme of the transport. Explicit `http://` and
/// `https://` addresses are used as given.
///
/// # Errors
///
/// Returns `EngineError::UnsupportedAddress` for any other scheme.
pub fn base_url(addr: &str, transport: Transport) -> Result<String> {
    let addr = addr.trim_end_matches('/');
    if let Some(rest) = addr.strip_prefix("tcp://") {
        let scheme = match transport {
            Transport::Plain => "http",
            Transport::Tls => "https",
        };
        return Ok(format!("{scheme}://{rest}"));
    }
    if addr.starts_with("http://") || addr.starts_with("https://") {
        return Ok(addr.to_string());
    }
    Err(EngineError::UnsupportedAddress(addr.to_string()))
}

/// HTTP client for one engine.
#[derive(Debug, Clone)]
pub struct HttpEngineClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEngineClient {
    /// Create a client from a configured reqwest client and a base URL.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Get the base URL of the engine API.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        Err(EngineError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Error body returned by the engine API.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateContainerRequest<'a> {
    image: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    hostname: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    domainname: &'a str,
    env: Vec<String>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    cmd: &'a [String],
    labels: BTreeMap<&'static str, String>,
    exposed_ports: BTreeMap<String, Empty>,
    host_config: HostConfig,
}

#[derive(Debug, Serialize)]
struct Empty {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct HostConfig {
    cpu_shares: i64,
    memory: i64,
    port_bindings: BTreeMap<String, Vec<HostPort>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct HostPort {
    host_port: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateContainerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerListItem {
    id: String,
    image: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InfoResponse {
    #[serde(default)]
    containers: usize,
    #[serde(default)]
    images: usize,
}

#[allow(clippy::cast_possible_truncation)]
fn create_request(image: &ImageSpec) -> CreateContainerRequest<'_> {
    let env = image
        .environment
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    let mut labels = BTreeMap::new();
    labels.insert(CPUS_LABEL, image.cpus.to_string());
    labels.insert(MEMORY_LABEL, image.memory_mb.to_string());
    labels.insert(TYPE_LABEL, image.workload_type.to_string());

    let mut exposed_ports = BTreeMap::new();
    let mut port_bindings: BTreeMap<String, Vec<HostPort>> = BTreeMap::new();
    for port in &image.ports {
        if port.container_port == 0 {
            continue;
        }
        let key = format!("{}/{}", port.container_port, port.proto);
        exposed_ports.insert(key.clone(), Empty {});
        let host_port = if port.host_port == 0 {
            String::new()
        } else {
            port.host_port.to_string()
        };
        port_bindings
            .entry(key)
            .or_default()
            .push(HostPort { host_port });
    }

    CreateContainerRequest {
        image: &image.name,
        hostname: &image.hostname,
        domainname: &image.domainname,
        env,
        cmd: &image.args,
        labels,
        exposed_ports,
        host_config: HostConfig {
            cpu_shares: (image.cpus * CPU_SHARES_PER_CPU) as i64,
            memory: (image.memory_mb * BYTES_PER_MB) as i64,
            port_bindings,
        },
    }
}

/// Split `name[:tag]` into repository and tag. A colon inside a registry host
/// (`host:5000/name`) is not a tag separator.
fn split_image(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo, tag),
        _ => (image, "latest"),
    }
}

fn summary_from_item(item: ContainerListItem) -> Result<ContainerSummary> {
    let labels = item.labels.unwrap_or_default();
    let number = |key: &str| {
        labels
            .get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    Ok(ContainerSummary {
        id: ContainerId::new(item.id).map_err(|e| EngineError::InvalidResponse(e.to_string()))?,
        image: item.image,
        state: ContainerState::from_docker_state(&item.state),
        cpus: number(CPUS_LABEL),
        memory_mb: number(MEMORY_LABEL),
        workload_type: labels
            .get(TYPE_LABEL)
            .and_then(|v| v.parse::<WorkloadType>().ok()),
    })
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    async fn pull_image(&self, image: &str) -> Result<()> {
        let (repo, tag) = split_image(image);
        let url = format!("{}/images/create", self.base_url);

        let response = self
            .send(
                self.client
                    .post(&url)
                    .query(&[("fromImage", repo), ("tag", tag)]),
            )
            .await?;

        // The engine streams progress as JSON lines and reports failures
        // in-band with a 200 status.
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line) {
                if let Some(message) = obj.get("error").and_then(Value::as_str) {
                    return Err(EngineError::Pull {
                        image: image.to_string(),
                        message: message.to_string(),
                    });
                }
            }
        }

        tracing::debug!(image = %image, "Pulled image");
        Ok(())
    }

    async fn create_container(&self, image: &ImageSpec) -> Result<ContainerId> {
        let url = format!("{}/containers/create", self.base_url);
        let request = create_request(image);

        let response = self.send(self.client.post(&url).json(&request)).await?;
        let created: CreateContainerResponse = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        let id = ContainerId::new(created.id)
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
        tracing::debug!(container_id = %id, image = %image.name, "Created container");
        Ok(id)
    }

    async fn start_container(&self, container_id: &ContainerId) -> Result<()> {
        let url = format!("{}/containers/{}/start", self.base_url, container_id);
        self.send(self.client.post(&url)).await?;
        tracing::debug!(container_id = %container_id, "Started container");
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let url = format!("{}/containers/json", self.base_url);
        let response = self
            .send(self.client.get(&url).query(&[("all", "1")]))
            .await?;

        let items: Vec<ContainerListItem> = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        items.into_iter().map(summary_from_item).collect()
    }

    async fn info(&self) -> Result<EngineInfo> {
        let url = format!("{}/info", self.base_url);
        let response = self.send(self.client.get(&url)).await?;

        let info: InfoResponse = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        Ok(EngineInfo {
            containers: info.containers,
            images: info.images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockyard_core::PortBinding;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_url_mapping() {
        assert_eq!(
            base_url("tcp://10.0.0.5:2375", Transport::Plain).unwrap(),
            "http://10.0.0.5:2375"
        );
        assert_eq!(
            base_url("tcp://10.0.0.5:2376/", Transport::Tls).unwrap(),
            "https://10.0.0.5:2376"
        );
        assert_eq!(
            base_url("http://localhost:2375", Transport::Tls).unwrap(),
            "http://localhost:2375"
        );
        assert!(matches!(
            base_url("unix:///var/run/docker.sock", Transport::Plain),
            Err(EngineError::UnsupportedAddress(_))
        ));
    }

    #[test]
    fn split_image_handles_registry_ports() {
        assert_eq!(split_image("redis"), ("redis", "latest"));
        assert_eq!(split_image("redis:7"), ("redis", "7"));
        assert_eq!(
            split_image("registry:5000/team/app"),
            ("registry:5000/team/app", "latest")
        );
        assert_eq!(
            split_image("registry:5000/team/app:v2"),
            ("registry:5000/team/app", "v2")
        );
    }

    #[test]
    fn create_request_maps_resources_and_ports() {
        let mut image = ImageSpec::new("nginx");
        image.cpus = 0.5;
        image.memory_mb = 128.0;
        image.environment.insert("MODE".to_string(), "prod".to_string());
        image.ports.push(PortBinding {
            proto: "tcp".to_string(),
            host_port: 8080,
            container_port: 80,
        });
        image.ports.push(PortBinding {
            proto: "udp".to_string(),
            host_port: 0,
            container_port: 53,
        });

        let request = create_request(&image);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["HostConfig"]["CpuShares"], 512);
        assert_eq!(json["HostConfig"]["Memory"], 128 * 1024 * 1024);
        assert_eq!(json["Env"][0], "MODE=prod");
        assert_eq!(
            json["HostConfig"]["PortBindings"]["80/tcp"][0]["HostPort"],
            "8080"
        );
        assert_eq!(json["HostConfig"]["PortBindings"]["53/udp"][0]["HostPort"], "");
        assert!(json["ExposedPorts"].get("80/tcp").is_some());
        assert_eq!(json["Labels"][TYPE_LABEL], "service");
    }

    #[tokio::test]
    async fn pull_image_reports_in_band_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/create"))
            .and(query_param("fromImage", "missing"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\"status\":\"Pulling\"}\n{\"error\":\"manifest unknown\"}\n",
            ))
            .mount(&server)
            .await;

        let client = HttpEngineClient::with_client(reqwest::Client::new(), server.uri());
        let result = client.pull_image("missing").await;

        assert!(matches!(
            result,
            Err(EngineError::Pull { ref message, .. }) if message == "manifest unknown"
        ));
    }

    #[tokio::test]
    async fn pull_image_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/create"))
            .and(query_param("fromImage", "redis"))
            .and(query_param("tag", "7"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("{\"status\":\"Downloaded\"}\n"),
            )
            .mount(&server)
            .await;

        let client = HttpEngineClient::with_client(reqwest::Client::new(), server.uri());
        client.pull_image("redis:7").await.unwrap();
    }

    #[tokio::test]
    async fn create_and_start_container() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/containers/create"))
            .and(body_partial_json(serde_json::json!({ "Image": "redis" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "Id": "abc123def456789" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/containers/abc123def456789/start"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = HttpEngineClient::with_client(reqwest::Client::new(), server.uri());
        let id = client.create_container(&ImageSpec::new("redis")).await.unwrap();
        assert_eq!(id.as_str(), "abc123def456789");

        client.start_container(&id).await.unwrap();
    }

    #[tokio::test]
    async fn api_error_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/containers/create"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "message": "No such image: ghost" })),
            )
            .mount(&server)
            .await;

        let client = HttpEngineClient::with_client(reqwest::Client::new(), server.uri());
        let result = client.create_container(&ImageSpec::new("ghost")).await;

        match result {
            Err(EngineError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "No such image: ghost");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_containers_recovers_labels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/containers/json"))
            .and(query_param("all", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "Id": "aaaaaaaaaaaaaaaa",
                    "Image": "redis",
                    "State": "running",
                    "Labels": {
                        "dockyard.cpus": "0.5",
                        "dockyard.memory": "512",
                        "dockyard.type": "unique"
                    }
                },
                {
                    "Id": "bbbbbbbbbbbbbbbb",
                    "Image": "busybox",
                    "State": "exited",
                    "Labels": null
                }
            ])))
            .mount(&server)
            .await;

        let client = HttpEngineClient::with_client(reqwest::Client::new(), server.uri());
        let containers = client.list_containers().await.unwrap();

        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].state, ContainerState::Running);
        assert!((containers[0].cpus - 0.5).abs() < f64::EPSILON);
        assert!((containers[0].memory_mb - 512.0).abs() < f64::EPSILON);
        assert_eq!(containers[0].workload_type, Some(WorkloadType::Unique));
        assert_eq!(containers[1].state, ContainerState::Exited);
        assert_eq!(containers[1].workload_type, None);
    }

    #[tokio::test]
    async fn info_reads_counters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "Containers": 3, "Images": 7, "Name": "e1" })),
            )
            .mount(&server)
            .await;

        let client = HttpEngineClient::with_client(reqwest::Client::new(), server.uri());
        let info = client.info().await.unwrap();

        assert_eq!(
            info,
            EngineInfo {
                containers: 3,
                images: 7
            }
        );
    }
}
