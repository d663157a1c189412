//! The engine registry.
//!
//! The `Manager` owns the persisted engine set and the cluster session built
//! from it. Every change to the engine set reloads it from the store and
//! replaces the session wholesale.

use std::sync::Arc;

use dockyard_cluster::{Cluster, EventBus};
use dockyard_core::{ClusterInfo, Container, EngineId, Event};
use dockyard_engine::{tls, Connector, Engine, HttpConnector};
use dockyard_scheduler::SchedulerRegistry;
use dockyard_store::{schema, CertificateMaterial, EngineConfig, RocksStore, Store};
use parking_lot::{Mutex, RwLock};

use crate::capture::EventCapture;
use crate::error::{ControlError, Result};
use crate::run;
use crate::types::{ManagerConfig, RunRequest};

/// Snapshot swapped on every reload.
struct State {
    engines: Vec<EngineConfig>,
    cluster: Arc<Cluster>,
}

/// Registry of engines and entry point for running workloads.
pub struct Manager<S: Store> {
    store: Arc<S>,
    connector: Arc<dyn Connector>,
    config: ManagerConfig,
    events: EventBus,
    state: RwLock<State>,
    // Serializes store writes with the reload that follows them.
    write_lock: Mutex<()>,
    _capture: EventCapture,
}

impl Manager<RocksStore> {
    /// Open the `RocksDB` store under `config.data_dir` and initialize a
    /// manager reaching engines over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory or the store cannot be opened,
    /// or if initialization fails.
    pub async fn open(config: ManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = Arc::new(RocksStore::open(&config.data_dir)?);
        let connector = Arc::new(HttpConnector::new(config.request_timeout()));

        tracing::info!(data_dir = %config.data_dir.display(), "Opened store");

        Self::new(store, connector, config).await
    }
}

impl<S: Store + 'static> Manager<S> {
    /// Initialize a manager over `store`.
    ///
    /// Creates missing tables, starts event capture and connects every
    /// stored engine. Engines with unusable certificates fall back to plain
    /// transport; engines that cannot be connected at all stay listed but
    /// are left out of the cluster session.
    ///
    /// # Errors
    ///
    /// Returns an error if a table check, table creation or the initial
    /// engine listing fails.
    pub async fn new(
        store: Arc<S>,
        connector: Arc<dyn Connector>,
        config: ManagerConfig,
    ) -> Result<Self> {
        ensure_tables(store.as_ref())?;

        let events = EventBus::new(config.event_buffer);
        let capture = EventCapture::spawn(Arc::clone(&store), events.subscribe());
        let state = load(store.as_ref(), connector.as_ref(), &events)?;

        Ok(Self {
            store,
            connector,
            config,
            events,
            state: RwLock::new(state),
            write_lock: Mutex::new(()),
            _capture: capture,
        })
    }
}

impl<S: Store> Manager<S> {
    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The current cluster session.
    #[must_use]
    pub fn cluster(&self) -> Arc<Cluster> {
        Arc::clone(&self.state.read().cluster)
    }

    /// Subscribe to lifecycle events of this and every later session.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // =========================================================================
    // Engine Registry
    // =========================================================================

    /// All stored engines, in store order.
    #[must_use]
    pub fn engines(&self) -> Vec<EngineConfig> {
        self.state.read().engines.clone()
    }

    /// Get a stored engine by ID.
    #[must_use]
    pub fn get_engine(&self, engine_id: &EngineId) -> Option<EngineConfig> {
        self.state
            .read()
            .engines
            .iter()
            .find(|e| e.id() == engine_id)
            .cloned()
    }

    /// Store a new engine and reload.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` (wrapped) if the ID is taken, in
    /// which case nothing changes, or any error from the reload.
    pub fn add_engine(&self, config: EngineConfig) -> Result<()> {
        let _guard = self.write_lock.lock();

        self.store.insert_engine(&config)?;
        tracing::info!(engine_id = %config.id(), addr = %config.engine.addr, "Added engine");

        self.reload_locked()
    }

    /// Delete an engine and reload. Deleting an unknown ID still reloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete or the reload fails.
    pub fn remove_engine(&self, engine_id: &EngineId) -> Result<()> {
        let _guard = self.write_lock.lock();

        self.store.delete_engine(engine_id)?;
        tracing::info!(engine_id = %engine_id, "Removed engine");

        self.reload_locked()
    }

    /// Rebuild the engine set and cluster session from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the engines cannot be listed.
    pub fn reload(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.reload_locked()
    }

    /// Caller must hold `write_lock`.
    fn reload_locked(&self) -> Result<()> {
        let state = load(self.store.as_ref(), self.connector.as_ref(), &self.events)?;
        *self.state.write() = state;
        Ok(())
    }

    // =========================================================================
    // Cluster Queries
    // =========================================================================

    /// Every container on the connected engines, in engine order.
    ///
    /// # Errors
    ///
    /// Returns an error if any engine cannot be queried.
    pub async fn containers(&self) -> Result<Vec<Container>> {
        let cluster = self.cluster();
        Ok(cluster.list_containers().await?)
    }

    /// Find the container whose ID starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::AmbiguousContainerPrefix` if several containers
    /// match, or an error if the engines cannot be queried.
    pub async fn get_container(&self, prefix: &str) -> Result<Option<Container>> {
        let mut matches: Vec<Container> = self
            .containers()
            .await?
            .into_iter()
            .filter(|c| c.id.has_prefix(prefix))
            .collect();

        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            n => Err(ControlError::AmbiguousContainerPrefix {
                prefix: prefix.to_string(),
                matches: n,
            }),
        }
    }

    /// Aggregate capacity and usage across the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the engines cannot be queried.
    pub async fn cluster_info(&self) -> Result<ClusterInfo> {
        Ok(self.cluster().info().await?)
    }

    /// The persisted event log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn events(&self) -> Result<Vec<Event>> {
        Ok(self.store.list_events()?)
    }

    // =========================================================================
    // Run Pipeline
    // =========================================================================

    /// Start the containers described by `request`.
    ///
    /// The session is taken once, so a concurrent add or remove affects
    /// later calls only.
    ///
    /// # Errors
    ///
    /// See [`run::run`].
    pub async fn run(&self, request: &RunRequest) -> Result<Vec<Container>> {
        let cluster = self.cluster();
        run::run(&cluster, request).await
    }

    /// Stop the manager after every emitted event has been persisted.
    ///
    /// Drops the cluster session and the event bus, then waits for event
    /// capture to drain. Sessions obtained from [`Manager::cluster`] must be
    /// dropped first, since they keep the bus open.
    pub async fn shutdown(self) {
        let Self {
            events,
            state,
            _capture: capture,
            ..
        } = self;
        drop(state);
        drop(events);

        capture.finish().await;
        tracing::debug!("Manager shut down");
    }
}

impl<S: Store> std::fmt::Debug for Manager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Manager")
            .field("config", &self.config)
            .field("engines", &state.engines.len())
            .field("connected", &state.cluster.engines().len())
            .finish_non_exhaustive()
    }
}

fn ensure_tables<S: Store + ?Sized>(store: &S) -> Result<()> {
    for table in schema::all_tables() {
        if !store.has_table(table)? {
            store.create_table(table)?;
        }
    }
    Ok(())
}

fn load<S: Store + ?Sized>(
    store: &S,
    connector: &dyn Connector,
    events: &EventBus,
) -> Result<State> {
    let engines = store.list_engines()?;
    let connected: Vec<Engine> = engines
        .iter()
        .filter_map(|config| connect(connector, config))
        .collect();

    tracing::info!(
        engines = engines.len(),
        connected = connected.len(),
        "Loaded engines"
    );

    let cluster = Cluster::new(
        connected,
        Arc::new(SchedulerRegistry::with_defaults()),
        events.clone(),
    );

    Ok(State {
        engines,
        cluster: Arc::new(cluster),
    })
}

/// Connect one engine, preferring TLS when complete material is stored.
fn connect(connector: &dyn Connector, config: &EngineConfig) -> Option<Engine> {
    let engine_id = config.id();

    let tls = match config.certificates() {
        CertificateMaterial::Absent => None,
        CertificateMaterial::Incomplete => {
            tracing::warn!(
                engine_id = %engine_id,
                "Incomplete certificate material, using plain transport"
            );
            None
        }
        CertificateMaterial::Complete {
            ca,
            certificate,
            key,
        } => match tls::client_config(ca, certificate, key) {
            Ok(tls) => Some(Arc::new(tls)),
            Err(e) => {
                tracing::warn!(
                    engine_id = %engine_id,
                    error = %e,
                    "Unusable certificate material, using plain transport"
                );
                None
            }
        },
    };

    if let Some(tls) = tls {
        match connector.connect(&config.engine, Some(tls)) {
            Ok(engine) => return Some(engine),
            Err(e) => tracing::warn!(
                engine_id = %engine_id,
                error = %e,
                "TLS connection failed, retrying over plain transport"
            ),
        }
    }

    match connector.connect(&config.engine, None) {
        Ok(engine) => Some(engine),
        Err(e) => {
            tracing::error!(
                engine_id = %engine_id,
                error = %e,
                "Failed to connect engine, leaving it out of the cluster"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockyard_core::{ContainerId, ContainerState, EngineSpec, EventKind};
    use dockyard_engine::{ContainerSummary, MockConnector, Transport};
    use dockyard_store::StoreError;
    use tempfile::TempDir;

    struct Harness {
        manager: Manager<RocksStore>,
        connector: Arc<MockConnector>,
        _dir: TempDir,
    }

    async fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let connector = Arc::new(MockConnector::new());
        let manager = Manager::new(
            store,
            Arc::clone(&connector) as Arc<dyn Connector>,
            ManagerConfig::with_data_dir(dir.path()),
        )
        .await
        .unwrap();
        Harness {
            manager,
            connector,
            _dir: dir,
        }
    }

    fn engine(id: &str) -> EngineConfig {
        EngineConfig::new(EngineSpec::new(
            EngineId::new(id).unwrap(),
            format!("tcp://{id}:2375"),
        ))
    }

    fn id(value: &str) -> EngineId {
        EngineId::new(value).unwrap()
    }

    fn tls_material() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};

        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::default();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let client_key = KeyPair::generate().unwrap();
        let client_cert = CertificateParams::new(vec!["client".to_string()])
            .unwrap()
            .signed_by(&client_key, &ca_cert, &ca_key)
            .unwrap();

        (
            ca_cert.pem().into_bytes(),
            client_cert.pem().into_bytes(),
            client_key.serialize_pem().into_bytes(),
        )
    }

    #[tokio::test]
    async fn initialization_creates_tables() {
        let h = harness().await;

        assert!(h.manager.store().has_table(schema::table::CONFIG).unwrap());
        assert!(h.manager.store().has_table(schema::table::EVENTS).unwrap());
        assert!(h.manager.engines().is_empty());
    }

    #[tokio::test]
    async fn add_then_remove_engine() {
        let h = harness().await;

        h.manager.add_engine(engine("e1")).unwrap();
        let ids: Vec<String> = h.manager.engines().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["e1"]);
        assert_eq!(h.manager.cluster().engines().len(), 1);

        h.manager.remove_engine(&id("e1")).unwrap();
        assert!(h.manager.engines().is_empty());
        assert!(h.manager.cluster().engines().is_empty());
    }

    #[tokio::test]
    async fn duplicate_add_leaves_state_unchanged() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();

        let result = h.manager.add_engine(engine("e1"));

        assert!(matches!(
            result,
            Err(ControlError::Store(StoreError::AlreadyExists(_)))
        ));
        assert!(!result.unwrap_err().is_retriable());
        assert_eq!(h.manager.engines().len(), 1);
    }

    #[tokio::test]
    async fn remove_unknown_engine_succeeds() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();

        h.manager.remove_engine(&id("ghost")).unwrap();

        assert_eq!(h.manager.engines().len(), 1);
    }

    #[tokio::test]
    async fn get_engine_by_id() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();

        assert_eq!(h.manager.get_engine(&id("e1")).unwrap().id(), &id("e1"));
        assert!(h.manager.get_engine(&id("missing")).is_none());
    }

    #[tokio::test]
    async fn stored_engines_load_on_initialization() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        ensure_tables(store.as_ref()).unwrap();
        store.insert_engine(&engine("e2")).unwrap();
        store.insert_engine(&engine("e1")).unwrap();

        let manager = Manager::new(
            store,
            Arc::new(MockConnector::new()),
            ManagerConfig::with_data_dir(dir.path()),
        )
        .await
        .unwrap();

        let ids: Vec<String> = manager.engines().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["e1", "e2"]);
        assert_eq!(manager.cluster().engines().len(), 2);
    }

    #[tokio::test]
    async fn partial_certificates_fall_back_to_plain() {
        let h = harness().await;
        let mut config = engine("e1");
        config.ca_certificate = Some(b"-----BEGIN CERTIFICATE-----".to_vec());

        h.manager.add_engine(config).unwrap();

        assert_eq!(h.connector.transport(&id("e1")), Some(Transport::Plain));
        assert_eq!(h.manager.cluster().engines().len(), 1);
    }

    #[tokio::test]
    async fn invalid_certificates_fall_back_to_plain() {
        let h = harness().await;
        let config = engine("e1").with_certificates(
            b"not a ca".to_vec(),
            b"not a cert".to_vec(),
            b"not a key".to_vec(),
        );

        h.manager.add_engine(config).unwrap();

        assert_eq!(h.connector.transport(&id("e1")), Some(Transport::Plain));
    }

    #[tokio::test]
    async fn complete_certificates_use_tls() {
        let h = harness().await;
        let (ca, cert, key) = tls_material();

        h.manager
            .add_engine(engine("e1").with_certificates(ca, cert, key))
            .unwrap();

        assert_eq!(h.connector.transport(&id("e1")), Some(Transport::Tls));
        assert_eq!(
            h.manager.cluster().engines()[0].transport(),
            Transport::Tls
        );
    }

    #[tokio::test]
    async fn unreachable_engine_stays_listed() {
        let h = harness().await;
        h.connector.refuse(&id("e2"));

        h.manager.add_engine(engine("e1")).unwrap();
        h.manager.add_engine(engine("e2")).unwrap();

        assert_eq!(h.manager.engines().len(), 2);
        let cluster = h.manager.cluster();
        let connected: Vec<&str> = cluster.engines().iter().map(|e| e.id().as_str()).collect();
        assert_eq!(connected, vec!["e1"]);
    }

    #[tokio::test]
    async fn run_places_every_instance() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();
        h.manager.add_engine(engine("e2")).unwrap();

        let mut request = RunRequest::new("redis");
        request.count = 3;
        let containers = h.manager.run(&request).await.unwrap();

        assert_eq!(containers.len(), 3);
        assert!(containers.iter().all(|c| !c.engine.id.as_str().is_empty()));
        let running = h.connector.client(&id("e1")).running_count()
            + h.connector.client(&id("e2")).running_count();
        assert_eq!(running, 3);
    }

    #[tokio::test]
    async fn run_failure_keeps_earlier_containers() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();
        h.connector.client(&id("e1")).fail_starts_after(1);

        let mut request = RunRequest::new("redis");
        request.count = 3;
        let result = h.manager.run(&request).await;

        assert!(matches!(
            result,
            Err(ControlError::RunAborted { iteration: 2, .. })
        ));
        assert_eq!(h.connector.client(&id("e1")).running_count(), 1);
    }

    /// Shut the manager down and read the event log back from disk.
    async fn persisted_events(h: Harness) -> Vec<Event> {
        let Harness { manager, _dir: dir, .. } = h;
        manager.shutdown().await;

        RocksStore::open(dir.path()).unwrap().list_events().unwrap()
    }

    #[tokio::test]
    async fn events_are_persisted() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();

        let mut request = RunRequest::new("redis");
        request.pull = true;
        h.manager.run(&request).await.unwrap();

        let events = persisted_events(h).await;
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Pull, EventKind::Create, EventKind::Start]);
        assert!(events.iter().all(|e| e.engine_id == id("e1")));
    }

    #[tokio::test]
    async fn capture_survives_reload() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();
        // Replaces the cluster session.
        h.manager.add_engine(engine("e2")).unwrap();

        h.manager.run(&RunRequest::new("redis")).await.unwrap();

        assert_eq!(persisted_events(h).await.len(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn shutdown_persists_every_event_of_a_run() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();

        let mut request = RunRequest::new("redis");
        request.pull = true;
        request.count = 3;
        h.manager.run(&request).await.unwrap();

        let events = persisted_events(h).await;
        assert_eq!(events.len(), 9);
        assert_eq!(events[8].kind, EventKind::Start);
    }

    #[tokio::test]
    async fn events_read_back_while_running() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();
        let mut rx = h.manager.subscribe();

        h.manager.run(&RunRequest::new("redis")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::Create);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::Start);

        let kinds: Vec<EventKind> = persisted_events(h).await.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Create, EventKind::Start]);
    }

    #[tokio::test]
    async fn reload_picks_up_store_changes() {
        let h = harness().await;
        h.manager.store().insert_engine(&engine("e1")).unwrap();
        assert!(h.manager.engines().is_empty());

        h.manager.reload().unwrap();

        assert_eq!(h.manager.engines().len(), 1);
        assert_eq!(h.manager.cluster().engines().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_reload_never_loses_an_add() {
        let h = harness().await;
        let manager = &h.manager;

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..20 {
                    manager.add_engine(engine(&format!("e{i:02}"))).unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..50 {
                    manager.reload().unwrap();
                }
            });
        });

        assert_eq!(manager.engines().len(), 20);
        assert_eq!(manager.cluster().engines().len(), 20);
    }

    #[tokio::test]
    async fn containers_span_every_engine() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();
        h.manager.add_engine(engine("e2")).unwrap();
        assert!(h.manager.containers().await.unwrap().is_empty());

        for (engine_id, raw) in [("e1", "aaa111"), ("e2", "bbb222")] {
            h.connector.client(&id(engine_id)).insert_container(ContainerSummary {
                id: ContainerId::new(raw).unwrap(),
                image: "redis".to_string(),
                state: ContainerState::Running,
                cpus: 0.1,
                memory_mb: 64.0,
                workload_type: None,
            });
        }

        let containers = h.manager.containers().await.unwrap();
        let placed: Vec<(&str, &str)> = containers
            .iter()
            .map(|c| (c.id.as_str(), c.engine.id.as_str()))
            .collect();
        assert_eq!(placed, vec![("aaa111", "e1"), ("bbb222", "e2")]);
    }

    #[tokio::test]
    async fn container_lookup_by_prefix() {
        let h = harness().await;
        h.manager.add_engine(engine("e1")).unwrap();

        let client = h.connector.client(&id("e1"));
        for raw in ["abc111", "abc222", "def333"] {
            client.insert_container(ContainerSummary {
                id: ContainerId::new(raw).unwrap(),
                image: "redis".to_string(),
                state: ContainerState::Running,
                cpus: 0.1,
                memory_mb: 64.0,
                workload_type: None,
            });
        }

        let found = h.manager.get_container("def").await.unwrap().unwrap();
        assert_eq!(found.id.as_str(), "def333");
        assert_eq!(found.engine.id, id("e1"));

        assert!(h.manager.get_container("zzz").await.unwrap().is_none());

        assert!(matches!(
            h.manager.get_container("abc").await,
            Err(ControlError::AmbiguousContainerPrefix { matches: 2, .. })
        ));
    }

    #[tokio::test]
    async fn cluster_info_passes_through() {
        let h = harness().await;
        let mut config = engine("e1");
        config.engine.cpus = 2.0;
        config.engine.memory_mb = 2048.0;
        h.manager.add_engine(config).unwrap();

        h.manager.run(&RunRequest::new("redis")).await.unwrap();
        let info = h.manager.cluster_info().await.unwrap();

        assert_eq!(info.engine_count, 1);
        assert_eq!(info.container_count, 1);
        assert!((info.cpus - 2.0).abs() < f64::EPSILON);
    }
}
