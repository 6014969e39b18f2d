// brewery-api/tests/common/mod.rs
// ============================================================================
// Module: API Test Harness
// Description: Spawns the brewery server on an ephemeral loopback port.
// Purpose: Drive the HTTP surface end to end against a temp SQLite store.
// Dependencies: brewery-api, brewery-store-sqlite, reqwest, tempfile, tokio
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Arc;
use std::sync::Mutex;

use brewery_api::ApiAuditEvent;
use brewery_api::ApiAuditSink;
use brewery_api::AuthAuditEvent;
use brewery_api::BreweryServer;
use brewery_config::BreweryConfig;
use brewery_config::PrincipalConfig;
use brewery_config::Role;
use brewery_config::ServerAuthConfig;
use brewery_config::ServerAuthMode;
use brewery_core::OwnerId;
use brewery_core::SharedBreweryStore;
use brewery_store_sqlite::SqliteBreweryStore;
use brewery_store_sqlite::SqliteStoreConfig;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Token held by the admin principal in bearer configs.
pub const ADMIN_TOKEN: &str = "admin-token";
/// Token held by the brewer principal in bearer configs.
pub const BREWER_TOKEN: &str = "brewer-token";

/// Audit sink that keeps every event as JSON.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Serialized events in arrival order.
    events: Mutex<Vec<Value>>,
}

impl RecordingAuditSink {
    /// Returns a snapshot of recorded events.
    pub fn events(&self) -> Vec<Value> {
        self.events.lock().expect("audit lock").clone()
    }

    /// Appends one serialized event.
    fn push(&self, value: Value) {
        self.events.lock().expect("audit lock").push(value);
    }
}

impl ApiAuditSink for RecordingAuditSink {
    fn record(&self, event: &ApiAuditEvent) {
        self.push(serde_json::to_value(event).expect("serialize request event"));
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.push(serde_json::to_value(event).expect("serialize auth event"));
    }
}

/// Running server plus handles to its store and audit trail.
pub struct TestServer {
    /// Base URL (`http://127.0.0.1:<port>`).
    pub base_url: String,
    /// HTTP client.
    pub client: reqwest::Client,
    /// Direct handle to the backing store.
    pub store: SqliteBreweryStore,
    /// Recorded audit events.
    pub audit: Arc<RecordingAuditSink>,
    /// Graceful shutdown trigger.
    shutdown: Option<oneshot::Sender<()>>,
    /// Server task.
    join: Option<JoinHandle<()>>,
    /// Keeps the database directory alive.
    _dir: TempDir,
}

impl TestServer {
    /// Returns the absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Registers an owner row and returns its id.
    pub fn owner(&self, username: &str) -> OwnerId {
        self.store.insert_owner(username).expect("insert owner")
    }

    /// Stops the server and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Default config: local-only auth, so loopback test clients hold every role.
pub fn local_config() -> BreweryConfig {
    BreweryConfig::default()
}

/// Config with an admin principal and a brewer principal.
pub fn bearer_config() -> BreweryConfig {
    let mut config = BreweryConfig::default();
    config.server.auth = Some(ServerAuthConfig {
        mode: ServerAuthMode::BearerToken,
        principals: vec![
            PrincipalConfig {
                subject: "ops".to_string(),
                token: ADMIN_TOKEN.to_string(),
                roles: vec![Role::Admin],
            },
            PrincipalConfig {
                subject: "taproom".to_string(),
                token: BREWER_TOKEN.to_string(),
                roles: vec![Role::Brewer],
            },
        ],
    });
    config
}

/// Spawns a server for `config` over a fresh temp database.
pub async fn spawn_server(config: BreweryConfig) -> TestServer {
    config.validate().expect("valid test config");
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteBreweryStore::new(&SqliteStoreConfig::new(dir.path().join("brewery.sqlite")))
        .expect("open store");
    let audit = Arc::new(RecordingAuditSink::default());
    let server = BreweryServer::with_store(
        config,
        SharedBreweryStore::from_store(store.clone()),
        Arc::clone(&audit) as Arc<dyn ApiAuditSink>,
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        let _ = server
            .serve_with_shutdown(listener, async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    TestServer {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        store,
        audit,
        shutdown: Some(shutdown_tx),
        join: Some(join),
        _dir: dir,
    }
}
