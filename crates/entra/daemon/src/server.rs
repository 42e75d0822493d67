//! Server setup and lifecycle management

use crate::api::{create_router, AppState, KindHandle};
use crate::config::{parse_secret_key, DaemonConfig};
use crate::error::{DaemonError, DaemonResult};
use entra_control::{
    AppRegistrationController, ControllerRunner, CredentialResolver, InMemoryStore, RecordStore,
    SecurityGroupController,
};
use entra_graph::{GraphCredentialResolver, StaticSecretSource};
use entra_types::{EntraAppRegistration, EntraSecurityGroup, ManagedObject};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// entrad server: REST API plus one controller runner per kind
pub struct Server {
    config: DaemonConfig,
    app_registrations: Arc<InMemoryStore<EntraAppRegistration>>,
    security_groups: Arc<InMemoryStore<EntraSecurityGroup>>,
    app_runner: Arc<ControllerRunner>,
    group_runner: Arc<ControllerRunner>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let secrets = Arc::new(StaticSecretSource::new());
        for (key, secret) in &config.credentials {
            let key = parse_secret_key(key).ok_or_else(|| {
                DaemonError::Config(format!(
                    "credential key {:?} is not of the form namespace/name",
                    key
                ))
            })?;
            secrets.insert(key.namespace, key.name, secret.to_data());
        }
        tracing::info!(credentials = secrets.len(), "Loaded credential secrets");

        let resolver = GraphCredentialResolver::new(secrets, config.graph.clone())
            .map_err(|e| DaemonError::Config(e.to_string()))?;
        Ok(Self::with_resolver(config, Arc::new(resolver)))
    }

    /// Create a server around an existing credential resolver
    pub fn with_resolver(config: DaemonConfig, resolver: Arc<dyn CredentialResolver>) -> Self {
        let app_registrations: Arc<InMemoryStore<EntraAppRegistration>> =
            Arc::new(InMemoryStore::new());
        let security_groups: Arc<InMemoryStore<EntraSecurityGroup>> =
            Arc::new(InMemoryStore::new());

        let app_runner = ControllerRunner::new(
            Arc::new(AppRegistrationController::new(
                app_registrations.clone(),
                resolver.clone(),
                config.controller.clone(),
            )),
            config.controller.clone(),
        );
        let group_runner = ControllerRunner::new(
            Arc::new(SecurityGroupController::new(
                security_groups.clone(),
                resolver,
                config.controller.clone(),
            )),
            config.controller.clone(),
        );

        Self {
            config,
            app_registrations,
            security_groups,
            app_runner,
            group_runner,
        }
    }

    /// API state wired to this server's stores and queues
    pub fn state(&self) -> AppState {
        AppState::new(
            KindHandle::new(self.app_registrations.clone(), self.app_runner.queue()),
            KindHandle::new(self.security_groups.clone(), self.group_runner.queue()),
        )
    }

    /// Enqueues every stored record and starts both controller runners.
    /// They stop once `shutdown` flips to true.
    pub async fn spawn_controllers(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        enqueue_existing(&self.app_runner, self.app_registrations.as_ref()).await;
        enqueue_existing(&self.group_runner, self.security_groups.as_ref()).await;

        [self.app_runner.clone(), self.group_runner.clone()]
            .into_iter()
            .map(|runner| tokio::spawn(runner.run(shutdown.clone())))
            .collect()
    }

    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(self.state(), self.config.server.enable_cors);
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("entrad listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runners = self.spawn_controllers(shutdown_rx).await;

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()));

        tracing::info!("entrad shutting down");

        // Runners drain their in-flight passes before returning
        let _ = shutdown_tx.send(true);
        for runner in runners {
            if let Err(e) = runner.await {
                tracing::error!(error = %e, "Controller task failed");
            }
        }

        served
    }
}

async fn enqueue_existing<R: ManagedObject>(runner: &ControllerRunner, store: &dyn RecordStore<R>) {
    match store.list().await {
        Ok(records) => runner.enqueue_all(records.iter().map(|r| r.key())),
        Err(e) => tracing::warn!(kind = R::KIND, error = %e, "Failed to list records at startup"),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
