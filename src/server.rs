//! Reusable control plane runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: store selection and migrations,
//! default admin, the inventory refresh job, the REST API, metrics and
//! graceful shutdown. [`build_state`] and [`build_scheduler`] wire the
//! services without binding a socket, for embedding and tests.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    AuthService, ControlService, InventoryConfig, InventoryService, Scheduler, StateCache,
    UserService,
};
use crate::config::AppConfig;
use crate::domain::{DomainResult, HypervisorExecutor, NewUser, NotificationSink, UserRole};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{
    init_database, DatabaseConfig, NoopNotifier, PowerShellExecutor, Stores, WebhookNotifier,
};
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::{ShutdownCoordinator, ShutdownSignal};

/// Name of the periodic inventory refresh job.
pub const REFRESH_JOB: &str = "update servers info";

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the control plane.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Create the configured admin account if its email is unused (default: true).
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

// ── Wiring ─────────────────────────────────────────────────────────

/// Construct every service around one shared state cache.
pub fn build_state(
    config: &AppConfig,
    stores: &Stores,
    executor: Arc<dyn HypervisorExecutor>,
    notifier: Arc<dyn NotificationSink>,
) -> AppState {
    let cache = StateCache::shared();

    let auth = Arc::new(AuthService::new(
        stores.users.clone(),
        stores.refresh_tokens.clone(),
        JwtConfig::from(&config.security),
    ));
    let users = Arc::new(UserService::new(
        stores.users.clone(),
        stores.servers.clone(),
        config.security.bcrypt_cost,
    ));
    let control = Arc::new(ControlService::new(
        executor.clone(),
        cache.clone(),
        notifier,
        config.hypervisor.switch_name.clone(),
    ));
    let inventory = Arc::new(InventoryService::new(
        executor,
        cache.clone(),
        stores.servers.clone(),
        InventoryConfig {
            hosts: config.hypervisor.hosts.clone(),
            script: config.hypervisor.inventory_script.clone(),
        },
    ));

    AppState {
        auth,
        users,
        control,
        inventory,
        servers: stores.servers.clone(),
        cache,
        started_at: Instant::now(),
    }
}

/// Scheduler with the periodic inventory refresh registered.
pub fn build_scheduler(
    config: &AppConfig,
    inventory: Arc<InventoryService>,
) -> DomainResult<Scheduler> {
    let mut scheduler = Scheduler::new();
    scheduler.add_job(
        REFRESH_JOB,
        Duration::from_secs(config.scheduler.refresh_interval_secs),
        config.scheduler.run_immediately,
        move || {
            let inventory = inventory.clone();
            async move { inventory.refresh_cache().await.map(|_| ()) }
        },
    )?;
    Ok(scheduler)
}

/// Create the configured admin account unless its email is already registered.
pub async fn ensure_default_admin(state: &AppState, config: &AppConfig) -> DomainResult<()> {
    let created = state
        .users
        .ensure_user(NewUser {
            name: config.admin.name.clone(),
            email: config.admin.email.clone(),
            company: String::new(),
            role: UserRole::Admin,
            password: config.admin.password.clone(),
        })
        .await?;
    if created {
        info!(email = %config.admin.email, "Default admin created");
        info!("⚠️  Please change the admin password immediately!");
    }
    Ok(())
}

/// The global metrics recorder can only be installed once per process;
/// later starts reuse the first handle.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("📊 Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!("Prometheus recorder unavailable, /metrics disabled: {}", e);
                None
            }
        })
        .clone()
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running control plane.
///
/// ```rust,no_run
/// use wvmc::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Services shared with the HTTP layer.
    pub state: AppState,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the REST API is bound to.
    pub local_addr: SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    job_tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Start the control plane.
    ///
    /// 1. Validate configuration and install the metrics recorder
    /// 2. Open the store (SQLite via sea-orm, or in-memory) and migrate
    /// 3. Create the default admin (if enabled)
    /// 4. Start the scheduler with the inventory refresh job
    /// 5. Serve the REST API until shutdown
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting WVMC control plane...");
        let metrics = prometheus_handle();

        // ── Store ──────────────────────────────────────────────
        let (stores, db) = if app_cfg.database.is_memory() {
            warn!("Using the in-memory store; data is lost on exit");
            (Stores::memory(), None)
        } else {
            let db = init_database(&DatabaseConfig {
                url: app_cfg.database.url.clone(),
            })
            .await?;
            if opts.auto_migrate {
                info!("Running database migrations...");
                Migrator::up(&db, None).await?;
                info!("Migrations completed");
            }
            (Stores::sea_orm(db.clone()), Some(db))
        };

        // ── Adapters & services ────────────────────────────────
        let executor: Arc<dyn HypervisorExecutor> =
            Arc::new(PowerShellExecutor::from(&app_cfg.hypervisor));
        let notifier: Arc<dyn NotificationSink> = match &app_cfg.notifications.webhook_url {
            Some(url) => {
                let webhook = WebhookNotifier::new(
                    url,
                    Duration::from_secs(app_cfg.notifications.timeout_secs),
                )?;
                info!(url = %webhook.url(), "🔔 Webhook notifications enabled");
                Arc::new(webhook)
            }
            None => Arc::new(NoopNotifier),
        };
        let state = build_state(&app_cfg, &stores, executor, notifier);

        if opts.create_default_admin {
            ensure_default_admin(&state, &app_cfg).await?;
        }

        // ── Background jobs ────────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();
        let scheduler = build_scheduler(&app_cfg, state.inventory.clone())?;
        let job_tasks = scheduler.start(shutdown_signal.clone());

        // ── REST API ───────────────────────────────────────────
        let router = create_api_router(state.clone(), metrics);
        let listener = tokio::net::TcpListener::bind(app_cfg.server.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", local_addr);
        info!("OpenAPI document at http://{}/api-doc/openapi.json", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });
        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 WVMC started");

        Ok(Self {
            state,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
            job_tasks,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown, then give the API and in-flight jobs at most
    /// `server.shutdown_timeout` seconds to finish.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            job_tasks,
            ..
        } = self;

        shutdown
            .shutdown_with_cleanup(|| async move {
                if let Err(e) = api_task.await {
                    error!("REST API server task panicked: {}", e);
                }
                for task in job_tasks {
                    if let Err(e) = task.await {
                        error!("Scheduler task panicked: {}", e);
                    }
                }
            })
            .await;

        if let Some(db) = db {
            match db.close().await {
                Ok(()) => info!("✅ Database connection closed"),
                Err(e) => warn!("Error closing database connection: {}", e),
            }
        }

        info!("👋 WVMC shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down WVMC...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the application config.
///
/// `RUST_LOG` takes precedence over `logging.level`. Call once at process
/// startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config.server.shutdown_timeout = 5;
        config.database.url = "memory".into();
        config.security.bcrypt_cost = 4;
        config.security.token_secret = "test-secret".into();
        config.hypervisor.program = "true".into();
        config.hypervisor.args = Vec::new();
        config.scheduler.run_immediately = false;
        config
    }

    #[test]
    fn test_build_scheduler_registers_refresh_job() {
        let config = memory_config();
        let state = build_state(
            &config,
            &Stores::memory(),
            Arc::new(PowerShellExecutor::new("true", Vec::new())),
            Arc::new(NoopNotifier),
        );
        let scheduler = build_scheduler(&config, state.inventory.clone()).unwrap();
        assert_eq!(scheduler.job_names(), vec![REFRESH_JOB]);
    }

    #[tokio::test]
    async fn test_start_and_shutdown_with_memory_store() {
        let handle = ServerHandle::start(ServerOptions {
            config: memory_config(),
            auto_migrate: false,
            create_default_admin: true,
        })
        .await
        .unwrap();

        assert!(handle.local_addr.port() > 0);
        let admins = handle.state.users.list_users().await.unwrap();
        assert_eq!(admins.len(), 1);
        assert!(admins[0].is_admin());

        handle.shutdown().await;
    }
}
