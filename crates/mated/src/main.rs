// # mated - mate DNS daemon
//
// This is a thin integration layer. All ownership and reconciliation logic
// lives in mate-core; this binary only wires the pieces together:
// 1. Reading configuration (a JSON file or environment variables)
// 2. Initializing tracing and the runtime
// 3. Registering zone providers
// 4. Selecting the consumer and running the controller loop
//
// ## Configuration
//
// `MATE_CONFIG_FILE` points at a JSON `MateConfig`. Without it the
// configuration is built from the environment:
//
// ### Ownership
// - `MATE_GROUP_ID`: Installation group id (required)
//
// ### DNS Provider
// - `MATE_PROVIDER_TYPE`: Provider type (cloudflare, memory)
// - `MATE_PROVIDER_API_TOKEN`: API token (cloudflare)
// - `MATE_PROVIDER_ACCOUNT_ID`: Account ID narrowing the zone listing (optional)
// - `MATE_MEMORY_ZONES`: Comma-separated zone names (memory)
// - `MATE_MODE`: `dry-run` lists records but never writes (cloudflare)
//
// ### Driver
// - `MATE_CONSUMER`: reconcile (default) or stdout
// - `MATE_SYNC_INTERVAL_SECS`: Seconds between full sync passes (default 60)
//
// These are always read from the environment:
// - `MATE_ENDPOINTS_FILE`: JSON array of desired endpoints (required)
// - `MATE_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export MATE_GROUP_ID=cluster-a
// export MATE_PROVIDER_TYPE=cloudflare
// export MATE_PROVIDER_API_TOKEN=your_token
// export MATE_ENDPOINTS_FILE=/var/lib/mate/endpoints.json
//
// mated
// ```

mod source;

use anyhow::Result;
use mate_core::{
    Consumer, ConsumerKind, Controller, EngineConfig, MateConfig, ProviderConfig,
    ProviderRegistry, ReconcileEvent, Reconciler, StdoutConsumer,
};
use source::FileEndpointSource;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum MateExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<MateExitCode> for ExitCode {
    fn from(code: MateExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
struct Config {
    mate: MateConfig,
    endpoints_file: Option<PathBuf>,
    log_level: String,
}

impl Config {
    /// Load configuration from the process environment
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mate = match lookup("MATE_CONFIG_FILE") {
            Some(path) => MateConfig::from_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path, e))?,
            None => Self::mate_from_lookup(&lookup)?,
        };

        Ok(Self {
            mate,
            endpoints_file: lookup("MATE_ENDPOINTS_FILE").map(PathBuf::from),
            log_level: lookup("MATE_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    fn mate_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<MateConfig> {
        let group_id = lookup("MATE_GROUP_ID").ok_or_else(|| {
            anyhow::anyhow!(
                "MATE_GROUP_ID is required. \
                Set it via: export MATE_GROUP_ID=my-cluster"
            )
        })?;

        let provider_type =
            lookup("MATE_PROVIDER_TYPE").unwrap_or_else(|| "cloudflare".to_string());
        let provider = match provider_type.as_str() {
            "cloudflare" => ProviderConfig::Cloudflare {
                api_token: lookup("MATE_PROVIDER_API_TOKEN").unwrap_or_default(),
                account_id: lookup("MATE_PROVIDER_ACCOUNT_ID").filter(|id| !id.is_empty()),
            },
            "memory" => ProviderConfig::Memory {
                zones: lookup("MATE_MEMORY_ZONES")
                    .unwrap_or_default()
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            other => anyhow::bail!(
                "MATE_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare, memory",
                other
            ),
        };

        let consumer = match lookup("MATE_CONSUMER") {
            Some(value) => value.parse::<ConsumerKind>()?,
            None => ConsumerKind::default(),
        };

        let mut engine = EngineConfig::default();
        if let Some(value) = lookup("MATE_SYNC_INTERVAL_SECS") {
            engine.sync_interval_secs = value.parse().map_err(|_| {
                anyhow::anyhow!(
                    "MATE_SYNC_INTERVAL_SECS must be a number of seconds. Got: {}",
                    value
                )
            })?;
        }

        Ok(MateConfig {
            group_id,
            provider,
            consumer,
            engine,
        })
    }

    /// Validate the configuration
    ///
    /// `registry` is consulted so that a provider type nothing registered
    /// (a feature compiled out, a typo in a config file) fails at startup.
    fn validate(&self, registry: &ProviderRegistry) -> Result<()> {
        self.mate.validate()?;

        if self.endpoints_file.as_ref().is_none_or(|p| p.as_os_str().is_empty()) {
            anyhow::bail!(
                "MATE_ENDPOINTS_FILE is required. \
                Set it via: export MATE_ENDPOINTS_FILE=/var/lib/mate/endpoints.json"
            );
        }

        // The stdout consumer never builds a provider
        if self.mate.consumer == ConsumerKind::Reconcile {
            let provider_type = self.mate.provider.type_name();
            if !registry.has_provider(provider_type) {
                anyhow::bail!(
                    "Provider type '{}' is not available. Registered providers: {}",
                    provider_type,
                    registry.list_providers().join(", ")
                );
            }

            if let ProviderConfig::Cloudflare { api_token, .. } = &self.mate.provider {
                Self::validate_api_token(api_token)?;
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "MATE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Catch obviously wrong tokens before the first API call
    fn validate_api_token(api_token: &str) -> Result<()> {
        // Cloudflare API tokens are 40 characters
        if api_token.len() < 20 {
            anyhow::bail!(
                "MATE_PROVIDER_API_TOKEN appears too short ({} chars). \
                Cloudflare tokens are typically 40 characters. \
                Verify your token is correct.",
                api_token.len()
            );
        }

        let token_lower = api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("example")
        {
            anyhow::bail!(
                "MATE_PROVIDER_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your DNS provider."
            );
        }

        Ok(())
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Registry holding every provider compiled into this binary
fn build_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    mate_core::register_builtin(&registry);

    #[cfg(feature = "cloudflare")]
    mate_provider_cloudflare::register(&registry);

    registry
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return MateExitCode::ConfigError.into();
        }
    };

    let registry = build_registry();

    if let Err(e) = config.validate(&registry) {
        eprintln!("Configuration validation error: {}", e);
        return MateExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return MateExitCode::ConfigError.into();
    }

    info!("Starting mated daemon");
    info!(
        "Configuration loaded: group {}, provider {}, consumer {:?}",
        config.mate.group_id,
        config.mate.provider.type_name(),
        config.mate.consumer
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return MateExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config, registry).await {
            error!("Daemon error: {}", e);
            MateExitCode::RuntimeError
        } else {
            MateExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config, registry: ProviderRegistry) -> Result<()> {
    let consumer: Box<dyn Consumer> = match config.mate.consumer {
        ConsumerKind::Stdout => Box::new(StdoutConsumer::new()),
        ConsumerKind::Reconcile => {
            let provider = registry.create_provider(&config.mate.provider)?;
            info!("Using provider: {}", provider.provider_name());

            let (reconciler, events) = Reconciler::new(provider, &config.mate)?;
            info!("Ownership tag: {}", reconciler.ownership_tag());
            tokio::spawn(log_events(events));
            Box::new(reconciler)
        }
    };

    let endpoints_file = config
        .endpoints_file
        .ok_or_else(|| anyhow::anyhow!("MATE_ENDPOINTS_FILE is required"))?;
    info!("Reading endpoints from {}", endpoints_file.display());
    let source = FileEndpointSource::new(endpoints_file);

    let controller = Controller::new(
        Box::new(source),
        consumer,
        Duration::from_secs(config.mate.engine.sync_interval_secs),
    );

    let signal = shutdown_signal()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let name = signal.await;
        info!("Received shutdown signal: {}", name);
        let _ = shutdown_tx.send(());
    });

    controller.run_with_shutdown(Some(shutdown_rx)).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Turn reconcile events into log lines
async fn log_events(mut events: mpsc::Receiver<ReconcileEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ReconcileEvent::SyncStarted { endpoints } => {
                debug!("Sync started with {} endpoint(s)", endpoints);
            }
            ReconcileEvent::EndpointSkipped { name, reason } => {
                debug!("Skipped {}: {:?}", name, reason);
            }
            ReconcileEvent::ZoneApplied {
                zone_id,
                creates,
                upserts,
                deletes,
            } => {
                info!(
                    "Zone {} changed: +{} ~{} -{}",
                    zone_id, creates, upserts, deletes
                );
            }
            ReconcileEvent::ZoneFailed { zone_id, error } => {
                warn!("Zone {} failed: {}", zone_id, error);
            }
            ReconcileEvent::SyncFinished {
                zones_changed,
                zones_failed,
                finished_at,
            } => {
                info!(
                    "Sync finished at {}: {} zone(s) changed, {} failed",
                    finished_at, zones_changed, zones_failed
                );
            }
            ReconcileEvent::Processed { name, zone_id } => {
                info!("Created {} in zone {}", name, zone_id);
            }
        }
    }
}

/// Future resolving to the name of the first SIGTERM or SIGINT received
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Fallback for non-Unix platforms: CTRL-C only
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    })
}
