pub mod api; // REST client + endpoint traits
pub mod chat; // Chat consultation flow
pub mod config;
pub mod gate; // Role-gated navigation
pub mod models;
pub mod notify;
pub mod review; // Doctor report review
pub mod scope;
pub mod session; // Token + profile store

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
