// System
use std::time::Duration;

// Third Party
use kube::error::ErrorResponse;
use tracing_subscriber::EnvFilter;

/// Name of the NetworkPolicy created in every new namespace.
pub const DEFAULT_POLICY_NAME: &str = "default";

/// Number of added namespaces that may wait between the watcher and the reconciler.
pub const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Lower bound of the randomized per-attempt watch timeout.
pub const DEFAULT_MIN_WATCH_TIMEOUT: Duration = Duration::from_secs(120);

/// The API server caps watch timeouts; kube refuses `WatchParams::timeout` values at or above this.
pub const MAX_WATCH_TIMEOUT_SECS: u64 = 295;

/// Set up a `fmt` subscriber. `RUST_LOG` wins over the default `<target>=<level>` directive.
pub fn init_tracing(target: &str, level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", target, level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Convenience function for synthesising a `kube::Error::Api` when the server response is
/// unusable but the caller expects an API error.
pub fn generate_error_response(reason: &str, message: &str, code: u16) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    })
}
