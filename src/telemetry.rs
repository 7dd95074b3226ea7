use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install JSON structured logging. `RUST_LOG` controls the level and falls
/// back to `default_filter`.
///
/// Returns an error if a global subscriber is already set.
pub fn init_telemetry(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialization_is_rejected() {
        // Only one global subscriber per process; whichever call comes second fails
        let _ = init_telemetry("debug");
        assert!(init_telemetry("debug").is_err());
    }
}
