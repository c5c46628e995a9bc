//! Structured logging setup.
//!
//! Logs carry consistent fields so they can be shipped and parsed as-is:
//! - `level`: Log level (trace, debug, info, warn, error)
//! - `subsystem`: Subsystem identifier
//! - `message`: Log message
//! - Additional context fields

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber described by `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| parse_filter(&config.log_level))?;

    if config.json_logs {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.full_service_name(),
        network = %config.network,
        json_logs = config.json_logs,
        "Structured logging initialized"
    );

    Ok(())
}

/// Parse `RUST_LOG`-style directives, e.g. `info,qc_18_invoice_registry=debug`.
fn parse_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Route log output to the test harness. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Log an invoice-related event with standard fields.
#[macro_export]
macro_rules! log_invoice_event {
    ($level:ident, $subsystem:expr, $msg:expr, $payment_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            payment_hash = %$payment_hash,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_logging_is_repeatable() {
        init_test_logging();
        init_test_logging();
        crate::log_invoice_event!(info, "18", "test event", "00ff", amount_msat = 1u64);
    }

    #[test]
    fn test_invalid_log_level_is_config_error() {
        assert!(parse_filter("info,qc_18_invoice_registry=debug").is_ok());
        assert!(matches!(
            parse_filter("qc_18_invoice_registry=loud"),
            Err(TelemetryError::Config(_))
        ));
    }

    #[test]
    fn test_init_logging_refuses_second_subscriber() {
        let mut config = TelemetryConfig {
            subsystem_id: "18".to_string(),
            json_logs: true,
            ..TelemetryConfig::default()
        };

        // Another test may already own the global subscriber
        let _ = init_logging(&config);

        config.json_logs = false;
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::LoggerInit(_))
        ));
    }
}
