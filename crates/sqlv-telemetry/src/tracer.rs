//! Tracer setup and management

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use sqlv_core::ObservabilityConfig;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Global tracer provider holder
static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Global span processor builders (registered before initialization)
type ProcessorBuilder = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;
static SPAN_PROCESSOR_BUILDERS: Mutex<Option<Vec<ProcessorBuilder>>> = Mutex::new(Some(Vec::new()));

/// Register a span processor builder to be used when telemetry is initialized.
///
/// Must be called BEFORE `init_telemetry()`; later registrations are ignored
/// with a warning.
pub fn register_span_processor(builder: ProcessorBuilder) {
    let mut builders = match SPAN_PROCESSOR_BUILDERS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(ref mut vec) = *builders {
        vec.push(builder);
    } else {
        tracing::warn!("Attempted to register span processor after telemetry initialization");
    }
}

/// Initialize logging and tracing.
///
/// This sets up:
/// - An `EnvFilter` from `RUST_LOG`, falling back to `config.log_level`
/// - A tracer provider with any registered span processors
/// - Plain or JSON structured log output
///
/// Returns an error when a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use sqlv_core::ObservabilityConfig;
/// use sqlv_telemetry::init_telemetry;
///
/// init_telemetry(&ObservabilityConfig::default()).ok();
/// ```
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    // Take the span processor builders (can only initialize once)
    let builders = match SPAN_PROCESSOR_BUILDERS.lock() {
        Ok(mut guard) => guard.take().unwrap_or_default(),
        Err(poisoned) => poisoned.into_inner().take().unwrap_or_default(),
    };

    let mut provider_builder = TracerProvider::builder();
    for builder in builders {
        provider_builder = provider_builder.with_span_processor(builder());
    }
    let tracer_provider = provider_builder.build();

    let service_name = config
        .service_name
        .clone()
        .unwrap_or_else(|| crate::attributes::SYSTEM_NAME.to_string());
    let tracer = tracer_provider.tracer(service_name);

    let _ = TRACER_PROVIDER.set(Arc::new(tracer_provider));

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let json_layer = config.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
    });
    let plain_layer = (!config.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(json_layer)
        .with(plain_layer)
        .with(filter)
        .try_init()
}

/// Get the global tracer provider if initialized
pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    TRACER_PROVIDER.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let config = ObservabilityConfig::default();
        // The first call may also fail if another test installed a subscriber.
        let _ = init_telemetry(&config);
        assert!(init_telemetry(&config).is_err());
        assert!(tracer_provider().is_some());
    }
}
