use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling::daily};
use tracing_subscriber::{layer::Layer, registry::LookupSpan};

use crate::logging::{
    config::LoggingConfig,
    formatter::{build_layer, FormatOptions},
};

/// File layer с ежедневной ротацией и неблокирующей записью.
///
/// Guard нужно держать до завершения программы, иначе хвост логов
/// потеряется.
pub fn layer_with_config<S>(config: &LoggingConfig) -> (Box<dyn Layer<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = daily(&config.log_dir, &config.file.file_name);
    let (writer, guard) = non_blocking(appender);
    let options = FormatOptions {
        format: config.file.format,
        with_ansi: false,
        with_target: true,
        with_line_numbers: true,
    };
    (build_layer(options, writer), guard)
}
