use std::io::{self, Stderr};

use tracing_subscriber::{layer::Layer, registry::LookupSpan};

use crate::logging::{
    config::LoggingConfig,
    formatter::{build_layer, FormatOptions},
};

/// Console layer с конфигурацией.
///
/// Пишет в stderr: stdout занят выводом команд CLI.
pub fn layer_with_config<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let writer: fn() -> Stderr = io::stderr;
    let options = FormatOptions {
        format: config.console_format(),
        with_ansi: config.console.with_ansi,
        with_target: config.console.with_target,
        with_line_numbers: config.console.with_line_numbers,
    };
    build_layer(options, writer)
}

#[cfg(test)]
mod tests {
    use tracing::info;
    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;
    use crate::logging::config::{ConsoleConfig, LogFormat};

    /// Тест проверяет, что layer строится для всех форматов и логирование
    /// через него не паникует.
    #[test]
    fn test_layer_with_config_all_formats() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            let cfg = LoggingConfig {
                console: ConsoleConfig {
                    format,
                    with_ansi: false,
                    ..Default::default()
                },
                ..Default::default()
            };
            let subscriber = Registry::default().with(layer_with_config(&cfg));
            tracing::subscriber::with_default(subscriber, || {
                info!(format = %format, "console layer smoke test");
            });
        }
    }
}
