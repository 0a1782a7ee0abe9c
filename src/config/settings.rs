use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use lineage_error::{CodecResult, LineageResult, ResultExt};
use serde::{Deserialize, Serialize};

use crate::{
    codec::{DocumentFormat, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH},
    facade::SessionOptions,
    logging::LoggingConfig,
    stream::{Compression, CompressionKind, DocumentKind},
};

/// Имя файла конфигурации, который ищется в текущем каталоге.
pub const DEFAULT_CONFIG_NAME: &str = "lineage";
/// Префикс переменных окружения: `LINEAGE_FORMAT`, `LINEAGE_LOGGING__LEVEL`.
pub const ENV_PREFIX: &str = "LINEAGE";

/// Настройки приложения.
///
/// Источники по возрастанию приоритета: значения по умолчанию, файл
/// `lineage.toml` (или явно указанный), переменные окружения `LINEAGE_*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub format: DocumentFormat,
    pub compression: CompressionKind,
    /// Уровень сжатия; `None` - уровень алгоритма по умолчанию
    pub compression_level: Option<i32>,
    pub detect_compression: bool,
    pub max_depth: usize,
    pub buffer_size: usize,
    pub pretty_json: bool,
    pub xml_indent: usize,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: DocumentFormat::Xml,
            compression: CompressionKind::None,
            compression_level: None,
            detect_compression: true,
            max_depth: DEFAULT_MAX_DEPTH,
            buffer_size: DEFAULT_BUFFER_SIZE,
            pretty_json: false,
            xml_indent: 2,
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Загружает настройки.
    ///
    /// Явно указанный файл обязан существовать; `lineage.toml` в текущем
    /// каталоге необязателен.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(
        path: Option<&Path>,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let cfg = Config::builder()
            .set_default("format", DocumentFormat::Xml.name())?
            .set_default("compression", CompressionKind::None.to_string())?
            .set_default("detect_compression", true)?
            .set_default("max_depth", DEFAULT_MAX_DEPTH as u64)?
            .set_default("buffer_size", DEFAULT_BUFFER_SIZE as u64)?
            .add_source(file)
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }

    /// Параметры сессии по настройкам.
    pub fn session_options(&self) -> CodecResult<SessionOptions> {
        Ok(SessionOptions {
            format: self.format,
            compression: Compression::from_kind(self.compression, self.compression_level)?,
            detect_compression: self.detect_compression,
            max_depth: self.max_depth,
            buffer_size: self.buffer_size,
            pretty_json: self.pretty_json,
            xml_indent: self.xml_indent,
        })
    }

    /// Параметры сессии для файла.
    ///
    /// Формат берётся из расширения, сжатие - из суффикса `.gz`/`.zst`, а
    /// без суффикса - из настроек. Путь без известного расширения оставляет
    /// настройки как есть.
    pub fn session_options_for(
        &self,
        path: &Path,
    ) -> CodecResult<SessionOptions> {
        let options = self.session_options()?;
        let Ok(kind) = DocumentKind::from_path(path) else {
            return Ok(options);
        };
        let compression = match kind.compression.kind() {
            CompressionKind::None => options.compression,
            k => Compression::from_kind(k, self.compression_level)?,
        };
        Ok(options.with_kind(DocumentKind::new(kind.format, compression)))
    }

    pub fn validate(&self) -> LineageResult<()> {
        self.logging.validate()?;
        self.session_options()
            .and_then(|options| options.validate())
            .context("validating settings")?;
        Ok(())
    }
}
