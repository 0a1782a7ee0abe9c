use std::{
    fmt, fs,
    path::PathBuf,
    str::FromStr,
};

use lineage_error::{ensure, LineageResult, ResultExt, StatusCode};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Переменная окружения с уровнем логирования.
pub const ENV_LOG_LEVEL: &str = "LINEAGE_LOG_LEVEL";
/// Переменная окружения с каталогом лог-файлов.
pub const ENV_LOG_DIR: &str = "LINEAGE_LOG_DIR";

/// Формат вывода событий.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Настройки вывода в консоль (stderr).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_line_numbers: bool,
}

/// Настройки вывода в файл.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Префикс имени файла; к нему добавляется дата ротации
    pub file_name: String,
    pub format: LogFormat,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень (`info`) или полная директива фильтра (`lineage=debug,warn`)
    pub level: String,
    pub console_enabled: bool,
    pub console: ConsoleConfig,
    pub file_enabled: bool,
    pub file: FileConfig,
    pub log_dir: PathBuf,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            file_name: "lineage.log".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_enabled: true,
            console: ConsoleConfig::default(),
            file_enabled: false,
            file: FileConfig::default(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl LoggingConfig {
    /// Применяет `LINEAGE_LOG_LEVEL` и `LINEAGE_LOG_DIR`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Применяет переопределения из произвольного источника.
    pub fn apply_overrides<F>(
        &mut self,
        lookup: F,
    ) where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.level = level.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|v| !v.trim().is_empty()) {
            self.log_dir = PathBuf::from(dir);
            self.file_enabled = true;
        }
    }

    /// Директива для `EnvFilter`.
    ///
    /// Голый уровень применяется к этому крейту и к `lineage_error`, прочие
    /// крейты логируют только предупреждения.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("warn,lineage={level},lineage_error={level}")
        }
    }

    pub fn console_format(&self) -> LogFormat {
        self.console.format
    }

    pub fn validate(&self) -> LineageResult<()> {
        ensure!(
            !self.level.trim().is_empty(),
            StatusCode::InvalidArgs,
            "log level must not be empty"
        );
        ensure!(
            EnvFilter::try_new(self.build_filter_directive()).is_ok(),
            StatusCode::InvalidArgs,
            "invalid log level or filter directive: {}",
            self.level
        );
        if self.file_enabled {
            ensure!(
                !self.file.file_name.trim().is_empty(),
                StatusCode::InvalidArgs,
                "log file name must not be empty"
            );
        }
        Ok(())
    }

    /// Создаёт каталог логов, если включён вывод в файл.
    pub fn ensure_log_dir(&self) -> LineageResult<()> {
        if self.file_enabled {
            fs::create_dir_all(&self.log_dir)
                .with_context(|| format!("creating log directory {}", self.log_dir.display()))?;
        }
        Ok(())
    }
}

impl LogFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = LoggingConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.console_format(), LogFormat::Compact);
        assert!(!cfg.file_enabled);
    }

    #[test]
    fn test_filter_directive() {
        let mut cfg = LoggingConfig::default();
        cfg.level = "debug".into();
        assert_eq!(
            cfg.build_filter_directive(),
            "warn,lineage=debug,lineage_error=debug"
        );

        cfg.level = "lineage::codec=trace,info".into();
        assert_eq!(cfg.build_filter_directive(), "lineage::codec=trace,info");
    }

    /// Тест проверяет, что переопределения включают файловый вывод и
    /// игнорируют пустые значения.
    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [(ENV_LOG_LEVEL, "trace"), (ENV_LOG_DIR, "/tmp/lineage-logs")]
            .into_iter()
            .collect();
        let mut cfg = LoggingConfig::default();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.level, "trace");
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/lineage-logs"));
        assert!(cfg.file_enabled);

        let mut untouched = LoggingConfig::default();
        untouched.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(untouched, LoggingConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        let cfg = LoggingConfig {
            level: "lineage=loud".into(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);

        let empty = LoggingConfig {
            level: " ".into(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_ensure_log_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            file_enabled: true,
            log_dir: dir.path().join("nested/logs"),
            ..Default::default()
        };
        cfg.ensure_log_dir().unwrap();
        assert!(cfg.log_dir.is_dir());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
