use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общий интерфейс ошибок крейта.
///
/// Реализуется каждым корневым типом ошибки, чтобы [`StackError`] мог
/// хранить его за `dyn` и отдавать код статуса, сообщения и теги для логов.
///
/// [`StackError`]: crate::StackError
pub trait ErrorExt: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    fn as_any(&self) -> &dyn Any;

    /// Сообщение для пользователя CLI.
    ///
    /// Внутренние ошибки не раскрывают подробностей.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal => {
                "internal error, see the log for details".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Подробное сообщение для логов.
    fn log_message(&self) -> String {
        format!("{self:?}")
    }

    /// Поля для структурированного лога.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().code().to_string()),
        ]
    }

    /// Короткое имя типа без пути модуля.
    fn type_name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }
}
