use std::{any::Any, io};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибка кодирования/декодирования графа людей.
///
/// Каждый вариант соответствует отдельной категории сбоя: нарушение
/// инвариантов модели (до любого I/O), повреждённый документ, значение поля
/// не приводится к своему типу, отказ нижележащего хранилища.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Входные данные нарушают инварианты модели или сессии
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    /// Структурно некорректный документ или усечённый сжатый поток
    #[error("Malformed {format} document: {reason}{}", offset_suffix(.offset))]
    Decode {
        format: &'static str,
        reason: String,
        offset: Option<u64>,
    },

    /// Значение поля не приводится к объявленному типу
    #[error("Field `{field}` cannot be read as {expected}: {raw:?}")]
    TypeMismatch {
        field: String,
        raw: String,
        expected: &'static str,
    },

    /// Отказ sink/source, передаётся без изменений
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

fn offset_suffix(offset: &Option<u64>) -> String {
    match offset {
        Some(o) => format!(" [offset: 0x{o:X}]"),
        None => String::new(),
    }
}

impl CodecError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn decode(
        format: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Decode {
            format,
            reason: reason.into(),
            offset: None,
        }
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        raw: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            raw: raw.into(),
            expected,
        }
    }

    /// Классифицирует ошибку чтения из source.
    ///
    /// `InvalidData`/`UnexpectedEof` означают повреждённый или усечённый
    /// поток (в том числе после распаковки) и становятся `Decode`; остальные
    /// виды остаются `Io`.
    pub fn from_read(
        format: &'static str,
        err: io::Error,
    ) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                Self::decode(format, err.to_string())
            }
            _ => Self::Io(err),
        }
    }

    /// Добавляет контекст offset к ошибке декодирования.
    pub fn with_offset(
        mut self,
        offset: u64,
    ) -> Self {
        if let Self::Decode { offset: o, .. } = &mut self {
            *o = Some(offset);
        }
        self
    }

    /// Возвращает recovery hint для пользователя.
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            Self::Decode { .. } => Some("File may be truncated or not in the expected format"),
            Self::TypeMismatch { .. } => Some("Fix the offending field value in the document"),
            Self::Io(e) if e.kind() == io::ErrorKind::NotFound => {
                Some("Check that the path exists")
            }
            Self::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Some("Check file permissions")
            }
            _ => None,
        }
    }

    /// Можно ли повторить операцию без изменения входных данных.
    ///
    /// Повтор имеет смысл только для временных ошибок ввода-вывода.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl ErrorExt for CodecError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::ValidationFailed,
            Self::Decode { format, .. } if matches!(*format, "gzip" | "zstd") => {
                StatusCode::CorruptedStream
            }
            Self::Decode { .. } => StatusCode::DecodingError,
            Self::TypeMismatch { .. } => StatusCode::TypeError,
            Self::Io(e) => match e.kind() {
                io::ErrorKind::NotFound => StatusCode::NotFound,
                io::ErrorKind::PermissionDenied => StatusCode::PermissionDenied,
                io::ErrorKind::UnexpectedEof => StatusCode::UnexpectedEof,
                _ => StatusCode::Io,
            },
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn log_message(&self) -> String {
        let mut msg = format!("{self:?}");
        if let Some(hint) = self.recovery_hint() {
            msg.push_str(&format!(" | Hint: {hint}"));
        }
        msg
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().code().to_string()),
        ];

        match self {
            Self::Decode { format, .. } => tags.push(("format", format.to_string())),
            Self::TypeMismatch { field, .. } => tags.push(("field", field.clone())),
            Self::Io(e) => tags.push(("io_kind", format!("{:?}", e.kind()))),
            Self::Validation { .. } => {}
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что ошибки чтения классифицируются по виду:
    /// повреждённые данные — `Decode`, остальное — `Io`.
    #[test]
    fn test_from_read_classification() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated");
        assert!(CodecError::from_read("gzip", eof).is_decode());

        let bad = io::Error::new(io::ErrorKind::InvalidData, "corrupt deflate stream");
        assert!(CodecError::from_read("gzip", bad).is_decode());

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(CodecError::from_read("xml", denied).is_io());
    }

    /// Тест проверяет, что `Io` сохраняет исходный `ErrorKind`.
    #[test]
    fn test_io_is_propagated_unchanged() {
        let err: CodecError = io::Error::new(io::ErrorKind::NotFound, "people.xml").into();
        match &err {
            CodecError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Io, got {other:?}"),
        }
        assert_eq!(err.status_code(), StatusCode::NotFound);
        assert_eq!(err.recovery_hint(), Some("Check that the path exists"));
    }

    #[test]
    fn test_is_recoverable() {
        let timed_out: CodecError = io::Error::new(io::ErrorKind::TimedOut, "slow disk").into();
        assert!(timed_out.is_recoverable());
        let missing: CodecError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(!missing.is_recoverable());
        assert!(!CodecError::validation("depth").is_recoverable());
    }

    #[test]
    fn test_corrupt_compressed_stream_status() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "missing trailer");
        assert_eq!(
            CodecError::from_read("zstd", eof).status_code(),
            StatusCode::CorruptedStream
        );
        assert_eq!(
            CodecError::decode("xml", "unclosed <Person>").status_code(),
            StatusCode::DecodingError
        );
    }

    #[test]
    fn test_status_code_per_variant() {
        let depth = CodecError::validation("nesting depth exceeds limit of 64");
        assert_eq!(depth.status_code(), StatusCode::ValidationFailed);
        assert!(depth.status_code().is_client_error());

        let count = CodecError::decode("json", "expected 2 top-level records, found 3");
        assert_eq!(count.status_code(), StatusCode::DecodingError);
        assert!(count.status_code().is_format_error());
    }

    /// Тест проверяет отображение offset в тексте ошибки декодирования.
    #[test]
    fn test_decode_display_with_offset() {
        let err = CodecError::decode("xml", "unexpected end of element").with_offset(0x2A);
        let text = err.to_string();
        assert!(text.contains("xml"));
        assert!(text.contains("offset: 0x2A"), "got: {text}");
    }

    /// Тест проверяет, что `TypeMismatch` сообщает имя поля и сырое значение.
    #[test]
    fn test_type_mismatch_reports_field_and_raw() {
        let err = CodecError::type_mismatch("Salary", "thirty", "decimal");
        assert_eq!(err.status_code(), StatusCode::TypeError);
        let text = err.to_string();
        assert!(text.contains("Salary"));
        assert!(text.contains("\"thirty\""));
        assert!(err
            .metrics_tags()
            .iter()
            .any(|(k, v)| *k == "field" && v == "Salary"));
    }
}
