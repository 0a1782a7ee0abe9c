pub mod codec_error;

pub use codec_error::*;
use thiserror::Error;

use crate::{ErrorExt, StackError, StatusCode};

/// Ошибка без собственного типа: код статуса и текст.
///
/// Используется макросами `bail!`/`ensure!` для проверок конфигурации и
/// аргументов CLI.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GenericError {
    code: StatusCode,
    message: String,
}

impl GenericError {
    pub fn new(
        code: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ErrorExt for GenericError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Ошибка ввода-вывода становится `CodecError::Io` с исходным `ErrorKind`.
impl From<std::io::Error> for StackError {
    fn from(err: std::io::Error) -> Self {
        StackError::new(CodecError::Io(err))
    }
}

impl From<std::string::FromUtf8Error> for StackError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        StackError::new(GenericError::new(
            StatusCode::InvalidUtf8,
            format!("document is not valid UTF-8: {err}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_generic_error() {
        let err = GenericError::new(StatusCode::InvalidArgs, "unknown log format `xml`");
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
        assert_eq!(err.to_string(), "unknown log format `xml`");
        assert_eq!(err.message(), err.to_string());
    }

    /// Тест проверяет, что `io::Error` доходит до `StackError` как
    /// `CodecError::Io`, а код статуса следует `ErrorKind`.
    #[test]
    fn test_io_error_kind_mapping() {
        let cases = [
            (io::ErrorKind::NotFound, StatusCode::NotFound),
            (io::ErrorKind::PermissionDenied, StatusCode::PermissionDenied),
            (io::ErrorKind::UnexpectedEof, StatusCode::UnexpectedEof),
            (io::ErrorKind::Other, StatusCode::Io),
        ];

        for (kind, expected) in cases {
            let stack: StackError = io::Error::new(kind, "people.xml").into();
            assert_eq!(stack.status_code(), expected, "kind={kind:?}");
            assert!(stack.to_string().contains("people.xml"));
            assert!(matches!(stack.codec(), Some(CodecError::Io(e)) if e.kind() == kind));
        }
    }

    #[test]
    fn test_from_utf8_error() {
        let err = String::from_utf8(vec![0xC3, 0x28]).unwrap_err();
        let stack: StackError = err.into();
        assert_eq!(stack.status_code(), StatusCode::InvalidUtf8);
        assert!(stack.to_string().contains("not valid UTF-8"));
    }
}
