use std::{fmt, panic::Location, sync::Arc};

use crate::{CodecError, ErrorExt, LogLevel, StatusCode};

/// Ошибка с корневой причиной и цепочкой контекстов.
///
/// Корень - ошибка нижнего слоя (чаще всего [`CodecError`]); каждый слой выше
/// (composer, сессия, CLI) добавляет кадр с описанием своей операции и местом
/// вызова.
#[derive(Clone)]
pub struct StackError {
    root: Arc<dyn ErrorExt>,
    frames: Vec<Frame>,
}

/// Кадр контекста: что делалось и где.
#[derive(Debug, Clone)]
pub struct Frame {
    pub message: String,
    pub location: &'static Location<'static>,
}

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            root: Arc::new(err),
            frames: Vec::new(),
        }
    }

    /// Добавляет кадр контекста; место вызова берётся из `#[track_caller]`.
    #[track_caller]
    pub fn context(
        mut self,
        message: impl Into<String>,
    ) -> Self {
        self.frames.push(Frame {
            message: message.into(),
            location: Location::caller(),
        });
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.root.status_code()
    }

    pub fn root(&self) -> &dyn ErrorExt {
        self.root.as_ref()
    }

    /// Кадры от внутреннего к внешнему.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn downcast_ref<T: ErrorExt>(&self) -> Option<&T> {
        self.root.as_any().downcast_ref::<T>()
    }

    /// Корневая ошибка кодека, если причина в нём.
    pub fn codec(&self) -> Option<&CodecError> {
        self.downcast_ref::<CodecError>()
    }

    pub fn client_message(&self) -> String {
        self.root.client_message()
    }

    pub fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Многострочный отчёт для вывода в терминал: корень, затем кадры от
    /// внешнего к внутреннему с местом вызова.
    pub fn report(&self) -> String {
        let mut out = format!("error: {}", self.root);
        for frame in self.frames.iter().rev() {
            out.push_str(&format!(
                "\n  while {} ({}:{})",
                frame.message,
                frame.location.file(),
                frame.location.line()
            ));
        }
        out
    }
}

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("StackError")
            .field("root", &self.root.log_message())
            .field("status_code", &self.status_code())
            .field("frames", &self.frames)
            .finish()
    }
}

/// Внешний контекст первым: `saving a.xml: validating: Validation failed: ...`.
impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for frame in self.frames.iter().rev() {
            write!(f, "{}: ", frame.message)?;
        }
        write!(f, "{}", self.root)
    }
}

impl std::error::Error for StackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.root.as_ref())
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

impl From<StackError> for std::io::Error {
    fn from(e: StackError) -> Self {
        match e.codec() {
            Some(CodecError::Io(inner)) => std::io::Error::new(inner.kind(), e.to_string()),
            _ => std::io::Error::other(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_frames_order_and_display() {
        let stack = StackError::new(CodecError::validation("salary is negative"))
            .context("validating people")
            .context("saving people.xml");

        assert_eq!(stack.frames().len(), 2);
        assert_eq!(stack.frames()[0].message, "validating people");
        assert!(stack.frames()[0].location.file().ends_with("stack.rs"));
        assert_eq!(
            stack.to_string(),
            "saving people.xml: validating people: Validation failed: salary is negative"
        );
    }

    #[test]
    fn test_codec_accessor() {
        let stack = StackError::new(CodecError::decode("json", "unexpected token"));
        assert!(matches!(stack.codec(), Some(CodecError::Decode { .. })));
        assert_eq!(stack.status_code(), StatusCode::DecodingError);
        assert!(!stack.is_client_error());
    }

    /// Тест проверяет, что отчёт начинается с корня и перечисляет кадры от
    /// внешнего к внутреннему.
    #[test]
    fn test_report() {
        let stack = StackError::new(CodecError::type_mismatch("Salary", "abc", "decimal"))
            .context("decoding")
            .context("loading people.json");

        let report = stack.report();
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("error: Field `Salary`"));
        assert!(lines[1].contains("while loading people.json"));
        assert!(lines[2].contains("while decoding"));
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let stack = StackError::new(CodecError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "people.xml",
        )))
        .context("opening people.xml");

        let err: io::Error = stack.into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().starts_with("opening people.xml"));
    }
}
