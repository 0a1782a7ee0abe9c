use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Код статуса ошибки.
///
/// Тысячи задают категорию (см. [`Category`]): 1xxx общие, 2xxx входные
/// данные вызывающей стороны, 3xxx документ, 4xxx сжатый поток, 6xxx
/// ввод-вывод.
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    Success = 0,

    Unknown = 1000,
    Internal = 1001,
    InvalidArgs = 1002,

    ValidationFailed = 2001,

    DecodingError = 3001,
    TypeError = 3002,
    InvalidUtf8 = 3003,

    CorruptedStream = 4002,

    Io = 6000,
    NotFound = 6001,
    PermissionDenied = 6002,
    UnexpectedEof = 6003,
}

/// Категория кода статуса.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Success,
    General,
    Input,
    Document,
    Compression,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    pub fn category(self) -> Category {
        match self.code() / 1000 {
            0 => Category::Success,
            2 => Category::Input,
            3 => Category::Document,
            4 => Category::Compression,
            6 => Category::Io,
            _ => Category::General,
        }
    }

    /// Ошибка во входных данных вызывающей стороны: исправляется без
    /// изменения документа или окружения.
    pub fn is_client_error(self) -> bool {
        self.category() == Category::Input || self == Self::InvalidArgs
    }

    /// Документ или сжатый поток повреждён либо не того формата.
    pub fn is_format_error(self) -> bool {
        matches!(self.category(), Category::Document | Category::Compression)
    }

    pub fn is_critical(self) -> bool {
        matches!(self, Self::Internal | Self::Unknown)
    }

    pub fn log_level(self) -> LogLevel {
        match self.category() {
            Category::Success => LogLevel::Trace,
            Category::Input => LogLevel::Info,
            Category::Document | Category::Compression | Category::Io => LogLevel::Warn,
            Category::General if self.is_critical() => LogLevel::Error,
            Category::General => LogLevel::Info,
        }
    }
}

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        let name: &str = self.as_ref();
        #[cfg(not(feature = "strum"))]
        let name = format!("{self:?}");
        write!(f, "{name} ({})", self.code())
    }
}
