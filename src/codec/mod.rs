//! Кодеки документов: XML и JSON представления последовательности людей.
//!
//! Оба кодека реализуют трейт [`Codec`] и работают с произвольными
//! `Write`/`Read`, не зная о сжатии: сжатие добавляет модуль `stream`.
//!
//! # Формат
//!
//! Документ хранит упорядоченную последовательность [`Person`] верхнего
//! уровня, дети каждого человека вложены рекурсивно. Имена тегов/ключей
//! описаны в [`tags`].

pub mod fields;
pub mod json;
pub mod streaming;
pub mod tags;
pub mod xml;

use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};

pub use json::JsonCodec;
use lineage_error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};
pub use streaming::*;
pub use tags::*;
pub use xml::XmlCodec;

use crate::model::Person;

/// Предел вложенности по умолчанию.
pub const DEFAULT_MAX_DEPTH: usize = 64;
/// Предел вложенности JSON документа.
///
/// serde_json ограничивает вложенность 128 уровнями, а каждый уровень людей
/// занимает два: объект человека и массив `Children`.
pub const JSON_MAX_DEPTH: usize = 63;
/// Размер буфера чтения по умолчанию (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Формат документа.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Xml,
    Json,
}

/// Кодек документа: запись и чтение последовательности людей.
pub trait Codec {
    fn format(&self) -> DocumentFormat;

    /// Пишет документ в `sink` и возвращает кол-во записанных байт.
    ///
    /// Кодек не финализирует `sink`: закрытие потока (и сброс сжатия) —
    /// ответственность вызывающего.
    fn encode(
        &self,
        people: &[Person],
        sink: &mut dyn Write,
    ) -> CodecResult<u64>;

    /// Читает документ целиком из `source`.
    ///
    /// Если задан `expected`, несовпадение кол-ва людей верхнего уровня —
    /// ошибка декодирования.
    fn decode(
        &self,
        source: &mut dyn io::Read,
        expected: Option<usize>,
    ) -> CodecResult<Vec<Person>>;
}

/// Writer обёртка, считающая записанные байты.
pub struct CountingWrite<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl DocumentFormat {
    /// Короткое имя формата для сообщений об ошибках.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.name()
    }

    /// Наибольшая глубина, которую формат запишет и прочитает обратно.
    pub fn depth_limit(
        &self,
        max_depth: usize,
    ) -> usize {
        match self {
            Self::Xml => max_depth,
            Self::Json => max_depth.min(JSON_MAX_DEPTH),
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xml" => Some(Self::Xml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown document format `{s}`"))
    }
}

impl<W: Write> CountingWrite<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWrite<W> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Сверяет кол-во прочитанных людей верхнего уровня с ожидаемым.
pub(crate) fn check_expected(
    format: DocumentFormat,
    expected: Option<usize>,
    got: usize,
) -> CodecResult<()> {
    match expected {
        Some(n) if n != got => Err(CodecError::decode(
            format.name(),
            format!("expected {n} top-level records, found {got}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_format_parse_and_display() {
        assert_eq!("XML".parse::<DocumentFormat>().unwrap(), DocumentFormat::Xml);
        assert_eq!("json".parse::<DocumentFormat>().unwrap(), DocumentFormat::Json);
        assert!("yaml".parse::<DocumentFormat>().is_err());
        assert_eq!(DocumentFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_depth_limit_per_format() {
        assert_eq!(DocumentFormat::Xml.depth_limit(DEFAULT_MAX_DEPTH), DEFAULT_MAX_DEPTH);
        assert_eq!(DocumentFormat::Json.depth_limit(DEFAULT_MAX_DEPTH), JSON_MAX_DEPTH);
        assert_eq!(DocumentFormat::Json.depth_limit(10), 10);
    }

    #[test]
    fn test_counting_write() {
        let mut w = CountingWrite::new(Vec::new());
        w.write_all(b"hello").unwrap();
        w.write_all(b", world").unwrap();
        assert_eq!(w.bytes_written(), 12);
        assert_eq!(w.into_inner(), b"hello, world");
    }

    #[test]
    fn test_check_expected() {
        assert!(check_expected(DocumentFormat::Xml, None, 3).is_ok());
        assert!(check_expected(DocumentFormat::Xml, Some(3), 3).is_ok());
        let err = check_expected(DocumentFormat::Json, Some(2), 3).unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("expected 2"));
    }
}
