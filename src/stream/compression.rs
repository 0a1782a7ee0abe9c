//! Алгоритмы сжатия потока документа: gzip и zstd.
//!
//! Содержит выбор алгоритма, проверку уровней, определение алгоритма по
//! magic-префиксу и функции сжатия/распаковки блока в памяти.

use std::{
    fmt,
    io::{self, Read},
    str::FromStr,
};

use flate2::read::{GzDecoder, GzEncoder};
use lineage_error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};

/// Magic-префикс gzip потока.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// Magic-префикс zstd фрейма.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Уровень gzip по умолчанию.
pub const DEFAULT_GZIP_LEVEL: u32 = 6;
/// Уровень zstd по умолчанию: баланс между скоростью и размером.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Алгоритм сжатия без уровня (для конфигурации и CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    #[default]
    None,
    Gzip,
    Zstd,
}

/// Сжатие потока вместе с уровнем.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    /// gzip, уровень 0..=9
    Gzip { level: u32 },
    /// zstd, уровень 1..=22
    Zstd { level: i32 },
}

impl CompressionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            "zstd" | "zst" => Ok(Self::Zstd),
            other => Err(format!("unknown compression `{other}`")),
        }
    }
}

impl Compression {
    /// Собирает сжатие из алгоритма и необязательного уровня.
    ///
    /// Уровень вне диапазона алгоритма - ошибка валидации.
    pub fn from_kind(
        kind: CompressionKind,
        level: Option<i32>,
    ) -> CodecResult<Self> {
        let compression = match kind {
            CompressionKind::None => Self::None,
            CompressionKind::Gzip => {
                let level = level.unwrap_or(DEFAULT_GZIP_LEVEL as i32);
                let level = u32::try_from(level).map_err(|_| {
                    CodecError::validation(format!("gzip level must be 0..=9, got {level}"))
                })?;
                Self::Gzip { level }
            }
            CompressionKind::Zstd => Self::Zstd {
                level: level.unwrap_or(DEFAULT_ZSTD_LEVEL),
            },
        };
        compression.validate()?;
        Ok(compression)
    }

    pub fn gzip() -> Self {
        Self::Gzip {
            level: DEFAULT_GZIP_LEVEL,
        }
    }

    pub fn zstd() -> Self {
        Self::Zstd {
            level: DEFAULT_ZSTD_LEVEL,
        }
    }

    pub fn kind(&self) -> CompressionKind {
        match self {
            Self::None => CompressionKind::None,
            Self::Gzip { .. } => CompressionKind::Gzip,
            Self::Zstd { .. } => CompressionKind::Zstd,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Расширение файла без точки (`None` для несжатого потока).
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gzip { .. } => Some("gz"),
            Self::Zstd { .. } => Some("zst"),
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn validate(&self) -> CodecResult<()> {
        match *self {
            Self::Gzip { level } if level > 9 => Err(CodecError::validation(format!(
                "gzip level must be 0..=9, got {level}"
            ))),
            Self::Zstd { level } if !(1..=22).contains(&level) => Err(CodecError::validation(
                format!("zstd level must be 1..=22, got {level}"),
            )),
            _ => Ok(()),
        }
    }

    /// Определяет алгоритм по первым байтам потока.
    ///
    /// Уровень для распаковки не важен, возвращается уровень по умолчанию.
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(&ZSTD_MAGIC) {
            Self::zstd()
        } else if prefix.starts_with(&GZIP_MAGIC) {
            Self::gzip()
        } else {
            Self::None
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Gzip { level } => write!(f, "gzip (level {level})"),
            Self::Zstd { level } => write!(f, "zstd (level {level})"),
        }
    }
}

/// Сжимает блок в памяти.
pub fn compress_block(
    data: &[u8],
    compression: Compression,
) -> io::Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip { level } => {
            let mut out = Vec::new();
            GzEncoder::new(data, flate2::Compression::new(level)).read_to_end(&mut out)?;
            Ok(out)
        }
        Compression::Zstd { level } => zstd::stream::encode_all(data, level),
    }
}

/// Распаковывает блок в памяти.
///
/// Повреждённый или усечённый блок даёт `InvalidData`.
pub fn decompress_block(
    data: &[u8],
    compression: Compression,
) -> io::Result<Vec<u8>> {
    let result = match compression {
        Compression::None => return Ok(data.to_vec()),
        Compression::Gzip { .. } => {
            let mut out = Vec::new();
            GzDecoder::new(data).read_to_end(&mut out).map(|_| out)
        }
        Compression::Zstd { .. } => zstd::stream::decode_all(data),
    };
    result.map_err(|e| corrupt_stream(compression, e))
}

/// Приводит ошибку распаковщика к `InvalidData`; ошибки нижнего source
/// (например, `PermissionDenied`) остаются как есть. zstd сообщает о
/// повреждённом фрейме как `Other`.
pub(crate) fn corrupt_stream(
    compression: Compression,
    err: io::Error,
) -> io::Error {
    match err.kind() {
        io::ErrorKind::InvalidInput
        | io::ErrorKind::InvalidData
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::Other => io::Error::new(
            io::ErrorKind::InvalidData,
            format!("corrupt {} stream: {err}", compression.name()),
        ),
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_magic() {
        assert_eq!(Compression::detect(&[0x1f, 0x8b, 0x08]), Compression::gzip());
        assert_eq!(
            Compression::detect(&[0x28, 0xb5, 0x2f, 0xfd, 0x00]),
            Compression::zstd()
        );
        assert_eq!(Compression::detect(b"<?xml"), Compression::None);
        assert_eq!(Compression::detect(b"["), Compression::None);
        assert_eq!(Compression::detect(&[]), Compression::None);
    }

    #[test]
    fn test_from_kind_and_levels() {
        assert_eq!(
            Compression::from_kind(CompressionKind::Gzip, None).unwrap(),
            Compression::Gzip { level: 6 }
        );
        assert_eq!(
            Compression::from_kind(CompressionKind::Zstd, Some(19)).unwrap(),
            Compression::Zstd { level: 19 }
        );
        assert!(Compression::from_kind(CompressionKind::Gzip, Some(10))
            .unwrap_err()
            .is_validation());
        assert!(Compression::from_kind(CompressionKind::Gzip, Some(-1)).is_err());
        assert!(Compression::from_kind(CompressionKind::Zstd, Some(0)).is_err());
        assert_eq!(
            Compression::from_kind(CompressionKind::None, Some(99)).unwrap(),
            Compression::None
        );
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("GZ".parse::<CompressionKind>().unwrap(), CompressionKind::Gzip);
        assert_eq!("zstd".parse::<CompressionKind>().unwrap(), CompressionKind::Zstd);
        assert!("lz4".parse::<CompressionKind>().is_err());
    }

    /// Тест проверяет сжатие и распаковку блока обоими алгоритмами.
    #[test]
    fn test_block_roundtrip() {
        let data = b"<ArrayOfPerson></ArrayOfPerson>".repeat(20);
        for c in [Compression::None, Compression::gzip(), Compression::zstd()] {
            let packed = compress_block(&data, c).unwrap();
            assert_eq!(Compression::detect(&packed).kind(), c.kind());
            assert_eq!(decompress_block(&packed, c).unwrap(), data);
        }
    }

    #[test]
    fn test_truncated_block_is_invalid_data() {
        let data = b"some payload that is long enough to compress".repeat(10);
        for c in [Compression::gzip(), Compression::zstd()] {
            let packed = compress_block(&data, c).unwrap();
            let cut = &packed[..packed.len() - 6];
            let err = decompress_block(cut, c).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData, "{c}");
        }
    }
}
