use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
};

use lineage_error::{CodecError, CodecResult};

use super::compression::Compression;
use crate::codec::DocumentFormat;

/// Формат документа и сжатие, выведенные из имени файла.
///
/// `people.xml` - XML без сжатия, `people.json.gz` - JSON в gzip,
/// `people.xml.zst` - XML в zstd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentKind {
    pub format: DocumentFormat,
    pub compression: Compression,
}

impl DocumentKind {
    pub fn new(
        format: DocumentFormat,
        compression: Compression,
    ) -> Self {
        Self {
            format,
            compression,
        }
    }

    /// Определяет формат и сжатие по расширениям пути.
    pub fn from_path(path: &Path) -> CodecResult<Self> {
        let (compression, rest): (Compression, PathBuf) = match extension(path).as_deref() {
            Some("gz") | Some("gzip") => (Compression::gzip(), path.with_extension("")),
            Some("zst") | Some("zstd") => (Compression::zstd(), path.with_extension("")),
            _ => (Compression::None, path.to_path_buf()),
        };

        let format = extension(&rest)
            .as_deref()
            .and_then(DocumentFormat::from_extension)
            .ok_or_else(|| {
                CodecError::validation(format!(
                    "cannot infer document format from `{}` (expected .xml or .json)",
                    path.display()
                ))
            })?;

        Ok(Self::new(format, compression))
    }

    /// Имя файла для указанного stem.
    pub fn file_name(
        &self,
        stem: &str,
    ) -> String {
        match self.compression.extension() {
            Some(ext) => format!("{stem}.{}.{ext}", self.format.extension()),
            None => format!("{stem}.{}", self.format.extension()),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.compression {
            Compression::None => write!(f, "{}", self.format),
            c => write!(f, "{}+{}", self.format, c.name()),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        let cases = [
            ("people.xml", DocumentFormat::Xml, Compression::None),
            ("people.JSON", DocumentFormat::Json, Compression::None),
            ("out/people.xml.gz", DocumentFormat::Xml, Compression::gzip()),
            ("people.json.zst", DocumentFormat::Json, Compression::zstd()),
        ];
        for (path, format, compression) in cases {
            let kind = DocumentKind::from_path(Path::new(path)).unwrap();
            assert_eq!(kind, DocumentKind::new(format, compression), "{path}");
        }
    }

    #[test]
    fn test_from_path_unknown() {
        for path in ["people.txt", "people.gz", "people"] {
            let err = DocumentKind::from_path(Path::new(path)).unwrap_err();
            assert!(err.is_validation(), "{path}");
        }
    }

    #[test]
    fn test_file_name_and_display() {
        let kind = DocumentKind::new(DocumentFormat::Json, Compression::gzip());
        assert_eq!(kind.file_name("people"), "people.json.gz");
        assert_eq!(kind.to_string(), "json+gzip");
        let plain = DocumentKind::new(DocumentFormat::Xml, Compression::None);
        assert_eq!(plain.file_name("people"), "people.xml");
        assert_eq!(plain.to_string(), "xml");
    }
}
