use std::{
    fmt,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use lineage_error::{CodecError, CodecResult, LineageResult, ResultExt};
use tokio::io::{AsyncBufReadExt, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::{
    codec::{
        is_scalar_tag, Codec, CountingWrite, DocumentFormat, JsonCodec, XmlCodec,
        DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH, SCALAR_TAGS,
    },
    model::Person,
    stream::{
        decompress_block, open_compressing, open_decompressing, open_decompressing_detect,
        Compression, DecompressingReader, DocumentKind,
    },
};

/// Состояние сессии.
///
/// `Idle → Encoding → Flushed`, `Idle → Decoding → Complete`; любая ошибка
/// в активном состоянии переводит в `Failed`. Из `Flushed`, `Complete` и
/// `Failed` переходов нет.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Encoding,
    Flushed,
    Decoding,
    Complete,
    Failed,
}

/// Параметры одной операции сохранения или загрузки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub format: DocumentFormat,
    pub compression: Compression,
    /// При чтении определять сжатие по magic-префиксу вместо `compression`
    pub detect_compression: bool,
    pub max_depth: usize,
    pub buffer_size: usize,
    pub pretty_json: bool,
    pub xml_indent: usize,
}

/// Итог записи документа.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeReport {
    /// Байт документа до сжатия
    pub payload_bytes: u64,
    /// Байт, записанных в sink (после сжатия)
    pub stored_bytes: u64,
}

/// Одноразовая сессия сохранения или загрузки документа.
///
/// Сессия проверяет входные данные до любого ввода-вывода, проводит данные
/// через кодек и сжатие и гарантирует финализацию потоков как при успехе,
/// так и при ошибке.
#[derive(Debug)]
pub struct Session {
    options: SessionOptions,
    state: SessionState,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Flushed | Self::Complete | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Encoding => "encoding",
            Self::Flushed => "flushed",
            Self::Decoding => "decoding",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            format: DocumentFormat::Xml,
            compression: Compression::None,
            detect_compression: true,
            max_depth: DEFAULT_MAX_DEPTH,
            buffer_size: DEFAULT_BUFFER_SIZE,
            pretty_json: false,
            xml_indent: 2,
        }
    }
}

impl SessionOptions {
    /// Параметры по умолчанию для формата и сжатия из имени файла.
    pub fn for_path(path: &Path) -> CodecResult<Self> {
        Ok(Self::default().with_kind(DocumentKind::from_path(path)?))
    }

    pub fn with_kind(
        mut self,
        kind: DocumentKind,
    ) -> Self {
        self.format = kind.format;
        self.compression = kind.compression;
        self
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::new(self.format, self.compression)
    }

    /// Предел глубины с учётом ограничения формата.
    pub fn depth_limit(&self) -> usize {
        self.format.depth_limit(self.max_depth)
    }

    pub fn validate(&self) -> CodecResult<()> {
        if self.max_depth == 0 {
            return Err(CodecError::validation("max_depth must be at least 1"));
        }
        if self.buffer_size == 0 {
            return Err(CodecError::validation("buffer_size must be positive"));
        }
        self.compression.validate()
    }

    /// Кодек для выбранного формата.
    pub fn codec(&self) -> Box<dyn Codec + Send + Sync> {
        match self.format {
            DocumentFormat::Xml => Box::new(self.xml_codec()),
            DocumentFormat::Json => Box::new(self.json_codec()),
        }
    }

    fn xml_codec(&self) -> XmlCodec {
        XmlCodec::new()
            .with_indent(self.xml_indent)
            .with_max_depth(self.max_depth)
            .with_buffer_size(self.buffer_size)
    }

    fn json_codec(&self) -> JsonCodec {
        JsonCodec::new()
            .pretty(self.pretty_json)
            .with_max_depth(self.max_depth)
    }
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Пишет документ в sink и возвращает отчёт вместе с sink.
    pub fn encode<W: Write>(
        &mut self,
        people: &[Person],
        sink: W,
    ) -> LineageResult<(EncodeReport, W)> {
        self.begin(SessionState::Encoding)?;
        let validated = self.validate(people);
        self.check(validated)?;

        let (report, sink) = self.encode_stream(people, sink)?;
        self.state = SessionState::Flushed;
        debug!(
            format = %self.options.format,
            payload_bytes = report.payload_bytes,
            stored_bytes = report.stored_bytes,
            "document encoded"
        );
        Ok((report, sink))
    }

    /// Пишет документ в файл, создавая или перезаписывая его.
    pub fn encode_to_path(
        &mut self,
        people: &[Person],
        path: impl AsRef<Path>,
    ) -> LineageResult<EncodeReport> {
        let path = path.as_ref();
        self.begin(SessionState::Encoding)?;
        let validated = check_path(path).and_then(|_| self.validate(people));
        self.check(validated)?;

        let created = File::create(path).map_err(CodecError::from);
        let file = self
            .check(created)
            .with_context(|| format!("creating {}", path.display()))?;
        let sink = BufWriter::with_capacity(self.options.buffer_size, file);

        let (report, sink) = self
            .encode_stream(people, sink)
            .with_context(|| format!("writing {}", path.display()))?;
        let flushed = sink
            .into_inner()
            .map(drop)
            .map_err(|e| CodecError::Io(e.into_error()));
        self.check(flushed)
            .with_context(|| format!("flushing {}", path.display()))?;

        self.state = SessionState::Flushed;
        info!(
            path = %path.display(),
            kind = %self.options.kind(),
            payload_bytes = report.payload_bytes,
            stored_bytes = report.stored_bytes,
            "document saved"
        );
        Ok(report)
    }

    /// Читает документ из source.
    pub fn decode<R: Read>(
        &mut self,
        source: R,
        expected: Option<usize>,
    ) -> LineageResult<Vec<Person>> {
        self.begin(SessionState::Decoding)?;
        let people = self.decode_stream(source, expected)?;
        self.state = SessionState::Complete;
        debug!(people = people.len(), "document decoded");
        Ok(people)
    }

    /// Читает документ из файла.
    pub fn decode_from_path(
        &mut self,
        path: impl AsRef<Path>,
        expected: Option<usize>,
    ) -> LineageResult<Vec<Person>> {
        let path = path.as_ref();
        self.begin(SessionState::Decoding)?;
        let file = self.open_file(path)?;
        let people = self
            .decode_stream(file, expected)
            .with_context(|| format!("reading {}", path.display()))?;

        self.state = SessionState::Complete;
        info!(
            path = %path.display(),
            people = people.len(),
            "document loaded"
        );
        Ok(people)
    }

    /// Асинхронно читает JSON документ из файла.
    ///
    /// Несжатый документ читается потоком; сжатый сначала читается целиком и
    /// распаковывается в памяти.
    pub async fn decode_path_async(
        &mut self,
        path: impl AsRef<Path>,
        expected: Option<usize>,
    ) -> LineageResult<Vec<Person>> {
        let path = path.as_ref();
        self.begin(SessionState::Decoding)?;
        let checked = check_path(path).and_then(|_| {
            if self.options.format == DocumentFormat::Json {
                Ok(())
            } else {
                Err(CodecError::validation(
                    "asynchronous decoding is available for JSON documents only",
                ))
            }
        });
        self.check(checked)?;

        let result = self.read_json_async(path, expected).await;
        let people = self
            .check(result)
            .with_context(|| format!("reading {}", path.display()))?;

        self.state = SessionState::Complete;
        info!(
            path = %path.display(),
            people = people.len(),
            "document loaded asynchronously"
        );
        Ok(people)
    }

    /// Выбирает сырые значения элементов `tag` из XML документа, не собирая
    /// людей.
    ///
    /// `tag` - имя скалярного поля; остальные имена - ошибка валидации.
    pub fn scan<R: Read>(
        &mut self,
        source: R,
        tag: &str,
    ) -> LineageResult<Vec<String>> {
        self.begin(SessionState::Decoding)?;
        let checked = self.check_scan(tag);
        self.check(checked)?;
        let values = self.scan_stream(source, tag)?;
        self.state = SessionState::Complete;
        Ok(values)
    }

    /// Файловый вариант [`Session::scan`].
    pub fn scan_path(
        &mut self,
        path: impl AsRef<Path>,
        tag: &str,
    ) -> LineageResult<Vec<String>> {
        let path = path.as_ref();
        self.begin(SessionState::Decoding)?;
        let checked = self.check_scan(tag);
        self.check(checked)?;
        let file = self.open_file(path)?;
        let values = self
            .scan_stream(file, tag)
            .with_context(|| format!("scanning {}", path.display()))?;

        self.state = SessionState::Complete;
        debug!(path = %path.display(), tag, values = values.len(), "tag scanned");
        Ok(values)
    }

    /// Передаёт людей верхнего уровня из файла в callback.
    ///
    /// XML разбирается потоком, по одному человеку верхнего уровня за раз;
    /// JSON декодируется целиком. Возвращает кол-во людей.
    pub fn visit_path<F>(
        &mut self,
        path: impl AsRef<Path>,
        mut callback: F,
    ) -> LineageResult<u64>
    where
        F: FnMut(usize, Person) -> CodecResult<()>,
    {
        let path = path.as_ref();
        self.begin(SessionState::Decoding)?;
        let file = self.open_file(path)?;

        let result = self.open_reader(file).and_then(|mut reader| match self.options.format {
            DocumentFormat::Xml => self.options.xml_codec().for_each(&mut reader, callback),
            DocumentFormat::Json => {
                let people = self.options.json_codec().decode(&mut reader, None)?;
                let count = people.len() as u64;
                for (index, person) in people.into_iter().enumerate() {
                    callback(index, person)?;
                }
                Ok(count)
            }
        });
        let count = self
            .check(result)
            .with_context(|| format!("reading {}", path.display()))?;

        self.state = SessionState::Complete;
        Ok(count)
    }

    fn begin(
        &mut self,
        next: SessionState,
    ) -> CodecResult<()> {
        if self.state != SessionState::Idle {
            return Err(CodecError::validation(format!(
                "session cannot be reused (state: {})",
                self.state
            )));
        }
        self.state = next;
        debug!(state = %next, format = %self.options.format, "session started");
        Ok(())
    }

    /// Переводит сессию в `Failed`, если результат - ошибка.
    fn check<T>(
        &mut self,
        result: CodecResult<T>,
    ) -> CodecResult<T> {
        if let Err(e) = &result {
            debug!(from = %self.state, error = %e, "session failed");
            self.state = SessionState::Failed;
        }
        result
    }

    fn validate(
        &self,
        people: &[Person],
    ) -> CodecResult<()> {
        self.options.validate()?;
        people
            .iter()
            .try_for_each(|person| person.validate(self.options.depth_limit()))
    }

    fn check_scan(
        &self,
        tag: &str,
    ) -> CodecResult<()> {
        if self.options.format != DocumentFormat::Xml {
            return Err(CodecError::validation(
                "selective reads are available for XML documents only",
            ));
        }
        if !is_scalar_tag(tag) {
            return Err(CodecError::validation(format!(
                "cannot select `{tag}`: expected one of {}",
                SCALAR_TAGS.join(", ")
            )));
        }
        Ok(())
    }

    fn open_file(
        &mut self,
        path: &Path,
    ) -> LineageResult<File> {
        let opened = check_path(path).and_then(|_| File::open(path).map_err(CodecError::from));
        let file = self
            .check(opened)
            .with_context(|| format!("opening {}", path.display()))?;
        Ok(file)
    }

    fn open_reader<R: Read>(
        &self,
        source: R,
    ) -> CodecResult<DecompressingReader<BufReader<R>>> {
        if self.options.detect_compression {
            open_decompressing_detect(source)
        } else {
            open_decompressing(source, self.options.compression)
        }
    }

    /// Кодирует через сжатие; при ошибке кодека поток всё равно
    /// финализируется, а возвращается исходная ошибка.
    fn encode_stream<W: Write>(
        &mut self,
        people: &[Person],
        sink: W,
    ) -> CodecResult<(EncodeReport, W)> {
        let codec = self.options.codec();
        let opened = open_compressing(CountingWrite::new(sink), self.options.compression);
        let mut writer = self.check(opened)?;

        let payload_bytes = match codec.encode(people, &mut writer) {
            Ok(n) => n,
            Err(e) => {
                self.state = SessionState::Failed;
                if let Err(finish_err) = writer.finish() {
                    warn!(error = %finish_err, "failed to finalize stream after encode error");
                }
                return Err(e);
            }
        };

        let finished = writer.finish();
        let counted = self.check(finished)?;
        let report = EncodeReport {
            payload_bytes,
            stored_bytes: counted.bytes_written(),
        };
        Ok((report, counted.into_inner()))
    }

    fn decode_stream<R: Read>(
        &mut self,
        source: R,
        expected: Option<usize>,
    ) -> CodecResult<Vec<Person>> {
        let codec = self.options.codec();
        let result = self
            .open_reader(source)
            .and_then(|mut reader| codec.decode(&mut reader, expected));
        self.check(result)
    }

    fn scan_stream<R: Read>(
        &mut self,
        source: R,
        tag: &str,
    ) -> CodecResult<Vec<String>> {
        let codec = self.options.xml_codec();
        let result = self
            .open_reader(source)
            .and_then(|mut reader| codec.scan_tag(&mut reader, tag));
        self.check(result)
    }

    async fn read_json_async(
        &self,
        path: &Path,
        expected: Option<usize>,
    ) -> CodecResult<Vec<Person>> {
        let codec = self.options.json_codec();
        let file = tokio::fs::File::open(path).await?;
        let mut reader = tokio::io::BufReader::with_capacity(self.options.buffer_size, file);

        let compression = if self.options.detect_compression {
            Compression::detect(reader.fill_buf().await?)
        } else {
            self.options.compression
        };

        match compression {
            Compression::None => codec.decode_async(reader, expected).await,
            compression => {
                let mut packed = Vec::new();
                reader
                    .read_to_end(&mut packed)
                    .await
                    .map_err(|e| CodecError::from_read(compression.name(), e))?;
                let bytes = decompress_block(&packed, compression)
                    .map_err(|e| CodecError::from_read(compression.name(), e))?;
                codec.decode_slice(&bytes, expected)
            }
        }
    }
}

fn check_path(path: &Path) -> CodecResult<()> {
    if path.as_os_str().is_empty() {
        return Err(CodecError::validation("path is empty"));
    }
    Ok(())
}
