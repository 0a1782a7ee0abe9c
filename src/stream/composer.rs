//! Прозрачное сжатие поверх произвольного `Write`/`Read`.
//!
//! [`CompressingWriter`] должен быть закрыт через [`CompressingWriter::finish`]:
//! только так сбрасывается хвост сжатого потока и видны ошибки записи.
//! Если writer просто уронить, финализация выполняется по возможности, а
//! ошибка попадает только в лог.

use std::io::{self, BufRead, BufReader, Read, Write};

use flate2::{bufread::GzDecoder, write::GzEncoder};
use lineage_error::{CodecError, CodecResult};
use tracing::{debug, warn};

use super::compression::{corrupt_stream, Compression};

/// Writer, сжимающий всё записанное выбранным алгоритмом.
pub struct CompressingWriter<W: Write> {
    inner: Option<Encoder<W>>,
    compression: Compression,
    bytes_in: u64,
}

/// Reader, распаковывающий поток выбранным алгоритмом.
///
/// Ошибки повреждённого или усечённого потока приводятся к `InvalidData`.
pub struct DecompressingReader<R: BufRead> {
    inner: Decoder<R>,
    compression: Compression,
    bytes_out: u64,
}

enum Encoder<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

enum Decoder<R: BufRead> {
    Plain(R),
    Gzip(GzDecoder<R>),
    Zstd(zstd::stream::read::Decoder<'static, R>),
}

/// Оборачивает sink в сжимающий writer.
pub fn open_compressing<W: Write>(
    sink: W,
    compression: Compression,
) -> CodecResult<CompressingWriter<W>> {
    compression.validate()?;
    let inner = match compression {
        Compression::None => Encoder::Plain(sink),
        Compression::Gzip { level } => {
            Encoder::Gzip(GzEncoder::new(sink, flate2::Compression::new(level)))
        }
        Compression::Zstd { level } => {
            Encoder::Zstd(zstd::stream::write::Encoder::new(sink, level)?)
        }
    };
    Ok(CompressingWriter {
        inner: Some(inner),
        compression,
        bytes_in: 0,
    })
}

/// Оборачивает source в распаковывающий reader с явно заданным алгоритмом.
pub fn open_decompressing<R: Read>(
    source: R,
    compression: Compression,
) -> CodecResult<DecompressingReader<BufReader<R>>> {
    DecompressingReader::new(BufReader::new(source), compression)
}

/// Оборачивает source в распаковывающий reader, определяя алгоритм по
/// magic-префиксу потока.
pub fn open_decompressing_detect<R: Read>(
    source: R
) -> CodecResult<DecompressingReader<BufReader<R>>> {
    let mut reader = BufReader::new(source);
    let compression = Compression::detect(reader.fill_buf()?);
    debug!(%compression, "detected stream compression");
    DecompressingReader::new(reader, compression)
}

impl<W: Write> CompressingWriter<W> {
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Кол-во несжатых байт, принятых writer'ом.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    /// Дописывает хвост сжатого потока, сбрасывает sink и возвращает его.
    pub fn finish(mut self) -> CodecResult<W> {
        let inner = self
            .inner
            .take()
            .ok_or_else(|| CodecError::validation("compressed stream is already finished"))?;

        let mut sink = match inner {
            Encoder::Plain(w) => w,
            Encoder::Gzip(enc) => enc.finish()?,
            Encoder::Zstd(enc) => enc.finish()?,
        };
        sink.flush()?;

        debug!(
            compression = %self.compression,
            bytes_in = self.bytes_in,
            "compressed stream finished"
        );
        Ok(sink)
    }
}

impl<W: Write> Write for CompressingWriter<W> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        let n = match self.inner.as_mut() {
            Some(Encoder::Plain(w)) => w.write(buf)?,
            Some(Encoder::Gzip(enc)) => enc.write(buf)?,
            Some(Encoder::Zstd(enc)) => enc.write(buf)?,
            None => return Err(io::Error::other("compressed stream is already finished")),
        };
        self.bytes_in += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(Encoder::Plain(w)) => w.flush(),
            Some(Encoder::Gzip(enc)) => enc.flush(),
            Some(Encoder::Zstd(enc)) => enc.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for CompressingWriter<W> {
    fn drop(&mut self) {
        let Some(inner) = self.inner.as_mut() else {
            return;
        };
        let result = match inner {
            Encoder::Plain(w) => w.flush(),
            Encoder::Gzip(enc) => enc.try_finish(),
            Encoder::Zstd(enc) => enc.do_finish(),
        };
        match result {
            Ok(()) => debug!(
                compression = %self.compression,
                "compressed stream finalized on drop"
            ),
            Err(e) => warn!(
                compression = %self.compression,
                error = %e,
                "failed to finalize compressed stream on drop"
            ),
        }
    }
}

impl<R: BufRead> DecompressingReader<R> {
    pub fn new(
        reader: R,
        compression: Compression,
    ) -> CodecResult<Self> {
        let inner = match compression {
            Compression::None => Decoder::Plain(reader),
            Compression::Gzip { .. } => Decoder::Gzip(GzDecoder::new(reader)),
            Compression::Zstd { .. } => {
                Decoder::Zstd(zstd::stream::read::Decoder::with_buffer(reader)?)
            }
        };
        Ok(Self {
            inner,
            compression,
            bytes_out: 0,
        })
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Кол-во распакованных байт, отданных reader'ом.
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }
}

impl<R: BufRead> Read for DecompressingReader<R> {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> io::Result<usize> {
        let compression = self.compression;
        let n = match &mut self.inner {
            Decoder::Plain(r) => r.read(buf)?,
            Decoder::Gzip(d) => d.read(buf).map_err(|e| corrupt_stream(compression, e))?,
            Decoder::Zstd(d) => d.read(buf).map_err(|e| corrupt_stream(compression, e))?,
        };
        self.bytes_out += n as u64;
        Ok(n)
    }
}
