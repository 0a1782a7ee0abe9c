/// Document codecs: XML and JSON, streaming XML parser.
pub mod codec;
/// Application settings loading.
pub mod config;
/// Round-trip façade: sessions and one-call save/load.
pub mod facade;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Data model: Person and Children.
pub mod model;
/// Transparent gzip/zstd stream compression.
pub mod stream;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Codecs and document formats.
pub use codec::{Codec, DocumentFormat, JsonCodec, StreamingParser, XmlCodec};
/// Settings.
pub use config::Settings;
/// Sessions and one-call helpers.
pub use facade::{
    load_from_path, load_from_path_async, save_to_path, scan_path, EncodeReport, Session,
    SessionOptions, SessionState,
};
/// Errors and result types.
pub use lineage_error::{CodecError, CodecResult, LineageResult, StackError};
/// Logging.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Data model.
pub use model::{Children, Person};
/// Compression.
pub use stream::{Compression, CompressionKind, DocumentKind};
