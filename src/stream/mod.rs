//! Stream Composer: прозрачное сжатие потоков документа.
//!
//! Кодеки пишут и читают обычные `Write`/`Read`; этот модуль вставляет
//! между ними и файлом gzip или zstd, определяет алгоритм по magic-префиксу
//! и выводит формат документа из имени файла.

pub mod composer;
pub mod compression;
pub mod kind;

pub use composer::*;
pub use compression::*;
pub use kind::*;
