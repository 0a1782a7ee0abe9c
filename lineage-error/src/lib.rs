//! Ошибки `lineage`: коды статуса, корневые ошибки кодеков и стек
//! контекстов поверх них.

pub mod ext;
pub mod macros;
pub mod result_ext;
pub mod stack;
pub mod status_code;
pub mod types;

pub use ext::*;
pub use result_ext::*;
pub use stack::*;
pub use status_code::*;
pub use types::*;

/// Результат операций фасада и CLI.
pub type LineageResult<T> = Result<T, StackError>;
