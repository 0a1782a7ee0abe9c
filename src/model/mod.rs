//! Модель данных: человек и множество его детей.
//!
//! Модель не знает о форматах и I/O. Дети принадлежат родителю по значению,
//! поэтому граф всегда является деревом: цикл построить невозможно.

pub mod children;
pub mod person;

pub use children::*;
pub use person::*;
