//! Round-Trip Façade: сохранение и загрузка документа одним вызовом.
//!
//! Каждая ф-я создаёт одноразовую [`Session`]: проверка входа, кодек,
//! сжатие и финализация потоков выполняются в ней.

pub mod session;

use std::path::Path;

use lineage_error::LineageResult;
pub use session::*;

use crate::model::Person;

/// Сохраняет людей в файл с указанными параметрами.
pub fn save_to_path(
    people: &[Person],
    path: impl AsRef<Path>,
    options: SessionOptions,
) -> LineageResult<EncodeReport> {
    Session::new(options).encode_to_path(people, path)
}

/// Загружает людей из файла с указанными параметрами.
pub fn load_from_path(
    path: impl AsRef<Path>,
    options: SessionOptions,
) -> LineageResult<Vec<Person>> {
    Session::new(options).decode_from_path(path, None)
}

/// Асинхронно загружает людей из JSON файла.
pub async fn load_from_path_async(
    path: impl AsRef<Path>,
    options: SessionOptions,
) -> LineageResult<Vec<Person>> {
    Session::new(options).decode_path_async(path, None).await
}

/// Выбирает значения элементов `tag` из XML файла, не собирая людей.
pub fn scan_path(
    path: impl AsRef<Path>,
    tag: &str,
    options: SessionOptions,
) -> LineageResult<Vec<String>> {
    Session::new(options).scan_path(path, tag)
}
