//! Приведение сырых текстовых значений полей к типам модели.
//!
//! Оба кодека передают сюда текст поля как есть; ошибка приведения всегда
//! `CodecError::TypeMismatch` с именем поля и исходным значением.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use lineage_error::{CodecError, CodecResult};
use rust_decimal::Decimal;

/// Формат календарной даты в документах.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Разбирает дату рождения.
///
/// Кроме `YYYY-MM-DD` принимает дату со временем без зоны
/// (`1974-03-14T00:00:00`), которую пишут некоторые сериализаторы; время
/// отбрасывается, сдвига по часовому поясу нет.
pub fn parse_date(
    field: &str,
    raw: &str,
) -> CodecResult<NaiveDate> {
    let text = raw.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .map_err(|_| CodecError::type_mismatch(field, raw, "calendar date (YYYY-MM-DD)"))
}

/// Разбирает зарплату как неотрицательное десятичное число.
///
/// Масштаб сохраняется: `"30000.50"` остаётся `30000.50`.
pub fn parse_salary(
    field: &str,
    raw: &str,
) -> CodecResult<Decimal> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|_| CodecError::type_mismatch(field, raw, "decimal"))?;
    if value < Decimal::ZERO {
        return Err(CodecError::type_mismatch(field, raw, "non-negative decimal"));
    }
    Ok(value)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
