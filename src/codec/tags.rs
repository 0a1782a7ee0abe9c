//! Имена элементов и ключей, общие для XML и JSON кодеков.
//!
//! Используются в модулях `xml`, `json` и `streaming`, а также моделью для
//! выборки значения поля по имени тега.

/// Корневой элемент XML документа
pub const TAG_ROOT: &str = "ArrayOfPerson";
/// Элемент одного человека
pub const TAG_PERSON: &str = "Person";
/// Имя
pub const TAG_FIRST_NAME: &str = "FirstName";
/// Фамилия
pub const TAG_LAST_NAME: &str = "LastName";
/// Дата рождения (`YYYY-MM-DD`)
pub const TAG_DATE_OF_BIRTH: &str = "DateOfBirth";
/// Зарплата (десятичный текст)
pub const TAG_SALARY: &str = "Salary";
/// Блок детей
pub const TAG_CHILDREN: &str = "Children";

/// Скалярные поля в порядке объявления.
pub const SCALAR_TAGS: [&str; 4] = [TAG_FIRST_NAME, TAG_LAST_NAME, TAG_DATE_OF_BIRTH, TAG_SALARY];

/// Является ли тег скалярным полем человека.
pub fn is_scalar_tag(tag: &str) -> bool {
    SCALAR_TAGS.contains(&tag)
}
