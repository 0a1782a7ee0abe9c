//! Генераторы для property-based тестирования графа людей
//!
//! Имена ограничены латиницей: пробелы по краям значимы для XML и
//! проверяются отдельными тестами.

use std::ops::Range;

use chrono::NaiveDate;
use lineage::{Children, Person};
use proptest::{prelude::*, string::string_regex};
use rust_decimal::Decimal;

/// Кол-во людей верхнего уровня в документе
const TOP_LEVEL: Range<usize> = 0..6;
/// Кол-во детей у одного человека
const CHILDREN: Range<usize> = 0..4;

pub fn name_strategy() -> impl Strategy<Value = String> {
    string_regex("[A-Z][a-z]{0,11}(-[A-Z][a-z]{1,8})?").unwrap()
}

pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1900i32..=2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

/// Зарплаты: ноль, целые и дробные с разной шкалой.
pub fn salary_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        Just(Decimal::ZERO),
        (0i64..10_000_000).prop_map(Decimal::from),
        (0i64..1_000_000_000_000, 0u32..=4).prop_map(|(m, s)| Decimal::new(m, s)),
    ]
}

pub fn leaf_strategy() -> impl Strategy<Value = Person> {
    (
        name_strategy(),
        name_strategy(),
        date_strategy(),
        salary_strategy(),
    )
        .prop_map(|(first, last, born, salary)| Person::new(first, last, born, salary))
}

/// Дерево глубиной до 4 уровней.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    leaf_strategy().prop_recursive(3, 32, 4, |inner| {
        (leaf_strategy(), prop::collection::vec(inner, CHILDREN)).prop_map(|(person, kids)| {
            person.with_children(kids.into_iter().collect::<Children>())
        })
    })
}

pub fn people_strategy() -> impl Strategy<Value = Vec<Person>> {
    prop::collection::vec(person_strategy(), TOP_LEVEL)
}
