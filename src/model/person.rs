use chrono::NaiveDate;
use lineage_error::{CodecError, CodecResult};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Children;
use crate::codec::tags::{TAG_DATE_OF_BIRTH, TAG_FIRST_NAME, TAG_LAST_NAME, TAG_SALARY};

/// Человек: скалярные поля и множество детей.
///
/// Дата рождения — календарная дата без времени и часового пояса, зарплата —
/// десятичное число с фиксированной точкой. Оба типа переживают round-trip
/// без потери разрядов.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
    salary: Decimal,
    #[serde(skip_serializing_if = "Children::is_empty")]
    children: Children,
}

/// Pre-order обход поддерева, начиная с корня.
pub struct Walk<'a> {
    stack: Vec<&'a Person>,
}

impl Person {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
        salary: Decimal,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth,
            salary,
            children: Children::new(),
        }
    }

    /// Builder-вариант [`Person::add_child`].
    pub fn with_child(
        mut self,
        child: Person,
    ) -> Self {
        self.children.insert(child);
        self
    }

    pub fn with_children(
        mut self,
        children: Children,
    ) -> Self {
        self.children = children;
        self
    }

    pub fn add_child(
        &mut self,
        child: Person,
    ) {
        self.children.insert(child);
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }

    pub fn salary(&self) -> Decimal {
        self.salary
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    /// Глубина поддерева: 1 для человека без детей.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Person::depth)
            .max()
            .unwrap_or(0)
    }

    /// Кол-во всех потомков (без самого человека).
    pub fn descendant_count(&self) -> usize {
        self.walk().count() - 1
    }

    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Текстовое значение скалярного поля по имени тега формата.
    ///
    /// Возвращает то же представление, что пишут кодеки, либо `None` для
    /// неизвестного тега.
    pub fn field_value(
        &self,
        tag: &str,
    ) -> Option<String> {
        match tag {
            TAG_FIRST_NAME => Some(self.first_name.clone()),
            TAG_LAST_NAME => Some(self.last_name.clone()),
            TAG_DATE_OF_BIRTH => Some(self.date_of_birth.to_string()),
            TAG_SALARY => Some(self.salary.to_string()),
            _ => None,
        }
    }

    /// Проверяет инварианты поддерева: неотрицательная зарплата и глубина не
    /// больше `max_depth`.
    pub fn validate(
        &self,
        max_depth: usize,
    ) -> CodecResult<()> {
        let mut stack = vec![(self, 1usize)];
        while let Some((person, depth)) = stack.pop() {
            if depth > max_depth {
                return Err(CodecError::validation(format!(
                    "nesting depth exceeds limit of {max_depth} (at {} {})",
                    person.first_name, person.last_name
                )));
            }
            if person.salary < Decimal::ZERO {
                return Err(CodecError::validation(format!(
                    "salary of {} {} is negative: {}",
                    person.first_name, person.last_name, person.salary
                )));
            }
            stack.extend(person.children.iter().map(|c| (c, depth + 1)));
        }
        Ok(())
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Person;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        // Кладём детей в обратном порядке, чтобы обойти их в порядке хранения.
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}
