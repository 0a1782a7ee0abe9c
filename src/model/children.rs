use serde::Serialize;

use super::Person;

/// Неупорядоченное множество детей.
///
/// Порядок вставки не значим: два множества равны, если содержат одинаковое
/// кол-во попарно равных людей. Одинаковые по значению записи не
/// схлопываются, каждая вставка — отдельный человек.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Children(Vec<Person>);

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(
        &mut self,
        person: Person,
    ) {
        self.0.push(person);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Person> {
        self.0.iter()
    }

    /// Есть ли в множестве человек с указанной фамилией.
    pub fn contains_last_name(
        &self,
        last_name: &str,
    ) -> bool {
        self.0.iter().any(|p| p.last_name() == last_name)
    }

    pub fn into_vec(self) -> Vec<Person> {
        self.0
    }
}

impl PartialEq for Children {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }

        // Сравнение мультимножеств: каждому элементу ищем ещё не занятую пару.
        let mut matched = vec![false; other.0.len()];
        self.0.iter().all(|a| {
            match other
                .0
                .iter()
                .enumerate()
                .position(|(i, b)| !matched[i] && a == b)
            {
                Some(i) => {
                    matched[i] = true;
                    true
                }
                None => false,
            }
        })
    }
}

impl Eq for Children {}

impl FromIterator<Person> for Children {
    fn from_iter<I: IntoIterator<Item = Person>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Person>> for Children {
    fn from(v: Vec<Person>) -> Self {
        Self(v)
    }
}

impl IntoIterator for Children {
    type Item = Person;
    type IntoIter = std::vec::IntoIter<Person>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Children {
    type Item = &'a Person;
    type IntoIter = std::slice::Iter<'a, Person>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
