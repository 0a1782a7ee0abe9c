//! SAX-style streaming parser для XML документов.
//!
//! Парсер читает документ событиями quick-xml и вызывает handler для каждого
//! события, не загружая документ целиком в память. В памяти одновременно
//! находится только текущий человек верхнего уровня со своим поддеревом.
//!
//! # События
//!
//! - `Begin` - открыт корневой элемент
//! - `Field` - закрыт элемент скалярного поля (в порядке документа)
//! - `Person` - собран человек верхнего уровня
//! - `End` - закрыт корневой элемент
//!
//! Handler, которому люди не нужны (`wants_people() == false`), получает
//! только `Field` события: парсер проверяет структуру, но не собирает
//! объекты и не приводит типы полей.

use std::io::{self, BufRead};

use chrono::NaiveDate;
use lineage_error::{CodecError, CodecResult};
use quick_xml::{events::Event, Reader};
use rust_decimal::Decimal;
use tracing::trace;

use super::{
    fields::{parse_date, parse_salary},
    tags::{
        is_scalar_tag, TAG_CHILDREN, TAG_DATE_OF_BIRTH, TAG_FIRST_NAME, TAG_LAST_NAME, TAG_PERSON,
        TAG_ROOT, TAG_SALARY,
    },
    DEFAULT_MAX_DEPTH,
};
use crate::model::{Children, Person};

const FORMAT: &str = "xml";

/// Трейт для обработки событий парсинга.
pub trait ParseHandler {
    /// Вызывается для каждого события парсинга.
    fn handle_event(
        &mut self,
        event: ParseEvent,
    ) -> CodecResult<()>;

    /// Нужны ли handler'у собранные люди.
    fn wants_people(&self) -> bool {
        true
    }

    /// Вызывается в конце парсинга для финализации.
    fn finalize(&mut self) -> CodecResult<()> {
        Ok(())
    }
}

/// События, генерируемые парсером во время обработки документа.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// Открыт корневой элемент
    Begin,
    /// Скалярное поле: `depth` - глубина владельца (1 для верхнего уровня)
    Field {
        depth: usize,
        name: String,
        raw: String,
    },
    /// Собран человек верхнего уровня
    Person { index: usize, person: Person },
    /// Корневой элемент закрыт
    End,
}

/// Статистика парсинга документа.
#[derive(Debug, Clone, Default)]
pub struct ParseStats {
    /// Кол-во байт прочитано (несжатых)
    pub bytes_read: u64,
    /// Кол-во людей верхнего уровня
    pub people_parsed: u64,
    /// Кол-во людей на всех уровнях
    pub entities_parsed: u64,
    /// Кол-во скалярных полей
    pub fields_seen: u64,
    /// Максимальная встреченная глубина
    pub max_depth_seen: usize,
    /// Кол-во пропущенных неизвестных элементов
    pub skipped_elements: u64,
}

/// SAX-style streaming parser для XML документов.
pub struct StreamingParser<R: BufRead> {
    reader: Reader<R>,
    stats: ParseStats,
    max_depth: usize,
}

/// Handler для сбора всех людей верхнего уровня в Vec.
#[derive(Debug, Default)]
pub struct CollectHandler {
    people: Vec<Person>,
}

/// Handler для подсчёта людей без сохранения.
#[derive(Debug, Default)]
pub struct CountHandler {
    top_level: u64,
    total: u64,
}

/// Handler для фильтрации людей верхнего уровня.
///
/// Загружает в память только людей, удовлетворяющих предикату.
pub struct FilterHandler<F>
where
    F: Fn(&Person) -> bool,
{
    predicate: F,
    people: Vec<Person>,
}

/// Handler для выборки сырых значений одного поля на всех уровнях.
///
/// Люди не собираются: в память попадают только совпавшие значения.
#[derive(Debug)]
pub struct FieldHandler {
    tag: String,
    depth: Option<usize>,
    values: Vec<String>,
}

/// Handler с callback ф-ей для каждого человека верхнего уровня.
pub struct CallbackHandler<F>
where
    F: FnMut(usize, Person) -> CodecResult<()>,
{
    callback: F,
}

/// Открытый элемент на стеке парсера.
enum Frame {
    Root,
    /// `builder` отсутствует, если handler не собирает людей
    Person {
        depth: usize,
        builder: Option<PersonBuilder>,
    },
    Children(Children),
    Field {
        name: String,
        text: String,
    },
    Skip,
}

#[derive(Default)]
struct PersonBuilder {
    first_name: Option<String>,
    last_name: Option<String>,
    date_of_birth: Option<NaiveDate>,
    salary: Option<Decimal>,
    children: Children,
}

impl CollectHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn into_people(self) -> Vec<Person> {
        self.people
    }
}

impl CountHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Кол-во людей верхнего уровня.
    pub fn top_level(&self) -> u64 {
        self.top_level
    }

    /// Кол-во людей на всех уровнях.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl<F> FilterHandler<F>
where
    F: Fn(&Person) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            people: Vec::new(),
        }
    }

    pub fn into_people(self) -> Vec<Person> {
        self.people
    }
}

impl FieldHandler {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            depth: None,
            values: Vec::new(),
        }
    }

    /// Ограничивает выборку владельцами на указанной глубине.
    pub fn at_depth(
        mut self,
        depth: usize,
    ) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

impl<F> CallbackHandler<F>
where
    F: FnMut(usize, Person) -> CodecResult<()>,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<R: BufRead> StreamingParser<R> {
    /// Создаёт новый парсер из буферизованного source.
    pub fn new(source: R) -> Self {
        Self {
            reader: Reader::from_reader(source),
            stats: ParseStats::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Задаёт предел вложенности людей.
    pub fn with_max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Парсит документ, вызывая handler для каждого события.
    ///
    /// Читает source до конца, чтобы повреждения после корневого элемента
    /// (например, усечённый хвост сжатого потока) тоже были обнаружены.
    pub fn parse<H: ParseHandler>(
        &mut self,
        handler: &mut H,
    ) -> CodecResult<()> {
        let collect = handler.wants_people();
        let mut stack: Vec<Frame> = Vec::new();
        let mut seen_root = false;
        let mut buf = Vec::new();

        loop {
            let event = self
                .reader
                .read_event_into(&mut buf)
                .map_err(|e| self.xml_error(e))?;

            match event {
                Event::Start(e) => {
                    let name = element_name(e.local_name().as_ref())?;
                    self.open(&mut stack, &name, collect, &mut seen_root, handler)?;
                }
                Event::Empty(e) => {
                    let name = element_name(e.local_name().as_ref())?;
                    self.open(&mut stack, &name, collect, &mut seen_root, handler)?;
                    self.close(&mut stack, handler)?;
                }
                Event::End(_) => self.close(&mut stack, handler)?,
                Event::Text(t) => {
                    if let Some(Frame::Field { text, .. }) = stack.last_mut() {
                        let chunk = t
                            .unescape()
                            .map_err(|e| self.decode_error(e.to_string()))?;
                        text.push_str(&chunk);
                    }
                }
                Event::CData(c) => {
                    if let Some(Frame::Field { text, .. }) = stack.last_mut() {
                        let chunk = std::str::from_utf8(&c)
                            .map_err(|_| self.decode_error("CDATA section is not valid UTF-8"))?;
                        text.push_str(chunk);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        self.stats.bytes_read = self.reader.buffer_position() as u64;

        if !seen_root {
            return Err(self.decode_error(format!("document has no <{TAG_ROOT}> element")));
        }
        if let Some(open) = stack.last() {
            let name = match open {
                Frame::Root => TAG_ROOT,
                Frame::Person { .. } => TAG_PERSON,
                Frame::Children(_) => TAG_CHILDREN,
                Frame::Field { name, .. } => name.as_str(),
                Frame::Skip => "element",
            };
            return Err(self.decode_error(format!(
                "unexpected end of document inside <{name}>"
            )));
        }

        trace!(
            people = self.stats.people_parsed,
            entities = self.stats.entities_parsed,
            bytes = self.stats.bytes_read,
            "XML document parsed"
        );

        handler.finalize()
    }

    /// Возвращает статистику парсинга.
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    fn open<H: ParseHandler>(
        &mut self,
        stack: &mut Vec<Frame>,
        name: &str,
        collect: bool,
        seen_root: &mut bool,
        handler: &mut H,
    ) -> CodecResult<()> {
        let frame = match stack.last() {
            None => {
                if *seen_root {
                    return Err(self.decode_error(format!(
                        "unexpected element <{name}> after the root element"
                    )));
                }
                if name != TAG_ROOT {
                    return Err(self.decode_error(format!(
                        "expected <{TAG_ROOT}> root element, found <{name}>"
                    )));
                }
                *seen_root = true;
                handler.handle_event(ParseEvent::Begin)?;
                Frame::Root
            }
            Some(Frame::Root) | Some(Frame::Children(_)) => {
                if name == TAG_PERSON {
                    let depth = person_depth(stack) + 1;
                    if depth > self.max_depth {
                        return Err(self.decode_error(format!(
                            "nesting depth exceeds limit of {}",
                            self.max_depth
                        )));
                    }
                    self.stats.max_depth_seen = self.stats.max_depth_seen.max(depth);
                    Frame::Person {
                        depth,
                        builder: collect.then(PersonBuilder::default),
                    }
                } else {
                    self.stats.skipped_elements += 1;
                    Frame::Skip
                }
            }
            Some(Frame::Person { .. }) => {
                if is_scalar_tag(name) {
                    Frame::Field {
                        name: name.to_string(),
                        text: String::new(),
                    }
                } else if name == TAG_CHILDREN {
                    Frame::Children(Children::new())
                } else {
                    self.stats.skipped_elements += 1;
                    Frame::Skip
                }
            }
            Some(Frame::Field { name: field, .. }) => {
                return Err(self.decode_error(format!(
                    "unexpected element <{name}> inside <{field}>"
                )));
            }
            Some(Frame::Skip) => Frame::Skip,
        };
        stack.push(frame);
        Ok(())
    }

    fn close<H: ParseHandler>(
        &mut self,
        stack: &mut Vec<Frame>,
        handler: &mut H,
    ) -> CodecResult<()> {
        let frame = stack
            .pop()
            .ok_or_else(|| self.decode_error("unmatched closing tag"))?;

        match frame {
            Frame::Root => handler.handle_event(ParseEvent::End)?,
            Frame::Skip => {}
            Frame::Field { name, text } => {
                self.stats.fields_seen += 1;
                let depth = person_depth(stack);
                if let Some(Frame::Person {
                    builder: Some(builder),
                    ..
                }) = stack.last_mut()
                {
                    builder.set(&name, &text)?;
                }
                handler.handle_event(ParseEvent::Field {
                    depth,
                    name,
                    raw: text,
                })?;
            }
            Frame::Children(children) => {
                if let Some(Frame::Person {
                    builder: Some(builder),
                    ..
                }) = stack.last_mut()
                {
                    for child in children {
                        builder.children.insert(child);
                    }
                }
            }
            Frame::Person { builder, .. } => {
                self.stats.entities_parsed += 1;
                let person = builder.map(PersonBuilder::build).transpose()?;
                match stack.last_mut() {
                    Some(Frame::Root) => {
                        let index = self.stats.people_parsed as usize;
                        self.stats.people_parsed += 1;
                        if let Some(person) = person {
                            handler.handle_event(ParseEvent::Person { index, person })?;
                        }
                    }
                    Some(Frame::Children(children)) => {
                        if let Some(person) = person {
                            children.insert(person);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn decode_error(
        &self,
        reason: impl Into<String>,
    ) -> CodecError {
        CodecError::decode(FORMAT, reason).with_offset(self.reader.buffer_position() as u64)
    }

    fn xml_error(
        &self,
        err: quick_xml::Error,
    ) -> CodecError {
        match err {
            quick_xml::Error::Io(e) => {
                CodecError::from_read(FORMAT, io::Error::new(e.kind(), e.to_string()))
            }
            other => self.decode_error(other.to_string()),
        }
    }
}

impl PersonBuilder {
    fn set(
        &mut self,
        name: &str,
        raw: &str,
    ) -> CodecResult<()> {
        match name {
            TAG_FIRST_NAME => put(&mut self.first_name, name, raw.to_string()),
            TAG_LAST_NAME => put(&mut self.last_name, name, raw.to_string()),
            TAG_DATE_OF_BIRTH => put(&mut self.date_of_birth, name, parse_date(name, raw)?),
            TAG_SALARY => put(&mut self.salary, name, parse_salary(name, raw)?),
            _ => Ok(()),
        }
    }

    fn build(self) -> CodecResult<Person> {
        let missing = |tag: &str| {
            CodecError::decode(FORMAT, format!("<{TAG_PERSON}> is missing <{tag}>"))
        };
        let first_name = self.first_name.ok_or_else(|| missing(TAG_FIRST_NAME))?;
        let last_name = self.last_name.ok_or_else(|| missing(TAG_LAST_NAME))?;
        let date_of_birth = self.date_of_birth.ok_or_else(|| missing(TAG_DATE_OF_BIRTH))?;
        let salary = self.salary.ok_or_else(|| missing(TAG_SALARY))?;
        Ok(Person::new(first_name, last_name, date_of_birth, salary).with_children(self.children))
    }
}

impl ParseHandler for CollectHandler {
    fn handle_event(
        &mut self,
        event: ParseEvent,
    ) -> CodecResult<()> {
        if let ParseEvent::Person { person, .. } = event {
            self.people.push(person);
        }
        Ok(())
    }
}

impl ParseHandler for CountHandler {
    fn handle_event(
        &mut self,
        event: ParseEvent,
    ) -> CodecResult<()> {
        if let ParseEvent::Person { person, .. } = event {
            self.top_level += 1;
            self.total += person.walk().count() as u64;
        }
        Ok(())
    }
}

impl<F> ParseHandler for FilterHandler<F>
where
    F: Fn(&Person) -> bool,
{
    fn handle_event(
        &mut self,
        event: ParseEvent,
    ) -> CodecResult<()> {
        if let ParseEvent::Person { person, .. } = event {
            if (self.predicate)(&person) {
                self.people.push(person);
            }
        }
        Ok(())
    }
}

impl ParseHandler for FieldHandler {
    fn handle_event(
        &mut self,
        event: ParseEvent,
    ) -> CodecResult<()> {
        if let ParseEvent::Field { depth, name, raw } = event {
            if name == self.tag && self.depth.map_or(true, |d| d == depth) {
                self.values.push(raw);
            }
        }
        Ok(())
    }

    fn wants_people(&self) -> bool {
        false
    }
}

impl<F> ParseHandler for CallbackHandler<F>
where
    F: FnMut(usize, Person) -> CodecResult<()>,
{
    fn handle_event(
        &mut self,
        event: ParseEvent,
    ) -> CodecResult<()> {
        match event {
            ParseEvent::Person { index, person } => (self.callback)(index, person),
            _ => Ok(()),
        }
    }
}

fn put<T>(
    slot: &mut Option<T>,
    name: &str,
    value: T,
) -> CodecResult<()> {
    if slot.is_some() {
        return Err(CodecError::decode(
            FORMAT,
            format!("duplicate <{name}> element"),
        ));
    }
    *slot = Some(value);
    Ok(())
}

/// Глубина ближайшего открытого человека (0 вне людей).
fn person_depth(stack: &[Frame]) -> usize {
    stack
        .iter()
        .rev()
        .find_map(|f| match f {
            Frame::Person { depth, .. } => Some(*depth),
            _ => None,
        })
        .unwrap_or(0)
}

fn element_name(raw: &[u8]) -> CodecResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| CodecError::decode(FORMAT, "element name is not valid UTF-8"))
}
