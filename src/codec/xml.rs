use std::io::{BufReader, Read, Write};

use lineage_error::CodecResult;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use tracing::debug;

use super::{
    check_expected,
    fields::format_date,
    streaming::{CallbackHandler, CollectHandler, FieldHandler, StreamingParser},
    tags::{
        TAG_CHILDREN, TAG_DATE_OF_BIRTH, TAG_FIRST_NAME, TAG_LAST_NAME, TAG_PERSON, TAG_ROOT,
        TAG_SALARY,
    },
    Codec, CountingWrite, DocumentFormat, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH,
};
use crate::model::Person;

/// XML кодек.
///
/// Документ: корневой `<ArrayOfPerson>` с элементами `<Person>`; скалярные
/// поля пишутся дочерними элементами, дети - внутри `<Children>` (пустой
/// блок пишется как `<Children/>`).
#[derive(Debug, Clone)]
pub struct XmlCodec {
    indent: usize,
    max_depth: usize,
    buffer_size: usize,
}

impl XmlCodec {
    pub fn new() -> Self {
        Self {
            indent: 2,
            max_depth: DEFAULT_MAX_DEPTH,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Ширина отступа; 0 отключает форматирование.
    pub fn with_indent(
        mut self,
        indent: usize,
    ) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_buffer_size(
        mut self,
        buffer_size: usize,
    ) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Выбирает сырые значения элементов `tag` на всех уровнях, в порядке
    /// документа, не собирая людей.
    pub fn scan_tag(
        &self,
        source: &mut dyn Read,
        tag: &str,
    ) -> CodecResult<Vec<String>> {
        let mut parser = StreamingParser::new(BufReader::with_capacity(self.buffer_size, source))
            .with_max_depth(self.max_depth);
        let mut handler = FieldHandler::new(tag);
        parser.parse(&mut handler)?;
        Ok(handler.into_values())
    }

    /// Передаёт людей верхнего уровня в callback по мере разбора.
    ///
    /// Возвращает кол-во обработанных людей.
    pub fn for_each<F>(
        &self,
        source: &mut dyn Read,
        callback: F,
    ) -> CodecResult<u64>
    where
        F: FnMut(usize, Person) -> CodecResult<()>,
    {
        let mut parser = StreamingParser::new(BufReader::with_capacity(self.buffer_size, source))
            .with_max_depth(self.max_depth);
        parser.parse(&mut CallbackHandler::new(callback))?;
        Ok(parser.stats().people_parsed)
    }

    fn write_person<W: Write>(
        writer: &mut Writer<W>,
        person: &Person,
    ) -> CodecResult<()> {
        writer.write_event(Event::Start(BytesStart::new(TAG_PERSON)))?;
        write_field(writer, TAG_FIRST_NAME, person.first_name())?;
        write_field(writer, TAG_LAST_NAME, person.last_name())?;
        write_field(writer, TAG_DATE_OF_BIRTH, &format_date(person.date_of_birth()))?;
        write_field(writer, TAG_SALARY, &person.salary().to_string())?;

        if person.children().is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(TAG_CHILDREN)))?;
        } else {
            writer.write_event(Event::Start(BytesStart::new(TAG_CHILDREN)))?;
            for child in person.children() {
                Self::write_person(writer, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(TAG_CHILDREN)))?;
        }

        writer.write_event(Event::End(BytesEnd::new(TAG_PERSON)))?;
        Ok(())
    }
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for XmlCodec {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Xml
    }

    fn encode(
        &self,
        people: &[Person],
        sink: &mut dyn Write,
    ) -> CodecResult<u64> {
        let mut counter = CountingWrite::new(sink);
        {
            let mut writer = if self.indent > 0 {
                Writer::new_with_indent(&mut counter, b' ', self.indent)
            } else {
                Writer::new(&mut counter)
            };
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
            writer.write_event(Event::Start(BytesStart::new(TAG_ROOT)))?;
            for person in people {
                Self::write_person(&mut writer, person)?;
            }
            writer.write_event(Event::End(BytesEnd::new(TAG_ROOT)))?;
        }
        counter.write_all(b"\n")?;
        counter.flush()?;

        debug!(
            people = people.len(),
            bytes = counter.bytes_written(),
            "XML document encoded"
        );
        Ok(counter.bytes_written())
    }

    fn decode(
        &self,
        source: &mut dyn Read,
        expected: Option<usize>,
    ) -> CodecResult<Vec<Person>> {
        let mut parser = StreamingParser::new(BufReader::with_capacity(self.buffer_size, source))
            .with_max_depth(self.max_depth);
        let mut handler = CollectHandler::new();
        parser.parse(&mut handler)?;

        let people = handler.into_people();
        check_expected(DocumentFormat::Xml, expected, people.len())?;

        debug!(
            people = people.len(),
            bytes = parser.stats().bytes_read,
            "XML document decoded"
        );
        Ok(people)
    }
}

fn write_field<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &str,
) -> CodecResult<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, str::FromStr};

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    fn sample() -> Vec<Person> {
        let alice = Person::new(
            "Alice",
            "Smith",
            NaiveDate::from_ymd_opt(1974, 3, 14).unwrap(),
            Decimal::from(30000),
        );
        let bob = Person::new(
            "Bob",
            "Jones",
            NaiveDate::from_ymd_opt(1969, 11, 23).unwrap(),
            Decimal::from_str("40000.50").unwrap(),
        )
        .with_child(Person::new(
            "Sally",
            "Jones",
            NaiveDate::from_ymd_opt(2000, 7, 12).unwrap(),
            Decimal::ZERO,
        ));
        vec![alice, bob]
    }

    fn encode(people: &[Person]) -> Vec<u8> {
        let mut out = Vec::new();
        XmlCodec::new().encode(people, &mut out).unwrap();
        out
    }

    #[test]
    fn test_encode_layout() {
        let out = encode(&sample());
        let text = String::from_utf8(out.clone()).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("<ArrayOfPerson>"));
        assert!(text.contains("<FirstName>Alice</FirstName>"));
        assert!(text.contains("<DateOfBirth>1974-03-14</DateOfBirth>"));
        assert!(text.contains("<Salary>40000.50</Salary>"));
        assert!(text.contains("<Children/>"));
        assert!(text.trim_end().ends_with("</ArrayOfPerson>"));
    }

    #[test]
    fn test_encode_returns_byte_count() {
        let mut out = Vec::new();
        let n = XmlCodec::new().encode(&sample(), &mut out).unwrap();
        assert_eq!(n, out.len() as u64);
    }

    #[test]
    fn test_roundtrip() {
        let people = sample();
        let out = encode(&people);
        let decoded = XmlCodec::new()
            .decode(&mut Cursor::new(out), Some(2))
            .unwrap();
        assert_eq!(decoded, people);
    }

    #[test]
    fn test_roundtrip_without_indent() {
        let people = sample();
        let mut out = Vec::new();
        XmlCodec::new()
            .with_indent(0)
            .encode(&people, &mut out)
            .unwrap();
        let decoded = XmlCodec::new().decode(&mut out.as_slice(), None).unwrap();
        assert_eq!(decoded, people);
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let people = vec![Person::new(
            "Tom & \"Jerry\"",
            "<O'Brien>",
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            Decimal::ONE,
        )];
        let out = encode(&people);
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(!text.contains("<O'Brien>"));
        let decoded = XmlCodec::new().decode(&mut out.as_slice(), None).unwrap();
        assert_eq!(decoded, people);
    }

    #[test]
    fn test_empty_sequence() {
        let out = encode(&[]);
        let decoded = XmlCodec::new().decode(&mut out.as_slice(), Some(0)).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_expected_count_mismatch() {
        let out = encode(&sample());
        let err = XmlCodec::new()
            .decode(&mut out.as_slice(), Some(3))
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_scan_tag() {
        let out = encode(&sample());
        let names = XmlCodec::new()
            .scan_tag(&mut out.as_slice(), TAG_FIRST_NAME)
            .unwrap();
        assert_eq!(names, vec!["Alice", "Bob", "Sally"]);
    }

    #[test]
    fn test_for_each_streams_top_level() {
        let out = encode(&sample());
        let mut names = Vec::new();
        let n = XmlCodec::new()
            .for_each(&mut out.as_slice(), |_, p| {
                names.push(format!("{} ({})", p.last_name(), p.children().len()));
                Ok(())
            })
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(names, vec!["Smith (0)", "Jones (1)"]);
    }

    #[test]
    fn test_decode_depth_limit() {
        let out = encode(&sample());
        let err = XmlCodec::new()
            .with_max_depth(1)
            .decode(&mut out.as_slice(), None)
            .unwrap_err();
        assert!(err.is_decode());
    }
}
