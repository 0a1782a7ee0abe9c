use std::io::{self, Read, Write};

use lineage_error::{CodecError, CodecResult};
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::{
    check_expected,
    fields::{parse_date, parse_salary},
    tags::{TAG_CHILDREN, TAG_DATE_OF_BIRTH, TAG_FIRST_NAME, TAG_LAST_NAME, TAG_SALARY},
    Codec, CountingWrite, DocumentFormat, DEFAULT_MAX_DEPTH,
};
use crate::model::{Children, Person};

const FORMAT: &str = "json";

/// JSON кодек.
///
/// Документ - массив объектов с ключами в PascalCase. Зарплата пишется
/// строкой, чтобы не терять масштаб; при чтении принимается и число. Ключ
/// `Children` опускается для пустого множества, а при чтении отсутствие
/// ключа, `null` и `[]` одинаково дают пустое множество.
///
/// Числовая зарплата читается по исходным цифрам документа, без
/// промежуточного `f64`. Глубина ограничена
/// [`JSON_MAX_DEPTH`](super::JSON_MAX_DEPTH).
#[derive(Debug, Clone)]
pub struct JsonCodec {
    pretty: bool,
    max_depth: usize,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self {
            pretty: false,
            max_depth: DocumentFormat::Json.depth_limit(DEFAULT_MAX_DEPTH),
        }
    }

    pub fn pretty(
        mut self,
        pretty: bool,
    ) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = DocumentFormat::Json.depth_limit(max_depth);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Декодирует документ из буфера в памяти.
    pub fn decode_slice(
        &self,
        bytes: &[u8],
        expected: Option<usize>,
    ) -> CodecResult<Vec<Person>> {
        let value: Value = serde_json::from_slice(bytes).map_err(json_error)?;
        self.finish_decode(value, expected)
    }

    /// Асинхронно читает source до конца и декодирует документ.
    pub async fn decode_async<R>(
        &self,
        mut source: R,
        expected: Option<usize>,
    ) -> CodecResult<Vec<Person>>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| CodecError::from_read(FORMAT, e))?;
        self.decode_slice(&bytes, expected)
    }

    fn finish_decode(
        &self,
        value: Value,
        expected: Option<usize>,
    ) -> CodecResult<Vec<Person>> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(CodecError::decode(
                    FORMAT,
                    format!("expected a top-level array, found {}", kind_of(&other)),
                ))
            }
        };

        let people = items
            .into_iter()
            .map(|item| self.person_from_value(item, 1))
            .collect::<CodecResult<Vec<_>>>()?;
        check_expected(DocumentFormat::Json, expected, people.len())?;

        debug!(people = people.len(), "JSON document decoded");
        Ok(people)
    }

    fn person_from_value(
        &self,
        value: Value,
        depth: usize,
    ) -> CodecResult<Person> {
        if depth > self.max_depth {
            return Err(CodecError::decode(
                FORMAT,
                format!("nesting depth exceeds limit of {}", self.max_depth),
            ));
        }

        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(CodecError::decode(
                    FORMAT,
                    format!("expected a person object, found {}", kind_of(&other)),
                ))
            }
        };

        let first_name = take_string(&mut object, TAG_FIRST_NAME)?;
        let last_name = take_string(&mut object, TAG_LAST_NAME)?;
        let date_of_birth = parse_date(
            TAG_DATE_OF_BIRTH,
            &take_string(&mut object, TAG_DATE_OF_BIRTH)?,
        )?;
        let salary = match take(&mut object, TAG_SALARY)? {
            Value::String(raw) => parse_salary(TAG_SALARY, &raw)?,
            Value::Number(n) => parse_salary(TAG_SALARY, &n.to_string())?,
            other => {
                return Err(CodecError::type_mismatch(
                    TAG_SALARY,
                    other.to_string(),
                    "decimal",
                ))
            }
        };

        let children = match object.remove(TAG_CHILDREN) {
            None | Some(Value::Null) => Children::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| self.person_from_value(item, depth + 1))
                .collect::<CodecResult<Children>>()?,
            Some(other) => {
                return Err(CodecError::type_mismatch(
                    TAG_CHILDREN,
                    other.to_string(),
                    "array",
                ))
            }
        };

        Ok(Person::new(first_name, last_name, date_of_birth, salary).with_children(children))
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for JsonCodec {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Json
    }

    fn encode(
        &self,
        people: &[Person],
        sink: &mut dyn Write,
    ) -> CodecResult<u64> {
        let mut counter = CountingWrite::new(sink);
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut counter, people)
        } else {
            serde_json::to_writer(&mut counter, people)
        };
        written.map_err(|e| CodecError::Io(io::Error::from(e)))?;
        counter.flush()?;

        debug!(
            people = people.len(),
            bytes = counter.bytes_written(),
            "JSON document encoded"
        );
        Ok(counter.bytes_written())
    }

    fn decode(
        &self,
        source: &mut dyn Read,
        expected: Option<usize>,
    ) -> CodecResult<Vec<Person>> {
        let value: Value = serde_json::from_reader(source).map_err(json_error)?;
        self.finish_decode(value, expected)
    }
}

fn json_error(err: serde_json::Error) -> CodecError {
    if err.is_io() {
        return CodecError::from_read(FORMAT, io::Error::from(err));
    }
    let reason = err.to_string();
    CodecError::decode(FORMAT, reason)
}

fn take(
    object: &mut Map<String, Value>,
    key: &str,
) -> CodecResult<Value> {
    object
        .remove(key)
        .ok_or_else(|| CodecError::decode(FORMAT, format!("person object is missing `{key}`")))
}

fn take_string(
    object: &mut Map<String, Value>,
    key: &str,
) -> CodecResult<String> {
    match take(object, key)? {
        Value::String(s) => Ok(s),
        other => Err(CodecError::type_mismatch(key, other.to_string(), "string")),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
