// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Decoder for the Python-literal text that schema 4 stored in parameter blobs,
//! equation attributes and stimulus weight arrays.
//!
//! Dicts, lists, tuples, quoted strings (with an optional `u`/`b`/`r` prefix), numbers,
//! `True`/`False`/`None` and the JSON spellings `true`/`false` are understood. A bare
//! `null` decodes to the *string* `"null"`, matching how legacy readers quoted it.

use crate::{MigrationError, MigrationResult};
use neurostore_container::DatasetData;
use serde_json::{Map, Number, Value};

/// Parse one literal. Trailing text other than whitespace is an error.
pub fn parse(text: &str) -> MigrationResult<Value> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos != parser.chars.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

/// Parse a literal that must be a dict.
pub fn parse_mapping(text: &str) -> MigrationResult<Map<String, Value>> {
    match parse(text)? {
        Value::Object(map) => Ok(map),
        other => Err(MigrationError::LegacyLiteral(format!(
            "expected a mapping, found {}",
            json_type(&other)
        ))),
    }
}

/// Nested numeric lists as a float dataset. Rows must be rectangular.
pub fn to_float_dataset(value: &Value) -> MigrationResult<DatasetData> {
    let (shape, flat) = flatten(value, |v| v.as_f64())?;
    DatasetData::float_with_shape(&shape, flat).map_err(MigrationError::from)
}

/// Nested integer lists as an int dataset. Whole floats are accepted.
pub fn to_int_dataset(value: &Value) -> MigrationResult<DatasetData> {
    let (shape, flat) = flatten(value, |v| {
        v.as_i64()
            .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
    })?;
    DatasetData::int_with_shape(&shape, flat).map_err(MigrationError::from)
}

fn flatten<T, F>(value: &Value, element: F) -> MigrationResult<(Vec<usize>, Vec<T>)>
where
    F: Fn(&Value) -> Option<T> + Copy,
{
    match value {
        Value::Array(items) => {
            let mut shape: Option<Vec<usize>> = None;
            let mut flat = Vec::new();
            for item in items {
                let (inner_shape, inner) = flatten(item, element)?;
                match &shape {
                    None => shape = Some(inner_shape),
                    Some(expected) if *expected != inner_shape => {
                        return Err(MigrationError::LegacyLiteral(
                            "ragged nested list".to_string(),
                        ))
                    }
                    Some(_) => {}
                }
                flat.extend(inner);
            }
            let mut full = vec![items.len()];
            full.extend(shape.unwrap_or_default());
            Ok((full, flat))
        }
        scalar => element(scalar)
            .map(|v| (Vec::new(), vec![v]))
            .ok_or_else(|| {
                MigrationError::LegacyLiteral(format!("non-numeric element {}", scalar))
            }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, message: &str) -> MigrationError {
        MigrationError::LegacyLiteral(format!("{} at offset {}", message, self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> MigrationResult<()> {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn value(&mut self) -> MigrationResult<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.mapping(),
            Some('[') => self.sequence('[', ']'),
            Some('(') => self.sequence('(', ')'),
            Some('\'') | Some('"') => self.string().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.name(),
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn mapping(&mut self) -> MigrationResult<Value> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => (if b { "True" } else { "False" }).to_string(),
                _ => return Err(self.error("unsupported mapping key")),
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> MigrationResult<Value> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => return Err(self.error(&format!("expected ',' or '{}'", close))),
            }
        }
    }

    fn string(&mut self) -> MigrationResult<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quote")),
        };
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let escaped = self
                .peek()
                .ok_or_else(|| self.error("dangling escape"))?;
            self.pos += 1;
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' | '\'' | '"' => out.push(escaped),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
        Err(self.error("unterminated string"))
    }

    fn number(&mut self) -> MigrationResult<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' | 'e' | 'E' => is_float = true,
                '-' | '+' if matches!(self.chars[self.pos - 1], 'e' | 'E') => {}
                _ => break,
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        // Python 2 long suffix
        if matches!(self.peek(), Some('L') | Some('l')) {
            self.pos += 1;
        }
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::from(i));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error(&format!("invalid number '{}'", text)))
    }

    fn name(&mut self) -> MigrationResult<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        // u'...', b'...', r'...'
        if name.len() == 1
            && matches!(name.as_str(), "u" | "b" | "r" | "U" | "B" | "R")
            && matches!(self.peek(), Some('\'') | Some('"'))
        {
            return self.string().map(Value::String);
        }

        match name.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            "null" => Ok(Value::String("null".to_string())),
            _ => Err(self.error(&format!("unknown name '{}'", name))),
        }
    }
}
