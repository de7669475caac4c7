// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Attribute values as stored on disk, and the typed root-metadata value model.
//!
//! Containers persist attributes as [`AttrValue`]s: plain text, raw bytes or numbers.
//! The textual encodings `bool:True`, `datetime:...` and `urn:uuid:...` are a storage
//! convention only; in memory they are represented by [`MetadataValue`] variants and
//! converted at the boundary by [`MetadataValue::to_stored`] / [`MetadataValue::from_stored`].

use crate::gid::{is_canonical_urn, Gid};
use crate::{StructureError, StructureResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Prefix marking an encoded boolean
pub const BOOL_PREFIX: &str = "bool:";
/// Prefix marking an encoded timestamp
pub const DATETIME_PREFIX: &str = "datetime:";
/// Layout of encoded timestamps after the `datetime:` prefix
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d,%H-%M-%S%.6f";
/// Layout used by legacy containers and legacy index exports
pub const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A single attribute as persisted inside a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl AttrValue {
    /// Textual view of the value. Bytes are decoded as UTF-8 (lossy), numbers formatted.
    pub fn to_text(&self) -> String {
        match self {
            AttrValue::Text(s) => s.clone(),
            AttrValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Float(f) => f.to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_bytes(&self) -> bool {
        matches!(self, AttrValue::Bytes(_))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

/// Typed root-metadata value
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Timestamp(NaiveDateTime),
    Reference(Gid),
}

impl MetadataValue {
    /// Encode for storage inside a container.
    pub fn to_stored(&self) -> AttrValue {
        match self {
            MetadataValue::Int(i) => AttrValue::Int(*i),
            MetadataValue::Float(f) => AttrValue::Float(*f),
            MetadataValue::Bool(true) => AttrValue::Text(format!("{}True", BOOL_PREFIX)),
            MetadataValue::Bool(false) => AttrValue::Text(format!("{}False", BOOL_PREFIX)),
            MetadataValue::String(s) => AttrValue::Text(s.clone()),
            MetadataValue::Timestamp(ts) => AttrValue::Text(format!(
                "{}{}",
                DATETIME_PREFIX,
                ts.format(TIMESTAMP_FORMAT)
            )),
            MetadataValue::Reference(gid) => AttrValue::Text(gid.urn()),
        }
    }

    /// Decode a stored attribute, recognising the tagged encodings.
    ///
    /// Text that merely looks tagged but does not parse (e.g. `bool:maybe`) stays a string.
    pub fn from_stored(value: &AttrValue) -> Self {
        match value {
            AttrValue::Int(i) => MetadataValue::Int(*i),
            AttrValue::Float(f) => MetadataValue::Float(*f),
            AttrValue::Text(s) => Self::from_tagged_text(s),
            AttrValue::Bytes(b) => Self::from_tagged_text(&String::from_utf8_lossy(b)),
        }
    }

    fn from_tagged_text(text: &str) -> Self {
        if let Some(flag) = text.strip_prefix(BOOL_PREFIX) {
            match flag {
                "True" => return MetadataValue::Bool(true),
                "False" => return MetadataValue::Bool(false),
                _ => {}
            }
        }
        if let Some(raw) = text.strip_prefix(DATETIME_PREFIX) {
            if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
                return MetadataValue::Timestamp(ts);
            }
        }
        if is_canonical_urn(text) {
            if let Ok(gid) = Gid::parse(text) {
                return MetadataValue::Reference(gid);
            }
        }
        MetadataValue::String(text.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Int(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Gid> {
        match self {
            MetadataValue::Reference(g) => Some(*g),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            MetadataValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::Int(_) => "int",
            MetadataValue::Float(_) => "float",
            MetadataValue::Bool(_) => "bool",
            MetadataValue::String(_) => "string",
            MetadataValue::Timestamp(_) => "timestamp",
            MetadataValue::Reference(_) => "reference",
        }
    }
}

impl Display for MetadataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_stored().to_text())
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<Gid> for MetadataValue {
    fn from(value: Gid) -> Self {
        MetadataValue::Reference(value)
    }
}

/// Legacy boolean tokens: `"0"` and any casing of `"false"` are false, everything else is true.
pub fn parse_legacy_bool(token: &str) -> bool {
    let token = token.trim().trim_matches('"');
    !(token == "0" || token.eq_ignore_ascii_case("false"))
}

/// Parse a legacy creation date, with or without the `datetime:` prefix.
///
/// Accepts the legacy `%Y-%m-%d %H:%M:%S.%f` layout and the current encoded layout.
pub fn parse_legacy_timestamp(raw: &str) -> StructureResult<NaiveDateTime> {
    let body = raw.trim().strip_prefix(DATETIME_PREFIX).unwrap_or(raw.trim());
    NaiveDateTime::parse_from_str(body, LEGACY_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(body, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(body, TIMESTAMP_FORMAT))
        .map_err(|_| StructureError::InvalidTimestamp(raw.to_string()))
}

/// Root metadata of one container, keyed by attribute name.
///
/// Rewrites take the mapping by value and hand back a new one; the helpers below
/// are the only way values change type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootMetadata {
    entries: BTreeMap<String, MetadataValue>,
}

impl RootMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every stored attribute with [`MetadataValue::from_stored`].
    pub fn from_stored(attributes: &BTreeMap<String, AttrValue>) -> Self {
        let entries = attributes
            .iter()
            .map(|(k, v)| (k.clone(), MetadataValue::from_stored(v)))
            .collect();
        Self { entries }
    }

    pub fn to_stored(&self) -> BTreeMap<String, AttrValue> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_stored()))
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(MetadataValue::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.entries.remove(key)
    }

    /// Remove a key that must be present.
    pub fn take_required(&mut self, key: &str) -> StructureResult<MetadataValue> {
        self.entries
            .remove(key)
            .ok_or_else(|| StructureError::MissingAttribute(key.to_string()))
    }

    /// Remove obsolete keys; absent ones are ignored.
    pub fn discard(&mut self, keys: &[&str]) {
        for key in keys {
            self.entries.remove(*key);
        }
    }

    /// Text of a required key. Non-string values are rendered in their stored form.
    pub fn required_text(&self, key: &str) -> StructureResult<String> {
        match self.entries.get(key) {
            Some(MetadataValue::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_stored().to_text()),
            None => Err(StructureError::MissingAttribute(key.to_string())),
        }
    }

    /// Replace a textual value with its integer parse.
    pub fn coerce_int(&mut self, key: &str) -> StructureResult<i64> {
        let value = match self.entries.get(key) {
            Some(MetadataValue::Int(i)) => *i,
            Some(MetadataValue::Float(f)) if f.fract() == 0.0 => *f as i64,
            Some(other) => {
                let text = other.to_stored().to_text();
                parse_int_text(&text).ok_or_else(|| StructureError::Coercion {
                    key: key.to_string(),
                    expected: "int",
                    found: text,
                })?
            }
            None => return Err(StructureError::MissingAttribute(key.to_string())),
        };
        self.entries.insert(key.to_string(), MetadataValue::Int(value));
        Ok(value)
    }

    /// Replace a textual value with its float parse.
    pub fn coerce_float(&mut self, key: &str) -> StructureResult<f64> {
        let value = match self.entries.get(key) {
            Some(MetadataValue::Int(i)) => *i as f64,
            Some(MetadataValue::Float(f)) => *f,
            Some(other) => {
                let text = other.to_stored().to_text();
                text.trim()
                    .trim_matches('"')
                    .parse::<f64>()
                    .map_err(|_| StructureError::Coercion {
                        key: key.to_string(),
                        expected: "float",
                        found: text.clone(),
                    })?
            }
            None => return Err(StructureError::MissingAttribute(key.to_string())),
        };
        self.entries.insert(key.to_string(), MetadataValue::Float(value));
        Ok(value)
    }

    /// Re-encode a legacy boolean token as a typed boolean.
    pub fn coerce_bool(&mut self, key: &str) -> StructureResult<bool> {
        let value = match self.entries.get(key) {
            Some(MetadataValue::Bool(b)) => *b,
            Some(MetadataValue::String(s)) => parse_legacy_bool(s),
            Some(MetadataValue::Int(i)) => *i != 0,
            Some(other) => {
                return Err(StructureError::Coercion {
                    key: key.to_string(),
                    expected: "bool",
                    found: other.type_name().to_string(),
                })
            }
            None => return Err(StructureError::MissingAttribute(key.to_string())),
        };
        self.entries.insert(key.to_string(), MetadataValue::Bool(value));
        Ok(value)
    }

    /// Remove embedded double quotes from a required textual value.
    pub fn strip_quotes(&mut self, key: &str) -> StructureResult<()> {
        let text = self.required_text(key)?;
        self.entries
            .insert(key.to_string(), MetadataValue::String(text.replace('"', "")));
        Ok(())
    }

    /// Turn a legacy bare identifier into a typed reference. Returns the parsed gid.
    pub fn canonicalize_reference(&mut self, key: &str) -> StructureResult<Gid> {
        let text = match self.entries.get(key) {
            Some(MetadataValue::String(s)) => s.clone(),
            Some(other) => {
                return Err(StructureError::InvalidGid(format!(
                    "{} holds a {}",
                    key,
                    other.type_name()
                )))
            }
            None => return Err(StructureError::MissingAttribute(key.to_string())),
        };
        let gid = Gid::parse_legacy(&text)?;
        self.entries
            .insert(key.to_string(), MetadataValue::Reference(gid));
        Ok(gid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, MetadataValue)> for RootMetadata {
    fn from_iter<T: IntoIterator<Item = (String, MetadataValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RootMetadata {
    type Item = (String, MetadataValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, MetadataValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn parse_int_text(text: &str) -> Option<i64> {
    let trimmed = text.trim().trim_matches('"');
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_legacy_bool_tokens() {
        assert!(!parse_legacy_bool("0"));
        assert!(!parse_legacy_bool("false"));
        assert!(!parse_legacy_bool("False"));
        assert!(parse_legacy_bool("1"));
        assert!(parse_legacy_bool("true"));
        assert!(parse_legacy_bool("yes"));
    }

    #[test]
    fn test_bool_stores_as_tagged_text() {
        assert_eq!(
            MetadataValue::Bool(true).to_stored(),
            AttrValue::Text("bool:True".into())
        );
        assert_eq!(
            MetadataValue::from_stored(&AttrValue::Text("bool:False".into())),
            MetadataValue::Bool(false)
        );
    }

    #[test]
    fn test_timestamp_encoding() {
        let ts = NaiveDate::from_ymd_opt(2020, 3, 11)
            .unwrap()
            .and_hms_micro_opt(14, 5, 9, 123456)
            .unwrap();
        let stored = MetadataValue::Timestamp(ts).to_stored();
        assert_eq!(
            stored,
            AttrValue::Text("datetime:2020-03-11,14-05-09.123456".into())
        );
        assert_eq!(MetadataValue::from_stored(&stored), MetadataValue::Timestamp(ts));
    }

    #[test]
    fn test_legacy_timestamp_parse() {
        let ts = parse_legacy_timestamp("datetime:2019-11-04 10:22:01.026490").unwrap();
        assert_eq!(ts.format(TIMESTAMP_FORMAT).to_string(), "2019-11-04,10-22-01.026490");
        assert!(parse_legacy_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_bytes_decode_to_untagged_string() {
        let value = MetadataValue::from_stored(&AttrValue::Bytes(b"Connectivity".to_vec()));
        assert_eq!(value, MetadataValue::String("Connectivity".into()));
    }

    #[test]
    fn test_coercions() {
        let mut meta = RootMetadata::new();
        meta.insert("number_of_regions", "76");
        meta.insert("cutoff", "40.0");
        meta.insert("undirected", "0");
        meta.insert("broken", "abc");

        assert_eq!(meta.coerce_int("number_of_regions").unwrap(), 76);
        assert_eq!(meta.coerce_float("cutoff").unwrap(), 40.0);
        assert!(!meta.coerce_bool("undirected").unwrap());
        assert!(matches!(
            meta.coerce_int("broken"),
            Err(StructureError::Coercion { .. })
        ));
        assert!(matches!(
            meta.coerce_int("absent"),
            Err(StructureError::MissingAttribute(_))
        ));
        assert_eq!(
            meta.get("undirected").map(|v| v.to_stored()),
            Some(AttrValue::Text("bool:False".into()))
        );
    }

    #[test]
    fn test_canonicalize_reference_and_strip_quotes() {
        let mut meta = RootMetadata::new();
        meta.insert("connectivity", "1c9b8a3e-5f2d-11ea-8e2d-0242ac130003");
        meta.insert("title", "\"Region\" series");

        let gid = meta.canonicalize_reference("connectivity").unwrap();
        meta.strip_quotes("title").unwrap();

        assert_eq!(meta.get("connectivity"), Some(&MetadataValue::Reference(gid)));
        assert_eq!(meta.get_str("title"), Some("Region series"));
        assert!(meta.canonicalize_reference("connectivity").is_err());
    }
}
