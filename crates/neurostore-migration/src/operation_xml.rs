// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reader for the legacy `Operation.xml` provenance sidecar.
//!
//! The sidecar holds one `Operation` element whose attributes and child elements carry
//! the operation fields as text. Nested children are flattened with dotted keys
//! (`algorithm.module`).

use crate::legacy_literal;
use crate::{MigrationError, MigrationResult};
use chrono::NaiveDateTime;
use neurostore_structures::{parse_legacy_timestamp, Gid};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the sidecar inside an operation folder
pub const OPERATION_XML: &str = "Operation.xml";

const OPERATION_ELEMENT: &str = "operation";

/// Producing algorithm, as the sidecar names it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlgorithmRef {
    pub module: String,
    pub classname: String,
}

/// Fields of one legacy operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyOperation {
    fields: BTreeMap<String, String>,
}

impl LegacyOperation {
    pub fn from_file<P: AsRef<Path>>(path: P) -> MigrationResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_xml(&text)
    }

    pub fn from_xml(text: &str) -> MigrationResult<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut fields = BTreeMap::new();
        let mut found = false;
        // Element names below <Operation>; empty while outside it
        let mut path: Vec<String> = Vec::new();
        let mut inside = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(element)) => {
                    let name = element_name(&element);
                    if inside {
                        path.push(name);
                    } else if name.eq_ignore_ascii_case(OPERATION_ELEMENT) {
                        inside = true;
                        found = true;
                        collect_attributes(&element, &mut fields)?;
                    }
                }
                Ok(Event::Empty(element)) => {
                    let name = element_name(&element);
                    if inside {
                        path.push(name);
                        fields.entry(path.join(".")).or_insert_with(String::new);
                        path.pop();
                    } else if name.eq_ignore_ascii_case(OPERATION_ELEMENT) {
                        found = true;
                        collect_attributes(&element, &mut fields)?;
                    }
                }
                Ok(Event::Text(content)) => {
                    if inside && !path.is_empty() {
                        let value = content
                            .unescape()
                            .map_err(|e| MigrationError::OperationXml(e.to_string()))?;
                        fields
                            .entry(path.join("."))
                            .or_insert_with(String::new)
                            .push_str(&value);
                    }
                }
                Ok(Event::CData(content)) => {
                    if inside && !path.is_empty() {
                        let value = String::from_utf8_lossy(&content.into_inner()).into_owned();
                        fields
                            .entry(path.join("."))
                            .or_insert_with(String::new)
                            .push_str(&value);
                    }
                }
                Ok(Event::End(_)) => {
                    if path.pop().is_none() {
                        inside = false;
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(MigrationError::OperationXml(e.to_string())),
            }
        }

        if !found {
            return Err(MigrationError::OperationXml(
                "no Operation element".to_string(),
            ));
        }
        Ok(Self { fields })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Gid of the legacy operation, when the sidecar records one
    pub fn gid(&self) -> MigrationResult<Option<Gid>> {
        self.field("gid")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| Gid::parse(raw).map_err(MigrationError::from))
            .transpose()
    }

    pub fn create_date(&self) -> MigrationResult<Option<NaiveDateTime>> {
        self.field("create_date")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_legacy_timestamp(raw).map_err(MigrationError::from))
            .transpose()
    }

    /// Burst the operation ran in, when the sidecar records one
    pub fn legacy_burst_id(&self) -> MigrationResult<Option<i64>> {
        match self.field("burst_id").map(str::trim) {
            None | Some("") | Some("None") => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| MigrationError::OperationXml(format!("invalid burst_id '{}'", raw))),
        }
    }

    /// Input parameters. A missing or blank field is an empty mapping.
    pub fn parameters(&self) -> MigrationResult<Map<String, Value>> {
        match self.field("parameters").map(str::trim) {
            None | Some("") => Ok(Map::new()),
            Some(raw) => legacy_literal::parse_mapping(raw),
        }
    }

    /// The producing algorithm: either a `{"module", "classname"}` JSON text or nested
    /// `module`/`classname` elements.
    pub fn algorithm(&self) -> MigrationResult<AlgorithmRef> {
        if let (Some(module), Some(classname)) = (
            self.field("algorithm.module"),
            self.field("algorithm.classname"),
        ) {
            return Ok(AlgorithmRef {
                module: module.trim().to_string(),
                classname: classname.trim().to_string(),
            });
        }
        let raw = self
            .field("algorithm")
            .ok_or_else(|| MigrationError::OperationXml("no algorithm field".to_string()))?;
        Ok(serde_json::from_str(raw)?)
    }
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn collect_attributes(
    element: &BytesStart<'_>,
    fields: &mut BTreeMap<String, String>,
) -> MigrationResult<()> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| MigrationError::OperationXml(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| MigrationError::OperationXml(e.to_string()))?;
        fields.insert(key, value.into_owned());
    }
    Ok(())
}
