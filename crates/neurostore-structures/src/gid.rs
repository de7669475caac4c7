// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Globally unique identifiers for stored records.
//!
//! Every record is addressed by a UUID. On disk and in the index the identifier is
//! rendered in the canonical URN form `urn:uuid:<32 lowercase hex digits>`; the index
//! additionally keys rows by the bare 32-digit hex form.

use crate::{StructureError, StructureResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Prefix of the canonical identifier form
pub const GID_PREFIX: &str = "urn:uuid:";

/// Record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gid(Uuid);

impl Gid {
    pub fn new_random() -> Self {
        Gid(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Gid(uuid)
    }

    /// Name-based gid in the namespace of `self`. The same owner and label always give
    /// the same gid.
    pub fn derived(&self, label: &str) -> Self {
        Gid(Uuid::new_v5(&self.0, label.as_bytes()))
    }

    /// Parse a legacy identifier: bare hex, with or without dashes.
    ///
    /// Values that already carry the URN prefix are rejected so that a reference is
    /// canonicalized exactly once.
    pub fn parse_legacy(raw: &str) -> StructureResult<Self> {
        let trimmed = raw.trim().trim_matches('"');
        if trimmed.starts_with(GID_PREFIX) {
            return Err(StructureError::InvalidGid(format!(
                "{} (already canonical)",
                raw
            )));
        }
        Self::parse_hex(trimmed).ok_or_else(|| StructureError::InvalidGid(raw.to_string()))
    }

    /// Parse any accepted form: URN, bare hex, dashed hex.
    pub fn parse(raw: &str) -> StructureResult<Self> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix(GID_PREFIX).unwrap_or(trimmed);
        Self::parse_hex(body).ok_or_else(|| StructureError::InvalidGid(raw.to_string()))
    }

    fn parse_hex(body: &str) -> Option<Self> {
        let compact: String = body.chars().filter(|c| *c != '-').collect();
        if compact.len() != 32 || !compact.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Uuid::parse_str(&compact).ok().map(Gid)
    }

    /// 32 lowercase hex digits, no dashes
    pub fn hex(&self) -> String {
        self.0.simple().to_string()
    }

    /// `urn:uuid:` followed by [`Gid::hex`]
    pub fn urn(&self) -> String {
        format!("{}{}", GID_PREFIX, self.hex())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for Gid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.urn())
    }
}

impl FromStr for Gid {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gid::parse(s)
    }
}

/// True when `value` is `urn:uuid:` followed by exactly 32 hex digits.
pub fn is_canonical_urn(value: &str) -> bool {
    match value.strip_prefix(GID_PREFIX) {
        Some(hex) => hex.len() == 32 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_dashed_gid_renders_compact_urn() {
        let gid = Gid::parse_legacy("1c9b8a3e-5f2d-11ea-8e2d-0242ac130003").unwrap();
        assert_eq!(gid.urn(), "urn:uuid:1c9b8a3e5f2d11ea8e2d0242ac130003");
        assert!(is_canonical_urn(&gid.urn()));
    }

    #[test]
    fn test_parse_legacy_rejects_canonical_value() {
        let result = Gid::parse_legacy("urn:uuid:1c9b8a3e5f2d11ea8e2d0242ac130003");
        assert!(matches!(result, Err(StructureError::InvalidGid(_))));
    }

    #[test]
    fn test_parse_accepts_all_forms() {
        let a = Gid::parse("urn:uuid:1c9b8a3e5f2d11ea8e2d0242ac130003").unwrap();
        let b = Gid::parse("1C9B8A3E5F2D11EA8E2D0242AC130003").unwrap();
        let c = Gid::parse("1c9b8a3e-5f2d-11ea-8e2d-0242ac130003").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.hex(), "1c9b8a3e5f2d11ea8e2d0242ac130003");
    }

    proptest::proptest! {
        #[test]
        fn prop_any_legacy_form_renders_canonical(bytes in proptest::array::uniform16(proptest::num::u8::ANY), dashed in proptest::bool::ANY) {
            let uuid = Uuid::from_bytes(bytes);
            let legacy = if dashed { uuid.hyphenated().to_string() } else { uuid.simple().to_string() };
            let gid = Gid::parse_legacy(&legacy).unwrap();
            proptest::prop_assert!(is_canonical_urn(&gid.urn()));
            proptest::prop_assert_eq!(gid.as_uuid(), &uuid);
        }
    }

    #[test]
    fn test_derived_gid_is_stable_per_label() {
        let owner = Gid::parse("1c9b8a3e5f2d11ea8e2d0242ac130003").unwrap();
        assert_eq!(owner.derived("ViewModel"), owner.derived("ViewModel"));
        assert_ne!(owner.derived("ViewModel"), owner.derived("BurstConfiguration"));
        assert_ne!(owner.derived("ViewModel"), owner);
        assert!(is_canonical_urn(&owner.derived("ViewModel").urn()));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(Gid::parse("not-a-gid").is_err());
        assert!(Gid::parse("").is_err());
        assert!(!is_canonical_urn("urn:uuid:1234"));
    }
}
