// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity normalization of a legacy root metadata block: key casing, byte decoding,
//! version stamp, creation date, identifier and owning adapter.

use crate::legacy_kind::LegacyKind;
use crate::normalize::lowercase_first_character;
use crate::{MigrationError, MigrationResult};
use neurostore_container::AttributeMap;
use neurostore_structures::{
    parse_legacy_timestamp, MetadataValue, RootMetadata, KEY_DATA_VERSION, KEY_GID, KEY_WRITTEN_BY,
};
use std::path::Path;

/// Record kind key, after lowercasing
pub const KEY_TYPE: &str = "type";
/// Stale class-path key, after lowercasing
pub const KEY_MODULE: &str = "module";
pub const KEY_CREATE_DATE: &str = "create_date";
pub const KEY_USER_TAG_1: &str = "user_tag_1";

/// Root metadata after identity normalization, with the legacy kind it declared
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRoot {
    pub kind: LegacyKind,
    pub metadata: RootMetadata,
}

/// Decode every stored attribute and lowercase the first character of its key.
///
/// When two legacy keys collapse onto the same lowercase key, the later one in key order wins.
pub fn lowercase_keys(stored: &AttributeMap) -> RootMetadata {
    stored
        .iter()
        .map(|(key, value)| {
            (
                lowercase_first_character(key),
                MetadataValue::from_stored(value),
            )
        })
        .collect()
}

/// Normalize the identity attributes of a schema 4 root block.
///
/// Fails with `IncompatibleFormat` when the block declares no record kind or one that
/// is not a schema 4 kind.
pub fn normalize_identity(
    path: &Path,
    stored: &AttributeMap,
    target_version: u32,
) -> MigrationResult<NormalizedRoot> {
    let mut metadata = lowercase_keys(stored);

    let class_name = metadata
        .remove(KEY_TYPE)
        .map(|value| value.to_string())
        .ok_or_else(|| {
            MigrationError::incompatible(path, format!("missing metadata: {}", KEY_TYPE))
        })?;
    let kind = LegacyKind::from_class_name(&class_name)
        .ok_or_else(|| {
            MigrationError::incompatible(path, format!("unknown record kind '{}'", class_name))
        })?;

    if let Some(MetadataValue::String(raw)) = metadata.get(KEY_CREATE_DATE) {
        let created = parse_legacy_timestamp(raw)?;
        metadata.insert(KEY_CREATE_DATE, MetadataValue::Timestamp(created));
    }

    metadata.insert(KEY_USER_TAG_1, "");
    metadata.canonicalize_reference(KEY_GID)?;
    metadata.discard(&[KEY_MODULE, KEY_DATA_VERSION]);
    metadata.insert(KEY_DATA_VERSION, MetadataValue::Int(i64::from(target_version)));

    if let Some(adapter) = kind.successor() {
        metadata.insert(KEY_WRITTEN_BY, adapter.class_path());
    }

    Ok(NormalizedRoot { kind, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurostore_structures::{AttrValue, Gid};

    fn legacy_root(entries: &[(&str, &str)]) -> AttributeMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::Bytes(v.as_bytes().to_vec())))
            .collect()
    }

    #[test]
    fn test_identity_normalization() {
        let hex = "0d6bd1b0c09d11e9a6d70242ac130002";
        let stored = legacy_root(&[
            ("Type", "Connectivity"),
            ("Module", "tvb.datatypes.connectivity"),
            ("Gid", hex),
            ("Data_version", "4"),
            ("Create_date", "datetime:2019-07-31 10:20:30.123456"),
            ("User_tag_1", "imported"),
            ("Number_of_regions", "76"),
        ]);

        let normalized = normalize_identity(Path::new("c.h5"), &stored, 5).unwrap();
        let metadata = &normalized.metadata;

        assert_eq!(normalized.kind, LegacyKind::Connectivity);
        assert!(metadata.keys().all(|k| !k.starts_with(char::is_uppercase)));
        assert_eq!(
            metadata.get(KEY_GID),
            Some(&MetadataValue::Reference(Gid::parse(hex).unwrap()))
        );
        assert_eq!(metadata.get(KEY_DATA_VERSION), Some(&MetadataValue::Int(5)));
        assert_eq!(metadata.get_str(KEY_USER_TAG_1), Some(""));
        assert!(metadata.get(KEY_CREATE_DATE).unwrap().as_timestamp().is_some());
        assert!(!metadata.contains(KEY_TYPE));
        assert!(!metadata.contains(KEY_MODULE));
        assert_eq!(
            metadata.get_str(KEY_WRITTEN_BY),
            Some("neurostore.adapters.connectivity_h5.ConnectivityH5")
        );
        assert_eq!(metadata.get_str("number_of_regions"), Some("76"));
    }

    #[test]
    fn test_missing_type_is_incompatible() {
        let stored = legacy_root(&[("Gid", "0d6bd1b0c09d11e9a6d70242ac130002")]);
        let err = normalize_identity(Path::new("x.h5"), &stored, 5).unwrap_err();
        assert!(matches!(err, MigrationError::IncompatibleFormat { .. }));
    }

    #[test]
    fn test_unknown_kind_is_incompatible() {
        let stored = legacy_root(&[
            ("Type", "Hologram"),
            ("Gid", "0d6bd1b0c09d11e9a6d70242ac130002"),
        ]);
        let err = normalize_identity(Path::new("x.h5"), &stored, 5).unwrap_err();
        assert!(
            matches!(&err, MigrationError::IncompatibleFormat { reason, .. } if reason.contains("Hologram"))
        );
    }
}
