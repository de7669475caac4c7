// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! On-disk layout of a container file.
//!
//! ```text
//! [Header]
//! - Magic: "NSTOR" (5 bytes)
//! - Version: u32 LE (4 bytes)
//! - Flags: u8 (1 byte) - bit 0: LZ4 compressed
//! - Uncompressed Size: u64 LE (8 bytes, payload size before compression)
//! - Checksum: u64 LE (8 bytes, FNV-1a of the stored payload bytes)
//! [Data]
//! - Bincode-serialized ContainerPayload (optionally LZ4 compressed)
//! ```

use crate::dataset::{AttributeMap, Dataset};
use crate::{ContainerError, ContainerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::debug;

/// Magic number for container files
const MAGIC: &[u8; 5] = b"NSTOR";

/// Current format version (increment when the header or payload layout changes)
pub const FORMAT_VERSION: u32 = 1;

const FLAG_COMPRESSED: u8 = 1;

/// Everything stored in one container file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerPayload {
    /// Root-level entity attributes
    pub root: AttributeMap,
    /// Named datasets, each with its own attribute block
    pub datasets: BTreeMap<String, Dataset>,
}

/// Encode a payload into `writer`.
pub fn write_container<W: Write>(
    writer: &mut W,
    payload: &ContainerPayload,
    compress: bool,
) -> ContainerResult<()> {
    let data =
        bincode::serialize(payload).map_err(|e| ContainerError::Serialization(e.to_string()))?;
    let uncompressed_size = data.len() as u64;

    let (final_data, flags) = if compress {
        (compress_block(&data)?, FLAG_COMPRESSED)
    } else {
        (data, 0u8)
    };

    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&[flags])?;
    writer.write_all(&uncompressed_size.to_le_bytes())?;
    writer.write_all(&calculate_checksum(&final_data).to_le_bytes())?;
    writer.write_all(&final_data)?;
    Ok(())
}

/// Decode a payload from `reader`, verifying magic, version and checksum.
pub fn read_container<R: Read>(reader: &mut R) -> ContainerResult<ContainerPayload> {
    let mut magic = [0u8; 5];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ContainerError::InvalidMagic(magic));
    }

    let mut version_bytes = [0u8; 4];
    reader.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != FORMAT_VERSION {
        return Err(ContainerError::VersionMismatch {
            file_version: version,
            expected_version: FORMAT_VERSION,
        });
    }

    let mut flags = [0u8; 1];
    reader.read_exact(&mut flags)?;
    let is_compressed = (flags[0] & FLAG_COMPRESSED) != 0;

    let mut size_bytes = [0u8; 8];
    reader.read_exact(&mut size_bytes)?;
    let uncompressed_size = u64::from_le_bytes(size_bytes) as usize;

    let mut checksum_bytes = [0u8; 8];
    reader.read_exact(&mut checksum_bytes)?;
    let expected_checksum = u64::from_le_bytes(checksum_bytes);

    let mut stored = Vec::new();
    reader.read_to_end(&mut stored)?;
    if calculate_checksum(&stored) != expected_checksum {
        return Err(ContainerError::ChecksumMismatch);
    }

    let data = if is_compressed {
        decompress_block(&stored, uncompressed_size)?
    } else {
        stored
    };

    bincode::deserialize(&data).map_err(|e| ContainerError::Deserialization(e.to_string()))
}

/// Load a container file.
pub fn load_container<P: AsRef<Path>>(path: P) -> ContainerResult<ContainerPayload> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let payload = read_container(&mut reader)?;
    debug!(
        target: "neurostore-container",
        "Loaded {} ({} root attributes, {} datasets)",
        path.display(),
        payload.root.len(),
        payload.datasets.len()
    );
    Ok(payload)
}

/// Write a container file through a temporary sibling and an atomic rename, so a crash
/// leaves either the previous file or the complete new one.
pub fn save_container<P: AsRef<Path>>(
    path: P,
    payload: &ContainerPayload,
    compress: bool,
) -> ContainerResult<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    write_container(staged.as_file_mut(), payload, compress)?;
    staged.as_file_mut().flush()?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| ContainerError::Io(e.error))?;

    debug!(target: "neurostore-container", "Committed {}", path.display());
    Ok(())
}

#[cfg(feature = "compression")]
fn compress_block(data: &[u8]) -> ContainerResult<Vec<u8>> {
    lz4::block::compress(data, None, false).map_err(|e| ContainerError::Compression(e.to_string()))
}

#[cfg(not(feature = "compression"))]
fn compress_block(_data: &[u8]) -> ContainerResult<Vec<u8>> {
    Err(ContainerError::Compression(
        "compression requested but the compression feature is not enabled".to_string(),
    ))
}

#[cfg(feature = "compression")]
fn decompress_block(data: &[u8], uncompressed_size: usize) -> ContainerResult<Vec<u8>> {
    let size = i32::try_from(uncompressed_size)
        .map_err(|_| ContainerError::Compression(format!("payload too large: {}", uncompressed_size)))?;
    lz4::block::decompress(data, Some(size))
        .map_err(|e| ContainerError::Compression(format!("Decompression failed: {}", e)))
}

#[cfg(not(feature = "compression"))]
fn decompress_block(_data: &[u8], _uncompressed_size: usize) -> ContainerResult<Vec<u8>> {
    Err(ContainerError::Compression(
        "File is compressed but compression feature is not enabled".to_string(),
    ))
}

/// FNV-1a over the stored bytes
fn calculate_checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetData;
    use neurostore_structures::AttrValue;
    use tempfile::TempDir;

    fn sample_payload() -> ContainerPayload {
        let mut payload = ContainerPayload::default();
        payload
            .root
            .insert("Type".into(), AttrValue::Bytes(b"Connectivity".to_vec()));
        payload.datasets.insert(
            "weights".into(),
            Dataset::new(DatasetData::from_vec_f64(vec![0.0, 1.5, 3.0])),
        );
        payload
    }

    #[test]
    fn test_save_load_compressed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Connectivity_1.h5");
        save_container(&path, &sample_payload(), cfg!(feature = "compression")).unwrap();

        let loaded = load_container(&path).unwrap();
        assert_eq!(loaded, sample_payload());
        // no stray temporary files next to the committed one
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes: &[u8] = b"WRONG0000000000000000000000";
        let result = read_container(&mut bytes);
        assert!(matches!(result, Err(ContainerError::InvalidMagic(_))));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut encoded = Vec::new();
        write_container(&mut encoded, &sample_payload(), false).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;

        let result = read_container(&mut encoded.as_slice());
        assert!(matches!(result, Err(ContainerError::ChecksumMismatch)));
    }

    #[test]
    fn test_checksum() {
        assert_eq!(calculate_checksum(b"hello world"), calculate_checksum(b"hello world"));
        assert_ne!(calculate_checksum(b"hello world"), calculate_checksum(b"hello worlD"));
    }
}
