//! Readers and writers for the two export files.
//!
//! `export.json` is the interchange form, pretty printed with four-space
//! indentation. `export.npy` carries the same document as a versioned binary
//! archive so array data survives without a text round trip.

use scan_core::codec::{decode_tree, DecodedTree};
use scan_core::error::{Result, StorageError};
use scan_core::rig::ExportDocument;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub const JSON_FILE: &str = "export.json";
pub const ARCHIVE_FILE: &str = "export.npy";
pub const ARCHIVE_VERSION: u32 = 1;

const JSON_INDENT: &[u8] = b"    ";

#[derive(Serialize)]
struct ArchiveRef<'a> {
    version: u32,
    document: &'a ExportDocument,
}

fn serialize_err(err: impl std::fmt::Display) -> StorageError {
    StorageError::Serialize(err.to_string())
}

/// Render `document` as indented JSON without a trailing newline
pub fn to_json_string(document: &ExportDocument) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(JSON_INDENT));
    document.serialize(&mut serializer).map_err(serialize_err)?;
    Ok(String::from_utf8(buf).map_err(serialize_err)?)
}

pub fn write_json(path: &Path, document: &ExportDocument) -> Result<()> {
    let text = to_json_string(document)?;
    fs::write(path, text).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?)
}

/// Read `export.json` back into typed descriptors
pub fn read_json(path: &Path) -> Result<ExportDocument> {
    let text = read_text(path)?;
    Ok(serde_json::from_str(&text).map_err(serialize_err)?)
}

/// Read any JSON file, decoding every tagged array it contains
pub fn read_json_tree(path: &Path) -> Result<DecodedTree> {
    let text = read_text(path)?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(serialize_err)?;
    Ok(decode_tree(value)?)
}

pub fn write_archive(path: &Path, document: &ExportDocument) -> Result<()> {
    let write_err = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);

    let archive = ArchiveRef {
        version: ARCHIVE_VERSION,
        document,
    };
    bincode::serialize_into(&mut writer, &archive).map_err(serialize_err)?;
    writer.flush().map_err(write_err)?;
    Ok(())
}

pub fn read_archive(path: &Path) -> Result<ExportDocument> {
    let file = File::open(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let version: u32 = bincode::deserialize_from(&mut reader).map_err(serialize_err)?;
    if version != ARCHIVE_VERSION {
        return Err(StorageError::ArchiveVersion {
            found: version,
            expected: ARCHIVE_VERSION,
        }
        .into());
    }
    Ok(bincode::deserialize_from(&mut reader).map_err(serialize_err)?)
}
