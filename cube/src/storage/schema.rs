//! Table naming rules and on-disk key/row encodings.
//!
//! Attribute names become sled tree names, so they are checked against an
//! allow-list before any store access: an ASCII letter followed by ASCII
//! letters, digits or underscores, at most [`MAX_ATTRIBUTE_NAME_LEN`] bytes.
//!
//! ## Encodings
//!
//! | Table          | Key                                  | Value               |
//! |----------------|--------------------------------------|---------------------|
//! | `position`     | `id` (8B BE)                         | `bincode(PositionRow)` |
//! | `__cell_index` | `inline ‖ crline ‖ twt` (3 × 8B, sortable) | `id` (8B BE)  |
//! | `<attribute>`  | `id` (8B BE)                         | `value` (f64, 8B BE) |
//!
//! The index key encodings preserve numeric order under sled's lexicographic
//! ordering, so a scan of `__cell_index` visits cells by inline, then
//! crossline, then depth.

use serde::{Deserialize, Serialize};

use crate::config::{MAX_ATTRIBUTE_NAME_LEN, POSITION_TABLE};
use crate::error::{CubeError, CubeResult};

/// A validated attribute (table) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeName(String);

impl AttributeName {
    pub fn parse(name: &str) -> CubeResult<Self> {
        let invalid = |reason| CubeError::InvalidAttributeName {
            name: name.to_string(),
            reason,
        };

        let mut chars = name.chars();
        match chars.next() {
            None => return Err(invalid("name is empty")),
            Some(c) if !c.is_ascii_alphabetic() => {
                return Err(invalid("name must start with an ASCII letter"))
            }
            Some(_) => {}
        }
        if name.len() > MAX_ATTRIBUTE_NAME_LEN {
            return Err(invalid("name is too long"));
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("name may only contain ASCII letters, digits and '_'"));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name belongs to the schema rather than to an attribute.
    pub fn is_reserved(&self) -> bool {
        is_reserved(&self.0)
    }
}

impl std::fmt::Display for AttributeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Table names compare case-insensitively against the reserved set.
pub fn is_reserved(name: &str) -> bool {
    name.eq_ignore_ascii_case(POSITION_TABLE)
}

/// One row of the `position` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    pub inline: i64,
    pub crline: i64,
    pub twt: f64,
}

// -- Keys -------------------------------------------------------------------

pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn decode_id(bytes: &[u8]) -> CubeResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| CubeError::Serialization(format!("invalid id of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

pub fn encode_value(value: f64) -> [u8; 8] {
    value.to_be_bytes()
}

pub fn decode_value(bytes: &[u8]) -> CubeResult<f64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| CubeError::Serialization(format!("invalid value of {} bytes", bytes.len())))?;
    Ok(f64::from_be_bytes(raw))
}

fn sortable_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ (1 << 63)).to_be_bytes()
}

fn unsortable_i64(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ (1 << 63)) as i64
}

fn sortable_f64(v: f64) -> [u8; 8] {
    // -0.0 and 0.0 must share a key.
    let bits = if v == 0.0 { 0 } else { v.to_bits() };
    let ordered = if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) };
    ordered.to_be_bytes()
}

fn unsortable_f64(bytes: [u8; 8]) -> f64 {
    let ordered = u64::from_be_bytes(bytes);
    let bits = if ordered >> 63 == 1 { ordered ^ (1 << 63) } else { !ordered };
    f64::from_bits(bits)
}

/// Key prefix selecting every cell of one inline.
pub fn inline_prefix(inline: i64) -> Vec<u8> {
    sortable_i64(inline).to_vec()
}

/// Key prefix selecting every sample of one `(inline, crline)` column.
pub fn column_prefix(inline: i64, crline: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&sortable_i64(inline));
    key.extend_from_slice(&sortable_i64(crline));
    key
}

/// Full `__cell_index` key of one cell.
pub fn cell_key(row: &PositionRow) -> [u8; 24] {
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&sortable_i64(row.inline));
    key[8..16].copy_from_slice(&sortable_i64(row.crline));
    key[16..].copy_from_slice(&sortable_f64(row.twt));
    key
}

pub fn decode_cell_key(bytes: &[u8]) -> CubeResult<PositionRow> {
    if bytes.len() != 24 {
        return Err(CubeError::Serialization(format!(
            "invalid cell key of {} bytes",
            bytes.len()
        )));
    }
    let part = |i: usize| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
        raw
    };
    Ok(PositionRow {
        inline: unsortable_i64(part(0)),
        crline: unsortable_i64(part(1)),
        twt: unsortable_f64(part(2)),
    })
}
