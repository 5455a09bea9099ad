// SPDX-License-Identifier: Apache-2.0
//! The delta file container: an ordered sequence of block payloads,
//! followed by a JSON metadata trailer and an 8-byte length tail.
//!
//! ```text
//! [block_0 payload bytes]
//! [block_1 payload bytes]
//! ...
//! [meta: UTF-8 JSON, ordered mapping { block_name -> block_meta }]
//! [tail: 8-byte signed little-endian integer = len(meta) in bytes]
//! ```
//!
//! Random access works backwards: read the last 8 bytes for the tail
//! length, then the `meta` object immediately before it, then sum `chunk`
//! lengths forward from the start of the file to locate any block.

use serde_json::{Map, Value};

use crate::block::{AxisBlock, Chunk, ExtensionBlock, PutBlock};
use crate::error::FormatError;
use crate::table::Table;

/// The ordered block set produced by a single commit.
///
/// Canonical emission order is always `axis`, `put`, `extend`; a field left
/// `None` means that block was not emitted for this commit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeltaPayload {
    /// Structural drops/relabels, if any were recorded.
    pub axis: Option<AxisBlock>,
    /// In-place value overrides, if any were recorded.
    pub put: Option<PutBlock>,
    /// Appended columns/rows, if any were recorded.
    pub extend: Option<ExtensionBlock>,
}

impl DeltaPayload {
    /// Whether this commit produced no blocks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axis.is_none() && self.put.is_none() && self.extend.is_none()
    }

    /// Fold every block in canonical order into `table`.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if an extend block's shapes are
    /// inconsistent with the table it is folded into.
    pub fn apply(&self, mut table: Table) -> Result<Table, FormatError> {
        if let Some(axis) = &self.axis {
            table = axis.apply(table);
        }
        if let Some(put) = &self.put {
            table = put.apply(table);
        }
        if let Some(extend) = &self.extend {
            table = extend.apply(table)?;
        }
        Ok(table)
    }
}

fn chunk_total(value: &Value) -> Result<u64, FormatError> {
    let chunk: Chunk = value
        .get("chunk")
        .cloned()
        .ok_or_else(|| FormatError::Container("block metadata missing chunk".to_string()))
        .and_then(|v| serde_json::from_value(v).map_err(|e| FormatError::Container(e.to_string())))?;
    Ok(chunk.lengths().iter().sum())
}

/// Serialize a delta payload into the on-disk container format.
///
/// # Errors
///
/// Returns a [`FormatError`] if any block fails to encode.
pub fn write_delta(payload: &DeltaPayload) -> Result<Vec<u8>, FormatError> {
    let mut bytes = Vec::new();
    let mut meta = Map::new();

    if let Some(axis) = &payload.axis {
        let (m, p) = axis.write()?;
        bytes.extend_from_slice(&p);
        meta.insert("axis".to_string(), serde_json::to_value(m).map_err(|e| FormatError::Container(e.to_string()))?);
    }
    if let Some(put) = &payload.put {
        let (m, p) = put.write()?;
        bytes.extend_from_slice(&p);
        meta.insert("put".to_string(), serde_json::to_value(m).map_err(|e| FormatError::Container(e.to_string()))?);
    }
    if let Some(extend) = &payload.extend {
        let (m, p) = extend.write()?;
        bytes.extend_from_slice(&p);
        meta.insert("extend".to_string(), serde_json::to_value(m).map_err(|e| FormatError::Container(e.to_string()))?);
    }

    let meta_bytes = serde_json::to_vec(&Value::Object(meta)).map_err(|e| FormatError::Container(e.to_string()))?;
    bytes.extend_from_slice(&meta_bytes);

    let tail_len = i64::try_from(meta_bytes.len())
        .map_err(|_| FormatError::Container("metadata too large for an 8-byte tail".to_string()))?;
    bytes.extend_from_slice(&tail_len.to_le_bytes());

    Ok(bytes)
}

/// Parse a delta payload from the on-disk container format.
///
/// # Errors
///
/// Returns [`FormatError::Container`] if the tail, metadata, or chunk sums
/// are malformed, or [`FormatError::Block`] if a block name is unknown.
pub fn read_delta(bytes: &[u8]) -> Result<DeltaPayload, FormatError> {
    if bytes.len() < 8 {
        return Err(FormatError::Container("file shorter than the length tail".to_string()));
    }
    let (head, tail_bytes) = bytes.split_at(bytes.len() - 8);
    let tail_array: [u8; 8] = tail_bytes
        .try_into()
        .map_err(|_| FormatError::Container("tail is not 8 bytes".to_string()))?;
    let meta_len = i64::from_le_bytes(tail_array);
    let meta_len = usize::try_from(meta_len)
        .map_err(|_| FormatError::Container(format!("negative meta length: {meta_len}")))?;
    if meta_len > head.len() {
        return Err(FormatError::Container("meta length exceeds file size".to_string()));
    }
    let meta_start = head.len() - meta_len;
    let (block_bytes, meta_bytes) = head.split_at(meta_start);

    let meta: Map<String, Value> =
        serde_json::from_slice(meta_bytes).map_err(|e| FormatError::Container(e.to_string()))?;

    let mut offset = 0usize;
    let mut payload = DeltaPayload::default();
    for (name, value) in meta {
        let total = chunk_total(&value)? as usize;
        if offset + total > block_bytes.len() {
            return Err(FormatError::Container(format!("block '{name}' overruns its chunk bounds")));
        }
        let slice = &block_bytes[offset..offset + total];
        match name.as_str() {
            "axis" => {
                let m = serde_json::from_value(value).map_err(|e| FormatError::Container(e.to_string()))?;
                payload.axis = Some(AxisBlock::parse(&m, slice)?);
            }
            "put" => {
                let m = serde_json::from_value(value).map_err(|e| FormatError::Container(e.to_string()))?;
                payload.put = Some(PutBlock::parse(&m, slice)?);
            }
            "extend" => {
                let m = serde_json::from_value(value).map_err(|e| FormatError::Container(e.to_string()))?;
                payload.extend = Some(ExtensionBlock::parse(&m, slice)?);
            }
            other => return Err(FormatError::Block(format!("unknown block class: {other}"))),
        }
        offset += total;
    }

    Ok(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::table::Column;

    // ── 1. round trip an axis-only payload ──
    #[test]
    fn round_trip_axis_only() {
        let payload = DeltaPayload {
            axis: Some(AxisBlock { drop_rows: vec![1], ..Default::default() }),
            put: None,
            extend: None,
        };
        let bytes = write_delta(&payload).unwrap();
        let back = read_delta(&bytes).unwrap();
        assert_eq!(back, payload);
    }

    // ── 2. round trip all three block kinds together ──
    #[test]
    fn round_trip_all_blocks() {
        let values = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(1)]))]).unwrap();
        let new_col = Table::new(vec![0, 1], vec![("c".to_string(), Column::Int64(vec![Some(2), Some(3)]))]).unwrap();
        let payload = DeltaPayload {
            axis: Some(AxisBlock { relabel_cols: vec!["renamed".to_string()], ..Default::default() }),
            put: Some(PutBlock { values, dtypes: None }),
            extend: Some(ExtensionBlock { cols: Some(new_col), rows: None }),
        };
        let bytes = write_delta(&payload).unwrap();
        let back = read_delta(&bytes).unwrap();
        assert_eq!(back, payload);
    }

    // ── 3. meta trailer preserves canonical key order ──
    #[test]
    fn meta_preserves_canonical_order() {
        let payload = DeltaPayload {
            axis: Some(AxisBlock { drop_rows: vec![1], ..Default::default() }),
            put: Some(PutBlock {
                values: Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(1)]))]).unwrap(),
                dtypes: None,
            }),
            extend: None,
        };
        let bytes = write_delta(&payload).unwrap();
        let tail_array: [u8; 8] = bytes[bytes.len() - 8..].try_into().unwrap();
        let meta_len = i64::from_le_bytes(tail_array) as usize;
        let meta_bytes = &bytes[bytes.len() - 8 - meta_len..bytes.len() - 8];
        let text = std::str::from_utf8(meta_bytes).unwrap();
        assert!(text.find("\"axis\"").unwrap() < text.find("\"put\"").unwrap());
    }

    // ── 4. a flipped byte inside the trailer is detected ──
    #[test]
    fn corrupted_tail_is_rejected() {
        let payload = DeltaPayload { axis: Some(AxisBlock { drop_rows: vec![1], ..Default::default() }), put: None, extend: None };
        let mut bytes = write_delta(&payload).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let unaffected = read_delta(&bytes).is_ok_and(|p| p == payload);
        assert!(!unaffected);
    }

    // ── 5. empty payload round trips ──
    #[test]
    fn empty_payload_round_trip() {
        let payload = DeltaPayload::default();
        let bytes = write_delta(&payload).unwrap();
        let back = read_delta(&bytes).unwrap();
        assert!(back.is_empty());
    }
}
