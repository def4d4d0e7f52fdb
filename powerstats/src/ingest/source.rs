// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! JSON export of the plant-level generation sheet
//!
//! Accepted shapes:
//!
//! ```text
//! [ { "PSTATABB": "TX", "PNAME": "...", "ORISPL": 3453, "PLNGENAN": 123.4 }, ... ]
//! { "year": 2023, "rows": [ ... ] }
//! ```
//!
//! Numeric columns may be JSON numbers or strings with thousands separators;
//! they are interpreted during preparation, not here.

use super::IngestError;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// One sheet row as exported; every column is optional at this stage
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRow {
    #[serde(rename = "PSTATABB", default)]
    pub state_code: Option<String>,
    #[serde(rename = "PNAME", default)]
    pub plant_name: Option<String>,
    #[serde(rename = "ORISPL", default)]
    pub source_id: Option<Value>,
    #[serde(rename = "PLNGENAN", default)]
    pub net_generation: Option<Value>,
    #[serde(rename = "STATE_NAME", default)]
    pub state_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceDocument {
    Rows(Vec<SourceRow>),
    Wrapped {
        #[serde(default)]
        year: Option<i32>,
        rows: Vec<SourceRow>,
    },
}

/// A parsed source plus its identity
#[derive(Debug, Clone)]
pub struct SourceData {
    /// Year declared by the document, if any
    pub year: Option<i32>,
    pub rows: Vec<SourceRow>,
    /// CRC32 of the raw bytes
    pub fingerprint: u32,
    pub size_bytes: usize,
}

pub fn parse_source(bytes: &[u8]) -> Result<SourceData, IngestError> {
    let document: SourceDocument = serde_json::from_slice(bytes)
        .map_err(|e| IngestError::Source(format!("unreadable source document: {}", e)))?;
    let (year, rows) = match document {
        SourceDocument::Rows(rows) => (None, rows),
        SourceDocument::Wrapped { year, rows } => (year, rows),
    };

    Ok(SourceData {
        year,
        rows,
        fingerprint: crc32fast::hash(bytes),
        size_bytes: bytes.len(),
    })
}

pub async fn read_source(path: &Path) -> Result<SourceData, IngestError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IngestError::Source(format!("cannot read {}: {}", path.display(), e)))?;
    parse_source(&bytes)
}

/// Interpret a numeric cell; accepts numbers and strings like "1,234.5"
pub(crate) fn numeric_cell(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}
