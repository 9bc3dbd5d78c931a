//! Records produced by the archive parser and the timeseries query.

use crate::types::quality_flag::QualityFlag;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value of a single observation.
///
/// Raw text that parses as a `.`-decimal float becomes [`DatapointValue::Number`],
/// anything else (sentinels like `-999` still parse, but `eor` or error strings
/// do not) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatapointValue {
    Number(f64),
    Text(String),
}

impl DatapointValue {
    pub fn from_raw(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(number) => DatapointValue::Number(number),
            Err(_) => DatapointValue::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DatapointValue::Number(n) => Some(*n),
            DatapointValue::Text(_) => None,
        }
    }
}

impl fmt::Display for DatapointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatapointValue::Number(n) => write!(f, "{n}"),
            DatapointValue::Text(t) => f.write_str(t),
        }
    }
}

/// One labeled observation at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datapoint {
    /// Column header of the field, e.g. `TT_TU`.
    pub label: String,
    pub timestamp: DateTime<FixedOffset>,
    /// `None` for gap placeholders synthesized from a missing-values table.
    pub value: Option<DatapointValue>,
    pub unit: Option<String>,
    pub quality: Option<QualityFlag>,
}

impl Datapoint {
    /// A placeholder for a sample the provider documents as missing.
    pub fn missing(label: impl Into<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            label: label.into(),
            timestamp,
            value: None,
            unit: None,
            quality: None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// Describes one measured field of an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub valid_from: DateTime<FixedOffset>,
    pub valid_until: DateTime<FixedOffset>,
}

/// A human-readable document describing a dataset, carried base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionFile {
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

/// The answer to a timeseries query: datapoints ordered by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeseries {
    pub datapoints: Vec<Datapoint>,
    pub metadata: Vec<FieldMetadata>,
    pub description_files: Vec<DescriptionFile>,
}

impl Timeseries {
    /// Datapoints of a single field, in timestamp order.
    pub fn field<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Datapoint> + 'a {
        self.datapoints.iter().filter(move |d| d.label == label)
    }

    pub fn metadata_for(&self, name: &str) -> Option<&FieldMetadata> {
        self.metadata.iter().find(|m| m.name == name)
    }
}

/// Result of probing one configured database root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub database: String,
    pub healthy: bool,
    pub reason: Option<String>,
}
