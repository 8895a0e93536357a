//! Data models for the hygiene dashboard.
//!
//! This module contains the observation record as stored in the snapshot
//! and the statistic types returned by the aggregation engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal value the observation form uses for "no hygiene action taken".
pub const NONE_SENTINEL: &str = "Ninguna";

/// A single hand-hygiene observation event.
///
/// Field names on the wire are the column headers of the observation form,
/// so a snapshot produced by the importer can be inspected against the
/// source spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Date of the observation (time of day is discarded on import).
    #[serde(rename = "Marca temporal", default)]
    pub timestamp: Option<NaiveDate>,
    /// Name of the person who recorded the observation.
    #[serde(rename = "Nombre del observador", default)]
    pub observer_name: Option<String>,
    /// Ward or unit where the observation happened.
    #[serde(rename = "Sector en el que realizo la observación", default)]
    pub sector: Option<String>,
    /// Shift during which the observation happened.
    #[serde(rename = "Turno", default)]
    pub shift: Option<String>,
    /// Professional role of the person observed.
    #[serde(rename = "Personal al que observo", default)]
    pub personnel_role: Option<String>,
    /// WHO moment being observed.
    #[serde(rename = "Momento que observa", default)]
    pub moment: Option<String>,
    /// Hygiene technique performed, if any.
    #[serde(rename = "Accion que realizo", default)]
    pub action: Option<String>,
    /// Optional second observation slot.
    #[serde(
        rename = "Momento que observa 2",
        alias = "Momento que observa2",
        default
    )]
    pub secondary_moment: Option<String>,
    /// Optional second observation slot.
    #[serde(
        rename = "Acción que realizo 2",
        alias = "Acción que realizo2",
        default
    )]
    pub secondary_action: Option<String>,
}

impl ObservationRecord {
    /// Whether the observed person performed a hygiene action.
    ///
    /// An empty action or the none-sentinel counts the same as a missing one.
    pub fn is_compliant(&self) -> bool {
        is_technique(self.action.as_deref())
    }
}

/// True for a present, non-empty value that is not the none-sentinel.
pub fn is_technique(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != NONE_SENTINEL)
}

/// Hospital-wide compliance summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalCompliance {
    #[serde(rename = "totalObservaciones")]
    pub total: usize,
    #[serde(rename = "accionesRealizadas")]
    pub compliant: usize,
    /// Rounded to two decimals.
    #[serde(rename = "porcentajeCumplimiento")]
    pub percentage: f64,
}

/// Compliance figures for one group of observations.
///
/// The key is serialized under a different name per slice (`sector`, `rol`,
/// `momento`, `turno`, `personal`), so this type is not serialized directly;
/// see [`GroupCompliance::to_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCompliance {
    pub key: Option<String>,
    pub total: usize,
    pub compliant: usize,
    pub percentage: f64,
}

impl GroupCompliance {
    /// Render the group as a dashboard JSON object with the key under `key_name`.
    pub fn to_json(&self, key_name: &str) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert(key_name.to_string(), serde_json::json!(self.key));
        object.insert("totalObservaciones".to_string(), self.total.into());
        object.insert("accionesCorrectas".to_string(), self.compliant.into());
        object.insert(
            "porcentajeCumplimiento".to_string(),
            serde_json::json!(self.percentage),
        );
        serde_json::Value::Object(object)
    }

    /// Display label for the group key.
    pub fn label(&self) -> &str {
        self.key.as_deref().unwrap_or("(sin dato)")
    }
}

/// Number of times a hygiene technique was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechniqueCount {
    #[serde(rename = "tecnica")]
    pub technique: String,
    #[serde(rename = "cantidad")]
    pub count: usize,
}

impl fmt::Display for TechniqueCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.technique, self.count)
    }
}
