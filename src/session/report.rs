//! Structured and tabular session exports
//!
//! [`StructuredReport`] is the persisted artifact contract: analysis scripts
//! depend on its key names (`metadata`, `behaviorData`, `purchaseData`,
//! `subjectiveEvaluations`) and nesting. [`SummaryRow`] flattens the
//! headline numbers into `Category,Metric,Value` rows for spreadsheets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::config::ExperimentConditions;
use crate::error::Result;
use crate::types::Timestamp;

use super::recorder::SessionRecorder;
use super::types::{
    FinalSelection, GazeSample, PoseSample, ProductDistance, ProductSelection, ProductView,
    SubjectiveEvaluation,
};

/// Header of the summary CSV
pub const SUMMARY_HEADER: &str = "Category,Metric,Value";

/// Complete nested export of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReport {
    pub metadata: ReportMetadata,
    pub behavior_data: BehaviorData,
    pub purchase_data: PurchaseData,
    pub subjective_evaluations: BTreeMap<String, SubjectiveEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub participant_id: String,
    pub session_id: String,
    pub session_start_time: Timestamp,
    pub session_end_time: Option<Timestamp>,
    pub session_duration: i64,
    pub experiment_conditions: ExperimentConditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorData {
    pub trajectory: Vec<PoseSample>,
    pub gaze: Vec<GazeSample>,
    pub area_stay_time: BTreeMap<String, i64>,
    pub product_distances: Vec<ProductDistance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseData {
    pub product_selections: Vec<ProductSelection>,
    pub product_views: Vec<ProductView>,
    pub final_selection: Option<FinalSelection>,
    pub unique_products_viewed: usize,
    pub total_selections: usize,
}

/// One `Category,Metric,Value` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub category: &'static str,
    pub metric: String,
    pub value: String,
}

impl SummaryRow {
    fn new(category: &'static str, metric: impl Into<String>, value: impl ToString) -> Self {
        Self {
            category,
            metric: metric.into(),
            value: value.to_string(),
        }
    }
}

impl StructuredReport {
    /// Parse a report previously produced by `export_serialized`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize as JSON, pretty or compact
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Flatten the headline metrics into summary rows
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        let meta = &self.metadata;
        let behavior = &self.behavior_data;
        let purchase = &self.purchase_data;

        let mut rows = vec![
            SummaryRow::new("Metadata", "ParticipantID", &meta.participant_id),
            SummaryRow::new("Metadata", "SessionID", &meta.session_id),
            SummaryRow::new("Metadata", "SessionStartTime", meta.session_start_time),
            SummaryRow::new(
                "Metadata",
                "SessionEndTime",
                meta.session_end_time.map(|t| t.to_string()).unwrap_or_default(),
            ),
            SummaryRow::new("Metadata", "SessionDuration", meta.session_duration),
        ];
        for (key, value) in &meta.experiment_conditions {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rows.push(SummaryRow::new("Metadata", format!("Condition_{}", key), value));
        }

        rows.push(SummaryRow::new("Behavior", "TrajectoryPoints", behavior.trajectory.len()));
        rows.push(SummaryRow::new("Behavior", "GazeRecords", behavior.gaze.len()));
        rows.push(SummaryRow::new(
            "Behavior",
            "ProductDistanceRecords",
            behavior.product_distances.len(),
        ));
        for (zone, ms) in &behavior.area_stay_time {
            rows.push(SummaryRow::new("Behavior", format!("Area_{}_StayTime", zone), ms));
        }

        rows.push(SummaryRow::new(
            "Purchase",
            "UniqueProductsViewed",
            purchase.unique_products_viewed,
        ));
        rows.push(SummaryRow::new("Purchase", "TotalViews", purchase.product_views.len()));
        rows.push(SummaryRow::new("Purchase", "TotalSelections", purchase.total_selections));
        if let Some(ref fs) = purchase.final_selection {
            rows.push(SummaryRow::new("Purchase", "FinalSelection", &fs.product_id));
        }

        for (category, evaluation) in &self.subjective_evaluations {
            rows.push(SummaryRow::new("Subjective", category.clone(), &evaluation.value));
        }

        rows
    }

    /// Render the summary rows as CSV with a header line
    pub fn summary_csv(&self) -> String {
        let mut out = String::from(SUMMARY_HEADER);
        for row in self.summary_rows() {
            let _ = write!(
                out,
                "\n{},{},{}",
                row.category,
                csv_field(&row.metric),
                csv_field(&row.value)
            );
        }
        out
    }
}

/// Quote a CSV field when it contains separators, quotes or line breaks
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl SessionRecorder {
    /// Assemble the full nested report; safe to call in any state
    pub fn export_structured(&self) -> StructuredReport {
        let unique = self.unique_products_viewed().len();
        StructuredReport {
            metadata: ReportMetadata {
                participant_id: self.info.participant_id.clone(),
                session_id: self.info.session_id.clone(),
                session_start_time: self.info.start_time,
                session_end_time: self.info.end_time,
                session_duration: self.session_duration(),
                experiment_conditions: self.info.experiment_conditions.clone(),
            },
            behavior_data: BehaviorData {
                trajectory: self.data.trajectory.clone(),
                gaze: self.data.gaze.clone(),
                area_stay_time: self.data.area_stay_time.clone(),
                product_distances: self.data.product_distances.clone(),
            },
            purchase_data: PurchaseData {
                product_selections: self.data.product_selections.clone(),
                product_views: self.data.product_views.clone(),
                final_selection: self.data.final_selection.clone(),
                unique_products_viewed: unique,
                total_selections: self.data.product_selections.len(),
            },
            subjective_evaluations: self.data.subjective_evaluations.clone(),
        }
    }

    /// Serialize the structured report as JSON
    pub fn export_serialized(&self, pretty: bool) -> Result<String> {
        self.export_structured().to_json(pretty)
    }

    /// Summary rows for spreadsheet import
    pub fn export_summary_rows(&self) -> Vec<SummaryRow> {
        self.export_structured().summary_rows()
    }

    /// Summary rows rendered as CSV
    pub fn export_summary_csv(&self) -> String {
        self.export_structured().summary_csv()
    }
}
