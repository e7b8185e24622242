//! Per-subject summaries and their export.
//!
//! A [`SubjectSummary`] is the sole output of the per-recording pipeline.
//! This module also builds the cross-subject views consumed downstream: the
//! group mean per metric, the wide export table (one column per subject)
//! and a JSON export document.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::core::alignment::{finite_mean, AlignedWindow};
use crate::core::pipeline::SubjectReport;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "laser-kinematics";

/// Mean pre/post kinematics around laser onset and offset for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub subject: String,
    pub velocity_on: AlignedWindow,
    pub velocity_off: AlignedWindow,
    pub angle_on: AlignedWindow,
    pub angle_off: AlignedWindow,
}

/// One exported scalar of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    VelocityOnPre,
    VelocityOnPost,
    VelocityOffPre,
    VelocityOffPost,
    AngleOnPre,
    AngleOnPost,
    AngleOffPre,
    AngleOffPost,
}

impl Metric {
    /// Export row order.
    pub const ALL: [Metric; 8] = [
        Metric::VelocityOnPre,
        Metric::VelocityOnPost,
        Metric::VelocityOffPre,
        Metric::VelocityOffPost,
        Metric::AngleOnPre,
        Metric::AngleOnPost,
        Metric::AngleOffPre,
        Metric::AngleOffPost,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::VelocityOnPre => "vel_on_pre",
            Metric::VelocityOnPost => "vel_on_post",
            Metric::VelocityOffPre => "vel_off_pre",
            Metric::VelocityOffPost => "vel_off_post",
            Metric::AngleOnPre => "angle_on_pre",
            Metric::AngleOnPost => "angle_on_post",
            Metric::AngleOffPre => "angle_off_pre",
            Metric::AngleOffPost => "angle_off_post",
        }
    }
}

impl SubjectSummary {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::VelocityOnPre => self.velocity_on.pre,
            Metric::VelocityOnPost => self.velocity_on.post,
            Metric::VelocityOffPre => self.velocity_off.pre,
            Metric::VelocityOffPost => self.velocity_off.post,
            Metric::AngleOnPre => self.angle_on.pre,
            Metric::AngleOnPost => self.angle_on.post,
            Metric::AngleOffPre => self.angle_off.pre,
            Metric::AngleOffPost => self.angle_off.post,
        }
    }

    /// The eight exported values in row order.
    pub fn values(&self) -> [f64; 8] {
        Metric::ALL.map(|m| self.value(m))
    }
}

/// Per-metric means across subjects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub subjects: usize,
    pub velocity_on: AlignedWindow,
    pub velocity_off: AlignedWindow,
    pub angle_on: AlignedWindow,
    pub angle_off: AlignedWindow,
}

impl GroupSummary {
    /// Average every metric over the given subjects, skipping NaNs.
    pub fn from_subjects(summaries: &[SubjectSummary]) -> Self {
        let mean = |metric: Metric| finite_mean(summaries.iter().map(|s| s.value(metric)));
        let window = |pre: Metric, post: Metric| AlignedWindow::new(mean(pre), mean(post));

        Self {
            subjects: summaries.len(),
            velocity_on: window(Metric::VelocityOnPre, Metric::VelocityOnPost),
            velocity_off: window(Metric::VelocityOffPre, Metric::VelocityOffPost),
            angle_on: window(Metric::AngleOnPre, Metric::AngleOnPost),
            angle_off: window(Metric::AngleOffPre, Metric::AngleOffPost),
        }
    }
}

/// Wide table with one column per subject and one row per metric.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    columns: Vec<SubjectSummary>,
}

impl ExportTable {
    /// Render as CSV. NaN cells are written as `NaN`; subject ids are
    /// quoted when they contain a separator or quote.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("metric");
        for column in &self.columns {
            out.push(',');
            out.push_str(&csv_field(&column.subject));
        }
        out.push('\n');

        for metric in Metric::ALL {
            out.push_str(metric.name());
            for column in &self.columns {
                out.push(',');
                out.push_str(&column.value(metric).to_string());
            }
            out.push('\n');
        }
        out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl FromIterator<SubjectSummary> for ExportTable {
    fn from_iter<I: IntoIterator<Item = SubjectSummary>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub run_id: String,
}

/// A failed subject in an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedSubject {
    pub subject: String,
    pub error: String,
}

/// JSON export of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryExport {
    pub producer: Producer,
    /// When this export was computed (RFC3339)
    pub computed_at_utc: String,
    pub config: AnalysisConfig,
    pub subjects: Vec<SubjectReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedSubject>,
    pub group: GroupSummary,
}

/// Builder for export documents. One builder per run.
pub struct ExportBuilder {
    run_id: Uuid,
}

impl ExportBuilder {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> String {
        self.run_id.to_string()
    }

    pub fn build(
        &self,
        config: &AnalysisConfig,
        subjects: Vec<SubjectReport>,
        failed: Vec<FailedSubject>,
    ) -> SummaryExport {
        let summaries: Vec<SubjectSummary> = subjects.iter().map(|r| r.summary.clone()).collect();

        SummaryExport {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                run_id: self.run_id(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            config: config.clone(),
            subjects,
            failed,
            group: GroupSummary::from_subjects(&summaries),
        }
    }
}

impl Default for ExportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
