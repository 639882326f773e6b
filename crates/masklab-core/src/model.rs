//! Core data model types for masklab.
//!
//! These are the fundamental records the entire system exchanges through
//! the filesystem: evaluation metrics, attempts, policies, and case
//! metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default pass threshold: minimum foreground voxels in the student mask.
pub const DEFAULT_MIN_VOXELS: u64 = 10;
/// Default pass threshold: maximum tolerated mismatch voxels.
pub const DEFAULT_TOLERANCE: u64 = 150;

/// The output of scoring one (gold, student) mask pair at one instant.
///
/// Purely a function of the two input volumes and the gold volume's
/// geometry; identical inputs always yield an identical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub dice: f64,
    pub jaccard: f64,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub accuracy: f64,
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub tn: u64,
    pub gold_voxels: u64,
    pub student_voxels: u64,
    pub mismatch_voxels: u64,
    pub vox_mm3: f64,
    pub gold_ml: f64,
    pub student_ml: f64,
    pub vol_abs_err_ml: f64,
    pub vol_rel_err: f64,
    /// Absent (not zero) when either mask is empty.
    #[serde(default)]
    pub centroid_dist_mm: Option<f64>,
}

/// Which role produced an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Solo,
    Student,
    Teacher,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Solo => write!(f, "solo"),
            Mode::Student => write!(f, "student"),
            Mode::Teacher => write!(f, "teacher"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "solo" => Ok(Mode::Solo),
            "student" => Ok(Mode::Student),
            "teacher" => Ok(Mode::Teacher),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Pass/fail thresholds in force for a session. Owned by the classroom in
/// student mode, by the individual learner otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default = "default_min_voxels")]
    pub min_voxels: u64,
    #[serde(default = "default_tolerance")]
    pub tolerance: u64,
    #[serde(default = "default_session")]
    pub session: String,
}

fn default_min_voxels() -> u64 {
    DEFAULT_MIN_VOXELS
}

fn default_tolerance() -> u64 {
    DEFAULT_TOLERANCE
}

fn default_session() -> String {
    "practice".to_string()
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_voxels: DEFAULT_MIN_VOXELS,
            tolerance: DEFAULT_TOLERANCE,
            session: default_session(),
        }
    }
}

impl Policy {
    /// Apply the pass criteria to a scored record.
    pub fn grade(&self, record: &EvaluationRecord) -> bool {
        record.student_voxels >= self.min_voxels && record.mismatch_voxels <= self.tolerance
    }
}

/// How a case entered a case store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOrigin {
    LocalUpload,
    BatchImport,
    ClassroomUpload,
    ClassroomSync,
}

/// The `case.json` metadata record persisted alongside each case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseMeta {
    pub case_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<CaseOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t1_shape: Option<[usize; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold_shape: Option<[usize; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<String>,
    /// Open-ended metadata from older writers is preserved on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CaseMeta {
    pub fn new(case_id: impl Into<String>, origin: CaseOrigin) -> Self {
        Self {
            case_id: case_id.into(),
            origin: Some(origin),
            pair_key: None,
            t1_shape: None,
            gold_shape: None,
            imported_at: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// One evaluation event plus its session context.
///
/// Append-only: once written to a ledger it is never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Lexicographically sortable, second resolution (`%Y-%m-%d_%H%M%S`).
    pub timestamp: String,
    /// Random short id disambiguating same-timestamp writes.
    pub attempt_id: String,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub platform: String,
    pub user: String,
    pub mode: Mode,
    /// Empty when not in a classroom.
    #[serde(default)]
    pub class_code: String,
    pub case_id: String,
    #[serde(default)]
    pub session: String,
    pub min_voxels: u64,
    pub tolerance: u64,
    pub passed: bool,
    #[serde(default)]
    pub editor: String,
    #[serde(flatten)]
    pub metrics: EvaluationRecord,
}

/// Fixed column order of the tabular attempt log.
pub const ATTEMPT_COLUMNS: [&str; 31] = [
    "timestamp",
    "app_version",
    "platform",
    "user",
    "mode",
    "class_code",
    "case_id",
    "session",
    "min_voxels",
    "tolerance",
    "passed",
    "dice",
    "jaccard",
    "precision",
    "recall",
    "specificity",
    "accuracy",
    "mismatch_voxels",
    "gold_voxels",
    "student_voxels",
    "tp",
    "fp",
    "fn",
    "tn",
    "vox_mm3",
    "gold_ml",
    "student_ml",
    "vol_abs_err_ml",
    "vol_rel_err",
    "centroid_dist_mm",
    "editor",
];

impl Attempt {
    /// Current wall-clock time in the ledger's timestamp format.
    pub fn now_timestamp() -> String {
        chrono::Local::now().format("%Y-%m-%d_%H%M%S").to_string()
    }

    /// A fresh random short id for same-timestamp disambiguation.
    pub fn new_attempt_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..6].to_string()
    }

    /// Header row of the tabular log.
    pub fn csv_header() -> String {
        ATTEMPT_COLUMNS.join(",")
    }

    /// This attempt as one row of the tabular log, in [`ATTEMPT_COLUMNS`]
    /// order.
    pub fn csv_row(&self) -> String {
        let m = &self.metrics;
        let cells: Vec<String> = vec![
            csv_cell(&self.timestamp),
            csv_cell(&self.app_version),
            csv_cell(&self.platform),
            csv_cell(&self.user),
            self.mode.to_string(),
            csv_cell(&self.class_code),
            csv_cell(&self.case_id),
            csv_cell(&self.session),
            self.min_voxels.to_string(),
            self.tolerance.to_string(),
            self.passed.to_string(),
            m.dice.to_string(),
            m.jaccard.to_string(),
            m.precision.to_string(),
            m.recall.to_string(),
            m.specificity.to_string(),
            m.accuracy.to_string(),
            m.mismatch_voxels.to_string(),
            m.gold_voxels.to_string(),
            m.student_voxels.to_string(),
            m.tp.to_string(),
            m.fp.to_string(),
            m.fn_.to_string(),
            m.tn.to_string(),
            m.vox_mm3.to_string(),
            m.gold_ml.to_string(),
            m.student_ml.to_string(),
            m.vol_abs_err_ml.to_string(),
            m.vol_rel_err.to_string(),
            m.centroid_dist_mm.map(|v| v.to_string()).unwrap_or_default(),
            csv_cell(&self.editor),
        ];
        cells.join(",")
    }
}

/// Quote a cell if it contains a delimiter, quote, or newline.
fn csv_cell(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_record() -> EvaluationRecord {
        EvaluationRecord {
            dice: 0.9,
            jaccard: 0.8,
            precision: 0.95,
            recall: 0.85,
            specificity: 0.99,
            accuracy: 0.98,
            tp: 90,
            fp: 5,
            fn_: 15,
            tn: 890,
            gold_voxels: 105,
            student_voxels: 95,
            mismatch_voxels: 20,
            vox_mm3: 1.0,
            gold_ml: 0.105,
            student_ml: 0.095,
            vol_abs_err_ml: 0.01,
            vol_rel_err: -0.09523809523809523,
            centroid_dist_mm: Some(1.5),
        }
    }

    #[test]
    fn mode_display_and_parse() {
        assert_eq!(Mode::Solo.to_string(), "solo");
        assert_eq!("Student".parse::<Mode>().unwrap(), Mode::Student);
        assert_eq!("teacher".parse::<Mode>().unwrap(), Mode::Teacher);
        assert!("admin".parse::<Mode>().is_err());
    }

    #[test]
    fn policy_defaults_and_grading() {
        let policy = Policy::default();
        assert_eq!(policy.min_voxels, 10);
        assert_eq!(policy.tolerance, 150);
        assert_eq!(policy.session, "practice");

        let mut record = sample_record();
        assert!(policy.grade(&record));
        record.mismatch_voxels = 151;
        assert!(!policy.grade(&record));
        record.mismatch_voxels = 20;
        record.student_voxels = 9;
        assert!(!policy.grade(&record));
    }

    #[test]
    fn policy_parses_partial_json_with_defaults() {
        let policy: Policy = serde_json::from_str(r#"{"min_voxels": 25}"#).unwrap();
        assert_eq!(policy.min_voxels, 25);
        assert_eq!(policy.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(policy.session, "practice");
    }

    #[test]
    fn evaluation_record_fn_field_renames() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["fn"], 15);
        assert!(json.get("fn_").is_none());
    }

    #[test]
    fn case_meta_preserves_unknown_keys() {
        let json = r#"{"case_id":"c1","origin":"batch_import","site":"lausanne"}"#;
        let meta: CaseMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.case_id, "c1");
        assert_eq!(meta.origin, Some(CaseOrigin::BatchImport));
        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["site"], "lausanne");
    }

    #[test]
    fn attempt_serde_roundtrip_flattens_metrics() {
        let attempt = Attempt {
            timestamp: "2026-08-29_101500".into(),
            attempt_id: "a1b2c3".into(),
            app_version: "0.1.0".into(),
            platform: "linux-x86_64".into(),
            user: "ada".into(),
            mode: Mode::Student,
            class_code: "HUMMEL2026".into(),
            case_id: "case01".into(),
            session: "practice".into(),
            min_voxels: 10,
            tolerance: 150,
            passed: true,
            editor: "itksnap".into(),
            metrics: sample_record(),
        };
        let json = serde_json::to_string(&attempt).unwrap();
        let back: Attempt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attempt);
        // metrics keys are flattened onto the top-level object
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dice"], 0.9);
        assert_eq!(value["mode"], "student");
    }

    #[test]
    fn csv_row_matches_column_count() {
        let attempt = Attempt {
            timestamp: "2026-08-29_101500".into(),
            attempt_id: "a1b2c3".into(),
            app_version: "0.1.0".into(),
            platform: "linux-x86_64".into(),
            user: "ada".into(),
            mode: Mode::Solo,
            class_code: String::new(),
            case_id: "case01".into(),
            session: "practice".into(),
            min_voxels: 10,
            tolerance: 150,
            passed: false,
            editor: "external".into(),
            metrics: EvaluationRecord {
                centroid_dist_mm: None,
                ..sample_record()
            },
        };
        let header_cols = Attempt::csv_header().split(',').count();
        let row_cols = attempt.csv_row().split(',').count();
        assert_eq!(header_cols, ATTEMPT_COLUMNS.len());
        assert_eq!(row_cols, ATTEMPT_COLUMNS.len());
    }

    #[test]
    fn csv_cell_quotes_delimiters() {
        assert_eq!(csv_cell("plain"), "plain");
        assert_eq!(csv_cell("a,b"), "\"a,b\"");
        assert_eq!(csv_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
