use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Four term scores as they arrive from storage or a CSV file. Any term may be
/// missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradeRow {
    pub prelim: Option<f64>,
    pub midterm: Option<f64>,
    pub semifinal: Option<f64>,
    pub final_term: Option<f64>,
}

impl GradeRow {
    pub fn zeroed() -> Self {
        Self {
            prelim: Some(0.0),
            midterm: Some(0.0),
            semifinal: Some(0.0),
            final_term: Some(0.0),
        }
    }

    pub fn terms(&self) -> [Option<f64>; 4] {
        [self.prelim, self.midterm, self.semifinal, self.final_term]
    }
}

/// Four term scores with the missing-is-zero rule already applied.
///
/// A missing or non-finite term becomes `0.0`. Out-of-range values are kept
/// as given; only manual grade entry clamps (see `roster::clamp_score_input`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSet {
    pub prelim: f64,
    pub midterm: f64,
    pub semifinal: f64,
    #[serde(rename = "final")]
    pub final_term: f64,
}

impl ScoreSet {
    pub fn sum(&self) -> f64 {
        self.prelim + self.midterm + self.semifinal + self.final_term
    }
}

impl From<GradeRow> for ScoreSet {
    fn from(row: GradeRow) -> Self {
        Self {
            prelim: coerce(row.prelim),
            midterm: coerce(row.midterm),
            semifinal: coerce(row.semifinal),
            final_term: coerce(row.final_term),
        }
    }
}

fn coerce(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        Some(v) => {
            tracing::warn!(value = %v, "non-finite score treated as 0");
            0.0
        }
        None => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    #[serde(flatten)]
    pub scores: ScoreSet,
}

impl StudentRecord {
    pub fn new(student_id: impl Into<String>, name: impl Into<String>, row: GradeRow) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            scores: ScoreSet::from(row),
        }
    }
}

/// Ordered classification of a student's average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Status {
    Failed,
    Passed,
    Good,
    Excellent,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Failed => "Failed",
            Status::Passed => "Passed",
            Status::Good => "Good",
            Status::Excellent => "Excellent",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedStudent {
    #[serde(flatten)]
    pub record: StudentRecord,
    pub average: f64,
    pub status: Status,
    pub comment: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub total: usize,
    pub class_avg: f64,
    pub highest: f64,
    pub lowest: f64,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInsight {
    pub class_comment: &'static str,
}

/// Output of one evaluation. `stats` and `insights` are `None` when the roster
/// was empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub subject_id: String,
    pub stats: Option<ClassStats>,
    pub students: Vec<EvaluatedStudent>,
    pub insights: Option<ClassInsight>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct StudentProfile {
    pub id: Uuid,
    pub student_number: String,
    pub name: String,
    pub email: String,
    pub year_level: String,
    pub course: String,
}

#[derive(Debug, Clone)]
pub struct EnrolledStudent {
    pub student_number: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct StoredGrade {
    pub id: Uuid,
    pub student_number: String,
    pub scores: GradeRow,
    pub updated_at: DateTime<Utc>,
}

/// One subject's grade row as seen from the student portal.
#[derive(Debug, Clone)]
pub struct SubjectGrade {
    pub subject_code: String,
    pub subject_name: String,
    pub scores: GradeRow,
}

/// Offline evaluation input row.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvStudentRow {
    pub student_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub prelim: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub midterm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub semifinal: Option<f64>,
    #[serde(default, rename = "final", deserialize_with = "lenient_score")]
    pub final_term: Option<f64>,
}

impl CsvStudentRow {
    pub fn scores(&self) -> GradeRow {
        GradeRow {
            prelim: self.prelim,
            midterm: self.midterm,
            semifinal: self.semifinal,
            final_term: self.final_term,
        }
    }

    pub fn into_record(self) -> StudentRecord {
        let scores = self.scores();
        StudentRecord::new(self.student_id, self.name, scores)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Accepts numbers or numeric text; anything else is treated as missing.
pub(crate) fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawScore>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawScore::Number(value)) if value.is_finite() => Some(value),
        Some(RawScore::Text(text)) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_rows(data: &str) -> Vec<CsvStudentRow> {
        csv::Reader::from_reader(data.as_bytes())
            .deserialize::<CsvStudentRow>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn missing_terms_become_zero() {
        let row = GradeRow {
            prelim: Some(90.0),
            midterm: None,
            semifinal: Some(90.0),
            final_term: Some(90.0),
        };
        let scores = ScoreSet::from(row);
        assert_eq!(scores.midterm, 0.0);
        assert_eq!(scores.sum(), 270.0);
    }

    #[test]
    fn non_finite_terms_become_zero() {
        let scores = ScoreSet::from(GradeRow {
            prelim: Some(f64::NAN),
            midterm: Some(f64::INFINITY),
            semifinal: Some(80.0),
            final_term: Some(80.0),
        });
        assert_eq!(scores.prelim, 0.0);
        assert_eq!(scores.midterm, 0.0);
        assert_eq!(scores.sum(), 160.0);
    }

    #[test]
    fn out_of_range_scores_are_kept() {
        let scores = ScoreSet::from(GradeRow {
            prelim: Some(120.0),
            midterm: Some(-5.0),
            semifinal: Some(80.0),
            final_term: Some(80.0),
        });
        assert_eq!(scores.prelim, 120.0);
        assert_eq!(scores.midterm, -5.0);
    }

    #[test]
    fn csv_scores_are_lenient() {
        let rows = read_rows(
            "student_id,name,prelim,midterm,semifinal,final\n\
             2024-001,Avery Lee,90,,88.5,abc\n\
             2024-002,Jules Moreno, 75 ,80,85,true\n",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].prelim, Some(90.0));
        assert_eq!(rows[0].midterm, None);
        assert_eq!(rows[0].semifinal, Some(88.5));
        assert_eq!(rows[0].final_term, None);
        assert_eq!(rows[1].prelim, Some(75.0));
        assert_eq!(rows[1].final_term, None);

        let record = rows[0].clone().into_record();
        assert_eq!(record.scores.midterm, 0.0);
        assert_eq!(record.scores.final_term, 0.0);
        assert_eq!(record.scores.sum(), 178.5);
    }

    #[test]
    fn status_orders_low_to_high() {
        assert!(Status::Failed < Status::Passed);
        assert!(Status::Passed < Status::Good);
        assert!(Status::Good < Status::Excellent);
        assert_eq!(Status::Good.to_string(), "Good");
    }

    #[test]
    fn report_serializes_with_client_field_names() {
        let report = Report {
            subject_id: "IT101".to_string(),
            stats: Some(ClassStats {
                total: 1,
                class_avg: 80.0,
                highest: 80.0,
                lowest: 80.0,
                passed: 1,
                failed: 0,
            }),
            students: vec![EvaluatedStudent {
                record: StudentRecord::new("2024-001", "Avery Lee", GradeRow::zeroed()),
                average: 80.0,
                status: Status::Good,
                comment: "ok",
            }],
            insights: Some(ClassInsight { class_comment: "fine" }),
            message: "done".to_string(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["subjectId"], "IT101");
        assert_eq!(value["stats"]["classAvg"], 80.0);
        assert_eq!(value["insights"]["classComment"], "fine");
        assert_eq!(value["students"][0]["student_id"], "2024-001");
        assert_eq!(value["students"][0]["final"], 0.0);
        assert_eq!(value["students"][0]["status"], "Good");
    }
}
