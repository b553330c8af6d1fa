use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{EnrolledStudent, GradeRow, StoredGrade, StudentRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub grade_id: Option<Uuid>,
    pub student_number: String,
    pub name: String,
    pub scores: GradeRow,
}

impl RosterEntry {
    pub fn to_record(&self) -> StudentRecord {
        StudentRecord::new(self.student_number.clone(), self.name.clone(), self.scores)
    }
}

/// One entry per enrolled student, in enrolment order. Students without a
/// stored grade row start at zero in every term.
pub fn merge_roster(enrolled: &[EnrolledStudent], grades: &[StoredGrade]) -> Vec<RosterEntry> {
    let by_student: HashMap<&str, &StoredGrade> = grades
        .iter()
        .map(|grade| (grade.student_number.as_str(), grade))
        .collect();

    enrolled
        .iter()
        .map(|student| match by_student.get(student.student_number.as_str()) {
            Some(grade) => RosterEntry {
                grade_id: Some(grade.id),
                student_number: student.student_number.clone(),
                name: student.name.clone(),
                scores: grade.scores,
            },
            None => RosterEntry {
                grade_id: None,
                student_number: student.student_number.clone(),
                name: student.name.clone(),
                scores: GradeRow::zeroed(),
            },
        })
        .collect()
}

/// Parses a manually entered score, clamped to [0, 100]. Unparseable input
/// is 0.
pub fn clamp_score_input(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value.clamp(0.0, 100.0),
        _ => 0.0,
    }
}

/// Overlays newly entered terms on an existing row. Terms left as `None` in
/// `update` keep their stored value.
pub fn apply_update(existing: GradeRow, update: GradeRow) -> GradeRow {
    GradeRow {
        prelim: update.prelim.or(existing.prelim),
        midterm: update.midterm.or(existing.midterm),
        semifinal: update.semifinal.or(existing.semifinal),
        final_term: update.final_term.or(existing.final_term),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn enrolled(number: &str, name: &str) -> EnrolledStudent {
        EnrolledStudent {
            student_number: number.to_string(),
            name: name.to_string(),
        }
    }

    fn stored(number: &str, scores: GradeRow) -> StoredGrade {
        StoredGrade {
            id: Uuid::new_v4(),
            student_number: number.to_string(),
            scores,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn merge_keeps_enrolment_order_and_fills_gaps() {
        let students = vec![
            enrolled("2024-003", "Kiara Patel"),
            enrolled("2024-001", "Avery Lee"),
        ];
        let grade = stored(
            "2024-001",
            GradeRow {
                prelim: Some(88.0),
                midterm: None,
                semifinal: Some(90.0),
                final_term: Some(92.0),
            },
        );
        let roster = merge_roster(&students, &[grade.clone()]);

        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].student_number, "2024-003");
        assert_eq!(roster[0].grade_id, None);
        assert_eq!(roster[0].scores, GradeRow::zeroed());
        assert_eq!(roster[1].grade_id, Some(grade.id));
        assert_eq!(roster[1].scores.midterm, None);
        assert_eq!(roster[1].name, "Avery Lee");
    }

    #[test]
    fn grades_for_unenrolled_students_are_dropped() {
        let students = vec![enrolled("2024-001", "Avery Lee")];
        let grades = vec![stored("2023-999", GradeRow::zeroed())];
        let roster = merge_roster(&students, &grades);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].grade_id, None);
    }

    #[test]
    fn roster_entry_coerces_into_record() {
        let entry = RosterEntry {
            grade_id: None,
            student_number: "2024-001".to_string(),
            name: "Avery Lee".to_string(),
            scores: GradeRow {
                prelim: Some(80.0),
                midterm: None,
                semifinal: None,
                final_term: Some(80.0),
            },
        };
        let record = entry.to_record();
        assert_eq!(record.student_id, "2024-001");
        assert_eq!(record.scores.sum(), 160.0);
    }

    #[test]
    fn score_input_is_clamped() {
        assert_eq!(clamp_score_input("87.5"), 87.5);
        assert_eq!(clamp_score_input(" 90 "), 90.0);
        assert_eq!(clamp_score_input("140"), 100.0);
        assert_eq!(clamp_score_input("-3"), 0.0);
        assert_eq!(clamp_score_input("abc"), 0.0);
        assert_eq!(clamp_score_input(""), 0.0);
        assert_eq!(clamp_score_input("NaN"), 0.0);
    }

    #[test]
    fn update_only_touches_given_terms() {
        let existing = GradeRow {
            prelim: Some(70.0),
            midterm: Some(72.0),
            semifinal: None,
            final_term: None,
        };
        let update = GradeRow {
            midterm: Some(85.0),
            final_term: Some(90.0),
            ..GradeRow::default()
        };
        let merged = apply_update(existing, update);
        assert_eq!(merged.prelim, Some(70.0));
        assert_eq!(merged.midterm, Some(85.0));
        assert_eq!(merged.semifinal, None);
        assert_eq!(merged.final_term, Some(90.0));
    }
}
