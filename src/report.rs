use std::fmt::Write;

use chrono::NaiveDate;

use crate::evaluator;
use crate::models::{EvaluatedStudent, Report, Subject};

/// Splits evaluated students on the passing average, keeping input order.
pub fn partition_by_outcome(
    students: &[EvaluatedStudent],
) -> (Vec<&EvaluatedStudent>, Vec<&EvaluatedStudent>) {
    students
        .iter()
        .partition(|student| evaluator::is_passing(student.average))
}

pub fn build_report(subject: &Subject, report: &Report, generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Performance Report");
    let _ = writeln!(output, "Subject: {} ({})", subject.name, subject.code);
    let _ = writeln!(output, "Generated on {}", generated_on);
    let _ = writeln!(output);

    let (stats, insights) = match (&report.stats, &report.insights) {
        (Some(stats), Some(insights)) => (stats, insights),
        _ => {
            let _ = writeln!(output, "{}.", report.message);
            return output;
        }
    };

    let _ = writeln!(output, "## Student Grades");
    let _ = writeln!(
        output,
        "| Student ID | Name | Prelim | Midterm | Semifinal | Final | Average | Comment |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
    for student in report.students.iter() {
        let scores = &student.record.scores;
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {:.2} | {} |",
            student.record.student_id,
            student.record.name,
            scores.prelim,
            scores.midterm,
            scores.semifinal,
            scores.final_term,
            student.average,
            student.comment
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Summary");
    let _ = writeln!(output, "- Total Students: {}", stats.total);
    let _ = writeln!(output, "- Passed: {}", stats.passed);
    let _ = writeln!(output, "- Failed: {}", stats.failed);
    let _ = writeln!(output, "- Class Average: {:.2}", stats.class_avg);
    let _ = writeln!(output, "- Highest: {:.2}", stats.highest);
    let _ = writeln!(output, "- Lowest: {:.2}", stats.lowest);
    let _ = writeln!(output);
    let _ = writeln!(output, "Insight: {}", insights.class_comment);

    let (passed, failed) = partition_by_outcome(&report.students);
    write_group(&mut output, "Passed Students", &passed);
    write_group(&mut output, "Failed Students", &failed);

    output
}

fn write_group(output: &mut String, title: &str, students: &[&EvaluatedStudent]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {}", title);

    if students.is_empty() {
        let _ = writeln!(output, "None");
        return;
    }

    for student in students {
        let _ = writeln!(
            output,
            "- {} ({:.2}) - {}",
            student.record.name, student.average, student.comment
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate;
    use crate::models::{GradeRow, StudentRecord};
    use uuid::Uuid;

    fn subject() -> Subject {
        Subject {
            id: Uuid::new_v4(),
            code: "IT101".to_string(),
            name: "Intro to Computing".to_string(),
        }
    }

    fn uniform(id: &str, name: &str, score: f64) -> StudentRecord {
        StudentRecord::new(
            id,
            name,
            GradeRow {
                prelim: Some(score),
                midterm: Some(score),
                semifinal: Some(score),
                final_term: Some(score),
            },
        )
    }

    fn generated_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn report_lists_every_section() {
        let report = evaluate(
            "IT101",
            &[
                uniform("2024-001", "Avery Lee", 90.0),
                uniform("2024-002", "Jules Moreno", 80.0),
                uniform("2024-003", "Kiara Patel", 60.0),
            ],
        );
        let output = build_report(&subject(), &report, generated_on());

        assert!(output.contains("Subject: Intro to Computing (IT101)"));
        assert!(output.contains("Generated on 2026-03-02"));
        assert!(output.contains("| 2024-001 | Avery Lee | 90 | 90 | 90 | 90 | 90.00 |"));
        assert!(output.contains("- Class Average: 76.67"));
        assert!(output.contains("- Passed: 2"));
        assert!(output.contains("- Failed: 1"));
        assert!(output.contains(
            "Insight: The class passed, but some students may need extra attention."
        ));

        let passed_at = output.find("## Passed Students").unwrap();
        let failed_at = output.find("## Failed Students").unwrap();
        let kiara_at = output.find("- Kiara Patel (60.00)").unwrap();
        assert!(passed_at < failed_at);
        assert!(kiara_at > failed_at);
        assert!(output.find("- Jules Moreno (80.00)").unwrap() < failed_at);
    }

    #[test]
    fn empty_group_prints_none() {
        let report = evaluate("IT101", &[uniform("2024-001", "Avery Lee", 95.0)]);
        let output = build_report(&subject(), &report, generated_on());
        let failed_section = &output[output.find("## Failed Students").unwrap()..];
        assert!(failed_section.contains("None"));
    }

    #[test]
    fn partition_uses_passing_average() {
        let report = evaluate(
            "IT101",
            &[
                uniform("a", "A", 75.0),
                uniform("b", "B", 74.99),
                uniform("c", "C", 92.0),
            ],
        );
        let (passed, failed) = partition_by_outcome(&report.students);
        let passed: Vec<&str> = passed.iter().map(|s| s.record.name.as_str()).collect();
        let failed: Vec<&str> = failed.iter().map(|s| s.record.name.as_str()).collect();
        assert_eq!(passed, vec!["A", "C"]);
        assert_eq!(failed, vec!["B"]);
    }

    #[test]
    fn empty_report_prints_message_only() {
        let report = evaluate("IT101", &[]);
        let output = build_report(&subject(), &report, generated_on());
        assert!(output.contains("No students to analyze."));
        assert!(!output.contains("## Class Summary"));
    }
}
