//! Read-only view of one student's grades across subjects.
//!
//! Unlike the class evaluation, a subject with any missing term has no
//! average here and is reported as incomplete.

use std::fmt::Write;

use crate::evaluator;
use crate::models::{StudentProfile, SubjectGrade};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remark {
    Passed,
    Failed,
    Incomplete,
}

impl Remark {
    pub fn label(&self) -> &'static str {
        match self {
            Remark::Passed => "Passed",
            Remark::Failed => "Failed",
            Remark::Incomplete => "Incomplete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalRow {
    pub grade: SubjectGrade,
    pub average: Option<f64>,
    pub remark: Remark,
}

#[derive(Debug, Clone)]
pub struct PortalSummary {
    pub rows: Vec<PortalRow>,
    pub gpa: Option<f64>,
    pub passed: usize,
    pub total: usize,
}

pub fn complete_average(grade: &SubjectGrade) -> Option<f64> {
    let [prelim, midterm, semifinal, final_term] = grade.scores.terms();
    let sum = prelim? + midterm? + semifinal? + final_term?;
    Some(evaluator::round2(sum / 4.0))
}

pub fn summarize(grades: Vec<SubjectGrade>) -> PortalSummary {
    let rows: Vec<PortalRow> = grades
        .into_iter()
        .map(|grade| {
            let average = complete_average(&grade);
            let remark = match average {
                None => Remark::Incomplete,
                Some(avg) if evaluator::is_passing(avg) => Remark::Passed,
                Some(_) => Remark::Failed,
            };
            PortalRow {
                grade,
                average,
                remark,
            }
        })
        .collect();

    let averages: Vec<f64> = rows.iter().filter_map(|row| row.average).collect();
    let gpa = if averages.is_empty() {
        None
    } else {
        Some(evaluator::round2(
            averages.iter().sum::<f64>() / averages.len() as f64,
        ))
    };
    let passed = rows.iter().filter(|row| row.remark == Remark::Passed).count();

    PortalSummary {
        total: rows.len(),
        rows,
        gpa,
        passed,
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn render(profile: &StudentProfile, summary: &PortalSummary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{} ({})", profile.name, profile.email);
    let _ = writeln!(
        output,
        "Student {} | {} | {}",
        profile.student_number, profile.course, profile.year_level
    );
    let _ = writeln!(
        output,
        "GPA {} | Passed {}/{}",
        summary
            .gpa
            .map_or_else(|| "N/A".to_string(), |gpa| format!("{gpa:.2}")),
        summary.passed,
        summary.total
    );
    let _ = writeln!(output);

    if summary.rows.is_empty() {
        let _ = writeln!(output, "No grades recorded yet.");
        return output;
    }

    for row in summary.rows.iter() {
        let [prelim, midterm, semifinal, final_term] = row.grade.scores.terms();
        let _ = writeln!(
            output,
            "- {} {}: {} / {} / {} / {} avg {} [{}]",
            row.grade.subject_code,
            row.grade.subject_name,
            cell(prelim),
            cell(midterm),
            cell(semifinal),
            cell(final_term),
            row.average
                .map_or_else(|| "-".to_string(), |avg| format!("{avg:.2}")),
            row.remark.label()
        );
    }

    output
}
