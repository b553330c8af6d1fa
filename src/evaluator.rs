use crate::models::{ClassInsight, ClassStats, EvaluatedStudent, Report, Status, StudentRecord};

pub const PASSING_AVERAGE: f64 = 75.0;

const EMPTY_ROSTER_MESSAGE: &str = "No students to analyze";

pub fn evaluate(subject_id: &str, students: &[StudentRecord]) -> Report {
    if students.is_empty() {
        return Report {
            subject_id: subject_id.to_string(),
            stats: None,
            students: Vec::new(),
            insights: None,
            message: EMPTY_ROSTER_MESSAGE.to_string(),
        };
    }

    let evaluated: Vec<EvaluatedStudent> = students.iter().map(evaluate_student).collect();
    let stats = class_stats(&evaluated);
    let insights = ClassInsight {
        class_comment: class_comment(status_for(stats.class_avg)),
    };

    tracing::debug!(
        subject_id,
        total = stats.total,
        class_avg = stats.class_avg,
        "evaluated roster"
    );

    Report {
        subject_id: subject_id.to_string(),
        stats: Some(stats),
        students: evaluated,
        insights: Some(insights),
        message: format!("Analysis complete for {} students.", students.len()),
    }
}

pub fn evaluate_student(record: &StudentRecord) -> EvaluatedStudent {
    let average = average(record);
    let status = status_for(average);
    EvaluatedStudent {
        record: record.clone(),
        average,
        status,
        comment: student_comment(status),
    }
}

pub fn average(record: &StudentRecord) -> f64 {
    round2(record.scores.sum() / 4.0)
}

/// Bands are inclusive at their lower bound and checked high to low.
pub fn status_for(average: f64) -> Status {
    match average {
        a if a >= 90.0 => Status::Excellent,
        a if a >= 80.0 => Status::Good,
        a if a >= PASSING_AVERAGE => Status::Passed,
        _ => Status::Failed,
    }
}

pub fn is_passing(average: f64) -> bool {
    average >= PASSING_AVERAGE
}

pub fn student_comment(status: Status) -> &'static str {
    match status {
        Status::Excellent => "Outstanding performance! Keep up the great work.",
        Status::Good => "Good performance. With a bit more effort, you can excel!",
        Status::Passed => "You passed. Focus on improving weaker areas.",
        Status::Failed => "Needs improvement. Consider extra practice and guidance.",
    }
}

pub fn class_comment(band: Status) -> &'static str {
    match band {
        Status::Excellent => "The class performed exceptionally well overall!",
        Status::Good => "The class performance is good, with room for improvement.",
        Status::Passed => "The class passed, but some students may need extra attention.",
        Status::Failed => "Class performance is below average; additional support recommended.",
    }
}

/// Callers guarantee `students` is non-empty.
fn class_stats(students: &[EvaluatedStudent]) -> ClassStats {
    let total = students.len();
    let sum: f64 = students.iter().map(|s| s.average).sum();
    let highest = students
        .iter()
        .map(|s| s.average)
        .fold(f64::NEG_INFINITY, f64::max);
    let lowest = students
        .iter()
        .map(|s| s.average)
        .fold(f64::INFINITY, f64::min);
    let passed = students.iter().filter(|s| is_passing(s.average)).count();

    ClassStats {
        total,
        class_avg: round2(sum / total as f64),
        highest: round2(highest),
        lowest: round2(lowest),
        passed,
        failed: total - passed,
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
