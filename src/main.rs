use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{metadata::LevelFilter, Level};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod evaluator;
mod models;
mod portal;
mod report;
mod roster;

use crate::config::Config;
use crate::models::{CsvStudentRow, GradeRow, Report, StudentRecord, Subject};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Term grade evaluation and class reports", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a roster from a CSV file without a database
    EvaluateCsv {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "offline")]
        subject_id: String,
        #[arg(long)]
        json: bool,
    },
    #[command(flatten)]
    Database(DatabaseCommand),
}

#[derive(Subcommand)]
enum DatabaseCommand {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import students, subjects and grades from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List subjects
    Subjects,
    /// Evaluate every enrolled student in a subject
    Evaluate {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        json: bool,
    },
    /// Write a markdown performance report for a subject
    Report {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Record term scores for one student; omitted terms keep their stored value
    SetGrade {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        student: String,
        #[arg(long, value_parser = parse_score)]
        prelim: Option<f64>,
        #[arg(long, value_parser = parse_score)]
        midterm: Option<f64>,
        #[arg(long, value_parser = parse_score)]
        semifinal: Option<f64>,
        #[arg(long = "final", value_parser = parse_score)]
        final_term: Option<f64>,
    },
    /// Show one student's grades across subjects
    Portal {
        #[arg(long)]
        email: String,
    },
}

fn parse_score(value: &str) -> Result<f64, String> {
    Ok(roster::clamp_score_input(value))
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let fmt = fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_file(false)
        .with_line_number(false);
    tracing_subscriber::registry()
        .with(fmt)
        .with(LevelFilter::from_level(level))
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

async fn evaluate_subject(pool: &PgPool, code: &str) -> anyhow::Result<(Subject, Report)> {
    let subject = db::find_subject(pool, code).await?;
    let enrolled = db::fetch_enrolled(pool, subject.id).await?;
    let grades = db::fetch_grades(pool, subject.id).await?;
    tracing::debug!(
        last_updated = ?grades.iter().map(|grade| grade.updated_at).max(),
        "loaded grades for {}",
        subject.code
    );

    let entries = roster::merge_roster(&enrolled, &grades);
    let ungraded = entries.iter().filter(|entry| entry.grade_id.is_none()).count();
    if ungraded > 0 {
        tracing::info!("{ungraded} enrolled students have no stored grades; counting them as 0");
    }

    let records: Vec<StudentRecord> = entries.iter().map(roster::RosterEntry::to_record).collect();
    let report = evaluator::evaluate(&subject.id.to_string(), &records);
    Ok((subject, report))
}

fn print_report(report: &Report, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let (stats, insights) = match (&report.stats, &report.insights) {
        (Some(stats), Some(insights)) => (stats, insights),
        _ => {
            println!("{}.", report.message);
            return Ok(());
        }
    };

    for student in report.students.iter() {
        println!(
            "- {} {} average {:.2} {}",
            student.record.student_id, student.record.name, student.average, student.status
        );
    }
    println!(
        "Class average {:.2} (high {:.2}, low {:.2}); passed {}/{}, failed {}",
        stats.class_avg, stats.highest, stats.lowest, stats.passed, stats.total, stats.failed
    );
    println!("{}", insights.class_comment);
    println!("{}", report.message);
    Ok(())
}

fn read_roster_csv(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for row in reader.deserialize::<CsvStudentRow>() {
        records.push(row?.into_record());
    }
    Ok(records)
}

async fn run_database_command(pool: &PgPool, command: DatabaseCommand) -> anyhow::Result<()> {
    match command {
        DatabaseCommand::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        DatabaseCommand::Seed => {
            db::seed(pool).await?;
            println!("Seed data inserted.");
        }
        DatabaseCommand::Import { csv } => {
            let written = db::import_csv(pool, &csv).await?;
            println!("Imported {written} grade rows from {}.", csv.display());
        }
        DatabaseCommand::Subjects => {
            let subjects = db::list_subjects(pool).await?;
            if subjects.is_empty() {
                println!("No subjects found.");
            }
            for subject in subjects.iter() {
                println!("- {} {}", subject.code, subject.name);
            }
        }
        DatabaseCommand::Evaluate { subject, json } => {
            let (_, report) = evaluate_subject(pool, &subject).await?;
            print_report(&report, json)?;
        }
        DatabaseCommand::Report { subject, out } => {
            let (subject, report) = evaluate_subject(pool, &subject).await?;
            let document =
                report::build_report(&subject, &report, chrono::Utc::now().date_naive());
            std::fs::write(&out, document)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        DatabaseCommand::SetGrade {
            subject,
            student,
            prelim,
            midterm,
            semifinal,
            final_term,
        } => {
            let subject = db::find_subject(pool, &subject).await?;
            let student = db::find_student_by_number(pool, &student).await?;
            let existing = db::fetch_grade(pool, subject.id, student.id)
                .await?
                .unwrap_or_else(GradeRow::zeroed);
            let scores = roster::apply_update(
                existing,
                GradeRow {
                    prelim,
                    midterm,
                    semifinal,
                    final_term,
                },
            );
            db::upsert_grade(pool, subject.id, student.id, scores).await?;
            tracing::info!(student = %student.student_number, subject = %subject.code, "grade saved");

            let average = evaluator::average(&StudentRecord::new(
                student.student_number.clone(),
                student.name.clone(),
                scores,
            ));
            println!(
                "Saved {} in {}: average {:.2} ({}).",
                student.name,
                subject.code,
                average,
                evaluator::status_for(average)
            );
        }
        DatabaseCommand::Portal { email } => match db::find_student_by_email(pool, &email).await? {
            Some(profile) => {
                let grades = db::fetch_student_grades(pool, profile.id).await?;
                let summary = portal::summarize(grades);
                print!("{}", portal::render(&profile, &summary));
            }
            None => {
                tracing::warn!(%email, "no student record for this email");
                println!("No student record found for {email}.");
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::EvaluateCsv {
            csv,
            subject_id,
            json,
        } => {
            let records = read_roster_csv(&csv)?;
            tracing::info!("evaluating {} students from {}", records.len(), csv.display());
            let report = evaluator::evaluate(&subject_id, &records);
            print_report(&report, json)
        }
        Commands::Database(command) => {
            let pool = connect().await?;
            run_database_command(&pool, command).await
        }
    }
}
