use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::GradebookError;
use crate::models::{
    lenient_score, EnrolledStudent, GradeRow, StoredGrade, StudentProfile, Subject, SubjectGrade,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

struct NewStudent<'a> {
    student_number: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    year_level: &'a str,
    course: &'a str,
}

async fn upsert_student(pool: &PgPool, student: &NewStudent<'_>) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO gradebook.students
        (id, student_number, first_name, last_name, email, year_level, course)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (student_number) DO UPDATE
        SET first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            email = EXCLUDED.email,
            year_level = EXCLUDED.year_level,
            course = EXCLUDED.course
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student.student_number)
    .bind(student.first_name)
    .bind(student.last_name)
    .bind(student.email)
    .bind(student.year_level)
    .bind(student.course)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn upsert_subject(pool: &PgPool, code: &str, name: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO gradebook.subjects (id, subject_code, subject_name)
        VALUES ($1, $2, $3)
        ON CONFLICT (subject_code) DO UPDATE
        SET subject_name = EXCLUDED.subject_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(code)
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn enroll(pool: &PgPool, subject_id: Uuid, student_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO gradebook.subject_students (subject_id, student_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(subject_id)
    .bind(student_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = [
        ("2024-0001", "Avery", "Lee", "avery.lee@example.edu", "2nd Year", "BSIT"),
        ("2024-0002", "Jules", "Moreno", "jules.moreno@example.edu", "2nd Year", "BSCS"),
        ("2024-0003", "Kiara", "Patel", "kiara.patel@example.edu", "1st Year", "BSIT"),
        ("2024-0004", "Noah", "Santos", "noah.santos@example.edu", "3rd Year", "BSIS"),
    ];

    let mut student_ids = Vec::with_capacity(students.len());
    for (student_number, first_name, last_name, email, year_level, course) in students {
        let id = upsert_student(
            pool,
            &NewStudent {
                student_number,
                first_name,
                last_name,
                email,
                year_level,
                course,
            },
        )
        .await?;
        student_ids.push(id);
    }

    let computing = upsert_subject(pool, "IT101", "Introduction to Computing").await?;
    let structures = upsert_subject(pool, "CS201", "Data Structures").await?;

    for id in student_ids.iter() {
        enroll(pool, computing, *id).await?;
    }
    for id in student_ids.iter().take(3) {
        enroll(pool, structures, *id).await?;
    }

    let grades = [
        (computing, 0, [Some(92.0), Some(94.0), Some(90.0), Some(95.0)]),
        (computing, 1, [Some(81.0), Some(79.0), Some(84.0), Some(86.0)]),
        (computing, 2, [Some(70.0), Some(68.5), Some(74.0), Some(72.0)]),
        (structures, 0, [Some(88.0), Some(85.0), Some(90.0), Some(89.0)]),
        (structures, 2, [Some(90.0), None, Some(90.0), Some(90.0)]),
    ];

    for (subject_id, index, terms) in grades {
        let student_id = student_ids
            .get(index)
            .copied()
            .context("seed grade references an unknown student")?;
        upsert_grade(
            pool,
            subject_id,
            student_id,
            GradeRow {
                prelim: terms[0],
                midterm: terms[1],
                semifinal: terms[2],
                final_term: terms[3],
            },
        )
        .await?;
    }

    Ok(())
}

pub async fn list_subjects(pool: &PgPool) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query(
        "SELECT id, subject_code, subject_name FROM gradebook.subjects ORDER BY subject_name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(subject_from_row).collect())
}

pub async fn find_subject(pool: &PgPool, code: &str) -> anyhow::Result<Subject> {
    let row = sqlx::query(
        "SELECT id, subject_code, subject_name FROM gradebook.subjects WHERE subject_code = $1",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| GradebookError::SubjectNotFound(code.to_string()))?;

    Ok(subject_from_row(&row))
}

fn subject_from_row(row: &PgRow) -> Subject {
    Subject {
        id: row.get("id"),
        code: row.get("subject_code"),
        name: row.get("subject_name"),
    }
}

fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name, last_name).trim().to_string()
}

fn grade_row(row: &PgRow) -> GradeRow {
    GradeRow {
        prelim: row.get("prelim"),
        midterm: row.get("midterm"),
        semifinal: row.get("semifinal"),
        final_term: row.get("final"),
    }
}

pub async fn fetch_enrolled(pool: &PgPool, subject_id: Uuid) -> anyhow::Result<Vec<EnrolledStudent>> {
    let rows = sqlx::query(
        r#"
        SELECT st.student_number, st.first_name, st.last_name
        FROM gradebook.subject_students ss
        JOIN gradebook.students st ON st.id = ss.student_id
        WHERE ss.subject_id = $1
        ORDER BY st.student_number ASC
        "#,
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await?;

    let enrolled: Vec<EnrolledStudent> = rows
        .iter()
        .map(|row| EnrolledStudent {
            student_number: row.get("student_number"),
            name: display_name(row.get("first_name"), row.get("last_name")),
        })
        .filter(|student| !student.student_number.trim().is_empty())
        .collect();

    tracing::debug!(%subject_id, count = enrolled.len(), "fetched enrolled students");
    Ok(enrolled)
}

pub async fn fetch_grades(pool: &PgPool, subject_id: Uuid) -> anyhow::Result<Vec<StoredGrade>> {
    let rows = sqlx::query(
        r#"
        SELECT g.id, st.student_number, g.prelim, g.midterm, g.semifinal, g."final", g.updated_at
        FROM gradebook.grades g
        JOIN gradebook.students st ON st.id = g.student_id
        WHERE g.subject_id = $1
        "#,
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await?;

    let grades: Vec<StoredGrade> = rows
        .iter()
        .map(|row| StoredGrade {
            id: row.get("id"),
            student_number: row.get("student_number"),
            scores: grade_row(row),
            updated_at: row.get("updated_at"),
        })
        .collect();

    tracing::debug!(%subject_id, count = grades.len(), "fetched stored grades");
    Ok(grades)
}

pub async fn fetch_grade(
    pool: &PgPool,
    subject_id: Uuid,
    student_id: Uuid,
) -> anyhow::Result<Option<GradeRow>> {
    let row = sqlx::query(
        r#"
        SELECT prelim, midterm, semifinal, "final"
        FROM gradebook.grades
        WHERE subject_id = $1 AND student_id = $2
        "#,
    )
    .bind(subject_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(grade_row))
}

pub async fn upsert_grade(
    pool: &PgPool,
    subject_id: Uuid,
    student_id: Uuid,
    scores: GradeRow,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO gradebook.grades
        (id, subject_id, student_id, prelim, midterm, semifinal, "final", updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        ON CONFLICT (subject_id, student_id) DO UPDATE
        SET prelim = EXCLUDED.prelim,
            midterm = EXCLUDED.midterm,
            semifinal = EXCLUDED.semifinal,
            "final" = EXCLUDED."final",
            updated_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(subject_id)
    .bind(student_id)
    .bind(scores.prelim)
    .bind(scores.midterm)
    .bind(scores.semifinal)
    .bind(scores.final_term)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

const PROFILE_COLUMNS: &str =
    "id, student_number, first_name, last_name, email, year_level, course";

fn profile_from_row(row: &PgRow) -> StudentProfile {
    StudentProfile {
        id: row.get("id"),
        student_number: row.get("student_number"),
        name: display_name(row.get("first_name"), row.get("last_name")),
        email: row.get("email"),
        year_level: row.get("year_level"),
        course: row.get("course"),
    }
}

pub async fn find_student_by_email(
    pool: &PgPool,
    email: &str,
) -> anyhow::Result<Option<StudentProfile>> {
    let query = format!("SELECT {PROFILE_COLUMNS} FROM gradebook.students WHERE lower(email) = lower($1)");
    let row = sqlx::query(&query).bind(email).fetch_optional(pool).await?;
    Ok(row.as_ref().map(profile_from_row))
}

pub async fn find_student_by_number(pool: &PgPool, student_number: &str) -> anyhow::Result<StudentProfile> {
    let query = format!("SELECT {PROFILE_COLUMNS} FROM gradebook.students WHERE student_number = $1");
    let row = sqlx::query(&query)
        .bind(student_number)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| GradebookError::StudentNotFound(student_number.to_string()))?;

    Ok(profile_from_row(&row))
}

pub async fn fetch_student_grades(pool: &PgPool, student_id: Uuid) -> anyhow::Result<Vec<SubjectGrade>> {
    let rows = sqlx::query(
        r#"
        SELECT sb.subject_code, sb.subject_name, g.prelim, g.midterm, g.semifinal, g."final"
        FROM gradebook.grades g
        JOIN gradebook.subjects sb ON sb.id = g.subject_id
        WHERE g.student_id = $1
        ORDER BY sb.subject_code ASC
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SubjectGrade {
            subject_code: row.get("subject_code"),
            subject_name: row.get("subject_name"),
            scores: grade_row(row),
        })
        .collect())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_number: String,
        first_name: String,
        last_name: String,
        email: String,
        year_level: String,
        course: String,
        subject_code: String,
        subject_name: String,
        #[serde(default, deserialize_with = "lenient_score")]
        prelim: Option<f64>,
        #[serde(default, deserialize_with = "lenient_score")]
        midterm: Option<f64>,
        #[serde(default, deserialize_with = "lenient_score")]
        semifinal: Option<f64>,
        #[serde(default, rename = "final", deserialize_with = "lenient_score")]
        final_term: Option<f64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut written = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id = upsert_student(
            pool,
            &NewStudent {
                student_number: &row.student_number,
                first_name: &row.first_name,
                last_name: &row.last_name,
                email: &row.email,
                year_level: &row.year_level,
                course: &row.course,
            },
        )
        .await?;
        let subject_id = upsert_subject(pool, &row.subject_code, &row.subject_name).await?;
        enroll(pool, subject_id, student_id).await?;

        upsert_grade(
            pool,
            subject_id,
            student_id,
            GradeRow {
                prelim: row.prelim,
                midterm: row.midterm,
                semifinal: row.semifinal,
                final_term: row.final_term,
            },
        )
        .await?;
        written += 1;
    }

    Ok(written)
}
