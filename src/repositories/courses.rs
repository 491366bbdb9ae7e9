use sqlx::PgPool;

use crate::db::models::Course;

const COLUMNS: &str = "id, title, code, teacher_id, is_active, created_at, updated_at";

pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) code: Option<&'a str>,
    pub(crate) teacher_id: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

#[cfg_attr(not(test), allow(dead_code))]
pub(crate) async fn create(pool: &PgPool, params: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (id, title, code, teacher_id, is_active, created_at, updated_at)
         VALUES ($1,$2,$3,$4,TRUE,$5,$5)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.code)
    .bind(params.teacher_id)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

#[cfg_attr(not(test), allow(dead_code))]
pub(crate) async fn enroll(
    pool: &PgPool,
    course_id: &str,
    student_id: &str,
    enrolled_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO course_enrollments (course_id, student_id, enrolled_at)
         VALUES ($1,$2,$3)
         ON CONFLICT DO NOTHING",
    )
    .bind(course_id)
    .bind(student_id)
    .bind(enrolled_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COLUMNS} FROM courses WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// First active course taught by `teacher_id` in which `student_id` is enrolled.
pub(crate) async fn find_shared_course(
    pool: &PgPool,
    teacher_id: &str,
    student_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT c.id
         FROM courses c
         JOIN course_enrollments ce ON ce.course_id = c.id
         WHERE c.teacher_id = $1
           AND ce.student_id = $2
           AND c.is_active
         ORDER BY c.created_at
         LIMIT 1",
    )
    .bind(teacher_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
