use std::collections::HashSet;

use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Assessment, Question, QuestionOption, User};
use crate::db::types::{QuestionType, UserRole};
use crate::repositories;
use crate::repositories::assessments::AssessmentFields;
use crate::services::{internal, ServiceError};

#[derive(Debug, Clone)]
pub(crate) struct QuestionInput {
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Vec<QuestionOption>,
    pub(crate) correct_options: Vec<String>,
    pub(crate) reference_answer: Option<String>,
    pub(crate) points: f64,
    pub(crate) is_required: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AssessmentInput {
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) max_attempts: i32,
    pub(crate) available_from: Option<PrimitiveDateTime>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) total_points: f64,
    pub(crate) is_published: bool,
    pub(crate) questions: Vec<QuestionInput>,
}

/// Partial update. `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default)]
pub(crate) struct AssessmentPatch {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<Option<String>>,
    pub(crate) time_limit_minutes: Option<Option<i32>>,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) available_from: Option<Option<PrimitiveDateTime>>,
    pub(crate) due_date: Option<Option<PrimitiveDateTime>>,
    pub(crate) total_points: Option<f64>,
    pub(crate) is_published: Option<bool>,
    pub(crate) questions: Option<Vec<QuestionInput>>,
}

impl AssessmentPatch {
    /// Fields that change how attempts are scored or limited.
    fn touches_attempt_rules(&self) -> bool {
        self.questions.is_some()
            || self.max_attempts.is_some()
            || self.time_limit_minutes.is_some()
            || self.total_points.is_some()
    }
}

#[derive(Debug)]
pub(crate) struct AuthoredAssessment {
    pub(crate) assessment: Assessment,
    pub(crate) questions: Vec<Question>,
}

pub(crate) fn validate_question(index: usize, question: &QuestionInput) -> Result<(), String> {
    let label = format!("question {}", index + 1);
    if question.prompt.trim().is_empty() {
        return Err(format!("{label}: prompt must not be empty"));
    }
    if !question.points.is_finite() || question.points < 0.0 {
        return Err(format!("{label}: points must be non-negative"));
    }
    if !question.question_type.is_objective() {
        return Ok(());
    }

    if question.options.len() < 2 {
        return Err(format!("{label}: at least two options are required"));
    }
    let mut ids = HashSet::new();
    for option in &question.options {
        if option.id.trim().is_empty() || !ids.insert(option.id.as_str()) {
            return Err(format!("{label}: option ids must be unique and non-empty"));
        }
    }
    let correct: HashSet<&str> = question.correct_options.iter().map(String::as_str).collect();
    if correct.is_empty() {
        return Err(format!("{label}: correct_options must not be empty"));
    }
    if !correct.is_subset(&ids) {
        return Err(format!("{label}: correct_options must reference existing options"));
    }
    if correct.len() > 1 && !question.question_type.allows_multiple_selections() {
        return Err(format!("{label}: only one correct option is allowed"));
    }
    Ok(())
}

fn validate_fields(fields: &AssessmentFields<'_>) -> Result<(), ServiceError> {
    if fields.title.trim().is_empty() {
        return Err(ServiceError::validation("title must not be empty"));
    }
    if fields.max_attempts < 1 {
        return Err(ServiceError::validation("max_attempts must be at least 1"));
    }
    if fields.time_limit_minutes.is_some_and(|minutes| minutes < 1) {
        return Err(ServiceError::validation("time_limit_minutes must be positive"));
    }
    if !fields.total_points.is_finite() || fields.total_points < 0.0 {
        return Err(ServiceError::validation("total_points must be non-negative"));
    }
    if let (Some(from), Some(due)) = (fields.available_from, fields.due_date) {
        if from >= due {
            return Err(ServiceError::validation("available_from must be before due_date"));
        }
    }
    Ok(())
}

async fn require_course_teacher(
    state: &AppState,
    user: &User,
    course_id: &str,
) -> Result<(), ServiceError> {
    let course = repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(internal("Failed to fetch course"))?
        .ok_or_else(|| ServiceError::not_found("Course not found"))?;

    if user.role == UserRole::Admin || course.teacher_id == user.id {
        Ok(())
    } else {
        Err(ServiceError::forbidden("Not a teacher of this course"))
    }
}

async fn insert_questions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    assessment_id: &str,
    questions: &[QuestionInput],
    now: PrimitiveDateTime,
) -> Result<Vec<Question>, ServiceError> {
    let mut created = Vec::with_capacity(questions.len());
    for (index, question) in questions.iter().enumerate() {
        let question_id = Uuid::new_v4().to_string();
        let order_index = i32::try_from(index).unwrap_or(i32::MAX);
        let row = repositories::questions::create(
            &mut **tx,
            repositories::questions::CreateQuestion {
                id: &question_id,
                assessment_id,
                question_type: question.question_type,
                prompt: question.prompt.trim(),
                options: &question.options,
                correct_options: &question.correct_options,
                reference_answer: question.reference_answer.as_deref(),
                points: question.points,
                order_index,
                is_required: question.is_required,
                created_at: now,
            },
        )
        .await
        .map_err(internal("Failed to create question"))?;
        created.push(row);
    }
    Ok(created)
}

fn validate_questions(questions: &[QuestionInput]) -> Result<(), ServiceError> {
    questions
        .iter()
        .enumerate()
        .try_for_each(|(index, question)| validate_question(index, question))
        .map_err(ServiceError::Validation)
}

pub(crate) async fn create_assessment(
    state: &AppState,
    author: &User,
    input: AssessmentInput,
) -> Result<AuthoredAssessment, ServiceError> {
    require_course_teacher(state, author, &input.course_id).await?;

    let fields = AssessmentFields {
        title: input.title.trim(),
        description: input.description.as_deref(),
        time_limit_minutes: input.time_limit_minutes,
        max_attempts: input.max_attempts,
        available_from: input.available_from,
        due_date: input.due_date,
        total_points: input.total_points,
        is_published: input.is_published,
    };
    validate_fields(&fields)?;
    validate_questions(&input.questions)?;

    let now = primitive_now_utc();
    let assessment_id = Uuid::new_v4().to_string();
    let mut tx = state.db().begin().await.map_err(internal("Failed to begin transaction"))?;

    let assessment = repositories::assessments::create(
        &mut *tx,
        &assessment_id,
        &input.course_id,
        &author.id,
        fields,
        now,
    )
    .await
    .map_err(internal("Failed to create assessment"))?;
    let questions = insert_questions(&mut tx, &assessment_id, &input.questions, now).await?;

    tx.commit().await.map_err(internal("Failed to commit transaction"))?;

    tracing::info!(
        assessment_id = %assessment.id,
        course_id = %assessment.course_id,
        questions = questions.len(),
        "Created assessment"
    );

    Ok(AuthoredAssessment { assessment, questions })
}

/// Applies a patch. Attempt rules (questions, limits, points) freeze once a submission exists.
pub(crate) async fn update_assessment(
    state: &AppState,
    author: &User,
    assessment_id: &str,
    patch: AssessmentPatch,
) -> Result<AuthoredAssessment, ServiceError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await.map_err(internal("Failed to begin transaction"))?;

    let current = repositories::assessments::lock_for_update(&mut *tx, assessment_id)
        .await
        .map_err(internal("Failed to fetch assessment"))?
        .ok_or_else(|| ServiceError::not_found("Assessment not found"))?;
    require_course_teacher(state, author, &current.course_id).await?;

    if patch.touches_attempt_rules() {
        let has_submissions =
            repositories::submissions::exists_for_assessment(&mut *tx, assessment_id)
                .await
                .map_err(internal("Failed to check submissions"))?;
        if has_submissions {
            return Err(ServiceError::conflict(
                "Assessment already has submissions; questions, limits and points are locked",
            ));
        }
    }

    let title = patch.title.as_deref().unwrap_or(&current.title).trim().to_string();
    let description = patch.description.clone().unwrap_or_else(|| current.description.clone());
    let fields = AssessmentFields {
        title: &title,
        description: description.as_deref(),
        time_limit_minutes: patch.time_limit_minutes.unwrap_or(current.time_limit_minutes),
        max_attempts: patch.max_attempts.unwrap_or(current.max_attempts),
        available_from: patch.available_from.unwrap_or(current.available_from),
        due_date: patch.due_date.unwrap_or(current.due_date),
        total_points: patch.total_points.unwrap_or(current.total_points),
        is_published: patch.is_published.unwrap_or(current.is_published),
    };
    validate_fields(&fields)?;

    let assessment = repositories::assessments::update(&mut *tx, assessment_id, fields, now)
        .await
        .map_err(internal("Failed to update assessment"))?;

    let questions = match &patch.questions {
        Some(replacement) => {
            validate_questions(replacement)?;
            repositories::questions::delete_by_assessment(&mut *tx, assessment_id)
                .await
                .map_err(internal("Failed to replace questions"))?;
            insert_questions(&mut tx, assessment_id, replacement, now).await?
        }
        None => repositories::questions::list_by_assessment(&mut *tx, assessment_id)
            .await
            .map_err(internal("Failed to fetch questions"))?,
    };

    tx.commit().await.map_err(internal("Failed to commit transaction"))?;

    tracing::info!(assessment_id = %assessment.id, "Updated assessment");

    Ok(AuthoredAssessment { assessment, questions })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(kind: QuestionType, correct: &[&str]) -> QuestionInput {
        QuestionInput {
            question_type: kind,
            prompt: "Pick one".to_string(),
            options: vec![
                QuestionOption { id: "a".to_string(), text: "A".to_string() },
                QuestionOption { id: "b".to_string(), text: "B".to_string() },
            ],
            correct_options: correct.iter().map(|id| id.to_string()).collect(),
            reference_answer: None,
            points: 2.0,
            is_required: true,
        }
    }

    #[test]
    fn objective_questions_need_a_valid_answer_key() {
        assert!(validate_question(0, &choice(QuestionType::SingleChoice, &["a"])).is_ok());
        assert!(validate_question(0, &choice(QuestionType::SingleChoice, &[])).is_err());
        assert!(validate_question(0, &choice(QuestionType::SingleChoice, &["z"])).is_err());
        assert!(validate_question(0, &choice(QuestionType::SingleChoice, &["a", "b"])).is_err());
        assert!(validate_question(0, &choice(QuestionType::MultipleChoice, &["a", "b"])).is_ok());
    }

    #[test]
    fn subjective_questions_skip_option_checks() {
        let mut essay = choice(QuestionType::Essay, &[]);
        essay.options.clear();
        assert!(validate_question(0, &essay).is_ok());

        essay.prompt = "  ".to_string();
        let err = validate_question(2, &essay).unwrap_err();
        assert!(err.starts_with("question 3"));
    }

    #[test]
    fn patch_detects_locked_fields() {
        assert!(!AssessmentPatch { title: Some("New".to_string()), ..Default::default() }
            .touches_attempt_rules());
        assert!(AssessmentPatch { max_attempts: Some(3), ..Default::default() }
            .touches_attempt_rules());
    }
}
