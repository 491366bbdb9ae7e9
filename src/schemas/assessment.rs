use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::core::time::{format_primitive, to_primitive_utc};
use crate::db::models::{Assessment, Question, QuestionOption};
use crate::db::types::QuestionType;
use crate::services::assessment_authoring::{AssessmentInput, AssessmentPatch, QuestionInput};
use crate::services::attempt_policy::Eligibility;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    pub(crate) question_type: QuestionType,
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub(crate) prompt: String,
    #[serde(default)]
    pub(crate) options: Vec<QuestionOption>,
    #[serde(default)]
    pub(crate) correct_options: Vec<String>,
    #[serde(default)]
    pub(crate) reference_answer: Option<String>,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default = "default_required")]
    pub(crate) is_required: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssessmentCreate {
    #[validate(length(min = 1, message = "course_id must not be empty"))]
    pub(crate) course_id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1, message = "max_attempts must be positive"))]
    pub(crate) max_attempts: i32,
    #[serde(default, deserialize_with = "deserialize_option_datetime")]
    pub(crate) available_from: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_option_datetime")]
    pub(crate) due_date: Option<OffsetDateTime>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "total_points must be non-negative"))]
    pub(crate) total_points: f64,
    #[serde(default)]
    pub(crate) is_published: bool,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

/// Absent fields are kept; explicit `null` clears optional ones.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssessmentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_patch")]
    pub(crate) description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_patch")]
    pub(crate) time_limit_minutes: Option<Option<i32>>,
    #[serde(default)]
    #[validate(range(min = 1, message = "max_attempts must be positive"))]
    pub(crate) max_attempts: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_patch_datetime")]
    pub(crate) available_from: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "deserialize_patch_datetime")]
    pub(crate) due_date: Option<Option<OffsetDateTime>>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "total_points must be non-negative"))]
    pub(crate) total_points: Option<f64>,
    #[serde(default)]
    pub(crate) is_published: Option<bool>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Option<Vec<QuestionCreate>>,
}

impl QuestionCreate {
    fn into_input(self) -> QuestionInput {
        QuestionInput {
            question_type: self.question_type,
            prompt: self.prompt,
            options: self.options,
            correct_options: self.correct_options,
            reference_answer: self.reference_answer,
            points: self.points,
            is_required: self.is_required,
        }
    }
}

impl AssessmentCreate {
    pub(crate) fn into_input(self) -> AssessmentInput {
        AssessmentInput {
            course_id: self.course_id,
            title: self.title,
            description: self.description,
            time_limit_minutes: self.time_limit_minutes,
            max_attempts: self.max_attempts,
            available_from: self.available_from.map(to_primitive_utc),
            due_date: self.due_date.map(to_primitive_utc),
            total_points: self.total_points,
            is_published: self.is_published,
            questions: self.questions.into_iter().map(QuestionCreate::into_input).collect(),
        }
    }
}

impl AssessmentUpdate {
    pub(crate) fn into_patch(self) -> AssessmentPatch {
        AssessmentPatch {
            title: self.title,
            description: self.description,
            time_limit_minutes: self.time_limit_minutes,
            max_attempts: self.max_attempts,
            available_from: self.available_from.map(|value| value.map(to_primitive_utc)),
            due_date: self.due_date.map(|value| value.map(to_primitive_utc)),
            total_points: self.total_points,
            is_published: self.is_published,
            questions: self
                .questions
                .map(|questions| questions.into_iter().map(QuestionCreate::into_input).collect()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssessmentResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) max_attempts: i32,
    pub(crate) available_from: Option<String>,
    pub(crate) due_date: Option<String>,
    pub(crate) total_points: f64,
    pub(crate) is_published: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AssessmentResponse {
    pub(crate) fn from_db(assessment: Assessment) -> Self {
        Self {
            id: assessment.id,
            course_id: assessment.course_id,
            title: assessment.title,
            description: assessment.description,
            time_limit_minutes: assessment.time_limit_minutes,
            max_attempts: assessment.max_attempts,
            available_from: assessment.available_from.map(format_primitive),
            due_date: assessment.due_date.map(format_primitive),
            total_points: assessment.total_points,
            is_published: assessment.is_published,
            created_by: assessment.created_by,
            created_at: format_primitive(assessment.created_at),
            updated_at: format_primitive(assessment.updated_at),
        }
    }
}

/// Question as shown to students: no answer key, no reference answer.
#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionResponse {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Vec<QuestionOption>,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    pub(crate) is_required: bool,
}

impl StudentQuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            question_type: question.question_type,
            prompt: question.prompt,
            options: question.options.0,
            points: question.points,
            order_index: question.order_index,
            is_required: question.is_required,
        }
    }
}

/// Question as shown to its author.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Vec<QuestionOption>,
    pub(crate) correct_options: Vec<String>,
    pub(crate) reference_answer: Option<String>,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    pub(crate) is_required: bool,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            question_type: question.question_type,
            prompt: question.prompt,
            options: question.options.0,
            correct_options: question.correct_options.0,
            reference_answer: question.reference_answer,
            points: question.points,
            order_index: question.order_index,
            is_required: question.is_required,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssessmentQuestionsResponse {
    pub(crate) assessment: AssessmentResponse,
    pub(crate) questions: Vec<StudentQuestionResponse>,
    pub(crate) eligibility: Eligibility,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthoredAssessmentResponse {
    pub(crate) assessment: AssessmentResponse,
    pub(crate) questions: Vec<QuestionResponse>,
}

fn default_required() -> bool {
    true
}

fn default_max_attempts() -> i32 {
    1
}

fn parse_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // datetime-local inputs arrive without an offset; treat them as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_option_datetime<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

fn deserialize_patch<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn deserialize_patch_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_option_datetime(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let update: AssessmentUpdate =
            serde_json::from_str(r#"{"description": null, "due_date": "2025-03-09T23:59"}"#)
                .expect("update");
        assert_eq!(update.description, Some(None));
        assert!(update.time_limit_minutes.is_none());
        assert!(matches!(update.due_date, Some(Some(_))));
    }

    #[test]
    fn create_defaults_to_single_attempt_unpublished() {
        let create: AssessmentCreate =
            serde_json::from_str(r#"{"course_id": "c1", "title": "Quiz"}"#).expect("create");
        assert_eq!(create.max_attempts, 1);
        assert!(!create.is_published);
        assert!(create.validate().is_ok());
    }

    #[test]
    fn datetime_accepts_offsets() {
        let parsed = parse_datetime_flexible("2025-03-09T23:59:00+03:00").expect("datetime");
        assert_eq!(to_primitive_utc(parsed), time::macros::datetime!(2025-03-09 20:59:00));
        assert!(parse_datetime_flexible("yesterday").is_none());
    }
}
