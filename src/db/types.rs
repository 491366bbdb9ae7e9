use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
}

impl QuestionType {
    /// Objective questions carry an answer key and are scored on submit.
    pub(crate) fn is_objective(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }

    pub(crate) fn allows_multiple_selections(self) -> bool {
        matches!(self, QuestionType::MultipleChoice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "submissionstatus", rename_all = "lowercase")]
pub(crate) enum SubmissionStatus {
    Pending,
    Submitted,
    Graded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "reviewstatus", rename_all = "snake_case")]
pub(crate) enum ReviewStatus {
    NotRequired,
    Pending,
    Graded,
    Flagged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_partitions_objective_and_subjective() {
        assert!(QuestionType::SingleChoice.is_objective());
        assert!(QuestionType::MultipleChoice.is_objective());
        assert!(QuestionType::TrueFalse.is_objective());
        assert!(!QuestionType::ShortAnswer.is_objective());
        assert!(!QuestionType::Essay.is_objective());
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(
            serde_json::to_value(QuestionType::ShortAnswer).unwrap(),
            serde_json::json!("short_answer")
        );
        assert_eq!(
            serde_json::to_value(ReviewStatus::NotRequired).unwrap(),
            serde_json::json!("not_required")
        );
        assert_eq!(serde_json::to_value(SubmissionStatus::Graded).unwrap(), serde_json::json!("graded"));
        assert_eq!(UserRole::Teacher.as_str(), "teacher");
    }
}
