use std::collections::{BTreeSet, HashMap};

use crate::db::models::{Answer, Question};
use crate::db::types::ReviewStatus;

/// Answer payload after validation against its question.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalizedAnswer {
    pub(crate) selected_options: Vec<String>,
    pub(crate) text_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnswerGrade {
    pub(crate) answer_id: String,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) review_status: ReviewStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradingOutcome {
    pub(crate) grades: Vec<AnswerGrade>,
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) needs_review: bool,
    pub(crate) missing_required: usize,
}

/// Checks a payload against the question type and its options. Selections are deduplicated and
/// sorted; text is trimmed.
pub(crate) fn validate_answer(
    question: &Question,
    selected_options: &[String],
    text_answer: Option<&str>,
) -> Result<NormalizedAnswer, String> {
    if question.question_type.is_objective() {
        let selected: BTreeSet<&str> = selected_options.iter().map(String::as_str).collect();
        if selected.is_empty() {
            return Err("selected_options must not be empty".to_string());
        }
        if selected.len() > 1 && !question.question_type.allows_multiple_selections() {
            return Err("only one option may be selected for this question".to_string());
        }
        if let Some(unknown) =
            selected.iter().find(|id| !question.options.0.iter().any(|option| option.id == **id))
        {
            return Err(format!("unknown option id: {unknown}"));
        }
        return Ok(NormalizedAnswer {
            selected_options: selected.into_iter().map(str::to_string).collect(),
            text_answer: None,
        });
    }

    let text = text_answer.map(str::trim).filter(|text| !text.is_empty());
    match text {
        Some(text) => Ok(NormalizedAnswer {
            selected_options: Vec::new(),
            text_answer: Some(text.to_string()),
        }),
        None => Err("text_answer is required for this question".to_string()),
    }
}

/// All-or-nothing: the selected set must equal the answer key exactly.
pub(crate) fn is_correct_selection(question: &Question, selected_options: &[String]) -> bool {
    let selected: BTreeSet<&str> = selected_options.iter().map(String::as_str).collect();
    let expected: BTreeSet<&str> = question.correct_options.0.iter().map(String::as_str).collect();
    !expected.is_empty() && selected == expected
}

/// The configured total, or the sum of question points when none is configured.
pub(crate) fn effective_total_points(configured: f64, questions: &[Question]) -> f64 {
    if configured > 0.0 {
        configured
    } else {
        questions.iter().map(|question| question.points).sum()
    }
}

pub(crate) fn percentage(score: f64, total_points: f64) -> f64 {
    if total_points <= 0.0 {
        return 0.0;
    }
    (score / total_points * 10000.0).round() / 100.0
}

/// Scores objective answers and routes subjective ones to manual review.
pub(crate) fn grade_submission(
    configured_total: f64,
    questions: &[Question],
    answers: &[Answer],
) -> GradingOutcome {
    let by_question: HashMap<&str, &Answer> =
        answers.iter().map(|answer| (answer.question_id.as_str(), answer)).collect();

    let mut grades = Vec::with_capacity(answers.len());
    let mut score = 0.0;
    let mut needs_review = false;
    let mut missing_required = 0;

    for question in questions {
        let Some(answer) = by_question.get(question.id.as_str()) else {
            if question.is_required {
                missing_required += 1;
            }
            continue;
        };

        if question.question_type.is_objective() {
            let correct = is_correct_selection(question, &answer.selected_options.0);
            let points = if correct { question.points } else { 0.0 };
            score += points;
            grades.push(AnswerGrade {
                answer_id: answer.id.clone(),
                is_correct: Some(correct),
                points_awarded: Some(points),
                review_status: ReviewStatus::NotRequired,
            });
        } else {
            needs_review = true;
            grades.push(AnswerGrade {
                answer_id: answer.id.clone(),
                is_correct: None,
                points_awarded: None,
                review_status: ReviewStatus::Pending,
            });
        }
    }

    GradingOutcome {
        grades,
        score,
        total_points: effective_total_points(configured_total, questions),
        needs_review,
        missing_required,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use sqlx::types::Json;
    use time::macros::datetime;

    use crate::db::models::{Answer, Question, QuestionOption};
    use crate::db::types::{QuestionType, ReviewStatus};

    pub(crate) fn question(id: &str, kind: QuestionType, points: f64, correct: &[&str]) -> Question {
        Question {
            id: id.to_string(),
            assessment_id: "a1".to_string(),
            question_type: kind,
            prompt: format!("Prompt {id}"),
            options: Json(
                ["a", "b", "c"]
                    .iter()
                    .map(|opt| QuestionOption { id: opt.to_string(), text: opt.to_uppercase() })
                    .collect(),
            ),
            correct_options: Json(correct.iter().map(|opt| opt.to_string()).collect()),
            reference_answer: None,
            points,
            order_index: 0,
            is_required: true,
            created_at: datetime!(2025-03-01 09:00:00),
        }
    }

    pub(crate) fn answer(question_id: &str, selected: &[&str], text: Option<&str>) -> Answer {
        let now = datetime!(2025-03-03 10:00:00);
        Answer {
            id: format!("ans-{question_id}"),
            submission_id: "s1".to_string(),
            question_id: question_id.to_string(),
            selected_options: Json(selected.iter().map(|opt| opt.to_string()).collect()),
            text_answer: text.map(str::to_string),
            is_correct: None,
            points_awarded: None,
            review_status: ReviewStatus::NotRequired,
            feedback: None,
            flag_reason: None,
            ai_draft: None,
            graded_by: None,
            graded_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
