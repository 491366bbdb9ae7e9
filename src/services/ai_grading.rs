use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::core::config::Settings;
use crate::core::time::{format_primitive, primitive_now_utc};

const DRAFT_SYSTEM_PROMPT: &str = r#"You are an experienced teacher helping a colleague grade a student's written answer.
Compare the answer with the question and the reference answer, then propose a score.
The score must be between 0 and the maximum points for the question.

Respond with strict JSON:
{
  "suggested_points": <number>,
  "feedback": "short feedback addressed to the student",
  "rationale": "why this score, for the teacher"
}
"#;

#[derive(Debug, Clone)]
pub(crate) struct DraftRequest {
    pub(crate) answer_id: String,
    pub(crate) prompt: String,
    pub(crate) reference_answer: Option<String>,
    pub(crate) student_answer: String,
    pub(crate) max_points: f64,
}

/// Suggested grade stored on the answer. Never applied automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AiDraft {
    pub(crate) suggested_points: f64,
    pub(crate) feedback: String,
    pub(crate) rationale: Option<String>,
    pub(crate) model: String,
    pub(crate) generated_at: String,
}

#[derive(Debug, Deserialize)]
struct RawDraft {
    suggested_points: Option<f64>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub(crate) struct AiDraftService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AiDraftService {
    /// Returns `None` when no endpoint is configured.
    pub(crate) fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        if !settings.ai().is_configured() {
            return Ok(None);
        }

        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Some(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
        }))
    }

    pub(crate) async fn draft_evaluation(&self, request: DraftRequest) -> Result<AiDraft> {
        let timer = Instant::now();

        let user_prompt = format!(
            "Question (maximum {} points):\n{}\n\nReference answer:\n{}\n\nStudent answer:\n{}\n",
            request.max_points,
            request.prompt,
            request.reference_answer.as_deref().unwrap_or("(none provided)"),
            request.student_answer,
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": DRAFT_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "response_format": {"type": "json_object"}
        });

        tracing::info!(answer_id = %request.answer_id, model = %self.model, "Requesting AI draft");

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call AI endpoint")?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(anyhow!("AI endpoint returned {status}: {body}"));
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing AI response content")?;

        let draft = parse_draft(content, request.max_points, &self.model)?;

        tracing::info!(
            answer_id = %request.answer_id,
            suggested_points = draft.suggested_points,
            duration_seconds = timer.elapsed().as_secs_f64(),
            "AI draft completed"
        );

        Ok(draft)
    }
}

/// Parses the model's JSON reply and clamps the suggestion into `[0, max_points]`.
pub(crate) fn parse_draft(content: &str, max_points: f64, model: &str) -> Result<AiDraft> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let raw: RawDraft = serde_json::from_str(trimmed).context("Failed to parse AI JSON")?;

    let suggested = raw.suggested_points.context("AI reply is missing suggested_points")?;
    if !suggested.is_finite() {
        return Err(anyhow!("AI reply has a non-finite score"));
    }

    Ok(AiDraft {
        suggested_points: suggested.clamp(0.0, max_points.max(0.0)),
        feedback: raw.feedback.unwrap_or_default(),
        rationale: raw.rationale,
        model: model.to_string(),
        generated_at: format_primitive(primitive_now_utc()),
    })
}

#[cfg(test)]
mod tests {
    use super::parse_draft;

    #[test]
    fn parse_draft_clamps_points_to_question_range() {
        let high = parse_draft(r#"{"suggested_points": 12, "feedback": "Great"}"#, 5.0, "m")
            .expect("draft");
        assert_eq!(high.suggested_points, 5.0);
        assert_eq!(high.feedback, "Great");

        let low = parse_draft(r#"{"suggested_points": -1}"#, 5.0, "m").expect("draft");
        assert_eq!(low.suggested_points, 0.0);
    }

    #[test]
    fn parse_draft_accepts_fenced_json() {
        let draft = parse_draft(
            "```json\n{\"suggested_points\": 2.5, \"rationale\": \"partial\"}\n```",
            4.0,
            "gpt",
        )
        .expect("draft");
        assert_eq!(draft.suggested_points, 2.5);
        assert_eq!(draft.rationale.as_deref(), Some("partial"));
        assert_eq!(draft.model, "gpt");
    }

    #[test]
    fn parse_draft_rejects_missing_score() {
        assert!(parse_draft(r#"{"feedback": "ok"}"#, 4.0, "m").is_err());
        assert!(parse_draft("not json", 4.0, "m").is_err());
    }
}
