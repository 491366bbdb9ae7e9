use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::pagination::default_limit;
use crate::core::time::format_primitive;
use crate::db::models::Message;
use crate::db::types::UserRole;
use crate::services::message_quota::{QuotaSnapshot, SentMessage};

#[derive(Debug, Deserialize)]
pub(crate) struct QuotaQuery {
    pub(crate) teacher_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationQuery {
    pub(crate) with: String,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct MessageToTeacherRequest {
    #[validate(length(min = 1, message = "teacher_id must not be empty"))]
    pub(crate) teacher_id: String,
    #[validate(length(min = 1, message = "body must not be empty"))]
    pub(crate) body: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct MessageToStudentRequest {
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub(crate) student_id: String,
    #[validate(length(min = 1, message = "body must not be empty"))]
    pub(crate) body: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuotaResponse {
    pub(crate) used: i64,
    pub(crate) limit: i64,
    pub(crate) remaining: i64,
    pub(crate) window_hours: i64,
    pub(crate) resets_at: Option<String>,
}

impl QuotaResponse {
    pub(crate) fn from_snapshot(snapshot: QuotaSnapshot) -> Self {
        Self {
            used: snapshot.used,
            limit: snapshot.limit,
            remaining: snapshot.remaining,
            window_hours: snapshot.window_hours,
            resets_at: snapshot.resets_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) id: String,
    pub(crate) sender_id: String,
    pub(crate) recipient_id: String,
    pub(crate) sender_role: UserRole,
    pub(crate) course_id: Option<String>,
    pub(crate) body: String,
    pub(crate) created_at: String,
    pub(crate) delivered_at: Option<String>,
    pub(crate) read_at: Option<String>,
}

impl MessageResponse {
    pub(crate) fn from_db(message: Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            sender_role: message.sender_role,
            course_id: message.course_id,
            body: message.body,
            created_at: format_primitive(message.created_at),
            delivered_at: message.delivered_at.map(format_primitive),
            read_at: message.read_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SentMessageResponse {
    pub(crate) message: MessageResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) quota: Option<QuotaResponse>,
}

impl SentMessageResponse {
    pub(crate) fn from_sent(sent: SentMessage) -> Self {
        Self {
            message: MessageResponse::from_db(sent.message),
            quota: sent.quota.map(QuotaResponse::from_snapshot),
        }
    }
}
