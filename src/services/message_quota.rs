use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{hours, primitive_now_utc};
use crate::db::models::{Message, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::services::{internal, ServiceError};

pub(crate) const QUOTA_EXCEEDED: &str = "message quota exceeded";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuotaSnapshot {
    pub(crate) used: i64,
    pub(crate) limit: i64,
    pub(crate) remaining: i64,
    pub(crate) window_hours: i64,
    /// When the oldest counted message leaves the window.
    pub(crate) resets_at: Option<PrimitiveDateTime>,
}

#[derive(Debug)]
pub(crate) struct SentMessage {
    pub(crate) message: Message,
    pub(crate) quota: Option<QuotaSnapshot>,
}

#[derive(Debug)]
pub(crate) struct Conversation {
    pub(crate) items: Vec<Message>,
    pub(crate) total_count: i64,
}

pub(crate) fn window_start(now: PrimitiveDateTime, window_hours: i64) -> PrimitiveDateTime {
    now - hours(window_hours)
}

pub(crate) fn snapshot(
    used: i64,
    oldest: Option<PrimitiveDateTime>,
    limit: i64,
    window_hours: i64,
) -> QuotaSnapshot {
    QuotaSnapshot {
        used,
        limit,
        remaining: (limit - used).max(0),
        window_hours,
        resets_at: oldest.filter(|_| used > 0).map(|oldest| oldest + hours(window_hours)),
    }
}

fn validate_body(body: &str, max_chars: usize) -> Result<&str, ServiceError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ServiceError::validation("Message body must not be empty"));
    }
    if body.chars().count() > max_chars {
        return Err(ServiceError::validation(format!(
            "Message body must be at most {max_chars} characters"
        )));
    }
    Ok(body)
}

async fn require_role(
    state: &AppState,
    user_id: &str,
    role: UserRole,
    missing: &'static str,
) -> Result<(), ServiceError> {
    let found = repositories::users::find_role_by_id(state.db(), user_id)
        .await
        .map_err(internal("Failed to fetch user"))?;
    if found == Some(role) {
        Ok(())
    } else {
        Err(ServiceError::not_found(missing))
    }
}

pub(crate) async fn get_message_quota(
    state: &AppState,
    student_id: &str,
    teacher_id: &str,
) -> Result<QuotaSnapshot, ServiceError> {
    require_role(state, teacher_id, UserRole::Teacher, "Teacher not found").await?;

    let settings = state.settings().messaging();
    let now = primitive_now_utc();
    let usage = repositories::messages::window_usage(
        state.db(),
        student_id,
        teacher_id,
        window_start(now, settings.student_quota_window_hours),
    )
    .await
    .map_err(internal("Failed to count messages"))?;

    Ok(snapshot(
        usage.used,
        usage.oldest,
        settings.student_quota_limit,
        settings.student_quota_window_hours,
    ))
}

/// Student to teacher. The count and insert run under a per-pair advisory lock so concurrent
/// sends cannot overshoot the quota.
pub(crate) async fn send_message_to_teacher(
    state: &AppState,
    student: &User,
    teacher_id: &str,
    body: &str,
) -> Result<SentMessage, ServiceError> {
    let settings = state.settings().messaging();
    let body = validate_body(body, settings.max_body_chars)?;
    require_role(state, teacher_id, UserRole::Teacher, "Teacher not found").await?;

    let course_id = repositories::courses::find_shared_course(state.db(), teacher_id, &student.id)
        .await
        .map_err(internal("Failed to check course membership"))?
        .ok_or_else(|| ServiceError::forbidden("You are not enrolled in a course of this teacher"))?;

    let now = primitive_now_utc();
    let mut tx = state.db().begin().await.map_err(internal("Failed to begin transaction"))?;
    let pair = [student.id.as_str(), teacher_id];
    repositories::locks::acquire_xact_lock(&mut *tx, "message_quota", &pair)
        .await
        .map_err(internal("Failed to acquire quota lock"))?;

    let usage = repositories::messages::window_usage(
        &mut *tx,
        &student.id,
        teacher_id,
        window_start(now, settings.student_quota_window_hours),
    )
    .await
    .map_err(internal("Failed to count messages"))?;

    if usage.used >= settings.student_quota_limit {
        metrics::record_message("student_to_teacher", false);
        tracing::info!(
            student_id = %student.id,
            teacher_id,
            used = usage.used,
            limit = settings.student_quota_limit,
            "Message rejected by quota"
        );
        return Err(ServiceError::conflict(QUOTA_EXCEEDED));
    }

    let message_id = Uuid::new_v4().to_string();
    let message = repositories::messages::create(
        &mut *tx,
        repositories::messages::CreateMessage {
            id: &message_id,
            sender_id: &student.id,
            recipient_id: teacher_id,
            sender_role: UserRole::Student,
            course_id: Some(&course_id),
            body,
            created_at: now,
        },
    )
    .await
    .map_err(internal("Failed to store message"))?;

    tx.commit().await.map_err(internal("Failed to commit transaction"))?;
    metrics::record_message("student_to_teacher", true);

    let quota = snapshot(
        usage.used + 1,
        usage.oldest.or(Some(now)),
        settings.student_quota_limit,
        settings.student_quota_window_hours,
    );
    Ok(SentMessage { message, quota: Some(quota) })
}

/// Teacher (or admin) to student. Never counted against any quota.
pub(crate) async fn send_message_to_student(
    state: &AppState,
    sender: &User,
    student_id: &str,
    body: &str,
) -> Result<SentMessage, ServiceError> {
    let body = validate_body(body, state.settings().messaging().max_body_chars)?;
    require_role(state, student_id, UserRole::Student, "Student not found").await?;

    let course_id = repositories::courses::find_shared_course(state.db(), &sender.id, student_id)
        .await
        .map_err(internal("Failed to check course membership"))?;
    if course_id.is_none() && sender.role != UserRole::Admin {
        return Err(ServiceError::forbidden("Student is not enrolled in any of your courses"));
    }

    let message_id = Uuid::new_v4().to_string();
    let message = repositories::messages::create(
        state.db(),
        repositories::messages::CreateMessage {
            id: &message_id,
            sender_id: &sender.id,
            recipient_id: student_id,
            sender_role: sender.role,
            course_id: course_id.as_deref(),
            body,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(internal("Failed to store message"))?;

    metrics::record_message("teacher_to_student", true);
    Ok(SentMessage { message, quota: None })
}

/// Conversation page between `user` and `other_user_id`; inbound messages become delivered.
pub(crate) async fn list_conversation(
    state: &AppState,
    user: &User,
    other_user_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Conversation, ServiceError> {
    repositories::messages::mark_delivered(
        state.db(),
        &user.id,
        other_user_id,
        primitive_now_utc(),
    )
    .await
    .map_err(internal("Failed to mark messages delivered"))?;

    let total_count =
        repositories::messages::count_conversation(state.db(), &user.id, other_user_id)
            .await
            .map_err(internal("Failed to count messages"))?;
    let items = repositories::messages::list_conversation(
        state.db(),
        &user.id,
        other_user_id,
        skip,
        limit,
    )
    .await
    .map_err(internal("Failed to list messages"))?;

    Ok(Conversation { items, total_count })
}

pub(crate) async fn mark_read(
    state: &AppState,
    user: &User,
    message_id: &str,
) -> Result<Message, ServiceError> {
    let message = repositories::messages::find_by_id(state.db(), message_id)
        .await
        .map_err(internal("Failed to fetch message"))?
        .ok_or_else(|| ServiceError::not_found("Message not found"))?;

    if message.recipient_id != user.id {
        return Err(ServiceError::forbidden("Only the recipient can mark a message read"));
    }

    repositories::messages::mark_read(state.db(), message_id, primitive_now_utc())
        .await
        .map_err(internal("Failed to mark message read"))
}
