use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support::{self, TestContext};

async fn call(
    ctx: &TestContext,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
async fn student_quota_is_enforced_but_teacher_replies_are_not() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let limit = ctx.state.settings().messaging().student_quota_limit;

    let teacher = test_support::insert_user(db, "m1@school.test", "Ms Hale", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "m2@school.test", "Noa Levi", UserRole::Student).await;
    test_support::insert_course(db, &teacher, &[&student]).await;
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    for sent in 1..=limit {
        let (status, body) = call(
            &ctx,
            Method::POST,
            "/api/messages",
            &student_token,
            Some(json!({ "teacher_id": teacher.id, "body": format!("Question {sent}") })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["quota"]["remaining"], limit - sent);
    }

    let (_, quota) = call(
        &ctx,
        Method::GET,
        &format!("/api/messages/quota?teacher_id={}", teacher.id),
        &student_token,
        None,
    )
    .await;
    assert_eq!(quota["used"], limit);
    assert_eq!(quota["remaining"], 0);
    assert!(quota["resets_at"].is_string());

    let (status, body) = call(
        &ctx,
        Method::POST,
        "/api/messages",
        &student_token,
        Some(json!({ "teacher_id": teacher.id, "body": "One more?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    for _ in 0..2 {
        let (status, body) = call(
            &ctx,
            Method::POST,
            "/api/teacher/messages",
            &teacher_token,
            Some(json!({ "student_id": student.id, "body": "Happy to help" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.get("quota").is_none());
    }

    let (_, quota) = call(
        &ctx,
        Method::GET,
        &format!("/api/messages/quota?teacher_id={}", teacher.id),
        &student_token,
        None,
    )
    .await;
    assert_eq!(quota["remaining"], 0);
}

#[tokio::test]
async fn messaging_requires_a_shared_course() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "m3@school.test", "Mr Quinn", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "m4@school.test", "Ola Berg", UserRole::Student).await;
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let (status, _) = call(
        &ctx,
        Method::POST,
        "/api/messages",
        &student_token,
        Some(json!({ "teacher_id": teacher.id, "body": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &ctx,
        Method::POST,
        "/api/teacher/messages",
        &teacher_token,
        Some(json!({ "student_id": student.id, "body": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn recipient_lists_and_reads_conversation() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "m5@school.test", "Ms Park", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "m6@school.test", "Leo Grant", UserRole::Student).await;
    test_support::insert_course(db, &teacher, &[&student]).await;
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let (_, sent) = call(
        &ctx,
        Method::POST,
        "/api/messages",
        &student_token,
        Some(json!({ "teacher_id": teacher.id, "body": "Is the quiz open-book?" })),
    )
    .await;
    let message_id = sent["message"]["id"].as_str().expect("message id").to_string();

    let (status, _) = call(
        &ctx,
        Method::POST,
        &format!("/api/messages/{message_id}/read"),
        &student_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, page) = call(
        &ctx,
        Method::GET,
        &format!("/api/messages?with={}", student.id),
        &teacher_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 1);
    assert_eq!(page["items"][0]["sender_role"], "student");

    let (status, read) = call(
        &ctx,
        Method::POST,
        &format!("/api/messages/{message_id}/read"),
        &teacher_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(read["read_at"].is_string());
    assert!(read["delivered_at"].is_string());
}

#[tokio::test]
async fn blank_message_body_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "m7@school.test", "Mr Dunn", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "m8@school.test", "Ava Ross", UserRole::Student).await;
    test_support::insert_course(db, &teacher, &[&student]).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let (status, _) = call(
        &ctx,
        Method::POST,
        "/api/messages",
        &token,
        Some(json!({ "teacher_id": teacher.id, "body": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
