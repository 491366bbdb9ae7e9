use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::api::router::router;
use crate::core::{redis::RedisHandle, state::AppState};
use crate::db::models::User;
use crate::db::types::{QuestionType, UserRole};
use crate::test_support::{self, QuestionSpec, TestContext};

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

/// Student submits a quiz with one auto-graded and two written questions.
async fn submit_mixed_quiz(ctx: &TestContext, teacher: &User, student: &User) -> String {
    let db = ctx.state.db();
    let course = test_support::insert_course(db, teacher, &[student]).await;
    let (assessment, questions) = test_support::insert_assessment(
        db,
        &course,
        1,
        &[
            QuestionSpec::objective(QuestionType::SingleChoice, 2.0, &["a"]),
            QuestionSpec::subjective(QuestionType::ShortAnswer, 3.0),
            QuestionSpec::subjective(QuestionType::Essay, 5.0),
        ],
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let (_, started) = call(
        ctx,
        Method::POST,
        &format!("/api/assessments/{}/start", assessment.id),
        &token,
        None,
    )
    .await;
    let submission_id = started["submission"]["id"].as_str().expect("submission id").to_string();

    let (status, submitted) = call(
        ctx,
        Method::POST,
        &format!("/api/assessments/{}/submit", assessment.id),
        &token,
        Some(json!({
            "submission_id": submission_id,
            "answers": [
                {"question_id": questions[0].id, "selected_options": ["a"]},
                {"question_id": questions[1].id, "text_answer": "Photosynthesis"},
                {"question_id": questions[2].id, "text_answer": "Plants convert light into sugar."}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "submitted");
    assert_eq!(submitted["score"], 2.0);

    submission_id
}

#[tokio::test]
async fn written_answers_enter_queue_and_last_grade_finalizes() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "g1@school.test", "Ms Adler", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "g2@school.test", "Ben Fox", UserRole::Student).await;
    let submission_id = submit_mixed_quiz(&ctx, &teacher, &student).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let (status, page) = call(&ctx, Method::GET, "/api/teacher/grading/queue", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 2);
    let items = page["items"].as_array().expect("items").clone();
    assert!(items.iter().all(|item| item["submission_id"] == submission_id.as_str()));
    assert!(items.iter().all(|item| item["priority"] == "low"));

    let (_, stats) = call(&ctx, Method::GET, "/api/teacher/grading/queue/stats", &token, None).await;
    assert_eq!(stats["pending"], 2);
    assert_eq!(stats["flagged"], 0);

    let first = items[0]["item_id"].as_str().expect("item id").to_string();
    let second = items[1]["item_id"].as_str().expect("item id").to_string();

    let (status, graded) = call(
        &ctx,
        Method::POST,
        &format!("/api/teacher/grading/queue/{first}"),
        &token,
        Some(json!({ "points": 3.0, "feedback": "Good" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graded["submission"]["status"], "submitted");

    let (status, graded) = call(
        &ctx,
        Method::POST,
        &format!("/api/teacher/grading/queue/{second}"),
        &token,
        Some(json!({ "points": 3.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graded["answer"]["review_status"], "graded");
    assert_eq!(graded["submission"]["status"], "graded");
    assert_eq!(graded["submission"]["score"], 8.0);
    assert_eq!(graded["submission"]["percentage"], 80.0);

    let (_, page) = call(&ctx, Method::GET, "/api/teacher/grading/queue", &token, None).await;
    assert_eq!(page["total_count"], 0);
}

#[tokio::test]
async fn grade_rejects_points_above_question_maximum() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "g3@school.test", "Mr Stone", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "g4@school.test", "Mia Cruz", UserRole::Student).await;
    submit_mixed_quiz(&ctx, &teacher, &student).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let (_, page) = call(
        &ctx,
        Method::GET,
        "/api/teacher/grading/queue?question_type=short_answer",
        &token,
        None,
    )
    .await;
    assert_eq!(page["total_count"], 1);
    let item_id = page["items"][0]["item_id"].as_str().expect("item id").to_string();

    let (status, _) = call(
        &ctx,
        Method::POST,
        &format!("/api/teacher/grading/queue/{item_id}"),
        &token,
        Some(json!({ "points": 4.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn flagged_items_are_high_priority() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "g5@school.test", "Ms Berg", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "g6@school.test", "Raj Patel", UserRole::Student).await;
    submit_mixed_quiz(&ctx, &teacher, &student).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let (_, page) = call(&ctx, Method::GET, "/api/teacher/grading/queue", &token, None).await;
    let item_id = page["items"][0]["item_id"].as_str().expect("item id").to_string();

    let (status, flagged) = call(
        &ctx,
        Method::POST,
        &format!("/api/teacher/grading/queue/{item_id}/flag"),
        &token,
        Some(json!({ "reason": "Possible plagiarism" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flagged["review_status"], "flagged");

    let (_, page) = call(
        &ctx,
        Method::GET,
        "/api/teacher/grading/queue?priority=high",
        &token,
        None,
    )
    .await;
    assert_eq!(page["total_count"], 1);
    assert_eq!(page["items"][0]["item_id"], item_id.as_str());
    assert_eq!(page["items"][0]["flag_reason"], "Possible plagiarism");

    let (_, stats) = call(&ctx, Method::GET, "/api/teacher/grading/queue/stats", &token, None).await;
    assert_eq!(stats["flagged"], 1);
    assert_eq!(stats["high_priority"], 1);
}

#[tokio::test]
async fn other_teachers_cannot_grade_items() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "g7@school.test", "Mr Lund", UserRole::Teacher).await;
    let other = test_support::insert_user(db, "g8@school.test", "Ms Vega", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "g9@school.test", "Zoe Kim", UserRole::Student).await;
    submit_mixed_quiz(&ctx, &teacher, &student).await;

    let owner_token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let (_, page) = call(&ctx, Method::GET, "/api/teacher/grading/queue", &owner_token, None).await;
    let item_id = page["items"][0]["item_id"].as_str().expect("item id").to_string();

    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
    let (_, other_page) =
        call(&ctx, Method::GET, "/api/teacher/grading/queue", &other_token, None).await;
    assert_eq!(other_page["total_count"], 0);

    let (status, _) = call(
        &ctx,
        Method::POST,
        &format!("/api/teacher/grading/queue/{item_id}"),
        &other_token,
        Some(json!({ "points": 1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ai_draft_is_unavailable_without_model() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "g10@school.test", "Ms Roth", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "g11@school.test", "Max Bell", UserRole::Student).await;
    submit_mixed_quiz(&ctx, &teacher, &student).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let (_, page) = call(&ctx, Method::GET, "/api/teacher/grading/queue", &token, None).await;
    let item_id = page["items"][0]["item_id"].as_str().expect("item id").to_string();

    let (status, _) = call(
        &ctx,
        Method::POST,
        &format!("/api/teacher/grading/queue/{item_id}/ai-draft"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn grading_runs_on_a_single_connection() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let teacher = test_support::insert_user(db, "g12@school.test", "Mr Dahl", UserRole::Teacher).await;
    let other = test_support::insert_user(db, "g13@school.test", "Ms Ruiz", UserRole::Teacher).await;
    let student = test_support::insert_user(db, "g14@school.test", "Ola Berg", UserRole::Student).await;
    submit_mixed_quiz(&ctx, &teacher, &student).await;

    let settings = ctx.state.settings().clone();
    let single = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(3))
        .connect(&settings.database().database_url())
        .await
        .expect("single connection pool");
    let redis = RedisHandle::new(settings.redis().redis_url());
    let state = AppState::new(settings, single, redis, None);
    let app = router(state.clone());
    let send = |method: Method, uri: String, token: String, body: Option<serde_json::Value>| {
        let app = app.clone();
        async move {
            let response = app
                .oneshot(test_support::json_request(method, &uri, Some(&token), body))
                .await
                .expect("response");
            let status = response.status();
            (status, test_support::read_json(response).await)
        }
    };

    let token = test_support::bearer_token(&teacher.id, state.settings());
    let (_, page) =
        send(Method::GET, "/api/teacher/grading/queue".to_string(), token.clone(), None).await;
    let item_id = page["items"][0]["item_id"].as_str().expect("item id").to_string();

    let other_token = test_support::bearer_token(&other.id, state.settings());
    let (status, _) = send(
        Method::POST,
        format!("/api/teacher/grading/queue/{item_id}/flag"),
        other_token,
        Some(json!({ "reason": "Looks copied" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, graded) = send(
        Method::POST,
        format!("/api/teacher/grading/queue/{item_id}"),
        token,
        Some(json!({ "points": 2.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graded["answer"]["points_awarded"], 2.0);
}
