mod common;

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{CARD_ID, FOREIGN_CARD_ID, USERNAME, authed_get, body_json, login, setup_test_app};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_student_data_requires_bearer() {
    let (app, _, _) = setup_test_app().await;

    let request = Request::builder()
        .uri("/api/student/data")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing authorization header");

    let request = Request::builder()
        .uri("/api/student/data")
        .header("authorization", "Token abc")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(authed_get("/api/student/data", "not.a.jwt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_student_data_is_proxied() {
    let (app, _, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .oneshot(authed_get("/api/student/data", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body[0]["id"], 4512);
    assert_eq!(body[0]["numeroInscription"], USERNAME);
}

#[tokio::test]
async fn test_empty_registrations_become_empty_list() {
    let (app, fake, _) = setup_test_app().await;
    let (token, _) = login(&app).await;
    fake.no_registrations.store(true, Ordering::SeqCst);

    let response = app
        .oneshot(authed_get("/api/student/data", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_student_info() {
    let (app, _, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .oneshot(authed_get("/api/student/info", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["nomLatin"], "Amrani");
}

#[tokio::test]
async fn test_exam_summary_averages_each_period() {
    let (app, _, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .oneshot(authed_get(
            &format!("/api/student/exams/{CARD_ID}/summary"),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body[0]["period"], "Semestre 1");
    assert_eq!(body[0]["moduleCount"], 2);
    assert_eq!(body[0]["average"], 12.5);
    assert_eq!(body[0]["passed"], true);
    assert_eq!(body[1]["average"], 0.0);
    assert_eq!(body[1]["passed"], false);
}

#[tokio::test]
async fn test_upstream_error_status_is_propagated() {
    let (app, _, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .oneshot(authed_get("/api/student/exams/777", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Failed to fetch exam data: Internal Server Error"
    );
}

#[tokio::test]
async fn test_invalid_identifier_is_rejected() {
    let (app, _, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .oneshot(authed_get("/api/student/exams/12%3Fx=1", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid identifier");
}

#[tokio::test]
async fn test_grades_of_own_card() {
    let (app, _, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .clone()
        .oneshot(authed_get(&format!("/api/student/cc-grades/{CARD_ID}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await[1]["apLibelleFr"], "Anglais");

    let response = app
        .oneshot(authed_get(
            &format!("/api/student/exam-grades/{CARD_ID}"),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await[0]["noteExamen"], 14);
}

#[tokio::test]
async fn test_foreign_card_is_forbidden() {
    let (app, _, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    for uri in [
        format!("/api/student/cc-grades/{FOREIGN_CARD_ID}"),
        format!("/api/student/exam-grades/{FOREIGN_CARD_ID}"),
        format!("/api/student/card/{FOREIGN_CARD_ID}"),
    ] {
        let response = app.clone().oneshot(authed_get(&uri, &token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(
            body_json(response).await["error"],
            "Access denied: You can only access your own academic records"
        );
    }
}

#[tokio::test]
async fn test_card_without_registrations_cannot_be_validated() {
    let (app, fake, _) = setup_test_app().await;
    let (token, _) = login(&app).await;
    fake.no_registrations.store(true, Ordering::SeqCst);

    let response = app
        .oneshot(authed_get(&format!("/api/student/cc-grades/{CARD_ID}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_photo_and_missing_photo() {
    let (app, fake, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .clone()
        .oneshot(authed_get("/api/student/photo", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!("aGVsbG8="));

    fake.photo_missing.store(true, Ordering::SeqCst);
    let response = app
        .oneshot(authed_get("/api/student/photo", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!(null));
}

#[tokio::test]
async fn test_subjects() {
    let (app, _, _) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .oneshot(authed_get("/api/student/subjects/77/3", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await[0]["mcLibelleFr"], "Anglais");
}

#[tokio::test]
async fn test_student_card_carries_verification_url() {
    let (app, _, state) = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .oneshot(authed_get(&format!("/api/student/card/{CARD_ID}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["cardId"], CARD_ID);
    assert_eq!(body["academicYear"], "2023/2024");
    assert_eq!(body["field"], "Mathématiques et informatique");
    assert_eq!(
        body["verificationUrl"],
        format!("{}/{CARD_ID}", state.upstream_config.check_url)
    );
}
