//! Emusys client against a local stand-in for the lesson API
//!
//! Tests that touch EMUSYS_TOKEN are marked #[serial].

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use ca_common::config::EmusysConfig;
use ca_sync::stores::{EmusysClient, LessonApiError, LessonSource};
use chrono::NaiveDate;
use serde_json::{json, Value};
use serial_test::serial;
use std::collections::HashMap;
use std::time::Duration;

fn wire_lesson(id: i64, teacher: &str) -> Value {
    json!({
        "id": id,
        "categoria": "Regular",
        "curso_nome": "Piano",
        "data_hora_inicio": "2024-03-05 14:00:00",
        "data_hora_fim": "2024-03-05 14:50:00",
        "professores": [{"nome": teacher}],
        "alunos": [{"nome_aluno": format!("Aluno {id}")}],
        "cancelada": false
    })
}

/// Two pages linked by cursor `p2`; wrong token yields 401
async fn aulas(Query(params): Query<HashMap<String, String>>) -> Result<Json<Value>, (StatusCode, String)> {
    if params.get("token").map(String::as_str) != Some("secret") {
        return Err((StatusCode::UNAUTHORIZED, "invalid token".to_string()));
    }
    if params.get("data_hora_inicial").map(String::as_str) != Some("2024-03-01 00:00:00") {
        return Err((StatusCode::BAD_REQUEST, "bad range".to_string()));
    }

    let page = match params.get("cursor").map(String::as_str) {
        None => json!({
            "items": [wire_lesson(1, "Ana"), wire_lesson(2, "Ana"), wire_lesson(3, "Bruno")],
            "paginacao": {"proximo_cursor": "p2", "tem_mais": true}
        }),
        Some("p2") => json!({
            "items": [wire_lesson(4, "Carla")],
            "paginacao": {"proximo_cursor": null, "tem_mais": false}
        }),
        Some(other) => return Err((StatusCode::BAD_REQUEST, format!("unknown cursor {other}"))),
    };
    Ok(Json(page))
}

async fn serve() -> String {
    let app = Router::new()
        .route("/aulas", get(aulas))
        .route("/broken/aulas", get(|| async { "not json" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn march() -> (chrono::NaiveDateTime, chrono::NaiveDateTime) {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap().and_hms_opt(23, 59, 59).unwrap();
    (start, end)
}

fn client(base: &str, token: Option<&str>, max_records: usize) -> EmusysClient {
    EmusysClient::new(base, token.map(str::to_string), max_records, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_follows_cursor_across_pages() {
    let base = serve().await;
    let (start, end) = march();

    let lessons = client(&base, Some("secret"), 100)
        .fetch_lessons_in_range(start, end)
        .await
        .unwrap();

    let ids: Vec<i64> = lessons.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(lessons[3].teacher_names, vec!["Carla".to_string()]);
    assert_eq!(lessons[0].student_name.as_deref(), Some("Aluno 1"));
}

#[tokio::test]
async fn test_record_cap_stops_pagination() {
    let base = serve().await;
    let (start, end) = march();

    let lessons = client(&base, Some("secret"), 2)
        .fetch_lessons_in_range(start, end)
        .await
        .unwrap();

    assert_eq!(lessons.len(), 3, "only the first page is fetched");
}

#[tokio::test]
async fn test_rejected_token_is_status_error() {
    let base = serve().await;
    let (start, end) = march();

    let err = client(&base, Some("wrong"), 100)
        .fetch_lessons_in_range(start, end)
        .await
        .unwrap_err();

    match err {
        LessonApiError::Status(code, body) => {
            assert_eq!(code, 401);
            assert!(body.contains("invalid token"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let base = serve().await;
    let (start, end) = march();

    let err = client(&format!("{base}/broken"), Some("secret"), 100)
        .fetch_lessons_in_range(start, end)
        .await
        .unwrap_err();

    assert!(matches!(err, LessonApiError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let (start, end) = march();

    let err = client("http://127.0.0.1:9", Some("secret"), 100)
        .fetch_lessons_in_range(start, end)
        .await
        .unwrap_err();

    assert!(matches!(err, LessonApiError::Network(_)));
}

#[tokio::test]
#[serial]
async fn test_from_config_prefers_environment_token() {
    std::env::set_var("EMUSYS_TOKEN", "secret");
    let base = serve().await;
    let config = EmusysConfig {
        base_url: base,
        token: Some("wrong".to_string()),
        ..EmusysConfig::default()
    };

    let client = EmusysClient::from_config(&config).unwrap();
    std::env::remove_var("EMUSYS_TOKEN");
    assert!(client.has_token());

    let (start, end) = march();
    let lessons = client.fetch_lessons_in_range(start, end).await.unwrap();
    assert_eq!(lessons.len(), 4);
}

#[tokio::test]
#[serial]
async fn test_missing_token_returns_no_lessons() {
    std::env::remove_var("EMUSYS_TOKEN");
    let config = EmusysConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        token: None,
        ..EmusysConfig::default()
    };

    let client = EmusysClient::from_config(&config).unwrap();
    assert!(!client.has_token());

    let (start, end) = march();
    assert!(client.fetch_lessons_in_range(start, end).await.unwrap().is_empty());
}
