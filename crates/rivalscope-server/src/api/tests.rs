use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use rivalscope_core::{Comment, PipelineConfig, Platform, Post, StoreError};
use rivalscope_sentiment::{
    AnalysisError, CompletionError, CompletionService, FixedFollowerCount, ScrapeError, Scraper,
    ScraperRegistry,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use super::analyses::analysis_status;
use super::*;

struct OnePostScraper;

#[async_trait]
impl Scraper for OnePostScraper {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn scrape(&self, _profile_url: &str) -> Result<Vec<Post>, ScrapeError> {
        Ok(vec![Post {
            caption: Some("Our new seasonal blend is out".into()),
            like_count: 40,
            comment_count: 2,
            comments: vec![
                Comment::new("fan_one", "I love the new blend so much"),
                Comment::new("fan_two", "Tastes like burnt toast honestly"),
            ],
            ..Post::new(Platform::Instagram, "https://www.instagram.com/p/server-test/")
        }])
    }
}

/// Marks every line positive.
struct PositiveCompletion;

#[async_trait]
impl CompletionService for PositiveCompletion {
    async fn complete_json(&self, _system: &str, user: &str) -> Result<String, CompletionError> {
        let results: Vec<Value> = (0..user.lines().count())
            .map(|i| {
                json!({
                    "index": i,
                    "sentiment_score": 0.5,
                    "sentiment_label": "positive",
                    "explanation": "upbeat",
                    "keywords": ["blend"],
                })
            })
            .collect();
        Ok(json!({ "results": results }).to_string())
    }
}

fn test_app(pool: sqlx::PgPool) -> Router {
    let services = AnalysisServices {
        scrapers: ScraperRegistry::new().with(Arc::new(OnePostScraper)),
        completion: Arc::new(PositiveCompletion),
        followers: Arc::new(FixedFollowerCount(1_000)),
        pipeline: PipelineConfig::default(),
    };
    build_app(AppState { pool, services })
}

async fn seed_competitor(pool: &sqlx::PgPool, instagram_url: Option<&str>) -> Uuid {
    sqlx::query_scalar("INSERT INTO competitors (name, instagram_url) VALUES ($1, $2) RETURNING id")
        .bind("Acme Coffee")
        .bind(instagram_url)
        .fetch_one(pool)
        .await
        .expect("insert competitor")
}

fn post_analysis(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/analyses")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn api_error_not_found_maps_to_404() {
    let response = ApiError::new("req-1", "not_found", "missing").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn analysis_errors_map_to_statuses() {
    assert_eq!(
        analysis_status(&AnalysisError::CompetitorNotFound(Uuid::nil())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        analysis_status(&AnalysisError::Store(StoreError::RunNotFound(Uuid::nil()))),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        analysis_status(&AnalysisError::NoProfilesConfigured),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        analysis_status(&AnalysisError::NoPostsFound { reports: vec![] }),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        analysis_status(&AnalysisError::Store(StoreError::DuplicateStatistics(
            Uuid::nil()
        ))),
        StatusCode::CONFLICT
    );
    assert_eq!(
        analysis_status(&AnalysisError::Store(StoreError::backend(
            std::io::Error::other("disk full")
        ))),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_ok_and_echoes_request_id(pool: sqlx::PgPool) {
    let response = test_app(pool)
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-health")
    );
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["meta"]["request_id"], "req-health");
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_competitor_is_404(pool: sqlx::PgPool) {
    let response = test_app(pool)
        .oneshot(post_analysis(&json!({ "competitor_id": Uuid::new_v4() })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().expect("error").contains("not found"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn competitor_without_profiles_is_422(pool: sqlx::PgPool) {
    let competitor_id = seed_competitor(&pool, None).await;

    let response = test_app(pool)
        .oneshot(post_analysis(&json!({ "competitor_id": competitor_id })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"]
        .as_str()
        .expect("error")
        .contains("no social profiles configured"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn analysis_persists_and_statistics_are_readable(pool: sqlx::PgPool) {
    let competitor_id =
        seed_competitor(&pool, Some("https://www.instagram.com/acmecoffee/")).await;
    let app = test_app(pool.clone());

    let response = app
        .clone()
        .oneshot(post_analysis(&json!({ "competitor_id": competitor_id })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["statistics"]["total_posts"], 1);
    assert_eq!(json["statistics"]["total_comments"], 2);
    assert_eq!(json["platforms"][0]["platform"], "instagram");

    let run_id: Uuid =
        sqlx::query_scalar("SELECT id FROM analysis_runs WHERE competitor_id = $1")
            .bind(competitor_id)
            .fetch_one(&pool)
            .await
            .expect("run row");

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/analyses/{run_id}/statistics"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["analysis_run_id"], run_id.to_string());
    assert_eq!(json["data"]["total_comments"], 2);
    assert_eq!(json["data"]["positive_percentage"], 100.0);
    assert_eq!(json["data"]["top_keywords"][0]["keyword"], "blend");
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_statistics_is_404(pool: sqlx::PgPool) {
    let response = test_app(pool)
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/analyses/{}/statistics", Uuid::new_v4()))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "not_found");
}
