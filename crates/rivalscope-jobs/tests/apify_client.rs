//! Integration tests for `ApifyJobService` and `JobRunner` against a local
//! `wiremock` server. No real network traffic is made.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rivalscope_jobs::{
    ApifyJobService, JobError, JobId, JobRunner, JobService, JobSpec, JobStatus, PollPolicy,
};

fn test_service(server: &MockServer) -> ApifyJobService {
    ApifyJobService::new(&server.uri(), "test-token", 5, 0, 0)
        .expect("failed to build test ApifyJobService")
}

fn test_service_with_retries(server: &MockServer, max_retries: u32) -> ApifyJobService {
    ApifyJobService::new(&server.uri(), "test-token", 5, max_retries, 0)
        .expect("failed to build test ApifyJobService")
}

fn spec() -> JobSpec {
    JobSpec {
        actor_id: "apify~instagram-scraper".to_string(),
        input: json!({"directUrls": ["https://www.instagram.com/acme/"], "resultsLimit": 10}),
    }
}

fn run_body(status: &str) -> serde_json::Value {
    json!({"data": {"id": "run-42", "status": status, "defaultDatasetId": "ds-1"}})
}

fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::ZERO,
        max_attempts,
    }
}

// ---------------------------------------------------------------------------
// submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_posts_input_with_bearer_token_and_returns_run_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acts/apify~instagram-scraper/runs"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(spec().input))
        .respond_with(ResponseTemplate::new(201).set_body_json(run_body("READY")))
        .expect(1)
        .mount(&server)
        .await;

    let job_id = test_service(&server).submit(&spec()).await.unwrap();
    assert_eq!(job_id, JobId("run-42".to_string()));
}

#[tokio::test]
async fn submit_returns_api_error_on_client_error_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acts/apify~instagram-scraper/runs"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_service_with_retries(&server, 3)
        .submit(&spec())
        .await
        .unwrap_err();
    assert!(
        matches!(err, JobError::Api { status: 401, ref message } if message == "invalid token"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn submit_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acts/apify~instagram-scraper/runs"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/acts/apify~instagram-scraper/runs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(run_body("READY")))
        .mount(&server)
        .await;

    let job_id = test_service_with_retries(&server, 2)
        .submit(&spec())
        .await
        .unwrap();
    assert_eq!(job_id.0, "run-42");
}

#[tokio::test]
async fn submit_reports_malformed_body_as_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acts/apify~instagram-scraper/runs"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = test_service(&server).submit(&spec()).await.unwrap_err();
    assert!(matches!(err, JobError::Deserialize { .. }), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// poll
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poll_maps_remote_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("TIMED-OUT")))
        .mount(&server)
        .await;

    let status = test_service(&server)
        .poll(&JobId("run-42".into()))
        .await
        .unwrap();
    assert_eq!(status, JobStatus::TimedOut);
}

#[tokio::test]
async fn poll_rejects_unknown_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("EXPLODED")))
        .mount(&server)
        .await;

    let err = test_service(&server)
        .poll(&JobId("run-42".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::UnknownStatus(ref s) if s == "EXPLODED"));
}

// ---------------------------------------------------------------------------
// full lifecycle
// ---------------------------------------------------------------------------

async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/acts/apify~instagram-scraper/runs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(run_body("READY")))
        .mount(server)
        .await;
}

#[tokio::test]
async fn runner_fetches_dataset_items_after_success() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("RUNNING")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/actor-runs/run-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("SUCCEEDED")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/actor-runs/run-42/dataset/items"))
        .and(query_param("format", "json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"url": "https://www.instagram.com/p/a/"}, {"url": "https://www.instagram.com/p/b/"}])),
        )
        .mount(&server)
        .await;

    let service = test_service(&server);
    let items = JobRunner::new(&service, fast_policy(10))
        .run(&spec())
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["url"], "https://www.instagram.com/p/b/");
}

#[tokio::test]
async fn runner_surfaces_remote_failure_with_status() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("ABORTED")))
        .mount(&server)
        .await;

    let service = test_service(&server);
    let err = JobRunner::new(&service, fast_policy(10))
        .run(&spec())
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            JobError::Terminal {
                status: JobStatus::Aborted,
                ..
            }
        ),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn runner_times_out_locally_when_job_never_finishes() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("RUNNING")))
        .expect(3)
        .mount(&server)
        .await;

    let service = test_service(&server);
    let err = JobRunner::new(&service, fast_policy(3))
        .run(&spec())
        .await
        .unwrap_err();
    assert!(
        matches!(err, JobError::LocalTimeout { attempts: 3, .. }),
        "got: {err:?}"
    );
}
