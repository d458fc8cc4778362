//! Mock checknumber.ai service built on wiremock

use super::config::{TASKS_PATH, TEST_API_KEY};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Task ID every mock submission returns
pub const TASK_ID: &str = "cm5task001";

/// User ID every mock submission returns
pub const USER_ID: &str = "usr_42";

/// Path the mock artifact is served from
pub const ARTIFACT_PATH: &str = "/files/results.xlsx";

/// Task response body with the given status
pub fn task_body(status: &str, result_url: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "created_at": "2025-02-01T12:00:00Z",
        "updated_at": "2025-02-01T12:00:30Z",
        "task_id": TASK_ID,
        "user_id": USER_ID,
        "status": status,
        "total": 3,
        "success": if status == "exported" { 3 } else { 1 },
        "failure": 0
    });
    if let Some(url) = result_url {
        body["result_url"] = serde_json::Value::String(url.to_string());
    }
    body
}

/// Artifact URL on the mock server
pub fn artifact_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), ARTIFACT_PATH)
}

/// Accept one submission and answer with `template`
pub async fn mount_submit(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(TASKS_PATH))
        .and(header("X-API-Key", TEST_API_KEY))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Answer status queries with `templates`, one per request, in order
///
/// The last template keeps answering once the others are used up.
pub async fn mount_status_sequence(server: &MockServer, templates: Vec<ResponseTemplate>) {
    let status_path = format!("{}/{}", TASKS_PATH, TASK_ID);
    let count = templates.len();

    for (i, template) in templates.into_iter().enumerate() {
        let mock = Mock::given(method("GET"))
            .and(path(status_path.as_str()))
            .and(query_param("user_id", USER_ID))
            .and(header("X-API-Key", TEST_API_KEY))
            .respond_with(template);

        let mock = if i + 1 < count {
            mock.up_to_n_times(1)
        } else {
            mock
        };
        mock.mount(server).await;
    }
}

/// Serve the result artifact with `template`
pub async fn mount_artifact(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(ARTIFACT_PATH))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Requests the server received for a method and path
pub async fn requests_to(
    server: &MockServer,
    http_method: &str,
    path_prefix: &str,
) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == http_method && r.url.path().starts_with(path_prefix))
        .collect()
}

/// Status-query requests received so far
pub async fn status_requests(server: &MockServer) -> Vec<wiremock::Request> {
    requests_to(server, "GET", &format!("{}/", TASKS_PATH)).await
}
