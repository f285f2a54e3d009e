//! End-to-end tests against the router on an ephemeral port.

use std::sync::Arc;

use questlog_core::Database;
use questlog_server::{router, AppState};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct Api {
    base: String,
    client: Client,
    user_id: String,
}

impl Api {
    async fn spawn() -> Self {
        let state = Arc::new(AppState::new(Database::open_memory().unwrap()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        let base = format!("http://{addr}");
        let client = Client::new();
        let user: Value = client
            .post(format!("{base}/api/users"))
            .json(&json!({ "username": "sam" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let user_id = user["id"].as_str().unwrap().to_string();
        Self {
            base,
            client,
            user_id,
        }
    }

    async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = self
            .client
            .request(method, format!("{}{path}", self.base))
            .header("x-user-id", &self.user_id);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        let text = resp.text().await.unwrap();
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, value)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.call(reqwest::Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.call(reqwest::Method::POST, path, Some(body)).await
    }

    async fn post_empty(&self, path: &str) -> (StatusCode, Value) {
        self.call(reqwest::Method::POST, path, None).await
    }
}

#[tokio::test]
async fn health_is_open() {
    let api = Api::spawn().await;
    let body = reqwest::get(format!("{}/api/health", api.base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn identity_is_required() {
    let api = Api::spawn().await;
    let resp = api
        .client
        .get(format!("{}/api/stats", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = api
        .client
        .get(format!("{}/api/stats", api.base))
        .header("x-user-id", "ghost")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let api = Api::spawn().await;
    let (status, _) = api.post("/api/users", json!({ "username": "sam" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn new_user_starts_at_level_one() {
    let api = Api::spawn().await;
    let (status, stats) = api.get("/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["level"], 1);
    assert_eq!(stats["experience_to_next_level"], 60);
    assert_eq!(stats["health"], 50);
}

#[tokio::test]
async fn habit_lifecycle() {
    let api = Api::spawn().await;
    let (status, habit) = api
        .post("/api/habits", json!({ "title": "  Stretch  ", "difficulty": "medium" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(habit["title"], "Stretch");
    let id = habit["id"].as_str().unwrap().to_string();

    let (status, done) = api.post_empty(&format!("/api/habits/{id}/complete")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["habit"]["streak"], 1);
    assert_eq!(done["habit"]["completed"], true);
    assert_eq!(done["rewards"]["experience"], 10);
    assert_eq!(done["rewards"]["coins"], 5);
    assert_eq!(done["user"]["username"], "sam");
    assert_eq!(done["user"]["experience"], 10);
    assert_eq!(done["user"]["coins"], 5);
    assert!(done.get("message").is_none());

    let (status, _) = api.post_empty(&format!("/api/habits/{id}/complete")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, failed) = api.post_empty(&format!("/api/habits/{id}/fail")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["habit"]["streak"], 0);
    assert_eq!(failed["habit"]["best_streak"], 1);
    assert_eq!(failed["user"]["health"], 45);
    assert_eq!(failed["user"]["experience"], 3);

    let (status, list) = api.get("/api/habits").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, updated) = api
        .call(
            reqwest::Method::PUT,
            &format!("/api/habits/{id}"),
            Some(json!({ "title": "Stretch more", "difficulty": "hard" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["difficulty"], "hard");

    let (status, _) = api
        .call(reqwest::Method::DELETE, &format!("/api/habits/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = api.get(&format!("/api/habits/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_titles_are_rejected() {
    let api = Api::spawn().await;
    let (status, body) = api.post("/api/habits", json!({ "title": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let long = "x".repeat(201);
    let (status, _) = api.post("/api/dailies", json!({ "title": long })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .post("/api/routines", json!({ "title": "Morning", "tasks": ["ok", ""] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let api = Api::spawn().await;
    let (status, body) = api
        .post("/api/habits", json!({ "title": "Read", "difficulty": "brutal" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn daily_complete_and_undo() {
    let api = Api::spawn().await;
    let (_, daily) = api
        .post(
            "/api/dailies",
            json!({ "title": "Inbox zero", "difficulty": "medium", "priority": "high" }),
        )
        .await;
    let id = daily["id"].as_str().unwrap().to_string();

    let (status, done) = api.post_empty(&format!("/api/dailies/{id}/complete")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["rewards"]["experience"], 11);
    assert_eq!(done["daily"]["completed"], true);

    let (status, undone) = api
        .post_empty(&format!("/api/dailies/{id}/uncomplete"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(undone["rewards"]["experience"], -11);
    assert_eq!(undone["user"]["experience"], 0);
    assert_eq!(undone["daily"]["completed"], false);

    let (status, _) = api
        .post_empty(&format!("/api/dailies/{id}/uncomplete"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn routine_completion() {
    let api = Api::spawn().await;
    let (status, routine) = api
        .post(
            "/api/routines",
            json!({ "title": "Morning", "tasks": ["Water", "Stretch", "Plan"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = routine["id"].as_str().unwrap().to_string();
    let task_ids: Vec<String> = routine["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect();

    let (status, _) = api.post_empty(&format!("/api/routines/{id}/complete")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for task in &task_ids[..2] {
        let (status, toggled) = api
            .post_empty(&format!("/api/routines/{id}/tasks/{task}/toggle"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(toggled["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["id"] == task.as_str() && t["completed"] == true));
    }

    let (status, done) = api.post_empty(&format!("/api/routines/{id}/complete")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["completionRate"], 67);
    assert_eq!(done["rewards"]["experience"], 20);
    assert_eq!(done["rewards"]["coins"], 10);
    assert_eq!(done["user"]["experience"], 20);

    let (status, reset) = api.post_empty(&format!("/api/routines/{id}/reset")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(reset["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .all(|t| t["completed"] == false));

    let (status, _) = api
        .post_empty(&format!("/api/routines/{id}/tasks/nope/toggle"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completion_that_levels_up_carries_message() {
    let api = Api::spawn().await;
    api.post("/api/stats", json!({ "level": 1, "experience": 55 })).await;
    let (_, habit) = api
        .post("/api/habits", json!({ "title": "Read", "difficulty": "medium" }))
        .await;
    let id = habit["id"].as_str().unwrap().to_string();

    let (status, done) = api.post_empty(&format!("/api/habits/{id}/complete")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["message"], "Level Up! 🎉");
    assert_eq!(done["user"]["level"], 2);
    assert_eq!(done["user"]["experience"], 15);
}

#[tokio::test]
async fn failed_habit_at_low_health_reports_level_down() {
    let api = Api::spawn().await;
    api.post("/api/stats", json!({ "level": 2, "experience": 5, "health": 3 })).await;
    let (_, habit) = api
        .post("/api/habits", json!({ "title": "Snack", "difficulty": "medium" }))
        .await;
    let id = habit["id"].as_str().unwrap().to_string();

    let (status, failed) = api.post_empty(&format!("/api/habits/{id}/fail")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["message"], "Health depleted! Level Down! 😢");
    assert_eq!(failed["user"]["level"], 1);
    assert_eq!(failed["user"]["health"], 50);

    let (_, stats) = api.get("/api/stats").await;
    assert_eq!(stats["level"], 1);
}

#[tokio::test]
async fn stats_post_overwrites_after_normalizing() {
    let api = Api::spawn().await;
    let (status, stored) = api
        .post(
            "/api/stats",
            json!({ "level": 3, "experience": 10, "health": 999, "coins": 40 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["level"], 3);
    assert_eq!(stored["health"], 50);
    assert_eq!(stored["experience_to_next_level"], 79);
    assert_eq!(stored["coins"], 40);

    let (_, fetched) = api.get("/api/stats").await;
    assert_eq!(fetched, stored);
}

#[tokio::test]
async fn tasks_are_scoped_to_their_owner() {
    let api = Api::spawn().await;
    let (_, habit) = api.post("/api/habits", json!({ "title": "Read" })).await;
    let id = habit["id"].as_str().unwrap();

    let other: Value = api
        .client
        .post(format!("{}/api/users", api.base))
        .json(&json!({ "username": "alex" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let resp = api
        .client
        .post(format!("{}/api/habits/{id}/complete", api.base))
        .header("x-user-id", other["id"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
