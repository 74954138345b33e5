#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use taskdeck_client::ApiClient;
use taskdeck_session::SessionContext;
use wiremock::MockServer;

pub const USER_ID: &str = "u-1";
pub const TOKEN: &str = "tok-1";

pub async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::builder(format!("{}/api", server.uri()))
        .build(Arc::new(SessionContext::in_memory()))
        .unwrap();
    (server, client)
}

pub async fn setup_logged_in() -> (MockServer, ApiClient) {
    let (server, client) = setup().await;
    client.session().login(USER_ID, TOKEN).await.unwrap();
    (server, client)
}

pub fn task_json(id: &str, title: &str, done: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": null,
        "is_completed": done,
        "user_id": USER_ID,
        "created_at": "2024-05-01T10:00:00",
        "updated_at": "2024-05-01T10:00:00"
    })
}

pub fn tasks_path(rest: &str) -> String {
    format!("/api/{USER_ID}/tasks{rest}")
}
