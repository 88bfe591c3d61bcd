//! User registration over HTTP.

use reqwest::StatusCode;
use serde_json::{Value, json};

use order_desk_integration_tests::TestServer;

fn user(email: &str) -> Value {
    json!({
        "name": "Ada",
        "surname": "Lovelace",
        "email": email,
        "password": "analytical-engine",
        "phoneNumber": "555-0100"
    })
}

#[tokio::test]
async fn test_register_then_list_without_hash() {
    let server = TestServer::in_memory().await;

    let resp = server
        .post_json("/register", &user("ada@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.text().await.unwrap(),
        "User Ada Lovelace registered successfully."
    );

    let body = server.get("/users").send().await.unwrap().text().await.unwrap();
    assert!(!body.contains("analytical-engine"));
    assert!(!body.contains("argon2"));

    let users: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["rowKey"], "ada@example.com");
    assert_eq!(users[0]["role"], "Customer");
}

#[tokio::test]
async fn test_duplicate_email_keeps_first_registration() {
    let server = TestServer::in_memory().await;

    let first = server
        .post_json("/register", &user("dup@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = server
        .post_json("/register", &user("dup@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(second.text().await.unwrap(), "Internal server error");

    let users: Vec<Value> = server.get("/users").send().await.unwrap().json().await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn test_missing_fields_are_reported_together() {
    let server = TestServer::in_memory().await;

    let resp = server
        .post_json("/register", &json!({"name": "Ada", "surname": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let error: Value = resp.json().await.unwrap();
    assert_eq!(
        error["error"],
        "Please provide name, surname, email, password, and phoneNumber."
    );
    let fields: Vec<&str> = error["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["surname", "email", "password", "phoneNumber"]);
}
