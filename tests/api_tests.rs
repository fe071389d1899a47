//! API integration tests
//!
//! These run against a live server with a seeded database: users 1 and 2 and
//! stock copies 10 and 11 must exist, with no open loans or penalties.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle() {
    let client = Client::new();

    // Borrow copy 10 with a known loan date and no due date: the 14-day
    // default applies.
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": 1,
            "stock_copy_id": 10,
            "loaned_on": "2024-01-01"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["due_on"], "2024-01-15");
    assert_eq!(loan["returned_on"], Value::Null);
    let loan_id = loan["id"].as_i64().expect("No loan id");

    // The copy is no longer available.
    let response = client
        .get(format!("{}/stock-copies/10/availability", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], false);

    // A second borrower conflicts.
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": 2,
            "stock_copy_id": 10
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);

    // Return five days late: the loan closes and a five-day penalty appears.
    let response = client
        .post(format!(
            "{}/loans/{}/return?returned_on=2024-01-20",
            BASE_URL, loan_id
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["returned_on"], "2024-01-20");

    let response = client
        .get(format!("{}/users/1/penalties", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    let penalties: Value = response.json().await.expect("Failed to parse response");
    let penalty = penalties
        .as_array()
        .and_then(|list| {
            list.iter()
                .find(|p| p["loan_id"].as_i64() == Some(loan_id))
        })
        .expect("No penalty for the late return");
    assert_eq!(penalty["ends_on"], "2024-01-25");

    // Returning again conflicts.
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_unknown_references_are_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": 999999,
            "stock_copy_id": 10
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": 1,
            "stock_copy_id": 999999
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);

    let response = client
        .get(format!("{}/stock-copies/999999/availability", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_loan_listings() {
    let client = Client::new();

    let response = client
        .get(format!("{}/loans/report", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let report: Value = response.json().await.expect("Failed to parse response");
    assert!(report["total"].is_i64());

    let response = client
        .get(format!("{}/loans/open", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/loans/overdue", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}
