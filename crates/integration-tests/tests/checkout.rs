//! End-to-end tests for `POST /checkout`.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use orgsite_integration_tests::{Scenario, TestApp};
use serde_json::{Value, json};

const SESSIONS: &str = "/stripe/checkout/sessions";

fn cart() -> Value {
    json!({
        "items": [
            { "id": "tee-m", "name": "Club Tee", "price": 19.99, "image": "https://img.example/tee.png",
              "quantity": 2, "stripePriceId": "price_synced_tee" },
            { "id": "sticker", "name": "Sticker Pack", "price": 4.5, "quantity": 1 }
        ],
        "customerEmail": "member@club.example.edu"
    })
}

#[tokio::test]
async fn test_checkout_creates_one_session() {
    let app = TestApp::start(Scenario::default()).await;

    let response = app.post_json("/checkout", &cart()).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert!(body["sessionId"].as_str().unwrap().starts_with("cs_test_"));
    assert!(body["url"].as_str().unwrap().starts_with("https://checkout.stripe.com/"));

    let calls = app.upstream.calls_to(&Method::POST, SESSIONS);
    assert_eq!(calls.len(), 1);
    assert_eq!(app.upstream.calls().len(), 1);
    assert_eq!(
        calls[0].authorization.as_deref(),
        Some("Bearer sk_test_4eC39HqLyjWDarjtT1zdp7dc")
    );
}

#[tokio::test]
async fn test_checkout_session_payload() {
    let app = TestApp::start(Scenario::default()).await;
    app.post_json("/checkout", &cart()).await;

    let call = &app.upstream.calls_to(&Method::POST, SESSIONS)[0];

    // Synced item references its price, no inline descriptor.
    assert_eq!(call.form_value("line_items[0][price]"), Some("price_synced_tee"));
    assert_eq!(call.form_value("line_items[0][quantity]"), Some("2"));
    assert!(call.form_value("line_items[0][price_data][currency]").is_none());

    // Unsynced item is priced inline in cents.
    assert_eq!(call.form_value("line_items[1][price_data][currency]"), Some("usd"));
    assert_eq!(call.form_value("line_items[1][price_data][unit_amount]"), Some("450"));
    assert_eq!(
        call.form_value("line_items[1][price_data][product_data][name]"),
        Some("Sticker Pack")
    );
    assert!(call.form_value("line_items[1][price]").is_none());

    assert_eq!(call.form_value("payment_method_types[0]"), Some("card"));
    assert_eq!(call.form_value("mode"), Some("payment"));
    assert_eq!(call.form_value("customer_email"), Some("member@club.example.edu"));
    assert_eq!(call.form_value("billing_address_collection"), Some("required"));
    assert_eq!(call.form_value("customer_creation"), Some("always"));
    assert_eq!(call.form_value("phone_number_collection[enabled]"), Some("true"));
    assert_eq!(
        call.form_value("shipping_address_collection[allowed_countries][0]"),
        Some("US")
    );
    assert_eq!(
        call.form_value("success_url"),
        Some("https://club.example.edu/checkout/success?session_id={CHECKOUT_SESSION_ID}")
    );
    assert_eq!(call.form_value("cancel_url"), Some("https://club.example.edu/cart"));

    assert_eq!(call.form_value("metadata[item_count]"), Some("2"));
    let items: Value = serde_json::from_str(call.form_value("metadata[items_0]").unwrap()).unwrap();
    assert_eq!(items[0]["id"], "tee-m");
    assert_eq!(items[0]["priceId"], "price_synced_tee");
    assert_eq!(items[1]["quantity"], 1);
}

#[tokio::test]
async fn test_large_synced_cart_fits_session_metadata() {
    let app = TestApp::start(Scenario::default()).await;
    let items: Vec<Value> = (0..12)
        .map(|i| {
            json!({ "id": format!("org-hoodie-{i:03}"), "name": "Club Hoodie", "price": 45,
                    "quantity": 1, "stripePriceId": format!("price_1PqR7sLkdIwHu7ix{i:06}") })
        })
        .collect();
    let body = json!({ "items": items, "customerEmail": "member@club.example.edu" });

    let response = app.post_json("/checkout", &body).await;

    assert_eq!(response.status, StatusCode::OK);
    let call = &app.upstream.calls_to(&Method::POST, SESSIONS)[0];
    assert_eq!(call.form_value("metadata[item_count]"), Some("12"));

    let mut ids = Vec::new();
    for chunk in (0..).map_while(|i| call.form_value(&format!("metadata[items_{i}]"))) {
        assert!(chunk.chars().count() <= 500);
        let entries: Vec<Value> = serde_json::from_str(chunk).unwrap();
        ids.extend(entries.into_iter().map(|e| e["id"].as_str().unwrap().to_string()));
    }
    assert_eq!(ids.len(), 12);
    assert_eq!(ids[11], "org-hoodie-011");
}

#[tokio::test]
async fn test_checkout_rounds_to_nearest_cent() {
    let app = TestApp::start(Scenario::default()).await;
    let body = json!({
        "items": [{ "id": "a", "name": "A", "price": 19.99, "quantity": 1 },
                  { "id": "b", "name": "B", "price": 5, "quantity": 1 },
                  { "id": "c", "name": "C", "price": 0.005, "quantity": 1 }],
        "customerEmail": "a@b.com"
    });

    app.post_json("/checkout", &body).await;

    let call = &app.upstream.calls_to(&Method::POST, SESSIONS)[0];
    assert_eq!(call.form_value("line_items[0][price_data][unit_amount]"), Some("1999"));
    assert_eq!(call.form_value("line_items[1][price_data][unit_amount]"), Some("500"));
    assert_eq!(call.form_value("line_items[2][price_data][unit_amount]"), Some("1"));
}

#[tokio::test]
async fn test_identical_requests_create_distinct_sessions() {
    let app = TestApp::start(Scenario::default()).await;

    let first = app.post_json("/checkout", &cart()).await.json();
    let second = app.post_json("/checkout", &cart()).await.json();

    assert_ne!(first["sessionId"], second["sessionId"]);
    assert_eq!(app.upstream.calls_to(&Method::POST, SESSIONS).len(), 2);
}

#[tokio::test]
async fn test_empty_cart_is_rejected_without_calls() {
    let app = TestApp::start(Scenario::default()).await;

    let response = app
        .post_json("/checkout", &json!({ "items": [], "customerEmail": "a@b.com" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
    assert!(app.upstream.calls().is_empty());
}

#[tokio::test]
async fn test_blank_email_is_rejected_without_calls() {
    let app = TestApp::start(Scenario::default()).await;
    let mut body = cart();
    body["customerEmail"] = json!("   ");

    let response = app.post_json("/checkout", &body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.upstream.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_a_client_error() {
    let app = TestApp::start(Scenario::default()).await;

    let response = app.post_json("/checkout", &json!({ "items": "nope" })).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
    assert!(app.upstream.calls().is_empty());
}

#[tokio::test]
async fn test_missing_secret_key_is_server_error_without_calls() {
    let app = TestApp::start_with(Scenario::default(), |c| c.stripe.secret_key = None).await;

    let response = app.post_json("/checkout", &cart()).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "STRIPE_SECRET_KEY is not configured");
    assert!(app.upstream.calls().is_empty());
}

#[tokio::test]
async fn test_stripe_failure_is_upstream_error_without_retry() {
    let app = TestApp::start(Scenario {
        stripe_checkout_fails: true,
        ..Scenario::default()
    })
    .await;

    let response = app.post_json("/checkout", &cart()).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["details"]["operation"], "create_checkout_session");
    assert!(!body.to_string().contains("sk_test"));
    assert_eq!(app.upstream.calls_to(&Method::POST, SESSIONS).len(), 1);
}
