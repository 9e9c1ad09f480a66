//! End-to-end tests for the `/sync-products` routes.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashSet};

use axum::http::{Method, StatusCode};
use orgsite_integration_tests::{FakeStripePrice, FakeStripeProduct, Scenario, TestApp, printful_product};

fn catalog() -> Vec<serde_json::Value> {
    vec![
        printful_product(301, "Club Tee", &[(9001, "M", Some("25.00")), (9002, "L", Some("27.00"))]),
        printful_product(302, "Club Mug", &[(9101, "11oz", Some("15.50"))]),
    ]
}

fn scenario() -> Scenario {
    Scenario {
        printful_products: catalog(),
        ..Scenario::default()
    }
}

// =============================================================================
// Catalog reads
// =============================================================================

#[tokio::test]
async fn test_catalog_lists_then_fetches_each_product() {
    let app = TestApp::start(scenario()).await;

    let response = app.get("/sync-products").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["name"], "Club Tee");
    assert_eq!(products[0]["price"], 25.0);
    assert_eq!(products[0]["variants"].as_array().unwrap().len(), 2);

    let calls = app.upstream.calls_under("/printful");
    let paths: Vec<_> = calls.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(
        paths,
        ["/printful/store/products", "/printful/store/products/301", "/printful/store/products/302"]
    );
    assert_eq!(
        calls[0].authorization.as_deref(),
        Some("Bearer pf_9Kq2xLm4Rt7Vb1Nc")
    );
}

#[tokio::test]
async fn test_catalog_follows_pagination() {
    let products = (1..=150)
        .map(|id| printful_product(id, &format!("Design {id}"), &[(id * 100, "M", Some("20.00"))]))
        .collect();
    let app = TestApp::start(Scenario {
        printful_products: products,
        ..Scenario::default()
    })
    .await;

    let response = app.get("/sync-products").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["products"].as_array().unwrap().len(), 150);

    let pages = app.upstream.calls_to(&Method::GET, "/printful/store/products");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].query_value("offset"), Some("0"));
    assert_eq!(pages[1].query_value("offset"), Some("100"));
}

#[tokio::test]
async fn test_catalog_detail_failure_fails_whole_call() {
    let app = TestApp::start(Scenario {
        printful_failing_ids: HashSet::from([302]),
        ..scenario()
    })
    .await;

    let response = app.get("/sync-products").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert!(body.get("products").is_none());
    assert_eq!(body["details"]["provider"], "printful");
}

#[tokio::test]
async fn test_product_detail() {
    let app = TestApp::start(scenario()).await;

    let response = app.get("/sync-products/302").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["sync_product"]["name"], "Club Mug");
    assert_eq!(body["sync_variants"][0]["retail_price"], "15.50");
}

#[tokio::test]
async fn test_product_detail_rejects_non_integer_id() {
    let app = TestApp::start(scenario()).await;

    let response = app.get("/sync-products/club-tee").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.upstream.calls().is_empty());
}

#[tokio::test]
async fn test_retail_price() {
    let app = TestApp::start(scenario()).await;

    let response = app.get("/sync-products/price?productId=301").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["price"], 25.0);
}

#[tokio::test]
async fn test_retail_price_unavailable_is_not_zero() {
    let app = TestApp::start(Scenario {
        printful_products: vec![printful_product(303, "Club Poster", &[(9201, "A2", None)])],
        ..Scenario::default()
    })
    .await;

    let response = app.get("/sync-products/price?productId=303").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert!(body.get("price").is_none());
    assert_eq!(body["details"]["productId"], 303);
}

#[tokio::test]
async fn test_retail_price_requires_product_id() {
    let app = TestApp::start(scenario()).await;

    let response = app.get("/sync-products/price").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "productId is required");
    assert!(app.upstream.calls().is_empty());
}

// =============================================================================
// Stripe mirror
// =============================================================================

#[tokio::test]
async fn test_sync_without_printful_key_makes_no_calls() {
    let app = TestApp::start_with(scenario(), |c| c.printful.api_key = None).await;

    let response = app.post("/sync-products").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "PRINTFUL_API_KEY is not configured");
    assert!(app.upstream.calls().is_empty());
}

#[tokio::test]
async fn test_sync_without_stripe_key_makes_no_calls() {
    let app = TestApp::start_with(scenario(), |c| c.stripe.secret_key = None).await;

    let response = app.post("/sync-products").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.upstream.calls().is_empty());
}

#[tokio::test]
async fn test_sync_creates_products_and_prices() {
    let app = TestApp::start(scenario()).await;

    let response = app.post("/sync-products").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Synced 2 of 2 products");

    let outcomes = body["products"].as_array().unwrap();
    assert_eq!(outcomes[0]["printfulId"], 301);
    assert_eq!(outcomes[1]["printfulId"], 302);
    assert!(outcomes[0]["stripeProductId"].as_str().unwrap().starts_with("prod_"));
    assert!(outcomes[0]["stripePriceId"].as_str().unwrap().starts_with("price_"));
    assert_eq!(outcomes[0]["variants"].as_array().unwrap().len(), 2);
    assert!(outcomes[0].get("error").is_none());

    // 2 products + 3 variants, each with its own Stripe product and price.
    app.upstream.with_scenario(|s| {
        assert_eq!(s.stripe_products.len(), 5);
        assert_eq!(s.stripe_prices.len(), 5);

        let tee = s
            .stripe_products
            .iter()
            .find(|p| p.metadata.get("printful_product_id").map(String::as_str) == Some("301")
                && !p.metadata.contains_key("printful_variant_id"))
            .unwrap();
        assert_eq!(tee.name, "Club Tee");

        let large = s
            .stripe_products
            .iter()
            .find(|p| p.metadata.get("printful_variant_id").map(String::as_str) == Some("9002"))
            .unwrap();
        assert_eq!(large.name, "Club Tee - Black / L");
        let large_price = s.stripe_prices.iter().find(|p| p.product == large.id).unwrap();
        assert_eq!(large_price.unit_amount, 2700);
    });
}

#[tokio::test]
async fn test_sync_is_repeatable_without_duplicates() {
    let app = TestApp::start(scenario()).await;

    let first = app.post("/sync-products").await.json();
    let second = app.post("/sync-products").await.json();

    assert_eq!(first["products"], second["products"]);
    app.upstream.with_scenario(|s| {
        assert_eq!(s.stripe_products.len(), 5);
        assert_eq!(s.stripe_prices.len(), 5);
    });
}

#[tokio::test]
async fn test_sync_replaces_stale_price() {
    let stale_metadata = BTreeMap::from([("printful_product_id".to_string(), "302".to_string())]);
    let app = TestApp::start(Scenario {
        printful_products: vec![printful_product(302, "Club Mug", &[(9101, "11oz", Some("15.50"))])],
        stripe_products: vec![FakeStripeProduct {
            id: "prod_existing_mug".into(),
            name: "Old Mug".into(),
            metadata: stale_metadata.clone(),
        }],
        stripe_prices: vec![FakeStripePrice {
            id: "price_old_mug".into(),
            product: "prod_existing_mug".into(),
            unit_amount: 1200,
            active: true,
            metadata: stale_metadata,
        }],
        ..Scenario::default()
    })
    .await;

    let body = app.post("/sync-products").await.json();

    let outcome = &body["products"][0];
    assert_eq!(outcome["stripeProductId"], "prod_existing_mug");
    assert_ne!(outcome["stripePriceId"], "price_old_mug");

    assert_eq!(
        app.upstream
            .calls_to(&Method::POST, "/stripe/products/prod_existing_mug")
            .len(),
        1
    );
    let archive = app.upstream.calls_to(&Method::POST, "/stripe/prices/price_old_mug");
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].form_value("active"), Some("false"));

    app.upstream.with_scenario(|s| {
        let mug = s.stripe_products.iter().find(|p| p.id == "prod_existing_mug").unwrap();
        assert_eq!(mug.name, "Club Mug");
        let active: Vec<_> = s
            .stripe_prices
            .iter()
            .filter(|p| p.product == "prod_existing_mug" && p.active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].unit_amount, 1550);
    });
}

#[tokio::test]
async fn test_sync_archives_stale_prices_across_pages() {
    let stale_metadata = BTreeMap::from([("printful_product_id".to_string(), "302".to_string())]);
    let stale_prices: Vec<FakeStripePrice> = (0..150)
        .map(|i| FakeStripePrice {
            id: format!("price_old_mug_{i:03}"),
            product: "prod_existing_mug".into(),
            unit_amount: 1000 + i,
            active: true,
            metadata: stale_metadata.clone(),
        })
        .collect();
    let app = TestApp::start(Scenario {
        printful_products: vec![printful_product(302, "Club Mug", &[(9101, "11oz", Some("15.50"))])],
        stripe_products: vec![FakeStripeProduct {
            id: "prod_existing_mug".into(),
            name: "Club Mug".into(),
            metadata: stale_metadata,
        }],
        stripe_prices: stale_prices,
        ..Scenario::default()
    })
    .await;

    let body = app.post("/sync-products").await.json();
    assert_eq!(body["message"], "Synced 1 of 1 products");

    let listings: Vec<_> = app
        .upstream
        .calls_to(&Method::GET, "/stripe/prices")
        .into_iter()
        .filter(|c| c.query_value("product") == Some("prod_existing_mug"))
        .collect();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].query_value("starting_after"), None);
    assert_eq!(listings[1].query_value("starting_after"), Some("price_old_mug_099"));

    app.upstream.with_scenario(|s| {
        let active: Vec<_> = s
            .stripe_prices
            .iter()
            .filter(|p| p.product == "prod_existing_mug" && p.active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].unit_amount, 1550);
    });
}

#[tokio::test]
async fn test_sync_is_best_effort_per_product() {
    let app = TestApp::start(Scenario {
        stripe_failing_product_names: HashSet::from(["Club Tee".to_string()]),
        ..scenario()
    })
    .await;

    let response = app.post("/sync-products").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["message"], "Synced 1 of 2 products");

    let outcomes = body["products"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["printfulId"], 301);
    assert!(outcomes[0]["error"].is_string());
    assert!(outcomes[0]["stripeProductId"].is_null());
    assert_eq!(outcomes[1]["printfulId"], 302);
    assert!(outcomes[1].get("error").is_none());
}

#[tokio::test]
async fn test_concurrent_sync_keeps_catalog_order() {
    let products = (1..=6)
        .map(|id| printful_product(id, &format!("Design {id}"), &[(id * 100, "M", Some("20.00"))]))
        .collect();
    let app = TestApp::start_with(
        Scenario {
            printful_products: products,
            ..Scenario::default()
        },
        |c| c.sync_concurrency = 3,
    )
    .await;

    let body = app.post("/sync-products").await.json();

    let ids: Vec<_> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["printfulId"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [1, 2, 3, 4, 5, 6]);
    assert_eq!(body["message"], "Synced 6 of 6 products");
}
