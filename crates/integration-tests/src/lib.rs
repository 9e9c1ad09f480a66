//! Test harness for end-to-end tests of the orgsite server.
//!
//! [`FakeUpstream`] is a single axum server on an ephemeral port that
//! impersonates Stripe (`/stripe`), Printful (`/printful`), the Spotify
//! Accounts service (`/accounts`) and the Spotify Web API (`/spotify`). It
//! records every call it receives so tests can assert on call counts and
//! payloads, and its behavior is scripted through [`Scenario`].
//!
//! [`TestApp`] wires the real router to a fake upstream and drives it with
//! `tower::ServiceExt::oneshot`, without binding a port for the server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orgsite-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes, to_bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use orgsite_server::config::{PrintfulConfig, SiteConfig, SpotifyConfig, StripeConfig};
use orgsite_server::{AppState, app};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

// =============================================================================
// Recorded calls
// =============================================================================

/// One request received by the fake upstream.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub authorization: Option<String>,
    pub form: Vec<(String, String)>,
}

impl RecordedCall {
    /// First form value for `key`.
    #[must_use]
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First query value for `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// Scripted provider state
// =============================================================================

/// A Stripe product held by the fake.
#[derive(Debug, Clone)]
pub struct FakeStripeProduct {
    pub id: String,
    pub name: String,
    pub metadata: BTreeMap<String, String>,
}

/// A Stripe price held by the fake.
#[derive(Debug, Clone)]
pub struct FakeStripePrice {
    pub id: String,
    pub product: String,
    pub unit_amount: i64,
    pub active: bool,
    pub metadata: BTreeMap<String, String>,
}

/// Scripted behavior and state of the fake providers.
#[derive(Debug, Default)]
pub struct Scenario {
    /// Printful product details (`sync_product` + `sync_variants`), in listing order.
    pub printful_products: Vec<Value>,
    /// Printful product ids whose detail request fails with a 500.
    pub printful_failing_ids: HashSet<i64>,
    /// Stripe rejects every checkout session creation.
    pub stripe_checkout_fails: bool,
    /// Stripe rejects product creation for these names.
    pub stripe_failing_product_names: HashSet<String>,
    pub stripe_products: Vec<FakeStripeProduct>,
    pub stripe_prices: Vec<FakeStripePrice>,
    /// Spotify rejects every token request.
    pub spotify_token_fails: bool,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    format!("{prefix}_{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// A Printful product detail payload with one priced variant per entry.
#[must_use]
pub fn printful_product(id: i64, name: &str, variants: &[(i64, &str, Option<&str>)]) -> Value {
    let sync_variants: Vec<Value> = variants
        .iter()
        .map(|(variant_id, size, price)| {
            json!({
                "id": variant_id,
                "name": format!("{name} - Black / {size}"),
                "retail_price": price,
                "currency": "USD",
                "size": size,
                "color": "Black",
                "product": { "name": "Unisex Staple T-Shirt", "image": "https://files.example/blank.png" },
                "files": [{ "type": "preview", "preview_url": format!("https://files.example/{variant_id}.png") }],
            })
        })
        .collect();

    json!({
        "sync_product": {
            "id": id,
            "name": name,
            "variants": variants.len(),
            "synced": variants.len(),
            "thumbnail_url": format!("https://files.example/{id}.png"),
            "is_ignored": false,
        },
        "sync_variants": sync_variants,
    })
}

// =============================================================================
// Fake upstream server
// =============================================================================

#[derive(Clone, Default)]
struct Shared {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    scenario: Arc<Mutex<Scenario>>,
}

/// In-process fake of every provider the server talks to.
pub struct FakeUpstream {
    base_url: String,
    shared: Shared,
}

impl FakeUpstream {
    /// Start the fake on an ephemeral port with the given scenario.
    pub async fn start(scenario: Scenario) -> Self {
        let shared = Shared {
            calls: Arc::default(),
            scenario: Arc::new(Mutex::new(scenario)),
        };

        let router = Router::new().fallback(handle).with_state(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            shared,
        }
    }

    /// Base URL the provider bases are nested under.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared.calls.lock().unwrap().clone()
    }

    /// Calls whose method and path match.
    #[must_use]
    pub fn calls_to(&self, method: &Method, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == *method && c.path == path)
            .collect()
    }

    /// Calls whose path starts with `prefix`.
    #[must_use]
    pub fn calls_under(&self, prefix: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.path.starts_with(prefix))
            .collect()
    }

    /// Inspect the scripted state (e.g. the Stripe prices after a sync).
    pub fn with_scenario<T>(&self, f: impl FnOnce(&mut Scenario) -> T) -> T {
        f(&mut self.shared.scenario.lock().unwrap())
    }
}

async fn handle(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let call = RecordedCall {
        method,
        path: uri.path().to_string(),
        query: url::form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect(),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        form: url::form_urlencoded::parse(&body).into_owned().collect(),
    };
    shared.calls.lock().unwrap().push(call.clone());

    let mut scenario = shared.scenario.lock().unwrap();
    let segments: Vec<&str> = call.path.trim_start_matches('/').split('/').collect();

    match (call.method.as_str(), segments.as_slice()) {
        ("POST", ["stripe", "checkout", "sessions"]) => stripe_checkout(&scenario, &call),
        ("GET", ["stripe", "products", "search"]) => stripe_search(&scenario, &call),
        ("POST", ["stripe", "products"]) => stripe_create_product(&mut scenario, &call),
        ("POST", ["stripe", "products", id]) => stripe_update_product(&mut scenario, id, &call),
        ("GET", ["stripe", "prices"]) => stripe_list_prices(&scenario, &call),
        ("POST", ["stripe", "prices"]) => stripe_create_price(&mut scenario, &call),
        ("POST", ["stripe", "prices", id]) => stripe_update_price(&mut scenario, id),
        ("GET", ["printful", "store", "products"]) => printful_list(&scenario, &call),
        ("GET", ["printful", "store", "products", id]) => printful_detail(&scenario, id),
        ("POST", ["accounts", "api", "token"]) => spotify_token(&scenario, &call),
        ("GET", ["spotify", "playlists", id]) => {
            Json(json!({ "id": id, "name": "Club Mix", "tracks": { "total": 2 } })).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "no fake route").into_response(),
    }
}

fn metadata_of(call: &RecordedCall) -> BTreeMap<String, String> {
    call.form
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix("metadata[")
                .and_then(|rest| rest.strip_suffix(']'))
                .map(|key| (key.to_string(), v.clone()))
        })
        .collect()
}

fn stripe_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "type": "invalid_request_error", "message": message } })),
    )
        .into_response()
}

fn product_json(product: &FakeStripeProduct) -> Value {
    json!({
        "id": product.id,
        "object": "product",
        "name": product.name,
        "active": true,
        "metadata": product.metadata,
    })
}

fn price_json(price: &FakeStripePrice) -> Value {
    json!({
        "id": price.id,
        "object": "price",
        "product": price.product,
        "active": price.active,
        "currency": "usd",
        "unit_amount": price.unit_amount,
        "metadata": price.metadata,
    })
}

/// Stripe's metadata limits: 50 keys, values up to 500 characters.
fn metadata_violation(call: &RecordedCall) -> Option<String> {
    let metadata: Vec<_> = call
        .form
        .iter()
        .filter(|(k, _)| k.starts_with("metadata["))
        .collect();
    if metadata.len() > 50 {
        return Some("Metadata can have at most 50 keys".to_string());
    }
    metadata
        .iter()
        .find(|(_, v)| v.chars().count() > 500)
        .map(|(k, _)| format!("Metadata value for {k} exceeds 500 characters"))
}

fn stripe_checkout(scenario: &Scenario, call: &RecordedCall) -> Response {
    if scenario.stripe_checkout_fails {
        return stripe_error(StatusCode::BAD_REQUEST, "Invalid API Key provided: sk_test_***");
    }
    if let Some(message) = metadata_violation(call) {
        return stripe_error(StatusCode::BAD_REQUEST, &message);
    }
    let id = next_id("cs_test");
    Json(json!({
        "id": id,
        "object": "checkout.session",
        "url": format!("https://checkout.stripe.com/c/pay/{id}"),
    }))
    .into_response()
}

fn stripe_search(scenario: &Scenario, call: &RecordedCall) -> Response {
    // query = metadata['key']:'value'
    let query = call.query_value("query").unwrap_or_default();
    let parsed = query
        .strip_prefix("metadata['")
        .and_then(|rest| rest.split_once("']:'"))
        .map(|(key, value)| (key, value.trim_end_matches('\'')));

    let data: Vec<Value> = parsed
        .map(|(key, value)| {
            scenario
                .stripe_products
                .iter()
                .filter(|p| p.metadata.get(key).map(String::as_str) == Some(value))
                .map(product_json)
                .collect()
        })
        .unwrap_or_default();

    Json(json!({ "object": "search_result", "data": data, "has_more": false })).into_response()
}

fn stripe_create_product(scenario: &mut Scenario, call: &RecordedCall) -> Response {
    let name = call.form_value("name").unwrap_or_default().to_string();
    if scenario.stripe_failing_product_names.contains(&name) {
        return stripe_error(StatusCode::BAD_REQUEST, "Product rejected");
    }
    let product = FakeStripeProduct {
        id: next_id("prod"),
        name,
        metadata: metadata_of(call),
    };
    let body = product_json(&product);
    scenario.stripe_products.push(product);
    Json(body).into_response()
}

fn stripe_update_product(scenario: &mut Scenario, id: &str, call: &RecordedCall) -> Response {
    let Some(product) = scenario.stripe_products.iter_mut().find(|p| p.id == id) else {
        return stripe_error(StatusCode::NOT_FOUND, "No such product");
    };
    if let Some(name) = call.form_value("name") {
        product.name = name.to_string();
    }
    product.metadata.extend(metadata_of(call));
    Json(product_json(product)).into_response()
}

fn stripe_list_prices(scenario: &Scenario, call: &RecordedCall) -> Response {
    let product = call.query_value("product").unwrap_or_default();
    let limit: usize = call
        .query_value("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(10);
    let matching: Vec<&FakeStripePrice> = scenario
        .stripe_prices
        .iter()
        .filter(|p| p.product == product && p.active)
        .collect();
    let start = call
        .query_value("starting_after")
        .and_then(|after| matching.iter().position(|p| p.id == after))
        .map_or(0, |i| i + 1);

    let data: Vec<Value> = matching
        .iter()
        .skip(start)
        .take(limit)
        .copied()
        .map(price_json)
        .collect();
    let has_more = start + data.len() < matching.len();
    Json(json!({ "object": "list", "data": data, "has_more": has_more })).into_response()
}

fn stripe_create_price(scenario: &mut Scenario, call: &RecordedCall) -> Response {
    let price = FakeStripePrice {
        id: next_id("price"),
        product: call.form_value("product").unwrap_or_default().to_string(),
        unit_amount: call
            .form_value("unit_amount")
            .and_then(|a| a.parse().ok())
            .unwrap_or_default(),
        active: true,
        metadata: metadata_of(call),
    };
    let body = price_json(&price);
    scenario.stripe_prices.push(price);
    Json(body).into_response()
}

fn stripe_update_price(scenario: &mut Scenario, id: &str) -> Response {
    let Some(price) = scenario.stripe_prices.iter_mut().find(|p| p.id == id) else {
        return stripe_error(StatusCode::NOT_FOUND, "No such price");
    };
    price.active = false;
    Json(price_json(price)).into_response()
}

fn printful_list(scenario: &Scenario, call: &RecordedCall) -> Response {
    let offset: usize = call
        .query_value("offset")
        .and_then(|o| o.parse().ok())
        .unwrap_or_default();
    let limit: usize = call
        .query_value("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(20);

    let page: Vec<Value> = scenario
        .printful_products
        .iter()
        .skip(offset)
        .take(limit)
        .map(|p| p["sync_product"].clone())
        .collect();

    Json(json!({
        "code": 200,
        "result": page,
        "paging": { "total": scenario.printful_products.len(), "offset": offset, "limit": limit },
    }))
    .into_response()
}

fn printful_detail(scenario: &Scenario, id: &str) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return (StatusCode::BAD_REQUEST, "bad id").into_response();
    };
    if scenario.printful_failing_ids.contains(&id) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "code": 500, "result": "Internal error" })),
        )
            .into_response();
    }

    match scenario
        .printful_products
        .iter()
        .find(|p| p["sync_product"]["id"] == id)
    {
        Some(product) => Json(json!({ "code": 200, "result": product })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "code": 404, "error": { "reason": "NotFound", "message": "Not found" } })),
        )
            .into_response(),
    }
}

fn spotify_token(scenario: &Scenario, call: &RecordedCall) -> Response {
    if scenario.spotify_token_fails {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" })),
        )
            .into_response();
    }

    match call.form_value("grant_type") {
        Some("authorization_code") => Json(json!({
            "access_token": "BQD_user_access",
            "token_type": "Bearer",
            "scope": "streaming user-read-email",
            "expires_in": 3600,
            "refresh_token": "AQA_user_refresh",
        }))
        .into_response(),
        Some("refresh_token" | "client_credentials") => Json(json!({
            "access_token": "BQD_fresh_access",
            "token_type": "Bearer",
            "expires_in": 3600,
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response(),
    }
}

// =============================================================================
// App under test
// =============================================================================

/// Configuration with every integration enabled and pointed at `upstream`.
#[must_use]
pub fn config_for(upstream: &str) -> SiteConfig {
    SiteConfig {
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: Some("https://club.example.edu".to_string()),
        upstream_timeout: Duration::from_secs(5),
        sync_concurrency: 1,
        stripe: StripeConfig {
            secret_key: Some(SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc")),
            publishable_key: Some("pk_test_TYooMQauvdEDq54NiTphI7jx".to_string()),
            api_base: format!("{upstream}/stripe"),
        },
        printful: PrintfulConfig {
            api_key: Some(SecretString::from("pf_9Kq2xLm4Rt7Vb1Nc")),
            api_base: format!("{upstream}/printful"),
        },
        spotify: SpotifyConfig {
            client_id: Some("spotify-client-id".to_string()),
            client_secret: Some(SecretString::from("s3cr3t-Sp0t1fy")),
            redirect_uri: Some("https://club.example.edu/api/spotify/callback".to_string()),
            accounts_base: format!("{upstream}/accounts"),
            api_base: format!("{upstream}/spotify"),
        },
        sentry_dsn: None,
        sentry_environment: None,
        json_logs: false,
    }
}

/// A response collected from the app under test.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> &str {
        self.headers["location"].to_str().unwrap()
    }
}

/// The real router wired to a fake upstream.
pub struct TestApp {
    pub upstream: FakeUpstream,
    router: Router,
}

impl TestApp {
    /// Start a fake upstream and build the app with the default configuration.
    pub async fn start(scenario: Scenario) -> Self {
        Self::start_with(scenario, |_| {}).await
    }

    /// Like [`TestApp::start`], with a hook to adjust the configuration.
    pub async fn start_with(scenario: Scenario, configure: impl FnOnce(&mut SiteConfig)) -> Self {
        let upstream = FakeUpstream::start(scenario).await;
        let mut config = config_for(upstream.base_url());
        configure(&mut config);
        let router = app(AppState::new(config).unwrap());
        Self { upstream, router }
    }

    /// Send a request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str) -> TestResponse {
        self.send(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Parse a redirect target's query string into a map.
#[must_use]
pub fn query_params(location: &str) -> HashMap<String, String> {
    url::Url::parse(location)
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}
