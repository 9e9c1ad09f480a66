//! Checkout orchestration.
//!
//! Validates the cart, maps each line to a Stripe line item and creates one
//! hosted Checkout Session. There is no retry: a failed creation surfaces as
//! an upstream error and leaves nothing behind to roll back.

use std::collections::BTreeMap;

use orgsite_core::{
    CartLineItem, CheckoutRequest, CheckoutResult, CurrencyCode, PriceError, ValidatedCheckout,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::config::{MissingConfig, SiteConfig};
use crate::error::{AppError, Result};
use crate::stripe::{
    CheckoutMode, CheckoutSessionRequest, LineItemPrice, PriceData, SessionLineItem, StripeClient,
    StripeError,
};

/// Countries the hosted page accepts shipping addresses for.
pub const ALLOWED_SHIPPING_COUNTRIES: &[&str] = &["US", "CA"];

const OPERATION: &str = "create_checkout_session";

/// Map a cart line to a Stripe line item.
///
/// A synced item references its catalog price; anything else is priced
/// inline from the cart's decimal price.
///
/// # Errors
///
/// Returns an error if the inline price cannot be expressed in cents.
pub fn line_item_for(item: &CartLineItem) -> std::result::Result<SessionLineItem, PriceError> {
    let price = match &item.stripe_price_id {
        Some(price_id) => LineItemPrice::Existing(price_id.clone()),
        None => LineItemPrice::Inline(PriceData {
            currency: CurrencyCode::USD,
            unit_amount: item.unit_price().to_minor_units()?,
            product_name: item.name.clone(),
            product_images: item.image.iter().cloned().collect(),
        }),
    };

    Ok(SessionLineItem {
        price,
        quantity: item.quantity,
    })
}

/// Longest value Stripe accepts for one metadata entry, in characters.
pub const METADATA_VALUE_LIMIT: usize = 500;

/// Most metadata entries Stripe accepts on one object.
pub const METADATA_KEY_LIMIT: usize = 50;

/// Error building session parameters from a validated cart.
#[derive(Debug, thiserror::Error)]
pub enum SessionBuildError {
    #[error("Invalid item price: {0}")]
    Price(#[from] PriceError),
    #[error("Item {0} is too long to record on the order")]
    SummaryEntryTooLong(String),
    #[error("Cart has too many items to record on the order")]
    TooManyItems,
}

/// Split the `{id, quantity, priceId}` summary of every line into JSON
/// arrays that each fit in one metadata value.
///
/// Entries are never split, so every chunk parses on its own and the
/// concatenation of all chunks lists the cart in order.
///
/// # Errors
///
/// Returns an error if a single entry exceeds the value limit or the cart
/// needs more chunks than the remaining metadata keys allow.
pub fn item_summary_chunks(
    items: &[CartLineItem],
) -> std::result::Result<Vec<String>, SessionBuildError> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    // Opening and closing brackets.
    let mut current_len = 2;

    for item in items {
        let entry = json!({
            "id": item.id,
            "quantity": item.quantity,
            "priceId": item.stripe_price_id,
        })
        .to_string();
        let entry_len = entry.chars().count();

        if !current.is_empty() && current_len + 1 + entry_len > METADATA_VALUE_LIMIT {
            chunks.push(format!("[{}]", current.join(",")));
            current.clear();
            current_len = 2;
        }

        let separator = usize::from(!current.is_empty());
        if current_len + separator + entry_len > METADATA_VALUE_LIMIT {
            return Err(SessionBuildError::SummaryEntryTooLong(item.id.clone()));
        }
        current_len += separator + entry_len;
        current.push(entry);
    }
    if !current.is_empty() {
        chunks.push(format!("[{}]", current.join(",")));
    }

    // One key is reserved for `item_count`.
    if chunks.len() >= METADATA_KEY_LIMIT {
        return Err(SessionBuildError::TooManyItems);
    }
    Ok(chunks)
}

/// Build the session parameters for a validated cart.
///
/// The line summary is stored as `metadata[items_0]`, `metadata[items_1]`,
/// ... alongside `metadata[item_count]`.
///
/// # Errors
///
/// Returns an error if any inline price cannot be expressed in cents or the
/// line summary does not fit in Stripe metadata.
pub fn build_session_request(
    checkout: &ValidatedCheckout,
    base_url: &str,
) -> std::result::Result<CheckoutSessionRequest, SessionBuildError> {
    let line_items = checkout
        .items()
        .iter()
        .map(line_item_for)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut metadata: BTreeMap<String, String> = item_summary_chunks(checkout.items())?
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| (format!("items_{i}"), chunk))
        .collect();
    metadata.insert("item_count".to_string(), checkout.items().len().to_string());

    Ok(CheckoutSessionRequest {
        payment_method_types: vec!["card"],
        line_items,
        mode: CheckoutMode::Payment,
        success_url: format!("{base_url}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{base_url}/cart"),
        customer_email: checkout.customer_email().to_string(),
        billing_address_required: true,
        allowed_shipping_countries: ALLOWED_SHIPPING_COUNTRIES.to_vec(),
        always_create_customer: true,
        collect_phone_number: true,
        metadata,
    })
}

/// Validate the cart and create a hosted Checkout Session for it.
///
/// # Errors
///
/// - [`AppError::Validation`] for an empty cart, blank email or bad line
/// - [`AppError::Configuration`] if the Stripe key or base URL is unset
/// - [`AppError::Upstream`] if Stripe rejects or fails the request
#[instrument(skip_all, fields(items = request.items.len()))]
pub async fn create_checkout_session(
    stripe: &StripeClient,
    config: &SiteConfig,
    request: CheckoutRequest,
) -> Result<CheckoutResult> {
    let checkout = request.validate()?;

    if !stripe.is_configured() {
        return Err(MissingConfig::StripeSecretKey.into());
    }
    let base_url = config.require_base_url()?;

    let session_request = build_session_request(&checkout, base_url)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let session = stripe
        .create_checkout_session(&session_request)
        .await
        .map_err(|e| AppError::upstream(OPERATION, e))?;

    let url = session.url.ok_or_else(|| {
        AppError::upstream(
            OPERATION,
            StripeError::Parse("checkout session has no url".to_string()),
        )
    })?;

    info!(session_id = %session.id, "Created checkout session");

    Ok(CheckoutResult {
        session_id: session.id,
        url,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use orgsite_core::StripePriceId;

    use crate::config::test_support::config_with_upstream;
    use crate::stripe::form::value_of;

    fn item(id: &str, price: &str, price_id: Option<&str>) -> CartLineItem {
        CartLineItem {
            id: id.into(),
            name: format!("Item {id}"),
            price: price.parse().unwrap(),
            image: Some(format!("https://img.example/{id}.png")),
            quantity: 2,
            stripe_price_id: price_id.map(StripePriceId::new),
        }
    }

    fn checkout(items: Vec<CartLineItem>) -> ValidatedCheckout {
        CheckoutRequest {
            items,
            customer_email: " member@club.example.edu ".into(),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_line_item_with_price_reference() {
        let line = line_item_for(&item("a", "10.00", Some("price_abc"))).unwrap();
        assert_eq!(
            line.price,
            LineItemPrice::Existing(StripePriceId::new("price_abc"))
        );
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn test_line_item_inline_rounds_to_cents() {
        let line = line_item_for(&item("b", "19.99", None)).unwrap();
        let LineItemPrice::Inline(data) = line.price else {
            panic!("expected inline price");
        };
        assert_eq!(data.unit_amount, 1999);
        assert_eq!(data.currency, CurrencyCode::USD);
        assert_eq!(data.product_name, "Item b");
        assert_eq!(data.product_images, vec!["https://img.example/b.png"]);
    }

    #[test]
    fn test_line_item_without_image() {
        let mut cart_item = item("c", "5", None);
        cart_item.image = None;
        let LineItemPrice::Inline(data) = line_item_for(&cart_item).unwrap().price else {
            panic!("expected inline price");
        };
        assert_eq!(data.unit_amount, 500);
        assert!(data.product_images.is_empty());
    }

    #[test]
    fn test_session_request_urls_and_metadata() {
        let request = build_session_request(
            &checkout(vec![item("a", "10", Some("price_a")), item("b", "2.5", None)]),
            "https://club.example.edu",
        )
        .unwrap();

        assert_eq!(
            request.success_url,
            "https://club.example.edu/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.cancel_url, "https://club.example.edu/cart");
        assert_eq!(request.customer_email, "member@club.example.edu");
        assert_eq!(request.metadata["item_count"], "2");
        assert!(!request.metadata.contains_key("items_1"));

        let items: serde_json::Value =
            serde_json::from_str(&request.metadata["items_0"]).unwrap();
        assert_eq!(items[0]["id"], "a");
        assert_eq!(items[0]["priceId"], "price_a");
        assert_eq!(items[1]["quantity"], 2);
        assert!(items[1]["priceId"].is_null());

        let form = request.to_form();
        assert_eq!(
            value_of(&form, "shipping_address_collection[allowed_countries][0]"),
            Some("US")
        );
    }

    fn synced_cart(len: usize) -> Vec<CartLineItem> {
        (0..len)
            .map(|i| {
                item(
                    &format!("org-hoodie-{i:03}"),
                    "45.00",
                    Some(format!("price_1PqR7sLkdIwHu7ix{i:06}").as_str()),
                )
            })
            .collect()
    }

    #[test]
    fn test_metadata_values_fit_stripe_limits() {
        for len in [8, 60] {
            let request =
                build_session_request(&checkout(synced_cart(len)), "https://club.example.edu")
                    .unwrap();

            assert!(request.metadata.len() <= METADATA_KEY_LIMIT);
            assert!(
                request
                    .metadata
                    .values()
                    .all(|v| v.chars().count() <= METADATA_VALUE_LIMIT)
            );

            let mut ids = Vec::new();
            for i in 0.. {
                let Some(chunk) = request.metadata.get(&format!("items_{i}")) else {
                    break;
                };
                let entries: Vec<serde_json::Value> = serde_json::from_str(chunk).unwrap();
                ids.extend(entries.into_iter().map(|e| e["id"].as_str().unwrap().to_string()));
            }
            assert_eq!(ids.len(), len);
            assert_eq!(ids[0], "org-hoodie-000");
            assert_eq!(ids[len - 1], format!("org-hoodie-{:03}", len - 1));
            assert_eq!(request.metadata["item_count"], len.to_string());
        }
    }

    #[test]
    fn test_eight_synced_items_need_more_than_one_chunk() {
        let chunks = item_summary_chunks(&synced_cart(8)).unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_oversized_cart_rejected() {
        let result = item_summary_chunks(&synced_cart(500));
        assert!(matches!(result, Err(SessionBuildError::TooManyItems)));
    }

    #[test]
    fn test_oversized_entry_rejected() {
        let long_id = "x".repeat(METADATA_VALUE_LIMIT);
        let result = item_summary_chunks(&[item(&long_id, "1", None)]);
        assert!(matches!(result, Err(SessionBuildError::SummaryEntryTooLong(id)) if id == long_id));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_before_any_call() {
        // Unroutable upstream: a call would fail as Upstream, not Validation.
        let config = config_with_upstream("http://127.0.0.1:9");
        let stripe = StripeClient::new(&config.stripe, reqwest::Client::new());

        let err = create_checkout_session(
            &stripe,
            &config,
            CheckoutRequest {
                items: vec![],
                customer_email: "a@b.com".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let mut config = config_with_upstream("http://127.0.0.1:9");
        config.stripe.secret_key = None;
        let stripe = StripeClient::new(&config.stripe, reqwest::Client::new());

        let err = create_checkout_session(
            &stripe,
            &config,
            CheckoutRequest {
                items: vec![item("a", "1", None)],
                customer_email: "a@b.com".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Configuration(MissingConfig::StripeSecretKey)
        ));
    }

    #[tokio::test]
    async fn test_missing_base_url_is_configuration_error() {
        let mut config = config_with_upstream("http://127.0.0.1:9");
        config.base_url = None;
        let stripe = StripeClient::new(&config.stripe, reqwest::Client::new());

        let err = create_checkout_session(
            &stripe,
            &config,
            CheckoutRequest {
                items: vec![item("a", "1", None)],
                customer_email: "a@b.com".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(MissingConfig::BaseUrl)));
    }
}
