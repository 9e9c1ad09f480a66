//! Stripe REST client implementation.

use std::sync::Arc;

use orgsite_core::{StripePriceId, StripeProductId};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::StripeError;
use super::form::{FormBuilder, FormPairs};
use super::types::{
    CheckoutSession, CheckoutSessionRequest, ErrorEnvelope, List, Price, PriceParams, Product,
    ProductParams,
};
use crate::config::StripeConfig;

/// Largest page Stripe returns from a list endpoint.
const PRICE_PAGE_SIZE: usize = 100;

/// Client for the Stripe REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: Option<SecretString>,
}

impl StripeClient {
    /// Create a new Stripe client sharing `client`'s pool and timeout.
    #[must_use]
    pub fn new(config: &StripeConfig, client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
                secret_key: config.secret_key.clone(),
            }),
        }
    }

    /// Whether a secret key is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.secret_key.is_some()
    }

    // =========================================================================
    // Checkout Sessions
    // =========================================================================

    /// Create a hosted Checkout Session.
    ///
    /// Not idempotent: every call creates a distinct session.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing, the request fails, or Stripe
    /// rejects the parameters.
    #[instrument(skip(self, request), fields(line_items = request.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeError> {
        self.post("/checkout/sessions", &request.to_form()).await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Find the product whose `metadata[key]` equals `value`.
    ///
    /// Uses the Search API; returns the first match.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn find_product_by_metadata(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<Product>, StripeError> {
        let query = format!("metadata['{key}']:'{value}'");
        let path = format!("/products/search?query={}", urlencoding::encode(&query));
        let list: List<Product> = self.get(&path).await?;
        Ok(list.data.into_iter().next())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn create_product(&self, params: &ProductParams) -> Result<Product, StripeError> {
        self.post("/products", &params.to_form()).await
    }

    /// Update an existing product in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, params), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &StripeProductId,
        params: &ProductParams,
    ) -> Result<Product, StripeError> {
        self.post(&format!("/products/{id}"), &params.to_form()).await
    }

    // =========================================================================
    // Prices
    // =========================================================================

    /// List every active price of a product, following the list cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn list_active_prices(
        &self,
        product: &StripeProductId,
    ) -> Result<Vec<Price>, StripeError> {
        let mut prices = Vec::new();
        let mut starting_after: Option<StripePriceId> = None;

        loop {
            let mut path = format!(
                "/prices?product={}&active=true&limit={PRICE_PAGE_SIZE}",
                urlencoding::encode(product.as_str())
            );
            if let Some(last) = &starting_after {
                path.push_str("&starting_after=");
                path.push_str(&urlencoding::encode(last.as_str()));
            }

            let page: List<Price> = self.get(&path).await?;
            let last = page.data.last().map(|p| p.id.clone());
            prices.extend(page.data);

            match last {
                Some(last) if page.has_more => starting_after = Some(last),
                _ => break,
            }
        }

        debug!(count = prices.len(), "Listed active prices");
        Ok(prices)
    }

    /// Create a price. Stripe prices are immutable once created.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, params), fields(product_id = %params.product, unit_amount = params.unit_amount))]
    pub async fn create_price(&self, params: &PriceParams) -> Result<Price, StripeError> {
        self.post("/prices", &params.to_form()).await
    }

    /// Archive a price so it can no longer be used for new purchases.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(price_id = %id))]
    pub async fn deactivate_price(&self, id: &StripePriceId) -> Result<Price, StripeError> {
        let mut form = FormBuilder::new();
        form.push("active", false);
        self.post(&format!("/prices/{id}"), &form.build()).await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn secret_key(&self) -> Result<&str, StripeError> {
        self.inner
            .secret_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or(StripeError::MissingApiKey)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StripeError> {
        let url = format!("{}{path}", self.inner.api_base);
        debug!(%url, "Stripe GET");

        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(self.secret_key()?)
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: &FormPairs) -> Result<T, StripeError> {
        let url = format!("{}{path}", self.inner.api_base);
        debug!(%url, fields = form.len(), "Stripe POST");

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(self.secret_key()?)
            .form(form)
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StripeError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body).map_or(body, |envelope| {
                let kind = envelope.error.kind.unwrap_or_default();
                let message = envelope.error.message.unwrap_or_default();
                if kind.is_empty() {
                    message
                } else {
                    format!("{kind}: {message}")
                }
            });
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| StripeError::Parse(e.to_string()))
    }
}
