//! Printful REST client implementation.

use std::sync::Arc;

use orgsite_core::PrintfulProductId;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::PrintfulError;
use super::types::{Envelope, ErrorEnvelope, ProductDetail, SyncProduct};
use crate::config::PrintfulConfig;

/// Page size for the store product listing (Printful's maximum).
const PAGE_LIMIT: usize = 100;

/// Client for the Printful API.
#[derive(Clone)]
pub struct PrintfulClient {
    inner: Arc<PrintfulClientInner>,
}

struct PrintfulClientInner {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<SecretString>,
}

impl PrintfulClient {
    /// Create a new Printful client sharing `client`'s pool and timeout.
    #[must_use]
    pub fn new(config: &PrintfulConfig, client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(PrintfulClientInner {
                client,
                api_base: config.api_base.clone(),
                api_key: config.api_key.clone(),
            }),
        }
    }

    /// Whether an API key is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.api_key.is_some()
    }

    /// List every store product, following pagination to the end.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self))]
    pub async fn list_store_products(&self) -> Result<Vec<SyncProduct>, PrintfulError> {
        let mut products = Vec::new();
        let mut offset = 0;

        loop {
            let path = format!("/store/products?offset={offset}&limit={PAGE_LIMIT}");
            let page: Envelope<Vec<SyncProduct>> = self.get(&path).await?;
            let fetched = page.result.len();
            products.extend(page.result);

            // A missing paging block means the response is complete.
            let Some(paging) = page.paging else { break };
            offset = paging.offset + fetched;
            if fetched == 0 || offset >= paging.total {
                break;
            }
        }

        debug!(count = products.len(), "Listed Printful store products");
        Ok(products)
    }

    /// Fetch a store product with all of its sync variants.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_store_product(
        &self,
        id: PrintfulProductId,
    ) -> Result<ProductDetail, PrintfulError> {
        let envelope: Envelope<ProductDetail> =
            self.get(&format!("/store/products/{id}")).await?;
        Ok(envelope.result)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PrintfulError> {
        let api_key = self
            .inner
            .api_key
            .as_ref()
            .ok_or(PrintfulError::MissingApiKey)?;
        let url = format!("{}{path}", self.inner.api_base);
        debug!(%url, "Printful GET");

        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(api_key.expose_secret())
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| {
                    envelope
                        .error
                        .and_then(|e| e.message)
                        .or_else(|| envelope.result.and_then(|r| r.as_str().map(String::from)))
                })
                .unwrap_or(body);
            return Err(PrintfulError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| PrintfulError::Parse(e.to_string()))
    }
}
