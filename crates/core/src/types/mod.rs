//! Core types for the site integration layer.
//!
//! This module provides type-safe wrappers for the DTOs exchanged between the
//! browser, the route handlers and the third-party providers.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod price;
pub mod token;

pub use cart::{CartError, CartLineItem, CheckoutRequest, CheckoutResult, ValidatedCheckout};
pub use catalog::{CatalogProduct, CatalogVariant, SyncOutcome, VariantMapping};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use token::{AccessToken, OAuthTokenSet};
