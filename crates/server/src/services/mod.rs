//! Orchestrators behind the HTTP routes.
//!
//! # Services
//!
//! - `checkout` - Cart validation and Stripe Checkout Session creation
//! - `product_sync` - Printful catalog reads and the Printful to Stripe mirror
//!
//! Services take the provider clients they need as arguments and return
//! [`AppError`](crate::error::AppError), so handlers stay thin.

pub mod checkout;
pub mod product_sync;
