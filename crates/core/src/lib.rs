//! Orgsite Core - Shared types library.
//!
//! This crate provides the transient request/response types shared by the
//! site's integration server and its tests:
//! - Cart line items and checkout requests/results
//! - Print-on-demand catalog products, variants and sync outcomes
//! - OAuth token sets relayed to the browser
//!
//! # Architecture
//!
//! The core crate contains only types, validation and pure conversions - no
//! I/O, no HTTP clients, no environment access. Every value is built once per
//! request and never mutated afterwards.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, cart, catalog and token types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
