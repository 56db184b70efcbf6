//! Storefront backend
//!
//! CRUD service for an e-commerce storefront: catalog, promo offers,
//! orders, reviews, and users over Postgres.
//!
//! ## Features
//! - Product catalog with soft-deactivation and stock tracking
//! - Promo offers: percentage, fixed-amount, free-shipping
//! - Order lifecycle with stock reconciliation on cancel/reinstate
//! - Per-product review aggregation

pub mod auth;
pub mod domain;
pub mod error;
pub mod http;
pub mod models;
pub mod state;

pub use error::{AppError, Result};
pub use state::AppState;
