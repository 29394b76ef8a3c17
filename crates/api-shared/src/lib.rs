//! # API Shared
//!
//! Shared utilities and definitions for opaladmin API surfaces.
//!
//! Contains:
//! - request/response DTOs (`dto` module)
//! - shared services like `HealthService`
//! - API-key validation (usable by any transport)
//!
//! Used by `opal-core` (request inputs) and `api-rest` (full wire surface).

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
