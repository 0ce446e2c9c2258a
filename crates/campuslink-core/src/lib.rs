//! # campuslink-core
//!
//! Core crate for CampusLink. Contains the unified error system, typed
//! identifiers, and configuration schemas shared by every other crate.
//!
//! This crate has **no** internal dependencies on other CampusLink crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
