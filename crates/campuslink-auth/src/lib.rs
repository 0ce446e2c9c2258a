//! # campuslink-auth
//!
//! JWT handling for CampusLink. Token issuance lives in the surrounding
//! CRUD platform; this crate defines the shared claims shape, an encoder
//! (used there and by the test suites), and the decoder the real-time
//! layer validates upgrade credentials with.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
