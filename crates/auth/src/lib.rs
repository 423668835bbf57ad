//! `storefront-auth` — authentication boundary.
//!
//! The rest of the system never inspects tokens: it either receives an
//! already-authenticated `UserId` or an anonymous caller. This crate is the
//! only place that knows what a token looks like.

pub mod claims;
pub mod jwt;

pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{AuthError, Hs256JwtValidator, JwtValidator};
