//! `tutorhub-auth`: bearer-token authentication boundary.
//!
//! Decoupled from HTTP and storage. The API layer extracts the token and hands
//! it to a [`JwtValidator`]; what comes back is the authenticated user.

pub mod claims;
pub mod jwt;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
