//! Auth domain - bearer token verification
//!
//! Users authenticate against an external identity provider which mints HS256
//! tokens with the shared secret. This service only verifies them.

pub mod jwt;

pub use jwt::{Claims, JwtService};
