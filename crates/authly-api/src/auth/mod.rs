//! Bearer-token authentication.
//!
//! # Components
//!
//! - `bearer` - `Authorization: Bearer <token>` header parsing
//! - `jwks` - key set cache fed by the JWKS discovery endpoint
//! - `jwt` - signature and temporal validation of a token against a key set
//! - `claims` - typed token payload
//! - `identity` - authenticated caller derived from claims
//! - `gate` - the request pipeline composing the above
//! - `error` - failure kinds shared by every stage

pub mod bearer;
pub mod claims;
pub mod error;
pub mod gate;
pub mod identity;
pub mod jwks;
pub mod jwt;

pub use claims::Claims;
pub use error::AuthError;
pub use gate::{AuthGate, AuthStage};
pub use identity::{build_identity, Identity};
pub use jwks::{KeySet, KeySetCache, KeySetCacheConfig, KeySetStatus};
pub use jwt::TokenValidator;
