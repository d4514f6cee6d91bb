//! Request authentication

mod middleware;
pub mod verifier;

pub use middleware::{auth_middleware, AuthError};
pub use verifier::{IdentityToolkitVerifier, TokenVerifier, VerifyError};

/// Identity attached to an authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: Option<String>,
}
