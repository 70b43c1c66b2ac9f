//! Authentication: session tokens, Google sign-in and the per-request guard.

pub mod google;
pub mod session;
pub mod token;

pub use google::{GoogleIdentity, GoogleVerifier, IdentityVerifier, VerifyError};
pub use session::{require_session, Session, TEST_MODE_TOKEN, TEST_USER_ID};
pub use token::{Claims, TokenError, TokenSigner};

#[cfg(test)]
pub use google::MockIdentityVerifier;
