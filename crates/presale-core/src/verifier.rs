//! IdentityVerifier trait definition.
//!
//! Resolves an access token from the handshake frame to a party identity
//! and role. The concrete implementation in presale-infra calls the
//! external auth service.

use presale_types::error::AuthError;
use presale_types::identity::VerifiedParty;

/// Token verification contract.
pub trait IdentityVerifier: Send + Sync {
    /// Verify an access token, returning the party it belongs to.
    fn verify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<VerifiedParty, AuthError>> + Send;
}
