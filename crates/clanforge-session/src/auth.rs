//! Authentication hook for validating a login.
//!
//! Clanforge doesn't verify accounts itself. The [`Authenticator`] trait
//! takes the decoded login body and either yields the stable
//! [`PlayerId`] to bind, or rejects the login. Swap in a real check
//! (signed tokens, an account service) without touching the server.

use clanforge_protocol::{LoginRequest, PlayerId};

use crate::SessionError;

/// Validates a login and returns the player's identity.
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection task for the life of the server.
///
/// # Example
///
/// ```rust
/// use clanforge_protocol::{LoginRequest, PlayerId};
/// use clanforge_session::{Authenticator, SessionError};
///
/// /// Only lets players whose id starts with "beta-" in.
/// struct BetaAuthenticator;
///
/// impl Authenticator for BetaAuthenticator {
///     async fn authenticate(
///         &self,
///         login: &LoginRequest,
///     ) -> Result<PlayerId, SessionError> {
///         if login.player_id.as_str().starts_with("beta-") {
///             Ok(login.player_id.clone())
///         } else {
///             Err(SessionError::AuthFailed("not a beta account".into()))
///         }
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the login body.
    ///
    /// # Returns
    /// - `Ok(PlayerId)`: the identity to bind to this connection
    /// - `Err(SessionError::AuthFailed)`: the login is rejected
    fn authenticate(
        &self,
        login: &LoginRequest,
    ) -> impl std::future::Future<Output = Result<PlayerId, SessionError>> + Send;
}

/// The default authenticator: trusts the client-chosen id as long as it
/// is non-empty and free of the legacy `|` delimiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginAuthenticator;

impl Authenticator for LoginAuthenticator {
    async fn authenticate(&self, login: &LoginRequest) -> Result<PlayerId, SessionError> {
        let id = login.player_id.as_str();
        if id.trim().is_empty() {
            return Err(SessionError::AuthFailed("empty player id".into()));
        }
        if id.contains('|') {
            return Err(SessionError::AuthFailed(
                "player id must not contain '|'".into(),
            ));
        }
        Ok(login.player_id.clone())
    }
}
