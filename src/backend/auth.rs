//! Bearer-token request signing with refresh-once semantics.
//!
//! Every request is signed with the current access token. A 401 answer triggers
//! exactly one refresh followed by exactly one retry. A failed refresh ends the
//! session: tokens are dropped and the caller must log in again.

use crate::backend::{Backend, ListQuery, Page};
use crate::model::wire::PinAck;
use crate::model::{
    AuthError, Channel, ConversationSummary, FetchError, Identity, Message, MessageId, Status,
};
use tracing::{debug, warn};

/// Access and refresh token issued at login.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Short-lived bearer token.
    pub access: String,
    /// Long-lived token exchanged for a new pair.
    pub refresh: String,
}

impl TokenPair {
    /// Build a pair.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Exchanges a refresh token for a new [`TokenPair`].
pub trait TokenRefresher {
    /// Perform the exchange. Any error ends the session.
    fn refresh(&mut self, refresh_token: &str) -> Result<TokenPair, FetchError>;
}

/// Holds the session tokens and signs requests with them.
#[derive(Debug)]
pub struct Authenticator<R> {
    tokens: Option<TokenPair>,
    refresher: R,
}

impl<R: TokenRefresher> Authenticator<R> {
    /// Logged-out authenticator.
    pub fn new(refresher: R) -> Self {
        Self {
            tokens: None,
            refresher,
        }
    }

    /// Authenticator holding `tokens`.
    pub fn with_tokens(tokens: TokenPair, refresher: R) -> Self {
        Self {
            tokens: Some(tokens),
            refresher,
        }
    }

    /// Store tokens from a successful login.
    pub fn login(&mut self, tokens: TokenPair) {
        self.tokens = Some(tokens);
    }

    /// Drop the tokens.
    pub fn logout(&mut self) {
        self.tokens = None;
    }

    /// Whether an access token is held.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }

    /// Current tokens.
    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    /// Run `request` with the current access token.
    ///
    /// `request` receives the bearer token and may be called twice: once with the
    /// current token and, after a 401 and a successful refresh, once more with the
    /// new one. The second answer is returned as-is, even if it is another 401.
    pub fn send<T, F>(&mut self, mut request: F) -> Result<T, FetchError>
    where
        F: FnMut(&str) -> Result<T, FetchError>,
    {
        let Some(tokens) = self.tokens.as_ref() else {
            return Err(AuthError::NotAuthenticated.into());
        };

        match request(&tokens.access) {
            Err(err) if err.is_unauthorized() => {
                debug!("Access token rejected, refreshing");
                let refresh_token = tokens.refresh.clone();
                match self.refresher.refresh(&refresh_token) {
                    Ok(renewed) => {
                        let result = request(&renewed.access);
                        self.tokens = Some(renewed);
                        result
                    }
                    Err(refresh_err) => {
                        warn!(error = %refresh_err, "Token refresh failed, ending session");
                        self.tokens = None;
                        Err(AuthError::SessionExpired.into())
                    }
                }
            }
            other => other,
        }
    }
}

/// A transport whose next request carries a bearer token.
pub trait BearerSigned {
    /// Use `access_token` in the `Authorization` header of the next request.
    fn sign(&mut self, access_token: &str);
}

/// [`Backend`] decorator that signs every call through an [`Authenticator`].
///
/// A 401 from `inner` is retried once after a token refresh; a failed refresh
/// surfaces as [`AuthError::SessionExpired`], which ends the dashboard session.
#[derive(Debug)]
pub struct AuthenticatedBackend<B, R> {
    inner: B,
    auth: Authenticator<R>,
}

impl<B: Backend + BearerSigned, R: TokenRefresher> AuthenticatedBackend<B, R> {
    /// Wrap `inner`.
    pub fn new(inner: B, auth: Authenticator<R>) -> Self {
        Self { inner, auth }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// The wrapped backend, mutably.
    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.inner
    }

    /// Token state.
    pub fn authenticator(&self) -> &Authenticator<R> {
        &self.auth
    }

    fn signed<T>(
        &mut self,
        mut call: impl FnMut(&mut B) -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let inner = &mut self.inner;
        self.auth.send(|token| {
            inner.sign(token);
            call(inner)
        })
    }
}

impl<B: Backend + BearerSigned, R: TokenRefresher> Backend for AuthenticatedBackend<B, R> {
    fn list_messages(&mut self, query: &ListQuery) -> Result<Page, FetchError> {
        self.signed(|inner| inner.list_messages(query))
    }

    fn update_status(
        &mut self,
        channel: Channel,
        id: &MessageId,
        status: Status,
    ) -> Result<Message, FetchError> {
        self.signed(|inner| inner.update_status(channel, id, status))
    }

    fn list_conversations(
        &mut self,
        channel: Channel,
    ) -> Result<Vec<ConversationSummary>, FetchError> {
        self.signed(|inner| inner.list_conversations(channel))
    }

    fn pin_sender(&mut self, sender: &Identity) -> Result<PinAck, FetchError> {
        self.signed(|inner| inner.pin_sender(sender))
    }

    fn unpin_sender(&mut self, sender: &Identity) -> Result<PinAck, FetchError> {
        self.signed(|inner| inner.unpin_sender(sender))
    }

    fn list_pinned(&mut self) -> Result<Vec<Identity>, FetchError> {
        self.signed(|inner| inner.list_pinned())
    }
}
