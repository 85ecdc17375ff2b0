//! The token source capability consulted before every upstream call.

// self
use crate::{_prelude::*, auth::AccessToken, error::CredentialError};

/// Boxed future returned by [`TokenSource::fetch_token`].
pub type TokenFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AccessToken, CredentialError>> + 'a + Send>>;

/// Hands out bearer credentials on demand.
///
/// Implementations own any caching and refresh-before-expiry logic. Callers ask for a token
/// on every outbound request and never keep one across calls.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Returns a token suitable for the next outbound request.
	fn fetch_token(&self) -> TokenFuture<'_>;
}
impl<T> TokenSource for Arc<T>
where
	T: ?Sized + TokenSource,
{
	fn fetch_token(&self) -> TokenFuture<'_> {
		T::fetch_token(self)
	}
}

/// Source that always returns the same token, expired or not.
#[derive(Clone, Debug)]
pub struct StaticTokenSource(AccessToken);
impl StaticTokenSource {
	/// Wraps a pre-minted token.
	pub fn new(token: AccessToken) -> Self {
		Self(token)
	}
}
impl TokenSource for StaticTokenSource {
	fn fetch_token(&self) -> TokenFuture<'_> {
		let token = self.0.clone();

		Box::pin(async move { Ok(token) })
	}
}
