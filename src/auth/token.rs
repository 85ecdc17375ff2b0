//! Bearer credential model handed out by token sources.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access token plus the instant it stops being accepted upstream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Secret presented in the `Authorization` header.
	pub secret: TokenSecret,
	/// Expiry instant reported by the issuer.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token that expires at `expires_at`.
	pub fn new(secret: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { secret: TokenSecret::new(secret), expires_at }
	}

	/// Creates a token that expires `lifetime` after `issued_at`.
	pub fn issued_at(
		secret: impl Into<String>,
		issued_at: OffsetDateTime,
		lifetime: Duration,
	) -> Self {
		Self::new(secret, issued_at + lifetime)
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if less than `window` of lifetime remains at `instant`.
	pub fn expires_within(&self, window: Duration, instant: OffsetDateTime) -> bool {
		self.expires_at - instant <= window
	}

	/// `Authorization` header value for this token.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
