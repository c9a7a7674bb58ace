// Bearer-token sources.
//
// Token storage lives outside this crate. Requests only need a way to ask
// "what is the current token?" and fail fast when the answer is "none".

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;

/// Supplies the bearer token attached to access-controlled requests.
pub trait TokenSource: Send + Sync {
    /// The current token, or `None` if the user is not signed in.
    fn bearer_token(&self) -> Option<SecretString>;
}

/// A token fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<SecretString>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(SecretString::from(token.into())))
    }

    /// A source that never yields a token.
    pub fn none() -> Self {
        Self(None)
    }
}

impl From<Option<SecretString>> for StaticToken {
    fn from(token: Option<SecretString>) -> Self {
        Self(token)
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        self.0.clone()
    }
}

/// A token that can be swapped at runtime (sign-in / sign-out) while
/// requests are in flight.
#[derive(Debug, Default)]
pub struct SharedToken {
    current: ArcSwapOption<SecretString>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: SecretString) {
        self.current.store(Some(Arc::new(token)));
    }

    pub fn clear(&self) {
        self.current.store(None);
    }
}

impl TokenSource for SharedToken {
    fn bearer_token(&self) -> Option<SecretString> {
        self.current.load_full().map(|t| (*t).clone())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn shared_token_swaps() {
        let source = SharedToken::new();
        assert!(source.bearer_token().is_none());

        source.set(SecretString::from("abc".to_string()));
        assert_eq!(
            source.bearer_token().map(|t| t.expose_secret().to_owned()),
            Some("abc".to_owned())
        );

        source.clear();
        assert!(source.bearer_token().is_none());
    }

    #[test]
    fn static_none_has_no_token() {
        assert!(StaticToken::none().bearer_token().is_none());
        assert!(StaticToken::new("t").bearer_token().is_some());
    }
}
