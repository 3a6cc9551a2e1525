//! Bearer token supply.
//!
//! Sessions are owned elsewhere; fetchers only ask for the current token
//! right before each request so that a refreshed token is picked up on the
//! next tick.

use std::fmt::Debug;

/// Supplies the bearer token for the statistics endpoint.
pub trait TokenProvider: Send + Sync + Debug {
    /// The current token, or `None` when no session exists.
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, e.g. from configuration.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

/// No session: every fetch fails with an authentication error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// Adapts a closure owned by the session layer.
pub struct TokenFn<F>(pub F);

impl<F> Debug for TokenFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenFn")
    }
}

impl<F> TokenProvider for TokenFn<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn bearer_token(&self) -> Option<String> {
        (self.0)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn static_token_hides_secret_in_debug() {
        let token = StaticToken::new("s3cret");
        assert_eq!(token.bearer_token().as_deref(), Some("s3cret"));
        assert!(!format!("{:?}", token).contains("s3cret"));
    }

    #[test]
    fn empty_static_token_is_missing() {
        assert_eq!(StaticToken::new("").bearer_token(), None);
        assert_eq!(NoToken.bearer_token(), None);
    }

    #[test]
    fn token_fn_is_called_per_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = TokenFn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Some(format!("token-{n}"))
        });

        assert_eq!(provider.bearer_token().as_deref(), Some("token-0"));
        assert_eq!(provider.bearer_token().as_deref(), Some("token-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
