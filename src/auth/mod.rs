//! Authentication of request credentials.
//!
//! An [`Authenticator`] turns credentials into an optional principal. `Ok(None)` means the
//! credentials were checked and rejected, while `Err(AuthenticationError)` means the backend
//! could not decide at all. The two outcomes are kept apart everywhere: rejections are cached
//! and mapped to `401`, errors are never cached and are mapped to `500`.
//!
//! Wrap any expensive authenticator in a [`CachingAuthenticator`] to serve repeated lookups
//! from memory:
//!
//! ```rust,ignore
//! let policy = CachePolicy::from_env()?;
//! let authenticator = Arc::new(CachingAuthenticator::new(Arc::new(LdapAuthenticator::new()), policy));
//! let routes = warp::path("hello")
//!     .and(with_principal(authenticator.clone(), basic_credentials()))
//!     .map(|user: String| format!("Hello {user}"));
//! ```

use async_trait::async_trait;
use std::sync::Arc;

pub mod caching;
pub mod credentials;
pub mod filter;
pub mod policy;
pub mod stats;

pub use caching::CachingAuthenticator;
pub use policy::CachePolicy;
pub use stats::CacheStats;

/// Resolves credentials of type `C` into a principal of type `P`.
#[async_trait]
pub trait Authenticator<C, P>: Send + Sync {
    /// Returns the principal for the given credentials, `None` if they are not valid.
    async fn authenticate(&self, credentials: &C) -> Result<Option<P>, AuthenticationError>;
}

/// Signals that an authenticator could not determine a principal due to an internal failure.
///
/// Wrong credentials are not an error, they yield `Ok(None)`. The error is cheap to clone so
/// that a single failed load can be handed to every caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Authentication backend failed: {0:#}")]
    Backend(Arc<anyhow::Error>),
}

impl AuthenticationError {
    /// Wraps any error as a backend failure.
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        AuthenticationError::Backend(Arc::new(err.into()))
    }
}

impl From<anyhow::Error> for AuthenticationError {
    fn from(err: anyhow::Error) -> Self {
        AuthenticationError::Backend(Arc::new(err))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{AuthenticationError, Authenticator};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Maps "good-guy" to a principal, fails for "bad-guy" and rejects everything else.
    ///
    /// Every call is counted and can optionally be slowed down to widen race windows.
    #[derive(Default)]
    pub(crate) struct CountingAuthenticator {
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl CountingAuthenticator {
        pub(crate) fn with_delay(delay: Duration) -> Self {
            CountingAuthenticator {
                calls: AtomicUsize::new(0),
                delay: Some(delay),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator<String, String> for CountingAuthenticator {
        async fn authenticate(
            &self,
            credentials: &String,
        ) -> Result<Option<String>, AuthenticationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match credentials.as_str() {
                "good-guy" => Ok(Some("good-guy".to_string())),
                "bad-guy" => Err(AuthenticationError::backend(anyhow::anyhow!("CRAP"))),
                _ => Ok(None),
            }
        }
    }
}
