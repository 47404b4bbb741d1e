//! Bounds applied to an authentication cache.
//!
//! Policies are usually supplied as a compact spec string via the `AUTH_CACHE_POLICY`
//! environment variable:
//!
//! ```text
//! maximumSize=10000, expireAfterAccess=10m
//! maximumSize=500, expireAfterWrite=30s, expireAfterAccess=5s
//! ```
//!
//! Durations are written as an integer followed by one of `ms`, `s`, `m`, `h` or `d`.

use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the cache spec string.
pub const AUTH_CACHE_POLICY: &str = "AUTH_CACHE_POLICY";

/// Used if `AUTH_CACHE_POLICY` is not set.
pub const DEFAULT_CACHE_POLICY: &str = "maximumSize=10000, expireAfterAccess=10m";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Invalid cache policy entry '{0}': expected key=value")]
    MalformedEntry(String),
    #[error("Unknown cache policy key '{0}'")]
    UnknownKey(String),
    #[error("Cache policy key '{0}' was given more than once")]
    DuplicateKey(String),
    #[error("Invalid value '{value}' for cache policy key '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Size and time bounds of an authentication cache.
///
/// All bounds are optional and may be combined. A policy without any bound caches forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub maximum_size: Option<u64>,
    pub expire_after_write: Option<Duration>,
    pub expire_after_access: Option<Duration>,
}

impl CachePolicy {
    /// Reads the policy from `AUTH_CACHE_POLICY`, falling back to [`DEFAULT_CACHE_POLICY`].
    pub fn from_env() -> Result<Self, PolicyError> {
        match env::var(AUTH_CACHE_POLICY) {
            Ok(spec) if !spec.trim().is_empty() => spec.parse(),
            _ => DEFAULT_CACHE_POLICY.parse(),
        }
    }

    pub fn with_maximum_size(mut self, maximum_size: u64) -> Self {
        self.maximum_size = Some(maximum_size);
        self
    }

    pub fn with_expire_after_write(mut self, ttl: Duration) -> Self {
        self.expire_after_write = Some(ttl);
        self
    }

    pub fn with_expire_after_access(mut self, ttl: Duration) -> Self {
        self.expire_after_access = Some(ttl);
        self
    }

    /// The capacity of the backing LRU map, `None` if unbounded.
    ///
    /// Returns `Some(None)` for a maximum size of zero, which disables caching entirely.
    pub(crate) fn capacity(&self) -> Option<Option<NonZeroUsize>> {
        self.maximum_size
            .map(|size| NonZeroUsize::new(usize::try_from(size).unwrap_or(usize::MAX)))
    }
}

impl FromStr for CachePolicy {
    type Err = PolicyError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut policy = CachePolicy::default();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .map(|(key, value)| (key.trim(), value.trim()))
                .ok_or_else(|| PolicyError::MalformedEntry(entry.to_string()))?;

            let invalid = || PolicyError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            };

            match key {
                "maximumSize" => {
                    let size = value.parse::<u64>().map_err(|_| invalid())?;
                    set_once(&mut policy.maximum_size, size, key)?;
                }
                "expireAfterWrite" => {
                    let ttl = parse_duration(value).ok_or_else(invalid)?;
                    set_once(&mut policy.expire_after_write, ttl, key)?;
                }
                "expireAfterAccess" => {
                    let ttl = parse_duration(value).ok_or_else(invalid)?;
                    set_once(&mut policy.expire_after_access, ttl, key)?;
                }
                _ => return Err(PolicyError::UnknownKey(key.to_string())),
            }
        }

        Ok(policy)
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, key: &str) -> Result<(), PolicyError> {
    if slot.is_some() {
        return Err(PolicyError::DuplicateKey(key.to_string()));
    }

    *slot = Some(value);
    Ok(())
}

/// Parses durations like `250ms`, `30s`, `10m`, `2h` or `1d`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let split_at = value.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = value.split_at(split_at);
    let amount = amount.parse::<u64>().ok()?;

    match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(amount.checked_mul(60 * 60)?)),
        "d" => Some(Duration::from_secs(amount.checked_mul(24 * 60 * 60)?)),
        _ => None,
    }
}
