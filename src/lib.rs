//! Ballast provides the operational core of a service: a managed lifecycle for its resources
//! and a caching layer in front of its authenticators.
//!
//! * [`lifecycle`] starts registered components in order and stops them in reverse order.
//! * [`auth`] wraps an [`auth::Authenticator`] with a bounded, single-flight cache and exposes
//!   warp filters resolving principals from `Authorization` headers.
//! * [`admin`] exposes operator tasks such as invalidating the authentication cache.
//! * [`application`] ties everything together and serves the HTTP routes.
//!
//! # Environment
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APP_NAME` | Name used in logs and spans | `BALLAST` |
//! | `APP_VERSION` | Version reported on startup | `DEVELOPMENT-SNAPSHOT-VERSION` |
//! | `BIND_ADDRESS` | Address of the HTTP server, e.g. `0.0.0.0:8080` | (required) |
//! | `AUTH_CACHE_POLICY` | Policy of [`auth::CachePolicy::from_env`] | `maximumSize=10000, expireAfterAccess=10m` |
//! | `SHUTDOWN_TIMEOUT` | Grace period of a [`lifecycle::TaskSetManager`] | `30s` |
//! | `RUST_LOG` | Log filter | `info` |

use std::env;
use std::sync::LazyLock;

pub mod admin;
pub mod application;
pub mod auth;
pub mod lifecycle;
pub mod logging;
pub mod tools;
pub mod web;

pub static APP_NAME: LazyLock<String> =
    LazyLock::new(|| env::var("APP_NAME").unwrap_or("BALLAST".to_string()));

pub static APP_VERSION: LazyLock<String> = LazyLock::new(|| {
    env::var("APP_VERSION").unwrap_or("DEVELOPMENT-SNAPSHOT-VERSION".to_string())
});
