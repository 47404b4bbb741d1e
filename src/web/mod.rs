//! HTTP layer built on the Warp framework.
//!
//! Provides error mapping and the server loop. [`warp::serve`] runs a server with graceful
//! shutdown support, [`crate::application::Application`] runs it wrapped in the managed
//! lifecycle.

pub mod error;
pub mod warp;
