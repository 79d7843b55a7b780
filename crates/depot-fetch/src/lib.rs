//! Streaming transfers from remote repositories into staging files.
//!
//! - [`HttpClient`] - Minimal async GET abstraction, mockable in tests
//! - [`ReqwestClient`] - Production client (feature `reqwest`)
//! - [`Fetcher`] - Timeout-bounded streaming into a caller-supplied path
//!
//! Mechanism only: which remote to try, and what to do with the result, is
//! decided by the caller.

mod error;
mod fetcher;
mod http;

pub use error::{FetchError, Result};
pub use fetcher::{FetchOptions, Fetcher};
pub use http::{BoxStream, HttpClient};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
