use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Asynchronous HTTP client abstraction.
///
/// This trait provides the minimal interface a remote transfer needs.
/// Implementations handle their own redirect following, connection
/// configuration and error mapping.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - In-memory implementations for testing
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations.
    type Error: std::error::Error + Send + 'static;

    /// Open a streaming GET and return the response body.
    ///
    /// # Errors
    ///
    /// Any failure to obtain a successful response (DNS failure, refused
    /// connection, non-2xx status including 404) is an error. A remote that
    /// does not have the file is indistinguishable from one that is down.
    fn stream(
        &self,
        url: &str,
    ) -> impl Future<Output = std::result::Result<BoxStream<'static, std::result::Result<Bytes, Self::Error>>, Self::Error>>
    + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use super::*;

    /// Production HTTP client implementation using reqwest.
    #[derive(Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Create a client with a 30 second connect timeout.
        pub fn new() -> Result<Self, reqwest::Error> { Self::with_connect_timeout(Duration::from_secs(30)) }

        pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
            let client = reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
                .build()?;
            Ok(Self { client })
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn stream(
            &self,
            url: &str,
        ) -> std::result::Result<BoxStream<'static, std::result::Result<Bytes, Self::Error>>, Self::Error> {
            let response = self.client.get(url).send().await?.error_for_status()?;
            Ok(Box::pin(response.bytes_stream()))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
