use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::{FetchError, Result};
use crate::http::HttpClient;

/// Configuration for transfers.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Upper bound on a whole transfer, from request to last byte.
    ///
    /// Default: 60s
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl FetchOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Streams remote files into local staging paths.
///
/// The fetcher never writes to a final location: callers hand it a path
/// inside a staging workspace and decide afterwards whether to keep it.
pub struct Fetcher<C: HttpClient> {
    client:  C,
    options: FetchOptions,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions { &self.options }

    pub fn client(&self) -> &C { &self.client }

    /// Fetch `url` into `destination` within the default timeout.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64> {
        self.fetch_within(url, destination, self.options.timeout).await
    }

    /// Fetch `url` into `destination`, giving up after `timeout`.
    ///
    /// Returns the number of bytes written. On any failure, including the
    /// timeout, the partially written destination is removed.
    pub async fn fetch_within(&self, url: &str, destination: &Path, timeout: Duration) -> Result<u64> {
        tracing::debug!(url, destination = %destination.display(), ?timeout, "starting transfer");

        let result = match tokio::time::timeout(timeout, self.stream_to(url, destination)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };

        match result {
            Ok(bytes) => {
                tracing::debug!(url, bytes, "transfer complete");
                Ok(bytes)
            }
            Err(e) => {
                discard(destination).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, destination: &Path) -> Result<u64> {
        let io_err = |source| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let mut stream = self.client.stream(url).await.map_err(map_network)?;
        let mut file = tokio::fs::File::create(destination).await.map_err(io_err)?;

        let mut bytes_written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_network)?;
            file.write_all(&chunk).await.map_err(io_err)?;
            bytes_written += chunk.len() as u64;
        }

        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        Ok(bytes_written)
    }
}

fn map_network<E: std::error::Error>(e: E) -> FetchError { FetchError::Network(e.to_string()) }

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial transfer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::BoxStream;
    use bytes::Bytes;

    #[derive(Debug)]
    struct MockError(String);

    impl std::fmt::Display for MockError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
    }

    impl std::error::Error for MockError {}

    enum Behaviour {
        Body(Vec<&'static [u8]>),
        Refused,
        BrokenAfterFirstChunk,
        Stall,
    }

    struct MockHttpClient(Behaviour);

    impl HttpClient for MockHttpClient {
        type Error = MockError;

        async fn stream(
            &self,
            _url: &str,
        ) -> std::result::Result<BoxStream<'static, std::result::Result<Bytes, Self::Error>>, Self::Error> {
            match &self.0 {
                Behaviour::Body(chunks) => {
                    let items: Vec<_> = chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
                    Ok(Box::pin(futures_util::stream::iter(items)))
                }
                Behaviour::Refused => Err(MockError("connection refused".into())),
                Behaviour::BrokenAfterFirstChunk => Ok(Box::pin(futures_util::stream::iter(vec![
                    Ok(Bytes::from_static(b"partial")),
                    Err(MockError("connection reset".into())),
                ]))),
                Behaviour::Stall => Ok(Box::pin(futures_util::stream::pending())),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_writes_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jar");
        let fetcher = Fetcher::new(MockHttpClient(Behaviour::Body(vec![b"hello ", b"world"])));

        let bytes = fetcher.fetch("http://remote/a.jar", &dest).await.unwrap();
        assert_eq!(bytes, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_fetch_refused_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jar");
        let fetcher = Fetcher::new(MockHttpClient(Behaviour::Refused));

        let result = fetcher.fetch("http://remote/a.jar", &dest).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_broken_stream_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jar");
        let fetcher = Fetcher::new(MockHttpClient(Behaviour::BrokenAfterFirstChunk));

        let result = fetcher.fetch("http://remote/a.jar", &dest).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
        assert!(!dest.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_transfer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jar");
        let fetcher = Fetcher::new(MockHttpClient(Behaviour::Stall))
            .with_options(FetchOptions::default().timeout(Duration::from_secs(5)));

        let result = fetcher.fetch("http://remote/a.jar", &dest).await;
        assert!(matches!(result, Err(FetchError::Timeout(t)) if t == Duration::from_secs(5)));
        assert!(!dest.exists());
    }
}
