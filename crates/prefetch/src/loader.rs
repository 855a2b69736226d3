//! Media loaders.
//!
//! A loader is whatever warms the cache for a locator. On the site that is a
//! hidden `<video>` element; here it is an HTTP request whose body is read and
//! thrown away.

use crate::config::PreloadMode;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loaded {
    /// Body bytes actually received.
    pub bytes: u64,
}

#[async_trait]
pub trait MediaLoader: Send + Sync {
    /// Load `url` far enough for `mode`.
    ///
    /// Returns [`Network`](crate::error::ErrorKind::Network) or
    /// [`Status`](crate::error::ErrorKind::Status) on failure.
    async fn load(&self, url: &str, mode: PreloadMode) -> Result<Loaded>;
}

pub type LoaderHandle = Arc<dyn MediaLoader>;

#[cfg(feature = "http")]
pub use self::http::HttpLoader;

#[cfg(feature = "http")]
mod http {
    use super::{Loaded, MediaLoader};
    use crate::config::{PrefetchConfig, PreloadMode};
    use crate::error::{ErrorKind, Result};
    use async_trait::async_trait;
    use exn::ResultExt;
    use reqwest::{Client, header};
    use tracing::instrument;

    const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

    /// Loader issuing plain HTTP GET requests.
    ///
    /// In [`PreloadMode::Metadata`] the request carries a `Range` header for
    /// the first `metadata_bytes` bytes and reading stops there even if the
    /// server ignores the range. A load that outlives the request timeout
    /// fails as a [`Network`](ErrorKind::Network) error.
    pub struct HttpLoader {
        client: Client,
        metadata_bytes: u64,
    }

    impl HttpLoader {
        pub fn new(config: &PrefetchConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(config.request_timeout())
                .connect_timeout(config.connect_timeout())
                .user_agent(USER_AGENT)
                .build()
                .or_raise(|| ErrorKind::InvalidConfig("unable to build HTTP client".to_string()))?;
            Ok(Self::with_client(client, config.metadata_bytes))
        }

        pub fn with_client(client: Client, metadata_bytes: u64) -> Self {
            Self { client, metadata_bytes }
        }
    }

    #[async_trait]
    impl MediaLoader for HttpLoader {
        #[instrument(level = "debug", skip(self))]
        async fn load(&self, url: &str, mode: PreloadMode) -> Result<Loaded> {
            let mut request = self.client.get(url);
            let limit = match mode {
                PreloadMode::Metadata => {
                    let last = self.metadata_bytes.saturating_sub(1);
                    request = request.header(header::RANGE, format!("bytes=0-{last}"));
                    Some(self.metadata_bytes)
                },
                PreloadMode::Full => None,
            };
            let mut response = request.send().await.or_raise(|| ErrorKind::Network(url.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                exn::bail!(ErrorKind::Status(status.as_u16()));
            }
            let mut bytes = 0u64;
            while let Some(chunk) = response.chunk().await.or_raise(|| ErrorKind::Network(url.to_string()))? {
                bytes += chunk.len() as u64;
                if limit.is_some_and(|limit| bytes >= limit) {
                    break;
                }
            }
            tracing::debug!(status = status.as_u16(), bytes, "Media loaded");
            Ok(Loaded { bytes })
        }
    }
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::*;
    use crate::config::PrefetchConfig;
    use crate::error::ErrorKind;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    async fn read_head(stream: &mut TcpStream) -> String {
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut buf).await.unwrap();
            if read == 0 {
                break;
            }
            head.extend_from_slice(&buf[..read]);
        }
        String::from_utf8_lossy(&head).to_ascii_lowercase()
    }

    /// Answer a single request with `status` and `body`. The receiver yields
    /// the request head, lowercased.
    async fn serve(status: &'static str, body: Vec<u8>) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/clip.mp4", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = tx.send(read_head(&mut stream).await);
            let head = format!("HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n", body.len());
            // The client hangs up early when it has read enough.
            let _ = stream.write_all(head.as_bytes()).await;
            let _ = stream.write_all(&body).await;
        });
        (url, rx)
    }

    fn loader(metadata_bytes: u64) -> HttpLoader {
        HttpLoader::new(&PrefetchConfig { metadata_bytes, ..Default::default() }).unwrap()
    }

    #[tokio::test]
    async fn test_metadata_sends_range() {
        let (url, head) = serve("206 Partial Content", vec![0; 1024]).await;
        let loaded = loader(1024).load(&url, PreloadMode::Metadata).await.unwrap();
        assert_eq!(loaded, Loaded { bytes: 1024 });
        assert!(head.await.unwrap().contains("range: bytes=0-1023\r\n"));
    }

    #[tokio::test]
    async fn test_full_reads_whole_body() {
        let (url, head) = serve("200 OK", vec![0; 5_000]).await;
        let loaded = loader(1024).load(&url, PreloadMode::Full).await.unwrap();
        assert_eq!(loaded, Loaded { bytes: 5_000 });
        assert!(!head.await.unwrap().contains("range:"));
    }

    #[tokio::test]
    async fn test_metadata_stops_when_range_ignored() {
        let body_len = 4 * 1024 * 1024;
        let (url, _head) = serve("200 OK", vec![0; body_len]).await;
        let loaded = loader(1024).load(&url, PreloadMode::Metadata).await.unwrap();
        assert!(loaded.bytes >= 1024, "read {} bytes", loaded.bytes);
        assert!(loaded.bytes < body_len as u64, "read {} bytes", loaded.bytes);
    }

    #[tokio::test]
    async fn test_error_status() {
        let (url, _head) = serve("404 Not Found", Vec::new()).await;
        let err = loader(1024).load(&url, PreloadMode::Metadata).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Status(404)));
    }

    #[tokio::test]
    async fn test_stalled_host_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/clip.mp4", listener.local_addr().unwrap());
        tokio::spawn(async move {
            // Accept, then never answer.
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        let config = PrefetchConfig { request_timeout_ms: 200, ..Default::default() };
        let loader = HttpLoader::new(&config).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), loader.load(&url, PreloadMode::Metadata)).await;
        let err = result.expect("load should give up on its own").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
    }
}
