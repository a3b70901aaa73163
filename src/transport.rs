//! Shared HTTP transport
//!
//! One pooled hyper client multiplexes every operation issued through a
//! [`Client`](crate::Client) and its clones. The pool places no cap on the
//! number of connections per host: each pending watch pins one HTTP/1.1
//! connection for as long as etcd keeps it open, and ordinary calls to the
//! same host must still get through.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;

/// The pooled hyper client used for every request
pub type HyperClient = HttpClient<HttpsConnector, Full<Bytes>>;

/// Build a rustls ClientConfig trusting the webpki root set.
fn build_tls_config() -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Ok(rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// Build the default pooled client: plain HTTP or TLS depending on the
/// request scheme, no per-host connection limit.
pub fn build_http_client(config: &ClientConfig) -> Result<HyperClient> {
    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(build_tls_config()?)
        .https_or_http()
        .enable_http1()
        .build();

    let mut builder = HttpClient::builder(TokioExecutor::new());
    builder.pool_max_idle_per_host(usize::MAX);
    if let Some(ms) = config.pool_idle_timeout_ms {
        builder
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_millis(ms));
    }

    Ok(builder.build(https_connector))
}

struct Inner {
    /// Taken on close so the pool and its idle connections are released
    http_client: RwLock<Option<HyperClient>>,
    shutdown: watch::Sender<bool>,
}

/// Cloneable handle to the shared transport
///
/// Submitting a request yields the raw response without looking at its
/// status. Once [`close`](HttpTransport::close) is called every pending
/// and future request resolves with [`Error::Closed`].
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<Inner>,
}

impl HttpTransport {
    /// Build a transport with the default pooled client
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::from_client(build_http_client(config)?))
    }

    /// Wrap an externally built hyper client
    pub fn from_client(http_client: HyperClient) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                http_client: RwLock::new(Some(http_client)),
                shutdown,
            }),
        }
    }

    /// Dispatch a request and wait for the raw response.
    ///
    /// Fails with [`Error::Closed`] if the transport is already closed. To
    /// stop a request that is in flight when the transport closes, run it
    /// inside [`until_closed`](HttpTransport::until_closed).
    pub async fn execute(&self, request: Request<Full<Bytes>>) -> Result<Response<Incoming>> {
        let http_client = self
            .inner
            .http_client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::Closed)?;

        debug!("Sending request: {} {}", request.method(), request.uri());

        http_client
            .request(request)
            .await
            .map_err(|e| Error::Connection(format!("Request failed: {}", e)))
    }

    /// Run `work` unless the transport is closed first, in which case it is
    /// dropped and [`Error::Closed`] is returned.
    pub async fn until_closed<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let mut shutdown = self.inner.shutdown.subscribe();
        tokio::select! {
            biased;
            _ = shutdown.wait_for(|closed| *closed) => Err(Error::Closed),
            result = work => result,
        }
    }

    /// Shut the transport down. Returns false if it was already closed.
    pub fn close(&self) -> bool {
        let was_closed = self.inner.shutdown.send_replace(true);
        self.inner
            .http_client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if !was_closed {
            info!("HTTP transport closed");
        }
        !was_closed
    }

    /// True once [`close`](HttpTransport::close) has been called
    pub fn is_closed(&self) -> bool {
        *self.inner.shutdown.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request<Full<Bytes>> {
        Request::get(uri).body(Full::new(Bytes::new())).unwrap()
    }

    #[test]
    fn test_build_tls_config() {
        assert!(build_tls_config().is_ok());
    }

    #[test]
    fn test_close_is_idempotent() {
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        assert!(!transport.is_closed());
        assert!(transport.close());
        assert!(transport.is_closed());
        assert!(!transport.close());
    }

    #[test]
    fn test_clones_share_closed_state() {
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        let other = transport.clone();
        transport.close();
        assert!(other.is_closed());
    }

    #[tokio::test]
    async fn test_execute_after_close_fails_without_dispatch() {
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        transport.close();
        let result = transport.execute(request("http://127.0.0.1:9/v2/keys/a")).await;
        assert!(matches!(result, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_close_interrupts_pending_work() {
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        let closer = transport.clone();
        let pending = tokio::spawn(async move {
            transport
                .until_closed(std::future::pending::<Result<()>>())
                .await
        });
        tokio::task::yield_now().await;
        closer.close();
        let result = pending.await.unwrap();
        assert!(matches!(result, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_execute_does_not_subscribe_to_shutdown() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let uri = format!("http://{}/v2/keys/a", listener.local_addr().unwrap());
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();

        let pending = tokio::spawn({
            let transport = transport.clone();
            async move { transport.execute(request(&uri)).await }
        });
        // Accept and never answer so the request stays in flight
        let (_socket, _) = listener.accept().await.unwrap();
        assert_eq!(transport.inner.shutdown.receiver_count(), 0);

        let guarded = tokio::spawn({
            let transport = transport.clone();
            async move { transport.until_closed(std::future::pending::<Result<()>>()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.inner.shutdown.receiver_count(), 1);

        transport.close();
        assert!(matches!(guarded.await.unwrap(), Err(Error::Closed)));
        pending.abort();
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        let uri = format!("http://127.0.0.1:{}/v2/keys/a", port);
        let result = transport.execute(request(&uri)).await;
        assert!(matches!(result, Err(Error::Connection(_))), "got {:?}", result.err());
    }
}
