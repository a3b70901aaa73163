//! Async client for the etcd v2 keyspace API

use std::sync::Arc;
use std::time::Duration;

use http::header::CONTENT_TYPE;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::extract::{extract, RawResponse};
use crate::transport::HttpTransport;
use crate::translate::translate;
use crate::types::{error_code, KeysResult, Node, WatchOptions};
use crate::uri::{Endpoint, KEYS_PREFIX, VERSION_PATH};
use crate::watch::Watch;

/// Async etcd v2 client
///
/// Cloning is cheap: clones share the endpoint and the pooled transport, so
/// any number of operations (including long-running watches) can be in
/// flight at once. Closing any clone closes them all.
///
/// # Example
/// ```rust,no_run
/// use etcd_v2_client::Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), etcd_v2_client::Error> {
///     let client = Client::new("http://127.0.0.1:4001")?;
///
///     client.set("/config/mode", "active").await?;
///     if let Some(result) = client.get("/config/mode").await? {
///         println!("mode = {:?}", result.value());
///     }
///
///     client.close();
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    endpoint: Arc<Endpoint>,
    config: Arc<ClientConfig>,
    transport: HttpTransport,
}

impl Client {
    /// Create a client for `endpoint` with the default transport
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(endpoint))
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Create a client on top of an existing transport.
    ///
    /// The transport may be shared with other clients; closing any of them
    /// closes it for all.
    pub fn with_transport(config: ClientConfig, transport: HttpTransport) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        Ok(Self {
            endpoint: Arc::new(endpoint),
            config: Arc::new(config),
            transport,
        })
    }

    /// The normalized base endpoint, always ending with `/`
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// The shared transport
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Retrieve a key. Returns `None` if it does not exist.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use etcd_v2_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), etcd_v2_client::Error> {
    /// # let client = Client::new("http://127.0.0.1:4001")?;
    /// match client.get("/services/api").await? {
    ///     Some(result) => println!("{:?}", result.value()),
    ///     None => println!("not registered"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, key: &str) -> Result<Option<KeysResult>> {
        let uri = self.endpoint.key_uri(KEYS_PREFIX, key, "")?;
        let result = self
            .execute(
                Method::GET,
                uri,
                None,
                &[200, 404],
                &[error_code::KEY_NOT_FOUND],
            )
            .await?;

        if result.error_code == Some(error_code::KEY_NOT_FOUND) {
            return Ok(None);
        }
        Ok(Some(result))
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> Result<KeysResult> {
        let uri = self.endpoint.key_uri(KEYS_PREFIX, key, "")?;
        self.execute(Method::DELETE, uri, None, &[200, 404], &[]).await
    }

    /// Set a key to a new value
    pub async fn set(&self, key: &str, value: &str) -> Result<KeysResult> {
        self.set_with_ttl(key, value, None).await
    }

    /// Set a key to a new value that expires after `ttl` seconds
    ///
    /// # Example
    /// ```rust,no_run
    /// # use etcd_v2_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), etcd_v2_client::Error> {
    /// # let client = Client::new("http://127.0.0.1:4001")?;
    /// let result = client.set_with_ttl("/locks/leader", "node-1", Some(30)).await?;
    /// println!("expires at {:?}", result.node.and_then(|n| n.expiration));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<KeysResult> {
        let ttl = ttl.map(|t| t.to_string());
        let mut form = vec![("value", value)];
        if let Some(ttl) = ttl.as_deref() {
            form.push(("ttl", ttl));
        }
        self.put_form(key, &form, &[200, 201], &[]).await
    }

    /// Create a directory
    pub async fn create_directory(&self, key: &str) -> Result<KeysResult> {
        self.put_form(key, &[("dir", "true")], &[200, 201], &[]).await
    }

    /// List the children of a directory.
    ///
    /// Returns `None` if the directory does not exist or etcd returned no
    /// node for it. Trailing slashes on `key` are ignored, so `"/"` lists
    /// the root.
    pub async fn list_directory(&self, key: &str) -> Result<Option<Vec<Node>>> {
        // etcd redirects paths containing `//`
        let key = key.trim_end_matches('/');
        let result = self.get(&format!("{}/", key)).await?;
        Ok(result.and_then(|r| r.node).map(|node| node.nodes))
    }

    /// Delete an empty directory
    pub async fn delete_directory(&self, key: &str) -> Result<KeysResult> {
        let uri = self.endpoint.key_uri(KEYS_PREFIX, key, "?dir=true")?;
        self.execute(Method::DELETE, uri, None, &[202], &[]).await
    }

    /// Set a key to `value` only if its current value is `prev_value`.
    ///
    /// A failed comparison is not an error: the returned result carries
    /// [`error_code::TEST_FAILED`] and etcd's message.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use etcd_v2_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), etcd_v2_client::Error> {
    /// # let client = Client::new("http://127.0.0.1:4001")?;
    /// let result = client.cas("/counter", "41", "42").await?;
    /// if result.is_error() {
    ///     println!("lost the race: {:?}", result.message);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cas(&self, key: &str, prev_value: &str, value: &str) -> Result<KeysResult> {
        let form = [("value", value), ("prevValue", prev_value)];
        self.put_form(key, &form, &[200, 412], &[error_code::TEST_FAILED])
            .await
    }

    /// Watch a key (or, with [`WatchOptions::recursive`], a subtree) for the
    /// next change.
    ///
    /// The request runs on its own task; the returned [`Watch`] resolves
    /// when etcd reports the change. No request timeout applies.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use etcd_v2_client::{Client, WatchOptions};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), etcd_v2_client::Error> {
    /// # let client = Client::new("http://127.0.0.1:4001")?;
    /// let watch = client.watch("/jobs", WatchOptions::recursive());
    /// let change = watch.await?;
    /// println!("{} on {:?}", change.action.unwrap_or_default(), change.node.map(|n| n.key));
    /// # Ok(())
    /// # }
    /// ```
    pub fn watch(&self, key: &str, options: WatchOptions) -> Watch {
        let client = self.clone();
        let key = key.to_string();
        Watch::spawn(async move { client.wait_for_change(&key, options).await })
    }

    /// Long-poll for the next change without spawning a task
    pub async fn wait_for_change(&self, key: &str, options: WatchOptions) -> Result<KeysResult> {
        let uri = self.endpoint.key_uri(KEYS_PREFIX, key, &watch_suffix(options))?;
        let request = build_request(Method::GET, uri, None)?;
        let raw = self.send(request, &[200]).await?;
        translate(raw, &[])
    }

    /// List the children of `key`
    pub async fn list_children(&self, key: &str) -> Result<KeysResult> {
        let uri = self.endpoint.key_uri(KEYS_PREFIX, key, "/")?;
        self.execute(Method::GET, uri, None, &[200], &[]).await
    }

    /// Get the server version string. The body is returned verbatim.
    pub async fn version(&self) -> Result<String> {
        let uri = self.endpoint.resolve(VERSION_PATH)?;
        let request = build_request(Method::GET, uri, None)?;
        let raw = self.with_timeout(self.send(request, &[200])).await?;
        match raw.body {
            Some(body) if raw.status == 200 => Ok(body),
            Some(_) => Err(Error::Http {
                status: raw.status,
                reason: "Error while fetching version".to_string(),
            }),
            None => Err(Error::EmptyResponse),
        }
    }

    /// Close the transport. Pending and later operations on this client and
    /// its clones fail with [`Error::Closed`]. Returns false if the client
    /// was already closed.
    pub fn close(&self) -> bool {
        self.transport.close()
    }

    /// True once the client has been closed
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    async fn put_form(
        &self,
        key: &str,
        form: &[(&str, &str)],
        accepted_status: &[u16],
        accepted_errors: &[u32],
    ) -> Result<KeysResult> {
        let uri = self.endpoint.key_uri(KEYS_PREFIX, key, "")?;
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        self.execute(Method::PUT, uri, Some(body), accepted_status, accepted_errors)
            .await
    }

    async fn execute(
        &self,
        method: Method,
        uri: Uri,
        form: Option<String>,
        accepted_status: &[u16],
        accepted_errors: &[u32],
    ) -> Result<KeysResult> {
        let request = build_request(method, uri, form)?;
        let raw = self.with_timeout(self.send(request, accepted_status)).await?;
        translate(raw, accepted_errors)
    }

    /// Dispatch and extract. Closing the transport interrupts both phases.
    async fn send(&self, request: Request<Full<Bytes>>, accepted_status: &[u16]) -> Result<RawResponse> {
        self.transport
            .until_closed(async {
                let response = self.transport.execute(request).await?;
                extract(response, accepted_status).await
            })
            .await
    }

    async fn with_timeout<T>(&self, work: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match self.config.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), work)
                .await
                .map_err(|_| Error::Timeout(ms))?,
            None => work.await,
        }
    }
}

fn watch_suffix(options: WatchOptions) -> String {
    let mut suffix = String::from("?wait=true");
    if let Some(index) = options.wait_index {
        suffix.push_str(&format!("&waitIndex={}", index));
    }
    if options.recursive {
        suffix.push_str("&recursive=true");
    }
    suffix
}

fn build_request(method: Method, uri: Uri, form: Option<String>) -> Result<Request<Full<Bytes>>> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match form {
        Some(form) => {
            builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
            Bytes::from(form)
        }
        None => Bytes::new(),
    };
    builder
        .body(Full::new(body))
        .map_err(|e| Error::InvalidRequest(format!("Failed to build request: {}", e)))
}
