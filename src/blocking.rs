//! Blocking client
//!
//! Wraps the async [`Client`] with a private multi-threaded tokio runtime.
//! Every call spawns the async operation onto that runtime and blocks the
//! calling thread until it completes.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::types::{KeysResult, Node, WatchOptions};
use crate::watch::joined;

/// Synchronous etcd v2 client
///
/// Must not be used from inside an async context: blocking on the runtime
/// from one of its own worker threads panics.
///
/// # Example
/// ```rust,no_run
/// use etcd_v2_client::BlockingClient;
///
/// fn main() -> Result<(), etcd_v2_client::Error> {
///     let client = BlockingClient::new("http://127.0.0.1:4001")?;
///     client.set("/greeting", "hello")?;
///     let value = client.get("/greeting")?.and_then(|r| r.node).and_then(|n| n.value);
///     assert_eq!(value.as_deref(), Some("hello"));
///     Ok(())
/// }
/// ```
pub struct BlockingClient {
    runtime: Runtime,
    client: Client,
}

impl BlockingClient {
    /// Create a blocking client for `endpoint`
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(endpoint))
    }

    /// Create a blocking client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .thread_name("etcd-client")
            .enable_all()
            .build()?;
        let client = {
            let _guard = runtime.enter();
            Client::with_config(config)?
        };
        Ok(Self { runtime, client })
    }

    /// The async client sharing this client's transport
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Retrieve a key. Returns `None` if it does not exist.
    pub fn get(&self, key: &str) -> Result<Option<KeysResult>> {
        let key = key.to_string();
        self.run(|client| async move { client.get(&key).await })
    }

    /// Delete a key
    pub fn delete(&self, key: &str) -> Result<KeysResult> {
        let key = key.to_string();
        self.run(|client| async move { client.delete(&key).await })
    }

    /// Set a key to a new value
    pub fn set(&self, key: &str, value: &str) -> Result<KeysResult> {
        self.set_with_ttl(key, value, None)
    }

    /// Set a key to a new value that expires after `ttl` seconds
    pub fn set_with_ttl(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<KeysResult> {
        let (key, value) = (key.to_string(), value.to_string());
        self.run(|client| async move { client.set_with_ttl(&key, &value, ttl).await })
    }

    /// Create a directory
    pub fn create_directory(&self, key: &str) -> Result<KeysResult> {
        let key = key.to_string();
        self.run(|client| async move { client.create_directory(&key).await })
    }

    /// List the children of a directory, `None` if it does not exist
    pub fn list_directory(&self, key: &str) -> Result<Option<Vec<Node>>> {
        let key = key.to_string();
        self.run(|client| async move { client.list_directory(&key).await })
    }

    /// Delete an empty directory
    pub fn delete_directory(&self, key: &str) -> Result<KeysResult> {
        let key = key.to_string();
        self.run(|client| async move { client.delete_directory(&key).await })
    }

    /// Compare-and-swap
    pub fn cas(&self, key: &str, prev_value: &str, value: &str) -> Result<KeysResult> {
        let (key, prev_value, value) = (key.to_string(), prev_value.to_string(), value.to_string());
        self.run(|client| async move { client.cas(&key, &prev_value, &value).await })
    }

    /// Block until etcd reports a change at (or below) `key`
    pub fn watch(&self, key: &str, options: WatchOptions) -> Result<KeysResult> {
        let key = key.to_string();
        self.run(|client| async move { client.wait_for_change(&key, options).await })
    }

    /// List the children of `key`
    pub fn list_children(&self, key: &str) -> Result<KeysResult> {
        let key = key.to_string();
        self.run(|client| async move { client.list_children(&key).await })
    }

    /// Get the server version string
    pub fn version(&self) -> Result<String> {
        self.run(|client| async move { client.version().await })
    }

    /// Close the shared transport. Returns false if already closed.
    pub fn close(&self) -> bool {
        self.client.close()
    }

    /// Spawn the operation and wait for it. A cancelled task reports
    /// [`Error::Interrupted`](crate::Error::Interrupted); a panic in the task
    /// is resumed here.
    fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(Client) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let task = self.runtime.spawn(operation(self.client.clone()));
        joined(self.runtime.block_on(task))
    }
}
