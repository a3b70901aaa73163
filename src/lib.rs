//! A client for the etcd v2 HTTP keyspace API
//!
//! This library provides typed get, set, delete, compare-and-swap,
//! directory and long-poll watch operations over etcd's REST interface.
//!
//! # Features
//! - Async API on tokio, plus a [`BlockingClient`] wrapper
//! - One pooled HTTP transport shared by every clone of a client, with no
//!   per-host connection cap so pending watches never block other calls
//! - Watches as spawned, cancellable futures
//! - Expected "not found" states returned as `None`; every other failure
//!   surfaced as a single [`Error`] type carrying status code, etcd error
//!   code and the parsed result where available
//! - `X-Etcd-Index`, `X-Raft-Index` and `X-Raft-Term` exposed on every result
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use etcd_v2_client::{Client, WatchOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), etcd_v2_client::Error> {
//!     let client = Client::new("http://127.0.0.1:4001")?;
//!
//!     // Store a value
//!     let result = client.set("/app/feature", "on").await?;
//!     println!("Stored at index {:?}", result.etcd_index);
//!
//!     // Wait for the next change below /app
//!     let watch = client.watch("/app", WatchOptions::recursive());
//!     client.set("/app/feature", "off").await?;
//!     let change = watch.await?;
//!     println!("Changed: {}", change);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
mod extract;
pub mod transport;
mod translate;
pub mod types;
pub mod uri;
pub mod watch;

pub use blocking::BlockingClient;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use extract::{ETCD_INDEX_HEADER, RAFT_INDEX_HEADER, RAFT_TERM_HEADER};
pub use transport::HttpTransport;
pub use types::*;
pub use watch::Watch;
