//! Offline-first asset cache worker.
//!
//! This crate implements a fetch-interception cache manager: a fixed set
//! of core assets is snapshotted into a named, versioned cache partition
//! at install time, every intercepted GET is served network-first with
//! cache fallback, and failed navigations get a pre-cached offline page.
//!
//! The host runtime is abstracted behind three seams so the worker runs
//! anywhere and tests without one:
//! - [`CacheStorage`] for the persistent partition store
//! - [`Network`] for the fetch subsystem
//! - [`HostController`] for skip-waiting / claim-clients signals
//!
//! ```no_run
//! use std::sync::Arc;
//! use offcache::{CacheWorker, DetachedHost, HttpNetwork, MemoryStorage, WorkerConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let worker = CacheWorker::new(
//!     WorkerConfig::default(),
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(HttpNetwork::new("http://127.0.0.1:5000")?),
//!     Arc::new(DetachedHost),
//! );
//! worker.install().await?;
//! worker.activate().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod host;
pub mod lifecycle;
pub mod models;
pub mod net;
pub mod worker;

pub use cache::{CachePartition, CacheStorage, DiskStorage, MemoryStorage, StoredEntry};
pub use config::WorkerConfig;
pub use host::{DetachedHost, HostController};
pub use lifecycle::{Lifecycle, LifecycleEvent, Phase, Signal};
pub use models::{Method, Request, Response};
pub use net::{HttpNetwork, NetError, Network};
pub use worker::CacheWorker;
