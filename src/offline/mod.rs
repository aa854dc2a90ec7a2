//! Offline cache: a cache-first fetch layer over named on-disk stores.
//!
//! Images are looked up in the image store by exact URL, fetched and stored
//! on a miss, and replaced by an inline SVG when the network is gone. Other
//! requests are answered from the current stores or passed through.

pub mod http;
pub mod network;
pub mod storage;
mod worker;

pub use http::{Destination, Request, Response};
pub use network::DirOrigin;
pub use storage::CacheStorage;
pub use worker::{OfflineWorker, StoreNames};
