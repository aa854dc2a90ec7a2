//! Resource hints and batched preloading.

mod document;
pub mod hint;
mod scheduler;

pub use document::HtmlDocument;
pub use scheduler::{PreloadOptions, PreloadScheduler};
