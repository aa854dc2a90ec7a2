//! Shared helpers: HTML escaping, MIME types, paths and pluralization.

pub mod html;
pub mod mime;
pub mod path;
mod plural;

pub use plural::{plural_count, plural_s};
