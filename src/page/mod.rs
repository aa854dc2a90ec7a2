//! Built pages: image discovery, URL resolution and source edits.

mod edit;
mod scan;
mod url;

pub use edit::{Edits, with_attrs};
pub use scan::{ImgTag, scan_images};
pub use url::{page_url, resolve_src};
