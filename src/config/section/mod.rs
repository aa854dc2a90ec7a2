//! Configuration section definitions.
//!
//! Each module corresponds to a section in `pixfall.toml`:
//!
//! | Module    | TOML Section | Purpose                              |
//! |-----------|--------------|--------------------------------------|
//! | `site`    | `[site]`     | Built site directory and origin      |
//! | `images`  | `[images]`   | Originals and variant encoding       |
//! | `preload` | `[preload]`  | Critical images and batch scheduling |
//! | `cache`   | `[cache]`    | Offline cache stores and precaching  |
//! | `serve`   | `[serve]`    | Development server                   |

mod cache;
mod images;
mod preload;
mod serve;
mod site;

pub use cache::CacheConfig;
pub use images::ImagesConfig;
pub use preload::PreloadConfig;
pub use serve::ServeConfig;
pub use site::SiteConfig;
