//! Image requests.

use serde::Serialize;

/// A request to display one logical image.
///
/// `canonical_path` names the original encoding (`/images/avatar.jpg`);
/// sibling paths are derived from it with [`super::format::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageRequest {
    pub canonical_path: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub is_priority: bool,
}

impl ImageRequest {
    pub fn new(canonical_path: impl Into<String>) -> Self {
        Self {
            canonical_path: canonical_path.into(),
            width: None,
            height: None,
            is_priority: false,
        }
    }

    pub fn priority(mut self, is_priority: bool) -> Self {
        self.is_priority = is_priority;
        self
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}
