//! Transfer output.

use serde::{Deserialize, Serialize};

/// Where a confirmed upload lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLocator {
    /// Storage key, `users/{user_id}/{filename}`.
    pub path: String,
    /// URL that resolves to the stored bytes.
    pub url: String,
    /// Size the store reported after the write.
    pub size: u64,
}
