//! Persistence types.

use chrono::{DateTime, Utc};
use picpost_shared::types::UserId;
use serde::{Deserialize, Serialize};

/// Confirmation that the user's record now points at `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Whose record was written.
    pub user_id: UserId,
    /// The stored image URL.
    pub url: String,
    /// When the write was acknowledged.
    pub written_at: DateTime<Utc>,
}

/// The image reference currently stored for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserImageRecord {
    /// Owner of the record.
    pub user_id: UserId,
    /// Last successfully persisted image URL.
    pub image_url: String,
}
