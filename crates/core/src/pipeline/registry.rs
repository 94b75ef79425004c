//! Per-user session registry.

use std::sync::Arc;

use dashmap::DashMap;
use picpost_shared::types::UserId;

use super::session::{PipelineStages, UploadSession};
use crate::transform::TransformSpec;

/// Hands out one [`UploadSession`] per user. Runs of different users are
/// independent; each user still gets at most one run in flight.
#[derive(Debug)]
pub struct SessionRegistry {
    stages: PipelineStages,
    default_spec: TransformSpec,
    sessions: DashMap<UserId, Arc<UploadSession>>,
}

impl SessionRegistry {
    /// Create an empty registry whose sessions share `stages`.
    #[must_use]
    pub fn new(stages: PipelineStages, default_spec: TransformSpec) -> Self {
        Self {
            stages,
            default_spec,
            sessions: DashMap::new(),
        }
    }

    /// The session for `user_id`, created on first use.
    pub fn session(&self, user_id: UserId) -> Arc<UploadSession> {
        self.sessions
            .entry(user_id)
            .or_insert_with(|| {
                Arc::new(UploadSession::new(
                    user_id,
                    self.stages.clone(),
                    self.default_spec,
                ))
            })
            .clone()
    }

    /// The session for `user_id`, if one was created.
    #[must_use]
    pub fn get(&self, user_id: UserId) -> Option<Arc<UploadSession>> {
        self.sessions.get(&user_id).map(|s| Arc::clone(s.value()))
    }

    /// Drop the user's session. Streams already handed out keep running.
    pub fn remove(&self, user_id: UserId) -> Option<Arc<UploadSession>> {
        self.sessions.remove(&user_id).map(|(_, session)| session)
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session was created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
