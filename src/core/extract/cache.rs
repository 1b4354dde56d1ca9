//! Extraction cache

use crate::domain::field::SourceFieldBag;
use crate::domain::ids::EpisodeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Cache of extracted source bags keyed by episode
///
/// Entries live until they are invalidated explicitly.
pub trait ExtractionCache: Send + Sync {
    fn get(&self, episode_id: EpisodeId) -> Option<Arc<SourceFieldBag>>;

    fn put(&self, episode_id: EpisodeId, bag: Arc<SourceFieldBag>);

    /// Drops one entry; returns whether it existed
    fn invalidate(&self, episode_id: EpisodeId) -> bool;

    fn clear(&self);
}

/// Process-local [`ExtractionCache`]
#[derive(Debug, Default)]
pub struct InMemoryExtractionCache {
    entries: RwLock<HashMap<EpisodeId, Arc<SourceFieldBag>>>,
}

impl InMemoryExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExtractionCache for InMemoryExtractionCache {
    fn get(&self, episode_id: EpisodeId) -> Option<Arc<SourceFieldBag>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&episode_id)
            .cloned()
    }

    fn put(&self, episode_id: EpisodeId, bag: Arc<SourceFieldBag>) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(episode_id, bag);
    }

    fn invalidate(&self, episode_id: EpisodeId) -> bool {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&episode_id)
            .is_some()
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
