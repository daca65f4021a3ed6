//! LRU cache of rendered thumbnails.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::Thumbnail;
use crate::document::Generation;
use crate::model::PageId;

/// Cache key: one render of one page of one load at one scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailKey {
    /// Load the thumbnail was rendered from.
    pub generation: Generation,
    /// Page in the model.
    pub page_id: PageId,
    /// Scale stored as thousandths for stable hashing.
    pub scale_millis: u32,
}

impl ThumbnailKey {
    /// Build a key.
    pub fn new(generation: Generation, page_id: PageId, scale: f32) -> Self {
        Self {
            generation,
            page_id,
            scale_millis: (scale * 1000.0).round() as u32,
        }
    }
}

/// LRU cache holding thumbnails of a single generation.
///
/// Inserting a thumbnail from another generation drops everything cached so
/// far: new source bytes invalidate every earlier render.
pub struct ThumbnailCache {
    cache: LruCache<ThumbnailKey, Thumbnail>,
    generation: Option<Generation>,
}

impl ThumbnailCache {
    /// Create a cache holding up to `capacity` thumbnails (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            generation: None,
        }
    }

    /// Get a cached thumbnail, promoting it in the LRU order.
    pub fn get(&mut self, key: &ThumbnailKey) -> Option<Thumbnail> {
        self.cache.get(key).cloned()
    }

    /// Insert a thumbnail, switching generation if needed.
    pub fn insert(&mut self, thumbnail: Thumbnail) {
        self.switch_generation(thumbnail.generation);
        self.cache.put(thumbnail.key(), thumbnail);
    }

    /// Drop all entries unless they belong to `generation`.
    pub fn switch_generation(&mut self, generation: Generation) {
        if self.generation != Some(generation) {
            self.cache.clear();
            self.generation = Some(generation);
        }
    }

    /// Generation currently cached.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    /// Number of cached thumbnails.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document;
    use crate::model::PageModel;
    use crate::testing;
    use crate::thumbnail::{CancelToken, ThumbnailRun};

    fn render_all(capacity: usize, pages: usize) -> (ThumbnailCache, Vec<Thumbnail>) {
        let loaded = document::load("cache.pdf", &testing::sample_pdf(pages)).unwrap();
        let model = PageModel::initialize(pages);
        let thumbnails: Vec<Thumbnail> = ThumbnailRun::new(&loaded, &model.snapshot(), 0.1, CancelToken::new())
            .filter_map(|r| r.ok())
            .collect();
        let mut cache = ThumbnailCache::new(capacity);
        for thumbnail in &thumbnails {
            cache.insert(thumbnail.clone());
        }
        (cache, thumbnails)
    }

    #[test]
    fn test_insert_and_get() {
        let (mut cache, thumbnails) = render_all(10, 2);
        assert_eq!(cache.len(), 2);
        let hit = cache.get(&thumbnails[0].key()).unwrap();
        assert_eq!(hit.page_id, thumbnails[0].page_id);
    }

    #[test]
    fn test_lru_eviction() {
        let (mut cache, thumbnails) = render_all(2, 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&thumbnails[0].key()).is_none());
        assert!(cache.get(&thumbnails[2].key()).is_some());
    }

    #[test]
    fn test_new_generation_clears_cache() {
        let (mut cache, thumbnails) = render_all(10, 2);
        let (_, newer) = render_all(10, 1);

        cache.insert(newer[0].clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.generation(), Some(newer[0].generation));
        assert!(cache.get(&thumbnails[1].key()).is_none());
    }

    #[test]
    fn test_key_scale_rounding() {
        let loaded = document::load("k.pdf", &testing::sample_pdf(1)).unwrap();
        let id = PageModel::initialize(1).ids()[0];
        assert_eq!(
            ThumbnailKey::new(loaded.generation, id, 0.4),
            ThumbnailKey::new(loaded.generation, id, 0.4000001)
        );
        assert_ne!(
            ThumbnailKey::new(loaded.generation, id, 0.4),
            ThumbnailKey::new(loaded.generation, id, 0.2)
        );
    }
}
