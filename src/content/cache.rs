use crate::content::render::render_html;
use moka::sync::Cache;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Rendered HTML keyed by the xxh3 hash of the markdown it came from.
/// Content-addressed, so an edited post simply misses and re-renders.
pub struct RenderCache {
    inner: Cache<u64, Arc<str>>,
}

impl RenderCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub fn render(&self, markdown: &str) -> Arc<str> {
        let key = xxh3_64(markdown.as_bytes());
        self.inner
            .get_with(key, || Arc::from(render_html(markdown)))
    }

    pub fn contains(&self, markdown: &str) -> bool {
        self.inner.contains_key(&xxh3_64(markdown.as_bytes()))
    }
}
