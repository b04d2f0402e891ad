use crate::config::ContentConfig;
use crate::content::cache::RenderCache;
use crate::content::frontmatter;
use crate::content::types::{ArchiveMonth, Post, PostMeta};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};

const POST_EXTENSION: &str = "md";

/// Parse a front-matter date: RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// A slug maps to exactly one file directly inside the posts directory.
fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && !slug.contains(['/', '\\'])
        && !slug.contains("..")
}

fn excerpt_of(body: &str, max_chars: usize) -> String {
    let mut excerpt: String = body.trim().chars().take(max_chars).collect();
    excerpt.push_str("...");
    excerpt
}

/// Markdown-backed devblog. Owns no state besides the render cache; every call
/// re-reads the posts directory.
pub struct ContentLoader {
    dir: PathBuf,
    config: ContentConfig,
    cache: RenderCache,
}

impl ContentLoader {
    pub fn new(config: ContentConfig) -> Self {
        Self {
            dir: config.posts_dir.clone(),
            cache: RenderCache::new(config.render_cache_capacity),
            config,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Build a post from its slug and file contents, filling defaults for missing metadata.
    pub fn build_post(
        &self,
        slug: &str,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<Post, serde_yaml::Error> {
        let (meta, body) = frontmatter::parse(source)?;

        let date = match meta.date.as_deref() {
            Some(raw) => parse_date(raw).unwrap_or_else(|| {
                tracing::warn!(slug, date = raw, "unparseable post date, using current time");
                now
            }),
            None => now,
        };

        let html_content = self.cache.render(body).to_string();

        Ok(Post {
            meta: PostMeta {
                slug: slug.to_string(),
                title: meta.title.unwrap_or_else(|| "Untitled".to_string()),
                date,
                author: meta
                    .author
                    .unwrap_or_else(|| self.config.default_author.clone()),
                category: meta
                    .category
                    .unwrap_or_else(|| self.config.default_category.clone()),
                featured_image: meta.featured_image,
                excerpt: meta
                    .excerpt
                    .unwrap_or_else(|| excerpt_of(body, self.config.excerpt_chars)),
                tags: meta.tags.unwrap_or_default(),
            },
            content: body.to_string(),
            html_content,
        })
    }

    /// Slugs of every `.md` file in the posts directory, sorted. Missing directory → empty.
    pub async fn post_slugs(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "posts directory unavailable");
                return Vec::new();
            }
        };

        let mut slugs = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(POST_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                slugs.push(stem.to_string());
            }
        }
        slugs.sort();
        slugs
    }

    pub async fn post_by_slug(&self, slug: &str) -> Option<Post> {
        self.load_post(slug, Utc::now()).await
    }

    async fn load_post(&self, slug: &str, now: DateTime<Utc>) -> Option<Post> {
        if !is_safe_slug(slug) {
            return None;
        }
        let path = self.dir.join(format!("{slug}.{POST_EXTENSION}"));
        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(slug, path = %path.display(), error = %e, "skipping unreadable post");
                return None;
            }
        };

        match self.build_post(slug, &source, now) {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::warn!(slug, error = %e, "skipping post with malformed front-matter");
                None
            }
        }
    }

    /// Every post, newest first.
    pub async fn all_posts(&self) -> Vec<PostMeta> {
        let now = Utc::now();
        let mut posts = Vec::new();
        for slug in self.post_slugs().await {
            if let Some(post) = self.load_post(&slug, now).await {
                posts.push(post.meta);
            }
        }
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        posts
    }

    pub async fn posts_by_category(&self, category: &str) -> Vec<PostMeta> {
        let mut posts = self.all_posts().await;
        posts.retain(|p| p.in_category(category));
        posts
    }

    pub async fn posts_by_tag(&self, tag: &str) -> Vec<PostMeta> {
        let mut posts = self.all_posts().await;
        posts.retain(|p| p.has_tag(tag));
        posts
    }

    pub async fn search(&self, query: &str) -> Vec<PostMeta> {
        let mut posts = self.all_posts().await;
        posts.retain(|p| p.matches_query(query));
        posts
    }

    /// Distinct categories in newest-first post order.
    pub async fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for post in self.all_posts().await {
            if !categories.contains(&post.category) {
                categories.push(post.category);
            }
        }
        categories
    }

    /// Distinct tags in newest-first post order.
    pub async fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in self.all_posts().await.into_iter().flat_map(|p| p.tags) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    pub async fn recent_posts(&self, limit: usize) -> Vec<PostMeta> {
        let mut posts = self.all_posts().await;
        posts.truncate(limit);
        posts
    }

    /// The most recent post.
    pub async fn featured_post(&self) -> Option<PostMeta> {
        self.all_posts().await.into_iter().next()
    }

    /// Posts grouped by `YYYY-MM`, newest month first.
    pub async fn archive(&self) -> Vec<ArchiveMonth> {
        let mut archive: Vec<ArchiveMonth> = Vec::new();
        for post in self.all_posts().await {
            let month = post.month_key();
            match archive.last_mut() {
                Some(bucket) if bucket.month == month => bucket.posts.push(post),
                _ => archive.push(ArchiveMonth {
                    month,
                    posts: vec![post],
                }),
            }
        }
        archive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_for(dir: &Path) -> ContentLoader {
        ContentLoader::new(ContentConfig {
            posts_dir: dir.to_path_buf(),
            ..Default::default()
        })
    }

    fn write_post(dir: &Path, slug: &str, contents: &str) {
        std::fs::write(dir.join(format!("{slug}.md")), contents).unwrap();
    }

    fn seed(dir: &Path) {
        write_post(
            dir,
            "winter-build",
            "---\ntitle: Winter Build\ndate: 2025-01-12\ncategory: Releases\ntags: [Build, snow]\n---\nThe winter build is out.\n",
        );
        write_post(
            dir,
            "meet-liliana",
            "---\ntitle: Meet Liliana\ndate: 2024-12-03\nauthor: Mira\ntags: [characters]\nexcerpt: Our lead.\n---\n# Liliana\n",
        );
        write_post(
            dir,
            "art-pass",
            "---\ntitle: Art Pass\ndate: 2024-12-20T10:00:00Z\ncategory: development updates\ntags: [art, snow]\n---\nNew backgrounds.\n",
        );
        write_post(dir, "broken", "---\ntitle: [oops\n---\nbody");
        std::fs::write(dir.join("notes.txt"), "not a post").unwrap();
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            parse_date("2025-01-12").unwrap().to_rfc3339(),
            "2025-01-12T00:00:00+00:00"
        );
        assert_eq!(
            parse_date("2025-01-12T08:30:00+02:00").unwrap().to_rfc3339(),
            "2025-01-12T06:30:00+00:00"
        );
        assert!(parse_date("2025-01-12 08:30:00").is_some());
        assert!(parse_date("last tuesday").is_none());
    }

    #[test]
    fn test_slug_safety() {
        assert!(is_safe_slug("winter-build"));
        assert!(!is_safe_slug("../secrets"));
        assert!(!is_safe_slug("a/b"));
        assert!(!is_safe_slug(".hidden"));
        assert!(!is_safe_slug(""));
    }

    #[test]
    fn test_build_post_defaults() {
        let loader = loader_for(Path::new("unused"));
        let now = Utc::now();
        let body = "x".repeat(300);
        let post = loader.build_post("untitled", &body, now).unwrap();

        assert_eq!(post.meta.title, "Untitled");
        assert_eq!(post.meta.date, now);
        assert_eq!(post.meta.author, "Veducko");
        assert_eq!(post.meta.category, "Development Updates");
        assert!(post.meta.tags.is_empty());
        assert!(post.meta.featured_image.is_none());
        assert_eq!(post.meta.excerpt, format!("{}...", "x".repeat(160)));
        assert!(post.html_content.starts_with("<p>"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(&dir.path().join("nope"));
        assert!(loader.post_slugs().await.is_empty());
        assert!(loader.all_posts().await.is_empty());
        assert!(loader.featured_post().await.is_none());
        assert!(loader.archive().await.is_empty());
    }

    #[tokio::test]
    async fn test_listing_sorted_newest_first_and_skips_broken() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let loader = loader_for(dir.path());

        assert_eq!(
            loader.post_slugs().await,
            vec!["art-pass", "broken", "meet-liliana", "winter-build"]
        );
        let slugs: Vec<String> = loader.all_posts().await.into_iter().map(|p| p.slug).collect();
        assert_eq!(slugs, vec!["winter-build", "art-pass", "meet-liliana"]);
        assert_eq!(loader.featured_post().await.unwrap().slug, "winter-build");
        assert_eq!(loader.recent_posts(2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_filters_and_search() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let loader = loader_for(dir.path());

        let dev: Vec<String> = loader
            .posts_by_category("DEVELOPMENT UPDATES")
            .await
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(dev, vec!["art-pass", "meet-liliana"]);

        let snow: Vec<String> = loader
            .posts_by_tag("Snow")
            .await
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(snow, vec!["winter-build", "art-pass"]);

        let found = loader.search("our lead").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "meet-liliana");

        assert_eq!(
            loader.categories().await,
            vec!["Releases", "development updates", "Development Updates"]
        );
        assert_eq!(loader.tags().await, vec!["Build", "snow", "art", "characters"]);
    }

    #[tokio::test]
    async fn test_archive_groups_by_month() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let loader = loader_for(dir.path());

        let archive = loader.archive().await;
        let months: Vec<(&str, usize)> = archive
            .iter()
            .map(|m| (m.month.as_str(), m.posts.len()))
            .collect();
        assert_eq!(months, vec![("2025-01", 1), ("2024-12", 2)]);
    }

    #[tokio::test]
    async fn test_post_by_slug() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let loader = loader_for(dir.path());

        let post = loader.post_by_slug("meet-liliana").await.unwrap();
        assert_eq!(post.meta.author, "Mira");
        assert_eq!(post.meta.excerpt, "Our lead.");
        assert!(post.html_content.contains("<h1>Liliana</h1>"));

        assert!(loader.post_by_slug("broken").await.is_none());
        assert!(loader.post_by_slug("missing").await.is_none());
        assert!(loader.post_by_slug("../winter-build").await.is_none());
    }

    #[tokio::test]
    async fn test_unreadable_post_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        std::fs::write(dir.path().join("latin1.md"), b"---\ntitle: Caf\xe9\n---\nbody").unwrap();
        let loader = loader_for(dir.path());

        assert!(loader.post_slugs().await.contains(&"latin1".to_string()));
        assert!(loader.post_by_slug("latin1").await.is_none());
        assert_eq!(loader.all_posts().await.len(), 3);
    }
}
