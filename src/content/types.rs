use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing view of a post.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostMeta {
    pub slug: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub author: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    pub excerpt: String,
    pub tags: Vec<String>,
}

impl PostMeta {
    pub fn in_category(&self, category: &str) -> bool {
        self.category.to_lowercase() == category.to_lowercase()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }

    /// Case-insensitive substring match over title, excerpt and tags.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.excerpt.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }

    /// `YYYY-MM` bucket used by the archive.
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// A full post: metadata, markdown source and rendered HTML.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(flatten)]
    pub meta: PostMeta,
    pub content: String,
    pub html_content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ArchiveMonth {
    pub month: String,
    pub posts: Vec<PostMeta>,
}

/// Query parameters for `GET /api/posts`.
#[derive(Debug, Default, Deserialize)]
pub struct PostListParams {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub q: Option<String>,
}

impl PostListParams {
    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn category(&self) -> Option<&str> {
        Self::non_empty(&self.category)
    }

    pub fn tag(&self) -> Option<&str> {
        Self::non_empty(&self.tag)
    }

    pub fn query(&self) -> Option<&str> {
        Self::non_empty(&self.q)
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

impl RecentParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(3).clamp(1, 50)
    }
}
