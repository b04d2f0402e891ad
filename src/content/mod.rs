pub mod cache;
pub mod frontmatter;
pub mod handler;
pub mod loader;
pub mod render;
pub mod types;
