pub mod document;
pub mod writer;

pub use document::{JsonDocument, Update};
