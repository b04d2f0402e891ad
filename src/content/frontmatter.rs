use serde::Deserialize;

/// Metadata block at the top of a post. Every field is optional; the loader fills defaults.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Split a document into its raw front-matter block and body.
///
/// The block must open on the first line with `---` and close with a line holding only
/// `---`. Anything else means the whole document is body.
pub fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);

    let Some(first_end) = source.find('\n') else {
        return (None, source);
    };
    if source[..first_end].trim_end() != "---" {
        return (None, source);
    }

    let block_start = first_end + 1;
    let mut offset = block_start;
    for line in source[block_start..].split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&source[block_start..offset]), &source[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, source)
}

/// Parse the front-matter of `source`, returning the metadata and the body.
pub fn parse(source: &str) -> Result<(FrontMatter, &str), serde_yaml::Error> {
    match split_front_matter(source) {
        (Some(block), body) if !block.trim().is_empty() => Ok((serde_yaml::from_str(block)?, body)),
        (_, body) => Ok((FrontMatter::default(), body)),
    }
}
