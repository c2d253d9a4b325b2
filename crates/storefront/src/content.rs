//! Markdown blog posts.
//!
//! Posts live in `content/blog/*.md` with YAML frontmatter and are loaded
//! once at startup. Filenames may carry a `YYYY-MM-DD-` prefix, which is
//! dropped from the slug.
//!
//! # Image Shortcodes
//!
//! Use the `{{image}}` shortcode to embed CDN images; the URL goes through
//! the same normalisation as profile images:
//!
//! ```markdown
//! {{image "https://res.cloudinary.com/pgcards/image/upload/v1/cards/metal.jpg" alt="Metal card"}}
//! ```

use std::path::Path;
use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use regex::Regex;
use serde::Deserialize;

use crate::profile::cdn::normalize_cdn_image_url;

/// Blog post frontmatter.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub published_at: NaiveDate,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub draft: bool,
}

/// A rendered blog post.
#[derive(Debug, Clone)]
pub struct Post {
    pub slug: String,
    pub meta: PostMeta,
    pub content_html: String,
    pub reading_time_minutes: u32,
}

impl Post {
    /// Publication date for display, e.g. "March 4, 2025".
    #[must_use]
    pub fn published_on(&self) -> String {
        self.meta.published_at.format("%B %-d, %Y").to_string()
    }
}

/// In-memory store of loaded posts, newest first.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    posts: Arc<Vec<Post>>,
}

impl ContentStore {
    /// Load all posts from `<content_dir>/blog`.
    ///
    /// A missing directory yields an empty store; individual files that fail
    /// to parse are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the blog directory exists but cannot be read.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        let dir = content_dir.join("blog");
        let mut posts = Vec::new();

        if !dir.exists() {
            tracing::info!("Blog directory does not exist yet: {:?}", dir);
            return Ok(Self::default());
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| ContentError::Io(e.to_string()))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                match Self::load_post(&path) {
                    Ok(post) => {
                        tracing::info!("Loaded post: {}", post.slug);
                        posts.push(post);
                    }
                    Err(e) => {
                        tracing::error!("Failed to load post {:?}: {}", path, e);
                    }
                }
            }
        }

        posts.sort_by(|a, b| b.meta.published_at.cmp(&a.meta.published_at));
        Ok(Self {
            posts: Arc::new(posts),
        })
    }

    fn load_post(path: &Path) -> Result<Post, ContentError> {
        let content = std::fs::read_to_string(path).map_err(|e| ContentError::Io(e.to_string()))?;
        let filename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ContentError::Parse("Invalid filename".to_string()))?;
        parse_post(&slug_from_filename(filename), &content)
    }

    #[must_use]
    pub fn get_post(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.slug == slug && !p.meta.draft)
    }

    /// Published posts, newest first.
    pub fn published_posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter().filter(|p| !p.meta.draft)
    }

    /// Up to `limit` recent posts, optionally excluding one slug.
    #[must_use]
    pub fn recent_posts(&self, limit: usize, exclude_slug: Option<&str>) -> Vec<&Post> {
        self.published_posts()
            .filter(|p| exclude_slug.is_none_or(|s| p.slug != s))
            .take(limit)
            .collect()
    }
}

/// `2025-01-15-my-post` -> `my-post`.
fn slug_from_filename(filename: &str) -> String {
    let bytes = filename.as_bytes();
    let dated = bytes.len() > 11
        && bytes.get(4) == Some(&b'-')
        && bytes.get(7) == Some(&b'-')
        && bytes.get(10) == Some(&b'-');
    match filename.get(11..) {
        Some(rest) if dated => rest.to_string(),
        _ => filename.to_string(),
    }
}

/// Parse frontmatter and render a post body.
///
/// # Errors
///
/// Returns `ContentError::Parse` for missing or invalid frontmatter.
pub fn parse_post(slug: &str, content: &str) -> Result<Post, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PostMeta> = matter
        .parse(content)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    let word_count = parsed.content.split_whitespace().count();
    let reading_time_minutes = u32::try_from(word_count.div_ceil(200)).unwrap_or(u32::MAX);

    Ok(Post {
        slug: slug.to_string(),
        meta,
        content_html: render_markdown(&parsed.content),
        reading_time_minutes: reading_time_minutes.max(1),
    })
}

/// Render markdown to HTML with GitHub Flavored Markdown extensions.
fn render_markdown(content: &str) -> String {
    let processed = process_shortcodes(content);

    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.header_ids = Some(String::new());
    // Posts are authored in-repo; shortcodes expand to raw HTML.
    options.render.r#unsafe = true;

    markdown_to_html(&processed, &options)
}

// =============================================================================
// Shortcode Processing
// =============================================================================

/// Matches `{{image "url" ...attributes}}`.
static IMAGE_SHORTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\{image\s+"([^"]+)"([^}]*)\}\}"#).expect("Invalid regex"));

/// Extracts `key="value"` attributes.
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("Invalid regex"));

fn process_shortcodes(content: &str) -> String {
    IMAGE_SHORTCODE_RE
        .replace_all(content, |caps: &regex::Captures| {
            let src = caps.get(1).map_or("", |m| m.as_str());
            let attrs = caps.get(2).map_or("", |m| m.as_str());

            let mut alt = String::new();
            let mut caption = String::new();
            for attr in ATTR_RE.captures_iter(attrs) {
                let value = attr.get(2).map_or("", |m| m.as_str());
                match attr.get(1).map(|m| m.as_str()) {
                    Some("alt") => alt = value.to_string(),
                    Some("caption") => caption = value.to_string(),
                    _ => {}
                }
            }

            let src = normalize_cdn_image_url(src);
            let figcaption = if caption.is_empty() {
                String::new()
            } else {
                format!("<figcaption>{caption}</figcaption>")
            };
            format!(
                r#"<figure class="post-figure"><img src="{src}" alt="{alt}" loading="lazy" decoding="async">{figcaption}</figure>"#
            )
        })
        .into_owned()
}

/// Content loading errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const POST: &str = "---\ntitle: Why NFC cards\npublished_at: 2025-03-04\ntags: [nfc]\n---\n\nTap once, share everything.\n\n{{image \"https://res.cloudinary.com/pgcards/image/upload/v1/a.heic\" alt=\"Card\"}}\n";

    #[test]
    fn test_parse_post() {
        let post = parse_post("why-nfc", POST).unwrap();
        assert_eq!(post.meta.title, "Why NFC cards");
        assert_eq!(post.published_on(), "March 4, 2025");
        assert_eq!(post.reading_time_minutes, 1);
        assert!(post.content_html.contains("Tap once"));
        assert!(
            post.content_html
                .contains(r#"src="https://res.cloudinary.com/pgcards/image/upload/v1/a.jpg""#)
        );
    }

    #[test]
    fn test_missing_frontmatter() {
        assert!(parse_post("x", "just text").is_err());
    }

    #[test]
    fn test_slug_from_filename() {
        assert_eq!(slug_from_filename("2025-01-15-my-post"), "my-post");
        assert_eq!(slug_from_filename("plain-post"), "plain-post");
        assert_eq!(slug_from_filename("2025-launch"), "2025-launch");
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let store = ContentStore::load(Path::new("/nonexistent/pgcards-content")).unwrap();
        assert_eq!(store.published_posts().count(), 0);
    }
}
