//! Blog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

use super::PageContext;
use crate::content::Post;
use crate::error::{AppError, Result};
use crate::filters;
use crate::state::AppState;

/// Post view for templates.
#[derive(Clone)]
pub struct PostView {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_on: String,
    pub featured_image: Option<String>,
    pub tags: Vec<String>,
    pub content_html: String,
    pub reading_time_minutes: u32,
}

impl From<&Post> for PostView {
    fn from(post: &Post) -> Self {
        Self {
            slug: post.slug.clone(),
            title: post.meta.title.clone(),
            description: post.meta.description.clone(),
            author: post.meta.author.clone(),
            published_on: post.published_on(),
            featured_image: post.meta.featured_image.clone(),
            tags: post.meta.tags.clone(),
            content_html: post.content_html.clone(),
            reading_time_minutes: post.reading_time_minutes,
        }
    }
}

/// Blog index page template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub page: PageContext,
    pub posts: Vec<PostView>,
}

/// Blog post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub page: PageContext,
    pub post: PostView,
    pub recent_posts: Vec<PostView>,
    /// Base URL for canonical links.
    pub base_url: String,
}

/// Number of recent posts to show in sidebar.
const RECENT_POSTS_COUNT: usize = 3;

/// Display the blog index page with all published posts.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let posts = state
        .content()
        .published_posts()
        .map(PostView::from)
        .collect();
    BlogIndexTemplate { page, posts }
}

/// Display a single blog post by slug.
///
/// # Errors
///
/// Returns 404 if the post doesn't exist or is a draft.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let post = state
        .content()
        .get_post(&slug)
        .ok_or_else(|| AppError::NotFound(format!("Post {slug}")))?;

    let recent_posts = state
        .content()
        .recent_posts(RECENT_POSTS_COUNT, Some(&slug))
        .into_iter()
        .map(PostView::from)
        .collect();

    Ok(BlogShowTemplate {
        page,
        post: PostView::from(post),
        recent_posts,
        base_url: state.config().base_url.clone(),
    })
}

/// Create the blog routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{slug}", get(show))
}
