//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use pgcards_core::ProfileTheme;
use tracing::instrument;

use super::PageContext;
use super::blog::PostView;
use super::shop::ProductCard;
use crate::filters;
use crate::state::AppState;

// =============================================================================
// Static landing content
// =============================================================================

/// A step in the "how it works" strip.
#[derive(Clone)]
pub struct HowItWorksStep {
    pub title: &'static str,
    pub body: &'static str,
}

const HOW_IT_WORKS: [HowItWorksStep; 3] = [
    HowItWorksStep {
        title: "Pick your card",
        body: "PVC, metal or wood, each with an NFC chip and a printed QR code.",
    },
    HowItWorksStep {
        title: "Build your profile",
        body: "Add your details, photos and links, then choose a theme with a live preview.",
    },
    HowItWorksStep {
        title: "Tap to share",
        body: "One tap opens your profile; one more saves you to their contacts.",
    },
];

/// Theme teaser on the landing page.
#[derive(Clone)]
pub struct ThemeTeaser {
    pub slug: &'static str,
    pub label: &'static str,
    pub blurb: &'static str,
}

fn theme_teasers() -> Vec<ThemeTeaser> {
    ProfileTheme::ALL
        .iter()
        .map(|theme| ThemeTeaser {
            slug: theme.as_str(),
            label: theme.label(),
            blurb: match theme {
                ProfileTheme::Standard => "Clean and centred, works for everyone.",
                ProfileTheme::Modern => "Cover photo up top, split header, bold accent.",
                ProfileTheme::Epic => "Dark, full-bleed and made for portfolios.",
            },
        })
        .collect()
}

/// Products shown on the landing page.
const FEATURED_PRODUCTS: usize = 3;

/// Posts shown on the landing page.
const RECENT_POSTS: usize = 3;

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub steps: Vec<HowItWorksStep>,
    pub themes: Vec<ThemeTeaser>,
    pub products: Vec<ProductCard>,
    pub posts: Vec<PostView>,
}

/// Display the landing page.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let products = state.backend().list_products().await.map_or_else(
        |e| {
            tracing::error!("Failed to fetch featured products: {e}");
            Vec::new()
        },
        |products| {
            products
                .iter()
                .take(FEATURED_PRODUCTS)
                .map(ProductCard::from)
                .collect()
        },
    );

    let posts = state
        .content()
        .recent_posts(RECENT_POSTS, None)
        .into_iter()
        .map(PostView::from)
        .collect();

    HomeTemplate {
        page,
        steps: HOW_IT_WORKS.to_vec(),
        themes: theme_teasers(),
        products,
        posts,
    }
}
