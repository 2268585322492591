//! Static content page handlers (about, FAQ, privacy, terms).

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// A content page, rendered.
#[derive(Debug, Serialize)]
pub struct PageView {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub updated_at: Option<NaiveDate>,
    pub html: String,
}

/// Page listing entry.
#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub slug: String,
    pub title: String,
}

/// Page listing response.
#[derive(Debug, Serialize)]
pub struct PageListResponse {
    pub pages: Vec<PageSummary>,
}

/// List available content pages.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<PageListResponse> {
    let mut pages: Vec<PageSummary> = state
        .content()
        .get_all_pages()
        .map(|page| PageSummary {
            slug: page.slug.clone(),
            title: page.meta.title.clone(),
        })
        .collect();
    pages.sort_by(|a, b| a.slug.cmp(&b.slug));

    Json(PageListResponse { pages })
}

/// Show one content page.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PageView>> {
    let page = state
        .content()
        .get_page(&slug)
        .ok_or_else(|| AppError::NotFound(format!("page {slug}")))?;

    Ok(Json(PageView {
        slug: page.slug.clone(),
        title: page.meta.title.clone(),
        description: page.meta.description.clone(),
        updated_at: page.meta.updated_at,
        html: page.content_html.clone(),
    }))
}
