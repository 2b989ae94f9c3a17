//! Favorite blog covers.
//!
//! The document store limits `in` queries to ten ids, so favorites are
//! resolved in batches. Ids that no longer resolve to a cover are reported
//! back as outdated so the caller can prune them.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most ids a single cover query may ask for.
pub const FAVORITES_BATCH_SIZE: usize = 10;

#[derive(Error, Debug)]
pub enum FavoritesError {
    #[error("Document store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogCover {
    pub blog_id: String,
    pub post_title: String,
    pub post_image_cover: String,
    pub post_likes_count: i64,
    pub author_uid: String,
}

/// Read access to the `blog_covers` collection.
#[async_trait]
pub trait CoverSource: Send + Sync {
    /// Fetch the covers that exist among `ids`. Never called with more than
    /// `FAVORITES_BATCH_SIZE` ids.
    async fn fetch_covers(&self, ids: &[String]) -> Result<Vec<BlogCover>, FavoritesError>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FavoriteCovers {
    pub covers: Vec<BlogCover>,
    /// Requested ids with no matching cover, in request order.
    pub outdated: Vec<String>,
}

/// Resolve favorite ids to covers, batching the reads.
pub async fn fetch_favorite_covers(
    source: &dyn CoverSource,
    ids: &[String],
) -> Result<FavoriteCovers, FavoritesError> {
    let mut covers = Vec::new();

    for batch in ids.chunks(FAVORITES_BATCH_SIZE) {
        let fetched = source.fetch_covers(batch).await?;
        tracing::debug!(requested = batch.len(), found = fetched.len(), "fetched cover batch");
        covers.extend(fetched);
    }

    let found: HashSet<&str> = covers.iter().map(|c| c.blog_id.as_str()).collect();
    let outdated = ids
        .iter()
        .filter(|id| !found.contains(id.as_str()))
        .cloned()
        .collect();

    Ok(FavoriteCovers { covers, outdated })
}

pub fn is_favorite(favorite_ids: &[String], blog_id: &str) -> bool {
    favorite_ids.iter().any(|id| id == blog_id)
}
