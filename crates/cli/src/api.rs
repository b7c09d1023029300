//! Hosting API seam. The binary talks to GitHub through [`GistApi`]; tests
//! substitute their own implementation.

use async_trait::async_trait;
use gixt_cache::{FetchError, RawFetcher};
use gixt_protocol::{Gist, GistSummary};
use gixt_resolve::{OwnerGistSource, SourceError};
use std::collections::BTreeMap;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("gist not found: {0}")]
    NotFound(String),

    #[error("GitHub API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode API response: {0}")]
    Decode(String),

    #[error("authentication required: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[async_trait]
pub trait GistApi: Send + Sync {
    /// A gist at its latest revision, or at `git_ref` when given.
    async fn fetch(&self, id: &str, git_ref: Option<&str>) -> ApiResult<Gist>;

    async fn list_mine(&self, per_page: u32, max_pages: u32) -> ApiResult<Vec<GistSummary>>;

    async fn list_for_owner(
        &self,
        owner: &str,
        per_page: u32,
        max_pages: u32,
    ) -> ApiResult<Vec<GistSummary>>;

    /// Replace (or add) files by name; returns the updated gist.
    async fn update_files(&self, id: &str, files: &BTreeMap<String, String>) -> ApiResult<Gist>;

    async fn update_description(&self, id: &str, description: &str) -> ApiResult<Gist>;

    /// New gist owned by the authenticated user.
    async fn create(
        &self,
        files: &BTreeMap<String, String>,
        description: &str,
        public: bool,
    ) -> ApiResult<Gist>;

    /// Login of the authenticated user.
    async fn current_user(&self) -> ApiResult<String>;

    async fn fetch_raw(&self, url: &str) -> ApiResult<Vec<u8>>;
}

/// Lets a [`GistApi`] serve the resolver's live lookup and the
/// materializer's raw downloads.
pub struct ApiBridge<'a>(pub &'a dyn GistApi);

#[async_trait]
impl OwnerGistSource for ApiBridge<'_> {
    async fn list_for_owner(
        &self,
        owner: &str,
        per_page: u32,
        max_pages: u32,
    ) -> std::result::Result<Vec<GistSummary>, SourceError> {
        Ok(self.0.list_for_owner(owner, per_page, max_pages).await?)
    }
}

#[async_trait]
impl RawFetcher for ApiBridge<'_> {
    async fn fetch_raw(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        Ok(self.0.fetch_raw(url).await?)
    }
}
