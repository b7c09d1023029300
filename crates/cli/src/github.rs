use crate::api::{ApiError, ApiResult, GistApi};
use async_trait::async_trait;
use gixt_protocol::{Gist, GistSummary};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const API_URL_ENV: &str = "GIXT_API_URL";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
const GH_TOKEN_TIMEOUT: Duration = Duration::from_secs(2);
const ACCEPT: &str = "application/vnd.github+json";

/// REST client for the GitHub gist endpoints.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .user_agent(concat!("gixt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Base URL from `GIXT_API_URL`; token from `GITHUB_TOKEN`, `GH_TOKEN`,
    /// or the GitHub CLI.
    pub async fn from_env() -> ApiResult<Self> {
        let base = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(base, discover_token().await)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header(header::ACCEPT, ACCEPT);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn require_token(&self, what: &str) -> ApiResult<()> {
        if self.token.is_none() {
            return Err(ApiError::Auth(format!(
                "{what} needs a token (set GITHUB_TOKEN or run `gh auth login`)"
            )));
        }
        Ok(())
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, subject: &str) -> ApiResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let response = check_status(response, subject).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn list_pages(&self, path: &str, per_page: u32, max_pages: u32) -> ApiResult<Vec<GistSummary>> {
        let per_page = if per_page == 0 { 50 } else { per_page };
        let mut all = Vec::new();
        for page in 1..=max_pages.max(1) {
            let builder = self
                .request(Method::GET, path)
                .query(&[("per_page", per_page), ("page", page)]);
            let batch: Vec<GistSummary> = self.send(builder, path).await?;
            let short = batch.len() < per_page as usize;
            all.extend(batch);
            if short {
                break;
            }
        }
        Ok(all)
    }
}

async fn check_status(response: Response, subject: &str) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(subject.to_string()),
        StatusCode::UNAUTHORIZED => ApiError::Auth(message.trim().to_string()),
        _ => ApiError::Status {
            status: status.as_u16(),
            message: message.trim().to_string(),
        },
    })
}

fn file_contents(files: &BTreeMap<String, String>) -> serde_json::Map<String, serde_json::Value> {
    files
        .iter()
        .map(|(name, content)| (name.clone(), serde_json::json!({ "content": content })))
        .collect()
}

async fn discover_token() -> Option<String> {
    for key in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Some(token) = std::env::var(key).ok().filter(|t| !t.trim().is_empty()) {
            log::debug!("using token from {key}");
            return Some(token.trim().to_string());
        }
    }
    gh_auth_token().await
}

/// Best effort; a missing or slow `gh` just means no token.
async fn gh_auth_token() -> Option<String> {
    let mut command = tokio::process::Command::new("gh");
    command.args(["auth", "token"]).kill_on_drop(true);
    let output = match tokio::time::timeout(GH_TOKEN_TIMEOUT, command.output()).await {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(_)) | Ok(Err(_)) => return None,
        Err(_) => {
            log::debug!("gh auth token timed out");
            return None;
        }
    };
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl GistApi for GitHubClient {
    async fn fetch(&self, id: &str, git_ref: Option<&str>) -> ApiResult<Gist> {
        let path = match git_ref.filter(|r| !r.trim().is_empty()) {
            Some(r) => format!("/gists/{id}/{r}"),
            None => format!("/gists/{id}"),
        };
        log::debug!("GET {path}");
        self.send(self.request(Method::GET, &path), id).await
    }

    async fn list_mine(&self, per_page: u32, max_pages: u32) -> ApiResult<Vec<GistSummary>> {
        self.require_token("listing your gists")?;
        self.list_pages("/gists", per_page, max_pages).await
    }

    async fn list_for_owner(
        &self,
        owner: &str,
        per_page: u32,
        max_pages: u32,
    ) -> ApiResult<Vec<GistSummary>> {
        self.list_pages(&format!("/users/{owner}/gists"), per_page, max_pages)
            .await
    }

    async fn update_files(&self, id: &str, files: &BTreeMap<String, String>) -> ApiResult<Gist> {
        self.require_token("updating a gist")?;
        let builder = self
            .request(Method::PATCH, &format!("/gists/{id}"))
            .json(&serde_json::json!({ "files": file_contents(files) }));
        self.send(builder, id).await
    }

    async fn update_description(&self, id: &str, description: &str) -> ApiResult<Gist> {
        self.require_token("updating a gist")?;
        let builder = self
            .request(Method::PATCH, &format!("/gists/{id}"))
            .json(&serde_json::json!({ "description": description }));
        self.send(builder, id).await
    }

    async fn create(
        &self,
        files: &BTreeMap<String, String>,
        description: &str,
        public: bool,
    ) -> ApiResult<Gist> {
        self.require_token("creating a gist")?;
        let builder = self.request(Method::POST, "/gists").json(&serde_json::json!({
            "description": description,
            "public": public,
            "files": file_contents(files),
        }));
        self.send(builder, "new gist").await
    }

    async fn current_user(&self) -> ApiResult<String> {
        self.require_token("detecting the current user")?;
        let user: UserResponse = self.send(self.request(Method::GET, "/user"), "user").await?;
        Ok(user.login)
    }

    async fn fetch_raw(&self, url: &str) -> ApiResult<Vec<u8>> {
        if url.trim().is_empty() {
            return Err(ApiError::Decode("file has no raw URL".into()));
        }
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let response = check_status(response, url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}
