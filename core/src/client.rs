//! Stateless request builder and response parser for the BibSonomy REST API.
//!
//! # Design
//! `RestClient` holds the API root, the Basic-auth header and the page
//! ceiling, and carries no mutable state between calls. Each endpoint is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`; a `Transport` runs the
//! round-trip in between. Status codes are the only part of a response
//! interpreted here; payloads go to `codec`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Document, DocumentContent, PreviewSize, ResourceType};

const PREVIEW_CONTENT_TYPE: &str = "image/jpeg";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Builds authenticated requests and checks response statuses.
#[derive(Clone)]
pub struct RestClient {
    base_url: Url,
    authorization: String,
    max_posts_per_request: usize,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::Config(format!("invalid base URL {:?}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("base URL {:?} cannot carry a path", config.base_url)));
        }
        let credentials = STANDARD.encode(format!("{}:{}", config.user_name, config.api_key));
        Ok(Self {
            base_url,
            authorization: format!("Basic {credentials}"),
            max_posts_per_request: config.max_posts_per_request,
        })
    }

    /// Most posts the server hands out per request.
    pub fn max_posts_per_request(&self) -> usize {
        self.max_posts_per_request
    }

    /// `GET /users/{user}/posts?resourcetype=&tags=&start=&end=`
    pub fn build_posts_for_user(
        &self,
        resource_type: ResourceType,
        user_name: &str,
        tags: &[&str],
        start: usize,
        end: usize,
    ) -> HttpRequest {
        let url = self.endpoint(&["users", user_name, "posts"], &listing_query(resource_type, tags, start, end));
        self.get(url)
    }

    /// `GET /posts?resourcetype=&tags=&start=&end=`
    pub fn build_posts_for_tag(&self, resource_type: ResourceType, tags: &[&str], start: usize, end: usize) -> HttpRequest {
        let url = self.endpoint(&["posts"], &listing_query(resource_type, tags, start, end));
        self.get(url)
    }

    /// `GET /users/{user}/posts/{hash}`
    pub fn build_get_post(&self, user_name: &str, intra_hash: &str) -> HttpRequest {
        self.get(self.endpoint(&["users", user_name, "posts", intra_hash], &[]))
    }

    /// `GET /users/{user}`
    pub fn build_get_user(&self, user_name: &str) -> HttpRequest {
        self.get(self.endpoint(&["users", user_name], &[]))
    }

    /// `POST /users/{user}/posts` with an already encoded post as body.
    pub fn build_create_post(&self, user_name: &str, body: String) -> HttpRequest {
        let url = self.endpoint(&["users", user_name, "posts"], &[]);
        HttpRequest {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![
                ("authorization".to_string(), self.authorization.clone()),
                ("accept".to_string(), "application/json".to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        }
    }

    /// Plain authenticated GET of the document's own href.
    pub fn build_get_document(&self, document: &Document) -> Result<HttpRequest, ApiError> {
        let url = self.document_url(document)?;
        Ok(self.raw_get(url))
    }

    /// Like `build_get_document`, asking for a rendered preview image.
    pub fn build_get_document_preview(&self, document: &Document, size: PreviewSize) -> Result<HttpRequest, ApiError> {
        let mut url = self.document_url(document)?;
        url.query_pairs_mut().append_pair("preview", size.as_param());
        Ok(self.raw_get(url))
    }

    /// Body of a `200 OK` response.
    pub fn parse_text(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200)?;
        into_text(response)
    }

    /// Body of a `201 Created` response.
    pub fn parse_created(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 201)?;
        into_text(response)
    }

    /// Document bytes, or `None` when the server did not answer `200 OK`.
    pub fn parse_document(&self, response: HttpResponse) -> Option<DocumentContent> {
        into_content(response, FALLBACK_CONTENT_TYPE)
    }

    /// Preview bytes, or `None` when the server did not answer `200 OK`.
    pub fn parse_document_preview(&self, response: HttpResponse) -> Option<DocumentContent> {
        into_content(response, PREVIEW_CONTENT_TYPE)
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("format", "json");
        }
        url
    }

    fn document_url(&self, document: &Document) -> Result<Url, ApiError> {
        self.base_url
            .join(&document.href)
            .map_err(|e| ApiError::MalformedPost(format!("document href {:?}: {e}", document.href)))
    }

    fn get(&self, url: Url) -> HttpRequest {
        let mut request = self.raw_get(url);
        request.headers.push(("accept".to_string(), "application/json".to_string()));
        request
    }

    fn raw_get(&self, url: Url) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: vec![("authorization".to_string(), self.authorization.clone())],
            body: None,
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("max_posts_per_request", &self.max_posts_per_request)
            .finish_non_exhaustive()
    }
}

/// Query of the two listing endpoints. Tags are space-joined, which the
/// form encoding turns into `+`.
fn listing_query(resource_type: ResourceType, tags: &[&str], start: usize, end: usize) -> Vec<(&'static str, String)> {
    let mut query = vec![("resourcetype", resource_type.as_keyword().to_string())];
    if !tags.is_empty() {
        query.push(("tags", tags.join(" ")));
    }
    query.push(("start", start.to_string()));
    query.push(("end", end.to_string()));
    query
}

/// Map anything but the expected status to `ApiError::Transport`.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    Err(ApiError::Transport {
        status: response.status,
        body: response.text().into_owned(),
    })
}

/// Body as UTF-8; invalid sequences are an error, never repaired.
fn into_text(response: HttpResponse) -> Result<String, ApiError> {
    String::from_utf8(response.body).map_err(|e| ApiError::Deserialization(format!("body is not UTF-8: {e}")))
}

fn into_content(response: HttpResponse, fallback_type: &str) -> Option<DocumentContent> {
    if response.status != 200 {
        warn!(status = response.status, "document download failed");
        return None;
    }
    let content_type = response.content_type().unwrap_or(fallback_type).to_string();
    Some(DocumentContent {
        bytes: response.body,
        content_type,
    })
}
