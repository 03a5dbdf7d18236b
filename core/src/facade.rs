//! The public entry point: named BibSonomy operations.
//!
//! # Design
//! `BibSonomy` composes the request builder, a `Transport` and the codec.
//! Resource keywords are parsed before any request is built, so a bad
//! keyword never reaches the network. Listings go through the paginator
//! with the configured page ceiling; everything else is a single call.

use tracing::info;

use crate::client::RestClient;
use crate::codec::{self, Decoded};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::paginator::collect_pages;
use crate::transport::{Transport, UreqTransport};
use crate::types::{Document, DocumentContent, Post, PreviewSize, ResourceType, User};

/// Upper bound used when a caller wants "everything".
pub const ALL_POSTS: usize = 10_000_000;

/// BibSonomy API client.
pub struct BibSonomy<T> {
    rest: RestClient,
    transport: T,
}

impl BibSonomy<UreqTransport> {
    /// Client talking to the configured host over blocking HTTP.
    pub fn connect(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(config, UreqTransport::new(config))
    }
}

impl<T: Transport> BibSonomy<T> {
    pub fn new(config: &ClientConfig, transport: T) -> Result<Self, ApiError> {
        Ok(Self {
            rest: RestClient::new(config)?,
            transport,
        })
    }

    /// Posts of `user_name`, optionally restricted to posts carrying all of
    /// `tags`, within `[start, end)`.
    pub fn posts_for_user(
        &self,
        resource_type: &str,
        user_name: &str,
        tags: &[&str],
        start: usize,
        end: usize,
    ) -> Result<Vec<Post>, ApiError> {
        let resource_type: ResourceType = resource_type.parse()?;
        let posts = collect_pages(self.rest.max_posts_per_request(), start, end, |s, e| {
            let request = self.rest.build_posts_for_user(resource_type, user_name, tags, s, e);
            codec::decode_page(&self.fetch_text(&request)?)
        })?;
        info!(user = user_name, %resource_type, count = posts.len(), "collected posts for user");
        Ok(posts)
    }

    /// Posts of all users carrying all of `tags`, within `[start, end)`.
    pub fn posts_for_tag(&self, resource_type: &str, tags: &[&str], start: usize, end: usize) -> Result<Vec<Post>, ApiError> {
        let resource_type: ResourceType = resource_type.parse()?;
        let posts = collect_pages(self.rest.max_posts_per_request(), start, end, |s, e| {
            let request = self.rest.build_posts_for_tag(resource_type, tags, s, e);
            codec::decode_page(&self.fetch_text(&request)?)
        })?;
        info!(?tags, %resource_type, count = posts.len(), "collected posts for tags");
        Ok(posts)
    }

    /// The post of `user_name` whose resource has `intra_hash`.
    pub fn post(&self, user_name: &str, intra_hash: &str) -> Result<Post, ApiError> {
        let body = self.fetch_text(&self.rest.build_get_post(user_name, intra_hash))?;
        codec::decode_page(&body)?
            .and_then(|posts| posts.into_iter().next())
            .ok_or_else(|| ApiError::UnrecognizedShape(format!("no post {intra_hash} for user {user_name}")))
    }

    pub fn user(&self, user_name: &str) -> Result<User, ApiError> {
        let body = self.fetch_text(&self.rest.build_get_user(user_name))?;
        match codec::decode(&body)? {
            Decoded::User(user) => Ok(user),
            _ => Err(ApiError::UnrecognizedShape(format!("expected user {user_name}, got posts"))),
        }
    }

    /// Raw document bytes. `Ok(None)` when the server refused the download;
    /// callers collecting many documents should skip such items.
    pub fn document(&self, document: &Document) -> Result<Option<DocumentContent>, ApiError> {
        let request = self.rest.build_get_document(document)?;
        let response = self.transport.execute(&request)?;
        Ok(self.rest.parse_document(response))
    }

    /// Preview image of a document, with the same degradation as `document`.
    pub fn document_preview(&self, document: &Document, size: PreviewSize) -> Result<Option<DocumentContent>, ApiError> {
        let request = self.rest.build_get_document_preview(document, size)?;
        let response = self.transport.execute(&request)?;
        Ok(self.rest.parse_document_preview(response))
    }

    /// Store `post` for its owner and return the resource hash the server
    /// assigned.
    pub fn create_post(&self, post: &Post) -> Result<String, ApiError> {
        let body = codec::encode_post(post)?;
        let request = self.rest.build_create_post(&post.user.name, body);
        let response = self.transport.execute(&request)?;
        let ack = codec::decode_ack(&self.rest.parse_created(response)?)?;
        let hash = ack
            .get("resourcehash")
            .and_then(|hash| hash.as_str())
            .ok_or_else(|| ApiError::UnrecognizedShape("acknowledgement without resourcehash".to_string()))?;
        info!(user = %post.user.name, resource_hash = hash, "created post");
        Ok(hash.to_string())
    }

    fn fetch_text(&self, request: &HttpRequest) -> Result<String, ApiError> {
        let response = self.transport.execute(request)?;
        self.rest.parse_text(response)
    }
}
