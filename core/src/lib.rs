//! Synchronous client for the BibSonomy REST API.
//!
//! # Overview
//! Fetches bookmark and publication posts, users and attached documents,
//! and creates posts. Listings are paginated transparently against the
//! server's per-request ceiling.
//!
//! # Design
//! - `codec` maps the vendor's JSON envelope to the typed model in `types`
//!   and back; it never does I/O.
//! - `RestClient` builds `HttpRequest` values and checks `HttpResponse`
//!   statuses (host-does-IO); a `Transport` executes them. `UreqTransport`
//!   is the blocking production transport.
//! - `paginator` concatenates windows until a short page, an empty fetch or
//!   the requested end.
//! - `BibSonomy` is the facade application code talks to.
//! - All configuration, including the page ceiling, lives in
//!   `ClientConfig`, so independent clients can coexist.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod facade;
pub mod http;
pub mod paginator;
pub mod transport;
pub mod types;

pub use client::RestClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use facade::{BibSonomy, ALL_POSTS};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Bookmark, Document, DocumentContent, ExtraUrl, Post, PreviewSize, Publication, PublicationField, Resource,
    ResourceType, User,
};
