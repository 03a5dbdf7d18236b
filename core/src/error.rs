//! Error types for the BibSonomy client.
//!
//! # Design
//! Every fault propagates to the caller unmodified. The only "absence is not
//! an error" cases (an empty posts list, a post without a known resource, a
//! failed document download) never reach this type at all.

use thiserror::Error;

/// Errors returned by the codec, request builder, transports and facade.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status other than the one the call expects.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// The payload said `"stat":"fail"` (or anything but `"ok"`). Carries the
    /// vendor's `error` value verbatim.
    #[error("remote API reported failure: {0}")]
    Remote(serde_json::Value),

    /// The envelope parsed as JSON but matches none of the known shapes.
    #[error("unrecognized response shape: {0}")]
    UnrecognizedShape(String),

    /// A post entry lacks a required part (user, tags, timestamps) or has a
    /// resource with missing fields.
    #[error("malformed post: {0}")]
    MalformedPost(String),

    /// The caller-supplied resource keyword is not in the known vocabulary.
    #[error("unknown resource type: {0:?}")]
    UnknownResourceType(String),

    /// The post carries no resource, so there is nothing to encode.
    #[error("post resource has no wire representation")]
    UnsupportedVariant,

    /// The response body is not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("network error: {0}")]
    Network(String),

    /// Client configuration is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}
