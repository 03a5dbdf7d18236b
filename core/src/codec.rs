//! JSON wire codec for the BibSonomy REST envelope.
//!
//! # Design
//! Responses are first parsed into a `serde_json::Value` so the envelope
//! (`stat`, then one of `posts` / `post` / `user`) can be dispatched by
//! hand; each post is then deserialized into private `Wire*` DTOs and mapped
//! onto the domain types. Failures inside a post surface as
//! `MalformedPost`, failures of the envelope as `UnrecognizedShape`.
//!
//! Publication attributes outside `PublicationField` are dropped on decode.

use chrono::{DateTime, FixedOffset};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::types::{
    Bookmark, Document, ExtraUrl, Post, Publication, PublicationField, Resource, User, PUBLIC_GROUP,
};

/// A successfully decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Posts(Vec<Post>),
    Post(Post),
    User(User),
}

/// Decode a `{"stat":"ok", ...}` envelope carrying posts, a post or a user.
pub fn decode(body: &str) -> Result<Decoded, ApiError> {
    let mut root = parse_object(body)?;
    match status(&root) {
        Some(stat) if stat == "ok" => {}
        Some(_) => return Err(ApiError::Remote(root.remove("error").unwrap_or(Value::Null))),
        None => return Err(ApiError::UnrecognizedShape("missing \"stat\" field".to_string())),
    }

    if let Some(posts) = root.remove("posts") {
        return decode_post_list(posts).map(Decoded::Posts);
    }
    if let Some(post) = root.remove("post") {
        return decode_post(post).map(Decoded::Post);
    }
    if let Some(user) = root.remove("user") {
        return decode_user(user).map(Decoded::User);
    }
    let keys: Vec<&String> = root.keys().collect();
    Err(ApiError::UnrecognizedShape(format!(
        "expected \"posts\", \"post\" or \"user\", found keys {keys:?}"
    )))
}

/// Decode one page of a paginated listing.
///
/// A blank body means the server had nothing to say and yields `None`. A
/// single-post envelope is accepted as a page of one.
pub fn decode_page(body: &str) -> Result<Option<Vec<Post>>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    match decode(body)? {
        Decoded::Posts(posts) => Ok(Some(posts)),
        Decoded::Post(post) => Ok(Some(vec![post])),
        Decoded::User(_) => Err(ApiError::UnrecognizedShape(
            "expected posts, got a user".to_string(),
        )),
    }
}

/// Validate the acknowledgement of a mutation and return its members.
pub fn decode_ack(body: &str) -> Result<Map<String, Value>, ApiError> {
    let mut root = parse_object(body)?;
    match status(&root).as_deref() {
        Some("ok") => Ok(root),
        Some("fail") => Err(ApiError::Remote(root.remove("error").unwrap_or(Value::Null))),
        _ => Err(ApiError::UnrecognizedShape(format!(
            "acknowledgement without ok/fail status: {}",
            Value::Object(root)
        ))),
    }
}

/// Encode a post into the envelope expected by `POST /users/{user}/posts`.
pub fn encode_post(post: &Post) -> Result<String, ApiError> {
    let (bookmark, bibtex) = match &post.resource {
        Some(Resource::Bookmark(b)) => (Some(WireBookmark::from_domain(b)), None),
        Some(Resource::Publication(p)) => (None, Some(WirePublication::from_domain(p))),
        None => return Err(ApiError::UnsupportedVariant),
    };
    let envelope = OutgoingEnvelope {
        post: OutgoingPost {
            user: WireName::new(&post.user.name),
            group: post.groups.iter().map(|g| WireName::new(g)).collect(),
            tag: post.tags.iter().map(|t| WireName::new(t)).collect(),
            bookmark,
            bibtex,
            description: post.description.clone(),
        },
    };
    serde_json::to_string(&envelope).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn parse_object(body: &str) -> Result<Map<String, Value>, ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::UnrecognizedShape(format!(
            "top-level value is not an object: {other}"
        ))),
    }
}

/// The `stat` member; non-string values count as "not ok".
fn status(root: &Map<String, Value>) -> Option<String> {
    root.get("stat").map(|stat| stat.as_str().unwrap_or_default().to_string())
}

fn decode_post_list(posts: Value) -> Result<Vec<Post>, ApiError> {
    let list: WirePostList =
        serde_json::from_value(posts).map_err(|e| ApiError::UnrecognizedShape(format!("posts: {e}")))?;
    list.post.into_iter().map(decode_post).collect()
}

fn decode_post(value: Value) -> Result<Post, ApiError> {
    let wire: WirePost = serde_json::from_value(value).map_err(|e| ApiError::MalformedPost(e.to_string()))?;
    Ok(wire.into_domain())
}

fn decode_user(value: Value) -> Result<User, ApiError> {
    let wire: WireUser =
        serde_json::from_value(value).map_err(|e| ApiError::UnrecognizedShape(format!("user: {e}")))?;
    Ok(wire.into_domain())
}

/// Accept strings and numbers, the two shapes the API uses for scalars.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let shown = value.to_string();
    scalar_text(value).ok_or_else(|| de::Error::custom(format!("expected string or number, found {shown}")))
}

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

/// `{"name": ...}` objects used for tags, groups and post owners.
#[derive(Debug, Serialize, Deserialize)]
struct WireName {
    name: String,
}

impl WireName {
    fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

#[derive(Debug, Deserialize)]
struct WirePostList {
    #[serde(default)]
    post: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WirePost {
    user: WireUser,
    tag: Vec<WireName>,
    group: Option<Vec<WireName>>,
    postingdate: DateTime<FixedOffset>,
    changedate: DateTime<FixedOffset>,
    bookmark: Option<WireBookmark>,
    bibtex: Option<WirePublication>,
    documents: Option<WireDocuments>,
    description: Option<String>,
}

impl WirePost {
    fn into_domain(self) -> Post {
        let resource = match (self.bookmark, self.bibtex) {
            (Some(bookmark), _) => Some(Resource::Bookmark(bookmark.into_domain())),
            (None, Some(publication)) => Some(Resource::Publication(publication.into_domain())),
            (None, None) => None,
        };
        let groups: Vec<String> = self
            .group
            .map(|groups| groups.into_iter().map(|g| g.name).collect())
            .unwrap_or_default();
        let groups = if groups.is_empty() {
            vec![PUBLIC_GROUP.to_string()]
        } else {
            groups
        };
        Post {
            user: self.user.into_domain(),
            resource,
            tags: self.tag.into_iter().map(|t| t.name).collect(),
            groups,
            create_date: self.postingdate,
            change_date: self.changedate,
            documents: self
                .documents
                .map(|docs| docs.document.into_iter().map(WireDocument::into_domain).collect()),
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireUser {
    name: String,
    homepage: Option<String>,
    realname: Option<String>,
    groups: Option<WireGroupList>,
}

impl WireUser {
    fn into_domain(self) -> User {
        User {
            name: self.name,
            homepage: self.homepage,
            real_name: self.realname,
            groups: self
                .groups
                .map(|list| list.group.into_iter().map(|g| g.name).collect()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireGroupList {
    #[serde(default)]
    group: Vec<WireName>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireBookmark {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    intrahash: String,
    title: String,
    url: String,
}

impl WireBookmark {
    fn from_domain(bookmark: &Bookmark) -> Self {
        Self {
            intrahash: bookmark.intra_hash.clone(),
            title: bookmark.title.clone(),
            url: bookmark.url.clone(),
        }
    }

    fn into_domain(self) -> Bookmark {
        Bookmark {
            intra_hash: self.intrahash,
            title: self.title,
            url: self.url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePublication {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    intrahash: String,
    entrytype: String,
    title: String,
    #[serde(deserialize_with = "scalar_string")]
    year: String,
    #[serde(rename = "bibtexKey")]
    bibtex_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    extraurls: Option<WireExtraUrls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    misc: Option<String>,
    /// Everything else; filtered through `PublicationField` on decode.
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl WirePublication {
    fn from_domain(publication: &Publication) -> Self {
        let rest = publication
            .fields
            .iter()
            .map(|(field, value)| (field.wire_name().to_string(), Value::String(value.clone())))
            .collect();
        Self {
            intrahash: publication.intra_hash.clone(),
            entrytype: publication.entry_type.clone(),
            title: publication.title.clone(),
            year: publication.year.clone(),
            bibtex_key: publication.bibtex_key.clone(),
            extraurls: publication.extra_urls.as_ref().map(|urls| WireExtraUrls {
                url: urls.iter().map(WireExtraUrl::from_domain).collect(),
            }),
            misc: publication.misc.clone(),
            rest,
        }
    }

    fn into_domain(self) -> Publication {
        let fields = self
            .rest
            .into_iter()
            .filter_map(|(key, value)| {
                let field = PublicationField::from_wire_name(&key)?;
                Some((field, scalar_text(value)?))
            })
            .collect();
        Publication {
            intra_hash: self.intrahash,
            entry_type: self.entrytype,
            title: self.title,
            year: self.year,
            bibtex_key: self.bibtex_key,
            fields,
            extra_urls: self
                .extraurls
                .map(|urls| urls.url.into_iter().map(WireExtraUrl::into_domain).collect()),
            misc: self.misc,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireExtraUrls {
    #[serde(default)]
    url: Vec<WireExtraUrl>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireExtraUrl {
    title: String,
    date: DateTime<FixedOffset>,
    href: String,
}

impl WireExtraUrl {
    fn from_domain(extra: &ExtraUrl) -> Self {
        Self {
            title: extra.title.clone(),
            date: extra.date,
            href: extra.href.clone(),
        }
    }

    fn into_domain(self) -> ExtraUrl {
        ExtraUrl {
            title: self.title,
            date: self.date,
            href: self.href,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireDocuments {
    #[serde(default)]
    document: Vec<WireDocument>,
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    filename: String,
    #[serde(rename = "md5Hash")]
    md5_hash: String,
    href: String,
}

impl WireDocument {
    fn into_domain(self) -> Document {
        Document {
            file_name: self.filename,
            md5_hash: self.md5_hash,
            href: self.href,
        }
    }
}

#[derive(Debug, Serialize)]
struct OutgoingEnvelope {
    post: OutgoingPost,
}

#[derive(Debug, Serialize)]
struct OutgoingPost {
    user: WireName,
    group: Vec<WireName>,
    tag: Vec<WireName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bookmark: Option<WireBookmark>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bibtex: Option<WirePublication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}
