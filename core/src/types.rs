//! Domain model for BibSonomy posts, resources, users and documents.
//!
//! # Design
//! These types never appear on the wire directly; `codec` maps them to and
//! from the vendor's JSON envelope. The resource variant is a sum type and
//! the open-ended bibliographic attributes of a publication are a map keyed
//! by the closed `PublicationField` enum, so "present" and "absent" are
//! explicit rather than probed at runtime.
//!
//! Everything derives `Serialize` so host programs can dump decoded posts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::error::ApiError;

/// Kind of resource a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Bookmark,
    Publication,
}

impl ResourceType {
    /// The keyword the REST API expects in `resourcetype=`.
    pub fn as_keyword(self) -> &'static str {
        match self {
            ResourceType::Bookmark => "bookmark",
            ResourceType::Publication => "bibtex",
        }
    }
}

impl FromStr for ResourceType {
    type Err = ApiError;

    /// Accepts the sloppy spellings users tend to type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bookmark" | "bookmarks" | "book" | "link" | "links" | "url" => Ok(ResourceType::Bookmark),
            "bibtex" | "pub" | "publ" | "publication" | "publications" => Ok(ResourceType::Publication),
            _ => Err(ApiError::UnknownResourceType(s.to_string())),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_keyword())
    }
}

/// Supplementary bibliographic fields a publication may carry.
///
/// The intra hash is part of the closed wire vocabulary too, but it is the
/// resource's identity and lives in `Publication::intra_hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationField {
    Abstract,
    Address,
    Annote,
    Author,
    Booktitle,
    Chapter,
    Crossref,
    Doi,
    Edition,
    Editor,
    Howpublished,
    Institution,
    Journal,
    Key,
    Month,
    Note,
    Number,
    Organization,
    Pages,
    Publisher,
    School,
    Series,
    Type,
    Volume,
    Url,
    InterHash,
}

impl PublicationField {
    pub const ALL: [PublicationField; 26] = [
        PublicationField::Abstract,
        PublicationField::Address,
        PublicationField::Annote,
        PublicationField::Author,
        PublicationField::Booktitle,
        PublicationField::Chapter,
        PublicationField::Crossref,
        PublicationField::Doi,
        PublicationField::Edition,
        PublicationField::Editor,
        PublicationField::Howpublished,
        PublicationField::Institution,
        PublicationField::Journal,
        PublicationField::Key,
        PublicationField::Month,
        PublicationField::Note,
        PublicationField::Number,
        PublicationField::Organization,
        PublicationField::Pages,
        PublicationField::Publisher,
        PublicationField::School,
        PublicationField::Series,
        PublicationField::Type,
        PublicationField::Volume,
        PublicationField::Url,
        PublicationField::InterHash,
    ];

    /// Key used for this field inside the `bibtex` object on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            PublicationField::Abstract => "bibtexAbstract",
            PublicationField::Address => "address",
            PublicationField::Annote => "annote",
            PublicationField::Author => "author",
            PublicationField::Booktitle => "booktitle",
            PublicationField::Chapter => "chapter",
            PublicationField::Crossref => "crossref",
            PublicationField::Doi => "doi",
            PublicationField::Edition => "edition",
            PublicationField::Editor => "editor",
            PublicationField::Howpublished => "howpublished",
            PublicationField::Institution => "institution",
            PublicationField::Journal => "journal",
            PublicationField::Key => "key",
            PublicationField::Month => "month",
            PublicationField::Note => "note",
            PublicationField::Number => "number",
            PublicationField::Organization => "organization",
            PublicationField::Pages => "pages",
            PublicationField::Publisher => "publisher",
            PublicationField::School => "school",
            PublicationField::Series => "series",
            PublicationField::Type => "type",
            PublicationField::Volume => "volume",
            PublicationField::Url => "url",
            PublicationField::InterHash => "interhash",
        }
    }

    /// Inverse of `wire_name`. Unknown keys yield `None`.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.wire_name() == name)
    }
}

/// One user's bookmarking event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub user: User,
    /// `None` when the payload carried neither a bookmark nor a publication.
    pub resource: Option<Resource>,
    pub tags: Vec<String>,
    /// Visibility scopes. Never empty after decoding.
    pub groups: Vec<String>,
    pub create_date: DateTime<FixedOffset>,
    pub change_date: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Document>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Post {
    /// A fresh public post, timestamped now, ready for `create_post`.
    pub fn new(user_name: &str, resource: Resource, tags: Vec<String>) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Self {
            user: User::new(user_name),
            resource: Some(resource),
            tags,
            groups: vec![PUBLIC_GROUP.to_string()],
            create_date: now,
            change_date: now,
            documents: None,
            description: None,
        }
    }
}

/// Group every post belongs to when the payload names none.
pub const PUBLIC_GROUP: &str = "public";

/// The bookmarked object itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resource {
    Bookmark(Bookmark),
    Publication(Publication),
}

impl Resource {
    pub fn title(&self) -> &str {
        match self {
            Resource::Bookmark(b) => &b.title,
            Resource::Publication(p) => &p.title,
        }
    }

    pub fn intra_hash(&self) -> &str {
        match self {
            Resource::Bookmark(b) => &b.intra_hash,
            Resource::Publication(p) => &p.intra_hash,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Bookmark(_) => ResourceType::Bookmark,
            Resource::Publication(_) => ResourceType::Publication,
        }
    }
}

/// A link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    /// Empty for resources not yet stored remotely.
    pub intra_hash: String,
    pub title: String,
    pub url: String,
}

impl Bookmark {
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            intra_hash: String::new(),
            title: title.to_string(),
            url: url.to_string(),
        }
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({})", self.title, self.url)
    }
}

/// A bibliographic reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    /// Empty for resources not yet stored remotely.
    pub intra_hash: String,
    /// BibTeX entry type: article, inproceedings, book, ...
    pub entry_type: String,
    pub title: String,
    pub year: String,
    pub bibtex_key: String,
    pub fields: BTreeMap<PublicationField, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_urls: Option<Vec<ExtraUrl>>,
    /// Raw BibTeX `misc` block, kept unparsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misc: Option<String>,
}

impl Publication {
    pub fn new(entry_type: &str, title: &str, year: &str, bibtex_key: &str) -> Self {
        Self {
            intra_hash: String::new(),
            entry_type: entry_type.to_string(),
            title: title.to_string(),
            year: year.to_string(),
            bibtex_key: bibtex_key.to_string(),
            fields: BTreeMap::new(),
            extra_urls: None,
            misc: None,
        }
    }

    /// Builder-style `set_field`.
    pub fn with_field(mut self, field: PublicationField, value: &str) -> Self {
        self.set_field(field, value);
        self
    }

    pub fn field(&self, field: PublicationField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn set_field(&mut self, field: PublicationField, value: &str) {
        self.fields.insert(field, value.to_string());
    }

    pub fn author(&self) -> Option<&str> {
        self.field(PublicationField::Author)
    }

    pub fn abstract_text(&self) -> Option<&str> {
        self.field(PublicationField::Abstract)
    }

    pub fn doi(&self) -> Option<&str> {
        self.field(PublicationField::Doi)
    }

    pub fn url(&self) -> Option<&str> {
        self.field(PublicationField::Url)
    }
}

impl fmt::Display for Publication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bibtex_key)
    }
}

/// A file attached to a publication post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub file_name: String,
    pub md5_hash: String,
    /// Absolute URL the file can be downloaded from.
    pub href: String,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({})", self.file_name, self.href)
    }
}

/// Supplementary link on a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraUrl {
    pub title: String,
    pub date: DateTime<FixedOffset>,
    pub href: String,
}

/// A BibSonomy account. Groups are represented by their names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

impl User {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            homepage: None,
            real_name: None,
            groups: None,
        }
    }
}

/// Size of a rendered document preview image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl PreviewSize {
    pub fn as_param(self) -> &'static str {
        match self {
            PreviewSize::Small => "SMALL",
            PreviewSize::Medium => "MEDIUM",
            PreviewSize::Large => "LARGE",
        }
    }
}

/// Raw bytes of a downloaded document or preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sloppy_bookmark_keywords_normalize() {
        for keyword in ["book", "bookmarks", "url", "Link", "BOOKMARK"] {
            let parsed: ResourceType = keyword.parse().unwrap();
            assert_eq!(parsed, ResourceType::Bookmark, "{keyword}");
            assert_eq!(parsed.as_keyword(), "bookmark");
        }
    }

    #[test]
    fn sloppy_publication_keywords_normalize() {
        for keyword in ["bibtex", "pub", "publ", "publication", "Publications"] {
            let parsed: ResourceType = keyword.parse().unwrap();
            assert_eq!(parsed.as_keyword(), "bibtex", "{keyword}");
        }
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        let err = "spreadsheet".parse::<ResourceType>().unwrap_err();
        assert!(matches!(err, ApiError::UnknownResourceType(ref k) if k == "spreadsheet"));
    }

    #[test]
    fn renamed_fields_map_both_ways() {
        assert_eq!(PublicationField::Abstract.wire_name(), "bibtexAbstract");
        assert_eq!(PublicationField::from_wire_name("bibtexAbstract"), Some(PublicationField::Abstract));
        assert_eq!(PublicationField::from_wire_name("interhash"), Some(PublicationField::InterHash));
        assert_eq!(PublicationField::from_wire_name("abstract"), None);
        assert_eq!(PublicationField::from_wire_name("intrahash"), None);
    }

    #[test]
    fn every_field_round_trips_its_wire_name() {
        for field in PublicationField::ALL {
            assert_eq!(PublicationField::from_wire_name(field.wire_name()), Some(field));
        }
    }

    #[test]
    fn new_post_is_public() {
        let post = Post::new("jaeschke", Resource::Bookmark(Bookmark::new("Example", "http://example.org/")), vec![]);
        assert_eq!(post.groups, vec!["public"]);
        assert_eq!(post.user.name, "jaeschke");
        assert_eq!(post.resource.unwrap().resource_type(), ResourceType::Bookmark);
    }

    #[test]
    fn publication_accessors_read_fields() {
        let publication = Publication::new("article", "Title", "2014", "key2014")
            .with_field(PublicationField::Author, "Doe, John")
            .with_field(PublicationField::Abstract, "Summary");
        assert_eq!(publication.author(), Some("Doe, John"));
        assert_eq!(publication.abstract_text(), Some("Summary"));
        assert_eq!(publication.doi(), None);
        assert_eq!(publication.to_string(), "key2014");
    }
}
