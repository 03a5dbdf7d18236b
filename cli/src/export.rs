//! Writes a user's posts to JSON files and fetches attached documents.
//!
//! Documents are downloaded one after another. A document that cannot be
//! fetched or written is logged and skipped; the rest of the batch goes on.

use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use bibsonomy_core::{BibSonomy, Document, Post, PreviewSize, Transport, ALL_POSTS};
use tracing::{debug, info, warn};

/// Name used when a document's own name is unusable as a file name.
const FALLBACK_FILE_NAME: &str = "document";

pub struct ExportOptions {
    /// Whose posts to export.
    pub user_name: String,
    pub tags: Vec<String>,
    pub directory: PathBuf,
    /// File stem for bookmarks; `None` skips bookmarks.
    pub bookmark_file: Option<String>,
    /// File stem for publications; `None` skips publications.
    pub publication_file: Option<String>,
    pub documents: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bookmarks: usize,
    pub publications: usize,
    pub documents: usize,
    pub skipped_documents: usize,
}

pub fn run<T: Transport>(client: &BibSonomy<T>, options: &ExportOptions) -> anyhow::Result<Summary> {
    let tags: Vec<&str> = options.tags.iter().map(String::as_str).collect();
    let mut summary = Summary::default();
    info!(user = %options.user_name, ?tags, "exporting posts");

    if let Some(name) = &options.bookmark_file {
        let posts = client
            .posts_for_user("bookmark", &options.user_name, &tags, 0, ALL_POSTS)
            .context("could not fetch bookmarks")?;
        let path = write_posts(&options.directory, name, &posts)?;
        info!(count = posts.len(), path = %path.display(), "bookmarks written");
        summary.bookmarks = posts.len();
    }

    if let Some(name) = &options.publication_file {
        let posts = client
            .posts_for_user("publication", &options.user_name, &tags, 0, ALL_POSTS)
            .context("could not fetch publications")?;
        let path = write_posts(&options.directory, name, &posts)?;
        info!(count = posts.len(), path = %path.display(), "publications written");
        summary.publications = posts.len();

        if options.documents {
            let (written, skipped) = download_documents(client, &options.directory, &posts);
            summary.documents = written;
            summary.skipped_documents = skipped;
        }
    }

    Ok(summary)
}

/// Pretty-printed JSON array of `posts` in `directory/name.json`.
pub fn write_posts(directory: &Path, name: &str, posts: &[Post]) -> anyhow::Result<PathBuf> {
    let path = directory.join(format!("{name}.json"));
    let file = fs::File::create(&path).with_context(|| format!("could not create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, posts).with_context(|| format!("could not write {}", path.display()))?;
    writer.flush().with_context(|| format!("could not write {}", path.display()))?;
    Ok(path)
}

/// Returns how many documents were written and how many were skipped.
fn download_documents<T: Transport>(client: &BibSonomy<T>, directory: &Path, posts: &[Post]) -> (usize, usize) {
    let documents: Vec<&Document> = posts.iter().filter_map(|p| p.documents.as_ref()).flatten().collect();
    info!(count = documents.len(), "downloading documents");

    let mut used_names = HashSet::new();
    let (mut written, mut skipped) = (0, 0);
    for (index, document) in documents.iter().enumerate() {
        match save_document(client, directory, document, &mut used_names) {
            Ok(true) => written += 1,
            Ok(false) => {
                skipped += 1;
                warn!(file = %document.file_name, "document not available, skipped");
            }
            Err(e) => {
                skipped += 1;
                warn!(file = %document.file_name, error = %format!("{e:#}"), "document download failed, skipped");
            }
        }
        debug!(done = index + 1, total = documents.len(), "document progress");
    }

    info!(written, skipped, directory = %directory.display(), "documents written");
    (written, skipped)
}

/// `Ok(false)` when the server did not hand out the document.
fn save_document<T: Transport>(
    client: &BibSonomy<T>,
    directory: &Path,
    document: &Document,
    used_names: &mut HashSet<String>,
) -> anyhow::Result<bool> {
    let Some(content) = client.document(document)? else {
        return Ok(false);
    };
    let name = unique_file_name(&document.file_name, used_names);
    let path = directory.join(&name);
    fs::write(&path, &content.bytes).with_context(|| format!("could not write {}", path.display()))?;

    if let Err(e) = save_preview(client, directory, document, &name) {
        warn!(file = %document.file_name, error = %format!("{e:#}"), "preview not saved");
    }
    Ok(true)
}

/// MEDIUM preview next to the saved document as `name.jpg`.
fn save_preview<T: Transport>(
    client: &BibSonomy<T>,
    directory: &Path,
    document: &Document,
    name: &str,
) -> anyhow::Result<()> {
    let preview = client
        .document_preview(document, PreviewSize::Medium)?
        .context("preview not available")?;
    let path = directory.join(format!("{name}.jpg"));
    fs::write(&path, &preview.bytes).with_context(|| format!("could not write {}", path.display()))?;
    Ok(())
}

/// `name` reduced to a single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        FALLBACK_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitized name, prefixed with a counter when already taken in this run.
fn unique_file_name(name: &str, used_names: &mut HashSet<String>) -> String {
    let base = sanitize_file_name(name);
    let mut candidate = base.clone();
    let mut counter = 1;
    while !used_names.insert(candidate.clone()) {
        candidate = format!("{counter}_{base}");
        counter += 1;
    }
    candidate
}
