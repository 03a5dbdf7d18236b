//! In-memory stand-in for the BibSonomy REST API.
//!
//! Serves the JSON flavour of the API under `/api`: post listings per user
//! and per tag (windowed by `start`/`end`, capped at the page size), single
//! posts, users, post creation and document download. Every route requires
//! HTTP Basic credentials with a non-empty key; the key value itself is not
//! verified.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Window size when a listing names no `end`.
const DEFAULT_WINDOW: usize = 20;

#[derive(Clone, Debug)]
struct StoredPost {
    user: String,
    resource_type: &'static str,
    intrahash: String,
    tags: Vec<String>,
    wire: Value,
}

#[derive(Clone, Debug)]
struct StoredDocument {
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
pub struct Store {
    posts: Vec<StoredPost>,
    documents: HashMap<(String, String, String), StoredDocument>,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub resourcetype: Option<String>,
    pub tags: Option<String>,
    #[serde(default)]
    pub start: usize,
    pub end: Option<usize>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub preview: Option<String>,
}

pub fn app() -> Router {
    app_with(DEFAULT_PAGE_SIZE)
}

/// Router whose listings return at most `page_size` posts per request.
pub fn app_with(page_size: usize) -> Router {
    let state = AppState {
        db: Db::default(),
        page_size: page_size.max(1),
    };
    Router::new()
        .route("/api/posts", get(posts_for_tag))
        .route("/api/users/{user}", get(get_user))
        .route("/api/users/{user}/posts", get(posts_for_user).post(create_post))
        .route("/api/users/{user}/posts/{hash}", get(get_post))
        .route("/api/users/{user}/posts/{hash}/documents", post(upload_document))
        .route("/api/users/{user}/posts/{hash}/documents/{file}", get(get_document))
        .with_state(state)
}

pub async fn run(listener: TcpListener, page_size: usize) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(page_size)).await
}

fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"stat": "fail", "error": message.into()}))).into_response()
}

/// User name from the Basic credentials.
fn authenticate(headers: &HeaderMap) -> Result<String, Response> {
    let unauthorized = || fail(StatusCode::UNAUTHORIZED, "authentication required");
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;
    let encoded = value.strip_prefix("Basic ").ok_or_else(unauthorized)?;
    let decoded = STANDARD.decode(encoded).map_err(|_| unauthorized())?;
    let credentials = String::from_utf8(decoded).map_err(|_| unauthorized())?;
    match credentials.split_once(':') {
        Some((user, key)) if !user.is_empty() && !key.is_empty() => Ok(user.to_string()),
        _ => Err(unauthorized()),
    }
}

fn check_format(format: Option<&str>) -> Result<(), Response> {
    match format {
        None | Some("json") => Ok(()),
        Some(other) => Err(fail(StatusCode::BAD_REQUEST, format!("unsupported format {other}"))),
    }
}

fn host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string()
}

fn user_json(host: &str, name: &str) -> Value {
    json!({"name": name, "href": format!("http://{host}/api/users/{name}")})
}

async fn posts_for_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    list(&state, &headers, Some(user.as_str()), query).await
}

async fn posts_for_tag(State(state): State<AppState>, Query(query): Query<ListQuery>, headers: HeaderMap) -> Response {
    list(&state, &headers, None, query).await
}

async fn list(state: &AppState, headers: &HeaderMap, user: Option<&str>, query: ListQuery) -> Response {
    if let Err(response) = authenticate(headers).and_then(|_| check_format(query.format.as_deref())) {
        return response;
    }
    let resource_type = match query.resourcetype.as_deref() {
        Some("bookmark") => "bookmark",
        Some("bibtex") => "bibtex",
        other => return fail(StatusCode::BAD_REQUEST, format!("invalid resourcetype {other:?}")),
    };
    let tags: Vec<&str> = query.tags.as_deref().unwrap_or("").split_whitespace().collect();
    let start = query.start;
    let end = query
        .end
        .unwrap_or(start.saturating_add(DEFAULT_WINDOW))
        .min(start.saturating_add(state.page_size));

    let db = state.db.read().await;
    let page: Vec<Value> = db
        .posts
        .iter()
        .filter(|p| p.resource_type == resource_type)
        .filter(|p| user.map_or(true, |u| p.user == u))
        .filter(|p| tags.iter().all(|t| p.tags.iter().any(|pt| pt == t)))
        .skip(start)
        .take(end.saturating_sub(start))
        .map(|p| p.wire.clone())
        .collect();
    debug!(?user, resource_type, start, end, returned = page.len(), "listing");

    let mut posts = Map::new();
    posts.insert("start".to_string(), json!(start));
    posts.insert("end".to_string(), json!(start + page.len()));
    if !page.is_empty() {
        posts.insert("post".to_string(), Value::Array(page));
    }
    Json(json!({"stat": "ok", "posts": posts})).into_response()
}

async fn get_post(
    State(state): State<AppState>,
    Path((user, hash)): Path<(String, String)>,
    Query(query): Query<FormatQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authenticate(&headers).and_then(|_| check_format(query.format.as_deref())) {
        return response;
    }
    let db = state.db.read().await;
    match db.posts.iter().find(|p| p.user == user && p.intrahash == hash) {
        Some(p) => Json(json!({"stat": "ok", "posts": {"start": 0, "end": 1, "post": [p.wire]}})).into_response(),
        None => fail(StatusCode::NOT_FOUND, format!("post {hash} of user {user} not found")),
    }
}

async fn get_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<FormatQuery>,
    headers: HeaderMap,
) -> Response {
    let caller = match authenticate(&headers).and_then(|caller| check_format(query.format.as_deref()).map(|_| caller)) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let db = state.db.read().await;
    if caller != user && !db.posts.iter().any(|p| p.user == user) {
        return fail(StatusCode::NOT_FOUND, format!("user {user} not found"));
    }
    Json(json!({"stat": "ok", "user": user_json(&host(&headers), &user)})).into_response()
}

async fn create_post(
    State(state): State<AppState>,
    Path(user): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let caller = match authenticate(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if caller != user {
        return fail(StatusCode::FORBIDDEN, format!("{caller} may not post as {user}"));
    }
    let Some(mut wire) = body.get("post").cloned() else {
        return fail(StatusCode::BAD_REQUEST, "missing post");
    };
    if wire["user"]["name"] != user.as_str() {
        return fail(StatusCode::BAD_REQUEST, "post owner does not match the path");
    }
    let tags: Option<Vec<String>> = wire["tag"].as_array().map(|tags| {
        tags.iter()
            .filter_map(|t| t["name"].as_str().map(str::to_string))
            .collect()
    });
    let Some(tags) = tags else {
        return fail(StatusCode::BAD_REQUEST, "missing tags");
    };
    let resource_type = if wire.get("bookmark").is_some() {
        "bookmark"
    } else if wire.get("bibtex").is_some() {
        "bibtex"
    } else {
        return fail(StatusCode::BAD_REQUEST, "post has neither bookmark nor bibtex");
    };

    let host = host(&headers);
    let intrahash = Uuid::new_v4().simple().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let resource = &mut wire[resource_type];
    resource["intrahash"] = json!(intrahash);
    resource["interhash"] = json!(intrahash);
    resource["href"] = json!(format!("http://{host}/api/users/{user}/posts/{intrahash}"));
    wire["user"] = user_json(&host, &user);
    wire["postingdate"] = json!(now);
    wire["changedate"] = json!(now);

    state.db.write().await.posts.push(StoredPost {
        user: user.clone(),
        resource_type,
        intrahash: intrahash.clone(),
        tags,
        wire,
    });
    debug!(user, intrahash, resource_type, "created post");
    (StatusCode::CREATED, Json(json!({"stat": "ok", "resourcehash": intrahash}))).into_response()
}

async fn upload_document(
    State(state): State<AppState>,
    Path((user, hash)): Path<(String, String)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match authenticate(&headers) {
        Ok(caller) if caller == user => {}
        Ok(caller) => return fail(StatusCode::FORBIDDEN, format!("{caller} may not upload for {user}")),
        Err(response) => return response,
    }
    let host = host(&headers);
    let mut db = state.db.write().await;
    let Some(post) = db.posts.iter_mut().find(|p| p.user == user && p.intrahash == hash) else {
        return fail(StatusCode::NOT_FOUND, format!("post {hash} of user {user} not found"));
    };
    let href = format!("http://{host}/api/users/{user}/posts/{hash}/documents/{}", query.filename);
    let entry = json!({
        "filename": query.filename,
        "md5Hash": Uuid::new_v4().simple().to_string(),
        "href": href,
    });
    if let Some(documents) = post.wire.pointer_mut("/documents/document").and_then(Value::as_array_mut) {
        documents.push(entry);
    } else {
        post.wire["documents"] = json!({"document": [entry]});
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    db.documents.insert(
        (user, hash, query.filename.clone()),
        StoredDocument {
            content_type,
            bytes: body.to_vec(),
        },
    );
    (StatusCode::CREATED, Json(json!({"stat": "ok", "filename": query.filename}))).into_response()
}

async fn get_document(
    State(state): State<AppState>,
    Path((user, hash, file)): Path<(String, String, String)>,
    Query(query): Query<PreviewQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authenticate(&headers) {
        return response;
    }
    let db = state.db.read().await;
    let Some(document) = db.documents.get(&(user, hash, file.clone())) else {
        return fail(StatusCode::NOT_FOUND, format!("document {file} not found"));
    };
    match query.preview.as_deref() {
        None => (
            [(header::CONTENT_TYPE, header_value(&document.content_type))],
            document.bytes.clone(),
        )
            .into_response(),
        Some(size @ ("SMALL" | "MEDIUM" | "LARGE")) => (
            [(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"))],
            format!("preview {size} of {file}").into_bytes(),
        )
            .into_response(),
        Some(other) => fail(StatusCode::BAD_REQUEST, format!("invalid preview size {other}")),
    }
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user: &str, key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(format!("{user}:{key}")));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        headers
    }

    #[test]
    fn authenticate_extracts_user() {
        assert_eq!(authenticate(&basic("jaeschke", "secret")).unwrap(), "jaeschke");
    }

    #[test]
    fn authenticate_rejects_missing_header() {
        let response = authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn authenticate_rejects_empty_key() {
        let response = authenticate(&basic("jaeschke", "")).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn only_json_format_is_served() {
        assert!(check_format(None).is_ok());
        assert!(check_format(Some("json")).is_ok());
        assert_eq!(check_format(Some("xml")).unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn huge_start_yields_empty_page() {
        let state = AppState {
            db: Db::default(),
            page_size: DEFAULT_PAGE_SIZE,
        };
        let query = ListQuery {
            resourcetype: Some("bookmark".to_string()),
            tags: None,
            start: usize::MAX - 1,
            end: None,
            format: None,
        };
        let response = list(&state, &basic("jaeschke", "secret"), None, query).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn list_query_defaults_start() {
        let query: ListQuery = serde_json::from_str(r#"{"resourcetype":"bookmark"}"#).unwrap();
        assert_eq!(query.start, 0);
        assert!(query.end.is_none());
    }
}
