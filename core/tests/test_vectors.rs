//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, recorded responses,
//! and expected decode results. Request bodies are compared as parsed JSON
//! so member order does not matter.

use bibsonomy_core::codec::{self, Decoded};
use bibsonomy_core::{
    ApiError, Bookmark, ClientConfig, HttpMethod, HttpRequest, HttpResponse, Post, PublicationField, Resource,
    ResourceType, RestClient,
};
use chrono::DateTime;
use serde_json::Value;

fn client() -> RestClient {
    RestClient::new(&ClientConfig::new("jaeschke", "secret")).unwrap()
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

/// Check method, URL and, when the vector lists them, headers and body.
fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");

    if let Some(headers) = expected.get("headers") {
        let expected_headers: Vec<(String, String)> = headers
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");
    }

    if let Some(body) = expected.get("body") {
        let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(&req_body, body, "{name}: body");
    }
}

/// String bodies are sent verbatim, anything else is serialized.
fn response(case: &Value) -> HttpResponse {
    let status = case["response"]["status"].as_u64().unwrap() as u16;
    let body = match &case["response"]["body"] {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    HttpResponse::new(status, body)
}

fn str_list<'a>(value: &'a Value) -> Vec<&'a str> {
    value.as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect()
}

fn assert_post(name: &str, post: &Post, expected: &Value) {
    let resource = post.resource.as_ref().unwrap();
    assert_eq!(post.user.name, expected["user"].as_str().unwrap(), "{name}: user");
    assert_eq!(resource.title(), expected["title"].as_str().unwrap(), "{name}: title");
    assert_eq!(resource.intra_hash(), expected["intra_hash"].as_str().unwrap(), "{name}: intra hash");
    assert_eq!(post.groups, strings(&expected["groups"]), "{name}: groups");
    assert_eq!(post.tags.len() as u64, expected["tag_count"].as_u64().unwrap(), "{name}: tags");
    let create_date = DateTime::parse_from_rfc3339(expected["create_date"].as_str().unwrap()).unwrap();
    assert_eq!(post.create_date, create_date, "{name}: create date");
}

fn assert_page(name: &str, page: Option<Vec<Post>>, expected: &Value) {
    if expected.get("none").is_some() {
        assert!(page.is_none(), "{name}: expected no page");
        return;
    }
    let posts = page.unwrap();
    assert_eq!(posts.len() as u64, expected["count"].as_u64().unwrap(), "{name}: count");
    if let Some(first) = expected.get("first") {
        assert_post(name, &posts[0], first);
    }
    if let Some(description) = expected.get("first_description") {
        assert_eq!(posts[0].description.as_deref(), description.as_str(), "{name}: description");
    }
    if let Some(publication) = expected.get("publication") {
        let Some(Resource::Publication(p)) = &posts[0].resource else {
            panic!("{name}: expected a publication");
        };
        assert_eq!(p.entry_type, publication["entry_type"].as_str().unwrap(), "{name}: entry type");
        assert_eq!(p.year, publication["year"].as_str().unwrap(), "{name}: year");
        assert_eq!(p.bibtex_key, publication["bibtex_key"].as_str().unwrap(), "{name}: key");
        for (wire_name, value) in publication["fields"].as_object().unwrap() {
            let field = PublicationField::from_wire_name(wire_name).unwrap();
            assert_eq!(p.field(field), value.as_str(), "{name}: field {wire_name}");
        }
        assert_eq!(p.misc.as_deref(), publication["misc"].as_str(), "{name}: misc");
        let titles: Vec<&str> = p.extra_urls.iter().flatten().map(|u| u.title.as_str()).collect();
        assert_eq!(titles, str_list(&publication["extra_url_titles"]), "{name}: extra urls");
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[test]
fn posts_for_user_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/posts_for_user.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let resource_type: ResourceType = input["resource_type"].as_str().unwrap().parse().unwrap();
        let tags = str_list(&input["tags"]);
        let start = input["start"].as_u64().unwrap() as usize;
        let end = input["end"].as_u64().unwrap() as usize;

        let req = c.build_posts_for_user(resource_type, input["user"].as_str().unwrap(), &tags, start, end);
        assert_request(name, &req, &case["expected_request"]);

        let body = c.parse_text(response(&case)).unwrap();
        let page = codec::decode_page(&body).unwrap();
        assert_page(name, page, &case["expected"]);
    }
}

#[test]
fn posts_for_tag_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/posts_for_tag.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let resource_type: ResourceType = input["resource_type"].as_str().unwrap().parse().unwrap();
        let tags = str_list(&input["tags"]);
        let start = input["start"].as_u64().unwrap() as usize;
        let end = input["end"].as_u64().unwrap() as usize;

        let req = c.build_posts_for_tag(resource_type, &tags, start, end);
        assert_request(name, &req, &case["expected_request"]);

        let body = c.parse_text(response(&case)).unwrap();
        let page = codec::decode_page(&body).unwrap();
        assert_page(name, page, &case["expected"]);
    }
}

// ---------------------------------------------------------------------------
// Single post
// ---------------------------------------------------------------------------

#[test]
fn get_post_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/get_post.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let expected = &case["expected"];

        let req = c.build_get_post(input["user"].as_str().unwrap(), input["intra_hash"].as_str().unwrap());
        assert_request(name, &req, &case["expected_request"]);

        let result = c
            .parse_text(response(&case))
            .and_then(|body| codec::decode_page(&body));
        match expected.get("error").and_then(Value::as_str) {
            None => {
                let posts = result.unwrap().unwrap();
                assert_eq!(posts.len(), 1, "{name}: one post");
                let Some(Resource::Bookmark(b)) = &posts[0].resource else {
                    panic!("{name}: expected a bookmark");
                };
                assert_eq!(b.title, expected["title"].as_str().unwrap(), "{name}: title");
                assert_eq!(b.url, expected["url"].as_str().unwrap(), "{name}: url");
            }
            Some("remote") => match result {
                Err(ApiError::Remote(detail)) => assert_eq!(detail, expected["detail"], "{name}: detail"),
                other => panic!("{name}: expected Remote, got {other:?}"),
            },
            Some("transport") => match result {
                Err(ApiError::Transport { status, .. }) => {
                    assert_eq!(status as u64, expected["status"].as_u64().unwrap(), "{name}: status")
                }
                other => panic!("{name}: expected Transport, got {other:?}"),
            },
            Some("unrecognized_shape") => {
                assert!(matches!(result, Err(ApiError::UnrecognizedShape(_))), "{name}: {result:?}")
            }
            Some("malformed_post") => {
                assert!(matches!(result, Err(ApiError::MalformedPost(_))), "{name}: {result:?}")
            }
            Some(other) => panic!("{name}: unknown expected error {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[test]
fn get_user_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/get_user.json")) {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];

        let req = c.build_get_user(case["input"]["user"].as_str().unwrap());
        assert_request(name, &req, &case["expected_request"]);

        let body = c.parse_text(response(&case)).unwrap();
        let Decoded::User(user) = codec::decode(&body).unwrap() else {
            panic!("{name}: expected a user");
        };
        assert_eq!(user.name, expected["name"].as_str().unwrap(), "{name}: name");
        assert_eq!(user.real_name.as_deref(), expected["real_name"].as_str(), "{name}: real name");
        assert_eq!(user.homepage.as_deref(), expected["homepage"].as_str(), "{name}: homepage");
        let groups = match &expected["groups"] {
            Value::Null => None,
            list => Some(strings(list)),
        };
        assert_eq!(user.groups, groups, "{name}: groups");
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_post_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/create_post.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let bookmark = Bookmark::new(
            input["bookmark"]["title"].as_str().unwrap(),
            input["bookmark"]["url"].as_str().unwrap(),
        );
        let mut post = Post::new(input["user"].as_str().unwrap(), Resource::Bookmark(bookmark), strings(&input["tags"]));
        post.description = input["description"].as_str().map(str::to_string);

        let req = c.build_create_post(&post.user.name, codec::encode_post(&post).unwrap());
        assert_request(name, &req, &case["expected_request"]);

        let ack = codec::decode_ack(&c.parse_created(response(&case)).unwrap()).unwrap();
        assert_eq!(ack["resourcehash"], case["expected"]["resourcehash"], "{name}: resource hash");
    }
}
