//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the graph API and the search API
//! and drive full runs end-to-end, checking the shard files they leave behind.

use serde_json::{json, Value};
use social_harvest::config::{Config, CrawlConfig, Credentials, GraphConfig, OutputConfig};
use social_harvest::crawler::{CrawlDriver, SearchPoller, COMMENT_FIELDS};
use social_harvest::output::RunOutcome;
use social_harvest::{CrawlState, HarvestError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(server_uri: &str, data_dir: &Path) -> Config {
    Config {
        graph: GraphConfig {
            base_url: server_uri.to_string(),
            ..GraphConfig::default()
        },
        crawl: CrawlConfig {
            target: "TestPage".to_string(),
            post_count: 3,
            ..CrawlConfig::default()
        },
        credentials: Credentials {
            app_id: Some("app-id".to_string()),
            app_secret: Some("app-secret".to_string()),
        },
        output: OutputConfig {
            data_dir: data_dir.to_path_buf(),
            ..OutputConfig::default()
        },
        ..Config::default()
    }
}

/// Mounts the token exchange, target resolution and page info endpoints
async fn mount_target(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2.9/oauth/access_token"))
        .and(query_param("client_id", "app-id"))
        .and(query_param("grant_type", "client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "bearer"
        })))
        .mount(server)
        .await;

    mount_target_lookup(server).await;
}

async fn mount_target_lookup(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2.9/TestPage"))
        .and(query_param("fields", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "10"})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10"))
        .and(query_param("fields", "id,name,link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "10",
            "name": "Test Page",
            "link": "https://www.facebook.com/TestPage/"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10"))
        .and(query_param(
            "fields",
            "id,name,birthday,link,location,about,fan_count,talking_about_count",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "10",
            "name": "Test Page",
            "fan_count": 1200
        })))
        .mount(server)
        .await;
}

fn post(id: &str) -> Value {
    json!({
        "id": id,
        "created_time": "2017-03-25T12:00:00+0000",
        "message": format!("post {}", id),
        "status_type": "mobile_status_update"
    })
}

/// Mounts `comments` comments, `likes` likes and no shares for a post
async fn mount_interactions(server: &MockServer, post_id: &str, comments: usize, likes: usize) {
    let comment_data: Vec<Value> = (0..comments)
        .map(|i| {
            json!({
                "id": format!("{}_c{}", post_id, i),
                "created_time": "2017-03-25T13:00:00+0000",
                "from": {"id": format!("c{}", i), "name": "Commenter"},
                "message": "nice",
                "like_count": i
            })
        })
        .collect();
    let like_data: Vec<Value> = (0..likes)
        .map(|i| json!({"id": format!("l{}", i), "name": "Liker"}))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/v2.9/{}/comments", post_id)))
        .and(query_param("fields", COMMENT_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": comment_data})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2.9/{}/likes", post_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": like_data})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2.9/{}/sharedposts", post_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(server)
        .await;
}

/// Shard files of one prefix in `dir`, sorted by name
fn shard_files(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let file_prefix = format!("{}data_", prefix);
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with(&file_prefix))
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

/// Every record across the given shard files
fn read_records(files: &[PathBuf]) -> Vec<Value> {
    files
        .iter()
        .flat_map(|file| {
            let content = std::fs::read_to_string(file).expect("Failed to read shard");
            serde_json::from_str::<Vec<Value>>(&content).expect("Shard is not a JSON array")
        })
        .collect()
}

fn run_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("facebook").join("user_TestPage")
}

#[tokio::test]
async fn test_full_crawl_three_posts() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_target(&mock_server).await;

    let mut first_post = post("10_1");
    first_post["shares"] = json!({"count": 4});

    Mock::given(method("GET"))
        .and(path("/v2.9/10/posts"))
        .and(query_param("access_token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [first_post, post("10_2")],
            "paging": {"next": format!("{}/page2/10/posts?access_token=test-token", base_url)}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2/10/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [post("10_3")],
            "paging": {"next": format!("{}/page3/10/posts", base_url)}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The post limit is reached before this page is needed
    Mock::given(method("GET"))
        .and(path("/page3/10/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [post("10_4")]})))
        .expect(0)
        .mount(&mock_server)
        .await;

    for post_id in ["10_1", "10_2", "10_3"] {
        mount_interactions(&mock_server, post_id, 2, 1).await;
    }

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, temp_dir.path());
    // Below one interaction, above three posts
    config.output.shard_size_bytes = 200;
    config.output.post_shard_size_bytes = Some(10_000);

    let mut driver = CrawlDriver::new(config).expect("Failed to create driver");
    let summary = driver.run().await.expect("Crawl failed");

    assert_eq!(driver.state(), CrawlState::Done);
    assert_eq!(summary.outcome, RunOutcome::PostLimitReached);
    assert_eq!(summary.stats.posts, 3);
    assert_eq!(summary.stats.interactions(), 9);
    assert_eq!(summary.stats.comments, 6);
    assert_eq!(summary.stats.likes, 3);
    assert_eq!(summary.stats.shares, 0);

    let dir = run_dir(temp_dir.path());
    let interaction_files = shard_files(&dir, "interaction_");
    assert!(interaction_files.len() >= 3);
    assert_eq!(interaction_files.len(), 9);
    assert!(dir.join("interaction_data_0.json").exists());
    assert!(dir.join("interaction_data_8.json").exists());

    let interactions = read_records(&interaction_files);
    assert_eq!(interactions.len(), 9);
    assert!(interactions
        .iter()
        .all(|i| i["status_author"] == json!("10") && i["origin"] == json!("facebook")));
    assert!(interactions
        .iter()
        .any(|i| i["type"] == json!("like") && i["id"] == json!("L_l0_10_2")));

    let post_files = shard_files(&dir, "post_");
    assert_eq!(post_files.len(), 1);
    let posts = read_records(&post_files);
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0]["share_count"], json!(4));
    assert_eq!(posts[1]["share_count"], json!(0));
    assert_eq!(posts[2]["author"], json!("10"));

    let page_info = std::fs::read_to_string(dir.join("user_page_info_data_0.json")).unwrap();
    let page_info: Value = serde_json::from_str(&page_info).unwrap();
    assert_eq!(page_info["is_author"], json!(true));
    assert_eq!(page_info["name_ascii"], json!("TestPage"));

    // Page info, one post shard and nine interaction shards
    assert_eq!(summary.shard_files.len(), 11);
}

#[tokio::test]
async fn test_post_page_error_flushes_collected_records() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_target(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [post("10_1"), post("10_2")],
            "paging": {"next": format!("{}/page2/10/posts", base_url)}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2/10/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {
                "message": "Please reduce the amount of data you're asking for",
                "type": "OAuthException",
                "code": 1
            }
        })))
        .mount(&mock_server)
        .await;

    for post_id in ["10_1", "10_2"] {
        mount_interactions(&mock_server, post_id, 2, 1).await;
    }

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, temp_dir.path());
    config.crawl.post_count = 100;

    let mut driver = CrawlDriver::new(config).expect("Failed to create driver");
    let result = driver.run().await;

    match result {
        Err(HarvestError::Api { error, .. }) => assert_eq!(error.code, Some(1)),
        other => panic!("Expected an API error, got {:?}", other.map(|s| s.outcome)),
    }
    assert_eq!(driver.state(), CrawlState::Done);
    assert_eq!(driver.stats().posts, 2);

    // Nothing collected before the failure is lost
    let dir = run_dir(temp_dir.path());
    let posts = read_records(&shard_files(&dir, "post_"));
    assert_eq!(posts.len(), 2);
    let interactions = read_records(&shard_files(&dir, "interaction_"));
    assert_eq!(interactions.len(), 6);
}

#[tokio::test]
async fn test_transport_failure_flushes_collected_records() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_target(&mock_server).await;

    // Nothing listens on port 9 of the loopback interface
    Mock::given(method("GET"))
        .and(path("/v2.9/10/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [post("10_1")],
            "paging": {"next": "http://127.0.0.1:9/v2.9/10/posts?after=abc"}
        })))
        .mount(&mock_server)
        .await;

    mount_interactions(&mock_server, "10_1", 1, 1).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, temp_dir.path());
    config.crawl.post_count = 100;

    let mut driver = CrawlDriver::new(config).expect("Failed to create driver");
    let result = driver.run().await;

    assert!(matches!(result, Err(HarvestError::Http { .. })));

    let dir = run_dir(temp_dir.path());
    assert_eq!(read_records(&shard_files(&dir, "post_")).len(), 1);
    assert_eq!(read_records(&shard_files(&dir, "interaction_")).len(), 2);
}

#[tokio::test]
async fn test_malformed_credential_fails_before_any_page_fetch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/v2.9/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.9/TestPage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "10"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, temp_dir.path());

    let mut driver = CrawlDriver::new(config).expect("Failed to create driver");
    let result = driver.run().await;

    assert!(matches!(result, Err(HarvestError::Credential(_))));
    assert_eq!(driver.state(), CrawlState::Done);
    assert!(!temp_dir.path().join("facebook").exists());
}

#[tokio::test]
async fn test_sub_resource_error_truncates_and_continues() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Legacy plain-text token response
    Mock::given(method("GET"))
        .and(path("/v2.9/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("access_token=legacy-token&expires=5183999"),
        )
        .mount(&mock_server)
        .await;
    mount_target_lookup(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10/posts"))
        .and(query_param("access_token", "legacy-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [post("10_1"), post("10_2")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10_1/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"message": "Unsupported get request.", "type": "GraphMethodException", "code": 100}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10_1/likes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "l0"}, {"name": "no id"}]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10_1/sharedposts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "77_1",
                "created_time": "2017-03-26T08:00:00+0000",
                "from": {"id": "77"}
            }]
        })))
        .mount(&mock_server)
        .await;

    mount_interactions(&mock_server, "10_2", 1, 0).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, temp_dir.path());
    config.crawl.post_count = 100;

    let mut driver = CrawlDriver::new(config).expect("Failed to create driver");
    let summary = driver.run().await.expect("Crawl failed");

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.stats.posts, 2);
    assert_eq!(summary.stats.truncated, 1);
    assert_eq!(summary.stats.skipped, 1);
    assert_eq!(summary.stats.likes, 1);
    assert_eq!(summary.stats.shares, 1);
    assert_eq!(summary.stats.comments, 1);

    let interactions = read_records(&shard_files(&run_dir(temp_dir.path()), "interaction_"));
    let share = interactions
        .iter()
        .find(|i| i["type"] == json!("share"))
        .expect("Share not written");
    assert_eq!(share["message"], json!(""));
    assert_eq!(share["author"], json!("77"));
}

#[tokio::test]
async fn test_with_users_downloads_interacting_users() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_target(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/v2.9/10/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [post("10_1")]})))
        .mount(&mock_server)
        .await;

    mount_interactions(&mock_server, "10_1", 1, 1).await;

    Mock::given(method("GET"))
        .and(path("/v2.9/c0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c0",
            "name": "Commenter",
            "birthday": "01/02/1990"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2.9/l0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"message": "Unsupported get request.", "code": 100}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, temp_dir.path());
    config.crawl.with_users = true;

    let mut driver = CrawlDriver::new(config).expect("Failed to create driver");
    let summary = driver.run().await.expect("Crawl failed");

    assert_eq!(summary.stats.users, 1);
    assert_eq!(summary.stats.skipped, 1);

    let users = read_records(&shard_files(&run_dir(temp_dir.path()), "user_"));
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], json!("c0"));
    assert_eq!(users[0]["birthday_format"], json!("MM/DD/YYYY"));
    assert_eq!(users[0]["origin"], json!("facebook"));
}

/// Answers the first poll with ids 105..=101 and the follow-up with 103..=99
struct OverlappingSearch;

impl Respond for OverlappingSearch {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let max_id = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "max_id")
            .map(|(_, v)| v.into_owned());

        let ids: Vec<u64> = match max_id.as_deref() {
            None => (101..=105).rev().collect(),
            Some("101") => (99..=103).rev().collect(),
            Some(_) => Vec::new(),
        };

        ResponseTemplate::new(200).set_body_json(search_page(&ids))
    }
}

/// Answers the first poll with id 201 and every follow-up with a 503
struct FailingFollowUp;

impl Respond for FailingFollowUp {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if request.url.query_pairs().any(|(k, _)| k == "max_id") {
            return ResponseTemplate::new(503);
        }
        ResponseTemplate::new(200).set_body_json(search_page(&[201]))
    }
}

fn search_page(ids: &[u64]) -> Value {
    let statuses: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id_str": id.to_string(),
                "user": {"screen_name": "reader"},
                "favorite_count": 1,
                "retweet_count": 0,
                "entities": {"urls": [
                    {"expanded_url": format!("https://www.example.com/article/{}#comments", id)}
                ]}
            })
        })
        .collect();

    json!({"statuses": statuses})
}

async fn mount_search(server: &MockServer, responder: impl Respond + 'static, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/1.1/search/tweets.json"))
        .and(header("authorization", "Bearer search-token"))
        .and(query_param("result_type", "recent"))
        .respond_with(responder)
        .expect(calls)
        .mount(server)
        .await;
}

fn create_search_config(server_uri: &str, data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.data_dir = data_dir.to_path_buf();
    config.search.base_url = format!("{}/1.1/search/tweets.json", server_uri);
    config.search.bearer_token = Some("search-token".to_string());
    config.search.poll_interval_ms = 0;
    config
}

#[tokio::test]
async fn test_overlapping_polls_are_deduplicated() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, OverlappingSearch, 2).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_search_config(&mock_server.uri(), temp_dir.path());
    config.search.max_polls = 2;

    let mut poller = SearchPoller::new(&config).expect("Failed to create poller");
    let summary = poller.run().await.expect("Polling failed");

    assert_eq!(summary.polls, 2);
    assert_eq!(summary.collected, 7);
    assert_eq!(summary.duplicates, 3);
    assert_eq!(summary.min_seen_id, Some(99));

    let shard = summary.shard_file.expect("Links not saved");
    assert_eq!(shard, temp_dir.path().join("data_0.json"));

    let links = read_records(&[shard]);
    assert_eq!(links.len(), 7);
    assert_eq!(links[0]["url"], json!("https://example.com/article/105"));
    assert_eq!(links[0]["domain"], json!("example.com"));
}

#[tokio::test]
async fn test_spent_time_budget_ends_polling() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, OverlappingSearch, 1).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_search_config(&mock_server.uri(), temp_dir.path());
    config.search.duration_secs = Some(0);
    config.search.poll_interval_ms = 1;
    config.search.max_polls = 100;

    let mut poller = SearchPoller::new(&config).expect("Failed to create poller");
    let summary = poller.run().await.expect("Polling failed");

    assert_eq!(summary.polls, 1);
    assert_eq!(summary.collected, 5);
    assert_eq!(read_records(&shard_files(temp_dir.path(), "")).len(), 5);
}

#[tokio::test]
async fn test_failing_poll_saves_earlier_links_once() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, FailingFollowUp, 2).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_search_config(&mock_server.uri(), temp_dir.path());
    config.search.max_polls = 10;

    let mut poller = SearchPoller::new(&config).expect("Failed to create poller");
    let result = poller.run().await;

    assert!(matches!(result, Err(HarvestError::Http { .. })));
    assert_eq!(poller.polls(), 1);

    let shards = shard_files(temp_dir.path(), "");
    assert_eq!(shards, vec![temp_dir.path().join("data_0.json")]);

    let links = read_records(&shards);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["url"], json!("https://example.com/article/201"));
}
