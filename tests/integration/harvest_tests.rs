//! Integration tests for the harvest
//!
//! These tests use wiremock to stand in for both the API and the website and
//! run the coordinator end-to-end against an in-memory database.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tmdb_harvest::config::{parse_config, Config};
use tmdb_harvest::harvest::{run_until, Coordinator, HarvestOutcome};
use tmdb_harvest::media::{ContentType, Query};
use tmdb_harvest::state::Checkpoint;
use tmdb_harvest::storage::{RunStatus, SharedStorage, SqliteStorage, Storage};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Builds a config whose API and website both point at `server`
fn test_config(server: &MockServer, api_key: Option<&str>, sections: &str) -> Config {
    let key_line = api_key
        .map(|key| format!("api-key = \"{}\"", key))
        .unwrap_or_default();
    let toml = format!(
        r#"{sections}

[network]
{key_line}
api-base = "{uri}/3"
web-base = "{uri}"
min-delay-ms = 0
max-delay-ms = 0
request-timeout-secs = 5
"#,
        sections = sections,
        key_line = key_line,
        uri = server.uri()
    );
    parse_config(&toml).expect("Failed to parse test config")
}

fn memory_storage() -> SharedStorage {
    Arc::new(Mutex::new(
        SqliteStorage::new_in_memory().expect("Failed to open in-memory storage"),
    ))
}

fn listing(ids: &[u64], total_pages: u32) -> Value {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "title": format!("Title {}", id)}))
        .collect();
    json!({"page": 1, "results": results, "total_pages": total_pages})
}

fn review_page(page: u32, total_pages: u32) -> Value {
    let results: Vec<Value> = (0..10)
        .map(|i| json!({"id": format!("p{}-{}", page, i), "author": "critic", "content": "Solid."}))
        .collect();
    json!({"page": page, "results": results, "total_pages": total_pages})
}

fn web_listing(segment: &str, ids: &[u64], next: Option<&str>) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="card"><a href="/{seg}/{id}"><h2>Title {id}</h2></a></div>"#,
                seg = segment,
                id = id
            )
        })
        .collect();
    let pagination = next
        .map(|href| format!(r#"<div class="pagination"><a rel="next" href="{}">Next</a></div>"#, href))
        .unwrap_or_default();
    format!("<html><body>{}{}</body></html>", cards, pagination)
}

fn web_detail(title: &str) -> String {
    format!(
        r#"<html><body><div class="title"><h2>{}</h2></div><div class="overview"><p>Plot.</p></div></body></html>"#,
        title
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == request_path)
        .collect()
}

fn has_param(request: &Request, key: &str, value: &str) -> bool {
    request
        .url
        .query_pairs()
        .any(|(k, v)| k == key && v == value)
}

fn count(storage: &SharedStorage, data_type: &str) -> usize {
    storage
        .lock()
        .unwrap()
        .load_records(Some(data_type))
        .unwrap()
        .len()
}

#[tokio::test]
async fn test_global_budget_caps_stored_content() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .and(query_param("query", "alien"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[1, 2, 3, 4, 5], 1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/3/movie/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "Alien"})))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "movie"
search-queries = ["alien", "aliens"]
results-wanted = 3
max-concurrency = 2
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 3);
    assert_eq!(count(&storage, "content"), 3);
    assert_eq!(requests_to(&server, "/3/movie/4").await.len(), 0);

    // budget exhausted by the first query, so the second never hits a source
    let searches = requests_to(&server, "/3/search/movie").await;
    assert!(searches.iter().all(|r| has_param(r, "query", "alien")));
    assert!(storage.lock().unwrap().load_checkpoint().unwrap().is_none());
}

#[tokio::test]
async fn test_api_failure_fails_over_to_web_for_the_rest_of_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("query", "dune"))
        .respond_with(html(web_listing("movie", &[11], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("query", "arrival"))
        .respond_with(html(web_listing("movie", &[12], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/movie/\d+$"))
        .respond_with(html(web_detail("Scraped")))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "movie"
search-queries = ["dune", "arrival"]
results-wanted = 4
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 2);
    assert_eq!(stats.api_failures, 1);
    assert_eq!(requests_to(&server, "/3/search/movie").await.len(), 1);

    let records = storage.lock().unwrap().load_records(Some("content")).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["source"] == "tmdb_web"));
    assert!(records.iter().all(|r| r["title"] == "Scraped"));
}

#[tokio::test]
async fn test_web_pagination_skips_ids_seen_on_earlier_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/tv"))
        .and(query_param("page", "1"))
        .respond_with(html(web_listing(
            "tv",
            &[1, 2],
            Some("/search/tv?query=office&page=2"),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/tv"))
        .and(query_param("page", "2"))
        .respond_with(html(web_listing("tv", &[2, 3], None)))
        .mount(&server)
        .await;
    for id in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/tv/{}", id)))
            .respond_with(html(web_detail(&format!("Show {}", id))))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = test_config(
        &server,
        None,
        r#"
[harvest]
content-type = "tv"
search-queries = ["office"]
results-wanted = 10
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 3);
    assert_eq!(count(&storage, "content"), 3);
}

#[tokio::test]
async fn test_resume_skips_earlier_pairs_and_continues_from_saved_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/tv"))
        .and(query_param("query", "x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[31, 32, 33, 34], 3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/3/tv/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Show"})))
        .mount(&server)
        .await;

    let storage = memory_storage();
    let checkpoint = Checkpoint {
        current_type: Some(ContentType::Series),
        current_query: Some(Query::Search("x".to_string())),
        current_page: 3,
        collected_for_current_query: 2,
        budget_at_query_start: Some(5),
        ..Checkpoint::default()
    };
    storage
        .lock()
        .unwrap()
        .save_checkpoint(Some(&checkpoint))
        .unwrap();

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "both"
search-queries = ["w", "x"]
results-wanted = 5
"#,
    );
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    // limit = min(5, 5) - 2
    assert_eq!(stats.contents, 3);
    assert!(requests_to(&server, "/3/search/movie").await.is_empty());

    let series_searches = requests_to(&server, "/3/search/tv").await;
    assert_eq!(series_searches.len(), 1);
    assert!(has_param(&series_searches[0], "query", "x"));
    assert!(has_param(&series_searches[0], "page", "3"));

    assert!(storage.lock().unwrap().load_checkpoint().unwrap().is_none());
}

#[tokio::test]
async fn test_reviews_are_paged_until_cap_then_truncated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[603], 1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/3/movie/603"))
        .and(query_param("append_to_response", "reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 603,
            "title": "The Matrix",
            "reviews": review_page(1, 3)
        })))
        .expect(1)
        .mount(&server)
        .await;
    for page in [2, 3] {
        Mock::given(method("GET"))
            .and(path("/3/movie/603/reviews"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(review_page(page, 3)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "movie"
search-queries = ["matrix"]
results-wanted = 1

[extras]
collect-reviews = true
max-reviews-per-content = 25
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    coordinator.run().await.expect("Harvest failed");

    let records = storage.lock().unwrap().load_records(Some("reviews")).unwrap();
    assert_eq!(records.len(), 1);
    let reviews = records[0]["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 25);
    assert_eq!(reviews[0]["id"], "p1-0");
    assert_eq!(reviews[24]["id"], "p3-4");
    assert_eq!(records[0]["content_id"], 603);
}

#[tokio::test]
async fn test_failing_extra_discards_the_whole_item() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[11], 1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/3/movie/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "title": "Star Wars",
            "belongs_to_collection": {"id": 10, "name": "Star Wars Collection"},
            "credits": {"cast": [{"id": 2, "name": "Mark Hamill", "order": 0}], "crew": []}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/3/collection/10"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "movie"
search-queries = ["star wars"]
results-wanted = 1

[extras]
collect-credits = true
collect-collections = true
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 0);
    assert_eq!(stats.item_failures, 1);
    assert!(storage.lock().unwrap().load_records(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_listing_page_ends_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/discover/tv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[], 5)))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "tv"
results-wanted = 5

[discover]
year-from = 2020
year-to = 2021
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 0);
    assert_eq!(stats.api_failures, 0);
    let discovers = requests_to(&server, "/3/discover/tv").await;
    assert_eq!(discovers.len(), 1);
    assert!(has_param(&discovers[0], "first_air_date.gte", "2020-01-01"));
    assert!(has_param(&discovers[0], "first_air_date.lte", "2021-12-31"));

    let run = storage.lock().unwrap().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_people_credits_are_capped_and_results_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/person"))
        .and(query_param("query", "Keanu Reeves"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[6384, 1], 1)))
        .mount(&server)
        .await;
    let cast: Vec<Value> = (0..20)
        .map(|i| json!({"id": i, "media_type": "movie", "title": format!("Film {}", i)}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/3/person/6384"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 6384,
            "name": "Keanu Reeves",
            "combined_credits": {"cast": cast, "crew": []}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/3/person/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "person"
search-queries = ["Keanu Reeves"]

[people]
results-wanted = 1
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.people, 1);
    let people = storage.lock().unwrap().load_records(Some("person")).unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0]["combined_credits"]["cast"].as_array().unwrap().len(), 15);
}

#[tokio::test]
async fn test_interrupt_keeps_checkpoint_and_marks_run() {
    let server = MockServer::start().await;
    let storage = memory_storage();
    let checkpoint = Checkpoint {
        current_type: Some(ContentType::Movie),
        current_query: Some(Query::Discover),
        current_page: 2,
        ..Checkpoint::default()
    };
    storage
        .lock()
        .unwrap()
        .save_checkpoint(Some(&checkpoint))
        .unwrap();

    let config = test_config(&server, None, "[harvest]\ncontent-type = \"movie\"\n");
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    coordinator.interrupt().expect("Interrupt failed");

    let expected = Checkpoint {
        started_by_run: Some(coordinator.run_id()),
        ..checkpoint
    };
    let guard = storage.lock().unwrap();
    assert_eq!(guard.load_checkpoint().unwrap(), Some(expected));
    assert_eq!(
        guard.get_latest_run().unwrap().unwrap().status,
        RunStatus::Interrupted
    );
}

#[tokio::test]
async fn test_web_pagination_is_not_bounded_by_max_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("page", "1"))
        .respond_with(html(web_listing(
            "movie",
            &[1, 2],
            Some("/search/movie?query=heat&page=2"),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("page", "2"))
        .respond_with(html(web_listing("movie", &[3, 4], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/movie/\d+$"))
        .respond_with(html(web_detail("Heat")))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        None,
        r#"
[harvest]
content-type = "movie"
search-queries = ["heat"]
results-wanted = 4
max-pages = 1
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 4);
    assert_eq!(requests_to(&server, "/search/movie").await.len(), 2);
}

#[tokio::test]
async fn test_page_of_repeated_ids_does_not_end_web_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/tv"))
        .and(query_param("page", "1"))
        .respond_with(html(web_listing(
            "tv",
            &[1, 2],
            Some("/search/tv?query=lost&page=2"),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/tv"))
        .and(query_param("page", "2"))
        .respond_with(html(web_listing(
            "tv",
            &[1, 2],
            Some("/search/tv?query=lost&page=3"),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/tv"))
        .and(query_param("page", "3"))
        .respond_with(html(web_listing("tv", &[3], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/tv/\d+$"))
        .respond_with(html(web_detail("Lost")))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        None,
        r#"
[harvest]
content-type = "tv"
search-queries = ["lost"]
results-wanted = 10
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 3);
    assert_eq!(requests_to(&server, "/search/tv").await.len(), 3);
    assert_eq!(requests_to(&server, "/tv/1").await.len(), 1);
}

#[tokio::test]
async fn test_web_listing_without_cards_ends_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(html(web_listing(
            "movie",
            &[],
            Some("/search/movie?query=nothing&page=2"),
        )))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        None,
        r#"
[harvest]
content-type = "movie"
search-queries = ["nothing"]
results-wanted = 5
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 0);
    let listings = requests_to(&server, "/search/movie").await;
    assert_eq!(listings.len(), 1);
    assert!(has_param(&listings[0], "page", "1"));

    let run = storage.lock().unwrap().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_failing_item_does_not_abort_its_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[1, 2, 3], 1)))
        .mount(&server)
        .await;
    for id in [1, 3] {
        Mock::given(method("GET"))
            .and(path(format!("/3/movie/{}", id)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": id, "title": "Fine"})),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/3/movie/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "movie"
search-queries = ["mixed"]
results-wanted = 3
max-concurrency = 3
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 2);
    assert_eq!(stats.item_failures, 1);
    assert_eq!(stats.api_failures, 0);

    let records = storage.lock().unwrap().load_records(Some("content")).unwrap();
    let ids: Vec<u64> = records
        .iter()
        .filter_map(|r| r["tmdb_id"].as_u64())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&1) && ids.contains(&3));
}

#[tokio::test]
async fn test_fresh_rerun_refreshes_stored_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[1, 2], 1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/3/movie/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "Ronin"})))
        .mount(&server)
        .await;

    let sections = r#"
[harvest]
content-type = "movie"
search-queries = ["ronin"]
results-wanted = 2
"#;
    let storage = memory_storage();

    for _ in 0..2 {
        let config = test_config(&server, Some("key"), sections);
        let mut coordinator = Coordinator::with_storage(config, "test", true, storage.clone())
            .expect("Failed to create coordinator");
        let outcome = run_until(&mut coordinator, std::future::pending())
            .await
            .expect("Harvest failed");

        match outcome {
            HarvestOutcome::Completed(stats) => assert_eq!(stats.contents, 2),
            HarvestOutcome::Interrupted => panic!("harvest was not asked to stop"),
        }
    }

    assert_eq!(requests_to(&server, "/3/movie/1").await.len(), 2);
    assert_eq!(count(&storage, "content"), 2);
}

#[tokio::test]
async fn test_shutdown_persists_checkpoint_and_reports_interrupted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(&[1], 1))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "movie"
search-queries = ["slow"]
results-wanted = 1
"#,
    );
    let storage = memory_storage();
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let outcome = run_until(&mut coordinator, tokio::time::sleep(Duration::from_millis(200)))
        .await
        .expect("Harvest failed");

    assert_eq!(outcome, HarvestOutcome::Interrupted);
    let guard = storage.lock().unwrap();
    let checkpoint = guard.load_checkpoint().unwrap().expect("checkpoint kept");
    assert_eq!(checkpoint.current_type, Some(ContentType::Movie));
    assert_eq!(checkpoint.current_query, Some(Query::Search("slow".to_string())));
    assert_eq!(checkpoint.started_by_run, Some(coordinator.run_id()));
    assert_eq!(
        guard.get_latest_run().unwrap().unwrap().status,
        RunStatus::Interrupted
    );
}

#[tokio::test]
async fn test_resume_inside_type_keeps_budget_spent_by_earlier_types() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3/search/tv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[41, 42, 43, 44], 1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/3/tv/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Show"})))
        .mount(&server)
        .await;

    let storage = memory_storage();
    let checkpoint = Checkpoint {
        current_type: Some(ContentType::Series),
        budget_at_query_start: Some(2),
        ..Checkpoint::default()
    };
    storage
        .lock()
        .unwrap()
        .save_checkpoint(Some(&checkpoint))
        .unwrap();

    let config = test_config(
        &server,
        Some("key"),
        r#"
[harvest]
content-type = "both"
search-queries = ["x"]
results-wanted = 5
"#,
    );
    let mut coordinator = Coordinator::with_storage(config, "test", false, storage.clone())
        .expect("Failed to create coordinator");

    let stats = coordinator.run().await.expect("Harvest failed");

    assert_eq!(stats.contents, 2);
    assert!(requests_to(&server, "/3/search/movie").await.is_empty());
    assert_eq!(count(&storage, "content"), 2);
}
