use anyhow::Result;
use clickup_csv::client::{ClickUpClient, RetryPolicy};
use clickup_csv::error::ExportError;
use clickup_csv::export::run_export;
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn test_client(base_url: &str, retry: RetryPolicy) -> ClickUpClient {
    ClickUpClient::new(base_url, "pk_test_token".to_string(), retry)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        initial_delay: Duration::from_millis(10),
    }
}

fn task_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Task {}", id),
        "assignees": [{"username": "alice"}],
        "status": {"status": "open"},
        "priority": null
    })
}

fn tasks_page(page: usize, count: usize) -> serde_json::Value {
    let tasks: Vec<serde_json::Value> = (0..count)
        .map(|i| task_json(&format!("p{}t{}", page, i)))
        .collect();
    json!({ "tasks": tasks })
}

#[tokio::test]
async fn pagination_stops_on_short_page() -> Result<()> {
    let mut server = Server::new_async().await;

    // Pages of sizes [100, 100, 37]: exactly 3 requests, 237 tasks.
    let mut mocks = Vec::new();
    for (page, count) in [(0, 100), (1, 100), (2, 37)] {
        let mock = server
            .mock("GET", "/list/list42/task")
            .match_query(Matcher::UrlEncoded("page".into(), page.to_string()))
            .with_status(200)
            .with_body(tasks_page(page, count).to_string())
            .create_async()
            .await;
        mocks.push(mock);
    }

    let client = test_client(&server.url(), fast_retry());
    let tasks = client.fetch_all_tasks("list42").await?;

    assert_eq!(tasks.len(), 237);
    assert_eq!(tasks[0].id, "p0t0");
    assert_eq!(tasks[236].id, "p2t36");
    for mock in &mocks {
        mock.assert_async().await;
    }
    Ok(())
}

#[tokio::test]
async fn empty_first_page_yields_no_tasks() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/list/list42/task")
        .match_query(Matcher::UrlEncoded("page".into(), "0".into()))
        .with_status(200)
        .with_body(json!({ "tasks": [] }).to_string())
        .create_async()
        .await;

    let client = test_client(&server.url(), fast_retry());
    let tasks = client.fetch_all_tasks("list42").await?;

    assert!(tasks.is_empty());
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn retry_recovers_after_backoff() -> Result<()> {
    let mut server = Server::new_async().await;
    // Two rate-limited responses, then success. Mocks with a hit budget
    // are served in creation order, so the 429s are consumed first.
    let limited = server
        .mock("GET", "/task/t1/comment")
        .with_status(429)
        .expect(2)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/task/t1/comment")
        .with_status(200)
        .with_body(
            json!({
                "comments": [{
                    "comment_text": "made it through",
                    "user": {"username": "alice"},
                    "date": "1712345678901"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let client = test_client(
        &server.url(),
        RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(30),
        },
    );

    let start = Instant::now();
    let comments = client.fetch_comments("t1").await?;
    let elapsed = start.elapsed();

    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment_text, "made it through");
    // Exactly two sleeps, doubling: 30ms then 60ms.
    assert!(
        elapsed >= Duration::from_millis(90),
        "expected two backoff sleeps, elapsed {:?}",
        elapsed
    );
    limited.assert_async().await;
    ok.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn backoff_doubles_then_gives_up_after_max_attempts() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/task/t1/comment")
        .with_status(429)
        .expect(3)
        .create_async()
        .await;

    let client = test_client(
        &server.url(),
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(20),
        },
    );

    let start = Instant::now();
    let err = client.fetch_comments("t1").await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(
        err,
        ExportError::RateLimitExhausted { attempts: 3 }
    ));
    // Sleeps of 20ms, 40ms, 80ms (doubling each attempt).
    assert!(
        elapsed >= Duration::from_millis(140),
        "expected geometric backoff, elapsed {:?}",
        elapsed
    );
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn non_429_error_is_terminal_without_retry() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/task/t1/comment")
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;

    let client = test_client(
        &server.url(),
        RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
        },
    );

    let start = Instant::now();
    let err = client.fetch_comments("t1").await.unwrap_err();

    // No retry budget spent: fails fast, well before one backoff period.
    assert!(start.elapsed() < Duration::from_secs(1));
    match err {
        ExportError::Api { message } => {
            assert!(message.contains("500"), "unexpected message: {}", message);
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn export_emits_one_row_per_comment_and_placeholders() -> Result<()> {
    let mut server = Server::new_async().await;

    let tasks = json!({
        "tasks": [
            {
                "id": "t1",
                "name": "Write report",
                "assignees": [{"username": "alice"}, {"username": "bob"}],
                "status": {"status": "in progress"},
                "priority": {"priority": "high"}
            },
            {
                "id": "t2",
                "name": "Review budget",
                "assignees": [],
                "status": {"status": "open"},
                "priority": null
            }
        ]
    });
    let list_mock = server
        .mock("GET", "/list/list42/task")
        .match_query(Matcher::UrlEncoded("page".into(), "0".into()))
        .with_status(200)
        .with_body(tasks.to_string())
        .create_async()
        .await;

    let t1_comments = json!({
        "comments": [
            {
                "comment_text": "First draft\nneeds work  ",
                "user": {"username": "carol"},
                "date": "1712345678901"
            },
            {
                "comment_text": "Looks better now",
                "user": null,
                "date": "1712345678902"
            }
        ]
    });
    let t1_mock = server
        .mock("GET", "/task/t1/comment")
        .with_status(200)
        .with_body(t1_comments.to_string())
        .create_async()
        .await;
    let t2_mock = server
        .mock("GET", "/task/t2/comment")
        .with_status(200)
        .with_body(json!({ "comments": [] }).to_string())
        .create_async()
        .await;

    let dir = tempdir()?;
    let output = dir.path().join("export.csv");
    let client = test_client(&server.url(), fast_retry());

    let summary = run_export(&client, "list42", &output, Duration::from_millis(0)).await?;

    assert_eq!(summary.task_count, 2);
    assert_eq!(summary.row_count, 3);
    assert_eq!(summary.tasks_without_comments, 1);

    let mut reader = csv::Reader::from_path(&output)?;
    let headers = reader.headers()?.clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "Task ID",
            "Task Name",
            "Assignees",
            "Task Status",
            "Priority",
            "Comment Text",
            "Comment Author",
            "Comment Date"
        ]
    );

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 3);

    // t1 rows in comment fetch order, with normalization and defaults.
    assert_eq!(&rows[0][0], "t1");
    assert_eq!(&rows[0][2], "alice, bob");
    assert_eq!(&rows[0][4], "high");
    assert_eq!(&rows[0][5], "First draft needs work");
    assert_eq!(&rows[0][6], "carol");
    assert_eq!(&rows[0][7], "1712345678901");

    assert_eq!(&rows[1][0], "t1");
    assert_eq!(&rows[1][6], "Unknown");

    // Commentless t2 gets exactly one placeholder row.
    assert_eq!(&rows[2][0], "t2");
    assert_eq!(&rows[2][4], "None");
    assert_eq!(&rows[2][5], "");
    assert_eq!(&rows[2][6], "");
    assert_eq!(&rows[2][7], "");

    list_mock.assert_async().await;
    t1_mock.assert_async().await;
    t2_mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn export_throttles_between_tasks() -> Result<()> {
    let mut server = Server::new_async().await;

    let tasks = json!({
        "tasks": [task_json("a"), task_json("b"), task_json("c")]
    });
    server
        .mock("GET", "/list/list42/task")
        .match_query(Matcher::UrlEncoded("page".into(), "0".into()))
        .with_status(200)
        .with_body(tasks.to_string())
        .create_async()
        .await;
    for id in ["a", "b", "c"] {
        server
            .mock("GET", format!("/task/{}/comment", id).as_str())
            .with_status(200)
            .with_body(json!({ "comments": [] }).to_string())
            .create_async()
            .await;
    }

    let dir = tempdir()?;
    let output = dir.path().join("export.csv");
    let client = test_client(&server.url(), fast_retry());

    let start = Instant::now();
    let summary = run_export(&client, "list42", &output, Duration::from_millis(50)).await?;

    // Two pauses between three tasks.
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(summary.task_count, 3);
    assert_eq!(summary.row_count, 3);
    Ok(())
}
