// Unit tests for the automation worker

use super::*;
use crate::test_support::{heading_page, login_page, FakeBackend};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::Ordering;

const PAGE: &str = "https://example.com/";

fn worker(backend: FakeBackend) -> AutomationWorker<FakeBackend> {
    AutomationWorker::new(backend, WorkerConfig::default())
}

fn page_url() -> Url {
    Url::parse(PAGE).unwrap()
}

#[tokio::test]
async fn test_run_returns_document_tree() {
    let backend = FakeBackend::new().with_page(PAGE, login_page());
    let closes = backend.close_count();
    let root = worker(backend).run(&page_url()).await.unwrap();

    assert_eq!(root.tag, "html");
    assert_eq!(root.xpath, "/html");
    assert_eq!(root.children.len(), 2);

    let form = &root.children[1].children[0];
    assert_eq!(form.css, "#login");
    assert_eq!(form.children[2].xpath, r#"//*[@id="login"]/input[3]"#);
    assert_eq!(form.children[2].css, "form#login > input:nth-of-type(3)");
    assert_eq!(root.count(), 12);

    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_launch_failure_skips_close() {
    let backend = FakeBackend::new().failing_launch("geckodriver not found in PATH");
    let closes = backend.close_count();
    let err = worker(backend).run(&page_url()).await.unwrap_err();

    assert_eq!(
        err,
        LoadFailure::Launch("geckodriver not found in PATH".into())
    );
    assert_eq!(closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_navigation_failure_closes_session() {
    let backend = FakeBackend::new();
    let closes = backend.close_count();
    let err = worker(backend)
        .run(&Url::parse("https://unreachable.invalid/").unwrap())
        .await
        .unwrap_err();

    match err {
        LoadFailure::Navigate { url, message } => {
            assert_eq!(url, "https://unreachable.invalid/");
            assert!(message.contains("ERR_NAME_NOT_RESOLVED"));
        }
        other => panic!("expected navigation failure, got {:?}", other),
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_script_failure_is_extract_error() {
    let backend = FakeBackend::new().with_broken_script(PAGE, "javascript error: boom");
    let closes = backend.close_count();
    let err = worker(backend).run(&page_url()).await.unwrap_err();

    assert_eq!(err, LoadFailure::Extract("javascript error: boom".into()));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_navigation_timeout() {
    let backend = FakeBackend::new()
        .with_page(PAGE, login_page())
        .with_navigate_delay(Duration::from_secs(5));
    let closes = backend.close_count();
    let worker = AutomationWorker::new(
        backend,
        WorkerConfig {
            navigation_timeout: Duration::from_millis(50),
        },
    );

    let err = worker.run(&page_url()).await.unwrap_err();
    assert_eq!(
        err,
        LoadFailure::Timeout {
            url: PAGE.into(),
            timeout: Duration::from_millis(50),
        }
    );
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_spawn_posts_result_with_ticket() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let backend = FakeBackend::new().with_page(PAGE, heading_page("Hello"));
    let ticket = LoadTicket::new();

    worker(backend).spawn(ticket, page_url(), tx).await.unwrap();

    match rx.recv().await {
        Some(ShellEvent::LoadFinished {
            ticket: got,
            result,
        }) => {
            assert_eq!(got, ticket);
            let root = result.unwrap();
            assert_eq!(root.children[1].children[0].xpath, r#"//*[@id="title"]"#);
        }
        _ => panic!("expected a load result"),
    }
}

#[test]
fn test_parse_extraction_accepts_json_string() {
    let text = serde_json::to_string(&heading_page("Hi")).unwrap();
    let root = parse_extraction(Value::String(text)).unwrap();
    assert_eq!(root.children[1].value, "Hi");
}

#[test]
fn test_parse_extraction_rejects_other_shapes() {
    assert_eq!(
        parse_extraction(Value::Null).unwrap_err(),
        LoadFailure::Extract("Page has no document element".into())
    );
    assert_eq!(
        parse_extraction(json!([1, 2])).unwrap_err(),
        LoadFailure::Extract("Expected an element object, got an array".into())
    );
    assert!(matches!(
        parse_extraction(Value::String("not json".into())),
        Err(LoadFailure::Extract(_))
    ));
    assert!(matches!(
        parse_extraction(json!({"tag": "html", "children": "oops"})),
        Err(LoadFailure::Extract(_))
    ));
}

#[test]
fn test_tickets_are_distinct() {
    assert_ne!(LoadTicket::new(), LoadTicket::new());
}
