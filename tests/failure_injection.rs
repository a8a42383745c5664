//! Failure injection tests: write-path failures are reported, never raised.

use std::sync::Arc;
use std::time::Duration;

use mongo_appender::store::memory::Operation;
use mongo_appender::store::MemoryStore;
use mongo_appender::{LogSink, MongoAppender};

mod common;

#[tokio::test]
async fn test_insert_failure_reported_then_recovers() {
    let store = Arc::new(MemoryStore::new());
    let errors = common::RecordedErrors::default();
    let appender = MongoAppender::builder(store.clone())
        .error_handler(errors.handler())
        .build()
        .unwrap();

    store.fail(Operation::Insert, "node is recovering");
    appender.append_one(common::event("lost"));
    appender.flush().await;
    assert_eq!(errors.kinds(), vec!["storage"]);
    assert!(errors.all()[0].2.contains("node is recovering"));

    store.recover(Operation::Insert);
    appender.append_one(common::event("kept"));
    appender.flush().await;
    assert_eq!(errors.all().len(), 1);
    assert_eq!(common::messages(&store.documents("logs")), vec!["kept"]);
}

#[tokio::test]
async fn test_create_failure_is_retried_on_next_write() {
    let store = Arc::new(MemoryStore::new());
    let errors = common::RecordedErrors::default();
    let appender = MongoAppender::builder(store.clone())
        .error_handler(errors.handler())
        .build()
        .unwrap();

    store.fail(Operation::CreateCollection, "not authorized");
    appender.write_one(&common::event("a")).await.unwrap();
    assert!(!appender.router().is_provisioned("logs"));
    assert_eq!(errors.all()[0].0, "ensure_collection");

    store.recover(Operation::CreateCollection);
    store.hide_listings(true);
    appender.write_one(&common::event("b")).await.unwrap();
    assert!(appender.router().is_provisioned("logs"));
    assert_eq!(store.create_calls().len(), 1);
}

#[tokio::test]
async fn test_index_failure_reported() {
    let store = Arc::new(MemoryStore::new());
    store.fail(Operation::CreateIndex, "index options conflict");
    let errors = common::RecordedErrors::default();
    let appender = MongoAppender::builder(store.clone())
        .expire_after_seconds(60)
        .error_handler(errors.handler())
        .build()
        .unwrap();

    appender.append_one(common::event("x"));
    appender.flush().await;

    assert_eq!(store.documents("logs").len(), 1);
    assert_eq!(errors.kinds(), vec!["storage"]);
}

#[tokio::test]
async fn test_index_failure_not_lost_behind_insert_failure() {
    let store = Arc::new(MemoryStore::new());
    store.fail(Operation::Insert, "not primary");
    store.fail(Operation::CreateIndex, "index options conflict");
    let errors = common::RecordedErrors::default();
    let appender = MongoAppender::builder(store.clone())
        .expire_after_seconds(60)
        .error_handler(errors.handler())
        .build()
        .unwrap();

    appender.append_one(common::event("x"));
    appender.flush().await;

    let all = errors.all();
    assert_eq!(all.len(), 2);
    assert_eq!((all[0].0, all[0].1), ("ensure_ttl_index", "storage"));
    assert!(all[0].2.contains("index options conflict"));
    assert_eq!((all[1].0, all[1].1), ("append_one", "storage"));
    assert!(all[1].2.contains("not primary"));
    assert!(store.documents("logs").is_empty());
}

#[tokio::test]
async fn test_backpressure_drops_and_reports() {
    let store = Arc::new(common::GatedStore::closed());
    let errors = common::RecordedErrors::default();
    let appender = MongoAppender::builder(store.clone())
        .max_pending_writes(2)
        .error_handler(errors.handler())
        .build()
        .unwrap();

    for i in 0..5 {
        appender.append_one(common::event(&format!("e{i}")));
    }
    assert_eq!(appender.pending_writes(), 2);
    assert_eq!(errors.kinds(), vec!["backpressure"; 3]);

    store.open();
    appender.flush().await;
    assert_eq!(store.inner.documents("logs").len(), 2);
    assert_eq!(appender.pending_writes(), 0);
}

#[tokio::test]
async fn test_slow_write_times_out() {
    let store = Arc::new(common::GatedStore::slow(Duration::from_secs(30)));
    let errors = common::RecordedErrors::default();
    let appender = MongoAppender::builder(store.clone())
        .write_timeout(Some(Duration::from_millis(50)))
        .error_handler(errors.handler())
        .build()
        .unwrap();

    appender.append_one(common::event("slow"));
    appender.flush().await;

    assert_eq!(errors.kinds(), vec!["timeout"]);
    assert!(store.inner.documents("logs").is_empty());
}

#[tokio::test]
async fn test_shutdown_drains_then_drops() {
    let store = Arc::new(common::GatedStore::closed());
    let appender = MongoAppender::builder(store.clone()).build().unwrap();

    appender.append_one(common::event("in flight"));
    let draining = {
        let appender = appender.clone();
        tokio::spawn(async move { appender.shutdown().await })
    };
    tokio::task::yield_now().await;
    store.open();
    draining.await.unwrap();

    appender.append_one(common::event("too late"));
    appender.flush().await;
    assert_eq!(common::messages(&store.inner.documents("logs")), vec!["in flight"]);
}
