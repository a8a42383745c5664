//! Many threads appending at once.

use std::sync::Arc;

use mongo_appender::store::MemoryStore;
use mongo_appender::{LogSink, MongoAppender};

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_all_persisted() {
    let store = Arc::new(MemoryStore::new());
    let errors = common::RecordedErrors::default();
    let appender = MongoAppender::builder(store.clone())
        .error_handler(errors.handler())
        .build()
        .unwrap();

    let threads: Vec<_> = (0..8)
        .map(|t| {
            let appender = appender.clone();
            std::thread::spawn(move || {
                for i in 0..250 {
                    appender.append_one(common::event(&format!("t{t}-{i}")));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    appender.flush().await;

    assert!(errors.all().is_empty());
    assert_eq!(store.documents("logs").len(), 2000);
    assert_eq!(store.insert_one_calls(), 2000);
    assert_eq!(store.insert_many_calls(), 0);
    assert!(!store.create_calls().is_empty());
    assert!(appender.router().is_provisioned("logs"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_writes_tolerate_creation_race() {
    let store = Arc::new(MemoryStore::new());
    let errors = common::RecordedErrors::default();
    let appender = MongoAppender::builder(store.clone())
        .collection_name(Some("race".into()))
        .error_handler(errors.handler())
        .build()
        .unwrap();

    let writes: Vec<_> = (0..16)
        .map(|i| {
            let appender = appender.clone();
            tokio::spawn(async move { appender.write_one(&common::event(&format!("w{i}"))).await })
        })
        .collect();
    for write in writes {
        write.await.unwrap().unwrap();
    }

    assert!(errors.all().is_empty());
    assert_eq!(store.documents("race").len(), 16);
    assert!(appender.router().is_provisioned("race"));
}
