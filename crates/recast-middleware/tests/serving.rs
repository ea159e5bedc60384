//! End-to-end request handling over both backends

use pretty_assertions::assert_eq;
use recast_artifact::Fingerprint;
use recast_middleware::{
    Outcome, RecastConfig, Reply, CACHE_HASH_HEADER, CACHE_HEADER, CACHE_HIT_HEADER,
};
use recast_test_utils::{setup_interceptor, FailingTransformer, SourceTree, UppercaseTransformer};
use std::sync::Arc;
use tempfile::TempDir;

fn reply(outcome: Outcome) -> Reply {
    outcome.into_reply().expect("request should be answered")
}

fn hash_of(reply: &Reply) -> Fingerprint {
    reply.header(CACHE_HASH_HEADER).unwrap().parse().unwrap()
}

#[tokio::test]
async fn memory_hit_then_touch_recomputes() {
    let tree = SourceTree::with_files(&[("a.js", "let x = 1")]);
    tree.set_mtime("a.js", 1_000);
    let engine = Arc::new(UppercaseTransformer::new());
    let interceptor = setup_interceptor(&tree.config(), Arc::clone(&engine));

    let first = reply(interceptor.handle("/a.js").await);
    assert_eq!(first.header(CACHE_HEADER), Some("true"));
    assert_eq!(first.header(CACHE_HIT_HEADER), Some("false"));
    let old = hash_of(&first);
    assert_eq!(first.into_text().await.unwrap(), "LET X = 1");

    let second = reply(interceptor.handle("/a.js").await);
    assert_eq!(second.header(CACHE_HIT_HEADER), Some("true"));
    assert_eq!(hash_of(&second), old);
    assert_eq!(second.into_text().await.unwrap(), "LET X = 1");
    assert_eq!(engine.calls(), 1);

    tree.touch("a.js", "let y = 2");
    let third = reply(interceptor.handle("/a.js").await);
    assert_eq!(third.header(CACHE_HIT_HEADER), Some("false"));
    assert_ne!(hash_of(&third), old);
    assert_eq!(third.into_text().await.unwrap(), "LET Y = 2");
    assert_eq!(engine.calls(), 2);

    assert!(interceptor.cache().store().get(&old).await.is_none());
}

#[tokio::test]
async fn disk_touch_unlinks_old_artifact() {
    let tree = SourceTree::with_files(&[("a.js", "one")]);
    let cache_dir = TempDir::new().unwrap();
    let config = tree.config().with_cache_path(cache_dir.path().to_str().unwrap());
    let interceptor = setup_interceptor(&config, Arc::new(UppercaseTransformer::new()));

    let first = reply(interceptor.handle("/a.js").await);
    let old = hash_of(&first);
    assert_eq!(first.into_text().await.unwrap(), "ONE");
    interceptor.cache().flush().await;
    assert!(cache_dir.path().join(old.file_name(".js")).exists());

    tree.touch("a.js", "two");
    let second = reply(interceptor.handle("/a.js").await);
    let new = hash_of(&second);
    assert_eq!(second.into_text().await.unwrap(), "TWO");
    interceptor.cache().flush().await;

    assert!(!cache_dir.path().join(old.file_name(".js")).exists());
    assert_eq!(
        std::fs::read_to_string(cache_dir.path().join(new.file_name(".js"))).unwrap(),
        "TWO"
    );
}

#[tokio::test]
async fn warm_disk_cache_is_served_after_restart() {
    let tree = SourceTree::with_files(&[("a.js", "warm")]);
    let cache_dir = TempDir::new().unwrap();
    let config = tree.config().with_cache_path(cache_dir.path().to_str().unwrap());

    let before = setup_interceptor(&config, Arc::new(UppercaseTransformer::new()));
    reply(before.handle("/a.js").await);
    before.cache().flush().await;
    drop(before);

    let engine = Arc::new(UppercaseTransformer::new());
    let after = setup_interceptor(&config, Arc::clone(&engine));
    let served = reply(after.handle("/a.js").await);
    assert_eq!(served.header(CACHE_HIT_HEADER), Some("true"));
    assert_eq!(served.into_text().await.unwrap(), "WARM");
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn deleted_cache_directory_is_recreated() {
    let tree = SourceTree::with_files(&[("a.js", "heal")]);
    let parent = TempDir::new().unwrap();
    let cache_dir = parent.path().join("cache");
    let config = tree.config().with_cache_path(cache_dir.to_str().unwrap());
    let engine = Arc::new(UppercaseTransformer::new());
    let interceptor = setup_interceptor(&config, Arc::clone(&engine));

    let first = reply(interceptor.handle("/a.js").await);
    let fp = hash_of(&first);
    interceptor.cache().flush().await;
    std::fs::remove_dir_all(&cache_dir).unwrap();

    let second = reply(interceptor.handle("/a.js").await);
    assert_eq!(second.header(CACHE_HIT_HEADER), Some("false"));
    assert_eq!(second.into_text().await.unwrap(), "HEAL");
    interceptor.cache().flush().await;

    assert_eq!(engine.calls(), 2);
    assert!(cache_dir.join(fp.file_name(".js")).exists());
}

#[tokio::test]
async fn failed_disk_write_still_serves_output() {
    let tree = SourceTree::with_files(&[("a.js", "unsaved")]);
    let parent = TempDir::new().unwrap();
    let blocker = parent.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let config = tree
        .config()
        .with_cache_path(blocker.join("cache").to_str().unwrap());
    let engine = Arc::new(UppercaseTransformer::new());
    let interceptor = setup_interceptor(&config, Arc::clone(&engine));

    let first = reply(interceptor.handle("/a.js").await);
    assert_eq!(first.into_text().await.unwrap(), "UNSAVED");
    interceptor.cache().flush().await;
    assert!(interceptor.cache().index().is_empty());

    let second = reply(interceptor.handle("/a.js").await);
    assert_eq!(second.header(CACHE_HIT_HEADER), Some("false"));
    assert_eq!(second.into_text().await.unwrap(), "UNSAVED");
    assert_eq!(engine.calls(), 2);
}

#[tokio::test]
async fn excluded_paths_are_always_raw() {
    let tree = SourceTree::with_files(&[("vendor/lib.js", "raw one"), ("app.js", "app")]);
    let engine = Arc::new(UppercaseTransformer::new());
    let config = tree.config().with_exclude(["vendor/**"]);
    let interceptor = setup_interceptor(&config, Arc::clone(&engine));

    let first = reply(interceptor.handle("/vendor/lib.js").await);
    assert_eq!(first.header(CACHE_HEADER), Some("false"));
    assert_eq!(first.into_text().await.unwrap(), "raw one");

    tree.touch("vendor/lib.js", "raw two");
    let second = reply(interceptor.handle("/vendor/lib.js").await);
    assert_eq!(second.into_text().await.unwrap(), "raw two");
    assert_eq!(engine.calls(), 0);

    let app = reply(interceptor.handle("/app.js").await);
    assert_eq!(app.into_text().await.unwrap(), "APP");
}

#[tokio::test]
async fn side_artifact_round_trip() {
    let tree = SourceTree::with_files(&[("lib/a.js", "mapped")]);
    let interceptor = setup_interceptor(&tree.config(), Arc::new(UppercaseTransformer::with_map()));

    assert!(interceptor.handle("/lib/a.js.map").await.is_next());

    let code = reply(interceptor.handle("/lib/a.js").await);
    assert_eq!(
        code.into_text().await.unwrap(),
        "MAPPED\n//# sourceMappingURL=a.js.map"
    );

    let map = reply(interceptor.handle("/lib/a.js.map").await);
    assert_eq!(map.header("content-type"), Some("application/json"));
    assert_eq!(
        map.into_text().await.unwrap(),
        r#"{"version":3,"sources":["a.js"]}"#
    );
    assert!(interceptor.handle("/lib/b.js.map").await.is_next());
}

#[tokio::test]
async fn failures_are_isolated_and_retried() {
    let tree = SourceTree::with_files(&[("bad.js", "BROKEN here"), ("good.js", "fine")]);
    let engine = Arc::new(FailingTransformer::new("BROKEN"));
    let interceptor = setup_interceptor(&tree.config(), Arc::clone(&engine));

    for _ in 0..2 {
        let failed = reply(interceptor.handle("/bad.js").await);
        assert_eq!(failed.status(), 500);
        assert_eq!(failed.into_text().await.unwrap(), "Unexpected token in BROKEN");
    }
    assert_eq!(engine.calls(), 2);

    let good = reply(interceptor.handle("/good.js").await);
    assert_eq!(good.status(), 200);
    assert_eq!(good.into_text().await.unwrap(), "FINE");
}

#[tokio::test]
async fn console_errors_render_script() {
    let tree = SourceTree::with_files(&[("bad.js", "BROKEN")]);
    let config = tree.config().with_console_errors(true);
    let interceptor = setup_interceptor(&config, Arc::new(FailingTransformer::new("BROKEN")));

    let failed = reply(interceptor.handle("/bad.js").await);
    assert_eq!(failed.status(), 200);
    assert_eq!(
        failed.header("content-type"),
        Some("application/javascript; charset=utf-8")
    );
    let body = failed.into_text().await.unwrap();
    assert!(body.starts_with("/* Transformation error from recast */"));
    assert!(body.contains("\"codeFrame\":\"> 1 | BROKEN\""));
    assert!(body.ends_with("console.error(\"Unexpected token in BROKEN\", output.codeFrame)"));
}

#[tokio::test]
async fn concurrent_first_requests_agree() {
    let tree = SourceTree::with_files(&[("a.js", "race")]);
    let engine = Arc::new(UppercaseTransformer::new());
    let interceptor = setup_interceptor(&tree.config(), Arc::clone(&engine));

    let (left, right) =
        futures::future::join(interceptor.handle("/a.js"), interceptor.handle("/a.js")).await;
    let left = reply(left).into_text().await.unwrap();
    let right = reply(right).into_text().await.unwrap();

    assert_eq!(left, "RACE");
    assert_eq!(left, right);
    assert!((1..=2).contains(&engine.calls()));
}

#[tokio::test]
async fn non_files_and_escapes_delegate() {
    let root = SourceTree::with_files(&[("site/dir/a.js", "a"), ("outside.js", "secret")]);
    let config = RecastConfig::new(root.file("site"));
    let engine = Arc::new(UppercaseTransformer::new());
    let interceptor = setup_interceptor(&config, Arc::clone(&engine));

    assert!(interceptor.handle("/dir").await.is_next());
    assert!(interceptor.handle("/missing.js").await.is_next());
    assert!(interceptor.handle("/../outside.js").await.is_next());
    assert!(interceptor.handle("/dir/../../outside.js").await.is_next());
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn disk_hit_keeps_configured_content_type() {
    let tree = SourceTree::with_files(&[("a.css", "body {}")]);
    let cache_dir = TempDir::new().unwrap();
    let mut config = tree.config().with_cache_path(cache_dir.path().to_str().unwrap());
    config.output_extension = ".out".to_string();
    config.content_type = "text/css; charset=utf-8".to_string();
    let interceptor = setup_interceptor(&config, Arc::new(UppercaseTransformer::new()));

    let miss = reply(interceptor.handle("/a.css").await);
    assert_eq!(miss.header(CACHE_HIT_HEADER), Some("false"));
    let miss_type = miss.header("content-type").map(str::to_string);
    assert_eq!(miss.into_text().await.unwrap(), "BODY {}");
    interceptor.cache().flush().await;

    let hit = reply(interceptor.handle("/a.css").await);
    assert_eq!(hit.header(CACHE_HIT_HEADER), Some("true"));
    assert_eq!(hit.header("content-type").map(str::to_string), miss_type);
    assert_eq!(miss_type.as_deref(), Some("text/css; charset=utf-8"));
    assert_eq!(hit.into_text().await.unwrap(), "BODY {}");
}

#[tokio::test]
async fn bounded_memory_recomputes_evicted_entry() {
    let tree = SourceTree::with_files(&[("big.js", "this payload is larger than the bound")]);
    let config = tree.config().with_memory_capacity(8);
    let engine = Arc::new(UppercaseTransformer::new());
    let interceptor = setup_interceptor(&config, Arc::clone(&engine));

    let first = reply(interceptor.handle("/big.js").await);
    assert_eq!(first.header(CACHE_HIT_HEADER), Some("false"));
    let fp = hash_of(&first);
    interceptor.cache().flush().await;
    assert!(interceptor.cache().store().get(&fp).await.is_none());

    let second = reply(interceptor.handle("/big.js").await);
    assert_eq!(second.header(CACHE_HIT_HEADER), Some("false"));
    assert_eq!(hash_of(&second), fp);
    assert_eq!(
        second.into_text().await.unwrap(),
        "THIS PAYLOAD IS LARGER THAN THE BOUND"
    );
    assert_eq!(engine.calls(), 2);
}
