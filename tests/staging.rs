// tests/staging.rs

use std::fs;

use launcher::cache::ResourceCache;
use launcher::layout::staging_path;
use launcher::repository::Repository;
use launcher_test_utils::{ArchiveBuilder, LauncherHome, init_tracing, with_timeout};

fn bundle() -> ArchiveBuilder {
    ArchiveBuilder::new()
        .dir("bin/")
        .file_with("bin/tool", "#!/bin/sh\n", 0o755, 1_650_000_000)
        .file("share/doc.txt", "docs")
}

#[tokio::test]
async fn each_format_is_staged_under_its_identity() {
    init_tracing();
    let home = LauncherHome::new()
        .with_artifact("org/example/a/1.0/a-1.0.tar.gz", &bundle())
        .with_artifact("org/example/b/1.0/b-1.0.tar.xz", &bundle())
        .with_artifact("org/example/c/1.0/c-1.0.tar.bz2", &bundle())
        .with_artifact("org/example/d/1.0/d-1.0.zip", &bundle());
    let repository = home.repository();
    let cache = home.cache();

    for reference in [
        "org.example:a:1.0",
        "org.example:b:1.0:tar.xz",
        "org.example:c:1.0:tar.bz2",
        "repo:org.example:d:1.0:zip",
    ] {
        let resource = repository.resolve(reference).unwrap();
        let staged = with_timeout(cache.stage(&resource)).await.unwrap();
        assert_eq!(staged, home.layout().cache_dir().join(resource.id()));
        assert_eq!(fs::read_to_string(staged.join("share/doc.txt")).unwrap(), "docs");
        assert!(staged.join("bin/tool").is_file(), "{reference}");
    }
}

#[tokio::test]
async fn staging_is_idempotent() {
    let home = LauncherHome::new().with_artifact("tools/bundle.tar.gz", &bundle());
    let resource = home.repository().resolve("tools/bundle.tar.gz").unwrap();
    let cache = home.cache();

    let first = cache.stage(&resource).await.unwrap();
    fs::write(first.join("marker"), "kept").unwrap();

    let second = cache.stage(&resource).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(second.join("marker")).unwrap(), "kept");
}

#[tokio::test]
async fn concurrent_stagers_publish_one_complete_entry() {
    init_tracing();
    let home = LauncherHome::new().with_artifact("tools/bundle.tar.gz", &bundle());
    let resource = home.repository().resolve("tools/bundle.tar.gz").unwrap();
    let root = home.layout().cache_dir();
    let a = ResourceCache::with_tag(&root, "a");
    let b = ResourceCache::with_tag(&root, "b");

    let (first, second) = with_timeout(async { tokio::join!(a.stage(&resource), b.stage(&resource)) }).await;
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(first.join("share/doc.txt")).unwrap(), "docs");

    assert!(!staging_path(&first, "a").exists());
    assert!(!staging_path(&first, "b").exists());
}

#[tokio::test]
async fn missing_artifact_fails_when_awaited() {
    let home = LauncherHome::new();
    let resource = home.repository().resolve("org.example:absent:1.0").unwrap();
    let err = home.cache().stage(&resource).await.unwrap_err();
    assert!(err.to_string().contains("absent-1.0.tar.gz"), "{err}");
    assert!(!home.layout().cache_dir().join(resource.id()).exists());
}
