//! Seed and mirror runs through the application layer, using in-memory backends.

use bucket_mirror::testing::InMemoryObjectStore;
use fixture_reset::{mirror_fixtures, seed_fixtures, shutdown_token, MirrorOpts, SeedOpts};
use mysql_fixtures::testing::{ForeignKey, InMemoryDatabase};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn application_database() -> InMemoryDatabase {
    InMemoryDatabase::new(
        &[
            "user",
            "tag",
            "user_tag_relation",
            "article",
            "article_tag_relation",
        ],
        vec![
            ForeignKey::new("tag", "created_by", "user", "id"),
            ForeignKey::new("user_tag_relation", "user_id", "user", "id"),
            ForeignKey::new("user_tag_relation", "tag_id", "tag", "id"),
            ForeignKey::new("article", "user_id", "user", "id"),
            ForeignKey::new("article_tag_relation", "article_id", "article", "id"),
            ForeignKey::new("article_tag_relation", "tag_id", "tag", "id"),
        ],
    )
}

fn seed_opts(dir: &Path) -> SeedOpts {
    SeedOpts {
        fixtures_dir: dir.to_path_buf(),
        schema_file: None,
        batch_size: 2,
    }
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_seed_application_fixtures() {
    let fixtures = TempDir::new().unwrap();
    write(
        &fixtures.path().join("user.json"),
        r#"[
            {"id": 1, "name": "alice", "code": "a", "createdAt": "2024-01-01 00:00:00"},
            {"id": 2, "name": "bob", "code": "b"},
            {"id": 3, "name": "carol", "code": "c"}
        ]"#,
    );
    write(
        &fixtures.path().join("tag.json"),
        r#"[{"id": 1, "name": "rust", "createdBy": 1, "isOfficial": true}]"#,
    );
    write(
        &fixtures.path().join("article.json"),
        r#"[{"id": 10, "title": "Hello", "articlePath": "hello.md", "userId": 2}]"#,
    );
    write(
        &fixtures.path().join("article_tag_relation.json"),
        r#"[{"id": 1, "articleId": 10, "tagId": 1}]"#,
    );

    let mut db = application_database();
    let report = seed_fixtures(
        &mut db,
        &seed_opts(fixtures.path()),
        false,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        report.order,
        vec![
            "user",
            "tag",
            "user_tag_relation",
            "article",
            "article_tag_relation"
        ]
    );
    assert_eq!(report.total_rows(), 6);
    assert_eq!(report.skipped, vec!["user_tag_relation"]);

    assert_eq!(db.row_count("user"), 3);
    assert_eq!(db.rows("tag")[0].get("created_by"), Some(&serde_json::json!(1)));
    assert_eq!(db.rows("article")[0].get("user_id"), Some(&serde_json::json!(2)));
    assert_eq!(db.commits, 1);
}

#[tokio::test]
async fn test_seed_error_carries_context() {
    let fixtures = TempDir::new().unwrap();
    write(&fixtures.path().join("tag.json"), "{not json");

    let mut db = application_database();
    let err = seed_fixtures(
        &mut db,
        &seed_opts(fixtures.path()),
        false,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.starts_with("Failed to seed database"));
    assert!(message.contains("tag"));
    assert_eq!(db.transactions_started, 0);
}

#[tokio::test]
async fn test_seed_dry_run_writes_nothing() {
    let fixtures = TempDir::new().unwrap();
    write(
        &fixtures.path().join("user.json"),
        r#"[{"id": 1, "name": "alice", "code": "a"}]"#,
    );

    let mut db = application_database();
    let report = seed_fixtures(
        &mut db,
        &seed_opts(fixtures.path()),
        true,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.rows_for("user"), Some(1));
    assert_eq!(db.transactions_started, 0);
    assert_eq!(db.row_count("user"), 0);
}

#[tokio::test]
async fn test_mirror_fixtures_replaces_bucket() {
    let fixtures = TempDir::new().unwrap();
    write(&fixtures.path().join("avatars/alice.png"), "alice");
    write(&fixtures.path().join("avatars/team/bob.png"), "bob");

    let store = InMemoryObjectStore::new(2);
    store.insert("avatars", "stale.png", b"old");

    let opts = MirrorOpts {
        bucket_fixtures_dir: fixtures.path().to_path_buf(),
        buckets: vec![],
        s3_force_path_style: false,
    };
    let reports = mirror_fixtures(&store, &opts, false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].deleted, 1);
    assert_eq!(reports[0].uploaded, 2);

    let keys: Vec<String> = store.objects("avatars").into_keys().collect();
    assert_eq!(keys, vec!["alice.png", "team/bob.png"]);
}

#[tokio::test]
async fn test_mirror_unknown_bucket_filter_fails() {
    let fixtures = TempDir::new().unwrap();
    write(&fixtures.path().join("avatars/alice.png"), "alice");

    let store = InMemoryObjectStore::new(10);
    store.create_bucket("avatars");

    let opts = MirrorOpts {
        bucket_fixtures_dir: fixtures.path().to_path_buf(),
        buckets: vec!["missing".to_string()],
        s3_force_path_style: false,
    };
    let err = mirror_fixtures(&store, &opts, false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("missing"));
    assert!(store.objects("avatars").is_empty());
}

#[tokio::test]
async fn test_shutdown_token_fires_on_timeout() {
    let token = shutdown_token(Some(Duration::from_millis(20)));
    tokio::time::timeout(Duration::from_secs(5), token.cancelled())
        .await
        .unwrap();
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn test_shutdown_token_without_timeout_stays_open() {
    let token = shutdown_token(None);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!token.is_cancelled());
    token.cancel();
}
