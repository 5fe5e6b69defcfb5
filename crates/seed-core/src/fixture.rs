//! Fixture discovery and parsing.
//!
//! A table has a fixture when `<fixtures_dir>/<table>.json` exists. Its content
//! must be a JSON array of objects; each object is one record keyed by field
//! or column name.

use crate::error::{SeedError, SeedResult};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension for relational fixtures
pub const FIXTURE_EXTENSION: &str = "json";

/// A single fixture record: field name to value, in file order.
pub type Record = Map<String, Value>;

/// Parsed fixture data for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub table: String,
    pub records: Vec<Record>,
}

impl Fixture {
    /// Parse fixture content for `table`. `path` is only used for error reporting.
    pub fn parse(table: &str, path: &Path, content: &str) -> SeedResult<Self> {
        let parse_error = |reason: String| SeedError::FixtureParse {
            table: table.to_string(),
            path: path.to_path_buf(),
            reason,
        };

        let value: Value =
            serde_json::from_str(content).map_err(|e| parse_error(format!("invalid JSON: {e}")))?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(parse_error(format!(
                    "expected an array of records, found {}",
                    json_kind(&other)
                )))
            }
        };

        let records = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(parse_error(format!(
                    "record {index} is {}, expected an object",
                    json_kind(&other)
                ))),
            })
            .collect::<SeedResult<Vec<_>>>()?;

        Ok(Self {
            table: table.to_string(),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Seed plan entry: a table and its fixture, if any.
pub type PlannedFixture = (String, Option<Fixture>);

/// Resolves table names to fixture files in a single directory.
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    dir: PathBuf,
    available: HashSet<String>,
}

impl FixtureLoader {
    /// List `dir` once and remember which tables have fixture files.
    pub async fn open(dir: impl Into<PathBuf>) -> SeedResult<Self> {
        let dir = dir.into();
        let directory_error = |source| SeedError::FixtureDirectory {
            path: dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(directory_error)?;
        let mut available = HashSet::new();

        while let Some(entry) = entries.next_entry().await.map_err(directory_error)? {
            let path = entry.path();
            // Follows symlinks
            let metadata = tokio::fs::metadata(&path).await.map_err(directory_error)?;
            if !metadata.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(FIXTURE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                available.insert(stem.to_string());
            }
        }

        debug!(
            "Found {} fixture files in {}",
            available.len(),
            dir.display()
        );

        Ok(Self { dir, available })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn has_fixture(&self, table: &str) -> bool {
        self.available.contains(table)
    }

    pub fn fixture_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.{FIXTURE_EXTENSION}"))
    }

    /// Load the fixture for `table`; a missing file is `Ok(None)`.
    pub async fn load(&self, table: &str) -> SeedResult<Option<Fixture>> {
        if !self.has_fixture(table) {
            return Ok(None);
        }

        let path = self.fixture_path(table);
        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| SeedError::FixtureParse {
                    table: table.to_string(),
                    path: path.clone(),
                    reason: format!("failed to read file: {e}"),
                })?;

        Fixture::parse(table, &path, &content).map(Some)
    }

    /// Load fixtures for every table in `order`, preserving the order.
    pub async fn load_all(&self, order: &[String]) -> SeedResult<Vec<PlannedFixture>> {
        let mut plan = Vec::with_capacity(order.len());
        for table in order {
            let fixture = self.load(table).await?;
            plan.push((table.clone(), fixture));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_records_in_order() {
        let fixture = Fixture::parse(
            "user",
            Path::new("user.json"),
            r#"[{"id": 1, "name": "alice"}, {"id": 2, "name": "bob"}]"#,
        )
        .unwrap();
        assert_eq!(fixture.len(), 2);
        assert_eq!(fixture.records[1]["name"], "bob");
    }

    #[test]
    fn test_parse_rejects_object_root() {
        let err = Fixture::parse("user", Path::new("user.json"), r#"{"id": 1}"#).unwrap_err();
        match err {
            SeedError::FixtureParse { table, reason, .. } => {
                assert_eq!(table, "user");
                assert!(reason.contains("an object"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_object_record() {
        let err = Fixture::parse("tag", Path::new("tag.json"), r#"[{"id": 1}, 42]"#).unwrap_err();
        assert!(err.to_string().contains("record 1 is a number"));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = Fixture::parse("tag", Path::new("tag.json"), "[{").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn test_loader_only_sees_json_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("user.json"), "[]").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(temp_dir.path().join("tag.json")).unwrap();

        let loader = FixtureLoader::open(temp_dir.path()).await.unwrap();
        assert!(loader.has_fixture("user"));
        assert!(!loader.has_fixture("notes"));
        assert!(!loader.has_fixture("tag"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_loader_follows_symlinked_fixture() {
        let shared = TempDir::new().unwrap();
        let target = shared.path().join("users.json");
        std::fs::write(&target, r#"[{"id": 1}]"#).unwrap();

        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(&target, temp_dir.path().join("user.json")).unwrap();

        let loader = FixtureLoader::open(temp_dir.path()).await.unwrap();
        assert!(loader.has_fixture("user"));
        let fixture = loader.load("user").await.unwrap().unwrap();
        assert_eq!(fixture.len(), 1);
    }

    #[tokio::test]
    async fn test_load_all_skips_missing_tables() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("user.json"),
            r#"[{"id": 1}, {"id": 2}]"#,
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("tag.json"), r#"[{"id": 1}]"#).unwrap();

        let loader = FixtureLoader::open(temp_dir.path()).await.unwrap();
        let order = vec!["user".to_string(), "tag".to_string(), "article".to_string()];
        let plan = loader.load_all(&order).await.unwrap();

        let summary: Vec<_> = plan
            .iter()
            .map(|(table, fixture)| (table.as_str(), fixture.as_ref().map(Fixture::len)))
            .collect();
        assert_eq!(
            summary,
            vec![("user", Some(2)), ("tag", Some(1)), ("article", None)]
        );
    }

    #[tokio::test]
    async fn test_load_reports_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("user.json"), "not json").unwrap();

        let loader = FixtureLoader::open(temp_dir.path()).await.unwrap();
        let err = loader.load("user").await.unwrap_err();
        match err {
            SeedError::FixtureParse { table, path, .. } => {
                assert_eq!(table, "user");
                assert!(path.ends_with("user.json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_open_missing_directory() {
        let err = FixtureLoader::open("/nonexistent/fixtures").await.unwrap_err();
        assert!(matches!(err, SeedError::FixtureDirectory { .. }));
    }
}
