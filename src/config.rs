//! Source registry and comparison plans.
//!
//! Sources are described in a YAML file, either a list of entries or a single
//! entry:
//!
//! ```yaml
//! - name: warehouse
//!   kind: sqlite
//!   path: ./warehouse.db
//!   read_only: true
//! - name: scratch      # no path: in-memory
//!   kind: duckdb
//! ```
//!
//! The file is found by trying, in order, an explicit path, the
//! `COMPARATOR_CONFIG_FILE` environment variable, and
//! `~/.comparator/config.yaml`. Entry names are cleaned into identifiers
//! (`"my_beAutiful --Db?"` becomes `my_beautiful_db`). Relative database paths
//! are resolved against the config file's directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::comps::CompSpec;
use crate::set::{one_or_many, ComparatorSet, ComparisonConfig};
use crate::source::{SqliteSource, Source};

/// Environment variable naming the source config file.
pub const CONFIG_FILE_ENV: &str = "COMPARATOR_CONFIG_FILE";

/// Config file used when neither a path nor the environment variable is given.
pub const DEFAULT_CONFIG_FILE: &str = "~/.comparator/config.yaml";

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("Invalid name cleaning regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Sqlite,
    Duckdb,
}

/// One configured source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DbEntry {
    pub name: String,
    #[serde(default)]
    pub kind: SourceKind,
    /// Database file; in-memory when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub read_only: bool,
}

/// The loaded source registry, keyed by cleaned name.
#[derive(Debug, Clone)]
pub struct DbConfig {
    path: PathBuf,
    dbs: IndexMap<String, DbEntry>,
}

impl DbConfig {
    /// Find and load the config file.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let candidates = [
            ("provided path", config_file.map(Path::to_path_buf)),
            (CONFIG_FILE_ENV, std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from)),
            ("default path", Some(PathBuf::from(DEFAULT_CONFIG_FILE))),
        ];
        let path = first_existing(candidates).context("could not find a valid configuration file")?;
        Self::from_path(&path)
    }

    /// Load a specific config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        info!(path = %path.display(), "loading source config");
        Self::from_yaml(&text, path)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Parse config text. `path` is used to resolve relative database paths.
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_str(text)?;
        let items = match doc {
            serde_yaml::Value::Sequence(items) => items,
            serde_yaml::Value::Null => Vec::new(),
            other => vec![other],
        };

        let mut dbs = IndexMap::new();
        for item in items {
            if !item.is_mapping() {
                warn!(?item, "misconfigured db, ignoring");
                continue;
            }
            if item.get("name").and_then(serde_yaml::Value::as_str).is_none() {
                warn!(?item, "db has no name, ignoring");
                continue;
            }

            let mut entry: DbEntry = serde_yaml::from_value(item)?;
            let mut name = clean_db_name(&entry.name);
            if dbs.contains_key(&name) {
                let mut i = 1;
                while dbs.contains_key(&format!("{name}_{i}")) {
                    i += 1;
                }
                name = format!("{name}_{i}");
            }
            entry.name = name.clone();
            dbs.insert(name, entry);
        }

        Ok(Self {
            path: path.to_path_buf(),
            dbs,
        })
    }

    /// The file this config was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.dbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dbs.is_empty()
    }

    /// Cleaned source names, in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dbs.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&DbEntry> {
        self.dbs.get(name)
    }

    /// Open the named source.
    pub fn connect(&self, name: &str) -> Result<Rc<dyn Source>> {
        let entry = self.get(name).with_context(|| {
            format!("no source named {name:?} in {}", self.path.display())
        })?;
        let db_path = entry.path.as_deref().map(|p| self.resolve(p));

        match entry.kind {
            SourceKind::Sqlite => {
                let source = match &db_path {
                    Some(path) => SqliteSource::open(path, entry.read_only)?,
                    None => SqliteSource::open_in_memory()?,
                };
                Ok(Rc::new(source.with_name(name)))
            }
            SourceKind::Duckdb => connect_duckdb(name, db_path.as_deref(), entry.read_only),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let path = expand_home(path);
        if path.is_relative() {
            if let Some(dir) = self.path.parent() {
                return dir.join(path);
            }
        }
        path
    }
}

#[cfg(feature = "duckdb")]
fn connect_duckdb(name: &str, path: Option<&Path>, read_only: bool) -> Result<Rc<dyn Source>> {
    use crate::source::DuckDbSource;

    let source = match path {
        Some(path) => DuckDbSource::open(path, read_only)?,
        None => DuckDbSource::open_in_memory()?,
    };
    Ok(Rc::new(source.with_name(name)))
}

#[cfg(not(feature = "duckdb"))]
fn connect_duckdb(name: &str, _path: Option<&Path>, _read_only: bool) -> Result<Rc<dyn Source>> {
    anyhow::bail!("source {name:?} is a duckdb database, but this build has no duckdb support (enable the `duckdb` feature)")
}

/// Turn a display name into an identifier: runs of non-word characters become
/// `_`, surrounding `_` are trimmed, and the result is lower-cased.
pub fn clean_db_name(name: &str) -> String {
    NON_WORD_RE
        .replace_all(name, "_")
        .trim_matches('_')
        .to_lowercase()
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// The first candidate that exists; missing ones are logged and skipped.
fn first_existing<I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = (&'static str, Option<PathBuf>)>,
{
    for (origin, candidate) in candidates {
        let Some(candidate) = candidate else {
            continue;
        };
        let path = expand_home(&candidate);
        if path.exists() {
            info!(origin, path = %path.display(), "using config file");
            return Some(path);
        }
        warn!(origin, path = %path.display(), "config path does not exist, falling back");
    }
    None
}

/// A set of comparisons to run between two configured sources.
///
/// ```yaml
/// left: warehouse
/// right: replica
/// default_comp: [len, first]
/// comparisons:
///   - name: recent orders
///     lquery: SELECT id FROM orders ORDER BY id DESC LIMIT 10
///     rquery: SELECT id FROM orders WHERE id IN {{ id }} ORDER BY id DESC
///     comps: basic
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonPlan {
    pub left: String,
    #[serde(default)]
    pub right: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub default_comp: Option<Vec<CompSpec>>,
    pub comparisons: Vec<ComparisonConfig>,
}

impl ComparisonPlan {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read plan {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("failed to parse plan {}", path.display()))
    }

    /// Connect the plan's sources and build its comparator set.
    pub fn build(self, dbs: &DbConfig) -> Result<ComparatorSet> {
        let left = dbs.connect(&self.left)?;
        let right = self.right.as_deref().map(|name| dbs.connect(name)).transpose()?;
        let set = ComparatorSet::from_dict(self.comparisons, Some(left), right, self.default_comp)?;
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_db_name() {
        assert_eq!(clean_db_name("my_beAutiful --Db?"), "my_beautiful_db");
        assert_eq!(clean_db_name("__Default__"), "default");
        assert_eq!(clean_db_name("a.b.c"), "a_b_c");
    }

    #[test]
    fn test_from_yaml_list() {
        let yaml = r#"
- name: "my_beAutiful --Db?"
  kind: sqlite
  path: data.db
- name: My Beautiful DB
- name: my beautiful db
  kind: duckdb
- just a string
- kind: sqlite
"#;
        let config = DbConfig::from_yaml(yaml, Path::new("/etc/comparator/config.yaml")).unwrap();
        assert_eq!(
            config.names().collect::<Vec<_>>(),
            ["my_beautiful_db", "my_beautiful_db_1", "my_beautiful_db_2"]
        );
        let entry = config.get("my_beautiful_db").unwrap();
        assert_eq!(entry.kind, SourceKind::Sqlite);
        assert_eq!(entry.path.as_deref(), Some(Path::new("data.db")));
        assert!(!entry.read_only);
        assert_eq!(config.get("my_beautiful_db_2").unwrap().kind, SourceKind::Duckdb);
    }

    #[test]
    fn test_from_yaml_single_mapping() {
        let config = DbConfig::from_yaml("name: solo\nread_only: true\n", Path::new("c.yaml")).unwrap();
        assert_eq!(config.len(), 1);
        assert!(config.get("solo").unwrap().read_only);
    }

    #[test]
    fn test_from_yaml_bad_kind() {
        let err = DbConfig::from_yaml("- name: x\n  kind: oracle\n", Path::new("c.yaml"));
        assert!(err.is_err());
    }

    #[test]
    fn test_connect_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(
            &config_path,
            "- name: Main DB\n  path: main.sqlite\n- name: mem\n",
        )
        .unwrap();

        let config = DbConfig::from_path(&config_path).unwrap();
        let main = config.connect("main_db").unwrap();
        main.execute("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        assert_eq!(main.name(), "main_db");
        assert!(dir.path().join("main.sqlite").exists());

        let mem = config.connect("mem").unwrap();
        assert_eq!(mem.query("SELECT 1 AS one").unwrap().len(), 1);

        assert!(config.connect("nope").is_err());
    }

    #[test]
    fn test_load_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "- name: x\n").unwrap();

        let config = DbConfig::load(Some(&config_path)).unwrap();
        assert_eq!(config.path(), config_path);
    }

    #[test]
    fn test_first_existing_skips_missing() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.yaml");
        fs::write(&real, "[]").unwrap();

        let found = first_existing([
            ("provided path", Some(dir.path().join("missing.yaml"))),
            ("env", None),
            ("default", Some(real.clone())),
        ]);
        assert_eq!(found, Some(real));
        assert_eq!(first_existing([("provided path", None)]), None);
    }

    #[test]
    fn test_plan_builds_set() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "- name: left\n- name: right\n").unwrap();
        let dbs = DbConfig::from_path(&config_path).unwrap();

        let plan: ComparisonPlan = serde_yaml::from_str(
            r#"
left: left
right: right
default_comp: len
comparisons:
  - name: constant
    lquery: SELECT 1 AS a
  - lquery: SELECT 1 AS a
    comps: [basic, first]
"#,
        )
        .unwrap();
        let mut set = plan.build(&dbs).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].comps()[0].name(), "len_comp");

        let outcomes = set.run_comparisons().unwrap();
        assert!(outcomes.iter().flatten().all(|o| o.is_truthy()));
    }
}
