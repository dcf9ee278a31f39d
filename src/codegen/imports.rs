//! # Import Collection
//!
//! Works out the `import` declarations of the generated unit.
//!
//! Paths fall in two groups:
//! - explicit imports declared by `require` blocks, kept in traversal order
//! - candidates that entry-point blocks import on demand: the standard
//!   packages the built-in templates reference, followed by the user's
//!   package list
//!
//! A candidate is imported when its package name shows up as a qualifier in
//! the entry point's subtree.

use super::literal::go_string_literal;
use std::collections::{BTreeMap, BTreeSet};

/// Standard packages referenced by the built-in templates
pub const STANDARD_IMPORT_CANDIDATES: [&str; 6] = ["context", "log", "os", "os/signal", "time", "strings"];

/// Package name an import path is assumed to declare, used when no
/// descriptor of the package has been loaded.
///
/// Major-version suffixes and a `go-` prefix are skipped, and the name stops
/// at the first character that cannot appear in an identifier:
/// `github.com/redis/go-redis/v9` is `redis` and `gopkg.in/yaml.v3` is `yaml`.
pub fn package_short_name(path: &str) -> &str {
    let path = path.trim().trim_matches('"').trim_end_matches('/');
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);

    if is_major_version(last) {
        if let Some(previous) = segments.next() {
            last = previous;
        }
    }

    let name = last.strip_prefix("go-").unwrap_or(last);
    match name.find(|c: char| !(c.is_alphanumeric() || c == '_')) {
        Some(0) | None => name,
        Some(end) => &name[..end],
    }
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// Candidates whose package is in `used` or listed in `always`, in candidate
/// order.
///
/// `known` maps import paths to the package names their loaded descriptors
/// declare. Paths missing from it fall back to [`package_short_name`].
pub fn infer_imports(
    candidates: &[String],
    used: &BTreeSet<String>,
    always: &[&str],
    known: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<String> {
    let is_required = |name: &str| used.contains(name) || always.contains(&name);

    let mut imports = Vec::new();
    for candidate in candidates {
        let required = match known.get(candidate) {
            Some(names) if !names.is_empty() => names.iter().any(|name| is_required(name.as_str())),
            _ => is_required(package_short_name(candidate)),
        };
        if required && !imports.contains(candidate) {
            imports.push(candidate.clone());
        }
    }
    imports
}

/// Deduplicated import paths in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    paths: Vec<String>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the path was already present
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.paths.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    pub fn extend<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = String>,
    {
        for path in paths {
            self.insert(path);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Import declaration block, or an empty string when nothing is imported
    pub fn render(&self, indent: &str) -> String {
        match self.paths.as_slice() {
            [] => String::new(),
            [single] => format!("import {}\n", go_string_literal(single)),
            many => {
                let mut out = String::from("import (\n");
                for path in many {
                    out.push_str(indent);
                    out.push_str(&go_string_literal(path));
                    out.push('\n');
                }
                out.push_str(")\n");
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn used(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn candidates(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_short_names() {
        assert_eq!(package_short_name("net/http"), "http");
        assert_eq!(package_short_name("\"os/signal\""), "signal");
        assert_eq!(package_short_name("fmt"), "fmt");
        assert_eq!(package_short_name("github.com/redis/go-redis/v9"), "redis");
        assert_eq!(package_short_name("github.com/mattn/go-sqlite3"), "sqlite3");
        assert_eq!(package_short_name("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(package_short_name("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(package_short_name("v2"), "v2");
    }

    #[test]
    fn test_inference_follows_candidate_order() {
        let all = candidates(&["context", "log", "os", "os/signal", "time", "strings"]);
        let imports = infer_imports(&all, &used(&["time", "os", "signal"]), &[], &BTreeMap::new());
        assert_eq!(imports, vec!["os", "os/signal", "time"]);
    }

    #[test]
    fn test_inference_from_package_list() {
        let list = candidates(&["fmt", "net/http"]);
        let imports = infer_imports(&list, &used(&["http", "w"]), &[], &BTreeMap::new());
        assert_eq!(imports, vec!["net/http"]);
    }

    #[test]
    fn test_inference_prefers_declared_package_names() {
        let list = candidates(&["github.com/acme/tools/gen", "github.com/mattn/go-sqlite3"]);
        let known = BTreeMap::from([(
            "github.com/acme/tools/gen".to_string(),
            BTreeSet::from(["generator".to_string()]),
        )]);

        assert_eq!(infer_imports(&list, &used(&["gen"]), &[], &known), Vec::<String>::new());
        assert_eq!(
            infer_imports(&list, &used(&["generator", "sqlite3"]), &[], &known),
            vec!["github.com/acme/tools/gen", "github.com/mattn/go-sqlite3"]
        );
    }

    #[test]
    fn test_always_required() {
        let all = candidates(&["context", "log"]);
        assert_eq!(infer_imports(&all, &used(&[]), &["log"], &BTreeMap::new()), vec!["log"]);
    }

    #[test]
    fn test_table_dedup_and_render() {
        let mut table = ImportTable::new();
        assert!(table.insert("net/http"));
        assert!(!table.insert("net/http"));
        assert_eq!(table.render("\t"), "import \"net/http\"\n");

        table.extend(vec!["log".to_string(), "net/http".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.render("\t"), "import (\n\t\"net/http\"\n\t\"log\"\n)\n");
        assert_eq!(ImportTable::new().render("\t"), "");
    }
}
