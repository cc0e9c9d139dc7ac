//! YAML test definitions
//!
//! ```yaml
//! suites:
//!   - name: Home page
//!     only: true
//!     tests:
//!       - name: renders hero
//!         command: "curl -sf http://localhost:8080/"
//!     suites:
//!       - name: Footer
//!         tests:
//!           - name: has links
//!             command: "true"
//! ```
//!
//! Nested suite names are joined with ` > `. The first suite marked `only`
//! (depth first, declaration order) restricts the file to its own subtree.

use serde::Deserialize;
use std::path::Path;

use super::{LoadedFile, SuiteLoader};
use crate::error::ConfigError;
use crate::models::Task;

const SUITE_SEPARATOR: &str = " > ";

#[derive(Debug, Default, Deserialize)]
struct SpecFile {
    #[serde(default)]
    suites: Vec<SuiteDef>,
}

#[derive(Debug, Deserialize)]
struct SuiteDef {
    name: String,
    #[serde(default)]
    only: bool,
    #[serde(default)]
    tests: Vec<TestDef>,
    #[serde(default)]
    suites: Vec<SuiteDef>,
}

#[derive(Debug, Deserialize)]
struct TestDef {
    name: String,
    #[serde(default)]
    command: Option<String>,
}

/// Loads `*.yaml` spec files
#[derive(Clone, Debug, Default)]
pub struct YamlSuiteLoader;

impl YamlSuiteLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse spec content; `path` is only recorded on the tasks
    pub fn parse(&self, capability: &str, path: &Path, content: &str) -> Result<LoadedFile, ConfigError> {
        if content.trim().is_empty() {
            return Ok(LoadedFile::default());
        }
        let spec: SpecFile = serde_yaml::from_str(content).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let ctx = Flatten { capability, path };

        if let Some((suite, name)) = find_only(&spec.suites, None) {
            let mut tasks = Vec::new();
            ctx.collect(suite, &name, true, &mut tasks);
            return Ok(LoadedFile::new(tasks).with_only(name));
        }

        let mut tasks = Vec::new();
        for suite in &spec.suites {
            ctx.collect(suite, &suite.name, false, &mut tasks);
        }
        Ok(LoadedFile::new(tasks))
    }
}

impl SuiteLoader for YamlSuiteLoader {
    fn load(&self, capability: &str, path: &Path) -> Result<LoadedFile, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.parse(capability, path, &content)
    }
}

struct Flatten<'a> {
    capability: &'a str,
    path: &'a Path,
}

impl Flatten<'_> {
    fn collect(&self, suite: &SuiteDef, full_name: &str, only: bool, out: &mut Vec<Task>) {
        for test in &suite.tests {
            let mut task = Task::new(self.capability, full_name, &test.name)
                .with_file(self.path)
                .with_only(only);
            if let Some(command) = &test.command {
                task = task.with_command(command);
            }
            out.push(task);
        }
        for child in &suite.suites {
            let child_name = format!("{full_name}{SUITE_SEPARATOR}{}", child.name);
            self.collect(child, &child_name, only, out);
        }
    }
}

/// First suite marked `only`, with its full name
fn find_only<'a>(suites: &'a [SuiteDef], parent: Option<&str>) -> Option<(&'a SuiteDef, String)> {
    for suite in suites {
        let full_name = match parent {
            Some(p) => format!("{p}{SUITE_SEPARATOR}{}", suite.name),
            None => suite.name.clone(),
        };
        if suite.only {
            return Some((suite, full_name));
        }
        if let Some(found) = find_only(&suite.suites, Some(&full_name)) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PLAIN: &str = r#"
suites:
  - name: Home
    tests:
      - name: renders
        command: "true"
      - name: links
    suites:
      - name: Footer
        tests:
          - name: copyright
  - name: Search
    tests:
      - name: empty query
"#;

    const WITH_ONLY: &str = r#"
suites:
  - name: Home
    tests:
      - name: renders
  - name: Checkout
    suites:
      - name: Cart
        only: true
        tests:
          - name: add item
        suites:
          - name: Coupons
            tests:
              - name: apply
      - name: Payment
        only: true
        tests:
          - name: pay
"#;

    fn parse(content: &str) -> LoadedFile {
        YamlSuiteLoader::new()
            .parse("chrome", Path::new("spec/home.yaml"), content)
            .unwrap()
    }

    fn names(loaded: &LoadedFile) -> Vec<(String, String)> {
        loaded
            .tasks
            .iter()
            .map(|t| (t.suite().to_string(), t.name().to_string()))
            .collect()
    }

    #[test]
    fn test_declaration_order_and_nesting() {
        let loaded = parse(PLAIN);
        assert!(!loaded.has_only);
        assert_eq!(
            names(&loaded),
            vec![
                ("Home".to_string(), "renders".to_string()),
                ("Home".to_string(), "links".to_string()),
                ("Home > Footer".to_string(), "copyright".to_string()),
                ("Search".to_string(), "empty query".to_string()),
            ]
        );
        assert_eq!(loaded.tasks[0].command(), Some("true"));
        assert_eq!(loaded.tasks[1].command(), None);
        assert_eq!(loaded.tasks[0].capability(), "chrome");
        assert_eq!(loaded.tasks[0].file(), PathBuf::from("spec/home.yaml"));
    }

    #[test]
    fn test_first_only_suite_wins_within_file() {
        let loaded = parse(WITH_ONLY);
        assert!(loaded.has_only);
        assert_eq!(loaded.only_suite_name.as_deref(), Some("Checkout > Cart"));
        assert_eq!(
            names(&loaded),
            vec![
                ("Checkout > Cart".to_string(), "add item".to_string()),
                ("Checkout > Cart > Coupons".to_string(), "apply".to_string()),
            ]
        );
        assert!(loaded.tasks.iter().all(Task::is_only));
    }

    #[test]
    fn test_invalid_yaml_is_load_error() {
        let err = YamlSuiteLoader::new()
            .parse("chrome", Path::new("bad.yaml"), "suites: [ { tests: 3 } ]")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_empty_file() {
        let loaded = parse("");
        assert!(loaded.tasks.is_empty());
        assert!(!loaded.has_only);
    }
}
