//! Pattern registry for utterance classification
//!
//! Loads a declarative catalog of named regex patterns, compiles each one
//! case-insensitively at construction, and exposes matching over raw text.
//! The registry is immutable once built and can be shared across threads.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::info;

use crate::error::{KeepsakeError, Result};

/// A single catalog entry
///
/// Unknown fields in the source document are ignored; a missing
/// `modifier_tags` defaults to the empty set.
#[derive(Debug, Clone, Deserialize)]
pub struct Pattern {
    /// Unique identifier within the catalog
    pub name: String,
    /// Case-insensitive match expression
    pub regex: String,
    /// Signed contribution to the raw score; negatives mark noise
    pub weight: i32,
    /// Free-form tag such as "medical" or "filler"
    pub category: String,
    /// Tags consulted by modifier rules, e.g. "severity_amplifiable"
    #[serde(default)]
    pub modifier_tags: BTreeSet<String>,
}

impl Pattern {
    /// Whether this pattern carries the given modifier tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.modifier_tags.contains(tag)
    }
}

#[derive(Debug)]
struct CompiledPattern {
    pattern: Pattern,
    matcher: Regex,
}

/// A match of one catalog pattern against an utterance
#[derive(Debug, Clone)]
pub struct PatternMatch<'a> {
    pub pattern: &'a Pattern,
    /// Byte spans of every occurrence within the text
    pub spans: Vec<(usize, usize)>,
}

/// Compiled, read-only pattern catalog
#[derive(Debug)]
pub struct PatternRegistry {
    compiled: Vec<CompiledPattern>,
}

impl PatternRegistry {
    /// Build a registry from a JSON array of catalog entries
    ///
    /// Duplicate names and invalid regexes are rejected.
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<Pattern> =
            serde_json::from_str(raw).map_err(|e| KeepsakeError::Pattern(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// Build a registry from a catalog file on disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Build the built-in default catalog
    pub fn builtin() -> Result<Self> {
        Self::from_json(super::catalog::DEFAULT_CATALOG)
    }

    fn from_entries(entries: Vec<Pattern>) -> Result<Self> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut compiled = Vec::with_capacity(entries.len());

        for entry in entries {
            if !seen.insert(entry.name.clone()) {
                return Err(KeepsakeError::Pattern(format!(
                    "duplicate pattern name: {}",
                    entry.name
                )));
            }

            let matcher = RegexBuilder::new(&entry.regex)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    KeepsakeError::Pattern(format!("pattern '{}' failed to compile: {e}", entry.name))
                })?;

            compiled.push(CompiledPattern {
                pattern: entry,
                matcher,
            });
        }

        info!("Compiled pattern registry with {} entries", compiled.len());
        Ok(Self { compiled })
    }

    /// Every pattern that matches the text, in registry order, with spans
    pub fn match_all<'a>(&'a self, text: &str) -> Vec<PatternMatch<'a>> {
        self.compiled
            .iter()
            .filter_map(|entry| {
                let spans: Vec<(usize, usize)> = entry
                    .matcher
                    .find_iter(text)
                    .map(|m| (m.start(), m.end()))
                    .collect();
                if spans.is_empty() {
                    None
                } else {
                    Some(PatternMatch {
                        pattern: &entry.pattern,
                        spans,
                    })
                }
            })
            .collect()
    }

    /// Number of patterns in the catalog
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// True when the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Iterate over the catalog entries in registry order
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.compiled.iter().map(|c| &c.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_compiles() {
        let registry = PatternRegistry::builtin().expect("builtin catalog should compile");
        assert!(registry.len() >= 40, "expected at least 40 entries, got {}", registry.len());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let raw = r#"[
            {"name": "a", "regex": "x", "weight": 1, "category": "c"},
            {"name": "a", "regex": "y", "weight": 2, "category": "c"}
        ]"#;
        let result = PatternRegistry::from_json(raw);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let raw = r#"[{"name": "bad", "regex": "(unclosed", "weight": 1, "category": "c"}]"#;
        let result = PatternRegistry::from_json(raw);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("bad"));
    }

    #[test]
    fn test_unknown_fields_ignored_and_tags_default_empty() {
        let raw = r#"[
            {"name": "a", "regex": "hello", "weight": -5, "category": "greeting", "comment": "legacy"}
        ]"#;
        let registry = PatternRegistry::from_json(raw).expect("should load");
        let pattern = registry.patterns().next().unwrap();
        assert!(pattern.modifier_tags.is_empty());
        assert_eq!(pattern.weight, -5);
    }

    #[test]
    fn test_match_all_case_insensitive_with_spans() {
        let raw = r#"[
            {"name": "greeting", "regex": "\\b(hello|hi)\\b", "weight": -5, "category": "greeting"}
        ]"#;
        let registry = PatternRegistry::from_json(raw).expect("should load");
        let matches = registry.match_all("HELLO there, hi again");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern.name, "greeting");
        assert_eq!(matches[0].spans.len(), 2);
        assert_eq!(matches[0].spans[0], (0, 5));
    }

    #[test]
    fn test_match_all_registry_order() {
        let raw = r#"[
            {"name": "second", "regex": "world", "weight": 1, "category": "c"},
            {"name": "first", "regex": "hello", "weight": 1, "category": "c"}
        ]"#;
        let registry = PatternRegistry::from_json(raw).expect("should load");
        let matches = registry.match_all("hello world");
        let names: Vec<_> = matches.iter().map(|m| m.pattern.name.as_str()).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_no_matches_on_punctuation() {
        let registry = PatternRegistry::builtin().expect("builtin catalog should compile");
        let matches = registry.match_all("?!... --- !!!");
        assert!(matches.is_empty());
    }

    #[test]
    fn test_from_path() {
        let raw = r#"[{"name": "a", "regex": "x", "weight": 1, "category": "c"}]"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(raw.as_bytes()).unwrap();

        let registry = PatternRegistry::from_path(file.path()).expect("should load from disk");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_builtin_has_severity_amplifiable_medical_patterns() {
        let registry = PatternRegistry::builtin().unwrap();
        let amplifiable = registry
            .patterns()
            .filter(|p| p.has_tag("severity_amplifiable"))
            .count();
        assert!(amplifiable >= 5, "expected several amplifiable patterns");
    }

    #[test]
    fn test_builtin_has_negative_noise_patterns() {
        let registry = PatternRegistry::builtin().unwrap();
        let noise = registry.patterns().filter(|p| p.weight < 0).count();
        assert!(noise >= 5, "expected several noise patterns");
    }
}
