use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::{skill_normalizer::normalize_skill, MatchError, SkillSet};

/// Partial credit given to a required skill covered only by a related skill.
pub const DEFAULT_PARTIAL_WEIGHT: f64 = 0.5;

/// One line of a synonym file.
///
/// ```json
/// [{ "skill": "react", "related": ["next.js", "preact"], "weight": 0.5 }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SynonymEntry {
    pub skill: String,
    pub related: Vec<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Symmetric "related skill" relation with a weight in (0, 1].
///
/// Read-only once built; callers hand it to the ranker explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymTable {
    related: HashMap<String, BTreeMap<String, f64>>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert) with the default weight.
    pub fn with_pair(mut self, a: &str, b: &str) -> Result<Self, MatchError> {
        self.insert(a, b, DEFAULT_PARTIAL_WEIGHT)?;
        Ok(self)
    }

    pub fn insert(&mut self, a: &str, b: &str, weight: f64) -> Result<(), MatchError> {
        let (Some(a), Some(b)) = (normalize_skill(a), normalize_skill(b)) else {
            return Err(MatchError::configuration("synonym pair contains a blank skill"));
        };
        if a == b {
            return Err(MatchError::configuration(format!(
                "synonym pair relates '{a}' to itself"
            )));
        }
        if !weight.is_finite() || weight <= 0.0 || weight > 1.0 {
            return Err(MatchError::configuration(format!(
                "synonym weight for '{a}' ~ '{b}' must be within (0, 1], got {weight}"
            )));
        }

        self.related.entry(a.clone()).or_default().insert(b.clone(), weight);
        self.related.entry(b).or_default().insert(a, weight);
        Ok(())
    }

    pub fn from_entries(entries: Vec<SynonymEntry>) -> Result<Self, MatchError> {
        let mut table = Self::new();
        for entry in entries {
            let weight = entry.weight.unwrap_or(DEFAULT_PARTIAL_WEIGHT);
            for related in &entry.related {
                table.insert(&entry.skill, related, weight)?;
            }
        }
        Ok(table)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, MatchError> {
        let entries: Vec<SynonymEntry> = serde_json::from_str(raw)
            .map_err(|err| MatchError::configuration(format!("invalid synonym table: {err}")))?;
        Self::from_entries(entries)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MatchError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            MatchError::configuration(format!(
                "failed to read synonym table {}: {err}",
                path.display()
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn is_empty(&self) -> bool {
        self.related.is_empty()
    }

    /// Number of distinct skills that have at least one relation.
    pub fn len(&self) -> usize {
        self.related.len()
    }

    /// Weight of the relation between two normalized tokens.
    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        self.related.get(a).and_then(|peers| peers.get(b)).copied()
    }

    /// Best related skill in `candidate` for the normalized `required` token.
    /// Ties on weight resolve to the lexicographically smallest token.
    pub fn best_related<'a>(&'a self, required: &str, candidate: &SkillSet) -> Option<(&'a str, f64)> {
        let peers = self.related.get(required)?;
        let mut best: Option<(&str, f64)> = None;
        for (token, weight) in peers {
            if !candidate.contains(token) {
                continue;
            }
            match best {
                Some((_, best_weight)) if *weight <= best_weight => {}
                _ => best = Some((token.as_str(), *weight)),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill_normalizer::normalize;

    #[test]
    fn relation_is_symmetric_and_normalized() {
        let table = SynonymTable::new().with_pair("React", "Next.js").unwrap();
        assert_eq!(table.weight("react", "next.js"), Some(DEFAULT_PARTIAL_WEIGHT));
        assert_eq!(table.weight("next.js", "react"), Some(DEFAULT_PARTIAL_WEIGHT));
        assert_eq!(table.weight("react", "vue"), None);
    }

    #[test]
    fn rejects_self_relations_and_bad_weights() {
        let mut table = SynonymTable::new();
        assert!(table.insert("rust", "Rust ", 0.5).is_err());
        assert!(table.insert("rust", "go", 0.0).is_err());
        assert!(table.insert("rust", "go", 1.5).is_err());
        assert!(table.insert("rust", "  ", 0.5).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn best_related_prefers_highest_weight() {
        let mut table = SynonymTable::new();
        table.insert("react", "preact", 0.7).unwrap();
        table.insert("react", "next.js", 0.5).unwrap();

        let candidate = normalize(&["next.js", "preact"]);
        assert_eq!(table.best_related("react", &candidate), Some(("preact", 0.7)));

        let candidate = normalize(&["vue"]);
        assert_eq!(table.best_related("react", &candidate), None);
    }

    #[test]
    fn loads_from_json() {
        let table = SynonymTable::from_json_str(
            r#"[{"skill": "react", "related": ["next.js", "preact"]},
                {"skill": "postgres", "related": ["mysql"], "weight": 0.3}]"#,
        )
        .unwrap();

        assert_eq!(table.weight("preact", "react"), Some(0.5));
        assert_eq!(table.weight("mysql", "postgres"), Some(0.3));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = SynonymTable::from_json_str(r#"{"react": "next.js"}"#).unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = SynonymTable::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, MatchError::Configuration(msg) if msg.contains("not/here.json")));
    }
}
