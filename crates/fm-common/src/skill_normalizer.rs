use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::MatchError;

/// Canonical set of skill tokens.
///
/// Backed by an ordered set so iteration order and the JSON form (an ordered
/// array of normalized strings) are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes `raw` and inserts it. Returns false for blank input or a
    /// token that was already present.
    pub fn insert(&mut self, raw: &str) -> bool {
        match normalize_skill(raw) {
            Some(token) => self.0.insert(token),
            None => false,
        }
    }

    /// Token lookup; `token` must already be normalized.
    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SkillSet::new();
        for raw in iter {
            set.insert(raw.as_ref());
        }
        set
    }
}

impl<'a> IntoIterator for &'a SkillSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for SkillSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SkillSetVisitor;

        impl<'de> Visitor<'de> for SkillSetVisitor {
            type Value = SkillSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array of skill strings")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SkillSet, A::Error> {
                let mut set = SkillSet::new();
                while let Some(raw) = seq.next_element::<String>()? {
                    set.insert(&raw);
                }
                Ok(set)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<SkillSet, E> {
                Err(E::invalid_type(de::Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_seq(SkillSetVisitor)
    }
}

/// Normalizes one raw skill: NFKC fold, trim, lowercase, whitespace runs to a
/// single hyphen. Returns `None` when nothing is left.
pub fn normalize_skill(raw: &str) -> Option<String> {
    let folded: String = raw.nfkc().collect();
    let token = folded
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Converts raw skill strings into a deduplicated [`SkillSet`].
pub fn normalize<S: AsRef<str>>(raw_skills: &[S]) -> SkillSet {
    raw_skills.iter().map(AsRef::as_ref).collect()
}

/// Same as [`normalize`] for untyped JSON input; anything other than an
/// array of strings is a validation error.
pub fn normalize_value(value: &Value) -> Result<SkillSet, MatchError> {
    let Value::Array(items) = value else {
        return Err(MatchError::validation(format!(
            "skills must be an array of strings, got {}",
            json_type_name(value)
        )));
    };

    let mut set = SkillSet::new();
    for (idx, item) in items.iter().enumerate() {
        let raw = item.as_str().ok_or_else(|| {
            MatchError::validation(format!(
                "skills[{idx}] must be a string, got {}",
                json_type_name(item)
            ))
        })?;
        set.insert(raw);
    }
    Ok(set)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
