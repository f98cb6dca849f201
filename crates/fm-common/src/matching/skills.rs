use std::cmp::Ordering;

use super::synonyms::SynonymTable;
use crate::{CandidateProfile, SkillSet};

#[derive(Debug, Clone, PartialEq)]
pub struct SkillMatchResult {
    pub exact_matches: usize,
    pub partial_matches: usize,
    pub required_count: usize,
    /// 0.0〜1.0
    pub score: f64,
    pub matched_skills: Vec<String>,
    /// Required skills covered by a related skill, as `required~candidate`.
    pub related_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

impl SkillMatchResult {
    /// Skill-only ranking order: more exact matches first, then more partial
    /// matches. Callers break the remaining ties on identity.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .exact_matches
            .cmp(&self.exact_matches)
            .then_with(|| other.partial_matches.cmp(&self.partial_matches))
    }

    pub fn reason(&self) -> String {
        if self.required_count == 0 {
            return "no required skills".into();
        }

        let or_none = |skills: &[String]| {
            if skills.is_empty() {
                "none".to_string()
            } else {
                skills.join(", ")
            }
        };

        format!(
            "{} of {} required skills matched ({:.0}%) (matched: {} / related: {} / missing: {})",
            self.exact_matches,
            self.required_count,
            self.score * 100.0,
            or_none(&self.matched_skills),
            or_none(&self.related_skills),
            or_none(&self.missing_skills)
        )
    }
}

/// Weighted overlap of `candidate` against `required`.
///
/// `score = (exact + Σ related weight) / |required|`, clamped to [0, 1].
/// An empty requirement always scores 1.0.
pub fn match_skills(
    candidate: &SkillSet,
    required: &SkillSet,
    synonyms: &SynonymTable,
) -> SkillMatchResult {
    if required.is_empty() {
        return SkillMatchResult {
            exact_matches: 0,
            partial_matches: 0,
            required_count: 0,
            score: 1.0,
            matched_skills: vec![],
            related_skills: vec![],
            missing_skills: vec![],
        };
    }

    let mut matched_skills = Vec::new();
    let mut related_skills = Vec::new();
    let mut missing_skills = Vec::new();
    let mut partial_credit = 0.0;

    for skill in required.iter() {
        if candidate.contains(skill) {
            matched_skills.push(skill.to_string());
        } else if let Some((via, weight)) = synonyms.best_related(skill, candidate) {
            partial_credit += weight;
            related_skills.push(format!("{skill}~{via}"));
        } else {
            missing_skills.push(skill.to_string());
        }
    }

    let required_count = required.len();
    let score = ((matched_skills.len() as f64 + partial_credit) / required_count as f64).clamp(0.0, 1.0);

    SkillMatchResult {
        exact_matches: matched_skills.len(),
        partial_matches: related_skills.len(),
        required_count,
        score,
        matched_skills,
        related_skills,
        missing_skills,
    }
}

pub fn skill_score(candidate: &SkillSet, required: &SkillSet, synonyms: &SynonymTable) -> f64 {
    match_skills(candidate, required, synonyms).score
}

/// Orders candidates by skill fit alone, ties broken by candidate id.
pub fn rank_by_skills<'a>(
    required: &SkillSet,
    candidates: &'a [CandidateProfile],
    synonyms: &SynonymTable,
) -> Vec<(&'a CandidateProfile, SkillMatchResult)> {
    let mut ranked: Vec<_> = candidates
        .iter()
        .map(|candidate| (candidate, match_skills(&candidate.skills, required, synonyms)))
        .collect();

    ranked.sort_by(|(a, a_match), (b, b_match)| {
        a_match.rank_cmp(b_match).then_with(|| a.id.cmp(&b.id))
    });
    ranked
}
