use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    location::{evaluate_location, DEFAULT_CROSS_REGION_CREDIT},
    skills::match_skills,
    synonyms::SynonymTable,
    weights::{Weights, DEFAULT_WEIGHTS},
};
use crate::{CandidateProfile, JobId, JobPosting, MatchError, ProfileId};

pub const DEFAULT_RECENCY_HORIZON_DAYS: i64 = 90;
const MAX_RECENCY_HORIZON_DAYS: f64 = 36_500.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RankerConfig {
    pub weights: Weights,
    /// Age at which the recency component reaches 0.0.
    pub recency_horizon: Duration,
    pub cross_region_credit: f64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            recency_horizon: Duration::days(DEFAULT_RECENCY_HORIZON_DAYS),
            cross_region_credit: DEFAULT_CROSS_REGION_CREDIT,
        }
    }
}

impl RankerConfig {
    /// Defaults overridden by `FM_WEIGHT_*`, `FM_RECENCY_HORIZON_DAYS` and
    /// `FM_CROSS_REGION_CREDIT`. Unparsable values are configuration errors.
    pub fn from_env() -> Result<Self, MatchError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MatchError> {
        let defaults = Self::default();
        let read = |name: &str, default: f64| -> Result<f64, MatchError> {
            match lookup(name) {
                None => Ok(default),
                Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                    MatchError::configuration(format!("{name} must be a number, got '{raw}'"))
                }),
            }
        };

        let weights = Weights {
            skill: read("FM_WEIGHT_SKILL", defaults.weights.skill)?,
            rate: read("FM_WEIGHT_RATE", defaults.weights.rate)?,
            location: read("FM_WEIGHT_LOCATION", defaults.weights.location)?,
            recency: read("FM_WEIGHT_RECENCY", defaults.weights.recency)?,
        };
        let horizon_days = read(
            "FM_RECENCY_HORIZON_DAYS",
            defaults.recency_horizon.num_days() as f64,
        )?;
        let cross_region_credit = read("FM_CROSS_REGION_CREDIT", defaults.cross_region_credit)?;

        if !horizon_days.is_finite() || horizon_days <= 0.0 || horizon_days > MAX_RECENCY_HORIZON_DAYS {
            return Err(MatchError::configuration(format!(
                "FM_RECENCY_HORIZON_DAYS must be within (0, {MAX_RECENCY_HORIZON_DAYS}], got {horizon_days}"
            )));
        }

        let config = Self {
            weights,
            recency_horizon: Duration::seconds((horizon_days * 86_400.0).round() as i64),
            cross_region_credit,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        self.weights.validate()?;
        if self.recency_horizon <= Duration::zero() {
            return Err(MatchError::configuration("recency horizon must be positive"));
        }
        if !(0.0..=1.0).contains(&self.cross_region_credit) {
            return Err(MatchError::configuration(format!(
                "cross-region credit must be within 0..=1, got {}",
                self.cross_region_credit
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub skill: f64,
    pub rate: f64,
    pub location: f64,
    pub recency: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchExplanation {
    /// One-line summary of the skill comparison.
    pub skills: String,
    pub matched_skills: Vec<String>,
    pub related_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub location: String,
}

/// Score of one (candidate, job) pair at one instant. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub candidate_id: ProfileId,
    pub job_id: JobId,
    /// 0〜100
    pub match_score: u8,
    pub component_scores: ComponentScores,
    pub explanation: MatchExplanation,
}

/// Composite ranker. Immutable once built, so one instance can serve every
/// request and every shard.
#[derive(Debug, Clone)]
pub struct Ranker {
    config: RankerConfig,
    synonyms: Arc<SynonymTable>,
}

impl Ranker {
    /// Fails fast with a configuration error when the weights do not sum to
    /// 1.0 or a tuning value is out of range.
    pub fn new(config: RankerConfig, synonyms: Arc<SynonymTable>) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self { config, synonyms })
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn rank(&self, candidate: &CandidateProfile, job: &JobPosting, now: DateTime<Utc>) -> MatchResult {
        let skills = match_skills(&candidate.skills, &job.required_skills, &self.synonyms);
        let location = evaluate_location(
            &candidate.location,
            &job.location,
            job.remote,
            self.config.cross_region_credit,
        );

        let components = ComponentScores {
            skill: unit(skills.score),
            rate: rate_compatibility(candidate.hourly_rate, job.preferred_rate),
            location: unit(location.score),
            recency: self.recency(job.posted_at, now),
        };

        let weights = self.config.weights;
        let weighted = components.skill * weights.skill
            + components.rate * weights.rate
            + components.location * weights.location
            + components.recency * weights.recency;

        MatchResult {
            candidate_id: candidate.id.clone(),
            job_id: job.id.clone(),
            match_score: to_match_score(weighted),
            component_scores: components,
            explanation: MatchExplanation {
                skills: skills.reason(),
                matched_skills: skills.matched_skills,
                related_skills: skills.related_skills,
                missing_skills: skills.missing_skills,
                location: location.details,
            },
        }
    }

    /// Linear decay from 1.0 at `now` to 0.0 at the horizon. Future-dated
    /// postings count as fresh.
    pub fn recency(&self, posted_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age = now - posted_at;
        if age <= Duration::zero() {
            return 1.0;
        }
        let horizon_ms = self.config.recency_horizon.num_milliseconds() as f64;
        unit(1.0 - age.num_milliseconds() as f64 / horizon_ms)
    }
}

/// `1 - min(1, |candidate - job| / job)`; 1.0 when the job states no rate.
pub fn rate_compatibility(candidate_rate: f64, job_rate: Option<f64>) -> f64 {
    let Some(job_rate) = job_rate.filter(|rate| rate.is_finite() && *rate > 0.0) else {
        return 1.0;
    };
    if !candidate_rate.is_finite() {
        return 0.0;
    }
    unit(1.0 - ((candidate_rate - job_rate).abs() / job_rate).min(1.0))
}

fn to_match_score(weighted: f64) -> u8 {
    (unit(weighted) * 100.0).round() as u8
}

/// Clamp to [0, 1], mapping NaN to 0.
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
