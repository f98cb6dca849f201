pub mod api;
pub mod db;
pub mod error;
pub mod logging;
pub mod matching;
pub mod repository;
pub mod run_id;
pub mod skill_normalizer;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::MatchError;
pub use skill_normalizer::SkillSet;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(ProfileId);
opaque_id!(JobId);

// Commonly used data models for matching functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    pub id: ProfileId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub skills: SkillSet,
    pub hourly_rate: f64,
    pub location: String,
    #[serde(default = "default_true")]
    pub available: bool,
    /// Average rating on a 0–5 scale; `None` until the first review.
    #[serde(default)]
    pub reputation: Option<f64>,
    /// Profiles are never deleted, only deactivated.
    #[serde(default = "default_true")]
    pub active: bool,
}

impl CandidateProfile {
    pub fn new(
        id: impl Into<ProfileId>,
        skills: SkillSet,
        hourly_rate: f64,
        location: impl Into<String>,
    ) -> Result<Self, MatchError> {
        let profile = Self {
            id: id.into(),
            display_name: None,
            skills,
            hourly_rate,
            location: location.into(),
            available: true,
            reputation: None,
            active: true,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.id.as_str().trim().is_empty() {
            return Err(MatchError::validation("candidate id must not be empty"));
        }
        if !self.hourly_rate.is_finite() || self.hourly_rate <= 0.0 {
            return Err(MatchError::validation(format!(
                "candidate {} hourly rate must be positive, got {}",
                self.id, self.hourly_rate
            )));
        }
        if let Some(reputation) = self.reputation {
            if !(0.0..=5.0).contains(&reputation) {
                return Err(MatchError::validation(format!(
                    "candidate {} reputation must be within 0..=5, got {reputation}",
                    self.id
                )));
            }
        }
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Whether the profile may appear in a ranking at all.
    pub fn is_eligible(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Open,
    Filled,
    Withdrawn,
}

impl JobStatus {
    pub fn is_closed(self) -> bool {
        !matches!(self, JobStatus::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Filled => "filled",
            JobStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Some(JobStatus::Open),
            "filled" => Some(JobStatus::Filled),
            "withdrawn" => Some(JobStatus::Withdrawn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub employer_id: String,
    #[serde(default)]
    pub required_skills: SkillSet,
    #[serde(default)]
    pub preferred_rate: Option<f64>,
    pub location: String,
    #[serde(default)]
    pub remote: bool,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub status: JobStatus,
}

impl JobPosting {
    pub fn new(
        id: impl Into<JobId>,
        title: impl Into<String>,
        employer_id: impl Into<String>,
        required_skills: SkillSet,
        location: impl Into<String>,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company_name: None,
            employer_id: employer_id.into(),
            required_skills,
            preferred_rate: None,
            location: location.into(),
            remote: false,
            posted_at,
            status: JobStatus::Open,
        }
    }

    pub fn with_preferred_rate(mut self, rate: f64) -> Self {
        self.preferred_rate = Some(rate);
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.id.as_str().trim().is_empty() {
            return Err(MatchError::validation("job id must not be empty"));
        }
        if let Some(rate) = self.preferred_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(MatchError::validation(format!(
                    "job {} preferred rate must be positive, got {rate}",
                    self.id
                )));
            }
        }
        Ok(())
    }

    pub fn close(&mut self, status: JobStatus) {
        self.status = status;
    }

    /// Closed postings never take part in a ranking.
    pub fn is_eligible(&self) -> bool {
        !self.status.is_closed()
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_positive_rates() {
        let err = CandidateProfile::new("c1", SkillSet::new(), 0.0, "global").unwrap_err();
        assert!(matches!(err, MatchError::Validation(_)));

        let job = JobPosting::new("j1", "Dev", "e1", SkillSet::new(), "berlin", Utc::now())
            .with_preferred_rate(-5.0);
        assert!(job.validate().is_err());
    }

    #[test]
    fn rejects_reputation_out_of_range() {
        let mut profile = CandidateProfile::new("c1", SkillSet::new(), 40.0, "global").unwrap();
        profile.reputation = Some(5.5);
        assert!(profile.validate().is_err());
        profile.reputation = Some(4.8);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn closed_jobs_and_inactive_profiles_are_ineligible() {
        let mut job = JobPosting::new("j1", "Dev", "e1", SkillSet::new(), "berlin", Utc::now());
        assert!(job.is_eligible());
        job.close(JobStatus::Filled);
        assert!(!job.is_eligible());

        let mut profile = CandidateProfile::new("c1", SkillSet::new(), 40.0, "global").unwrap();
        profile.deactivate();
        assert!(!profile.is_eligible());
    }

    #[test]
    fn deserializes_camel_case_records_with_defaults() {
        let job: JobPosting = serde_json::from_value(json!({
            "id": "job-1",
            "title": "Frontend Engineer",
            "employerId": "emp-9",
            "requiredSkills": ["React", "Type Script"],
            "location": "Lagos",
            "postedAt": "2026-10-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(job.status, JobStatus::Open);
        assert!(!job.remote);
        assert!(job.required_skills.contains("type-script"));

        let profile: CandidateProfile = serde_json::from_value(json!({
            "id": "cand-1",
            "skills": ["react"],
            "hourlyRate": 35.0,
            "location": "global"
        }))
        .unwrap();
        assert!(profile.available && profile.active);
        assert_eq!(profile.reputation, None);
    }

    #[test]
    fn parses_job_status() {
        assert_eq!(JobStatus::parse(" Filled "), Some(JobStatus::Filled));
        assert_eq!(JobStatus::parse("archived"), None);
        assert_eq!(JobStatus::Withdrawn.as_str(), "withdrawn");
    }
}
