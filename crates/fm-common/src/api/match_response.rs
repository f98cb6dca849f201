use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::pipeline::{JobRecommendation, Recommendations, TalentRecommendation};
use crate::matching::scoring::{ComponentScores, MatchExplanation};
use crate::{CandidateProfile, JobPosting, SkillSet};

/// Posting as the job cards render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPostDto {
    pub id: String,
    pub job_title: String,
    pub job_location: String,
    pub preferred_payrate: Option<f64>,
    pub company_name: Option<String>,
    pub employer_id: String,
    pub created_at: DateTime<Utc>,
    pub remote: bool,
}

impl From<&JobPosting> for JobPostDto {
    fn from(job: &JobPosting) -> Self {
        Self {
            id: job.id.to_string(),
            job_title: job.title.clone(),
            job_location: job.location.clone(),
            preferred_payrate: job.preferred_rate,
            company_name: job.company_name.clone(),
            employer_id: job.employer_id.clone(),
            created_at: job.posted_at,
            remote: job.remote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentDto {
    pub id: String,
    pub display_name: Option<String>,
    pub skills: SkillSet,
    pub hourly_rate: f64,
    pub location: String,
    pub available: bool,
    pub rating: Option<f64>,
}

impl From<&CandidateProfile> for TalentDto {
    fn from(candidate: &CandidateProfile) -> Self {
        Self {
            id: candidate.id.to_string(),
            display_name: candidate.display_name.clone(),
            skills: candidate.skills.clone(),
            hourly_rate: candidate.hourly_rate,
            location: candidate.location.clone(),
            available: candidate.available,
            rating: candidate.reputation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopJobDto {
    pub match_score: u8,
    pub component_scores: ComponentScores,
    pub explanation: MatchExplanation,
    /// Required skills of the posting, canonical order.
    pub skills: SkillSet,
    pub job_post: JobPostDto,
}

impl From<JobRecommendation> for TopJobDto {
    fn from(item: JobRecommendation) -> Self {
        Self {
            match_score: item.result.match_score,
            component_scores: item.result.component_scores,
            skills: item.job.required_skills.clone(),
            job_post: JobPostDto::from(&item.job),
            explanation: item.result.explanation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTalentDto {
    pub match_score: u8,
    pub component_scores: ComponentScores,
    pub explanation: MatchExplanation,
    pub skills: SkillSet,
    pub talent: TalentDto,
}

impl From<TalentRecommendation> for TopTalentDto {
    fn from(item: TalentRecommendation) -> Self {
        Self {
            match_score: item.result.match_score,
            component_scores: item.result.component_scores,
            skills: item.candidate.skills.clone(),
            talent: TalentDto::from(&item.candidate),
            explanation: item.result.explanation,
        }
    }
}

/// Envelope shared by both ranking endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMatchesResponse<T> {
    pub matches: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub match_run_id: String,
    pub generated_at: DateTime<Utc>,
}

impl<T> TopMatchesResponse<T> {
    pub fn from_recommendations<R>(
        page: Recommendations<R>,
        match_run_id: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self
    where
        T: From<R>,
    {
        Self {
            matches: page.items.into_iter().map(T::from).collect(),
            total: page.total,
            offset: page.offset,
            limit: page.limit,
            match_run_id: match_run_id.into(),
            generated_at,
        }
    }
}
