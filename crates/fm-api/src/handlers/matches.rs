use std::time::Instant;

use axum::{
    extract::State,
    Json,
};
use chrono::Utc;
use tracing::info;

use fm_common::api::match_request::{TopJobsQuery, TopTalentsQuery};
use fm_common::api::match_response::{TopJobDto, TopMatchesResponse, TopTalentDto};
use fm_common::matching::PoolFilter;
use fm_common::{run_id, JobId, ProfileId};
use fm_metrics::RankingKind;

use super::pagination::validate_pagination;
use super::query::ApiQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

fn required_id<'a>(name: &str, raw: &'a str) -> Result<&'a str, ApiError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ApiError::BadRequest(format!("{name} is required")));
    }
    Ok(id)
}

fn location_filter(raw: Option<String>) -> Option<String> {
    raw.map(|location| location.trim().to_string())
        .filter(|location| !location.is_empty())
}

pub async fn top_jobs(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TopJobsQuery>,
) -> Result<Json<TopMatchesResponse<TopJobDto>>, ApiError> {
    let page = validate_pagination(query.limit, query.offset)?;
    let candidate_id = ProfileId::from(required_id("candidateId", &query.candidate_id)?);
    let filter = PoolFilter {
        location: location_filter(query.location),
        available_only: false,
    };

    let started = Instant::now();
    let now = Utc::now();
    let ranked = state
        .engine
        .top_jobs_for_candidate(&candidate_id, &filter, page, now)
        .await;
    fm_metrics::record_ranking(
        RankingKind::TopJobs,
        ranked.as_ref().ok().map(|page| page.total),
        started.elapsed(),
    );
    let ranked = ranked?;

    let match_run_id = run_id::generate();
    info!(
        %match_run_id,
        %candidate_id,
        subject = %auth.subject,
        returned = ranked.items.len(),
        total = ranked.total,
        "ranked jobs for candidate"
    );

    Ok(Json(TopMatchesResponse::from_recommendations(
        ranked,
        match_run_id,
        now,
    )))
}

pub async fn top_talents(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TopTalentsQuery>,
) -> Result<Json<TopMatchesResponse<TopTalentDto>>, ApiError> {
    let page = validate_pagination(query.limit, query.offset)?;
    let job_id = JobId::from(required_id("jobId", &query.job_id)?);
    let filter = PoolFilter {
        location: location_filter(query.location),
        available_only: query.available_only,
    };

    let started = Instant::now();
    let now = Utc::now();
    let ranked = state
        .engine
        .top_candidates_for_job(&job_id, &filter, page, now)
        .await;
    fm_metrics::record_ranking(
        RankingKind::TopTalents,
        ranked.as_ref().ok().map(|page| page.total),
        started.elapsed(),
    );
    let ranked = ranked?;

    let match_run_id = run_id::generate();
    info!(
        %match_run_id,
        %job_id,
        subject = %auth.subject,
        returned = ranked.items.len(),
        total = ranked.total,
        "ranked talents for job"
    );

    Ok(Json(TopMatchesResponse::from_recommendations(
        ranked,
        match_run_id,
        now,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert!(matches!(required_id("jobId", "   "), Err(ApiError::BadRequest(_))));
        assert_eq!(required_id("jobId", " job-1 ").unwrap(), "job-1");
    }

    #[test]
    fn blank_location_means_no_filter() {
        assert_eq!(location_filter(Some("  ".into())), None);
        assert_eq!(location_filter(Some(" Lagos ".into())), Some("Lagos".into()));
        assert_eq!(location_filter(None), None);
    }
}
