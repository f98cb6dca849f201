/// Credit for two concrete, different locations. Remote work is common, so a
/// mismatch is not a zero.
pub const DEFAULT_CROSS_REGION_CREDIT: f64 = 0.3;

const GLOBAL_TAGS: &[&str] = &["global", "remote"];

#[derive(Debug, Clone, PartialEq)]
pub struct LocationEvaluation {
    pub score: f64, // 0.0〜1.0
    pub details: String,
}

/// Characters stripped from both ends of a location tag. Postgres queries
/// trim the same set (`btrim(.., E' \t\n\f\r')`).
pub const TAG_TRIM_CHARS: &[char] = &[' ', '\t', '\n', '\x0C', '\r'];

pub fn canonical_tag(tag: &str) -> String {
    tag.trim_matches(TAG_TRIM_CHARS).to_lowercase()
}

pub fn is_global_tag(tag: &str) -> bool {
    let tag = canonical_tag(tag);
    GLOBAL_TAGS.contains(&tag.as_str())
}

/// Single entry point for location compatibility; the ranker and the pool
/// pre-filter both go through here.
pub fn evaluate_location(
    candidate_location: &str,
    job_location: &str,
    job_remote: bool,
    cross_region_credit: f64,
) -> LocationEvaluation {
    if job_remote {
        return LocationEvaluation {
            score: 1.0,
            details: "remote job - no location constraint".into(),
        };
    }

    if is_global_tag(candidate_location) || is_global_tag(job_location) {
        return LocationEvaluation {
            score: 1.0,
            details: "global location tag".into(),
        };
    }

    let candidate = canonical_tag(candidate_location);
    let job = canonical_tag(job_location);
    if !candidate.is_empty() && candidate == job {
        return LocationEvaluation {
            score: 1.0,
            details: format!("same location: {job}"),
        };
    }

    LocationEvaluation {
        score: cross_region_credit,
        details: format!(
            "cross-region: candidate={} vs job={}",
            if candidate.is_empty() { "unknown" } else { candidate.as_str() },
            if job.is_empty() { "unknown" } else { job.as_str() },
        ),
    }
}

/// Cheap location index check: does `member_location` pass a filter on
/// `wanted`? Global members always pass.
pub fn location_matches_filter(member_location: &str, member_remote: bool, wanted: &str) -> bool {
    member_remote
        || is_global_tag(member_location)
        || canonical_tag(member_location) == canonical_tag(wanted)
}
