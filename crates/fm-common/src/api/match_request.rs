use serde::Deserialize;

/// `GET /api/match/top-jobs` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopJobsQuery {
    pub candidate_id: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
}

/// `GET /api/match/top-talents` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTalentsQuery {
    pub job_id: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub available_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_camel_case_fields() {
        let query: TopTalentsQuery = serde_json::from_value(json!({
            "jobId": "job-1",
            "limit": 5,
            "availableOnly": true
        }))
        .unwrap();

        assert_eq!(query.job_id, "job-1");
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, None);
        assert!(query.available_only);
    }

    #[test]
    fn candidate_id_is_required() {
        assert!(serde_json::from_value::<TopJobsQuery>(json!({ "limit": 3 })).is_err());
    }
}
