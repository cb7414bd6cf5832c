use serde::{Deserialize, Serialize};
use crate::models::domain::{PublicUser, RatingOutcome};

/// Response for the next-candidate endpoint
#[derive(Debug, Clone, Serialize)]
pub struct NextCandidateResponse {
    pub candidate: Option<PublicUser>,
}

/// Response for like/dislike endpoints
#[derive(Debug, Clone, Serialize)]
pub struct RateResponse {
    pub outcome: RatingOutcome,
    pub recorded: bool,
}

impl From<RatingOutcome> for RateResponse {
    fn from(outcome: RatingOutcome) -> Self {
        Self {
            outcome,
            recorded: outcome.is_recorded(),
        }
    }
}

/// Response for the matches endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MatchesResponse {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub matches: Vec<PublicUser>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub connections: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
