// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{User, UserId, PublicUser, NewUser, ProfileUpdate, Rating, RatingOutcome, LiveUpdate};
pub use requests::{RegisterRequest, LoginRequest, ProfileEditRequest};
pub use responses::{NextCandidateResponse, RateResponse, MatchesResponse, HealthResponse, ErrorResponse};
