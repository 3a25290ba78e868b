pub mod match_response;
pub mod requests;

pub use match_response::MatchResponse;
pub use requests::{
    ComputeRequest, ListQuery, RescanRequest, RescanResponse, TransitionRequest,
};
