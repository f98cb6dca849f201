pub mod match_request;
pub mod match_response;
