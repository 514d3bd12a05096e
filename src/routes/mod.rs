use actix_web::HttpResponse;
use serde_json::json;

use crate::services::otp::OtpError;
use crate::services::session::SignupError;

pub mod login;
pub mod posts;
pub mod signup;
pub mod user;
pub mod verify;

/// Every signup failure comes back as a user-facing message on the
/// same step; nothing here is allowed to take the flow down.
pub fn signup_error_response(err: SignupError) -> HttpResponse {
    match err {
        SignupError::ValidationFailed { field, reason } => {
            HttpResponse::BadRequest().json(json!({ "field": field, "message": reason }))
        }
        SignupError::StepOutOfOrder => {
            HttpResponse::Conflict().json(json!({ "message": err.to_string() }))
        }
        SignupError::AlreadyFinalized => {
            HttpResponse::Conflict().json(json!({ "message": err.to_string() }))
        }
        SignupError::Otp(OtpError::EmailInvalid) => {
            HttpResponse::BadRequest().json(json!({ "field": "email", "message": err.to_string() }))
        }
        SignupError::Otp(otp_err) => {
            HttpResponse::BadRequest().json(json!({ "message": otp_err.to_string() }))
        }
    }
}
