use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use log::error;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::databases::{accounts, profiles};
use crate::databases::accounts::CreateAccountError;
use crate::routes::signup_error_response;
use crate::services::email::{send_code_email, EmailError};
use crate::services::session::SessionStore;

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

/// Issues a fresh code and emails it. A resend goes through the same
/// path and supersedes the previous code. The session lock is held
/// across the send, so a concurrent verify for the same session waits
/// and can never race a resend.
pub async fn send_code(path: web::Path<Uuid>, store: web::Data<SessionStore>) -> impl Responder {
    let session = match store.get(path.into_inner()).await {
        Some(session) => session,
        None => return HttpResponse::NotFound().body("Unknown signup session"),
    };
    let mut session = session.lock().await;

    let challenge = match session.begin_verification(Utc::now()) {
        Ok(challenge) => challenge,
        Err(e) => return signup_error_response(e),
    };

    match send_code_email(&challenge.destination, &challenge.code).await {
        Ok(()) => {
            let expires_at = challenge.expires_at;
            session.store_challenge(challenge);
            HttpResponse::Ok().json(json!({
                "message": "Verification code sent",
                "expires_at": expires_at
            }))
        }
        // nothing stored on failure; the old code (if any) stays valid
        Err(e @ EmailError::Config(_)) => {
            error!("Email configuration error: {}", e);
            HttpResponse::InternalServerError().body("Email service is misconfigured")
        }
        Err(e) => {
            error!("Failed to send verification email: {}", e);
            HttpResponse::BadGateway()
                .json(json!({ "message": "Could not send the verification email. Please try again." }))
        }
    }
}

/// Checks the entered code and, on success, commits the accumulated
/// signup exactly once: credential row first, then the profile
/// document. If the profile write fails the credential is deleted
/// again and the session stays alive for a retry.
pub async fn verify(
    path: web::Path<Uuid>,
    data: web::Json<VerifyRequest>,
    store: web::Data<SessionStore>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    let session_id = path.into_inner();
    let session = match store.get(session_id).await {
        Some(session) => session,
        None => return HttpResponse::NotFound().body("Unknown signup session"),
    };
    let mut session = session.lock().await;

    let token = match session.verify_otp(&data.code, Utc::now()) {
        Ok(token) => token,
        Err(e) => return signup_error_response(e),
    };

    let snapshot = match session.take_snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => return signup_error_response(e),
    };

    let account_id = match accounts::create_account(&db_pool, &snapshot).await {
        Ok(id) => id,
        Err(e @ CreateAccountError::EmailInUse) => {
            session.reopen();
            return HttpResponse::Conflict()
                .json(json!({ "field": "email", "message": e.to_string() }));
        }
        Err(e @ CreateAccountError::UsernameInUse) => {
            session.reopen();
            return HttpResponse::Conflict()
                .json(json!({ "field": "username", "message": e.to_string() }));
        }
        Err(e) => {
            error!("Error creating account: {:?}", e);
            session.reopen();
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Account creation failed. Please try again." }));
        }
    };

    if let Err(e) = profiles::create_profile(&db_pool, account_id, &snapshot).await {
        error!("Error creating profile document: {:?}", e);
        // compensating delete so no half-created account is left behind
        if let Err(del_err) = accounts::delete_account(&db_pool, account_id).await {
            error!("Rollback of account {} failed: {:?}", account_id, del_err);
        }
        session.reopen();
        return HttpResponse::InternalServerError()
            .json(json!({ "message": "Account creation failed. Please try again." }));
    }

    drop(session);

    // The abandon handler only takes the store lock, so the session may
    // have been removed while the writes above were in flight. A false
    // here means the flow was abandoned: undo the commit instead of
    // handing an account to a user who already left.
    if !store.remove(session_id).await {
        error!(
            "Signup session {} was abandoned during finalization, rolling back account {}",
            session_id, account_id
        );
        if let Err(del_err) = accounts::delete_account(&db_pool, account_id).await {
            error!("Rollback of account {} failed: {:?}", account_id, del_err);
        }
        return HttpResponse::NotFound().body("Unknown signup session");
    }

    HttpResponse::Ok().json(json!({
        "message": "Account created successfully",
        "token": token,
        "user_id": account_id
    }))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.route("/signup/{id}/send-code", web::post().to(send_code))
        .route("/signup/{id}/verify", web::post().to(verify));
}
