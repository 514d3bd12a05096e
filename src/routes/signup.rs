use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::databases::accounts::{email_in_use, username_in_use};
use crate::routes::signup_error_response;
use crate::services::session::SessionStore;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfoRequest {
    pub first_name: String,
    pub last_name: String,
    pub profile_photo: Option<String>,
}

#[derive(Deserialize)]
pub struct AccountDetailsRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct BirthdayRequest {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

pub async fn start(store: web::Data<SessionStore>) -> impl Responder {
    let session_id = store.create(Utc::now()).await;
    HttpResponse::Ok().json(json!({ "session_id": session_id }))
}

pub async fn basic_info(
    path: web::Path<Uuid>,
    data: web::Json<BasicInfoRequest>,
    store: web::Data<SessionStore>,
) -> impl Responder {
    let session = match store.get(path.into_inner()).await {
        Some(session) => session,
        None => return HttpResponse::NotFound().body("Unknown signup session"),
    };
    let mut session = session.lock().await;

    let req = data.into_inner();
    match session.submit_basic_info(&req.first_name, &req.last_name, req.profile_photo) {
        Ok(()) => HttpResponse::Ok().json(json!({ "message": "Basic info saved" })),
        Err(e) => signup_error_response(e),
    }
}

pub async fn account_details(
    path: web::Path<Uuid>,
    data: web::Json<AccountDetailsRequest>,
    store: web::Data<SessionStore>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    let session = match store.get(path.into_inner()).await {
        Some(session) => session,
        None => return HttpResponse::NotFound().body("Unknown signup session"),
    };
    let mut session = session.lock().await;

    let req = data.into_inner();

    match email_in_use(&db_pool, req.email.trim()).await {
        Ok(true) => {
            return HttpResponse::Conflict().json(json!({
                "field": "email",
                "message": "An account with this email already exists"
            }))
        }
        Err(e) => {
            log::error!("Error checking email availability: {:?}", e);
            return HttpResponse::InternalServerError().body("DB query failed");
        }
        _ => {}
    }

    match username_in_use(&db_pool, req.username.trim()).await {
        Ok(true) => {
            return HttpResponse::Conflict().json(json!({
                "field": "username",
                "message": "This username is taken"
            }))
        }
        Err(e) => {
            log::error!("Error checking username availability: {:?}", e);
            return HttpResponse::InternalServerError().body("DB query failed");
        }
        _ => {}
    }

    match session.submit_account_details(&req.email, &req.username, &req.password) {
        Ok(()) => HttpResponse::Ok().json(json!({ "message": "Account details saved" })),
        Err(e) => signup_error_response(e),
    }
}

pub async fn birthday(
    path: web::Path<Uuid>,
    data: web::Json<BirthdayRequest>,
    store: web::Data<SessionStore>,
) -> impl Responder {
    let session = match store.get(path.into_inner()).await {
        Some(session) => session,
        None => return HttpResponse::NotFound().body("Unknown signup session"),
    };
    let mut session = session.lock().await;

    match session.submit_birthday(data.day, data.month, data.year) {
        Ok(()) => HttpResponse::Ok().json(json!({ "message": "Birthday saved" })),
        Err(e) => signup_error_response(e),
    }
}

/// Leaving the flow throws the session and any pending code away.
pub async fn abandon(path: web::Path<Uuid>, store: web::Data<SessionStore>) -> impl Responder {
    if store.remove(path.into_inner()).await {
        HttpResponse::Ok().json(json!({ "message": "Signup abandoned" }))
    } else {
        HttpResponse::NotFound().body("Unknown signup session")
    }
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.route("/signup/start", web::post().to(start))
        .route("/signup/{id}/basic-info", web::post().to(basic_info))
        .route("/signup/{id}/account-details", web::post().to(account_details))
        .route("/signup/{id}/birthday", web::post().to(birthday))
        .route("/signup/{id}", web::delete().to(abandon));
}
