use actix_web::{web, HttpResponse, Responder};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::databases::accounts::get_login_user;
use crate::services::validation::validate_email_or_username;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

pub async fn login(
    data: web::Json<LoginRequest>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    let LoginRequest { identifier, password } = data.into_inner();

    if let Err(reason) = validate_email_or_username(&identifier) {
        return HttpResponse::BadRequest().json(json!({
            "field": "identifier",
            "message": reason
        }));
    }

    match get_login_user(&db_pool, identifier.trim()).await {
        Ok(Some(user)) => {
            let parsed_hash = match PasswordHash::new(&user.hashed_password) {
                Ok(hash) => hash,
                Err(_) => return HttpResponse::InternalServerError().body("Password hash parsing failed"),
            };

            if Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok() {
                HttpResponse::Ok().json(json!({
                    "message": "Login successful",
                    "user_id": user.id
                }))
            } else {
                HttpResponse::Unauthorized().body("Password does not match")
            }
        }
        Ok(None) => HttpResponse::NotFound().body("No account found for that email or username"),
        Err(e) => {
            log::error!("DB query error during login: {:?}", e);
            HttpResponse::InternalServerError().body("Database error")
        }
    }
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(login));
}
