use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::databases::profiles::{get_profile, update_profile};
use crate::services::validation::validate_name;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

pub async fn get_user_profile(
    user_id: web::Path<Uuid>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    match get_profile(&db_pool, user_id.into_inner()).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(profile),
        Ok(None) => HttpResponse::NotFound().body("Profile not found"),
        Err(e) => {
            log::error!("Failed to fetch profile: {:?}", e);
            HttpResponse::InternalServerError().body("Database error")
        }
    }
}

pub async fn put_user_profile(
    user_id: web::Path<Uuid>,
    data: web::Json<UpdateProfileRequest>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    let req = data.into_inner();

    for (field, value) in [("first_name", &req.first_name), ("last_name", &req.last_name)] {
        if let Some(name) = value {
            if let Err(reason) = validate_name(name) {
                return HttpResponse::BadRequest()
                    .json(json!({ "field": field, "message": reason }));
            }
        }
    }

    let updated = update_profile(
        &db_pool,
        user_id.into_inner(),
        req.first_name.as_deref().map(str::trim),
        req.last_name.as_deref().map(str::trim),
        req.bio.as_deref(),
        req.avatar.as_deref(),
    )
    .await;

    match updated {
        Ok(true) => HttpResponse::Ok().json(json!({ "message": "Profile updated" })),
        Ok(false) => HttpResponse::NotFound().body("Profile not found"),
        Err(e) => {
            log::error!("Failed to update profile: {:?}", e);
            HttpResponse::InternalServerError().body("Database error")
        }
    }
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.route("/profile/{user_id}", web::get().to(get_user_profile))
        .route("/profile/{user_id}", web::put().to(put_user_profile));
}
