use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;

use crate::databases::posts::{create_post, list_posts, NewPost};

pub async fn get_posts(db_pool: web::Data<PgPool>) -> impl Responder {
    match list_posts(&db_pool).await {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => {
            log::error!("Error fetching posts: {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn post_post(
    data: web::Json<NewPost>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    let post = data.into_inner();

    if post.description.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "field": "description",
            "message": "Description is required"
        }));
    }
    if post.mood.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "field": "mood",
            "message": "Mood is required"
        }));
    }

    match create_post(&db_pool, &post).await {
        Ok(post_id) => HttpResponse::Ok().json(json!({ "post_id": post_id })),
        Err(e) => {
            log::error!("Error inserting post: {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.route("/posts", web::get().to(get_posts))
        .route("/posts", web::post().to(post_post));
}
