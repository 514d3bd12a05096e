use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

mod databases;
mod routes;
mod services;

use services::session::SessionStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let pool = match databases::setup_backend().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("❌ Backend setup failed: {:?}", e);
            std::process::exit(1);
        }
    };

    let db_pool = web::Data::new(pool);
    let sessions = web::Data::new(SessionStore::new());

    println!("✅ Vibes backend listening on 127.0.0.1:8080");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(db_pool.clone())
            .app_data(sessions.clone())
            .configure(routes::signup::init)
            .configure(routes::verify::init)
            .configure(routes::login::init)
            .configure(routes::user::init)
            .configure(routes::posts::init)
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
