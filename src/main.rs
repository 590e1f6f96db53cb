use axum::{
    extract::FromRef,
    routing::{get, post, put},
    Router,
};
use dotenv::dotenv;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

mod auth;
mod chat;
mod comments;
mod config;
mod error;
mod friends;
mod posts;
mod profiles;
mod response;

use config::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    settings: Settings,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> PgPool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("database connected");

    let app_state = AppState {
        pool,
        settings: settings.clone(),
    };

    let auth_router = Router::new()
        .route("/sign-in", post(auth::handler::login))
        .route("/sign-up", post(auth::handler::signup))
        .route("/me", get(auth::handler::get_me));

    let profile_router = Router::new()
        .route("/me", put(profiles::handler::update_my_profile))
        .route("/:username", get(profiles::handler::get_profile));

    let post_router = Router::new()
        .route("/", post(posts::handler::create_post))
        .route("/:id/like", post(posts::handler::toggle_like))
        .route(
            "/:id/comments",
            get(comments::handler::get_post_comments).post(comments::handler::add_comment),
        );

    let friend_router = Router::new()
        .route("/", get(friends::handler::get_friends))
        .route(
            "/requests",
            get(friends::handler::get_pending_requests)
                .post(friends::handler::send_friend_request),
        )
        .route(
            "/requests/:id",
            post(friends::handler::respond_friend_request),
        );

    let chat_router = Router::new()
        .route("/", get(chat::handler::get_conversations))
        .route(
            "/:username",
            get(chat::handler::open_thread).post(chat::handler::send_message),
        );

    let app = Router::new()
        .route("/api/feed", get(posts::handler::get_feed))
        .nest("/api/auth", auth_router)
        .nest("/api/profiles", profile_router)
        .nest("/api/posts", post_router)
        .nest("/api/friends", friend_router)
        .nest("/api/chat", chat_router)
        .with_state(app_state);

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
