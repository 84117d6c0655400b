use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod db;
mod error;
mod models;
mod services;

use config::Config;
use constants::API_VERSION;
use db::Database;
use services::identity::AuthServiceVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingorush_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting LingoRush Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);

    // Initialize database
    let db = Database::new(&config).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db.run_migrations().await?;

    let app_state = api::AppState {
        db,
        verifier: Arc::new(AuthServiceVerifier::new(&config)),
        config: config.clone(),
    };

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Games
        .route(
            "/api/games/sentence-scramble",
            get(api::games::sentence_scramble).post(api::games::add_sentence_scramble),
        )
        .route(
            "/api/games/image-match",
            get(api::games::image_match).post(api::games::add_image_match),
        )
        .route(
            "/api/games/fill-in-the-blank",
            get(api::games::fill_in_the_blank),
        )
        .route(
            "/api/games/mixed-rush/random-question",
            get(api::games::mixed_rush_question),
        )
        .route(
            "/api/games/{game_slug}/categories",
            get(api::games::categories_for_game),
        )
        // Duels
        .route("/api/duel/create-duel", post(api::duel::create_duel))
        .route("/api/duel/my-duels", get(api::duel::my_duels))
        .route(
            "/api/duel/duel-questions/{duel_id}",
            get(api::duel::duel_questions),
        )
        .route(
            "/api/duel/submit-duel-result/{duel_id}",
            post(api::duel::submit_duel_result),
        )
        .route(
            "/api/duel/generate-questions",
            post(api::duel::generate_questions),
        )
        // Progress
        .route("/api/progress/submit-score", post(api::progress::submit_score))
        .route(
            "/api/progress/submit-mixed-rush-final",
            post(api::progress::submit_mixed_rush_final),
        )
        // Profile
        .route("/api/profile", get(api::profile::my_profile))
        .route(
            "/api/profile/{username}",
            get(api::profile::profile_by_username),
        )
        // Leaderboard
        .route(
            "/api/leaderboard/total-score",
            get(api::leaderboard::total_score),
        )
        .route("/api/leaderboard/mixed-rush", get(api::leaderboard::mixed_rush))
        // Achievements
        .route("/api/achievements", get(api::achievements::my_achievements))
        // Social
        .route("/api/social/friends", get(api::social::list_friends))
        .route(
            "/api/social/friends/request",
            post(api::social::send_friend_request),
        )
        .route(
            "/api/social/friends/accept",
            post(api::social::accept_friend_request),
        )
        .route(
            "/api/social/friends/reject",
            post(api::social::reject_friend_request),
        )
        .route("/api/social/users/search", get(api::social::search_users))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
