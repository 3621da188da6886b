use axum::{Router, middleware::from_fn_with_state, routing::get};

use session_scheme_axum::{
    CacheStoreConfig, SchemeOptions, SessionScheme, bind_session, require_session,
    try_session,
};

mod handlers;
mod server;

const PORT: u16 = 3001;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    server::init_tracing("demo_session");

    let mut options = SchemeOptions::from_env()?;
    if options.password.is_none() {
        tracing::warn!("SESSION_PASSWORD is not set, using the demo password");
        options.password = Some("testing".to_string());
    }
    // Served over plain HTTP
    options.is_secure.get_or_insert(false);
    options.redirect_to.get_or_insert_with(|| "/login".to_string());

    // Without SESSION_CACHE_DEFAULT_TTL_SECS, records expire with the session TTL
    let store = CacheStoreConfig::from_env()?.build().await?;
    let scheme = SessionScheme::new(options, store)?;

    let app = Router::new()
        .route("/", get(handlers::index))
        .route_layer(from_fn_with_state(scheme.clone(), require_session))
        .merge(
            Router::new()
                .route("/login", get(handlers::login))
                .route_layer(from_fn_with_state(scheme.clone(), try_session)),
        )
        .merge(
            Router::new()
                .route("/logout", get(handlers::logout))
                .route_layer(from_fn_with_state(scheme, bind_session)),
        );

    server::serve_http(PORT, app).await?;
    Ok(())
}
