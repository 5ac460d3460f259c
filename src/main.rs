use actix_web::{
    middleware::{Logger, NormalizePath},
    web, App, HttpServer,
};
use env_logger::Env;

use smartquiz_server::{
    app_state::AppState,
    config::Config,
    errors,
    handlers,
    middleware::{cors, RequestIdMiddleware},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();
    config.validate_for_production();
    errors::hide_internal_details(config.is_production());

    let state = AppState::new(config.clone()).await.map_err(|e| {
        log::error!("Failed to initialise application state: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let host = config.web_server_host.clone();
    let port = config.web_server_port;
    let api_prefix = config.api_prefix.clone();

    log::info!(
        "SmartQuiz API ({}) listening on http://{}:{}{}",
        config.environment.as_str(),
        host,
        port,
        api_prefix
    );
    log::info!("Health check: http://{}:{}{}/health", host, port, api_prefix);

    HttpServer::new(move || {
        let prefix = api_prefix.clone();
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(handlers::json_config(config.max_body_bytes))
            .app_data(handlers::query_config())
            .wrap(NormalizePath::trim())
            .wrap(cors(&config))
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .configure(move |cfg| handlers::configure_routes(cfg, &prefix))
            .default_service(web::route().to(handlers::route_not_found))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
