use std::process;

use gang_up::api::routes;
use gang_up::config::{Config, LogFormat};
use gang_up::session::{PromptDeck, SessionServer};
use tracing_subscriber::EnvFilter;
use warp::Filter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            process::exit(1);
        }
    };
    init_tracing(config.logging.format);

    let prompts = match config.session.prompts_file.as_deref() {
        Some(path) => match PromptDeck::from_file(path) {
            Ok(deck) => deck,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load prompts");
                process::exit(1);
            }
        },
        None => PromptDeck::default(),
    };
    tracing::info!(prompts = prompts.len(), "Prompt deck loaded");

    let server = SessionServer::new(config.session.clone(), prompts);
    let api = routes::session_routes(server).with(warp::trace::request());
    let address = config.bind_address();
    tracing::info!(host = %config.server.host, port = config.server.port, "Starting Gang Up server");

    match config.server.static_dir.clone() {
        Some(dir) => {
            tracing::info!(static_dir = %dir, "Serving client assets");
            warp::serve(api.or(warp::fs::dir(dir))).run(address).await;
        }
        None => warp::serve(api).run(address).await,
    }
}
