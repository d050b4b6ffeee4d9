use genai_gateway::{logger, GatewayConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env before anything reads the environment.
    let dotenv_loaded = dotenv::dotenv().is_ok();

    if let Err(e) = logger::init() {
        eprintln!("{}", e);
    }
    if dotenv_loaded {
        log::info!(".env file loaded");
    } else {
        log::warn!("No .env file found, using process environment");
    }

    let config = GatewayConfig::from_env();
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), &config);

    genai_gateway::server::run(config).await
}
