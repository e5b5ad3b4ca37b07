use capture_backend::channels::{CaptureDispatcher, CaptureService, ChatGateway, TelegramGateway};
use capture_backend::config::{self, Config};
use dotenv::dotenv;
use std::sync::Arc;
use teloxide::Bot;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config::initialize_dirs(&config.notes) {
        log::error!("Failed to prepare notes directory {:?}: {}", config.notes.notes_dir, e);
        std::process::exit(1);
    }

    log::info!(
        "Collision policy: {}, image fetch timeout: {}s",
        config.notes.collision_policy.as_str(),
        config.notes.fetch_timeout.as_secs()
    );

    let service = Arc::new(CaptureService::new(&config.notes));
    let gateway: Arc<dyn ChatGateway> =
        Arc::new(TelegramGateway::start(Bot::new(config.bot_token.clone())));
    let dispatcher = CaptureDispatcher::new(service, gateway);

    log::info!("Capture bot started");
    dispatcher.run().await;
    log::info!("Capture bot stopped");
}
