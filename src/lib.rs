pub mod api;
pub mod cli;
pub mod conversation;
pub mod history;
pub mod models;
pub mod repl;

use api::{ ChatBackend, HttpChatApi };
use cli::Args;
use conversation::{ ConversationManager, ManagerOptions };
use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Backend URL: {}", args.api_url);
    info!("Request Timeout: {:?}", args.request_timeout());
    info!("Persist History: {}", !args.no_persist);
    info!("Skip Health Check: {}", args.skip_health_check);
    info!("-------------------------");

    let backend = Arc::new(HttpChatApi::new(&args.api_url, args.request_timeout())?);

    let health = backend.check_health().await;
    if health.online {
        info!("Backend at {} is online", backend.base_url());
    } else if args.skip_health_check {
        warn!("{}, continuing anyway", repl::format_health(&health));
    } else {
        return Err(format!("{}; start the backend or pass --skip-health-check", repl::format_health(&health)).into());
    }

    let slot = history::create_slot(&args);
    let options = ManagerOptions {
        persist: !args.no_persist,
        ..Default::default()
    };
    let manager = ConversationManager::new(backend, slot, options).await;

    repl::run_repl(manager).await
}
