use anyhow::Result;
use cratedump::{
    bot::Dispatcher,
    config::{exe_dir, ConfigLoader},
    logging::init_logger,
    session::{LogOnDetails, SessionBridge, SessionProvider},
    state::PollStore,
};
use dialoguer::{Input, Password};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    init_logger(&exe_dir())?;
    info!("Starting CrateDump v{}", VERSION);

    let config_loader = ConfigLoader::new();
    let mut config = config_loader.load()?;

    if config.account_name.is_none() {
        let name: String = Input::new()
            .with_prompt("Enter the bot's Steam account name")
            .interact_text()?;
        config.account_name = Some(name);
        config_loader.save(&config)?;
    }

    // The password is never saved, ask for it on every start unless provided
    let password = match config.password.clone() {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Enter the bot's Steam password")
            .interact()?,
    };

    let account_name = config.account_name.clone().unwrap_or_default();
    info!("Configuration loaded for account: {}", account_name);
    if config.active_webhook_url().is_some() {
        info!("Webhook notifications enabled");
    }

    let config = Arc::new(config);

    let (session, mut events) = SessionBridge::connect(
        &config.session_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .await?;

    let poll_store = PollStore::new(config_loader.resolve(&config.poll_data_path));
    if let Some(cursor) = poll_store.load().await {
        info!("Restoring offer poll state from {}", poll_store.path().display());
        if let Err(e) = session.import_poll_cursor(&cursor).await {
            warn!("Failed to restore poll state, offers will be re-polled: {}", e);
        }
    }

    let details = LogOnDetails {
        account_name,
        password,
        domain: config.domain.clone(),
        poll_interval: Duration::from_secs(config.poll_interval_secs),
        cancel_after: Duration::from_secs(config.cancel_after_secs),
    };
    if let Err(e) = session.log_on(&details).await {
        error!("Failed to log on: {}", e);
        std::process::exit(1);
    }

    let mut dispatcher = Dispatcher::new(session, config, poll_store)?;

    if let Err(e) = dispatcher.run(&mut events).await {
        error!("Shutting down: {}", e);
        std::process::exit(1);
    }

    info!("Session closed, exiting");
    Ok(())
}
