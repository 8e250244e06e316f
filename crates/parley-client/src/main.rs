use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use parley_types::Config;

mod app;

use app::{App, parse_command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "parley=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let poll_interval = config.poll_interval;

    let app = Arc::new(Mutex::new(App::new(config)?));
    app.lock().await.restore_session();

    // Poller: balance and message refresh on a fixed cadence. `try_lock`
    // is the overlap guard: a tick that finds a command or a previous
    // cycle still holding the state skips instead of stacking.
    let poller_app = app.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match poller_app.try_lock() {
                Ok(mut app) => app.poll().await,
                Err(_) => debug!("cycle in flight, skipping poll tick"),
            }
        }
    });

    println!("parley: type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = parse_command(&line);
        if !app.lock().await.handle(command).await {
            break;
        }
    }

    Ok(())
}
