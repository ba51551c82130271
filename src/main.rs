use clap::Parser;
use tracing_subscriber::EnvFilter;

use agora::commands;
use agora::config::{Cli, Config};
use agora::db;
use agora::navigation::Route;
use agora::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    tracing::debug!("API base URL: {}", config.api.base_url);

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    let state = AppState::build(config, pool)?;
    let phase = state.sessions().init().await;
    tracing::debug!("Session phase: {:?}", phase);

    match commands::run(&state, cli.command).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            if e.is_unauthorized() && state.router.current() == Route::Login {
                eprintln!("Run `agora login --email <email> --password <password>` to sign in.");
            }
            std::process::exit(1);
        }
    }
}
