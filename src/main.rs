mod account;
mod api;
mod auth;
mod config;
mod error;

use clap::Parser;
use std::sync::Arc;
use tracing::info;

use account::{store, Account, AccountStore};
use api::{ApiServer, ApiState};
use auth::{password, TokenService};
use config::{Cli, Command, Config};
use error::BankError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "corebank=info,info".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.options)?;
    let store = store::bootstrap(&config.storage).await?;

    match cli.command {
        Some(Command::Seed) => seed_accounts(store.as_ref()).await?,
        Some(Command::Serve) | None => {
            let tokens = Arc::new(TokenService::new(config.token_secret.into_bytes()));
            let state = ApiState::new(store, tokens);
            ApiServer::new(state, config.listen).serve().await?;
        }
    }

    Ok(())
}

/// One demo account for local testing. Password is fixed ("1233") so the
/// login flow can be exercised by hand.
async fn seed_accounts(store: &dyn AccountStore) -> Result<(), BankError> {
    let password_hash = password::hash_password("1233")
        .map_err(|_| BankError::StoreFailure("password hashing failed".into()))?;

    let account = store
        .create(Account::new(
            "Henry".to_string(),
            "Cavil".to_string(),
            password_hash,
            1_000,
        ))
        .await?;

    info!(
        id = account.id,
        account_number = account.account_number,
        "seeded demo account"
    );
    Ok(())
}
