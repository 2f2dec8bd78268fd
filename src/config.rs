//! Backend configuration.

use clap::Parser;

/// Environment variable `subscription_id` falls back to when not given
/// explicitly.
pub const SUBSCRIPTION_ID_ENV: &str = "SUBSCRIPTION_ID";

/// Command-line arguments for the local smoke binary. The real driver loads
/// these options from its own backend-block parsing; this `Args`/`Config`
/// split exists only for the maintenance binary and local testing.
#[derive(Parser, Debug, Clone)]
#[command(name = "tfstate-smoke")]
#[command(about = "Exercises the state backend core against in-memory doubles")]
#[command(version)]
pub struct Args {
    /// Logical scope for the object-store account.
    #[arg(long)]
    pub resource_group_name: String,

    /// Name of the object-store account.
    #[arg(long)]
    pub storage_account_name: String,

    /// Container within the account.
    #[arg(long)]
    pub container_name: String,

    /// Billing/ownership scope. Falls back to `SUBSCRIPTION_ID` if absent.
    #[arg(long)]
    pub subscription_id: Option<String>,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,
}

/// Backend configuration recognized by the core.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub resource_group_name: String,
    pub storage_account_name: String,
    pub container_name: String,
    pub subscription_id: String,
    pub debug: bool,
}

impl TryFrom<Args> for BackendConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, ConfigError> {
        let subscription_id = args
            .subscription_id
            .or_else(|| std::env::var(SUBSCRIPTION_ID_ENV).ok())
            .ok_or(ConfigError::MissingSubscriptionId)?;

        Ok(Self {
            resource_group_name: args.resource_group_name,
            storage_account_name: args.storage_account_name,
            container_name: args.container_name,
            subscription_id,
            debug: args.debug,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("subscription_id is required (pass --subscription-id or set {SUBSCRIPTION_ID_ENV})")]
    MissingSubscriptionId,
}
