use chatronix_core::config::BackendConfig;
use chatronix_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::commands::AppContext;
use crate::error::CliError;

const REDACTED: &str = "[REDACTED]";

pub fn run_config(context: &AppContext, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            message_store_url,
            message_store_token,
            collection,
            connectivity_url,
        } => {
            let existing = BackendConfig::load_from_path(&context.config_path)?;
            let config = merge_config(
                existing,
                ConfigOverrides {
                    supabase_url,
                    supabase_anon_key,
                    message_store_url,
                    message_store_token,
                    collection,
                    connectivity_url,
                },
            );
            config.validate()?;
            config.save(&context.config_path)?;
            println!("Saved config to {}", context.config_path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = context.load_config()?;
            println!("# {}", context.config_path.display());
            println!("{}", serde_json::to_string_pretty(&redact(config))?);
            Ok(())
        }
    }
}

pub struct ConfigOverrides {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub message_store_url: Option<String>,
    pub message_store_token: Option<String>,
    pub collection: Option<String>,
    pub connectivity_url: Option<String>,
}

/// Explicit flags replace stored values; omitted flags keep them.
pub fn merge_config(existing: BackendConfig, overrides: ConfigOverrides) -> BackendConfig {
    BackendConfig {
        supabase_url: normalize_text_option(overrides.supabase_url).or(existing.supabase_url),
        supabase_anon_key: normalize_text_option(overrides.supabase_anon_key)
            .or(existing.supabase_anon_key),
        message_store_url: normalize_text_option(overrides.message_store_url)
            .or(existing.message_store_url),
        message_store_token: normalize_text_option(overrides.message_store_token)
            .or(existing.message_store_token),
        collection: normalize_text_option(overrides.collection).or(existing.collection),
        connectivity_url: normalize_text_option(overrides.connectivity_url)
            .or(existing.connectivity_url),
        ..existing
    }
}

fn redact(mut config: BackendConfig) -> BackendConfig {
    if config.message_store_token.is_some() {
        config.message_store_token = Some(REDACTED.to_string());
    }
    config
}
