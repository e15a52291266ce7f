use chatronix_core::cache::{load_messages, LibSqlCache};

use crate::commands::AppContext;
use crate::error::CliError;
use crate::render::format_message_line;

pub async fn run_history(context: &AppContext, as_json: bool) -> Result<(), CliError> {
    let config = context.load_config()?;
    let cache = LibSqlCache::open(config.cache_path(&context.data_dir)).await?;
    let messages = load_messages(&cache).await?.unwrap_or_default();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else if messages.is_empty() {
        println!("No cached messages.");
    } else {
        for message in messages.iter().rev() {
            println!("{}", format_message_line(message));
        }
    }

    Ok(())
}
