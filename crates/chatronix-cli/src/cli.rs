use std::path::PathBuf;

use chatronix_core::actions::Permission;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "chatronix")]
#[command(about = "Anonymous chat with offline caching and attachments")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Treat the device as disconnected (serve the cached message list)
    #[arg(long, global = true)]
    pub offline: bool,

    /// Path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for the cache, replica and session files
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pick a name and color, sign in anonymously and open the chat
    Start {
        /// Display name shown next to your messages
        #[arg(long)]
        name: String,
        /// Background color (#3D2C8D, #0C134F, #183D3D or #A21232)
        #[arg(long, value_name = "HEX")]
        color: Option<String>,
        /// Device permissions to grant for attachments
        #[arg(long, value_enum, value_delimiter = ',')]
        grant: Vec<Grant>,
    },
    /// Open the chat with an existing user id
    Chat {
        /// User id issued at sign-in
        #[arg(long)]
        user_id: String,
        /// Display name shown next to your messages
        #[arg(long)]
        name: String,
        /// Background color (#3D2C8D, #0C134F, #183D3D or #A21232)
        #[arg(long, value_name = "HEX")]
        color: Option<String>,
        /// Device permissions to grant for attachments
        #[arg(long, value_enum, value_delimiter = ',')]
        grant: Vec<Grant>,
    },
    /// Print the cached message list
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage backend configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Remote message database URL (e.g. libsql://chat.turso.io)
        #[arg(long, value_name = "URL")]
        message_store_url: Option<String>,
        /// Remote message database auth token
        #[arg(long, value_name = "TOKEN")]
        message_store_token: Option<String>,
        /// Message collection name
        #[arg(long, value_name = "NAME")]
        collection: Option<String>,
        /// URL requested to decide whether the device is online
        #[arg(long, value_name = "URL")]
        connectivity_url: Option<String>,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Grant {
    Location,
    Photos,
    Camera,
}

impl From<Grant> for Permission {
    fn from(value: Grant) -> Self {
        match value {
            Grant::Location => Self::Location,
            Grant::Photos => Self::MediaLibrary,
            Grant::Camera => Self::Camera,
        }
    }
}
