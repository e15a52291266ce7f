use std::env;
use std::path::PathBuf;

use crate::error::CliError;

const APP_DIR: &str = "chatronix";
const CONFIG_FILE_NAME: &str = "config.json";

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_path.or_else(|| env::var_os("CHATRONIX_CONFIG").map(PathBuf::from)) {
        return Ok(path);
    }
    default_config_path()
}

pub fn resolve_data_dir(cli_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_path.or_else(|| env::var_os("CHATRONIX_DATA_DIR").map(PathBuf::from)) {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(CliError::MissingDirectory("data"))
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
        .ok_or(CliError::MissingDirectory("config"))
}
