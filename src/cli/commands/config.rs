//! Config command implementations.

use crate::cli::{ConfigCommands, Credentials};
use crate::config::config_path;
use crate::error::{Error, Result};

/// Execute config commands.
pub fn execute(command: &ConfigCommands, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show { credentials } => show(credentials, json),
        ConfigCommands::Path => path(json),
    }
}

fn show(credentials: &Credentials, json: bool) -> Result<()> {
    let config = credentials.load()?.redacted();

    if json {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}

fn path(json: bool) -> Result<()> {
    let path = config_path()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    if json {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{output}");
    } else {
        println!("{}", path.display());
    }
    Ok(())
}
