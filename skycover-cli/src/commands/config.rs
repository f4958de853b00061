//! Configuration CLI commands.
//!
//! `config get`, `config set`, `config reset`, `config list`, and
//! `config path` read and edit `config.ini` through [`ConfigKey`], so every
//! value is parsed and range-checked the same way the file loader does.

use clap::Subcommand;
use skycover::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one setting
    Get {
        /// Setting in section.key form (e.g. coverage.region_id)
        key: String,
    },

    /// Change one setting and save the file
    Set {
        /// Setting in section.key form (e.g. horizon.steps)
        key: String,

        /// New value
        value: String,
    },

    /// Restore one setting to its default and save the file
    Reset {
        /// Setting in section.key form
        key: String,
    },

    /// Print every setting grouped by section
    List,

    /// Print the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            println!("{}", display_value(&key.get(&ConfigFile::load()?)));
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load()?;
            let previous = key.get(&config);
            key.set(&mut config, &value)?;
            config.save()?;
            println!(
                "{}: {} -> {}",
                key.name(),
                display_value(&previous),
                display_value(&key.get(&config))
            );
            Ok(())
        }
        ConfigCommands::Reset { key } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load()?;
            let default = key.get(&ConfigFile::default());
            key.set(&mut config, &default)?;
            config.save()?;
            println!("{} reset to {}", key.name(), display_value(&default));
            Ok(())
        }
        ConfigCommands::List => {
            let config = ConfigFile::load()?;
            println!("Configuration ({})", config_file_path().display());
            for line in listing(&config) {
                println!("{}", line);
            }
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'skycover config list' to see available keys.",
            key
        ))
    })
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// `[section]` headers followed by `  key = value` lines.
fn listing(config: &ConfigFile) -> Vec<String> {
    let mut lines = Vec::new();
    let mut section = "";
    for key in ConfigKey::all() {
        if key.section() != section {
            section = key.section();
            lines.push(String::new());
            lines.push(format!("[{}]", section));
        }
        lines.push(format!(
            "  {} = {}",
            key.key_name(),
            display_value(&key.get(config))
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_message() {
        let err = parse_key("coverage.nope").unwrap_err();
        assert!(err.to_string().contains("skycover config list"));
    }

    #[test]
    fn test_listing_groups_by_section() {
        let lines = listing(&ConfigFile::default());
        let headers: Vec<&String> = lines.iter().filter(|l| l.starts_with('[')).collect();
        assert_eq!(headers, ["[coverage]", "[horizon]", "[cache]", "[source]"]);
        assert!(lines.contains(&"  region_id = default".to_string()));
        assert!(lines.contains(&"  elements_file = (not set)".to_string()));
    }
}
