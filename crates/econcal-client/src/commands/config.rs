//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the effective configuration to stdout, secrets masked.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    print!("{}", render(config, path)?);
    Ok(())
}

fn render(config: &ClientConfig, path: &Path) -> ClientResult<String> {
    let toml_str = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    Ok(format!("# config.toml ({})\n{}\n", path.display(), toml_str))
}

/// Validate the configuration, resolving every secret reference.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.check().map_err(ClientError::Config)?;

    super::build_source(config)?;
    println!("Source `{}` is configured.", config.source.kind);

    super::build_store(config)?;
    println!("Discord token resolved.");

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path in effect.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_header_names_the_loaded_file() {
        let mut config = ClientConfig::default();
        config.discord.token = Some("literal".to_string());

        let out = render(&config, Path::new("/etc/econcal/custom.toml")).unwrap();
        let header = out.lines().next().unwrap();
        assert_eq!(header, "# config.toml (/etc/econcal/custom.toml)");
        assert!(!out.contains("literal"));
    }
}
