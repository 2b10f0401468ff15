//! Configuration printing

use anyhow::Result;
use sugarbuild_core::domain::config::BuildConfig;

/// Prints the configuration after file loading and overrides
pub fn print_config(config: &BuildConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
