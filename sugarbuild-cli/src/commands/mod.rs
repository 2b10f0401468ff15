//! Commands module
//!
//! Defines the operating modes and their handlers.

mod build;
mod schedule;
mod serve;
mod show;
mod watch;

use anyhow::Result;
use clap::Subcommand;
use sugarbuild_core::domain::config::BuildConfig;

/// Top-level CLI commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run a single build of the configured flavor
    Build,
    /// Build every configured branch on the schedule interval
    Schedule,
    /// Mirror source changes into the output tree without building
    Watch,
    /// Only serve the dump dashboard
    Serve,
    /// Print the resolved configuration as JSON
    Config,
}

/// What the process does after loading its configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Build,
    Schedule,
    Watch,
    Serve,
    ShowConfig,
}

impl Mode {
    /// An explicit subcommand wins; otherwise the configuration flags
    /// decide, in order: `buildAdmin`, `enableBuildSchedule`, `watchOnly`
    pub fn resolve(command: Option<Commands>, config: &BuildConfig) -> Self {
        match command {
            Some(Commands::Build) => Mode::Build,
            Some(Commands::Schedule) => Mode::Schedule,
            Some(Commands::Watch) => Mode::Watch,
            Some(Commands::Serve) => Mode::Serve,
            Some(Commands::Config) => Mode::ShowConfig,
            None if config.build_admin => Mode::Serve,
            None if config.enable_build_schedule => Mode::Schedule,
            None if config.watch_only => Mode::Watch,
            None => Mode::Build,
        }
    }
}

/// Handle the resolved mode
///
/// Routes the mode to the appropriate handler module.
pub async fn handle_command(mode: Mode, config: BuildConfig) -> Result<()> {
    if mode == Mode::ShowConfig {
        return show::print_config(&config);
    }

    crate::version::check(&config).await;

    match mode {
        Mode::Build => build::run_build(config).await,
        Mode::Schedule => schedule::run_schedule(config).await,
        Mode::Watch => watch::run_watch(config).await,
        Mode::Serve => serve::run_dashboard(&config).await,
        Mode::ShowConfig => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommand_wins() {
        let config = BuildConfig {
            build_admin: true,
            ..Default::default()
        };
        assert_eq!(Mode::resolve(Some(Commands::Build), &config), Mode::Build);
        assert_eq!(Mode::resolve(Some(Commands::Config), &config), Mode::ShowConfig);
    }

    #[test]
    fn test_mode_from_config_flags() {
        let mut config = BuildConfig::default();
        assert_eq!(Mode::resolve(None, &config), Mode::Build);

        config.watch_only = true;
        assert_eq!(Mode::resolve(None, &config), Mode::Watch);

        config.enable_build_schedule = true;
        assert_eq!(Mode::resolve(None, &config), Mode::Schedule);

        config.build_admin = true;
        assert_eq!(Mode::resolve(None, &config), Mode::Serve);
    }
}
