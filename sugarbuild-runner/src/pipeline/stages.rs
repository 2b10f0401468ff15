use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_core::domain::run::Stage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dump::{dump_path, local_dump_path, parse_current_branch, to_placeholders, to_real};
use super::settings::{CONFIG_SI_FILE, DbCredentials, render_config_si, resolve_install_settings};
use super::{BuildPipeline, InstallOutcome};
use crate::command::{CommandError, quote};
use crate::config::SharedConfig;
use crate::error::PipelineError;
use crate::install::InstallSink;
use crate::sync::start_watcher;

/// Printed by the compiler on success
const COMPILE_DONE_MARKER: &str = "DONE";

/// Printed by the asset build on success
const ASSETS_DONE_MARKER: &str = "Finished 'default'";

fn path_arg(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Whether demo data comes from a dump rather than the wizard
fn wants_import(config: &BuildConfig) -> bool {
    config.import_demo_data && !config.install_demo_data
}

impl BuildPipeline {
    pub(super) async fn install_dependencies(&self, config: &BuildConfig) -> Result<(), PipelineError> {
        if !config.run_composer {
            return Ok(());
        }

        info!("Running composer install...");
        self.runner
            .run(&format!("cd {}; composer install", path_arg(&config.sugar_dir())))
            .await?;
        info!("Composer installation complete");
        Ok(())
    }

    pub(super) async fn compile(&self, config: &BuildConfig) -> Result<(), PipelineError> {
        if !config.build_sugar {
            return Ok(());
        }

        let target = config.flavor_output_dir();
        clear_output(config).await?;
        info!("Building SugarCRM to {}...", target.display());

        let command = format!(
            "cd {}; php build.php --ver={} --flav={} --base_dir={} --build_dir={} --clean=0{}",
            path_arg(&config.source_dir.join("build").join("rome")),
            quote(&config.version),
            quote(&config.flavor),
            path_arg(&config.sugar_dir()),
            path_arg(&config.output_dir),
            if config.include_language { " --latin" } else { "" },
        );
        let output = self.runner.run(&command).await?;

        if !output.contains(COMPILE_DONE_MARKER) {
            error!("{}", output.stdout.trim());
            return Err(PipelineError::ToolFailed {
                stage: Stage::Compile,
                marker: COMPILE_DONE_MARKER,
            });
        }

        info!("Build complete");
        Ok(())
    }

    pub(super) async fn write_config(&self, config: &BuildConfig) -> Result<(), PipelineError> {
        if !config.install_sugar {
            return Ok(());
        }

        let dir = config.flavor_output_dir();
        let path = dir.join(CONFIG_SI_FILE);
        let contents = render_config_si(&resolve_install_settings(config));

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(PipelineError::io("create", &dir))?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(PipelineError::io("write", &path))?;

        info!("Configuration file saved to {}", path.display());
        Ok(())
    }

    pub(super) async fn build_assets(&self, config: &BuildConfig) -> Result<(), PipelineError> {
        if !config.build_sidecar {
            return Ok(());
        }

        info!("Building sidecar...");
        let command = format!(
            "cd {}; npm install; gulp",
            path_arg(&config.flavor_output_dir().join("sidecar"))
        );
        let output = self.runner.run(&command).await?;

        if !output.contains(ASSETS_DONE_MARKER) {
            error!("{}", output.stdout.trim());
            return Err(PipelineError::ToolFailed {
                stage: Stage::AssetBuild,
                marker: ASSETS_DONE_MARKER,
            });
        }

        info!("Sidecar build complete");
        Ok(())
    }

    pub(super) async fn provision_database(&self, config: &BuildConfig) -> Result<(), PipelineError> {
        if !config.install_sugar && !wants_import(config) {
            return Ok(());
        }

        let db = DbCredentials::from_settings(&resolve_install_settings(config))?;
        info!("Creating database {}", db.database);

        let statement = format!("CREATE DATABASE IF NOT EXISTS `{}`", db.database);
        self.runner
            .run(&format!("mysql {} -e {}", db.client_options(), quote(&statement)))
            .await?;
        Ok(())
    }

    pub(super) async fn install(&self, config: &BuildConfig) -> Result<InstallOutcome, PipelineError> {
        if !config.install_sugar {
            return Ok(InstallOutcome::Skipped);
        }

        if config.install_demo_data {
            info!("Installing SugarCRM with demo data...");
        } else {
            info!("Installing SugarCRM...");
        }

        let command = format!("{} {}", config.install_driver, quote(&config.install_url()));
        let finished = {
            let mut observer = self.observer.lock().await;
            observer.reset();

            let result = {
                let mut sink = InstallSink::new(&mut **observer)
                    .with_heartbeat_interval(self.heartbeat_interval);
                self.runner.run_with_sink(&command, &mut sink).await
            };

            let finished = observer.is_finished();
            observer.reset();

            match result {
                Ok(_) => finished,
                Err(CommandError::Interrupted { reason, .. }) => {
                    return Err(PipelineError::InstallDriver(reason));
                }
                Err(e) => return Err(e.into()),
            }
        };

        if !finished {
            return Ok(InstallOutcome::NeedsRerun);
        }
        info!("Installation complete");

        if !config.create_sql_dump {
            return Ok(InstallOutcome::Installed { dump: None });
        }

        let dump = self.export_dump(config).await?;
        Ok(InstallOutcome::Installed { dump: Some(dump) })
    }

    async fn export_dump(&self, config: &BuildConfig) -> Result<PathBuf, PipelineError> {
        let branch = self.current_branch(config).await?;
        let db = DbCredentials::from_settings(&resolve_install_settings(config))?;
        let path = dump_path(config, &branch);

        tokio::fs::create_dir_all(&config.sql_dump_dir)
            .await
            .map_err(PipelineError::io("create", &config.sql_dump_dir))?;

        info!("Creating SQL dump for {}...", branch);
        self.runner
            .run(&format!(
                "mysqldump {} --add-drop-database --databases {} > {}",
                db.client_options(),
                quote(&db.database),
                path_arg(&path)
            ))
            .await?;

        info!("SQL dump file created at {}", path.display());
        Ok(path)
    }

    async fn current_branch(&self, config: &BuildConfig) -> Result<String, PipelineError> {
        let output = self
            .runner
            .run(&format!("cd {}; git branch", path_arg(&config.source_dir)))
            .await?;

        parse_current_branch(&output.stdout)
            .ok_or_else(|| PipelineError::BranchUnknown(config.source_dir.clone()))
    }

    pub(super) async fn convert_dump(&self, config: &BuildConfig, path: &Path) -> Result<(), PipelineError> {
        let db = DbCredentials::from_settings(&resolve_install_settings(config))?;

        info!("Updating SQL file...");
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(PipelineError::io("read", path))?;
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyDump(path.to_path_buf()));
        }

        let (portable, found) = to_placeholders(&text, &config.sugarcrm_license, &db.database);
        if found.license_key {
            info!("License key found, inserting placeholder");
        } else {
            warn!("License key not found in dump");
        }
        if found.database_name {
            info!("Database name found, inserting placeholder");
        } else {
            warn!("Database name not found in dump");
        }

        tokio::fs::write(path, portable)
            .await
            .map_err(PipelineError::io("write", path))?;
        info!("SQL file updated successfully");
        Ok(())
    }

    pub(super) async fn import_data(&self, config: &BuildConfig) -> Result<(), PipelineError> {
        if !wants_import(config) {
            return Ok(());
        }

        info!("Starting import procedure...");
        let text = self.import_source(config).await?;
        let db = DbCredentials::from_settings(&resolve_install_settings(config))?;

        let (real, found) = to_real(&text, &config.sugarcrm_license, &db.database);
        if !found.license_key {
            warn!("License key placeholder not found in dump");
        }
        if !found.database_name {
            warn!("Database name placeholder not found in dump");
        }

        let working = std::env::temp_dir().join(format!("sugarbuild-import-{}.sql", Uuid::new_v4()));
        tokio::fs::write(&working, real)
            .await
            .map_err(PipelineError::io("write", &working))?;

        info!("Importing into {}...", db.database);
        let result = self
            .runner
            .run(&format!(
                "mysql {} {} < {}",
                db.client_options(),
                quote(&db.database),
                path_arg(&working)
            ))
            .await;

        if let Err(e) = tokio::fs::remove_file(&working).await {
            warn!("Failed to remove {}: {}", working.display(), e);
        }

        result?;
        info!("Import complete");
        Ok(())
    }

    async fn import_source(&self, config: &BuildConfig) -> Result<String, PipelineError> {
        if !config.import_dump_file.is_empty() {
            let path = local_dump_path(config, &config.import_dump_file);
            info!("Importing {}", path.display());
            return tokio::fs::read_to_string(&path)
                .await
                .map_err(PipelineError::io("read", &path));
        }

        if !config.import_host.is_empty() && !config.import_branch.is_empty() {
            info!(
                "Importing branch {} from {}",
                config.import_branch, config.import_host
            );
            let text = self
                .dumps
                .fetch_dump(&config.import_host, &config.import_branch, &config.flavor)
                .await?;
            return Ok(text);
        }

        Err(PipelineError::NoImportSource)
    }

    pub(super) async fn watch(&self, config: &BuildConfig, shared: &SharedConfig) -> Result<(), PipelineError> {
        if !config.watch_changes {
            return Ok(());
        }

        if self.watching.swap(true, Ordering::AcqRel) {
            debug!("Watcher already running");
            return Ok(());
        }

        if let Err(e) = start_watcher(shared.clone()).await {
            self.watching.store(false, Ordering::Release);
            return Err(e.into());
        }

        info!("Listening for changes...");
        Ok(())
    }
}

/// Empties the active flavor's output directory, keeping the directory
async fn clear_output(config: &BuildConfig) -> Result<(), PipelineError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(PipelineError::Setting(
            "outputDir must be set before building".to_string(),
        ));
    }

    let dir = config.flavor_output_dir();
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return tokio::fs::create_dir_all(&dir)
                .await
                .map_err(PipelineError::io("create", &dir));
        }
        Err(e) => return Err(PipelineError::io("read", &dir)(e)),
    };

    info!("Clearing {}...", dir.display());
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(PipelineError::io("read", &dir))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(PipelineError::io("inspect", &path))?;

        if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(PipelineError::io("remove", &path))?;
        } else {
            tokio::fs::remove_file(&path)
                .await
                .map_err(PipelineError::io("remove", &path))?;
        }
    }

    Ok(())
}
