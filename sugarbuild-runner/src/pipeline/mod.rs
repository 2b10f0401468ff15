//! Build pipeline
//!
//! A run visits the stages in [`Stage::ORDER`]: dependency install,
//! compile, write-config, asset build, database provisioning, install,
//! dump conversion, data import, watch and finish. Each stage checks its
//! own enable flag and is skipped when disabled; the first failing stage
//! ends the run.
//!
//! The install stage can report that the wizard never reached its final
//! milestone. The run then restarts from the first stage with a fresh
//! configuration snapshot, up to `maxReruns` times.

mod dump;
mod import;
mod settings;
mod stages;

pub use dump::{
    Substitution, clean_branch_name, dump_path, local_dump_path, parse_current_branch,
    to_placeholders, to_real,
};
pub use import::{DumpSource, HttpDumpSource};
pub use settings::{
    CONFIG_SI_FILE, DbCredentials, database_name, render_config_si, resolve_install_settings,
};

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_core::domain::run::{PipelineRun, RunOutcome, Stage};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::command::CommandRunner;
use crate::config::SharedConfig;
use crate::error::PipelineError;
use crate::install::{HEARTBEAT_INTERVAL, MilestoneTracker, ProgressObserver};

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: PipelineRun,
    pub elapsed: Duration,
    /// Portable dump written by this run, if any
    pub dump: Option<PathBuf>,
}

/// Anything that can execute a full build against the shared configuration
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    async fn execute(&self, config: &SharedConfig) -> Result<RunReport, PipelineError>;
}

/// Result of one pass through the stages
enum Attempt {
    Completed { dump: Option<PathBuf> },
    NeedsRerun,
}

/// Result of the install stage
enum InstallOutcome {
    Skipped,
    Installed { dump: Option<PathBuf> },
    NeedsRerun,
}

/// Runs builds through external tools
pub struct BuildPipeline {
    runner: Arc<dyn CommandRunner>,
    dumps: Arc<dyn DumpSource>,
    observer: Mutex<Box<dyn ProgressObserver>>,
    heartbeat_interval: Duration,
    watching: AtomicBool,
}

impl BuildPipeline {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            dumps: Arc::new(HttpDumpSource),
            observer: Mutex::new(Box::new(MilestoneTracker::new())),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            watching: AtomicBool::new(false),
        }
    }

    pub fn with_dump_source(mut self, dumps: Arc<dyn DumpSource>) -> Self {
        self.dumps = dumps;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn ProgressObserver>) -> Self {
        self.observer = Mutex::new(observer);
        self
    }

    /// `(completed, total)` install milestones of the current attempt
    pub async fn progress(&self) -> (usize, usize) {
        self.observer.lock().await.progress()
    }

    /// Runs every enabled stage against the current configuration
    pub async fn run(&self, config: &SharedConfig) -> Result<RunReport, PipelineError> {
        let first = config.snapshot().await;
        let branch = Some(first.current_branch.clone()).filter(|b| !b.is_empty());
        let mut run = PipelineRun::new(branch, first.flavor.clone());

        let span = info_span!(
            "build",
            run = %run.id,
            branch = run.branch.as_deref().unwrap_or("-"),
            flavor = %run.flavor,
        );

        async move {
            info!("Starting build");
            let dump = loop {
                let snapshot = config.snapshot().await;
                match self.attempt(&snapshot, config, &mut run).await {
                    Ok(Attempt::Completed { dump }) => break dump,
                    Ok(Attempt::NeedsRerun) => {
                        run.restart();
                        let limit = snapshot.max_reruns;
                        if limit > 0 && run.reruns > limit {
                            run.finish(RunOutcome::RerunExhausted);
                            error!("Install did not complete after {} reruns", limit);
                            return Err(PipelineError::RerunsExhausted(limit));
                        }
                        warn!("Install process failed to complete. Trying again (rerun {})", run.reruns);
                    }
                    Err(e) => {
                        run.finish(RunOutcome::Failed);
                        error!("Build failed during {}: {}", run.stage, e);
                        return Err(e);
                    }
                }
            };

            advance(&mut run, Stage::Finish);
            run.finish(RunOutcome::Success);
            let elapsed = run.elapsed(Utc::now());
            info!("SugarCRM is ready");
            info!("Completed in {:.2} seconds", elapsed.as_secs_f64());

            Ok(RunReport { run, elapsed, dump })
        }
        .instrument(span)
        .await
    }

    async fn attempt(
        &self,
        config: &BuildConfig,
        shared: &SharedConfig,
        run: &mut PipelineRun,
    ) -> Result<Attempt, PipelineError> {
        advance(run, Stage::DependencyInstall);
        self.install_dependencies(config).await?;

        advance(run, Stage::Compile);
        self.compile(config).await?;

        advance(run, Stage::WriteConfig);
        self.write_config(config).await?;

        advance(run, Stage::AssetBuild);
        self.build_assets(config).await?;

        advance(run, Stage::DbProvision);
        self.provision_database(config).await?;

        advance(run, Stage::Install);
        let dump = match self.install(config).await? {
            InstallOutcome::Skipped => None,
            InstallOutcome::Installed { dump } => dump,
            InstallOutcome::NeedsRerun => return Ok(Attempt::NeedsRerun),
        };

        if let Some(path) = &dump {
            advance(run, Stage::ConvertDump);
            self.convert_dump(config, path).await?;
        }

        advance(run, Stage::ImportData);
        self.import_data(config).await?;

        advance(run, Stage::Watch);
        self.watch(config, shared).await?;

        Ok(Attempt::Completed { dump })
    }
}

#[async_trait]
impl BuildExecutor for BuildPipeline {
    async fn execute(&self, config: &SharedConfig) -> Result<RunReport, PipelineError> {
        self.run(config).await
    }
}

fn advance(run: &mut PipelineRun, stage: Stage) {
    run.enter(stage);
    debug!("Stage: {}", stage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCommandRunner, StaticDumpSource};
    use std::path::Path;
    use sugarbuild_core::domain::milestone::install_milestones;
    use tempfile::TempDir;

    const COMPLETE_INSTALL: &str = "Creating the database\nCreating default users...\nPopulating the database tables with demo data\n";
    const PARTIAL_INSTALL: &str = "Creating the database\nCreating default users...\n";

    fn disabled(dir: &Path) -> BuildConfig {
        BuildConfig {
            source_dir: dir.join("checkout"),
            output_dir: dir.join("out"),
            sql_dump_dir: dir.join("data"),
            run_composer: false,
            build_sugar: false,
            build_sidecar: false,
            install_sugar: false,
            import_demo_data: false,
            create_sql_dump: false,
            watch_changes: false,
            sugarcrm_license: "LIC-1".to_string(),
            ..Default::default()
        }
    }

    fn pipeline(runner: &Arc<ScriptedCommandRunner>) -> BuildPipeline {
        BuildPipeline::new(runner.clone())
    }

    fn setup() -> (TempDir, Arc<ScriptedCommandRunner>) {
        (tempfile::tempdir().unwrap(), Arc::new(ScriptedCommandRunner::new()))
    }

    #[tokio::test]
    async fn test_all_stages_disabled_runs_nothing() {
        let (dir, runner) = setup();
        let config = SharedConfig::new(disabled(dir.path()));

        let report = pipeline(&runner).run(&config).await.unwrap();

        assert!(runner.calls().is_empty());
        assert_eq!(report.run.stage, Stage::Finish);
        assert_eq!(report.run.outcome, Some(RunOutcome::Success));
        assert_eq!(report.run.reruns, 0);
        assert_eq!(report.dump, None);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_incomplete_install_reruns_from_first_stage() {
        let (dir, runner) = setup();
        runner.respond("phantomjs", PARTIAL_INSTALL);
        runner.respond("phantomjs", COMPLETE_INSTALL);
        let config = SharedConfig::new(BuildConfig {
            run_composer: true,
            install_sugar: true,
            ..disabled(dir.path())
        });

        let pipeline = pipeline(&runner);
        let report = pipeline.run(&config).await.unwrap();

        assert_eq!(report.run.reruns, 1);
        assert_eq!(runner.count("phantomjs"), 2);
        assert_eq!(runner.count("composer install"), 2);
        assert_eq!(pipeline.progress().await, (0, install_milestones().len()));
    }

    #[tokio::test]
    async fn test_rerun_limit() {
        let (dir, runner) = setup();
        runner.respond("phantomjs", PARTIAL_INSTALL);
        let config = SharedConfig::new(BuildConfig {
            install_sugar: true,
            max_reruns: 2,
            ..disabled(dir.path())
        });

        let err = pipeline(&runner).run(&config).await.unwrap_err();

        assert!(matches!(err, PipelineError::RerunsExhausted(2)));
        assert_eq!(runner.count("phantomjs"), 3);
    }

    #[tokio::test]
    async fn test_install_driver_stderr_fails_the_run() {
        let (dir, runner) = setup();
        runner.respond_stderr("phantomjs", "TypeError: undefined is not a function");
        let config = SharedConfig::new(BuildConfig {
            install_sugar: true,
            ..disabled(dir.path())
        });

        let err = pipeline(&runner).run(&config).await.unwrap_err();

        assert!(matches!(err, PipelineError::InstallDriver(ref m) if m.contains("TypeError")));
        assert_eq!(runner.count("phantomjs"), 1);
    }

    #[tokio::test]
    async fn test_install_writes_config_and_provisions_database() {
        let (dir, runner) = setup();
        runner.respond("phantomjs", COMPLETE_INSTALL);
        let config = SharedConfig::new(BuildConfig {
            install_sugar: true,
            flavor: "pro".to_string(),
            ..disabled(dir.path())
        });

        pipeline(&runner).run(&config).await.unwrap();

        let written =
            std::fs::read_to_string(dir.path().join("out/pro").join(CONFIG_SI_FILE)).unwrap();
        assert!(written.starts_with("<?php\n$sugar_config_si = array(\n"));
        assert!(written.contains("'setup_db_database_name' => 'sugar7pro',"));
        assert!(written.contains("'setup_license_key' => 'LIC-1',"));

        let calls = runner.calls();
        assert!(calls[0].starts_with("mysql --host=localhost"));
        assert!(calls[0].contains("CREATE DATABASE IF NOT EXISTS `sugar7pro`"));
        assert!(calls[1].contains("http://localhost/pro/install.php?goto=SilentInstall&cli=true"));
    }

    #[tokio::test]
    async fn test_compile_without_marker_fails() {
        let (dir, runner) = setup();
        runner.respond("php build.php", "PHP Fatal error: something broke\n");
        let config = SharedConfig::new(BuildConfig {
            build_sugar: true,
            build_sidecar: true,
            ..disabled(dir.path())
        });

        let err = pipeline(&runner).run(&config).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::ToolFailed {
                stage: Stage::Compile,
                ..
            }
        ));
        assert_eq!(runner.count("gulp"), 0);
    }

    #[tokio::test]
    async fn test_compile_rejects_empty_output_dir() {
        let (dir, runner) = setup();
        let config = SharedConfig::new(BuildConfig {
            build_sugar: true,
            output_dir: PathBuf::new(),
            ..disabled(dir.path())
        });

        let err = pipeline(&runner).run(&config).await.unwrap_err();

        assert!(matches!(err, PipelineError::Setting(_)));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_compile_cleans_flavor_output() {
        let (dir, runner) = setup();
        runner.respond("php build.php", "Building...\nDONE\n");
        runner.respond("gulp", "[12:00:01] Finished 'default' after 20 s\n");
        let stale = dir.path().join("out/ent/stale");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("old.php"), "x").unwrap();
        std::fs::write(dir.path().join("out/ent/top.php"), "x").unwrap();
        let config = SharedConfig::new(BuildConfig {
            build_sugar: true,
            build_sidecar: true,
            include_language: true,
            ..disabled(dir.path())
        });

        pipeline(&runner).run(&config).await.unwrap();

        assert!(dir.path().join("out/ent").is_dir());
        assert!(!stale.exists());
        assert!(!dir.path().join("out/ent/top.php").exists());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("build/rome; php build.php"));
        assert!(calls[0].contains("--flav=ent"));
        assert!(calls[0].contains("--clean=0"));
        assert!(calls[0].ends_with(" --latin"));
        assert!(calls[1].ends_with("sidecar; npm install; gulp"));
    }

    #[tokio::test]
    async fn test_sidecar_without_marker_fails() {
        let (dir, runner) = setup();
        runner.respond("gulp", "Error: cannot find module\n");
        let config = SharedConfig::new(BuildConfig {
            build_sidecar: true,
            ..disabled(dir.path())
        });

        let err = pipeline(&runner).run(&config).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ToolFailed {
                stage: Stage::AssetBuild,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_install_exports_portable_dump() {
        let (dir, runner) = setup();
        runner.respond("git branch", "  master\n* (HEAD detached at upstream/7_9)\n");
        runner.respond("phantomjs", COMPLETE_INSTALL);
        let dump = dir.path().join("data/7_9_ent.sql");
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        // mysqldump is scripted, so the export it would write is prepared here
        std::fs::write(&dump, "USE `sugar7ent`; INSERT 'LIC-1';").unwrap();
        let config = SharedConfig::new(BuildConfig {
            install_sugar: true,
            create_sql_dump: true,
            ..disabled(dir.path())
        });

        let report = pipeline(&runner).run(&config).await.unwrap();

        assert_eq!(report.dump.as_deref(), Some(dump.as_path()));
        assert_eq!(
            std::fs::read_to_string(&dump).unwrap(),
            "USE `{{DB_NAME}}`; INSERT '{{LICENSE_KEY}}';"
        );
        let export = runner
            .calls()
            .into_iter()
            .find(|c| c.starts_with("mysqldump"))
            .unwrap();
        assert!(export.contains("--add-drop-database --databases sugar7ent > "));
        assert!(export.ends_with("7_9_ent.sql"));
    }

    #[tokio::test]
    async fn test_empty_export_fails() {
        let (dir, runner) = setup();
        runner.respond("git branch", "* master\n");
        runner.respond("phantomjs", COMPLETE_INSTALL);
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/master_ent.sql"), "  \n").unwrap();
        let config = SharedConfig::new(BuildConfig {
            install_sugar: true,
            create_sql_dump: true,
            ..disabled(dir.path())
        });

        let err = pipeline(&runner).run(&config).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDump(_)));
    }

    #[tokio::test]
    async fn test_import_local_dump() {
        let (dir, runner) = setup();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("data/master_ent.sql"),
            "USE `{{DB_NAME}}`; INSERT '{{LICENSE_KEY}}';",
        )
        .unwrap();
        let config = SharedConfig::new(BuildConfig {
            import_demo_data: true,
            install_demo_data: false,
            import_dump_file: "master_ent".to_string(),
            ..disabled(dir.path())
        });

        pipeline(&runner).run(&config).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("CREATE DATABASE IF NOT EXISTS `sugar7ent`"));
        let (prefix, working) = calls[1].split_once(" < ").unwrap();
        assert!(prefix.starts_with("mysql --host=localhost"));
        assert!(prefix.ends_with(" sugar7ent"));
        assert!(!Path::new(working.trim_matches('\'')).exists());
    }

    #[tokio::test]
    async fn test_import_remote_dump() {
        let (dir, runner) = setup();
        let dumps = Arc::new(StaticDumpSource::new("USE `{{DB_NAME}}`;"));
        let config = SharedConfig::new(BuildConfig {
            import_demo_data: true,
            install_demo_data: false,
            import_host: "http://peer:3000/build".to_string(),
            import_branch: "7_9".to_string(),
            ..disabled(dir.path())
        });

        BuildPipeline::new(runner.clone())
            .with_dump_source(dumps.clone())
            .run(&config)
            .await
            .unwrap();

        assert_eq!(
            dumps.requests(),
            vec![(
                "http://peer:3000/build".to_string(),
                "7_9".to_string(),
                "ent".to_string()
            )]
        );
        assert_eq!(runner.count(" < "), 1);
    }

    #[tokio::test]
    async fn test_import_remote_missing_dump_fails() {
        let (dir, runner) = setup();
        let config = SharedConfig::new(BuildConfig {
            import_demo_data: true,
            install_demo_data: false,
            import_host: "http://peer:3000/build".to_string(),
            import_branch: "gone".to_string(),
            ..disabled(dir.path())
        });

        let err = BuildPipeline::new(runner.clone())
            .with_dump_source(Arc::new(StaticDumpSource::missing()))
            .run(&config)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Remote(_)));
        assert_eq!(runner.count(" < "), 0);
    }

    #[tokio::test]
    async fn test_import_without_source_fails() {
        let (dir, runner) = setup();
        let config = SharedConfig::new(BuildConfig {
            import_demo_data: true,
            install_demo_data: false,
            ..disabled(dir.path())
        });

        let err = pipeline(&runner).run(&config).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoImportSource));
    }

    #[tokio::test]
    async fn test_import_skipped_when_wizard_inserts_demo_data() {
        let (dir, runner) = setup();
        let config = SharedConfig::new(BuildConfig {
            import_demo_data: true,
            install_demo_data: true,
            ..disabled(dir.path())
        });

        pipeline(&runner).run(&config).await.unwrap();
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_watch_starts_once() {
        let (dir, runner) = setup();
        std::fs::create_dir_all(dir.path().join("checkout/sugarcrm")).unwrap();
        let config = SharedConfig::new(BuildConfig {
            watch_changes: true,
            ..disabled(dir.path())
        });

        let pipeline = pipeline(&runner);
        pipeline.run(&config).await.unwrap();
        // The source tree is gone; a second watcher start would fail
        std::fs::remove_dir_all(dir.path().join("checkout")).unwrap();
        pipeline.run(&config).await.unwrap();
    }
}
