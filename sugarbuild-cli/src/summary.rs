//! Terminal summaries
//!
//! Colored overviews printed around builds: the settings a build will use
//! before it starts, and how it went once it finishes.

use colored::*;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_runner::RunReport;

/// Labelled settings shown before a build
fn summary_lines(config: &BuildConfig) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Build Flavor", config.flavor.clone()),
        ("Build Version", config.version.clone()),
        ("Build SugarCRM", config.build_sugar.to_string()),
        ("Build Sidecar", config.build_sidecar.to_string()),
        ("Install SugarCRM", config.install_sugar.to_string()),
        ("Install Demo Data", config.install_demo_data.to_string()),
        ("Import Demo Data", config.import_demo_data.to_string()),
    ];
    if !config.import_dump_file.is_empty() {
        lines.push(("Import SQL File", config.import_dump_file.clone()));
    }
    lines.push(("Include Language", config.include_language.to_string()));
    lines.push(("Watch for Changes", config.watch_changes.to_string()));
    if config.enable_build_schedule {
        lines.push(("Branches", config.branches.join(", ")));
    }
    lines
}

pub fn print_config_summary(config: &BuildConfig) {
    println!("{}", "----------".magenta());
    for (label, value) in summary_lines(config) {
        println!("{} {}", format!("{}:", label).cyan(), value.magenta());
    }
    println!("{}", "----------".magenta());
}

pub fn print_run_report(report: &RunReport) {
    println!();
    println!("{}", "SugarCRM is Ready!".green().bold());
    println!(
        "{} {}",
        "Completed in".dimmed(),
        format!("{:.2} seconds", report.elapsed.as_secs_f64()).magenta()
    );
    if report.run.reruns > 0 {
        println!(
            "{} {}",
            "Install reruns:".yellow(),
            report.run.reruns.to_string().magenta()
        );
    }
    if let Some(dump) = &report.dump {
        println!("{} {}", "SQL dump:".dimmed(), dump.display().to_string().cyan());
    }
}
