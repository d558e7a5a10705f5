//! Build command implementation.
//!
//! `bale build` loads the config, runs the bundler on the blocking pool and
//! reports emitted files and diagnostics. With `--watch` it keeps rebuilding
//! until Ctrl+C.

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::dev::{DevBuilder, FileWatcher};
use crate::error::{CliError, Result, cli_error_to_miette, diagnostic_to_miette};
use crate::ui;
use bale_bundler::{BuildResult, Bundler};
use bale_config::BuildConfig;
use tokio::signal;

/// Execute the build command.
///
/// # Errors
///
/// Config and bundler errors propagate as-is; a build that completes with
/// error diagnostics returns [`CliError::BuildFailed`] so the process exits
/// non-zero.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let config = utils::load_config(args.config.as_deref())?;
    ui::info(&format!(
        "Building {} entr{} into {}",
        config.entry.len(),
        if config.entry.len() == 1 { "y" } else { "ies" },
        config.output.path.display()
    ));

    if !args.watch {
        let result = build_with_result(&config).await?;
        return check(&result);
    }

    // In watch mode a failed first build is reported, not fatal.
    if let Err(err) = build_with_result(&config).await {
        report_error(err);
    }

    let (watcher, changes) = FileWatcher::for_config(&config)?;
    ui::info(&format!("Watching for changes in {}", watcher.root().display()));
    ui::info("Press Ctrl+C to stop");

    let builder = DevBuilder::new(config);
    tokio::select! {
        result = builder.rebuild_on_change(changes) => result?,
        _ = signal::ctrl_c() => ui::info("Stopping watch mode..."),
    }
    Ok(())
}

/// Run one build on the blocking pool and print its summary.
///
/// Error diagnostics are printed but do not make this fail; use [`check`]
/// for the exit status.
pub async fn build_with_result(config: &BuildConfig) -> Result<BuildResult> {
    let config = config.clone();
    let spinner = ui::Spinner::new("Building...");

    let outcome = tokio::task::spawn_blocking(move || Bundler::new(config)?.build())
        .await
        .map_err(|e| CliError::Custom(format!("build task failed: {}", e)))?;

    match outcome {
        Ok(result) => {
            spinner.clear();
            report(&result);
            Ok(result)
        }
        Err(err) => {
            spinner.fail("Build failed");
            Err(err.into())
        }
    }
}

/// Map error diagnostics to [`CliError::BuildFailed`].
pub fn check(result: &BuildResult) -> Result<()> {
    if result.has_errors() {
        Err(CliError::BuildFailed {
            errors: result.error_count(),
        })
    } else {
        Ok(())
    }
}

fn report(result: &BuildResult) {
    for diagnostic in &result.diagnostics {
        eprintln!("{:?}", diagnostic_to_miette(diagnostic.clone()));
    }

    ui::print_build_summary(result);

    if result.has_errors() {
        ui::error(&format!(
            "Build finished with {} error(s) and {} warning(s)",
            result.error_count(),
            result.warning_count()
        ));
    } else if result.warning_count() > 0 {
        ui::warning(&format!(
            "Build completed in {} with {} warning(s)",
            ui::format_duration(result.duration),
            result.warning_count()
        ));
    } else {
        ui::success(&format!(
            "Build completed in {}",
            ui::format_duration(result.duration)
        ));
    }
}

/// Print an error that should not end a watch session.
pub(crate) fn report_error(err: CliError) {
    eprintln!("{:?}", cli_error_to_miette(err));
}
