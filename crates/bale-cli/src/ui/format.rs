//! Formatting utilities for sizes, durations, and build summaries.

use bale_bundler::BuildResult;
use console::Term;
use owo_colors::OwoColorize;
use std::time::Duration;

use super::colors_enabled;

/// Format file size in human-readable format.
///
/// Scales by 1024 up to GB. Whole bytes print without decimals, larger units
/// with two.
///
/// # Arguments
///
/// * `bytes` - Size in bytes
///
/// # Returns
///
/// Formatted string (e.g., "1.50 KB")
///
/// # Examples
///
/// ```
/// use bale_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format duration in human-readable format.
///
/// Milliseconds below one second, seconds with two decimals below one minute,
/// whole minutes and seconds above that.
///
/// # Arguments
///
/// * `duration` - Elapsed time to format
///
/// # Returns
///
/// Formatted string (e.g., "50ms", "1m 30s")
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bale_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print a build summary table to stderr.
///
/// Lists every emitted file with its size between two rules sized to the
/// terminal, then the total size, duration, module count and chunk count.
/// Colors follow the choice made by `init_colors`.
///
/// # Arguments
///
/// * `result` - Outcome of a finished build
///
/// # Examples
///
/// ```no_run
/// use bale_bundler::{BuildConfig, Bundler};
/// use bale_cli::ui::print_build_summary;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = Bundler::new(BuildConfig::default())?.build()?;
/// print_build_summary(&result);
/// # Ok(())
/// # }
/// ```
pub fn print_build_summary(result: &BuildResult) {
    let width = Term::stderr().size().1 as usize;
    let rule = "─".repeat(width.clamp(20, 80));
    let color = colors_enabled();

    if color {
        eprintln!("\n{}", "Build Summary".bold().underline());
    } else {
        eprintln!("\nBuild Summary");
    }
    eprintln!("{}", rule);

    for file in &result.emitted_files {
        let name = file.path.display().to_string();
        let size = format_size(file.size);
        if color {
            eprintln!("  {} {} {}", "▸".blue(), name.bright_white().bold(), size.dimmed());
        } else {
            eprintln!("  ▸ {} {}", name, size);
        }
    }

    eprintln!("{}", rule);

    let stats = &result.stats;
    let totals = format!(
        "{} in {} ({} modules, {} chunks)",
        format_size(result.total_size()),
        format_duration(result.duration),
        stats.modules,
        stats.chunks
    );
    if color {
        eprintln!("  {} {}", "Total:".bold(), totals.green());
    } else {
        eprintln!("  Total: {}", totals);
    }
}
