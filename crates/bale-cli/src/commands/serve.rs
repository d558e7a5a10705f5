//! Serve command implementation.
//!
//! Serves the content base (the output directory unless `devServer.contentBase`
//! says otherwise). With `--watch` it builds first and rebuilds on change
//! while serving.

use crate::cli::ServeArgs;
use crate::commands::{build, utils};
use crate::dev::{DevBuilder, DevServer, FileWatcher, ServerConfig};
use crate::error::{Result, ResultExt};
use crate::ui;

/// Execute the serve command.
///
/// # Errors
///
/// Config errors, a port that cannot be bound, or watcher setup failures.
/// Build failures in watch mode are reported and the server keeps running.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = utils::load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.dev_server.port = port;
    }
    if let Some(host) = args.host {
        config.dev_server.host = host;
    }

    if args.watch {
        if let Err(err) = build::build_with_result(&config).await {
            build::report_error(err);
        }
    } else if !config.content_base().is_dir() {
        ui::warning(&format!(
            "{} does not exist yet; run `bale build` or pass --watch",
            config.content_base().display()
        ));
    }

    let server = DevServer::bind(
        ServerConfig::from_build_config(&config),
        &config.dev_server.host,
        config.dev_server.port,
    )
    .await
    .with_hint("Use --port to choose a different port")?;
    let addr = server.local_addr()?;
    ui::success(&format!(
        "Serving {} at http://{}",
        server.content_base().display(),
        addr
    ));
    if config.dev_server.history_api_fallback {
        ui::info(&format!(
            "Unknown routes fall back to {}",
            config.dev_server.index
        ));
    }

    if !args.watch {
        ui::info("Press Ctrl+C to stop");
        server.run().await?;
        ui::success("Server stopped");
        return Ok(());
    }

    let (watcher, changes) = FileWatcher::for_config(&config)?;
    ui::info(&format!("Watching for changes in {}", watcher.root().display()));
    ui::info("Press Ctrl+C to stop");

    let builder = DevBuilder::new(config);
    // The server returns after Ctrl+C; the rebuild loop only ends on error.
    tokio::select! {
        result = server.run() => result?,
        result = builder.rebuild_on_change(changes) => result?,
    }

    ui::success("Server stopped");
    Ok(())
}
