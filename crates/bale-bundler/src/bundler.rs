//! Build orchestration.
//!
//! ```text
//! buildStart -> resolve + transform (parallel waves) -> afterResolve
//!   -> split chunks -> render (parallel) -> beforeEmit -> write -> afterEmit
//! ```
//!
//! Any fatal error stops the pipeline before the write step, so a failed build
//! leaves the output directory untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bale_config::{BuildConfig, validate_schema};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;

use crate::chunk::split_chunks;
use crate::diagnostics::{Diagnostic, has_errors, sort_diagnostics};
use crate::graph::{GraphBuilder, relative_name};
use crate::handlers::HandlerRegistry;
use crate::output::{Asset, Assets, content_hash, write_assets};
use crate::plugins::{Plugin, PluginRegistry};
use crate::render::render_chunk;
use crate::resolver::Resolver;
use crate::rules::RuleSet;
use crate::runtime::{NativeRuntime, Runtime};
use crate::Result;

/// State shared with plugins for the duration of one build.
pub struct BuildContext {
    config: Arc<BuildConfig>,
    runtime: Arc<dyn Runtime>,
    warnings: Mutex<Vec<Diagnostic>>,
}

impl BuildContext {
    pub fn new(config: Arc<BuildConfig>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            config,
            runtime,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// File access for plugins (templates and the like).
    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    /// URL an emitted file is served under: `output.publicPath` + file name.
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}{}", self.config.output.public_path, filename)
    }

    /// Context-relative display name for `path`.
    pub fn relative_path(&self, path: &Path) -> String {
        relative_name(&self.config.context, path)
    }

    /// Record a non-fatal problem.
    pub fn warn(&self, diagnostic: Diagnostic) {
        self.warnings.lock().push(diagnostic);
    }

    pub(crate) fn take_warnings(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("context", &self.config.context)
            .field("output", &self.config.output.path)
            .finish_non_exhaustive()
    }
}

/// Counts reported after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub modules: usize,
    pub failed_modules: usize,
    pub chunks: usize,
    pub assets: usize,
}

/// In-memory result of [`Bundler::bundle`].
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub assets: Assets,
    /// Non-fatal problems, errors first.
    pub diagnostics: Vec<Diagnostic>,
    pub stats: BuildStats,
}

impl BuildOutput {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

/// A file written by [`Bundler::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedFile {
    /// Path relative to the output directory.
    pub path: PathBuf,
    /// Hex BLAKE3 hash of the file contents.
    pub content_hash: String,
    pub size: u64,
}

/// Result of [`Bundler::build`].
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Written files, sorted by path.
    pub emitted_files: Vec<EmittedFile>,
    pub diagnostics: Vec<Diagnostic>,
    pub output_dir: PathBuf,
    pub duration: Duration,
    pub stats: BuildStats,
}

impl BuildResult {
    /// True when any diagnostic is an error; the CLI exits non-zero.
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    pub fn total_size(&self) -> u64 {
        self.emitted_files.iter().map(|f| f.size).sum()
    }
}

/// Runs builds for one configuration.
pub struct Bundler {
    config: Arc<BuildConfig>,
    rules: RuleSet,
    plugins: PluginRegistry,
    runtime: Arc<dyn Runtime>,
}

impl Bundler {
    /// Validate `config` and prepare a bundler using the built-in handlers.
    pub fn new(config: BuildConfig) -> Result<Self> {
        Self::with_handlers(config, HandlerRegistry::builtin())
    }

    /// Like [`Bundler::new`], resolving rule handler ids against `handlers`.
    pub fn with_handlers(config: BuildConfig, handlers: HandlerRegistry) -> Result<Self> {
        validate_schema(&config)?;
        let rules = RuleSet::compile(&config.rules, &handlers)?;
        let plugins = PluginRegistry::from_config(&config.plugins)?;

        Ok(Self {
            config: Arc::new(config),
            rules,
            plugins,
            runtime: Arc::new(NativeRuntime),
        })
    }

    /// Read sources through `runtime` instead of the filesystem.
    pub fn with_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Append a plugin after the configured ones.
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.add(plugin);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build every asset in memory without touching the output directory.
    pub fn bundle(&self) -> Result<BuildOutput> {
        let cx = self.context();
        self.bundle_with(&cx)
    }

    /// Build and write the output directory.
    pub fn build(&self) -> Result<BuildResult> {
        let started = Instant::now();
        let cx = self.context();
        let output = self.bundle_with(&cx)?;

        let output_dir = self.config.output.path.clone();
        write_assets(&output.assets, &output_dir)?;

        let mut emitted_files: Vec<EmittedFile> = output
            .assets
            .iter()
            .map(|asset| EmittedFile {
                path: PathBuf::from(&asset.filename),
                content_hash: content_hash(&asset.source),
                size: asset.source.len() as u64,
            })
            .collect();
        emitted_files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut result = BuildResult {
            emitted_files,
            diagnostics: output.diagnostics,
            output_dir,
            duration: Duration::ZERO,
            stats: output.stats,
        };

        self.plugins.after_emit(&cx, &result)?;
        result.diagnostics.extend(cx.take_warnings());
        sort_diagnostics(&mut result.diagnostics);
        result.duration = started.elapsed();

        tracing::info!(
            files = result.emitted_files.len(),
            errors = result.error_count(),
            duration_ms = result.duration.as_millis() as u64,
            "build finished"
        );
        Ok(result)
    }

    fn context(&self) -> BuildContext {
        BuildContext::new(Arc::clone(&self.config), Arc::clone(&self.runtime))
    }

    fn bundle_with(&self, cx: &BuildContext) -> Result<BuildOutput> {
        let config = self.config.as_ref();
        self.plugins.build_start(cx)?;

        let resolver = Resolver::new(&config.resolve, &config.context, Arc::clone(&self.runtime));
        let builder = GraphBuilder {
            resolver: &resolver,
            rules: &self.rules,
            runtime: self.runtime.as_ref(),
            context: &config.context,
            bail: config.bail,
        };
        let (mut graph, mut diagnostics) = builder.build(&config.entry)?;
        tracing::debug!(modules = graph.len(), "module graph complete");

        self.plugins.after_resolve(cx, &mut graph)?;

        let chunks = split_chunks(&graph, config);
        let rendered: Vec<_> = chunks
            .par_iter()
            .map(|chunk| render_chunk(chunk, &graph, config))
            .collect();

        let mut assets = Assets::new();
        for chunk in rendered {
            tracing::debug!(chunk = %chunk.name, file = %chunk.filename, "rendered chunk");
            let map_filename = chunk.map_filename();
            assets.insert(Asset::new(chunk.filename, chunk.code).for_chunk(chunk.name))?;
            if let Some(map) = chunk.map {
                assets.insert(Asset::new(map_filename, map))?;
            }
        }

        self.plugins.before_emit(cx, &mut assets)?;

        diagnostics.extend(cx.take_warnings());
        sort_diagnostics(&mut diagnostics);

        let stats = BuildStats {
            modules: graph.len(),
            failed_modules: graph.modules().iter().filter(|m| m.failed).count(),
            chunks: chunks.len(),
            assets: assets.len(),
        };

        Ok(BuildOutput {
            assets,
            diagnostics,
            stats,
        })
    }
}

impl std::fmt::Debug for Bundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundler")
            .field("entries", &self.config.entry.keys().collect::<Vec<_>>())
            .field("rules", &self.rules.len())
            .field("plugins", &self.plugins.names())
            .finish()
    }
}
