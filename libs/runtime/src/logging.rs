use crate::config::{LoggingConfig, Section};
use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{
    filter::{filter_fn, Targets},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

// -------- level helpers --------
fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == crate_name or target starts with "crate_name::"
fn matches_crate_prefix(target: &str, crate_name: &str) -> bool {
    target == crate_name
        || (target.starts_with(crate_name) && target[crate_name.len()..].starts_with("::"))
}

/// A record belongs to the "default" section when no explicit subsystem claims it.
fn is_default_target(target: &str, subsystems: &[String]) -> bool {
    !subsystems.iter().any(|c| matches_crate_prefix(target, c))
}

// -------- rotating writer for files --------
#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriter;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file writer poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file writer poisoned"))?
            .flush()
    }
}

// -------- path resolution helpers --------

/// Resolve a log file path against `base_dir` (home_dir).
/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Create a rotating writer for log files, ensuring the parent directory exists.
fn create_rotating_writer_at_path(
    log_path: &Path,
    max_bytes: usize,
    max_backups: usize,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::MaxFiles(max_backups)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None, // file permissions (Unix only)
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

/// Writer for a section, or None when the section has no file or it cannot be opened.
fn section_file_writer(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let max_backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    let log_path = resolve_log_path(&section.file, base_dir);

    match create_rotating_writer_at_path(&log_path, max_bytes as usize, max_backups) {
        Ok(writer) => Some(writer),
        Err(e) => {
            // The subscriber is not installed yet, stderr is all we have.
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.to_string_lossy(),
                e
            );
            None
        }
    }
}

// -------- layer construction --------

fn console_layer(ansi: bool) -> fmt::Layer<Registry> {
    fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
}

fn build_layers(cfg: &LoggingConfig, base_dir: &Path, ansi: bool) -> Vec<BoxedLayer> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let subsystems: Vec<String> = cfg
        .keys()
        .filter(|k| k.as_str() != DEFAULT_SECTION)
        .cloned()
        .collect();

    for name in &subsystems {
        let section = &cfg[name];

        if let Some(level) = parse_tracing_level(&section.console_level) {
            let targets = Targets::new().with_target(name.clone(), LevelFilter::from_level(level));
            layers.push(
                console_layer(ansi)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_filter(targets)
                    .boxed(),
            );
        }

        if let (Some(writer), Some(level)) = (
            section_file_writer(name, section, base_dir),
            parse_tracing_level(&section.file_level),
        ) {
            let targets = Targets::new().with_target(name.clone(), LevelFilter::from_level(level));
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(writer)
                    .with_filter(targets)
                    .boxed(),
            );
        }
    }

    let Some(default_section) = cfg.get(DEFAULT_SECTION) else {
        return layers;
    };

    if let Some(level) = parse_tracing_level(&default_section.console_level) {
        let claimed = subsystems.clone();
        layers.push(
            console_layer(ansi)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(filter_fn(move |meta| {
                    meta.level() <= &level && is_default_target(meta.target(), &claimed)
                }))
                .boxed(),
        );
    }

    if let (Some(writer), Some(level)) = (
        section_file_writer(DEFAULT_SECTION, default_section, base_dir),
        parse_tracing_level(&default_section.file_level),
    ) {
        let claimed = subsystems;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(writer)
                .with_filter(filter_fn(move |meta| {
                    meta.level() <= &level && is_default_target(meta.target(), &claimed)
                }))
                .boxed(),
        );
    }

    layers
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: LoggingConfig containing the logging sections
/// - `base_dir`: base directory used to resolve relative log file paths (usually bot.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let ansi = std::io::stdout().is_terminal();
    let layers = build_layers(cfg, base_dir, ansi);
    let _ = Registry::default().with(layers).try_init();
}

fn init_default_logging() {
    let _ = fmt::fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

// =================== tests ===================
