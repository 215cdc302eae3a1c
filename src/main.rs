//! CLI entry point for dirlog

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use dirlog::walk::progress;
use dirlog::{CancelToken, OutputFormat, Settings, Summary};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{error, info};

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable (https://no-color.org/)
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            // The summary goes to stderr
            std::io::stderr().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dirlog")]
#[command(about = "Log directory contents with metadata")]
#[command(version)]
struct Args {
    /// Directory to log (default: from --config, else ".")
    directory: Option<PathBuf>,

    /// File to write the log to (default: from --config, else stdout)
    logfile: Option<PathBuf>,

    /// Only log files with this extension (e.g. .txt)
    #[arg(short = 'e', long = "extension")]
    extension: Option<String>,

    /// Deepest level to log; the root is level 0
    #[arg(short = 'L', long = "max-depth")]
    max_depth: Option<usize>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<OutputFormat>,

    /// Also print the log to stdout
    #[arg(long = "console")]
    console: bool,

    /// Enable debug diagnostics
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Load settings from a JSON file; command-line flags take precedence
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the effective settings to a JSON file
    #[arg(long = "save-config", value_name = "FILE")]
    save_config: Option<PathBuf>,

    /// Number of worker threads
    /// (0 = auto-detect, 1 = sequential, N = use N workers)
    #[arg(short = 'j', long = "jobs", default_value = "0")]
    jobs: usize,

    /// Descend into symlinked directories (cycles are detected)
    #[arg(long = "follow-symlinks")]
    follow_symlinks: bool,

    /// Leave the root directory itself out of the log
    #[arg(long = "no-root")]
    no_root: bool,

    /// Leave directories out of the log (they are still descended)
    #[arg(long = "files-only")]
    files_only: bool,

    /// Keep completion order instead of sorting entries by path
    #[arg(long = "unsorted")]
    unsorted: bool,

    /// Give up on an entry whose metadata takes longer than DURATION
    /// Duration format: 500ms, 5s, 1m
    #[arg(long = "entry-timeout", value_name = "DURATION")]
    entry_timeout: Option<String>,

    /// Show a progress line on stderr
    #[arg(long = "progress")]
    progress: bool,

    /// Control color of the summary line: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Append diagnostics to this file instead of stderr
    #[arg(long = "diagnostics-file", value_name = "FILE")]
    diagnostics_file: Option<PathBuf>,
}

/// Parse a duration string like "500ms" or "5s" using humantime.
fn parse_duration_string(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim()).map_err(|e| e.to_string())
}

/// Combine config-file settings with command-line flags; flags win.
fn effective_settings(args: &Args, base: Settings) -> Settings {
    Settings {
        directory_path: args.directory.clone().or(base.directory_path),
        log_file_path: args.logfile.clone().or(base.log_file_path),
        extension_filter: args.extension.clone().or(base.extension_filter),
        max_depth: args.max_depth.or(base.max_depth),
        output_format: args.format.unwrap_or(base.output_format),
        console: args.console || base.console,
        verbose: args.verbose || base.verbose,
    }
}

/// Writes everything to both sinks.
struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

fn open_sink(settings: &Settings) -> io::Result<Box<dyn Write>> {
    let stdout = io::stdout().lock();
    match &settings.log_file_path {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            if settings.console {
                Ok(Box::new(Tee {
                    first: file,
                    second: stdout,
                }))
            } else {
                Ok(Box::new(file))
            }
        }
        None => Ok(Box::new(BufWriter::new(stdout))),
    }
}

/// Print a rate-limited progress line until the walker drops its reporter.
fn spawn_progress_printer(
    rx: crossbeam_channel::Receiver<dirlog::ProgressUpdate>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_print: Option<Instant> = None;
        let mut last = None;
        for update in rx.iter() {
            last = Some(update);
            if last_print.is_none_or(|t| t.elapsed() >= Duration::from_millis(100)) {
                eprint!(
                    "\rscanned {} of ~{} entries ({:.0}%)",
                    update.processed,
                    update.discovered,
                    update.percent()
                );
                last_print = Some(Instant::now());
            }
        }
        if let Some(update) = last {
            eprintln!(
                "\rscanned {} of ~{} entries ({:.0}%)",
                update.processed,
                update.discovered,
                update.percent()
            );
        }
    })
}

fn print_summary(summary: &Summary, destination: &str, use_color: bool) -> io::Result<()> {
    let choice = if use_color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stderr = StandardStream::stderr(choice);
    let color = if summary.cancelled {
        Color::Red
    } else if summary.is_degraded() {
        Color::Yellow
    } else {
        Color::Green
    };
    stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(stderr, "dirlog:")?;
    stderr.reset()?;
    write!(
        stderr,
        " {} directories, {} files, {} errors, {} in {} ({:.0} entries/s) -> {}",
        summary.directories,
        summary.files,
        summary.errors,
        dirlog::format_size(summary.total_bytes),
        humantime::format_duration(Duration::from_millis(summary.elapsed.as_millis() as u64)),
        summary.entries_per_sec(),
        destination
    )?;
    if summary.cancelled {
        write!(stderr, " (partial: cancelled)")?;
    }
    writeln!(stderr)
}

fn main() {
    let args = Args::parse();

    let base = match &args.config {
        Some(path) => Settings::load(path).unwrap_or_else(|e| {
            eprintln!("dirlog: {}", e);
            process::exit(1);
        }),
        None => Settings::default(),
    };
    let settings = effective_settings(&args, base);

    if let Err(e) = dirlog::logging::init(settings.verbose, args.diagnostics_file.as_deref()) {
        eprintln!("dirlog: warning: diagnostics disabled: {}", e);
    }

    if let Some(path) = &args.save_config {
        if let Err(e) = settings.save(path) {
            eprintln!("dirlog: {}", e);
            process::exit(1);
        }
        info!(path = %path.display(), "saved settings");
    }

    let entry_timeout = args.entry_timeout.as_ref().map(|s| {
        parse_duration_string(s).unwrap_or_else(|e| {
            eprintln!("dirlog: invalid --entry-timeout '{}': {}", s, e);
            process::exit(1);
        })
    });

    let cancel = CancelToken::new();
    let interrupted = cancel.flag();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\ndirlog: interrupt received, finishing in-flight entries...");
        interrupted.store(true, Ordering::SeqCst);
    }) {
        eprintln!("dirlog: warning: cannot install interrupt handler: {}", e);
    }

    let (progress, printer) = if args.progress {
        let (reporter, rx) = progress::channel(64);
        (Some(reporter), Some(spawn_progress_printer(rx)))
    } else {
        (None, None)
    };

    let mut options = settings.run_options();
    options.walk.filter.include_root = !args.no_root;
    options.walk.filter.include_directories = !args.files_only;
    options.walk.concurrency = args.jobs;
    options.walk.follow_symlinks = args.follow_symlinks;
    options.walk.sort_by_path = !args.unsorted;
    options.walk.entry_timeout = entry_timeout;
    options.walk.cancel = cancel;
    options.walk.progress = progress;

    let root = settings
        .directory_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let destination = settings
        .log_file_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());

    info!(root = %root.display(), format = %settings.output_format, "starting directory logging");
    let walked = dirlog::walk(&root, &options.walk);

    // Dropping the options drops the progress reporter, which ends the printer.
    let format = options.format;
    drop(options);
    if let Some(handle) = printer {
        let _ = handle.join();
    }

    // The log file is only opened once the walk produced something to write,
    // so a fatal root error leaves an earlier log untouched.
    let run = walked.unwrap_or_else(|e| {
        eprintln!("dirlog: {}", e);
        process::exit(1);
    });
    let sink = open_sink(&settings).unwrap_or_else(|e| {
        eprintln!("dirlog: cannot open '{}': {}", destination, e);
        process::exit(1);
    });
    if let Err(e) = dirlog::encode(format, &run, sink) {
        eprintln!("dirlog: {}", e);
        process::exit(1);
    }

    let summary = &run.summary;
    let use_color = should_use_color(args.color);
    if let Err(e) = print_summary(summary, &destination, use_color) {
        error!(error = %e, "cannot print summary");
    }
    if summary.is_degraded() {
        eprintln!(
            "dirlog: warning: {} entries could not be fully read",
            summary.errors
        );
    }
    info!(destination = %destination, "directory logging completed");
    if summary.cancelled {
        process::exit(130);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["dirlog", "src", "--format", "csv", "-L", "2"]);
        let base = Settings {
            directory_path: Some(PathBuf::from("/elsewhere")),
            log_file_path: Some(PathBuf::from("from-config.xml")),
            extension_filter: Some("rs".to_string()),
            max_depth: Some(5),
            output_format: OutputFormat::Xml,
            console: true,
            verbose: false,
        };
        let merged = effective_settings(&args, base);
        assert_eq!(merged.directory_path, Some(PathBuf::from("src")));
        assert_eq!(merged.log_file_path, Some(PathBuf::from("from-config.xml")));
        assert_eq!(merged.extension_filter.as_deref(), Some("rs"));
        assert_eq!(merged.max_depth, Some(2));
        assert_eq!(merged.output_format, OutputFormat::Csv);
        assert!(merged.console);
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration_string(" 2s "), Ok(Duration::from_secs(2)));
        assert!(parse_duration_string("soon").is_err());
    }

    #[test]
    fn test_tee_writes_both() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        {
            let mut tee = Tee {
                first: &mut first,
                second: &mut second,
            };
            tee.write_all(b"abc").unwrap();
        }
        assert_eq!(first, b"abc");
        assert_eq!(second, b"abc");
    }
}
