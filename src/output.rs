//! Output management for the extension handler
//!
//! Every message goes to the handler log file (when one is attached) with a
//! timestamp, and to the console according to the verbosity level. The
//! manager is passed explicitly to whatever needs to log, including the
//! process runner that tees child output into it.

use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const LOG_PREFIX: &str = "[DockerExtension]";

/// Output manager that handles verbosity, formatting and the log file
pub struct OutputManager {
    verbose: bool,
    log_file: Option<Mutex<File>>,
}

impl OutputManager {
    /// Create a console-only output manager with the specified verbosity level
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            log_file: None,
        }
    }

    /// Append all subsequent messages to `path`, creating its directory if needed
    pub fn with_log_file(mut self, path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.log_file = Some(Mutex::new(file));
        Ok(self)
    }

    /// Print a success message
    pub fn success(&self, operation: &str, message: &str) {
        self.log(&format!("{operation}: {message}"));
        if self.verbose {
            self.colored_stdout(Color::Green, &format!("✅ {operation}: {message}"));
        } else {
            self.colored_stdout(Color::Green, &format!("✅ {message}"));
        }
    }

    /// Print an error message
    /// Always shows detailed error information
    pub fn error(&self, operation: &str, message: &str) {
        self.log(&format!("ERROR: {operation}: {message}"));
        let mut stderr = StandardStream::stderr(ColorChoice::Auto);
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
        let _ = writeln!(stderr, "❌ {operation}: {message}");
        let _ = stderr.reset();
        if !self.verbose {
            let _ = writeln!(stderr, "   Use --verbose for more details");
        }
    }

    /// Print a warning (always shown)
    pub fn warn(&self, operation: &str, message: &str) {
        self.log(&format!("WARNING: {operation}: {message}"));
        let mut stderr = StandardStream::stderr(ColorChoice::Auto);
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(stderr, "⚠️  {operation}: {message}");
        let _ = stderr.reset();
    }

    /// Print an informational message (verbose only on the console)
    pub fn info(&self, operation: &str, message: &str) {
        self.log(&format!("{operation}: {message}"));
        if self.verbose {
            println!("ℹ️  {operation}: {message}");
        }
    }

    /// Print detailed progress information (verbose only on the console)
    pub fn progress(&self, message: &str) {
        self.log(message);
        if self.verbose {
            println!("   {message}");
        }
    }

    /// Mark the beginning of a workflow stage
    pub fn begin(&self, stage: &str) {
        self.log(&format!("++ {stage}"));
        if self.verbose {
            println!("   → {stage}");
        }
    }

    /// Mark the end of a workflow stage
    pub fn end(&self, stage: &str) {
        self.log(&format!("-- {stage}"));
    }

    /// Print raw output (like command results)
    pub fn raw(&self, content: &str) {
        self.log(content);
        if self.verbose {
            println!("{content}");
        }
    }

    fn colored_stdout(&self, color: Color, line: &str) {
        let mut stdout = StandardStream::stdout(ColorChoice::Auto);
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)));
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.reset();
    }

    fn log(&self, message: &str) {
        let Some(file) = &self.log_file else {
            return;
        };
        let timestamp = Utc::now().format("%Y/%m/%d %H:%M:%S");
        if let Ok(mut file) = file.lock() {
            for line in message.lines() {
                let _ = writeln!(file, "{LOG_PREFIX} {timestamp} {line}");
            }
        }
    }
}
