mod certs;
mod commands;
mod compose;
mod config;
mod distro;
mod dockeropts;
mod driver;
mod exec;
mod output;
mod seqnum;
mod settings;
mod vmext;

use clap::{Arg, Command};
use commands::{Context, Operation, LOG_FILENAME};
use config::Config;
use exec::SystemRunner;
use output::OutputManager;
use seqnum::{Claim, SequenceGuard};
use std::path::PathBuf;
use vmext::{HandlerEnvironment, StatusType};

fn main() {
    let app = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("operation")
                .help("Handler operation requested by the guest agent")
                .required(true)
                .value_name("OPERATION")
                .value_parser(Operation::ALL.map(Operation::name)),
        );

    let matches = app.get_matches();

    let verbose = matches.get_flag("verbose");
    let console = OutputManager::new(verbose);

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let config = match Config::load_with_override(config_path) {
        Ok(config) => config,
        Err(e) => {
            console.error(
                "Configuration Error",
                &format!("Failed to load configuration: {e}"),
            );
            std::process::exit(1);
        }
    };

    let Some(op) = matches
        .get_one::<String>("operation")
        .and_then(|name| Operation::from_name(name))
    else {
        console.error("Usage Error", "No valid operation supplied");
        std::process::exit(1);
    };

    std::process::exit(run(op, &config, verbose, &console));
}

/// One handler invocation; returns the process exit code
fn run(op: Operation, config: &Config, verbose: bool, console: &OutputManager) -> i32 {
    let handler_env = match config
        .handler_env_path()
        .map_err(|e| e.to_string())
        .and_then(|path| HandlerEnvironment::load(&path).map_err(|e| e.to_string()))
    {
        Ok(env) => env,
        Err(e) => {
            console.error("Handler Environment", &format!("Cannot load handler environment: {e}"));
            return 1;
        }
    };

    let log_path = handler_env.log_folder.join(LOG_FILENAME);
    let output = match OutputManager::new(verbose).with_log_file(&log_path) {
        Ok(output) => output,
        Err(e) => {
            console.error(
                "Handler Environment",
                &format!("Cannot open log file '{}': {e}", log_path.display()),
            );
            return 1;
        }
    };

    output.progress(&"-".repeat(40));
    output.progress(&format!(
        "Extension handler launch args: {:?}",
        std::env::args().collect::<Vec<_>>().join(" ")
    ));

    let seq = match vmext::find_seq_num(&handler_env.config_folder) {
        Ok(seq) => seq,
        Err(e) => {
            output.error(op.name(), &format!("cannot find seqnum: {e}"));
            return 1;
        }
    };
    output.progress(&format!("seqnum: {seq}"));

    let guard = SequenceGuard::new(&config.guard.seqnum_file);
    match guard.claim(seq) {
        Ok(Claim::Proceed) => {}
        Ok(Claim::Superseded { active }) => {
            output.warn(
                op.name(),
                &format!(
                    "Another instance of the extension handler with seqnum {active} (>= {seq}) is currently active according to {}",
                    guard.path().display()
                ),
            );
            output.progress("Exiting gracefully with exitcode 0, not reporting to .status file.");
            return 0;
        }
        Err(e) => {
            output.error(op.name(), &e.to_string());
            return 1;
        }
    }

    let reporter = StatusReporter {
        output: &output,
        handler_env: &handler_env,
        seq,
        op,
    };
    reporter.report(StatusType::Transitioning, None);

    let runner = SystemRunner::new(&output);
    let ctx = Context {
        config,
        output: &output,
        runner: &runner,
        handler_env: &handler_env,
        seq,
        waagent_dir: PathBuf::from(vmext::WAAGENT_DIR),
        ovf_env: PathBuf::from(vmext::OVF_ENV_PATH),
    };

    let code = match execute(op, &ctx) {
        Ok(()) => {
            output.success(op.name(), &format!("{} succeeded", op.description()));
            reporter.report(StatusType::Success, None);
            0
        }
        Err(message) => {
            output.error(op.name(), &message);
            reporter.report(StatusType::Error, Some(&message));
            1
        }
    };

    match guard.release() {
        Ok(()) => output.progress("Cleaned up .seqnum file."),
        Err(e) => output.warn(op.name(), &format!("Error deleting seqnum file: {e}")),
    }
    if code != 0 {
        output.progress(&format!("Exiting with code {code}."));
    }
    code
}

/// Detect the host, pick its driver and run `op`
fn execute(op: Operation, ctx: &Context<'_>) -> Result<(), String> {
    let info = distro::detect_from(&ctx.config.distro.release_files())
        .map_err(|e| format!("Cannot get distro info: {e}"))?;
    ctx.output.progress(&format!("distro info: {info}"));

    let driver = driver::select(&info).map_err(|e| e.to_string())?;
    ctx.output
        .progress(&format!("using distro driver: {}", driver.name()));
    ctx.output.progress(&format!(
        "env['PATH'] = {}",
        std::env::var("PATH").unwrap_or_default()
    ));

    ctx.output.progress(&format!("+ starting: '{}'", op.name()));
    op.run(ctx, driver.as_ref()).map_err(|e| e.to_string())?;
    ctx.output.progress(&format!("- completed: '{}'", op.name()));
    Ok(())
}

/// Writes the `.status` file for operations that report one
struct StatusReporter<'a> {
    output: &'a OutputManager,
    handler_env: &'a HandlerEnvironment,
    seq: u64,
    op: Operation,
}

impl StatusReporter<'_> {
    fn report(&self, status: StatusType, error: Option<&str>) {
        let name = self.op.description();
        if !self.op.reports_status() {
            self.output.progress(&format!(
                "Status '{status}' not reported for operation '{name}' (by design)"
            ));
            return;
        }

        let message = match status {
            StatusType::Transitioning => name.to_string(),
            StatusType::Success => format!("{name} succeeded"),
            StatusType::Error => format!("{name} failed: {}", error.unwrap_or(name)),
        };
        if let Err(e) = vmext::save_status(
            &self.handler_env.status_folder,
            self.seq,
            status,
            name,
            &message,
        ) {
            self.output
                .warn(name, &format!("Error reporting extension status: {e}"));
        }
    }
}
