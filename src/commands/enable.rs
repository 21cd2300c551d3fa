//! The enable workflow: install, configure and start Docker, then bring up
//! the configured compose services.
//!
//! Stages run strictly in order and the first failure aborts the run. Nothing
//! is rolled back; every stage is idempotent so the next enable converges.

use super::{Context, OpError, LOG_FILENAME};
use crate::certs::{install_certs, tls_flags};
use crate::compose::{compose_bin_path, install_compose, ComposeUp};
use crate::config::Config;
use crate::driver::DistroDriver;
use crate::settings::{HandlerSettings, LoginSettings, ProtectedSettings, PublicSettings};
use crate::vmext::{provisioned_user, read_settings};

const OPERATION: &str = "enable";

pub fn run(ctx: &Context<'_>, driver: &dyn DistroDriver) -> Result<(), OpError> {
    ctx.output.begin("install docker");
    if which::which("docker").is_ok() {
        ctx.output
            .info(OPERATION, "docker already installed. not re-installing");
    } else {
        install_with_retry(ctx, driver)?;
    }
    ctx.output.end("install docker");

    ctx.output.begin("install docker-compose");
    install_compose(
        &compose_bin_path(driver.compose_dir()),
        ctx.config.install.mirror.compose_url(),
        ctx.output,
    )
    .map_err(OpError::ComposeInstall)?;
    ctx.output.end("install docker-compose");

    configure(ctx, driver)
}

/// Every stage after the engine and compose binaries are in place
fn configure(ctx: &Context<'_>, driver: &dyn DistroDriver) -> Result<(), OpError> {
    ctx.output.begin("add user to docker group");
    let user = provisioned_user(&ctx.ovf_env).map_err(OpError::ProvisionedUser)?;
    if let Err(e) = ctx.runner.output("usermod", &["-aG", "docker", &user]) {
        return Err(OpError::Usermod(e));
    }
    ctx.output.end("add user to docker group");

    let settings: HandlerSettings = read_settings::<PublicSettings, ProtectedSettings>(
        &ctx.handler_env.config_folder,
        ctx.seq,
        &ctx.waagent_dir,
        ctx.runner,
    )?
    .into();

    ctx.output.begin("setup docker certs");
    install_certs(
        &settings.protected.certs,
        &ctx.config.certs.dir,
        ctx.config.certs.overwrite,
        ctx.output,
    )?;
    ctx.output.end("setup docker certs");

    ctx.output.begin("update dockeropts");
    let args = daemon_args(driver, &settings, ctx.config);
    let restart_needed = driver.update_args(&args).map_err(OpError::DockerOpts)?;
    ctx.output
        .info(OPERATION, &format!("restart needed: {restart_needed}"));
    ctx.output.end("update dockeropts");

    ctx.output.begin("restart docker");
    if restart_needed {
        ctx.output.info(OPERATION, "restarting docker-engine");
        driver.restart(ctx.runner)?;
    } else {
        ctx.output
            .info(OPERATION, "no restart needed. issuing only a start command.");
        // The daemon is usually running already when enable is repeated
        if let Err(e) = driver.start(ctx.runner) {
            ctx.output
                .warn(OPERATION, &format!("ignoring start failure: {e}"));
        }
    }
    std::thread::sleep(ctx.config.daemon.settle_delay());
    ctx.output.end("restart docker");

    ctx.output.begin("login docker registry");
    login_registry(&settings.protected.login, ctx)?;
    ctx.output.end("login docker registry");

    ctx.output.begin("compose up");
    let up = ComposeUp {
        compose: &settings.public.compose,
        public_env: &settings.public.compose_environment,
        protected_env: &settings.protected.environment,
    };
    up.run(
        &compose_bin_path(driver.compose_dir()),
        &ctx.config.compose,
        ctx.runner,
        ctx.output,
    )
    .map_err(|e| OpError::ComposeUp {
        source: e,
        log: ctx.handler_env.log_folder.join(LOG_FILENAME),
    })?;
    ctx.output.end("compose up");
    Ok(())
}

/// Run the driver's engine install up to `install.retries` times.
///
/// Package manager locks are contended while other extensions provision the
/// VM at the same time, so a failed attempt is retried after a fixed pause.
fn install_with_retry(ctx: &Context<'_>, driver: &dyn DistroDriver) -> Result<(), OpError> {
    let install = &ctx.config.install;
    let attempts = install.retries.max(1);

    for attempt in 1..=attempts {
        match driver.install(ctx.runner, install.mirror) {
            Ok(()) => return Ok(()),
            Err(e) if attempt == attempts => {
                return Err(OpError::InstallExhausted {
                    attempts,
                    source: e,
                })
            }
            Err(e) => {
                ctx.output.warn(
                    OPERATION,
                    &format!(
                        "install failed. remaining attempts={}. error={e}",
                        attempts - attempt
                    ),
                );
                ctx.output.progress(&format!(
                    "sleeping {}s",
                    install.retry_interval().as_secs()
                ));
                std::thread::sleep(install.retry_interval());
            }
        }
    }
    Ok(())
}

/// Daemon arguments: the driver's base flags, TLS when certificates are
/// configured, the TCP bind when a port is set, then user options verbatim.
pub fn daemon_args(driver: &dyn DistroDriver, settings: &HandlerSettings, config: &Config) -> String {
    let mut args = driver.base_opts();

    if settings.protected.certs.is_complete() {
        args.extend(tls_flags(&config.certs.dir));
    }

    let port = &settings.public.docker.port;
    if !port.is_empty() {
        args.push(format!("-H=0.0.0.0:{port}"));
    }

    args.extend(settings.public.docker.options.iter().cloned());
    args.join(" ")
}

/// `docker login`; the command line carries the password and is never logged
fn login_registry(login: &LoginSettings, ctx: &Context<'_>) -> Result<(), OpError> {
    if !login.is_present() {
        ctx.output.info(OPERATION, "registry login not specified");
        return Ok(());
    }

    let email = format!("--email={}", login.email);
    let username = format!("--username={}", login.username);
    let password = format!("--password={}", login.password);
    let mut args = vec!["login", email.as_str(), username.as_str(), password.as_str()];
    if !login.server.is_empty() {
        args.push(login.server.as_str());
    }

    ctx.runner
        .output("docker", &args)
        .map(|_| ())
        .map_err(|_| OpError::Login)
}
