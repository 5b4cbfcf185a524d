// src/main.rs

use std::env;
use std::path::{Path, PathBuf};

use log::{error, info};

use camshotd::config;
use camshotd::daemon::{self, RunOutcome, Services};
use camshotd::daylight::DaylightWindow;
use camshotd::lock::InstanceLock;
use camshotd::logging;
use camshotd::power::{self, Power, SuspendMode};
use camshotd::shell::SystemRunner;

const DEFAULT_CONFIG: &str = "camshotcfg.json";
const SHUTDOWN_GRACE_MINUTES: u64 = 1;

struct Cli {
    config_path: PathBuf,
    oneshot: bool,
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut config_path: Option<PathBuf> = None;
    let mut oneshot = false;

    for arg in args {
        match arg.as_str() {
            "--oneshot" => oneshot = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option `{}`", other));
            }
            other if config_path.is_none() => config_path = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument `{}`", other)),
        }
    }

    Ok(Cli {
        config_path: config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
        oneshot,
    })
}

fn usage(program: &str) {
    eprintln!("usage: {} [--oneshot] [config-file]", program);
}

fn program_stem(args: &[String]) -> String {
    args.first()
        .map(|arg0| Path::new(arg0))
        .and_then(|p| p.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "camshotd".to_string())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = program_stem(&args);

    let cli = match parse_args(&args[1..]) {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("{}: {}", program, msg);
            usage(&program);
            std::process::exit(1);
        }
    };

    std::process::exit(run(&program, &cli));
}

fn run(program: &str, cli: &Cli) -> i32 {
    // The lock and log live in the working directory, named after the
    // binary, so parallel deployments under different names stay apart.
    let _lock = match InstanceLock::acquire(PathBuf::from(format!("{}.pid", program))) {
        Ok(lock) => lock,
        Err(e) => {
            eprintln!("{}: {}", program, e);
            return 1;
        }
    };

    if let Err(e) = logging::init(Path::new(&format!("{}-log.txt", program))) {
        eprintln!("{}: {:#}", program, e);
        return 2;
    }

    let config = match config::load(&cli.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("[camshotd] configuration error: {}", e);
            return 2;
        }
    };

    let window = match DaylightWindow::from_config(&config.schedule) {
        Ok(window) => window,
        Err(e) => {
            error!("[camshotd] configuration error: {}", e);
            return 2;
        }
    };

    if config.schedule.suspend_to_memory && !power::has_shutdown_privileges() {
        eprintln!(
            "{}: root privileges are required to suspend and shut down this host",
            program
        );
        return 1;
    }

    info!(
        "[camshotd] loaded {} ({} cameras, period {}s, suspend {})",
        cli.config_path.display(),
        config.cameras.len(),
        config.schedule.period_seconds,
        if config.schedule.suspend_to_memory {
            "to-RAM"
        } else {
            "in-process"
        }
    );

    let mut services = Services::new(&config);
    let result = if cli.oneshot {
        daemon::run_once(&mut services)
    } else {
        daemon::run_loop(&window, &mut services)
    };

    match result {
        Ok(RunOutcome::StoppedByExternalWake) => {
            info!("[camshotd] stopped by the user");
            0
        }
        Ok(RunOutcome::OneshotComplete) => 0,
        Err(e) => {
            error!("[camshotd] unrecoverable error: {}", e);
            if config.schedule.suspend_to_memory && !cli.oneshot {
                error!(
                    "[camshotd] system will shut down in {} minute(s)",
                    SHUTDOWN_GRACE_MINUTES
                );
                Power::new(SystemRunner, SuspendMode::Mem)
                    .schedule_shutdown(SHUTDOWN_GRACE_MINUTES);
            }
            2
        }
    }
}
