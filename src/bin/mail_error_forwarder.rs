use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use mail_error_forwarder::auth::{ADMIN_TOKEN_ENV, resolve_admin_token, token_store};
use mail_error_forwarder::clock::{Clock, SystemClock};
use mail_error_forwarder::config::{Config, load_config, load_config_from};
use mail_error_forwarder::daemon::schedule::DailySchedule;
use mail_error_forwarder::daemon::state_file::ScheduleFile;
use mail_error_forwarder::daemon::{Scheduler, run_daemon};
use mail_error_forwarder::forwarder::{Forwarder, WINDOW_HOURS};
use mail_error_forwarder::forwarder::progress::{Silent, WriteSink};
use mail_error_forwarder::store::sqlite::SqliteLogStore;
use mail_error_forwarder::trigger::TriggerServer;
use mail_error_forwarder::webhook::WebhookClient;

#[derive(Parser)]
#[command(name = "mail_error_forwarder")]
#[command(about = "Forward failed mail deliveries to a webhook once a day", long_about = None)]
struct Cli {
    /// Use this config file instead of the one in the user config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the error check once, now
    Run {
        /// Print one line per scanned row
        #[arg(long, short)]
        verbose: bool,
    },

    /// Run the check every day at the configured time
    Daemon,

    /// Daemon plus the HTTP endpoint for manual runs
    Serve,

    /// Store the manual-trigger admin token in keyring
    SetAdminToken,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::SetAdminToken => {
            eprintln!("Paste admin token (end with Ctrl-D):");
            let mut token = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut token)?;
            let token = token.trim();
            if token.is_empty() {
                return Err(anyhow!("Empty token, nothing saved"));
            }
            token_store::save_admin_token(token)?;
            println!("Saved admin token");
            Ok(())
        }

        Command::Run { verbose } => {
            let cfg = read_config(cli.config)?;
            let forwarder = build_forwarder(&cfg)?;

            let summary = if verbose {
                println!("Running error check for last {WINDOW_HOURS} hours...\n");
                forwarder.run(&mut WriteSink::new(std::io::stdout()))?
            } else {
                forwarder.run(&mut Silent)?
            };
            if verbose {
                println!();
            }
            println!("Check complete. Total sent to webhook: {}", summary.sent_count);
            Ok(())
        }

        Command::Daemon => {
            let cfg = read_config(cli.config)?;
            let forwarder = build_forwarder(&cfg)?;
            let running = stop_on_ctrlc()?;
            let scheduler = build_scheduler(&cfg)?;

            run_daemon(&forwarder, scheduler, &SystemClock, &running)
        }

        Command::Serve => {
            let cfg = read_config(cli.config)?;
            let admin_token = resolve_admin_token().ok_or_else(|| {
                anyhow!("No admin token: run set-admin-token or set {ADMIN_TOKEN_ENV}")
            })?;
            let forwarder = Arc::new(build_forwarder(&cfg)?);
            let running = stop_on_ctrlc()?;
            let scheduler = build_scheduler(&cfg)?;

            let trigger =
                TriggerServer::bind(cfg.trigger_addr(), Arc::clone(&forwarder), admin_token)?;
            let r2 = Arc::clone(&running);
            let trigger_thread = thread::spawn(move || trigger.serve(&r2));

            let result = run_daemon(&forwarder, scheduler, &SystemClock, &running);
            running.store(false, Ordering::SeqCst);
            if trigger_thread.join().is_err() {
                return Err(anyhow!("trigger server thread panicked"));
            }
            result
        }
    }
}

fn read_config(path: Option<PathBuf>) -> Result<Config> {
    let cfg = match path {
        Some(p) => load_config_from(&p),
        None => load_config(),
    };
    cfg.map_err(|e| anyhow!("Configuration error: {e}"))
}

fn build_forwarder(cfg: &Config) -> Result<Forwarder> {
    let store = SqliteLogStore::open(&cfg.db_path()?, cfg.log_table())?;
    let webhook = WebhookClient::new(cfg.webhook_url()?)?;
    Ok(Forwarder::new(
        Box::new(store),
        Box::new(webhook),
        Box::new(SystemClock),
        cfg.site_url()?,
    ))
}

fn build_scheduler(cfg: &Config) -> Result<Scheduler> {
    let schedule = DailySchedule::new(cfg.run_at()?);
    let state = ScheduleFile::new(cfg.schedule_state_path()?);
    Scheduler::init(schedule, state, SystemClock.now())
}

fn stop_on_ctrlc() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}
