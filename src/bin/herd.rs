use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::Parser;

use herd::journal::Event;
use herd::worker::{self, Role, ROLE2_DWELL};
use herd::{CancelToken, Error, Journal, Layout, LeaderLock, Result, Scheduler, SharedRegion, Spawner};

#[derive(Parser)]
#[command(name = "herd", version, about = "Cross-process shared-counter coordination")]
struct Cli {
    /// Run as worker role 1 (add 10 to the counter and exit).
    #[arg(long = "copy1", conflicts_with = "copy2")]
    copy1: bool,

    /// Run as worker role 2 (double, dwell 2s, halve, exit).
    #[arg(long = "copy2")]
    copy2: bool,

    /// Directory holding the shared region, leader lock and journal.
    #[arg(long = "root", default_value = "/tmp/herd")]
    root: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}

fn run(cli: Cli) -> Result<()> {
    let layout = Layout::new(cli.root);
    layout.ensure_root()?;

    let region = SharedRegion::attach_or_create(&layout.region_path())?;
    let journal = Journal::open(&layout.journal_path())?;

    if cli.copy1 {
        return worker::run(Role::Copy1, &region, &journal, std::time::Duration::ZERO);
    }
    if cli.copy2 {
        return worker::run(Role::Copy2, &region, &journal, ROLE2_DWELL);
    }

    run_main(&layout, region, journal)
}

fn run_main(layout: &Layout, region: SharedRegion, journal: Journal) -> Result<()> {
    journal.record(&Event::MainStart)?;

    // Decided once; losing the race just means follower duties.
    let mut leader = LeaderLock::try_acquire(&layout.leader_lock_path())?;
    if leader.is_leader() {
        log::info!("acquired leadership");
    } else {
        log::info!("running as follower");
    }

    let cancel = CancelToken::new();
    let signal_token = cancel.clone();
    ctrlc::set_handler(move || signal_token.cancel())
        .map_err(|_| Error::Unsupported("signal handler already installed"))?;

    let region = Arc::new(region);
    let control_region = Arc::clone(&region);
    let control_cancel = cancel.clone();
    let control = thread::spawn(move || {
        let stdin = io::stdin().lock();
        let stdout = io::stdout();
        if let Err(err) = herd::control::run(stdin, stdout, &control_region, &control_cancel) {
            log::warn!("control channel stopped: {err}");
        }
        // End of input with no quit still means shutdown.
        control_cancel.cancel();
    });

    let spawner = Spawner::current_exe()?;
    let mut sched = Scheduler::new(
        &region,
        &journal,
        spawner,
        layout.root().to_path_buf(),
        leader.is_leader(),
        Instant::now(),
    );
    sched.run(&cancel)?;

    leader.release();
    journal.record(&Event::MainExit)?;

    // The control thread may still be parked in a blocking stdin read; join
    // only if it already finished.
    if control.is_finished() {
        let _ = control.join();
    }
    Ok(())
}
