use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rrcmon_monitor::{DataStore, IngestLoop, IngestState, Presenter};
use rrcmon_transport::{SerialConfig, SerialSource};
use tracing::info;

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{io_error, monitor_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};

pub fn run(args: MonitorArgs) -> CliResult<i32> {
    let interval = match &args.interval {
        Some(value) => parse_duration("interval", value)?,
        None => args.view.default_interval(),
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let store = DataStore::new();
    let mut ingest = IngestLoop::new(store.clone());
    let config = SerialConfig::new(&args.port).with_baud_rate(args.baud);
    ingest
        .start(|| SerialSource::open(config))
        .map_err(|err| monitor_error("monitor failed", err))?;
    info!(port = %args.port, baud = args.baud, view = ?args.view, "monitoring");

    let stdout = std::io::stdout();
    let clear = stdout.is_terminal();
    let mut sink = args.view.into_sink(stdout, clear);
    let presenter = Presenter::new(store, interval);
    let rendered = presenter.run(&mut sink, || {
        running.load(Ordering::SeqCst) && ingest.state() == IngestState::Running
    });

    let link_lost = ingest.state() != IngestState::Running;
    let stopped = ingest.stop();

    rendered.map_err(|err| io_error("render failed", err))?;
    stopped.map_err(|err| monitor_error("stop failed", err))?;

    if link_lost && running.load(Ordering::SeqCst) {
        return Err(CliError::new(FAILURE, format!("link to {} lost", args.port)));
    }
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
