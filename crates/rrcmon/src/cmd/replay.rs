use rrcmon_monitor::{DataStore, IngestLoop};
use rrcmon_transport::StreamSource;
use tracing::info;

use crate::cmd::{parse_duration, ReplayArgs};
use crate::exit::{monitor_error, CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT};
use crate::output::{print_snapshot, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration("timeout", &args.timeout)?;

    let store = DataStore::new();
    let mut ingest = IngestLoop::new(store.clone());
    let path = args.file.clone();
    ingest
        .start(move || StreamSource::open_file(&path))
        .map_err(|err| monitor_error("replay failed", err))?;

    if !ingest.wait(timeout) {
        let _ = ingest.stop();
        return Err(CliError::new(
            TIMEOUT,
            format!("replay did not finish within {timeout:?}"),
        ));
    }
    ingest
        .stop()
        .map_err(|err| monitor_error("replay failed", err))?;

    let counters = ingest.counters();
    info!(
        bytes = counters.bytes_read,
        frames = counters.frames,
        checksum_errors = counters.checksum_errors,
        "replay finished"
    );

    let snapshot = store.snapshot();
    print_snapshot(&snapshot, format);

    if snapshot.stats.total_packets == 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no valid frames in {}", args.file.display()),
        ));
    }
    Ok(SUCCESS)
}
