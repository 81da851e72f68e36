use std::fs::File;
use std::io::BufReader;

use rrcmon_frame::{FrameError, FrameReader};
use rrcmon_packet::PacketDispatcher;
use serde::Serialize;

use crate::cmd::DumpArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

#[derive(Serialize)]
struct DumpSummary {
    frames: u64,
    decoded: u64,
    checksum_errors: u64,
}

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.file)
        .map_err(|err| io_error(&format!("dump failed: {}", args.file.display()), err))?;
    let mut reader = FrameReader::new(BufReader::new(file));
    let dispatcher = PacketDispatcher::new();

    let mut summary = DumpSummary {
        frames: 0,
        decoded: 0,
        checksum_errors: 0,
    };

    loop {
        if let Some(count) = args.count {
            if summary.frames as usize >= count {
                break;
            }
        }

        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("dump failed", err)),
        };

        let decoded = dispatcher.decode(&frame);
        summary.frames += 1;
        if decoded.is_ok() {
            summary.decoded += 1;
        }
        print_frame(&frame, &decoded, format);
    }
    summary.checksum_errors = reader.checksum_errors();

    match format {
        OutputFormat::Json => {
            eprintln!(
                "{}",
                serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            eprintln!(
                "{} frames ({} decoded), {} checksum errors",
                summary.frames, summary.decoded, summary.checksum_errors
            );
        }
    }

    if summary.frames == 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no valid frames in {}", args.file.display()),
        ));
    }
    Ok(SUCCESS)
}
