//! Build a small capture in memory, replay it through the ingest loop and
//! print the resulting snapshot.
//!
//! Run with:
//!   cargo run --example replay-capture

use std::io::Cursor;
use std::time::Duration;

use rrcmon::frame::FrameWriter;
use rrcmon::monitor::{DataStore, IngestLoop};
use rrcmon::transport::StreamSource;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
    writer.send(0x00, &[0x04, 0x4C, 0x1D])?;
    writer.write_raw(&[0x13, 0x37])?;
    writer.send(0x06, &[0x01, 0x20])?;
    writer.send(0x07, &[0u8; 24])?;
    let capture = writer.into_inner().into_inner();

    let store = DataStore::new();
    let mut ingest = IngestLoop::new(store.clone());
    ingest.start(|| Ok(StreamSource::with_label(Cursor::new(capture), "memory")))?;
    ingest.wait(Duration::from_secs(5));
    ingest.stop()?;

    let snapshot = store.snapshot();
    println!("battery: {:.2} V", snapshot.battery.value.voltage_volts);
    println!(
        "key: {} ({})",
        snapshot.key.value.key_id, snapshot.key.value.event_name
    );
    println!("imu: {:?}", snapshot.imu.value);
    println!(
        "frames: {} (crc errors: {})",
        snapshot.stats.total_packets, snapshot.stats.crc_errors
    );
    Ok(())
}
