use std::io::IsTerminal;
use std::time::{Duration, SystemTime};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rrcmon_frame::{function_name, hex_string, Frame};
use rrcmon_monitor::Snapshot;
use rrcmon_packet::{DecodeError, Record};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A snapshot plus the derived statistics, as printed in JSON output.
#[derive(Serialize)]
pub struct SnapshotOutput<'a> {
    #[serde(flatten)]
    pub snapshot: &'a Snapshot,
    pub success_rate: Option<f64>,
    pub uptime_secs: f64,
}

impl<'a> SnapshotOutput<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            success_rate: snapshot.stats.success_rate(),
            uptime_secs: snapshot.stats.uptime().as_secs_f64(),
        }
    }
}

pub fn snapshot_json(snapshot: &Snapshot) -> String {
    serde_json::to_string(&SnapshotOutput::new(snapshot)).unwrap_or_else(|_| "{}".to_string())
}

pub fn print_snapshot(snapshot: &Snapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", snapshot_json(snapshot)),
        OutputFormat::Table => {
            for table in snapshot_tables(snapshot) {
                println!("{table}");
            }
        }
        OutputFormat::Pretty => print!("{}", snapshot_text(snapshot)),
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    function_code: u8,
    function_name: &'static str,
    length: u8,
    checksum: u8,
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn print_frame(frame: &Frame, decoded: &Result<Record, DecodeError>, format: OutputFormat) {
    let (record, error) = match decoded {
        Ok(record) => (Some(record), None),
        Err(err) => (None, Some(err.to_string())),
    };

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                function_code: frame.function_code(),
                function_name: function_name(frame.function_code()),
                length: frame.length(),
                checksum: frame.checksum(),
                payload: hex_string(frame.payload()),
                record,
                error,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "NAME", "LEN", "DECODED"])
                .add_row(vec![
                    format!("0x{:02X}", frame.function_code()),
                    function_name(frame.function_code()).to_string(),
                    frame.length().to_string(),
                    describe_decoded(record, error.as_deref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "code=0x{:02X} ({}) len={} {}",
                frame.function_code(),
                function_name(frame.function_code()),
                frame.length(),
                describe_decoded(record, error.as_deref())
            );
        }
    }
}

fn describe_decoded(record: Option<&Record>, error: Option<&str>) -> String {
    match (record, error) {
        (Some(record), _) => format!("{}: {}", record.category(), record_summary(record)),
        (None, Some(error)) => format!("not decoded: {error}"),
        (None, None) => String::new(),
    }
}

/// One-line human summary of a record.
pub fn record_summary(record: &Record) -> String {
    match record {
        Record::Battery(b) => format!("{:.2}V", b.voltage_volts),
        Record::Encoders(batch) => batch
            .motors()
            .iter()
            .map(|m| format!("m{}={}@{:.2}rpm", m.motor_id, m.pulse_counter, m.speed_rpm))
            .collect::<Vec<_>>()
            .join(" "),
        Record::Imu(imu) => format!(
            "accel=({:.3}, {:.3}, {:.3}) gyro=({:.3}, {:.3}, {:.3})",
            imu.accel.x, imu.accel.y, imu.accel.z, imu.gyro.x, imu.gyro.y, imu.gyro.z
        ),
        Record::Gamepad(g) => format!(
            "buttons=0x{:04X} hat={} left=({}, {}) right=({}, {})",
            g.buttons, g.hat, g.left_stick.0, g.left_stick.1, g.right_stick.0, g.right_stick.1
        ),
        Record::Key(k) => format!("key {} {}", k.key_id, k.event_name),
        Record::RcReceiver(rc) => format!(
            "ch1-4=[{}, {}, {}, {}] signal_loss={} fail_safe={}",
            rc.channels[0], rc.channels[1], rc.channels[2], rc.channels[3], rc.signal_loss, rc.fail_safe
        ),
        Record::BusServo(s) => format!("raw [{}]", hex_string(&s.raw)),
    }
}

#[derive(Serialize)]
struct PortsOutput<'a> {
    ports: &'a [String],
}

pub fn print_ports(ports: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&PortsOutput { ports }).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT"]);
            for port in ports {
                table.add_row(vec![port.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                println!("{port}");
            }
        }
    }
}

/// Tables for the dashboard view and `--format table`.
pub fn snapshot_tables(snapshot: &Snapshot) -> Vec<Table> {
    let stats = &snapshot.stats;

    let mut status = new_table(vec!["ITEM", "VALUE", "UPDATED"]);
    status
        .add_row(vec![
            "battery".to_string(),
            format!("{:.2}V", snapshot.battery.value.voltage_volts),
            since(snapshot.battery.last_update),
        ])
        .add_row(vec![
            "key".to_string(),
            format!(
                "{} {}",
                snapshot.key.value.key_id,
                display_or_none(&snapshot.key.value.event_name)
            ),
            since(snapshot.key.last_update),
        ])
        .add_row(vec![
            "gamepad".to_string(),
            record_summary(&Record::Gamepad(snapshot.gamepad.value)),
            since(snapshot.gamepad.last_update),
        ])
        .add_row(vec![
            "rc receiver".to_string(),
            record_summary(&Record::RcReceiver(snapshot.rc_receiver.value)),
            since(snapshot.rc_receiver.last_update),
        ])
        .add_row(vec![
            "bus servo".to_string(),
            hex_string(&snapshot.bus_servo.value.raw),
            since(snapshot.bus_servo.last_update),
        ]);

    let mut encoders = new_table(vec!["MOTOR", "COUNTER", "RPS", "RPM"]);
    for motor in snapshot.encoders.value.motors() {
        encoders.add_row(vec![
            format!("motor {}", motor.motor_id),
            group_thousands(i64::from(motor.pulse_counter)),
            format!("{:.4}", motor.speed_rps),
            format!("{:.2}", motor.speed_rpm),
        ]);
    }

    let mut imu = new_table(vec!["AXIS", "ACCEL (m/s²)", "GYRO (rad/s)"]);
    let sample = &snapshot.imu.value;
    for (axis, accel, gyro) in [
        ("x", sample.accel.x, sample.gyro.x),
        ("y", sample.accel.y, sample.gyro.y),
        ("z", sample.accel.z, sample.gyro.z),
    ] {
        imu.add_row(vec![axis.to_string(), format!("{accel:.3}"), format!("{gyro:.3}")]);
    }

    let mut counters = new_table(vec!["STAT", "VALUE"]);
    counters
        .add_row(vec!["uptime".to_string(), format_uptime(stats.uptime())])
        .add_row(vec!["total packets".to_string(), stats.total_packets.to_string()])
        .add_row(vec!["valid packets".to_string(), stats.valid_packets.to_string()])
        .add_row(vec!["crc errors".to_string(), stats.crc_errors.to_string()])
        .add_row(vec!["success rate".to_string(), format_rate(stats.success_rate())]);
    for (code, count) in &stats.per_type_counts {
        counters.add_row(vec![
            format!("0x{code:02X} {}", function_name(*code)),
            count.to_string(),
        ]);
    }

    vec![status, encoders, imu, counters]
}

/// The plain terminal layout: battery, encoder table, IMU, statistics.
pub fn snapshot_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);
    out.push_str(&format!("{rule}\nRRC controller monitor\n{rule}\n"));

    out.push_str(&format!(
        "Battery: {:.2}V\n",
        snapshot.battery.value.voltage_volts
    ));

    out.push_str("\nEncoders:\n");
    out.push_str("Motor   | Counter     | RPS      | RPM\n");
    out.push_str(&format!("{}\n", "-".repeat(50)));
    for motor in snapshot.encoders.value.motors() {
        out.push_str(&format!(
            "motor {} | {:>11} | {:8.4} | {:8.2}\n",
            motor.motor_id,
            group_thousands(i64::from(motor.pulse_counter)),
            motor.speed_rps,
            motor.speed_rpm
        ));
    }

    let imu = &snapshot.imu.value;
    out.push_str("\nIMU:\n");
    out.push_str(&format!(
        "Accel: X={:7.3} Y={:7.3} Z={:7.3} m/s²\n",
        imu.accel.x, imu.accel.y, imu.accel.z
    ));
    out.push_str(&format!(
        "Gyro:  X={:7.3} Y={:7.3} Z={:7.3} rad/s\n",
        imu.gyro.x, imu.gyro.y, imu.gyro.z
    ));

    let stats = &snapshot.stats;
    out.push_str("\nStatistics:\n");
    out.push_str(&format!("Uptime: {}\n", format_uptime(stats.uptime())));
    out.push_str(&format!(
        "Total: {} | Valid: {} | CRC errors: {}\n",
        stats.total_packets, stats.valid_packets, stats.crc_errors
    ));
    if let Some(rate) = stats.success_rate() {
        out.push_str(&format!("Success rate: {rate:.1}%\n"));
    }
    out
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn display_or_none(name: &str) -> &str {
    if name.is_empty() {
        "-"
    } else {
        name
    }
}

fn since(last_update: Option<SystemTime>) -> String {
    match last_update {
        None => "never".to_string(),
        Some(at) => {
            let age = SystemTime::now().duration_since(at).unwrap_or_default();
            format!("{:.1}s ago", age.as_secs_f64())
        }
    }
}

pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{rate:.1}%"),
        None => "-".to_string(),
    }
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use rrcmon_monitor::DataStore;
    use rrcmon_packet::{BatteryStatus, EncoderBatch, EncoderSample};

    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-45_000), "-45,000");
        assert_eq!(group_thousands(i64::from(i32::MIN)), "-2,147,483,648");
    }

    #[test]
    fn uptime_formats_as_clock() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_uptime(Duration::from_secs(3_725)), "01:02:05");
    }

    #[test]
    fn rate_is_dash_before_first_frame() {
        assert_eq!(format_rate(None), "-");
        assert_eq!(format_rate(Some(100.0)), "100.0%");
    }

    #[test]
    fn text_layout_shows_battery_encoders_and_rate() {
        let store = DataStore::new();
        let mut batch = EncoderBatch::default();
        batch.0[2] = EncoderSample::new(2, 1_000_000, 10.0);
        store.commit(0x0B, Some((Record::Encoders(batch), SystemTime::now())));
        store.commit(
            0x00,
            Some((
                Record::Battery(BatteryStatus { voltage_volts: 7.5 }),
                SystemTime::now(),
            )),
        );

        let text = snapshot_text(&store.snapshot());
        assert!(text.contains("Battery: 7.50V"));
        assert!(text.contains("1,000,000"));
        assert!(text.contains("600.00"));
        assert!(text.contains("Total: 2 | Valid: 2 | CRC errors: 0"));
        assert!(text.contains("Success rate: 100.0%"));
    }

    #[test]
    fn text_layout_omits_rate_without_frames() {
        let text = snapshot_text(&DataStore::new().snapshot());
        assert!(!text.contains("Success rate"));
        assert!(text.contains("motor 3"));
    }

    #[test]
    fn json_output_flattens_snapshot_and_derived_stats() {
        let store = DataStore::new();
        store.record_frame(0x06);
        store.record_checksum_error();

        let value: serde_json::Value = serde_json::from_str(&snapshot_json(&store.snapshot())).unwrap();
        assert_eq!(value["stats"]["total_packets"], 1);
        assert_eq!(value["stats"]["crc_errors"], 1);
        assert_eq!(value["success_rate"], 100.0);
        assert!(value["uptime_secs"].as_f64().is_some());
        assert!(value["battery"]["last_update"].is_null());
    }

    #[test]
    fn dashboard_tables_cover_every_category() {
        let store = DataStore::new();
        store.record_frame(0x0C);
        let tables = snapshot_tables(&store.snapshot());
        assert_eq!(tables.len(), 4);

        let rendered: String = tables.iter().map(|t| t.to_string()).collect();
        assert!(rendered.contains("battery"));
        assert!(rendered.contains("motor 0"));
        assert!(rendered.contains("ACCEL"));
        assert!(rendered.contains("0x0C"));
    }

    #[test]
    fn summary_names_key_event() {
        let record = Record::Key(rrcmon_packet::KeyEvent::new(5, 0x20));
        assert_eq!(record_summary(&record), "key 5 single click");
    }
}
