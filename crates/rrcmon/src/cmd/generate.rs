use std::fs::File;
use std::io::{BufWriter, Write};

use rrcmon_frame::{
    FrameWriter, BUS_SERVO, ENCODER, GAMEPAD, IMU, KEY_EVENT, OLED, SYSTEM_INFO,
};

use crate::cmd::GenerateArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};

/// Filler written between frames with `--noise`. No byte is 0xAA.
const NOISE: [u8; 5] = [0x00, 0x13, 0x55, 0x37, 0xA9];

pub fn run(args: GenerateArgs) -> CliResult<i32> {
    if args.repeat == 0 {
        return Err(CliError::new(USAGE, "repeat must be greater than zero"));
    }

    let file = File::create(&args.file)
        .map_err(|err| io_error(&format!("generate failed: {}", args.file.display()), err))?;
    let mut writer = FrameWriter::new(BufWriter::new(file));

    let samples = sample_frames();
    let mut frames = 0u64;
    for _ in 0..args.repeat {
        for (function_code, payload) in &samples {
            if args.noise {
                writer
                    .write_raw(&NOISE)
                    .map_err(|err| frame_error("generate failed", err))?;
            }
            writer
                .send(*function_code, payload)
                .map_err(|err| frame_error("generate failed", err))?;
            frames += 1;
        }
    }

    if args.corrupt {
        writer
            .write_raw(&corrupt_frame()?)
            .map_err(|err| frame_error("generate failed", err))?;
    }

    writer
        .flush()
        .map_err(|err| frame_error("generate failed", err))?;
    writer
        .into_inner()
        .flush()
        .map_err(|err| io_error("generate failed", err))?;

    println!(
        "wrote {frames} frames{} to {}",
        if args.corrupt { " and 1 corrupt frame" } else { "" },
        args.file.display()
    );
    Ok(SUCCESS)
}

/// One frame per category, with fixed values.
pub fn sample_frames() -> Vec<(u8, Vec<u8>)> {
    let mut battery = vec![0x04];
    battery.extend_from_slice(&7_500u16.to_le_bytes());

    let mut imu = Vec::with_capacity(24);
    for value in [0.12f32, -0.05, 9.81, 0.01, 0.02, -0.03] {
        imu.extend_from_slice(&value.to_le_bytes());
    }

    let mut gamepad = Vec::with_capacity(7);
    gamepad.extend_from_slice(&0x0101u16.to_le_bytes());
    gamepad.push(2);
    gamepad.extend_from_slice(&[10i8 as u8, (-10i8) as u8, (-127i8) as u8, 127]);

    let mut encoders = vec![0x10];
    for (id, counter, rps) in [
        (0u8, -1_500i32, -2.5f32),
        (1, 0, 0.0),
        (2, 1_000, 10.0),
        (3, 1_234_567, 0.25),
    ] {
        encoders.push(id);
        encoders.extend_from_slice(&counter.to_le_bytes());
        encoders.extend_from_slice(&rps.to_le_bytes());
    }

    let mut rc = Vec::with_capacity(36);
    for channel in 0..16i16 {
        rc.extend_from_slice(&(channel * 100 - 800).to_le_bytes());
    }
    rc.extend_from_slice(&[0, 1, 0, 0]);

    vec![
        (SYSTEM_INFO, battery),
        (KEY_EVENT, vec![0x01, 0x20]),
        (IMU, imu),
        (BUS_SERVO, vec![1, 2, 3, 4, 5, 6, 7]),
        (GAMEPAD, gamepad),
        (ENCODER, encoders),
        (ENCODER, rc),
        (OLED, b"rrcmon".to_vec()),
    ]
}

fn corrupt_frame() -> CliResult<Vec<u8>> {
    let mut scratch = FrameWriter::new(Vec::new());
    scratch
        .send(KEY_EVENT, &[0x02, 0x40])
        .map_err(|err| frame_error("generate failed", err))?;
    let mut bytes = scratch.into_inner();
    if let Some(last) = bytes.last_mut() {
        *last ^= 0xFF;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rrcmon_frame::FrameParser;
    use rrcmon_packet::{decode, DecodeError, Record};

    use super::*;

    #[test]
    fn every_sample_decodes_except_oled() {
        let mut categories = Vec::new();
        for (function_code, payload) in sample_frames() {
            let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
            writer.send(function_code, &payload).unwrap();
            let wire = writer.into_inner().into_inner();

            let frames = FrameParser::new().consume_slice(&wire);
            assert_eq!(frames.len(), 1);
            match decode(&frames[0]) {
                Ok(record) => categories.push(record.category()),
                Err(err) => assert!(matches!(err, DecodeError::NotDecoded(OLED))),
            }
        }
        assert_eq!(
            categories,
            vec![
                "battery",
                "key",
                "imu",
                "bus_servo",
                "gamepad",
                "encoders",
                "rc_receiver"
            ]
        );
    }

    #[test]
    fn encoder_sample_matches_reference_motor() {
        let (_, payload) = sample_frames()
            .into_iter()
            .find(|(code, payload)| *code == ENCODER && payload.len() == 37)
            .unwrap();
        let frame = rrcmon_frame::Frame::new(ENCODER, payload).unwrap();
        let Ok(Record::Encoders(batch)) = decode(&frame) else {
            panic!("encoder sample should decode");
        };
        assert_eq!(batch.motors()[2].pulse_counter, 1_000);
        assert_eq!(batch.motors()[2].speed_rpm, 600.0);
    }

    #[test]
    fn noise_never_contains_header_byte() {
        assert!(!NOISE.contains(&0xAA));
    }

    #[test]
    fn corrupt_frame_fails_checksum() {
        let bytes = corrupt_frame().unwrap();
        let mut parser = FrameParser::new();
        let results: Vec<_> = bytes.iter().map(|&b| parser.feed(b)).collect();
        assert!(results.last().unwrap().is_err());
        assert!(results[..results.len() - 1]
            .iter()
            .all(|r| matches!(r, Ok(None))));
    }
}
