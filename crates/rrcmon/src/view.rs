//! Live views for `rrcmon monitor`.

use std::io::{self, Write};
use std::time::Duration;

use clap::ValueEnum;
use rrcmon_monitor::{PresentationSink, Snapshot};

use crate::output::{snapshot_json, snapshot_tables, snapshot_text};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    /// Full-screen tables, redrawn in place.
    Dashboard,
    /// Plain terminal report.
    Text,
    /// One JSON document per line.
    Json,
}

impl View {
    pub fn default_interval(self) -> Duration {
        match self {
            View::Dashboard => Duration::from_millis(100),
            View::Text | View::Json => Duration::from_secs(1),
        }
    }

    pub fn into_sink<W: Write + 'static>(self, out: W, clear: bool) -> Box<dyn PresentationSink> {
        match self {
            View::Dashboard => Box::new(DashboardSink::new(out).clear_screen(clear)),
            View::Text => Box::new(TextSink::new(out).clear_screen(clear)),
            View::Json => Box::new(JsonSink::new(out)),
        }
    }
}

pub struct DashboardSink<W> {
    out: W,
    clear: bool,
}

impl<W: Write> DashboardSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, clear: true }
    }

    pub fn clear_screen(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PresentationSink for DashboardSink<W> {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        if self.clear {
            self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        writeln!(self.out, "RRC controller monitor (Ctrl-C to stop)")?;
        for table in snapshot_tables(snapshot) {
            writeln!(self.out, "{table}")?;
        }
        self.out.flush()
    }
}

pub struct TextSink<W> {
    out: W,
    clear: bool,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, clear: true }
    }

    pub fn clear_screen(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PresentationSink for TextSink<W> {
    fn name(&self) -> &'static str {
        "text"
    }

    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        if self.clear {
            self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        self.out.write_all(snapshot_text(snapshot).as_bytes())?;
        self.out.flush()
    }
}

pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PresentationSink for JsonSink<W> {
    fn name(&self) -> &'static str {
        "json"
    }

    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        writeln!(self.out, "{}", snapshot_json(snapshot))?;
        self.out.flush()
    }
}
