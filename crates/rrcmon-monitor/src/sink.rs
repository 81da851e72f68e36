use std::io;
use std::thread;
use std::time::{Duration, Instant};

use crate::store::{DataStore, Snapshot};

/// Anything that can display a snapshot.
///
/// The store and the ingest loop never depend on which sink is in use.
pub trait PresentationSink {
    fn name(&self) -> &'static str;

    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

impl<S: PresentationSink + ?Sized> PresentationSink for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        (**self).render(snapshot)
    }
}

const POLL_STEP: Duration = Duration::from_millis(20);

/// Polls the store on a fixed interval and hands each snapshot to a sink.
#[derive(Debug, Clone)]
pub struct Presenter {
    store: DataStore,
    interval: Duration,
}

impl Presenter {
    pub fn new(store: DataStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Render until `keep_going` returns false. Returns the number of frames
    /// rendered.
    pub fn run(
        &self,
        sink: &mut dyn PresentationSink,
        mut keep_going: impl FnMut() -> bool,
    ) -> io::Result<u64> {
        let mut rendered = 0u64;
        while keep_going() {
            let next = Instant::now() + self.interval;
            sink.render(&self.store.snapshot())?;
            rendered += 1;

            while keep_going() {
                let now = Instant::now();
                if now >= next {
                    break;
                }
                thread::sleep(POLL_STEP.min(next - now));
            }
        }
        Ok(rendered)
    }

    /// Render the current snapshot once.
    pub fn render_once(&self, sink: &mut dyn PresentationSink) -> io::Result<()> {
        sink.render(&self.store.snapshot())
    }
}
