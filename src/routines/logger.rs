use std::time::Instant;

use crate::routines::output::OutputFile;
use crate::routines::settings::Settings;
use eyre::{eyre, Result};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber for an interpolation run
///
/// `log.level` is parsed as an `EnvFilter` directive, so both `debug` and
/// `oicore::algorithms=trace` work. Records are timestamped with the time
/// elapsed since this call.
///
/// The terminal gets a short colored format. `<paths.output>/<log.file>` gets
/// the full record with its target and the id of the rayon worker that
/// emitted it, which is how per-step warnings are traced back to a thread.
///
/// Calling it twice in one process returns an error instead of replacing
/// the first subscriber.
pub fn setup_log(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_new(&settings.log.level)
        .map_err(|e| eyre!("Invalid log level {:?}: {}", settings.log.level, e))?;
    let clock = RunClock::start();
    let logfile = OutputFile::new(&settings.paths.output, &settings.log.file)?;

    let to_file = fmt::layer()
        .with_writer(logfile.file_owned())
        .with_ansi(false)
        .with_thread_ids(true)
        .with_timer(clock.clone());

    let to_terminal = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_timer(clock);

    Registry::default()
        .with(filter)
        .with(to_file)
        .with(to_terminal)
        .try_init()
        .map_err(|e| eyre!("A log subscriber is already installed: {}", e))
}

/// `HHh MMm SSs` since the start of the run
#[derive(Clone)]
struct RunClock(Instant);

impl RunClock {
    fn start() -> Self {
        RunClock(Instant::now())
    }
}

impl FormatTime for RunClock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let secs = self.0.elapsed().as_secs();
        write!(
            w,
            "{:02}h {:02}m {:02}s",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        )
    }
}
