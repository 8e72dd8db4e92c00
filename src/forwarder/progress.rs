use std::fmt;
use std::io::Write;

use crate::domain::log_row::LogRowId;
use crate::webhook::Delivery;

/// A human-readable step of a run, shown only on the manual path.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    InvalidJson(LogRowId),
    ZeroErrorCode(LogRowId),
    Queued(LogRowId),
    Delivery(Delivery),
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::InvalidJson(id) => write!(f, "ID {id}: Invalid JSON"),
            Progress::ZeroErrorCode(id) => write!(f, "ID {id}: ErrorCode 0, skipping"),
            Progress::Queued(id) => write!(f, "Queued ID {id}"),
            Progress::Delivery(Delivery::Skipped) => write!(f, "Nothing to send"),
            Progress::Delivery(Delivery::Delivered(n)) => {
                write!(f, "Sent {n} entries to webhook")
            }
            Progress::Delivery(Delivery::Rejected(code)) => {
                write!(f, "Webhook response code {code}")
            }
            Progress::Delivery(Delivery::Failed(msg)) => write!(f, "Webhook error - {msg}"),
        }
    }
}

pub trait ProgressSink {
    fn report(&mut self, event: Progress);
}

/// Used by scheduled runs, which have no observer.
pub struct Silent;

impl ProgressSink for Silent {
    fn report(&mut self, _event: Progress) {}
}

/// Writes one line per event. Write errors are ignored: a client that hung
/// up must not abort the run.
pub struct WriteSink<W: Write> {
    out: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ProgressSink for WriteSink<W> {
    fn report(&mut self, event: Progress) {
        let _ = writeln!(self.out, "{event}");
        let _ = self.out.flush();
    }
}

impl ProgressSink for Vec<Progress> {
    fn report(&mut self, event: Progress) {
        self.push(event);
    }
}
