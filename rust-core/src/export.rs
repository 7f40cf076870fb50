//! CSV export of session and route-event logs.
//!
//! Two log files come out of a measurement session:
//! - **Session log**: one row of engine state per 100 ms of sample time
//! - **Event log**: one row per route event (start, checkpoint, stop)
//!
//! Both are plain CSV written through the `csv` crate, with fixed-precision
//! numbers so files diff cleanly between runs.

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::types::{PdrSnapshot, Point2};

/// Minimum sample-time spacing between session rows.
pub const SESSION_ROW_INTERVAL_NS: u64 = 100_000_000;

const SESSION_HEADER: [&str; 14] = [
    "Time(ns)",
    "ax",
    "ay",
    "az",
    "gx",
    "gy",
    "gz",
    "StepCount",
    "StepLength",
    "X",
    "Y",
    "Heading",
    "TotalDistance",
    "ap",
];

const EVENT_HEADER: [&str; 9] = [
    "Time(ns)",
    "TrialID",
    "Event",
    "RoutePoint",
    "TargetX",
    "TargetY",
    "EstimatedX",
    "EstimatedY",
    "Distance",
];

/// Trial number, rendered as `TrialNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialId(pub u32);

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trial{:02}", self.0)
    }
}

/// Kind of route event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteEventKind {
    Start,
    /// Beacon advertisement at a checkpoint.
    Advertise,
    Stop,
    NextPoint,
}

impl fmt::Display for RouteEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteEventKind::Start => "START",
            RouteEventKind::Advertise => "ADVERTISE",
            RouteEventKind::Stop => "STOP",
            RouteEventKind::NextPoint => "NEXT_POINT",
        };
        f.write_str(name)
    }
}

#[inline]
fn fmt3(v: f64) -> String {
    format!("{:.3}", v)
}

// ============================================================================
// SESSION LOG
// ============================================================================

/// Throttled writer of [`PdrSnapshot`] rows.
pub struct SessionLogWriter<W: Write> {
    writer: csv::Writer<W>,
    trial: Option<TrialId>,
    last_row_ns: Option<u64>,
    rows: u64,
}

impl SessionLogWriter<File> {
    /// Create (truncate) a session log at `path`.
    pub fn create<P: AsRef<Path>>(path: P, trial: Option<TrialId>) -> Result<Self> {
        Self::new(File::create(path)?, trial)
    }
}

impl<W: Write> SessionLogWriter<W> {
    /// Wrap `writer` and emit the header. A trial id adds a `TrialID` column.
    pub fn new(writer: W, trial: Option<TrialId>) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        let mut header: Vec<&str> = SESSION_HEADER.to_vec();
        if trial.is_some() {
            header.push("TrialID");
        }
        writer.write_record(header)?;

        Ok(Self {
            writer,
            trial,
            last_row_ns: None,
            rows: 0,
        })
    }

    /// Write a row unless one was written less than 100 ms (sample time) ago.
    ///
    /// Returns whether a row was written. A snapshot older than the last row
    /// (new session on the same writer) always writes.
    pub fn record(&mut self, snapshot: &PdrSnapshot) -> Result<bool> {
        if let Some(last) = self.last_row_ns {
            let t = snapshot.elapsed_ns;
            if t >= last && t - last < SESSION_ROW_INTERVAL_NS {
                return Ok(false);
            }
        }

        let mut row = vec![snapshot.elapsed_ns.to_string()];
        row.extend(snapshot.acceleration.iter().map(|&v| fmt3(v)));
        row.extend(snapshot.angular_rate.iter().map(|&v| fmt3(v)));
        row.push(snapshot.step_count.to_string());
        row.push(fmt3(snapshot.step_length));
        row.push(fmt3(snapshot.position.x));
        row.push(fmt3(snapshot.position.y));
        row.push(fmt3(snapshot.heading_degrees()));
        row.push(fmt3(snapshot.total_distance));
        row.push(fmt3(snapshot.acceleration_magnitude));
        if let Some(trial) = self.trial {
            row.push(trial.to_string());
        }
        self.writer.write_record(row)?;

        self.last_row_ns = Some(snapshot.elapsed_ns);
        self.rows += 1;
        Ok(true)
    }

    /// Rows written so far, header excluded.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }
}

// ============================================================================
// EVENT LOG
// ============================================================================

/// Writer for route events of a single trial.
///
/// The `Distance` column is the walked distance since the previous
/// [`record`](Self::record), unless an explicit distance is given.
pub struct EventLogWriter<W: Write> {
    writer: csv::Writer<W>,
    trial: TrialId,
    last_total_distance: f64,
}

impl EventLogWriter<File> {
    /// Open an event log at `path`, appending if it already exists.
    ///
    /// The header is written only for a new file.
    pub fn append<P: AsRef<Path>>(path: P, trial: TrialId) -> Result<Self> {
        let path = path.as_ref();
        let exists = path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        if exists {
            log::info!("Event log opened for append: {}", path.display());
            Ok(Self::without_header(file, trial))
        } else {
            log::info!("Event log created: {}", path.display());
            Self::new(file, trial)
        }
    }
}

impl<W: Write> EventLogWriter<W> {
    pub fn new(writer: W, trial: TrialId) -> Result<Self> {
        let mut this = Self::without_header(writer, trial);
        this.writer.write_record(EVENT_HEADER)?;
        Ok(this)
    }

    fn without_header(writer: W, trial: TrialId) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
            trial,
            last_total_distance: 0.0,
        }
    }

    /// Record an event; Distance is the increment since the last recorded
    /// event. Returns that increment.
    pub fn record(
        &mut self,
        kind: RouteEventKind,
        route_point: u32,
        target: Point2,
        snapshot: &PdrSnapshot,
    ) -> Result<f64> {
        let distance = snapshot.total_distance - self.last_total_distance;
        self.last_total_distance = snapshot.total_distance;
        self.write_row(kind, route_point, target, snapshot, distance)?;
        Ok(distance)
    }

    /// Record an event with an explicit Distance. The running baseline used
    /// by [`record`](Self::record) is left alone.
    pub fn record_with_distance(
        &mut self,
        kind: RouteEventKind,
        route_point: u32,
        target: Point2,
        snapshot: &PdrSnapshot,
        distance: f64,
    ) -> Result<()> {
        self.write_row(kind, route_point, target, snapshot, distance)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    fn write_row(
        &mut self,
        kind: RouteEventKind,
        route_point: u32,
        target: Point2,
        snapshot: &PdrSnapshot,
        distance: f64,
    ) -> Result<()> {
        self.writer.write_record([
            snapshot.elapsed_ns.to_string(),
            self.trial.to_string(),
            kind.to_string(),
            route_point.to_string(),
            format!("{:.1}", target.x),
            format!("{:.1}", target.y),
            fmt3(snapshot.position.x),
            fmt3(snapshot.position.y),
            fmt3(distance),
        ])?;
        // Events are rare; keep the file current
        self.writer.flush()?;
        log::debug!("Route event {} at point {}", kind, route_point);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
