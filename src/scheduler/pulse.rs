//! Frame timing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Timing of one scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    /// 1 for the first pulse of a clock.
    pub frame: u64,
    pub time: DateTime<Utc>,
    /// Seconds since the clock started.
    pub seconds: f64,
    /// Seconds since the previous pulse; 0 on the first.
    pub delta: f64,
}

/// Produces consecutive pulses from wall-clock or caller-supplied times.
#[derive(Debug, Clone)]
pub struct PulseClock {
    start: DateTime<Utc>,
    last: Option<DateTime<Utc>>,
    frame: u64,
}

impl PulseClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { start, last: None, frame: 0 }
    }

    pub fn now() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Pulse for `time`. Times before the previous pulse give a zero delta.
    pub fn advance_to(&mut self, time: DateTime<Utc>) -> Pulse {
        let delta = self.last.map_or(0.0, |last| seconds_between(last, time).max(0.0));
        self.last = Some(time);
        self.frame += 1;
        Pulse {
            frame: self.frame,
            time,
            seconds: seconds_between(self.start, time),
            delta,
        }
    }

    pub fn advance_by(&mut self, step: Duration) -> Pulse {
        let time = self.last.unwrap_or(self.start) + step;
        self.advance_to(time)
    }

    /// Pulse for the current wall-clock time.
    pub fn next(&mut self) -> Pulse {
        self.advance_to(Utc::now())
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let span = to - from;
    match span.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => span.num_milliseconds() as f64 / 1_000.0,
    }
}
