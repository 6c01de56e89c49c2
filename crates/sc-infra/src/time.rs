use chrono::{DateTime, Utc};
use sc_core::ports::ClockPort;

pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
