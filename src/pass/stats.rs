//! Pass statistics (spec §6): one record per pass invocation, serialized as
//! a single `key=value ...` line, matching the "no wire protocol, only
//! persisted artifact is statistics files (plain text, append-only)"
//! requirement.

use std::fmt;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Pass-specific counters (e.g. `removed=3`), appended after the common
/// fields of a [`PassRecord`].
#[derive(Debug, Clone, Default)]
pub struct PassCounters(Vec<(&'static str, u64)>);

impl PassCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &'static str, value: u64) -> &mut Self {
        self.0.push((key, value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.0.iter().copied()
    }
}

/// One `{pass-id, start-timestamp, end-timestamp, before-size, after-size,
/// pass-specific-counters}` record (spec §6).
#[derive(Debug, Clone)]
pub struct PassRecord {
    pub pass_id: &'static str,
    pub start_timestamp_millis: u128,
    pub end_timestamp_millis: u128,
    pub before_size: usize,
    pub after_size: usize,
    pub counters: PassCounters,
}

impl fmt::Display for PassRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pass-id={} start-timestamp={} end-timestamp={} before-size={} after-size={}",
            self.pass_id,
            self.start_timestamp_millis,
            self.end_timestamp_millis,
            self.before_size,
            self.after_size
        )?;
        for (key, value) in self.counters.iter() {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Milliseconds since the Unix epoch, used to stamp [`PassRecord`] start/end
/// times. Not itself part of the public API beyond `pass::PassManager`.
pub(crate) fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Serializes [`PassRecord`]s to a caller-supplied sink, one per line. The
/// core never opens a file itself (spec §6, "no file I/O" Non-goal); the
/// driver owns the `impl Write` (typically a `File`) passed in here.
pub struct StatisticsCollector<'w> {
    sink: &'w mut dyn Write,
}

impl<'w> StatisticsCollector<'w> {
    pub fn new(sink: &'w mut dyn Write) -> Self {
        Self { sink }
    }

    pub fn record(&mut self, record: &PassRecord) -> io::Result<()> {
        writeln!(self.sink, "{record}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_formats_as_key_value_pairs() {
        let mut counters = PassCounters::new();
        counters.set("removed", 3);
        let record = PassRecord {
            pass_id: "dead-node-elimination",
            start_timestamp_millis: 100,
            end_timestamp_millis: 142,
            before_size: 10,
            after_size: 7,
            counters,
        };
        let line = record.to_string();
        assert_eq!(
            line,
            "pass-id=dead-node-elimination start-timestamp=100 end-timestamp=142 \
             before-size=10 after-size=7 removed=3"
        );
    }

    #[test]
    fn collector_appends_one_line_per_record() {
        let mut buf = Vec::new();
        {
            let mut collector = StatisticsCollector::new(&mut buf);
            let record = PassRecord {
                pass_id: "p",
                start_timestamp_millis: 0,
                end_timestamp_millis: 1,
                before_size: 1,
                after_size: 1,
                counters: PassCounters::new(),
            };
            collector.record(&record).unwrap();
            collector.record(&record).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
