use std::io::{self, Write};

use crate::sampler::Sample;

/// Column names written before the first sample.
pub const TELEMETRY_HEADER: &str = "time buffSize inFlow outFlow";

/// Receives one [`Sample`] per sampler tick.
pub trait TelemetrySink {
    fn header(&mut self) -> io::Result<()>;

    fn record(&mut self, sample: &Sample) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Space-separated text telemetry, one line per tick:
/// `<elapsed_ms> <queue_len> <accepted> <emitted>`.
pub struct TelemetryWriter<W: Write> {
    out: W,
}

impl<W: Write> TelemetryWriter<W> {
    pub fn new(out: W) -> Self {
        TelemetryWriter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TelemetrySink for TelemetryWriter<W> {
    fn header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{TELEMETRY_HEADER}")
    }

    fn record(&mut self, sample: &Sample) -> io::Result<()> {
        writeln!(
            self.out,
            "{} {} {} {}",
            sample.elapsed_ms, sample.queue_len, sample.accepted, sample.emitted
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl TelemetrySink for Vec<Sample> {
    fn header(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn record(&mut self, sample: &Sample) -> io::Result<()> {
        self.push(*sample);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_format() {
        let mut writer = TelemetryWriter::new(Vec::new());
        writer.header().unwrap();
        writer
            .record(&Sample {
                elapsed_ms: 0,
                queue_len: 0,
                accepted: 0,
                emitted: 0,
            })
            .unwrap();
        writer
            .record(&Sample {
                elapsed_ms: 12,
                queue_len: 9_800,
                accepted: 2_000,
                emitted: 1_900,
            })
            .unwrap();
        writer.flush().unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            text,
            "time buffSize inFlow outFlow\n0 0 0 0\n12 9800 2000 1900\n"
        );
    }
}
