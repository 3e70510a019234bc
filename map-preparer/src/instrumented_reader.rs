use std::io::{self, Read};

/// Progress is reported every 8 MiB unless configured otherwise.
pub const DEFAULT_REPORT_EVERY: u64 = 8 * 1024 * 1024;

/// Counts the bytes pulled through an inner reader and calls `on_progress`
/// with the running total each time another `report_every` bytes have gone
/// by. A read spanning several intervals reports once per interval.
pub struct InstrumentedReader<R, F> {
    inner: R,
    on_progress: F,
    report_every: u64,
    bytes_read: u64,
    next_report: u64,
}

impl<R: Read, F: FnMut(u64)> InstrumentedReader<R, F> {
    pub fn new(inner: R, on_progress: F) -> Self {
        Self::with_interval(inner, DEFAULT_REPORT_EVERY, on_progress)
    }

    /// `report_every == 0` falls back to [`DEFAULT_REPORT_EVERY`].
    pub fn with_interval(inner: R, report_every: u64, on_progress: F) -> Self {
        let report_every = if report_every == 0 { DEFAULT_REPORT_EVERY } else { report_every };
        Self {
            inner,
            on_progress,
            report_every,
            bytes_read: 0,
            next_report: report_every,
        }
    }
}

impl<R: Read, F: FnMut(u64)> Read for InstrumentedReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read = self.bytes_read.saturating_add(n as u64);
        while self.bytes_read >= self.next_report {
            (self.on_progress)(self.bytes_read);
            match self.next_report.checked_add(self.report_every) {
                Some(next) => self.next_report = next,
                None => {
                    self.next_report = u64::MAX;
                    break;
                }
            }
        }
        Ok(n)
    }
}
