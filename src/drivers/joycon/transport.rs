use std::time::Duration;

use hidapi::HidDevice;

use super::error::DeviceError;

/// Blocking HID transport used by the subcommand codec and the SPI
/// flash read protocol. [HidDevice] is the production implementation;
/// tests inject a scripted fake to exercise the protocol and the read
/// loop without hardware.
pub trait Transport: Send {
    /// Write one outbound report to the device.
    fn write_report(&self, buf: &[u8]) -> Result<usize, DeviceError>;

    /// Read one inbound report, blocking at most `timeout`. Returns
    /// `Ok(0)` when the timeout elapsed without data.
    fn read_report(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, DeviceError>;
}

impl Transport for HidDevice {
    fn write_report(&self, buf: &[u8]) -> Result<usize, DeviceError> {
        Ok(self.write(buf)?)
    }

    fn read_report(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, DeviceError> {
        Ok(self.read_timeout(buf, timeout.as_millis() as i32)?)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::super::error::DeviceError;
    use super::Transport;

    /// One scripted response for [FakeTransport::read_report].
    pub enum ReadScript {
        /// Yield a full report.
        Report(Vec<u8>),
        /// Behave as if the read timed out.
        TimeOut,
        /// Fail with an I/O error.
        Fail,
    }

    #[derive(Default)]
    struct Inner {
        reads: VecDeque<ReadScript>,
        writes: Vec<Vec<u8>>,
    }

    /// Scripted in-memory transport. Reads are served from a queue;
    /// writes are recorded for assertions. An exhausted read queue
    /// behaves like a timeout.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        inner: Arc<Mutex<Inner>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_report(&self, report: Vec<u8>) {
            self.lock().reads.push_back(ReadScript::Report(report));
        }

        pub fn push_timeout(&self) {
            self.lock().reads.push_back(ReadScript::TimeOut);
        }

        pub fn push_failure(&self) {
            self.lock().reads.push_back(ReadScript::Fail);
        }

        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.lock().writes.clone()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
            self.inner.lock().unwrap()
        }
    }

    impl Transport for FakeTransport {
        fn write_report(&self, buf: &[u8]) -> Result<usize, DeviceError> {
            self.lock().writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn read_report(&self, buf: &mut [u8], _timeout: Duration) -> Result<usize, DeviceError> {
            match self.lock().reads.pop_front() {
                Some(ReadScript::Report(report)) => {
                    let n = report.len().min(buf.len());
                    buf[..n].copy_from_slice(&report[..n]);
                    Ok(n)
                }
                Some(ReadScript::TimeOut) | None => Ok(0),
                Some(ReadScript::Fail) => {
                    Err(DeviceError::IoFailure("scripted read failure".into()))
                }
            }
        }
    }
}
