//! Per-device session lifecycle.
//!
//! A [Session] owns exactly one physical Joy-Con. Connecting opens the
//! HID handle, pulls colors and calibration out of the SPI flash, runs
//! the configuration handshake and then hands the handle to a dedicated
//! blocking read loop that publishes decoded [DeviceStatus] snapshots
//! to the session's output stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hidapi::HidDevice;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};

use crate::drivers::joycon::driver::{Driver, JoyconSide};
use crate::drivers::joycon::error::{DeviceError, JoyconError};
use crate::drivers::joycon::joystick::StickCalibration;
use crate::drivers::joycon::status::{DeviceStatus, Rgb};
use crate::drivers::joycon::transport::Transport;

/// Size of the per-session status stream buffer.
const STATUS_BUFFER: usize = 64;

/// Number of consecutive read failures tolerated before the read loop
/// gives up and the session closes itself.
const MAX_CONSECUTIVE_FAILURES: u8 = 5;

/// Opens the device handle during [Session::connect]. Injectable so
/// the whole lifecycle can run against a scripted transport.
pub(crate) type Opener<T> =
    Arc<dyn Fn(JoyconSide, &str) -> Result<Driver<T>, DeviceError> + Send + Sync>;

/// Lifecycle of a session. `Closed` is terminal: a closed session's
/// serial must be rediscovered to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Ready,
    Closed,
}

/// One Joy-Con half attached to the system, identified by its serial
/// number across discovery and reconnection.
pub struct Session<T: Transport + 'static = HidDevice> {
    serial: String,
    name: String,
    side: JoyconSide,
    state: SessionState,
    body_color: Option<Rgb>,
    button_color: Option<Rgb>,
    calibration: Option<StickCalibration>,
    status_rx: Option<mpsc::Receiver<DeviceStatus>>,
    stop: Arc<AtomicBool>,
    read_task: Option<JoinHandle<()>>,
    open: Opener<T>,
}

impl Session {
    pub fn new(side: JoyconSide, serial: String, name: String) -> Self {
        Self::with_opener(side, serial, name, Arc::new(Driver::open))
    }
}

impl<T: Transport + 'static> Session<T> {
    pub(crate) fn with_opener(
        side: JoyconSide,
        serial: String,
        name: String,
        open: Opener<T>,
    ) -> Self {
        Self {
            serial,
            name,
            side,
            state: SessionState::Idle,
            body_color: None,
            button_color: None,
            calibration: None,
            status_rx: None,
            stop: Arc::new(AtomicBool::new(false)),
            read_task: None,
            open,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn side(&self) -> JoyconSide {
        self.side
    }

    /// Current lifecycle state. A tripped circuit breaker closes the
    /// session from inside the read loop; the raised stop flag is what
    /// records that, so a self-closed session reports `Closed` here
    /// without anyone calling [Self::disconnect].
    pub fn state(&self) -> SessionState {
        if self.state == SessionState::Ready && self.stop.load(Ordering::SeqCst) {
            return SessionState::Closed;
        }
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Body color read from the device, populated by [Self::connect].
    pub fn body_color(&self) -> Option<Rgb> {
        self.body_color
    }

    /// Button color read from the device, populated by [Self::connect].
    pub fn button_color(&self) -> Option<Rgb> {
        self.button_color
    }

    pub fn calibration(&self) -> Option<StickCalibration> {
        self.calibration
    }

    /// Take the session's status stream. Yields one [DeviceStatus] per
    /// accepted input report and closes when the session does.
    pub fn take_status(&mut self) -> Option<mpsc::Receiver<DeviceStatus>> {
        self.status_rx.take()
    }

    /// Open the device and bring the session to `Ready`. Reads colors,
    /// stick calibration (with the factory fallback) and the deadzone,
    /// runs the configuration handshake and starts the read loop. On
    /// failure the error is propagated and the session stays in its
    /// failed `Connecting` state; there is no automatic retry.
    pub async fn connect(&mut self) -> Result<(), JoyconError> {
        match self.state() {
            SessionState::Closed => return Err(DeviceError::AlreadyClosed.into()),
            SessionState::Connecting | SessionState::Ready => {
                return Err(DeviceError::AlreadyOpen.into())
            }
            SessionState::Idle => {}
        }
        self.state = SessionState::Connecting;

        let side = self.side;
        let serial = self.serial.clone();
        let open = self.open.clone();
        let setup = task::spawn_blocking(move || -> Result<_, JoyconError> {
            let mut driver = open(side, &serial)?;
            let (body_color, button_color) = driver.read_colors()?;
            let calibration = driver.read_stick_calibration()?;
            driver.configure()?;
            Ok((driver, body_color, button_color, calibration))
        })
        .await
        .map_err(|err| DeviceError::IoFailure(err.to_string()))?;
        let (driver, body_color, button_color, calibration) = setup?;

        self.body_color = Some(body_color);
        self.button_color = Some(button_color);
        self.calibration = Some(calibration);

        let (tx, rx) = mpsc::channel(STATUS_BUFFER);
        self.status_rx = Some(rx);
        let stop = self.stop.clone();
        self.read_task = Some(task::spawn_blocking(move || {
            read_loop(driver, calibration, tx, stop)
        }));

        log::info!("connected to {} ({})", self.name, self.serial);
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Close the session: stop the read loop at its next timeout
    /// boundary, power the device off and close the status stream.
    /// Closing a session that is not `Ready` reports `AlreadyClosed`.
    pub async fn disconnect(&mut self) -> Result<(), JoyconError> {
        if self.state() != SessionState::Ready {
            return Err(DeviceError::AlreadyClosed.into());
        }
        self.state = SessionState::Closed;

        self.stop.store(true, Ordering::SeqCst);
        if let Some(read_task) = self.read_task.take() {
            if let Err(err) = read_task.await {
                log::debug!("read loop task failed: {err}");
            }
        }

        log::info!("disconnected from {} ({})", self.name, self.serial);
        Ok(())
    }
}

/// Count-based circuit breaker for the read loop. Trips open after a
/// fixed number of consecutive failures; any successful read closes it
/// again.
#[derive(Debug)]
pub(crate) struct CircuitBreaker {
    threshold: u8,
    failures: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BreakerState {
    Closed,
    Open,
}

impl CircuitBreaker {
    pub(crate) fn new(threshold: u8) -> Self {
        Self {
            threshold,
            failures: 0,
        }
    }

    pub(crate) fn record_failure(&mut self) -> BreakerState {
        self.failures = self.failures.saturating_add(1);
        self.state()
    }

    pub(crate) fn reset(&mut self) {
        self.failures = 0;
    }

    pub(crate) fn state(&self) -> BreakerState {
        if self.failures >= self.threshold {
            BreakerState::Open
        } else {
            BreakerState::Closed
        }
    }

    pub(crate) fn remaining(&self) -> u8 {
        self.threshold.saturating_sub(self.failures)
    }
}

/// Continuously read and decode input reports, publishing each accepted
/// snapshot to the session's stream. Runs on a blocking task and is the
/// sole owner of the device handle. Exits when the stop flag is raised,
/// the consumer goes away or the circuit breaker trips; the device is
/// powered off on the way out and dropping the sender closes the
/// stream.
pub(crate) fn read_loop<T: Transport>(
    mut driver: Driver<T>,
    calibration: StickCalibration,
    tx: mpsc::Sender<DeviceStatus>,
    stop: Arc<AtomicBool>,
) {
    let mut breaker = CircuitBreaker::new(MAX_CONSECUTIVE_FAILURES);
    log::debug!("starting input report loop");
    while !stop.load(Ordering::SeqCst) {
        match driver.poll(&calibration) {
            Ok(Some(status)) => {
                breaker.reset();
                if tx.blocking_send(status).is_err() {
                    log::debug!("status consumer went away, stopping report loop");
                    break;
                }
            }
            // Read timed out or the frame was rejected; neutral for
            // the breaker, and the next iteration observes the stop
            // flag.
            Ok(None) => {}
            Err(err) => {
                if breaker.record_failure() == BreakerState::Open {
                    log::error!("exceeded read retries, disconnecting: {err}");
                    break;
                }
                log::warn!(
                    "error reading from device: {err}, retrying ({} left)",
                    breaker.remaining()
                );
            }
        }
    }

    // Raised before the stream closes so a self-closed session
    // reports `Closed` by the time the receiver sees the end.
    stop.store(true, Ordering::SeqCst);
    if let Err(err) = driver.power_off() {
        log::debug!("failed to power device off: {err}");
    }
    log::debug!("input report loop stopped");
}
