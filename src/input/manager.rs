//! Discovery and supervision of Joy-Con sessions.

use std::collections::HashMap;

use hidapi::{HidApi, HidDevice};
use tokio::signal;

use crate::drivers::joycon::driver::{JoyconSide, VID};
use crate::drivers::joycon::status::DeviceStatus;
use crate::drivers::joycon::transport::Transport;
use crate::input::multiplexer::Multiplexer;
use crate::input::session::{Session, SessionState};

/// Owns every known session, keyed by serial number, and the merged
/// status stream they publish into.
pub struct Manager<T: Transport + 'static = HidDevice> {
    sessions: HashMap<String, Session<T>>,
    multiplexer: Multiplexer<DeviceStatus>,
}

impl<T: Transport + 'static> Manager<T> {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            multiplexer: Multiplexer::new(),
        }
    }

    pub(crate) fn track(&mut self, session: Session<T>) {
        self.sessions.insert(session.serial().to_string(), session);
    }

    /// Drop sessions that reached `Closed`, whether through
    /// [Session::disconnect] or a tripped circuit breaker. Freeing the
    /// serial is what lets [Manager::discover] recreate a session for
    /// a device whose link dropped.
    pub(crate) fn reap_closed(&mut self) {
        self.sessions.retain(|serial, session| {
            if session.state() == SessionState::Closed {
                log::info!("forgetting closed session {serial}");
                return false;
            }
            true
        });
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session<T>> {
        self.sessions.values()
    }

    pub fn find(&mut self, serial: &str) -> Option<&mut Session<T>> {
        self.sessions.get_mut(serial)
    }

    pub fn find_all(&self, side: JoyconSide) -> Vec<&Session<T>> {
        self.sessions
            .values()
            .filter(|session| session.side() == side)
            .collect()
    }

    /// Pick one left and one right half from the known sessions, in no
    /// particular order. Either half may be absent.
    pub fn find_first_pair(&self) -> Pair {
        let serial_for = |side: JoyconSide| {
            self.sessions
                .values()
                .find(|session| session.side() == side)
                .map(|session| session.serial().to_string())
        };
        Pair {
            left: serial_for(JoyconSide::Left),
            right: serial_for(JoyconSide::Right),
        }
    }

    /// Close every ready session, then the multiplexer. Session
    /// streams are drained into the merge before it closes.
    pub async fn disconnect_all(&mut self) {
        for session in self.sessions.values_mut() {
            if !session.is_connected() {
                continue;
            }
            if let Err(err) = session.disconnect().await {
                log::debug!("disconnecting {}: {err}", session.serial());
            }
        }
        self.multiplexer.close().await;
    }
}

impl Manager {
    /// Enumerate attached HID devices and create an idle [Session] for
    /// every Joy-Con not already known. Sessions that closed (a
    /// disconnect or a tripped circuit breaker) are reaped first so
    /// their devices show up as new again. Returns the serials of the
    /// newly created sessions. Nintendo devices that are not a Joy-Con
    /// half (e.g. a Pro Controller) are rejected here, at the
    /// discovery boundary.
    pub fn discover(&mut self) -> Result<Vec<String>, hidapi::HidError> {
        self.reap_closed();

        let api = HidApi::new()?;
        let mut found = Vec::new();
        for info in api.device_list() {
            if info.vendor_id() != VID {
                continue;
            }
            let side = match JoyconSide::from_product_id(info.product_id()) {
                Ok(side) => side,
                Err(err) => {
                    log::debug!("skipping unsupported device: {err}");
                    continue;
                }
            };
            let serial = match info.serial_number() {
                Some(serial) if !serial.is_empty() => serial.to_string(),
                _ => {
                    log::debug!("skipping device without a serial number");
                    continue;
                }
            };
            if self.sessions.contains_key(&serial) {
                continue;
            }
            let name = info.product_string().unwrap_or("Joy-Con").to_string();
            log::info!("discovered {name} ({serial})");
            self.track(Session::new(side, serial.clone(), name));
            found.push(serial);
        }
        Ok(found)
    }

    /// Discover devices, connect them and forward their merged status
    /// stream to the log until ctrl-c. With `pair_only` set, only the
    /// first left/right pair is driven instead of every Joy-Con.
    pub async fn run(
        &mut self,
        pair_only: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.discover()?;

        let serials: Vec<String> = if pair_only {
            self.find_first_pair().serials()
        } else {
            self.sessions.keys().cloned().collect()
        };
        if serials.is_empty() {
            return Err("no joy-cons found".into());
        }

        let mut connected = 0;
        for serial in serials {
            let Some(session) = self.sessions.get_mut(&serial) else {
                continue;
            };
            if let Err(err) = session.connect().await {
                log::error!("failed to connect to {serial}: {err}");
                continue;
            }
            if let Some(status_rx) = session.take_status() {
                if self.multiplexer.join(status_rx).await.is_err() {
                    log::error!("multiplexer refused stream for {serial}");
                    continue;
                }
            }
            connected += 1;
        }
        if connected == 0 {
            return Err("no joy-cons connected".into());
        }

        let mut output = self.multiplexer.output();
        let consumer = tokio::spawn(async move {
            while let Some(status) = output.recv().await {
                log::info!(
                    "battery {:?}, stick {:?}",
                    status.battery_level,
                    status.stick.direction
                );
                log::trace!("{status:?}");
            }
            log::debug!("merged status stream closed");
        });

        log::info!("driving {connected} joy-con(s), press ctrl-c to stop");
        signal::ctrl_c().await?;
        log::info!("shutting down");

        self.disconnect_all().await;
        consumer.await?;
        Ok(())
    }
}

impl<T: Transport + 'static> Default for Manager<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The first discovered left and right halves, by serial.
#[derive(Debug, Default)]
pub struct Pair {
    pub left: Option<String>,
    pub right: Option<String>,
}

impl Pair {
    pub fn serials(&self) -> Vec<String> {
        [self.left.clone(), self.right.clone()]
            .into_iter()
            .flatten()
            .collect()
    }
}
