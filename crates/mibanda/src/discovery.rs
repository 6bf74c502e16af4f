//! LE device discovery
//!
//! Runs an active LE scan on a raw HCI socket and collects the advertised
//! local name of every device seen.

use crate::error::HciError;
use crate::gap::constants::*;
use crate::gap::{local_name, BdAddr};
use crate::hci::constants::*;
use crate::hci::{HciCommand, HciSocket, LeAdvertisingReport};
use log::{debug, trace};
use std::time::{Duration, Instant};

/// Default scan length
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for a discovery run
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// HCI adapter index (0 for hci0)
    pub adapter: u16,
    /// How long to listen for advertisements
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            adapter: 0,
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }
}

/// Named devices found during a scan, in order of first sighting
#[derive(Debug, Default)]
pub struct DiscoveredDevices {
    devices: Vec<(BdAddr, String)>,
}

impl DiscoveredDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a report; the first non-empty name seen for an address wins
    pub fn add_report(&mut self, report: &LeAdvertisingReport) {
        let address = BdAddr::new(report.address);
        if self.devices.iter().any(|(known, _)| *known == address) {
            return;
        }

        if let Some(name) = local_name(&report.data) {
            debug!("Discovered {} ({})", address, name);
            self.devices.push((address, name));
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn into_vec(self) -> Vec<(BdAddr, String)> {
        self.devices
    }
}

/// Scan for advertising devices and return their `(address, name)` pairs.
///
/// Devices that never advertise a local name are left out.
pub fn discover(config: &DiscoveryConfig) -> Result<Vec<(BdAddr, String)>, HciError> {
    let socket = HciSocket::open(config.adapter)?;

    socket.execute(&HciCommand::LeSetScanParameters {
        scan_type: LE_SCAN_ACTIVE,
        scan_interval: LE_SCAN_INTERVAL,
        scan_window: LE_SCAN_WINDOW,
        own_address_type: PUBLIC_DEVICE_ADDRESS,
        filter_policy: 0, // Accept all advertisements
    })?;
    socket.execute(&HciCommand::LeSetScanEnable {
        enable: true,
        filter_duplicates: true,
    })?;

    debug!("Scanning on hci{} for {:?}", config.adapter, config.timeout);
    let result = collect_advertisements(&socket, config.timeout);

    // Disable scanning even if collecting failed
    let disabled = socket.execute(&HciCommand::LeSetScanEnable {
        enable: false,
        filter_duplicates: false,
    });

    let devices = result?;
    disabled?;
    Ok(devices.into_vec())
}

fn collect_advertisements(
    socket: &HciSocket,
    timeout: Duration,
) -> Result<DiscoveredDevices, HciError> {
    socket.set_event_filter(&[EVT_LE_META_EVENT])?;

    let mut devices = DiscoveredDevices::new();
    let deadline = Instant::now() + timeout;

    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        let event = match socket.read_event_timeout(remaining) {
            Ok(event) => event,
            Err(HciError::Timeout) => break,
            Err(e) => return Err(e),
        };

        for report in LeAdvertisingReport::parse_from_meta_event(&event) {
            trace!("Advertising report from {}", BdAddr::new(report.address));
            devices.add_report(&report);
        }
    }

    Ok(devices)
}
