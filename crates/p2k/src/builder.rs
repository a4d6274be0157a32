//! P2kBuilder -- fluent builder for devices and state engines.
//!
//! Separates configuration (machine id, endpoint, timeouts) from
//! construction. A builder first produces a [`SharedDevice`], either over
//! TCP or over a caller-supplied transport, and then any number of engines
//! on that device. Every engine runs its initial refresh before it is
//! returned.
//!
//! # Example
//!
//! ```no_run
//! use p2k::P2kBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> p2k_core::Result<()> {
//! let builder = P2kBuilder::new()
//!     .host("192.168.1.39")
//!     .machine_id(1)
//!     .command_timeout(Duration::from_millis(500));
//! let device = builder.connect().await?;
//! let mut switch = builder.build_switch(device).await?;
//! switch.select_source(3).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::debug;

use p2k_core::device::{shared, SharedDevice};
use p2k_core::error::{Error, Result};
use p2k_core::transport::Transport;
use p2k_core::value::{self, BROADCAST_MACHINE_ID};
use p2k_transport::tcp::{endpoint, TcpTransport, DEFAULT_CONNECT_TIMEOUT};

use crate::engine::Engine;
use crate::io::{TransportDevice, DEFAULT_COMMAND_TIMEOUT};
use crate::matrix::{Matrix, MediaMatrix};
use crate::switch::{MediaSwitch, OutputSwitch, Switch};

/// Fluent builder for Protocol 2000 devices and engines.
#[derive(Debug, Clone)]
pub struct P2kBuilder {
    machine_id: Option<u8>,
    host: Option<String>,
    port: Option<u16>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl Default for P2kBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl P2kBuilder {
    pub fn new() -> Self {
        P2kBuilder {
            machine_id: None,
            host: None,
            port: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Address a specific machine instead of broadcasting (`0x41`).
    pub fn machine_id(mut self, id: u8) -> Self {
        self.machine_id = Some(id);
        self
    }

    /// Host name or IP address of the device.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// TCP port (default: 5000).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the TCP connect timeout (default: 5s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the timeout for each read of a response batch (default: 1s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Open a TCP connection to the configured host.
    pub async fn connect(&self) -> Result<SharedDevice> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("no host configured".into()))?;
        let addr = endpoint(host, self.port);
        let transport = TcpTransport::connect(&addr, self.connect_timeout).await?;
        Ok(self.device_with_transport(Box::new(transport)))
    }

    /// Wrap a caller-provided transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` from
    /// `p2k-test-harness`) and for links other than TCP.
    pub fn device_with_transport(&self, transport: Box<dyn Transport>) -> SharedDevice {
        shared(TransportDevice::with_timeout(transport, self.command_timeout))
    }

    /// Build a single-output switch and refresh it.
    pub async fn build_switch(&self, device: SharedDevice) -> Result<MediaSwitch> {
        let machine_id = self.resolved_machine_id()?;
        debug!(machine_id, "building media switch");
        Engine::connect(device, machine_id, Switch::single()).await
    }

    /// Build a switch for one output (1-based) of a multi-output device.
    pub async fn build_output_switch(
        &self,
        device: SharedDevice,
        output_number: u8,
    ) -> Result<OutputSwitch> {
        let machine_id = self.resolved_machine_id()?;
        let topology = Switch::output(i64::from(output_number))?;
        debug!(machine_id, output_number, "building output switch");
        Engine::connect(device, machine_id, topology).await
    }

    /// Build a matrix and refresh it.
    ///
    /// With `Some(n)` the routing table always has `n` slots; with `None`
    /// it follows the output count the device reports.
    pub async fn build_matrix(
        &self,
        device: SharedDevice,
        output_count: Option<u8>,
    ) -> Result<MediaMatrix> {
        let machine_id = self.resolved_machine_id()?;
        let topology = match output_count {
            Some(count) => Matrix::with_outputs(count)?,
            None => Matrix::new(),
        };
        debug!(machine_id, ?output_count, "building media matrix");
        Engine::connect(device, machine_id, topology).await
    }

    fn resolved_machine_id(&self) -> Result<u8> {
        value::validate(self.machine_id.map(i64::from), BROADCAST_MACHINE_ID)
    }
}
