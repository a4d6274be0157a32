//! [`Engine`] -- the shell shared by every switch and matrix.
//!
//! An engine owns a [`SharedDevice`], the validated machine id, and the
//! cached [`State`]. Every operation follows the same pattern: build
//! instructions, apply any optimistic local change, exchange them with the
//! device while holding its lock, then fold the responses in order.
//! Topology-specific operations (`select_source`, `set_route`) live next to
//! their topology in [`switch`](crate::switch) and [`matrix`](crate::matrix).

use tracing::{debug, info};

use p2k_core::command::Command;
use p2k_core::device::SharedDevice;
use p2k_core::error::{Error, Result};
use p2k_core::instruction::Instruction;

use crate::state::{Fold, State, Topology};

/// Cached view of one Protocol 2000 machine.
///
/// State reads never touch the device; call [`update`](Engine::update) to
/// refresh them. Every engine has been refreshed once before it is handed
/// out, by [`Engine::connect`] or by [`P2kBuilder`](crate::P2kBuilder).
/// There is no way to build one with an unrefreshed cache:
///
/// ```compile_fail
/// use p2k::{Engine, Switch};
/// use p2k_test_harness::MockDevice;
///
/// let switch = Engine::new(p2k_core::shared(MockDevice::new()), 1, Switch::single());
/// ```
pub struct Engine<T> {
    device: SharedDevice,
    machine_id: u8,
    state: State<T>,
}

impl<T: Topology> Engine<T> {
    /// Engine with an all-zero cache. Callers must `update()` before
    /// handing it out.
    pub(crate) fn new(device: SharedDevice, machine_id: u8, topology: T) -> Self {
        Engine {
            device,
            machine_id,
            state: State::new(topology),
        }
    }

    /// Create an engine and run its initial refresh.
    pub async fn connect(device: SharedDevice, machine_id: u8, topology: T) -> Result<Self> {
        let mut engine = Self::new(device, machine_id, topology);
        engine.update().await?;
        Ok(engine)
    }

    /// Refresh the whole cached state from the device.
    ///
    /// Sends the machine dimension queries, the topology's status queries
    /// and the panel lock query as one batch. Any per-output polls the
    /// topology asks for are then sent one at a time, each awaited before
    /// the next, with the device lock held throughout.
    pub async fn update(&mut self) -> Result<()> {
        let mut batch = vec![
            self.instruction(Command::DefineMachine, 1, 1)?,
            self.instruction(Command::DefineMachine, 2, 1)?,
        ];
        batch.extend(self.state.topology.status_queries(self.machine_id)?);
        batch.push(self.instruction(Command::QueryPanelLock, 0, 0)?);
        debug!(machine_id = self.machine_id, queries = batch.len(), "refreshing state");

        let mut device = self.device.lock().await;
        let responses = device.process(&batch).await?;
        check_batch(&batch, &responses)?;
        self.state.fold(&responses);
        self.state.topology.sync_counts(&self.state.panel);

        let polls = self.state.topology.output_polls(self.machine_id)?;
        if !polls.is_empty() {
            debug!(outputs = polls.len(), "polling outputs");
        }
        for (index, poll) in polls.into_iter().enumerate() {
            let response = device.process_one(poll).await?;
            if self.state.topology.apply_poll(index, &response) == Fold::Ignored {
                info!(index, instruction = %response, "discarded poll response");
            }
        }
        Ok(())
    }

    /// Lock the front panel.
    pub async fn lock(&mut self) -> Result<()> {
        self.set_panel_lock(true).await
    }

    /// Unlock the front panel.
    pub async fn unlock(&mut self) -> Result<()> {
        self.set_panel_lock(false).await
    }

    async fn set_panel_lock(&mut self, locked: bool) -> Result<()> {
        debug!(locked, "setting panel lock");
        let request = self.instruction(Command::PanelLock, i64::from(locked), 0)?;
        self.state.panel.locked = locked;
        self.exchange(&[request]).await
    }

    /// Number of inputs reported by the device.
    pub fn input_count(&self) -> u8 {
        self.state.panel.input_count
    }

    /// Number of outputs reported by the device.
    pub fn output_count(&self) -> u8 {
        self.state.panel.output_count
    }

    pub fn is_locked(&self) -> bool {
        self.state.panel.locked
    }

    pub fn machine_id(&self) -> u8 {
        self.machine_id
    }

    pub fn state(&self) -> &State<T> {
        &self.state
    }

    pub fn device(&self) -> &SharedDevice {
        &self.device
    }

    /// Close the underlying device.
    ///
    /// Other engines sharing the device lose their link too.
    pub async fn close(&self) -> Result<()> {
        self.device.lock().await.close().await
    }

    pub(crate) fn topology(&self) -> &T {
        &self.state.topology
    }

    pub(crate) fn topology_mut(&mut self) -> &mut T {
        &mut self.state.topology
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut State<T> {
        &mut self.state
    }

    /// An instruction addressed to this engine's machine.
    pub(crate) fn instruction(
        &self,
        command: Command,
        input: i64,
        output: i64,
    ) -> Result<Instruction> {
        Instruction::new(
            command,
            Some(input),
            Some(output),
            Some(i64::from(self.machine_id)),
        )
    }

    /// Send one batch and fold its responses.
    pub(crate) async fn exchange(&mut self, batch: &[Instruction]) -> Result<()> {
        let responses = {
            let mut device = self.device.lock().await;
            device.process(batch).await?
        };
        check_batch(batch, &responses)?;
        self.state.fold(&responses);
        Ok(())
    }
}

/// Responses are matched to requests by position only, so a batch answered
/// with the wrong number of frames cannot be folded.
fn check_batch(requests: &[Instruction], responses: &[Instruction]) -> Result<()> {
    if requests.len() == responses.len() {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "expected {} responses, got {}",
            requests.len(),
            responses.len()
        )))
    }
}
