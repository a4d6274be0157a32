//! Matrix topology: a routing table with one source per output.
//!
//! Protocol 2000 responses carry no request id, so a batch of output status
//! queries could come back in any order with nothing to tell them apart.
//! A matrix therefore leaves status queries out of the refresh batch and
//! polls each output in its own exchange afterwards.
//!
//! The table is 0-based; protocol output numbers are 1-based. Slot `i`
//! holds the input routed to protocol output `i + 1`.

use tracing::debug;

use p2k_core::command::Command;
use p2k_core::error::{Error, Result};
use p2k_core::instruction::Instruction;
use p2k_core::value;

use crate::engine::Engine;
use crate::state::{Fold, PanelState, Topology};

/// A routing matrix.
pub type MediaMatrix = Engine<Matrix>;

/// Routing table of a matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    routes: Vec<u8>,
    fixed: bool,
}

impl Matrix {
    /// A matrix whose table follows the output count the device reports.
    pub fn new() -> Self {
        Self::default()
    }

    /// A matrix with a fixed number of outputs, whatever the device reports.
    ///
    /// Output numbers are 7-bit values on the wire, so `count` must be at
    /// most 127.
    pub fn with_outputs(count: u8) -> Result<Self> {
        let count = value::check(i64::from(count))?;
        Ok(Matrix {
            routes: vec![0; usize::from(count)],
            fixed: true,
        })
    }

    /// Input routed to each output, indexed from 0.
    pub fn routing_table(&self) -> &[u8] {
        &self.routes
    }

    fn slot(&self, output_value: u8) -> Option<usize> {
        let slot = usize::from(output_value).checked_sub(1)?;
        (slot < self.routes.len()).then_some(slot)
    }
}

impl Topology for Matrix {
    fn status_queries(&self, _machine_id: u8) -> Result<Vec<Instruction>> {
        Ok(Vec::new())
    }

    fn output_polls(&self, machine_id: u8) -> Result<Vec<Instruction>> {
        (1..=self.routes.len())
            .map(|output| {
                Instruction::new(
                    Command::QueryOutputStatus,
                    Some(0),
                    Some(output as i64),
                    Some(i64::from(machine_id)),
                )
            })
            .collect()
    }

    fn apply(&mut self, response: &Instruction) -> Fold {
        match response.command().command() {
            Some(Command::SwitchVideo) => match self.slot(response.output_value()) {
                Some(slot) => {
                    self.routes[slot] = response.input_value();
                    Fold::Applied
                }
                None => Fold::Ignored,
            },
            // The table only tracks video routes.
            _ => Fold::Ignored,
        }
    }

    fn apply_poll(&mut self, index: usize, response: &Instruction) -> Fold {
        match (response.command().command(), self.routes.get_mut(index)) {
            (Some(Command::QueryOutputStatus), Some(slot)) => {
                *slot = response.output_value();
                Fold::Applied
            }
            _ => Fold::Ignored,
        }
    }

    fn sync_counts(&mut self, panel: &PanelState) {
        if !self.fixed {
            self.routes.resize(usize::from(panel.output_count), 0);
        }
    }
}

impl Engine<Matrix> {
    /// Route `input` to `output` (0-based table index).
    ///
    /// Both values are clamped into `[0, input_count]`; `output` is further
    /// limited to the last table slot. Video and audio are switched in two
    /// exchanges, then the table slot is set to the clamped input whatever
    /// the device answered.
    pub async fn set_route(&mut self, input: i64, output: i64) -> Result<()> {
        let table_len = self.topology().routes.len();
        if table_len == 0 {
            return Err(Error::InvalidParameter("matrix has no outputs".into()));
        }
        let input_count = self.input_count();
        let input = value::clamp_index(input, input_count);
        let output = value::clamp_index(output, input_count).min(table_len as i64 - 1);
        debug!(input, output, "setting route");

        let video = self.instruction(Command::SwitchVideo, input, output + 1)?;
        let audio = self.instruction(Command::SwitchAudio, input, output + 1)?;
        self.exchange(&[video]).await?;
        self.exchange(&[audio]).await?;

        // Both clamps keep these within the table and the 7-bit domain.
        self.topology_mut().routes[output as usize] = input as u8;
        Ok(())
    }

    /// Input routed to each output, indexed from 0.
    pub fn routing_table(&self) -> &[u8] {
        self.topology().routing_table()
    }
}
