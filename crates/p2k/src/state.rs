//! Cached device state and the response reducer.
//!
//! State is only ever changed by folding response [`Instruction`]s into it.
//! Folding does no I/O, so every rule here can be tested without a device.
//!
//! Responses that concern the whole machine (dimensions, panel lock) are
//! handled by [`PanelState`]. Everything else is offered to the
//! [`Topology`], which differs between a switch and a matrix. A response
//! neither of them claims is logged and dropped.

use tracing::info;

use p2k_core::command::Command;
use p2k_core::error::Result;
use p2k_core::instruction::Instruction;

/// Outcome of folding one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// The response was recognised and applied.
    Applied,
    /// The response was not relevant to this state; nothing changed.
    Ignored,
}

/// Machine-wide state shared by every topology.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub input_count: u8,
    pub output_count: u8,
    pub locked: bool,
}

impl PanelState {
    /// Fold one response into the panel state.
    pub fn apply(&mut self, response: &Instruction) -> Fold {
        match response.command().command() {
            Some(Command::DefineMachine) => match response.input_value() {
                1 => {
                    self.input_count = response.output_value();
                    Fold::Applied
                }
                2 => {
                    self.output_count = response.output_value();
                    Fold::Applied
                }
                _ => Fold::Ignored,
            },
            // Echo of the lock command: the requested state is in the input field.
            Some(Command::PanelLock) => {
                self.locked = response.input_value() == 1;
                Fold::Applied
            }
            Some(Command::QueryPanelLock) => {
                self.locked = response.output_value() == 1;
                Fold::Applied
            }
            _ => Fold::Ignored,
        }
    }
}

/// The part of an engine that differs between switch and matrix devices.
///
/// A topology decides which status queries join the refresh batch, which
/// outputs must be polled one at a time afterwards, and how routing
/// responses change its own state.
pub trait Topology: Send + Sync {
    /// Status queries placed in the refresh batch, between the machine
    /// dimension queries and the panel lock query.
    fn status_queries(&self, machine_id: u8) -> Result<Vec<Instruction>>;

    /// Queries sent one per exchange after the refresh batch.
    ///
    /// The response to the `n`th poll is handed to
    /// [`apply_poll`](Topology::apply_poll) with index `n`.
    fn output_polls(&self, _machine_id: u8) -> Result<Vec<Instruction>> {
        Ok(Vec::new())
    }

    /// Fold a response that [`PanelState`] did not claim.
    fn apply(&mut self, response: &Instruction) -> Fold;

    /// Fold the response to the `index`th output poll.
    fn apply_poll(&mut self, _index: usize, _response: &Instruction) -> Fold {
        Fold::Ignored
    }

    /// Called after each refresh batch has been folded.
    fn sync_counts(&mut self, _panel: &PanelState) {}
}

/// Complete cached state of one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State<T> {
    pub panel: PanelState,
    pub topology: T,
}

impl<T: Topology> State<T> {
    pub fn new(topology: T) -> Self {
        State {
            panel: PanelState::default(),
            topology,
        }
    }

    /// Fold responses in order.
    pub fn fold(&mut self, responses: &[Instruction]) {
        for response in responses {
            self.apply(response);
        }
    }

    /// Fold responses and return the resulting state.
    pub fn folded(mut self, responses: &[Instruction]) -> Self {
        self.fold(responses);
        self
    }

    /// Fold one response, logging it if nothing claims it.
    pub fn apply(&mut self, response: &Instruction) -> Fold {
        let outcome = match self.panel.apply(response) {
            Fold::Applied => Fold::Applied,
            Fold::Ignored => self.topology.apply(response),
        };
        if outcome == Fold::Ignored {
            info!(instruction = %response, "discarded instruction");
        }
        outcome
    }
}
