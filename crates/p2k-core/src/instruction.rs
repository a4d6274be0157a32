//! [`Instruction`] -- one Protocol 2000 exchange unit.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::command::{Command, CommandId};
use crate::error::Result;
use crate::value::{self, BROADCAST_MACHINE_ID};

/// Number of fields (and wire bytes) in one instruction.
pub const FRAME_LEN: usize = 4;

/// An immutable Protocol 2000 instruction: a command plus three 7-bit
/// fields.
///
/// Equality is structural over [`frame()`](Instruction::frame), so a
/// request and the device's echo of it compare equal.
///
/// # Example
///
/// ```
/// use p2k_core::{Command, Instruction};
///
/// let query = Instruction::query(Command::QueryPanelLock);
/// assert_eq!(query.frame(), [31, 0, 0, 0x41]);
///
/// let switch = Instruction::new(Command::SwitchVideo, Some(3), Some(1), Some(1)).unwrap();
/// assert_eq!(switch.frame(), [1, 3, 1, 1]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    command: CommandId,
    input_value: u8,
    output_value: u8,
    machine_id: u8,
}

impl Instruction {
    /// Build an instruction, validating each field.
    ///
    /// `input_value` and `output_value` default to `0`; `machine_id`
    /// defaults to [`BROADCAST_MACHINE_ID`]. Any field outside `0..128`
    /// fails with [`Error::OutOfRange`](crate::Error::OutOfRange).
    pub fn new(
        command: impl Into<CommandId>,
        input_value: Option<i64>,
        output_value: Option<i64>,
        machine_id: Option<i64>,
    ) -> Result<Self> {
        Ok(Instruction {
            command: command.into(),
            input_value: value::validate(input_value, 0)?,
            output_value: value::validate(output_value, 0)?,
            machine_id: value::validate(machine_id, BROADCAST_MACHINE_ID)?,
        })
    }

    /// Build an instruction from a symbolic command name.
    ///
    /// Unknown names fail with
    /// [`Error::UnsupportedCommand`](crate::Error::UnsupportedCommand).
    pub fn named(
        name: &str,
        input_value: Option<i64>,
        output_value: Option<i64>,
        machine_id: Option<i64>,
    ) -> Result<Self> {
        Instruction::new(
            CommandId::from_name(name)?,
            input_value,
            output_value,
            machine_id,
        )
    }

    /// Build an instruction from a raw 4-field frame `[id, input, output, machine_id]`.
    ///
    /// Unknown ids are kept as [`CommandId::Unsupported`].
    pub fn from_frame(frame: [i64; FRAME_LEN]) -> Result<Self> {
        let [id, input, output, machine_id] = frame;
        Instruction::new(
            CommandId::from_id(id)?,
            Some(input),
            Some(output),
            Some(machine_id),
        )
    }

    /// A broadcast instruction with both value fields zero.
    pub fn query(command: Command) -> Self {
        Instruction {
            command: CommandId::Known(command),
            input_value: 0,
            output_value: 0,
            machine_id: BROADCAST_MACHINE_ID,
        }
    }

    /// The resolved command identity.
    pub fn command(&self) -> CommandId {
        self.command
    }

    /// Numeric command identifier.
    pub fn id(&self) -> u8 {
        self.command.id()
    }

    /// Symbolic command name, or `"UNSUPPORTED"`.
    pub fn name(&self) -> &'static str {
        self.command.name()
    }

    /// Returns `true` if the command identity is in the known set.
    pub fn is_supported(&self) -> bool {
        self.command.is_supported()
    }

    pub fn input_value(&self) -> u8 {
        self.input_value
    }

    pub fn output_value(&self) -> u8 {
        self.output_value
    }

    pub fn machine_id(&self) -> u8 {
        self.machine_id
    }

    /// The ordered fields `[id, input, output, machine_id]`.
    pub fn frame(&self) -> [u8; FRAME_LEN] {
        [
            self.id(),
            self.input_value,
            self.output_value,
            self.machine_id,
        ]
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.frame() == other.frame()
    }
}

impl Eq for Instruction {}

impl Hash for Instruction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.frame().hash(state);
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Instruction id: {} name: {} input: {} output: {} machine_id: {}>",
            self.id(),
            self.name(),
            self.input_value,
            self.output_value,
            self.machine_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::UNSUPPORTED_NAME;
    use crate::error::Error;

    #[test]
    fn defaults() {
        let ins = Instruction::new(Command::QueryPanelLock, None, None, None).unwrap();
        assert_eq!(ins.input_value(), 0);
        assert_eq!(ins.output_value(), 0);
        assert_eq!(ins.machine_id(), BROADCAST_MACHINE_ID);
        assert_eq!(ins, Instruction::query(Command::QueryPanelLock));
    }

    #[test]
    fn each_field_rejects_128() {
        let cmd = Command::SwitchVideo;
        assert!(matches!(
            Instruction::new(cmd, Some(128), None, None),
            Err(Error::OutOfRange { value: 128, .. })
        ));
        assert!(matches!(
            Instruction::new(cmd, Some(1), Some(128), None),
            Err(Error::OutOfRange { value: 128, .. })
        ));
        assert!(matches!(
            Instruction::new(cmd, Some(1), Some(1), Some(128)),
            Err(Error::OutOfRange { value: 128, .. })
        ));
    }

    #[test]
    fn each_field_accepts_0_and_127() {
        let low = Instruction::new(Command::SwitchAudio, Some(0), Some(0), Some(0)).unwrap();
        assert_eq!(low.frame(), [2, 0, 0, 0]);
        let high = Instruction::new(Command::SwitchAudio, Some(127), Some(127), Some(127)).unwrap();
        assert_eq!(high.frame(), [2, 127, 127, 127]);
    }

    #[test]
    fn negative_values_are_rejected() {
        assert!(Instruction::new(Command::SwitchVideo, Some(-1), None, None).is_err());
    }

    #[test]
    fn frame_preserves_field_order() {
        let ins = Instruction::new(Command::DefineMachine, Some(2), Some(1), Some(7)).unwrap();
        assert_eq!(ins.frame(), [62, 2, 1, 7]);
    }

    #[test]
    fn unsupported_id_is_carried_through() {
        let ins = Instruction::from_frame([99, 1, 2, 3]).unwrap();
        assert!(!ins.is_supported());
        assert_eq!(ins.name(), UNSUPPORTED_NAME);
        assert_eq!(ins.id(), 99);
        assert_eq!(ins.frame(), [99, 1, 2, 3]);
    }

    #[test]
    fn named_constructor() {
        let ins = Instruction::named("PANEL_LOCK", Some(1), None, None).unwrap();
        assert_eq!(ins.command(), CommandId::Known(Command::PanelLock));
        assert!(matches!(
            Instruction::named("NOPE", None, None, None),
            Err(Error::UnsupportedCommand(_))
        ));
    }

    #[test]
    fn equality_is_structural() {
        let a = Instruction::new(Command::SwitchVideo, Some(3), Some(1), None).unwrap();
        let b = Instruction::from_frame([1, 3, 1, 0x41]).unwrap();
        let c = Instruction::new(Command::SwitchVideo, Some(3), Some(2), None).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_names_fields() {
        let ins = Instruction::query(Command::QueryPanelLock);
        assert_eq!(
            ins.to_string(),
            "<Instruction id: 31 name: QUERY_PANEL_LOCK input: 0 output: 0 machine_id: 65>"
        );
    }
}
