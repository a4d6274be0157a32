//! Command registry: symbolic names and numeric Protocol 2000 identifiers.
//!
//! The registry is deliberately asymmetric. A command *name* only ever
//! comes from program code, so an unknown name is an error. A numeric id
//! may come from a device, which can echo or emit identifiers this library
//! does not model, so an unknown id is carried as
//! [`CommandId::Unsupported`] with its raw value preserved.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::value;

/// Name reported for identifiers outside the known set.
pub const UNSUPPORTED_NAME: &str = "UNSUPPORTED";

/// The Protocol 2000 commands this library models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Command {
    /// Route a video input to an output.
    SwitchVideo = 1,
    /// Route an audio input to an output.
    SwitchAudio = 2,
    /// Ask which input is routed to a video output.
    QueryOutputStatus = 5,
    /// Ask which input is routed to an audio output.
    QueryAudioOutputStatus = 6,
    /// Lock (`1`) or unlock (`0`) the front panel.
    PanelLock = 30,
    /// Ask whether the front panel is locked.
    QueryPanelLock = 31,
    /// Ask the machine to identify itself (model / firmware).
    IdentifyMachine = 61,
    /// Ask for machine dimensions (`1` = input count, `2` = output count).
    DefineMachine = 62,
}

impl Command {
    /// Every known command, in id order.
    pub const ALL: [Command; 8] = [
        Command::SwitchVideo,
        Command::SwitchAudio,
        Command::QueryOutputStatus,
        Command::QueryAudioOutputStatus,
        Command::PanelLock,
        Command::QueryPanelLock,
        Command::IdentifyMachine,
        Command::DefineMachine,
    ];

    /// Numeric identifier on the wire.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Canonical symbolic name.
    pub fn name(self) -> &'static str {
        match self {
            Command::SwitchVideo => "SWITCH_VIDEO",
            Command::SwitchAudio => "SWITCH_AUDIO",
            Command::QueryOutputStatus => "QUERY_OUTPUT_STATUS",
            Command::QueryAudioOutputStatus => "QUERY_AUDIO_OUTPUT_STATUS",
            Command::PanelLock => "PANEL_LOCK",
            Command::QueryPanelLock => "QUERY_PANEL_LOCK",
            Command::IdentifyMachine => "IDENTIFY_MACHINE",
            Command::DefineMachine => "DEFINE_MACHINE",
        }
    }

    /// Look up a known command by numeric id.
    pub fn from_id(id: u8) -> Option<Command> {
        Command::ALL.iter().copied().find(|c| c.id() == id)
    }

    /// Returns `true` if `id` names a known command.
    pub fn is_supported(id: u8) -> bool {
        Command::from_id(id).is_some()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "SWITCH_VIDEO" => Ok(Command::SwitchVideo),
            "SWITCH_AUDIO" => Ok(Command::SwitchAudio),
            "QUERY_OUTPUT_STATUS" | "QUERY_VIDEO_OUTPUT_STATUS" => Ok(Command::QueryOutputStatus),
            "QUERY_AUDIO_OUTPUT_STATUS" => Ok(Command::QueryAudioOutputStatus),
            "PANEL_LOCK" => Ok(Command::PanelLock),
            "QUERY_PANEL_LOCK" => Ok(Command::QueryPanelLock),
            "IDENTIFY_MACHINE" => Ok(Command::IdentifyMachine),
            "DEFINE_MACHINE" => Ok(Command::DefineMachine),
            _ => Err(Error::UnsupportedCommand(s.to_string())),
        }
    }
}

/// A resolved command identity: either a known command or a raw id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    /// An identifier from the known set.
    Known(Command),
    /// An identifier outside the known set, value preserved.
    Unsupported(u8),
}

impl CommandId {
    /// Resolve a numeric id. Unknown ids resolve to [`CommandId::Unsupported`].
    ///
    /// Fails with [`Error::OutOfRange`] only if `id` does not fit the 7-bit
    /// value domain.
    pub fn from_id(id: i64) -> Result<CommandId> {
        let id = value::check(id)?;
        Ok(Command::from_id(id)
            .map(CommandId::Known)
            .unwrap_or(CommandId::Unsupported(id)))
    }

    /// Resolve a symbolic name. Unknown names fail with
    /// [`Error::UnsupportedCommand`].
    pub fn from_name(name: &str) -> Result<CommandId> {
        name.parse::<Command>().map(CommandId::Known)
    }

    /// Numeric identifier on the wire.
    pub fn id(&self) -> u8 {
        match self {
            CommandId::Known(cmd) => cmd.id(),
            CommandId::Unsupported(id) => *id,
        }
    }

    /// Symbolic name, or `"UNSUPPORTED"`.
    pub fn name(&self) -> &'static str {
        match self {
            CommandId::Known(cmd) => cmd.name(),
            CommandId::Unsupported(_) => UNSUPPORTED_NAME,
        }
    }

    /// Returns `true` for identifiers from the known set.
    pub fn is_supported(&self) -> bool {
        matches!(self, CommandId::Known(_))
    }

    /// The known command, if any.
    pub fn command(&self) -> Option<Command> {
        match self {
            CommandId::Known(cmd) => Some(*cmd),
            CommandId::Unsupported(_) => None,
        }
    }
}

impl From<Command> for CommandId {
    fn from(cmd: Command) -> Self {
        CommandId::Known(cmd)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}
