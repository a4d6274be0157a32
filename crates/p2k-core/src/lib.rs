//! p2k-core: Core traits, types, and error definitions for p2k.
//!
//! This crate defines the topology-agnostic pieces of the Protocol 2000
//! stack. The codec and the state engines in `p2k`, the transports in
//! `p2k-transport`, and the mocks in `p2k-test-harness` all build on it.
//!
//! # Key types
//!
//! - [`Instruction`] -- one protocol exchange unit
//! - [`Command`] / [`CommandId`] -- the command registry
//! - [`value`] -- the 7-bit value validator
//! - [`Device`] -- instruction-level request/response link
//! - [`Transport`] -- byte-level communication channel
//! - [`Error`] / [`Result`] -- error handling

pub mod command;
pub mod device;
pub mod error;
pub mod instruction;
pub mod transport;
pub mod value;

pub use command::{Command, CommandId, UNSUPPORTED_NAME};
pub use device::{shared, Device, SharedDevice};
pub use error::{Error, Result};
pub use instruction::{Instruction, FRAME_LEN};
pub use transport::Transport;
pub use value::BROADCAST_MACHINE_ID;
