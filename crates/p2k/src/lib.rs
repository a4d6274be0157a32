//! Protocol 2000 client for video/audio switches and matrices.
//!
//! This crate speaks the 4-byte Protocol 2000 frame format and keeps a
//! cached model of the remote device in sync with it. It provides:
//!
//! - **Frame codec** ([`codec`]) -- encode and decode 4-byte frames,
//!   including the response-bit normalization of command ids.
//! - **TransportDevice** ([`io`]) -- a [`Device`](p2k_core::Device) that
//!   runs batched request/response exchanges over any
//!   [`Transport`](p2k_core::Transport).
//! - **State reducer** ([`state`]) -- folds response instructions into the
//!   cached panel state and a pluggable [`Topology`].
//! - **Engines** ([`engine`], [`switch`], [`matrix`]) -- a media switch, a
//!   per-output switch, and a routing matrix that polls each output in turn.
//! - **P2kBuilder** ([`builder`]) -- fluent configuration of machine id,
//!   endpoint and timeouts.
//!
//! # Example
//!
//! ```
//! use p2k::codec::{decode, encode};
//! use p2k_core::{Command, Instruction};
//!
//! // Query the panel lock of every machine on the link.
//! let query = Instruction::query(Command::QueryPanelLock);
//! assert_eq!(encode(&query), [0x1f, 0x80, 0x80, 0xc1]);
//!
//! // The device answers "locked" with the response bit set in the id.
//! let answer = decode(&[0x5f, 0x80, 0x81, 0xc1]).unwrap();
//! assert_eq!(answer.name(), "QUERY_PANEL_LOCK");
//! assert_eq!(answer.output_value(), 1);
//! ```

pub mod builder;
pub mod codec;
pub mod engine;
pub mod io;
pub mod matrix;
pub mod state;
pub mod switch;

pub use builder::P2kBuilder;
pub use engine::Engine;
pub use io::TransportDevice;
pub use matrix::{Matrix, MediaMatrix};
pub use state::{Fold, PanelState, State, Topology};
pub use switch::{MediaSwitch, OutputSwitch, Signals, Switch};
