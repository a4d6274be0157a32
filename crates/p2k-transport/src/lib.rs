//! Transport implementations for p2k.
//!
//! This crate provides concrete implementations of the
//! [`Transport`](p2k_core::Transport) trait from `p2k-core`:
//!
//! - [`TcpTransport`]: raw TCP connection to a network-attached switcher
//!
//! # Example
//!
//! ```no_run
//! use p2k_transport::{endpoint, TcpTransport, DEFAULT_CONNECT_TIMEOUT};
//!
//! # async fn example() -> p2k_core::Result<()> {
//! let transport =
//!     TcpTransport::connect(&endpoint("192.168.1.39", None), DEFAULT_CONNECT_TIMEOUT).await?;
//! # Ok(())
//! # }
//! ```

pub mod tcp;

pub use tcp::{endpoint, TcpTransport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
