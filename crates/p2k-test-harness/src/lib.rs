//! p2k-test-harness: Test utilities and mocks for p2k.
//!
//! - [`MockTransport`] -- scripted byte-level [`Transport`](p2k_core::Transport)
//! - [`MockDevice`] -- scripted instruction-level [`Device`](p2k_core::Device)
//! - [`MockTcpServer`] -- scripted TCP peer for end-to-end tests

pub mod mock_device;
pub mod mock_tcp;
pub mod mock_transport;

pub use mock_device::MockDevice;
pub use mock_tcp::MockTcpServer;
pub use mock_transport::MockTransport;
