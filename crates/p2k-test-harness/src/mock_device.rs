//! Mock device for testing state engines at the instruction level.
//!
//! [`MockDevice`] implements [`Device`] with pre-loaded batches: each
//! expected request batch is paired with the response batch the device
//! returns. Engine tests use it to script a switch without going through
//! the byte codec.
//!
//! # Example
//!
//! ```
//! use p2k_core::{Command, Instruction};
//! use p2k_test_harness::MockDevice;
//!
//! let mut device = MockDevice::new();
//! let query = Instruction::query(Command::QueryPanelLock);
//! let locked = Instruction::new(Command::QueryPanelLock, None, Some(1), None).unwrap();
//! device.expect(vec![query], vec![locked]);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use p2k_core::device::Device;
use p2k_core::error::{Error, Result};
use p2k_core::instruction::Instruction;

#[derive(Debug, Clone)]
struct Exchange {
    requests: Vec<Instruction>,
    responses: Vec<Instruction>,
}

#[derive(Debug, Default)]
struct Inner {
    exchanges: VecDeque<Exchange>,
    log: Vec<Vec<Instruction>>,
    closed: bool,
}

/// A scripted [`Device`].
///
/// Batches are consumed in order. A `process()` call whose batch differs
/// from the next expected one fails with [`Error::Protocol`]. The mock is
/// cheap to clone; clones share the script and the log, so a test can keep
/// a handle after moving the device into an engine.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    inner: Arc<Mutex<Inner>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expected request batch and the responses to return for it.
    pub fn expect(&mut self, requests: Vec<Instruction>, responses: Vec<Instruction>) {
        self.lock().exchanges.push_back(Exchange {
            requests,
            responses,
        });
    }

    /// Every batch passed to `process()`, in call order.
    pub fn processed(&self) -> Vec<Vec<Instruction>> {
        self.lock().log.clone()
    }

    /// Number of scripted exchanges not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.lock().exchanges.len()
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Device for MockDevice {
    async fn process(&mut self, instructions: &[Instruction]) -> Result<Vec<Instruction>> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(Error::NotConnected);
        }
        inner.log.push(instructions.to_vec());

        let exchange = inner
            .exchanges
            .pop_front()
            .ok_or_else(|| Error::Protocol("no more expectations in mock device".into()))?;
        if exchange.requests != instructions {
            return Err(Error::Protocol(format!(
                "unexpected batch: expected {:?}, got {:?}",
                exchange
                    .requests
                    .iter()
                    .map(Instruction::frame)
                    .collect::<Vec<_>>(),
                instructions
                    .iter()
                    .map(Instruction::frame)
                    .collect::<Vec<_>>()
            )));
        }
        Ok(exchange.responses)
    }

    async fn close(&mut self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2k_core::Command;

    fn panel_query() -> Instruction {
        Instruction::query(Command::QueryPanelLock)
    }

    fn panel_locked() -> Instruction {
        Instruction::new(Command::QueryPanelLock, None, Some(1), None).unwrap()
    }

    #[tokio::test]
    async fn scripted_batch() {
        let mut device = MockDevice::new();
        device.expect(vec![panel_query()], vec![panel_locked()]);
        let handle = device.clone();

        let responses = device.process(&[panel_query()]).await.unwrap();
        assert_eq!(responses, vec![panel_locked()]);
        assert_eq!(handle.processed(), vec![vec![panel_query()]]);
        assert_eq!(handle.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn process_one_unwraps_single_response() {
        let mut device = MockDevice::new();
        device.expect(vec![panel_query()], vec![panel_locked()]);
        let response = device.process_one(panel_query()).await.unwrap();
        assert_eq!(response.output_value(), 1);
    }

    #[tokio::test]
    async fn wrong_batch_fails() {
        let mut device = MockDevice::new();
        device.expect(vec![panel_query()], vec![panel_locked()]);
        let other = Instruction::query(Command::DefineMachine);
        assert!(matches!(
            device.process(&[other]).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn closed_device_refuses() {
        let mut device = MockDevice::new();
        device.close().await.unwrap();
        assert!(device.is_closed());
        assert!(matches!(
            device.process(&[panel_query()]).await,
            Err(Error::NotConnected)
        ));
    }
}
