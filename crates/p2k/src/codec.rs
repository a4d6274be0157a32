//! Protocol 2000 frame encoder/decoder.
//!
//! Every instruction travels as exactly four bytes. This module handles the
//! pure byte-level conversion; it performs no I/O.
//!
//! # Frame format
//!
//! ```text
//! <cmd> <0x80|input> <0x80|output> <0x80|machine>
//! ```
//!
//! - `cmd`: the 7-bit command id. Bit 7 is clear, marking the start of a
//!   frame. A device answers with bit 6 set (`response = request ^ 0x40`).
//! - `input`, `output`, `machine`: 7-bit values with bit 7 forced to `1`.

use bytes::{BufMut, BytesMut};
use p2k_core::command::Command;
use p2k_core::error::{Error, Result};
use p2k_core::instruction::{Instruction, FRAME_LEN};

/// Bit forced on every value byte.
pub const VALUE_FLAG: u8 = 0b1000_0000;

/// Bit a device flips in the command byte of its response.
pub const RESPONSE_FLAG: u8 = 0b0100_0000;

/// Encode one instruction into its 4-byte wire form.
///
/// # Example
///
/// ```
/// use p2k::codec::encode;
/// use p2k_core::{Command, Instruction};
///
/// let bytes = encode(&Instruction::query(Command::QueryPanelLock));
/// assert_eq!(bytes, [0x1f, 0x80, 0x80, 0xc1]);
/// ```
pub fn encode(instruction: &Instruction) -> [u8; FRAME_LEN] {
    let [id, input, output, machine_id] = instruction.frame();
    [
        id,
        encode_value(input),
        encode_value(output),
        encode_value(machine_id),
    ]
}

/// Encode a batch of instructions back to back, ready for one write.
pub fn encode_batch(instructions: &[Instruction]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(instructions.len() * FRAME_LEN);
    for instruction in instructions {
        buf.put_slice(&encode(instruction));
    }
    buf.to_vec()
}

/// Decode one 4-byte frame, request or response form.
///
/// A command byte that is not a known id is taken to be a response id and
/// has [`RESPONSE_FLAG`] flipped back. Value bytes have [`VALUE_FLAG`]
/// stripped. Input that is not exactly four bytes fails with
/// [`Error::MalformedFrame`]; bytes that decode outside the 7-bit domain
/// fail with [`Error::OutOfRange`].
///
/// # Example
///
/// ```
/// use p2k::codec::decode;
/// use p2k_core::{Command, Instruction};
///
/// let response = decode(&[0x5f, 0x80, 0x80, 0xc1]).unwrap();
/// assert_eq!(response, Instruction::query(Command::QueryPanelLock));
/// ```
pub fn decode(data: &[u8]) -> Result<Instruction> {
    let frame: [u8; FRAME_LEN] = data.try_into().map_err(|_| Error::MalformedFrame {
        expected: FRAME_LEN,
        actual: data.len(),
    })?;
    let [cmd, input, output, machine_id] = frame;
    Instruction::from_frame([
        i64::from(decode_command_id(cmd)),
        i64::from(decode_value(input)),
        i64::from(decode_value(output)),
        i64::from(decode_value(machine_id)),
    ])
}

/// Decode a buffer holding whole frames back to back.
pub fn decode_batch(data: &[u8]) -> Result<Vec<Instruction>> {
    if data.len() % FRAME_LEN != 0 {
        return Err(Error::MalformedFrame {
            expected: (data.len() / FRAME_LEN + 1) * FRAME_LEN,
            actual: data.len(),
        });
    }
    data.chunks_exact(FRAME_LEN).map(decode).collect()
}

fn encode_value(value: u8) -> u8 {
    VALUE_FLAG | value
}

fn decode_value(byte: u8) -> u8 {
    byte ^ VALUE_FLAG
}

fn decode_command_id(byte: u8) -> u8 {
    if Command::is_supported(byte) {
        byte
    } else {
        byte ^ RESPONSE_FLAG
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2k_core::command::CommandId;

    const REQUEST: [u8; 4] = [0x1f, 0x80, 0x80, 0xc1];
    const RESPONSE: [u8; 4] = [0x5f, 0x80, 0x80, 0xc1];

    #[test]
    fn encode_query_panel_lock() {
        assert_eq!(encode(&Instruction::query(Command::QueryPanelLock)), REQUEST);
    }

    #[test]
    fn decode_request_bytes() {
        let ins = decode(&REQUEST).unwrap();
        assert_eq!(ins.id(), 31);
        assert_eq!(ins.input_value(), 0);
        assert_eq!(ins.output_value(), 0);
        assert_eq!(ins.machine_id(), 0x41);
    }

    #[test]
    fn decode_response_bytes_normalizes_id() {
        assert_eq!(decode(&RESPONSE).unwrap(), decode(&REQUEST).unwrap());
    }

    #[test]
    fn decode_then_encode_returns_request_bytes() {
        assert_eq!(encode(&decode(&REQUEST).unwrap()), REQUEST);
    }

    #[test]
    fn encode_then_decode_known_commands() {
        for cmd in Command::ALL {
            let ins = Instruction::new(cmd, Some(7), Some(3), Some(1)).unwrap();
            assert_eq!(decode(&encode(&ins)).unwrap(), ins, "{cmd}");
        }
    }

    #[test]
    fn value_bytes_keep_full_range() {
        let ins = Instruction::new(Command::SwitchVideo, Some(127), Some(0), Some(127)).unwrap();
        let bytes = encode(&ins);
        assert_eq!(bytes, [0x01, 0xff, 0x80, 0xff]);
        assert_eq!(decode(&bytes).unwrap(), ins);
    }

    #[test]
    fn response_to_switch_video() {
        // 0x41 is SWITCH_VIDEO with the response bit set: input 3 -> output 1.
        let ins = decode(&[0x41, 0x83, 0x81, 0x81]).unwrap();
        assert_eq!(ins.command(), CommandId::Known(Command::SwitchVideo));
        assert_eq!(ins.input_value(), 3);
        assert_eq!(ins.output_value(), 1);
        assert_eq!(ins.machine_id(), 1);
    }

    #[test]
    fn unknown_response_id_is_unsupported() {
        // 0x50 ^ 0x40 = 16, not in the registry.
        let ins = decode(&[0x50, 0x80, 0x80, 0x81]).unwrap();
        assert!(!ins.is_supported());
        assert_eq!(ins.id(), 16);
    }

    #[test]
    fn wrong_length_is_malformed() {
        assert!(matches!(
            decode(&[0x1f, 0x80, 0x80]),
            Err(Error::MalformedFrame {
                expected: 4,
                actual: 3
            })
        ));
        assert!(matches!(
            decode(&[0x1f, 0x80, 0x80, 0xc1, 0x00]),
            Err(Error::MalformedFrame { actual: 5, .. })
        ));
    }

    #[test]
    fn value_byte_without_flag_is_out_of_range() {
        assert!(matches!(
            decode(&[0x1f, 0x00, 0x80, 0xc1]),
            Err(Error::OutOfRange { value: 128, .. })
        ));
    }

    #[test]
    fn command_byte_with_flag_is_out_of_range() {
        assert!(matches!(
            decode(&[0x9f, 0x80, 0x80, 0xc1]),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn batch_round_trip() {
        let batch = vec![
            Instruction::new(Command::DefineMachine, Some(1), Some(1), None).unwrap(),
            Instruction::query(Command::QueryPanelLock),
        ];
        let bytes = encode_batch(&batch);
        assert_eq!(bytes, [0x3e, 0x81, 0x81, 0xc1, 0x1f, 0x80, 0x80, 0xc1]);
        assert_eq!(decode_batch(&bytes).unwrap(), batch);
    }

    #[test]
    fn batch_with_partial_frame_is_malformed() {
        assert!(matches!(
            decode_batch(&[0x1f, 0x80, 0x80, 0xc1, 0x1f]),
            Err(Error::MalformedFrame { actual: 5, .. })
        ));
    }
}
