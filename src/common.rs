//! Register framing and touch-data decoding.
//!
//! This module contains the wire-level pieces shared by the sync and async
//! drivers: frame assembly for register writes and the decoder for the
//! 7-byte touch-data window.

use heapless::Vec;

use crate::{TouchPoint, TouchSample, MAX_TOUCHES};

// Register addresses
/// Touch data: status/count byte plus coordinate bytes. Written with the
/// acknowledgement byte once an event has been consumed.
pub(crate) const REG_TOUCH_DATA: u16 = 0xD000;
/// Chip identity. A zero-length write here doubles as a liveness probe.
pub(crate) const REG_CHIP_ID: u16 = 0xD109;

/// Acknowledgement byte written back to the touch-data register.
pub(crate) const TOUCH_ACK: u8 = 0xAB;

/// Event flag inside the status byte. Shares the low nibble with the touch
/// count and is masked out of it.
const EVENT_FLAG: u8 = 0x04;

/// Low nibble of the status byte carries the touch count.
const TOUCH_COUNT_MASK: u8 = 0x0F;

/// Length of one touch-data read.
pub(crate) const TOUCH_DATA_LEN: usize = 7;

/// Register frames carry a 2-byte address plus at most 30 payload bytes.
pub(crate) const FRAME_CAPACITY: usize = 32;

/// Hold the reset line low for this long.
pub(crate) const RESET_PULSE_MS: u32 = 2;

/// Boot time the chip needs after the reset line is released.
pub(crate) const BOOT_DELAY_MS: u32 = 50;

/// Assemble a register write frame: the big-endian register address followed
/// by the payload, unmodified.
///
/// Returns `None` when the frame would not fit; nothing is ever truncated.
pub(crate) fn write_frame(register: u16, payload: &[u8]) -> Option<([u8; FRAME_CAPACITY], usize)> {
    let len = payload.len() + 2;
    if len > FRAME_CAPACITY {
        return None;
    }

    let mut frame = [0u8; FRAME_CAPACITY];
    frame[..2].copy_from_slice(&register.to_be_bytes());
    frame[2..len].copy_from_slice(payload);
    Some((frame, len))
}

/// Decode one touch-data read.
///
/// Returns `None` when the buffer carries no new touch data: event bit
/// clear, zero touches, or a touch count beyond what the controller can
/// report.
pub(crate) fn touch_sample_from_buf(buf: &[u8; TOUCH_DATA_LEN]) -> Option<TouchSample> {
    let num_touches = touch_count_from_status(buf[0]);
    if !event_from_status(buf[0]) || num_touches == 0 || num_touches as usize > MAX_TOUCHES {
        return None;
    }

    let mut points = Vec::new();
    for slot in 0..num_touches {
        // The 7-byte window holds a single coordinate pair, so every
        // reported slot decodes to the same position until the register map
        // gains per-slot coordinates.
        let point = TouchPoint {
            slot,
            x: x_from_buf(buf),
            y: y_from_buf(buf),
        };
        // Capacity is MAX_TOUCHES and num_touches was range-checked above.
        let _ = points.push(point);
    }

    Some(TouchSample { points })
}

/// Extracts the event flag (bit 2) from the status byte.
fn event_from_status(status: u8) -> bool {
    status & EVENT_FLAG != 0
}

/// Extracts the touch count from the status byte, without the event flag
/// that occupies bit 2 of the same nibble.
fn touch_count_from_status(status: u8) -> u8 {
    status & TOUCH_COUNT_MASK & !EVENT_FLAG
}

/// Extracts the 12-bit x coordinate: high byte, then the high nibble of the
/// shared low byte.
fn x_from_buf(buf: &[u8; TOUCH_DATA_LEN]) -> u16 {
    (u16::from(buf[1]) << 4) | u16::from((buf[3] >> 4) & 0x0F)
}

/// Extracts the 12-bit y coordinate: high byte, then the low nibble of the
/// shared low byte.
fn y_from_buf(buf: &[u8; TOUCH_DATA_LEN]) -> u16 {
    (u16::from(buf[2]) << 4) | u16::from(buf[3] & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_starts_with_big_endian_address() {
        let (frame, len) = write_frame(0xD000, &[0xAB]).unwrap();
        assert_eq!(len, 3);
        assert_eq!(&frame[..len], &[0xD0, 0x00, 0xAB]);
    }

    #[test]
    fn frame_carries_payload_unmodified() {
        let payload = [0x01, 0x02, 0x03, 0x04, 0x05];
        let (frame, len) = write_frame(0x1234, &payload).unwrap();
        assert_eq!(len, payload.len() + 2);
        assert_eq!(&frame[..2], &[0x12, 0x34]);
        assert_eq!(&frame[2..len], &payload);
    }

    #[test]
    fn frame_allows_empty_payload() {
        // Address-only frames are how the chip gets probed.
        let (frame, len) = write_frame(REG_CHIP_ID, &[]).unwrap();
        assert_eq!(len, 2);
        assert_eq!(&frame[..len], &[0xD1, 0x09]);
    }

    #[test]
    fn frame_rejects_oversized_payload() {
        let payload = [0u8; FRAME_CAPACITY - 1];
        assert!(write_frame(0xD000, &payload).is_none());
        // The largest payload that still fits alongside the address.
        assert!(write_frame(0xD000, &payload[..FRAME_CAPACITY - 2]).is_some());
    }

    #[test]
    fn decodes_single_touch() {
        let buf = [0x05, 0x12, 0x34, 0x56, 0x00, 0x00, 0x00];
        let sample = touch_sample_from_buf(&buf).unwrap();

        assert_eq!(sample.count(), 1);
        let point = sample.first().unwrap();
        assert_eq!(point.slot, 0);
        assert_eq!(point.x, 0x125);
        assert_eq!(point.y, 0x346);
    }

    #[test]
    fn event_without_touches_yields_nothing() {
        // Event bit set, count zero.
        let buf = [0x04, 0x12, 0x34, 0x56, 0x00, 0x00, 0x00];
        assert!(touch_sample_from_buf(&buf).is_none());
    }

    #[test]
    fn touches_without_event_yield_nothing() {
        // Count of three but no event bit.
        let buf = [0x03, 0x12, 0x34, 0x56, 0x00, 0x00, 0x00];
        assert!(touch_sample_from_buf(&buf).is_none());
    }

    #[test]
    fn out_of_range_count_yields_nothing() {
        // A count field beyond what the controller can report.
        let buf = [0x0F, 0x12, 0x34, 0x56, 0x00, 0x00, 0x00];
        assert!(touch_sample_from_buf(&buf).is_none());
    }

    #[test]
    fn every_slot_decodes_the_same_window() {
        // Three reported slots, one coordinate pair in the window.
        let buf = [0x07, 0xFF, 0x80, 0xA5, 0x00, 0x00, 0x00];
        let sample = touch_sample_from_buf(&buf).unwrap();

        assert_eq!(sample.count(), 3);
        for (i, point) in sample.points.iter().enumerate() {
            assert_eq!(point.slot, i as u8);
            assert_eq!(point.x, 0xFFA);
            assert_eq!(point.y, 0x805);
        }
    }

    #[test]
    fn coordinates_are_twelve_bit() {
        let buf = [0x05, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00];
        let point = touch_sample_from_buf(&buf).unwrap().first().unwrap();
        assert_eq!(point.x, 0xFFF);
        assert_eq!(point.y, 0xFFF);
    }
}
