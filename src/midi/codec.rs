// Standard MIDI File encoding primitives
// Variable-length quantities, chunk framing, and the channel status bytes

/// Pitch-bend value for "no bend"
pub const PITCH_BEND_CENTER: u16 = 8192;

/// Largest 14-bit pitch-bend value
pub const PITCH_BEND_MAX: u16 = 16383;

pub const STATUS_NOTE_OFF: u8 = 0x80;
pub const STATUS_NOTE_ON: u8 = 0x90;
pub const STATUS_CONTROL_CHANGE: u8 = 0xB0;
pub const STATUS_PITCH_BEND: u8 = 0xE0;

pub const CC_DATA_ENTRY_MSB: u8 = 0x06;
pub const CC_RPN_LSB: u8 = 0x64;
pub const CC_RPN_MSB: u8 = 0x65;

const META: u8 = 0xFF;
const META_TEMPO: u8 = 0x51;
const META_END_OF_TRACK: u8 = 0x2F;

/// Largest value representable in four VLQ bytes
pub const VLQ_MAX: u32 = 0x0FFF_FFFF;

/// Append a MIDI variable-length quantity
///
/// Seven bits per byte, most significant group first, continuation bit on
/// every byte but the last. Values above `VLQ_MAX` are saturated.
pub fn write_vlq(out: &mut Vec<u8>, value: u32) {
    let value = value.min(VLQ_MAX);
    let mut groups = [0u8; 4];
    let mut count = 0;
    let mut rest = value;
    loop {
        groups[count] = (rest & 0x7F) as u8;
        count += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }

    for i in (0..count).rev() {
        let continuation = if i > 0 { 0x80 } else { 0x00 };
        out.push(groups[i] | continuation);
    }
}

/// Append a chunk: 4-byte tag, big-endian u32 length, body
pub fn write_chunk(out: &mut Vec<u8>, tag: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
}

/// Append the `MThd` header chunk
pub fn write_header(out: &mut Vec<u8>, format: u16, track_count: u16, ticks_per_beat: u16) {
    let mut body = Vec::with_capacity(6);
    body.extend_from_slice(&format.to_be_bytes());
    body.extend_from_slice(&track_count.to_be_bytes());
    body.extend_from_slice(&ticks_per_beat.to_be_bytes());
    write_chunk(out, b"MThd", &body);
}

/// Tempo meta event body (after the delta)
pub fn tempo_event(microseconds_per_beat: u32) -> [u8; 6] {
    let us = microseconds_per_beat.min(0x00FF_FFFF);
    [META, META_TEMPO, 0x03, (us >> 16) as u8, (us >> 8) as u8, us as u8]
}

pub fn end_of_track_event() -> [u8; 3] {
    [META, META_END_OF_TRACK, 0x00]
}

pub fn note_on_event(channel: u8, key: u8, velocity: u8) -> [u8; 3] {
    [STATUS_NOTE_ON | (channel & 0x0F), key & 0x7F, velocity & 0x7F]
}

/// Note-off with release velocity 0
pub fn note_off_event(channel: u8, key: u8) -> [u8; 3] {
    [STATUS_NOTE_OFF | (channel & 0x0F), key & 0x7F, 0x00]
}

pub fn control_change_event(channel: u8, controller: u8, value: u8) -> [u8; 3] {
    [STATUS_CONTROL_CHANGE | (channel & 0x0F), controller & 0x7F, value & 0x7F]
}

/// Pitch bend clamped to 14 bits, LSB first
pub fn pitch_bend_event(channel: u8, value: i32) -> [u8; 3] {
    let clamped = value.clamp(0, PITCH_BEND_MAX as i32) as u16;
    [
        STATUS_PITCH_BEND | (channel & 0x0F),
        (clamped & 0x7F) as u8,
        ((clamped >> 7) & 0x7F) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        write_vlq(&mut out, value);
        out
    }

    #[test]
    fn test_vlq_boundaries() {
        assert_eq!(vlq(0), vec![0x00]);
        assert_eq!(vlq(0x7F), vec![0x7F]);
        assert_eq!(vlq(0x80), vec![0x81, 0x00]);
        assert_eq!(vlq(480), vec![0x83, 0x60]);
        assert_eq!(vlq(0x3FFF), vec![0xFF, 0x7F]);
        assert_eq!(vlq(0x4000), vec![0x81, 0x80, 0x00]);
        assert_eq!(vlq(VLQ_MAX), vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_vlq_saturates() {
        assert_eq!(vlq(u32::MAX), vlq(VLQ_MAX));
    }

    #[test]
    fn test_header_chunk() {
        let mut out = Vec::new();
        write_header(&mut out, 0, 1, 480);
        assert_eq!(
            out,
            vec![b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0]
        );
    }

    #[test]
    fn test_tempo_120_bpm() {
        assert_eq!(tempo_event(500_000), [0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]);
    }

    #[test]
    fn test_pitch_bend_encoding() {
        assert_eq!(pitch_bend_event(0, 8192), [0xE0, 0x00, 0x40]);
        assert_eq!(pitch_bend_event(0, -5), [0xE0, 0x00, 0x00]);
        assert_eq!(pitch_bend_event(0, 20_000), [0xE0, 0x7F, 0x7F]);
        assert_eq!(pitch_bend_event(3, 8193), [0xE3, 0x01, 0x40]);
    }

    #[test]
    fn test_note_events() {
        assert_eq!(note_on_event(0, 60, 100), [0x90, 60, 100]);
        assert_eq!(note_off_event(1, 64), [0x81, 64, 0x00]);
        assert_eq!(control_change_event(0, CC_RPN_MSB, 0), [0xB0, 0x65, 0x00]);
    }
}
