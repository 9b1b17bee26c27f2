//! MP3 Test Fixture Generator
//!
//! Builds MPEG-1 Layer III mono frames (44.1 kHz, 128 kbps, no CRC) whose
//! only spectral content is one count1 line per granule. Line 26 sits in
//! polyphase subband 1 (689-1378 Hz), so the decoded stream is a steady
//! low-kHz tone.
//!
//! `tests/fixtures/tone.mp3` is this generator's output for
//! [`TONE_FRAMES`] frames; regenerate it with
//! `cargo test --test transform_tests -- --ignored`.

/// Bytes per frame: 144 * 128000 / 44100, no padding
pub const FRAME_BYTES: usize = 417;

/// PCM frames produced per MPEG-1 Layer III frame
pub const SAMPLES_PER_FRAME: usize = 1152;

/// Frames in `tests/fixtures/tone.mp3` (about 1.04 s)
pub const TONE_FRAMES: usize = 40;

/// Spectral line carrying the tone
pub const TONE_LINE: usize = 26;

/// Sync, MPEG-1, Layer III, no CRC / 128 kbps, 44.1 kHz / mono
const HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];

/// Side information bytes for a mono MPEG-1 frame
const SIDE_INFO_BYTES: usize = 17;

/// Quantizer step exponent; 210 is unity gain
const GLOBAL_GAIN: u32 = 200;

/// MSB-first bit writer
struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bits: 0,
        }
    }

    fn put(&mut self, value: u32, width: u32) {
        for shift in (0..width).rev() {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> shift) & 1 == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.bits % 8);
            }
            self.bits += 1;
        }
    }
}

/// Huffman bits for one granule: zero quadruples up to the tone line, then
/// the quadruple holding it plus one sign bit (count1 table B, code `15 - value`)
fn granule_bits(writer: &mut BitWriter) -> u32 {
    let quad = TONE_LINE / 4;
    for _ in 0..quad {
        writer.put(15, 4);
    }
    // Bit 3 of the quadruple value is the first of its four lines
    let value = 0b1000 >> (TONE_LINE % 4);
    writer.put(15 - value, 4);
    writer.put(0, 1);
    (quad as u32 + 1) * 4 + 1
}

fn frame() -> Vec<u8> {
    let mut main_data = BitWriter::new();
    let part2_3_length = granule_bits(&mut main_data);
    granule_bits(&mut main_data);

    let mut side = BitWriter::new();
    side.put(0, 9); // main_data_begin: no bit reservoir
    side.put(0, 5); // private bits
    side.put(0, 4); // scfsi
    for _ in 0..2 {
        side.put(part2_3_length, 12);
        side.put(0, 9); // big_values
        side.put(GLOBAL_GAIN, 8);
        side.put(0, 4); // scalefac_compress: no scale factor bits
        side.put(0, 1); // window_switching_flag
        side.put(0, 15); // table_select[3]
        side.put(0, 4); // region0_count
        side.put(0, 3); // region1_count
        side.put(0, 1); // preflag
        side.put(0, 1); // scalefac_scale
        side.put(1, 1); // count1table_select: table B
    }
    debug_assert_eq!(side.bytes.len(), SIDE_INFO_BYTES);

    let mut frame = Vec::with_capacity(FRAME_BYTES);
    frame.extend_from_slice(&HEADER);
    frame.extend_from_slice(&side.bytes);
    frame.extend_from_slice(&main_data.bytes);
    frame.resize(FRAME_BYTES, 0);
    frame
}

/// `frames` identical tone frames
pub fn mp3_tone_bytes(frames: usize) -> Vec<u8> {
    frame().repeat(frames)
}
