//! Audio processing unit
//!
//! Sound effects live as 68-byte patterns at $3200: 32 packed two-byte
//! notes, a settings byte, a speed byte and two loop bytes. Each note
//! packs, little-endian across its two bytes:
//! - bits 0-5 of the low byte: pitch (semitones, 33 = A at 440 Hz)
//! - bits 6-7 of the low byte: low two bits of the waveform
//! - bit 0 of the high byte: high bit of the waveform
//! - bits 2-4 of the high byte: volume (0-7)
//! - bits 5-7 of the high byte: effect
//! - bit 7 of the high byte: custom-instrument marker
//!
//! Playback state is owned here; the sample data itself is synthesized
//! on demand when the host pulls a buffer.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::memory::{Memory, ADDR_SOUND};

/// Output sample rate in Hz
pub const SAMPLE_RATE: f64 = 48_000.0;
/// Number of playback channels
pub const CHANNEL_COUNT: usize = 4;
/// Bytes per sound effect pattern
pub const PATTERN_SIZE: u16 = 68;

/// A decoded note from a sound effect pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioNote {
    pub pitch: u8,
    pub volume: u8,
    pub effect: u8,
    pub waveform: u8,
    pub is_custom: bool,
    /// Frequency derived from the pitch, 440 Hz at pitch 33
    pub hz: f64,
}

impl Default for AudioNote {
    fn default() -> Self {
        Self {
            pitch: 0,
            volume: 0,
            effect: 0,
            waveform: 0,
            is_custom: false,
            hz: 0.0,
        }
    }
}

/// Unpack a two-byte note
pub fn decode_note(low: u8, high: u8) -> AudioNote {
    let pitch = low & 0x3F;
    AudioNote {
        pitch,
        volume: (high >> 2) & 0x07,
        effect: (high >> 5) & 0x07,
        waveform: (low >> 6) | ((high & 0x01) << 2),
        is_custom: high & 0x80 != 0,
        hz: 440.0 * 2.0_f64.powf((pitch as f64 - 33.0) / 12.0),
    }
}

/// Triangle wave, period 1, peak 0.5 at the cycle boundaries
pub fn triangle_wave(x: f64) -> f64 {
    (((x % 1.0) * 2.0 - 1.0).abs() * 2.0 - 1.0) * 0.5
}

/// Tilted saw: a triangle with the peak pushed to 7/8 of the cycle
pub fn tilted_saw_wave(x: f64) -> f64 {
    let t = x % 1.0;
    let tilted = if t < 0.875 { t * 16.0 / 7.0 } else { (1.0 - t) * 16.0 };
    (tilted - 1.0) * 0.5
}

/// Sawtooth wave
pub fn saw_wave(x: f64) -> f64 {
    ((x % 1.0) - 0.5) * 2.0 / 3.0
}

/// Square wave with 50% duty
pub fn square_wave(x: f64) -> f64 {
    if x % 1.0 < 0.5 {
        0.25
    } else {
        -0.25
    }
}

/// Pulse wave with 31.25% duty
pub fn pulse_wave(x: f64) -> f64 {
    if x % 1.0 < 0.3125 {
        0.25
    } else {
        -0.25
    }
}

/// Organ: a pair of triangle partials an octave apart
pub fn organ_wave(x: f64) -> f64 {
    let x = x * 4.0;
    ((x % 2.0 - 1.0).abs() - 0.5 + ((x * 0.5 % 2.0 - 1.0).abs() - 0.5) / 2.0 - 0.1) * 0.5
}

/// Phaser: a triangle beat against a slightly detuned copy
pub fn phaser_wave(x: f64) -> f64 {
    let x = x * 2.0;
    (((x * 127.0 / 128.0) % 2.0 - 1.0).abs() / 2.0 + (x % 2.0 - 1.0).abs() - 1.0) * 2.0 / 3.0
}

/// Per-channel playback cursor. `pattern` is `None` when idle.
#[derive(Debug, Clone, Copy)]
struct Channel {
    pattern: Option<u16>,
    offset: u16,
    time: f64,
    note: AudioNote,
    note_len: f64,
}

impl Channel {
    fn idle() -> Self {
        Self {
            pattern: None,
            offset: 0,
            time: 0.0,
            note: AudioNote::default(),
            note_len: 0.0,
        }
    }
}

/// Audio processing unit structure
#[derive(Debug)]
pub struct Apu {
    channels: [Channel; CHANNEL_COUNT],
    sample_delta: f64,
    gain: f64,
    noise: StdRng,
}

impl Apu {
    /// Create a new APU instance at the given output sample rate
    pub fn new(sample_rate: f64) -> Self {
        Self {
            channels: [Channel::idle(); CHANNEL_COUNT],
            sample_delta: 1.0 / sample_rate,
            gain: 0.5,
            noise: StdRng::seed_from_u64(0),
        }
    }

    /// One oscillator step for a waveform at phase `time * hz`
    pub fn oscillate(&mut self, waveform: u8, time: f64, hz: f64) -> f64 {
        let phase = time * hz;
        match waveform {
            0 => triangle_wave(phase),
            1 => tilted_saw_wave(phase),
            2 => saw_wave(phase),
            3 => square_wave(phase),
            4 => pulse_wave(phase),
            5 => organ_wave(phase),
            6 => self.noise.gen::<f64>() * 2.0 - 1.0,
            7 => phaser_wave(phase),
            _ => 0.0,
        }
    }

    /// Whether a channel currently has a pattern loaded
    pub fn channel_active(&self, channel: usize) -> bool {
        channel < CHANNEL_COUNT && self.channels[channel].pattern.is_some()
    }

    /// Start sound effect `n` on a channel. A negative channel auto-selects
    /// (always channel 0 here); a negative `n` is ignored.
    ///
    /// The first note is decoded immediately so the attack plays from the
    /// very first pulled sample.
    pub fn sfx(&mut self, mem: &Memory, n: i32, channel: i32, _offset: i32, _length: i32) {
        if n < 0 {
            return;
        }
        let channel = if channel < 0 { 0 } else { channel as usize };
        if channel >= CHANNEL_COUNT {
            return;
        }
        // Wild indices wrap like any other out-of-range address; peek
        // reads zeros past the pattern table.
        let pattern = ADDR_SOUND.wrapping_add(PATTERN_SIZE.wrapping_mul(n as u16));
        let ch = &mut self.channels[channel];
        ch.pattern = Some(pattern);
        ch.offset = 0;
        ch.time = 0.0;
        ch.note_len = mem.peek(pattern.wrapping_add(65)) as f64 / 128.0;
        ch.note = decode_note(mem.peek(pattern), mem.peek(pattern.wrapping_add(1)));
        log::trace!(
            "sfx {n} on channel {channel}: pitch {}, waveform {}",
            ch.note.pitch,
            ch.note.waveform
        );
    }

    /// Music playback is accepted but not sequenced
    pub fn music(&mut self, n: i32, _fade_ms: i32, _channel_mask: i32) {
        log::trace!("music {n} requested (not sequenced)");
    }

    /// Advance a channel to its next note, going idle past the last one
    fn step_note(&mut self, mem: &Memory, channel: usize) {
        let ch = &mut self.channels[channel];
        let pattern = match ch.pattern {
            Some(p) => p,
            None => return,
        };
        ch.offset += 2;
        if ch.offset > 64 {
            ch.pattern = None;
            return;
        }
        ch.time -= ch.note_len;
        let addr = pattern.wrapping_add(ch.offset);
        ch.note = decode_note(mem.peek(addr), mem.peek(addr.wrapping_add(1)));
    }

    /// Synthesize into an interleaved f32 buffer.
    ///
    /// Channel 0 drives the output; with two interleaved channels the same
    /// sample lands in both. Once the channel goes idle the remainder of
    /// the buffer is zero-filled.
    pub fn fill_buffer(&mut self, mem: &Memory, data: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let mut i = 0;
        while i < data.len() {
            if self.channels[0].pattern.is_none() {
                for sample in &mut data[i..] {
                    *sample = 0.0;
                }
                return;
            }
            self.channels[0].time += self.sample_delta;
            let t = self.channels[0].time;
            // Oscillator phase runs on a slightly quantized time base.
            let note_time = t - (t % 1.0) / 22_050.0;
            let note = self.channels[0].note;
            let sample = (self.gain
                * (note.volume as f64 / 7.0)
                * self.oscillate(note.waveform, note_time, note.hz)) as f32;
            data[i] = sample;
            if channels >= 2 && i + 1 < data.len() {
                data[i + 1] = sample;
            }
            if self.channels[0].time > self.channels[0].note_len {
                self.step_note(mem, 0);
            }
            i += channels;
        }
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new(SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_note_fields() {
        // low = 0b11100001: pitch 33, waveform low bits 3
        // high = 0b00011101: waveform high bit 1, volume 7
        let note = decode_note(0xE1, 0x1D);
        assert_eq!(note.pitch, 33);
        assert_eq!(note.waveform, 0b111);
        assert_eq!(note.volume, 7);
        assert!(!note.is_custom);
        assert!((note.hz - 440.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_note_custom_flag() {
        let note = decode_note(0x00, 0x80);
        assert!(note.is_custom);
        assert_eq!(note.volume, 0);
    }

    #[test]
    fn test_square_wave_levels() {
        assert_eq!(square_wave(0.1), 0.25);
        assert_eq!(square_wave(0.6), -0.25);
        assert_eq!(square_wave(1.1), 0.25);
    }

    #[test]
    fn test_triangle_wave_extents() {
        assert!((triangle_wave(0.0) - 0.5).abs() < 1e-9);
        assert!((triangle_wave(0.5) - (-0.5)).abs() < 1e-9);
        assert!(triangle_wave(0.25).abs() < 1e-9);
    }

    #[test]
    fn test_sfx_negative_index_ignored() {
        let mem = Memory::new();
        let mut apu = Apu::new(SAMPLE_RATE);
        apu.sfx(&mem, -1, 0, 0, 0);
        assert!(!apu.channel_active(0));
    }

    #[test]
    fn test_sfx_loads_first_note() {
        let mut mem = Memory::new();
        // Pattern 0: first note a = 440 Hz square at full volume, speed 128.
        mem.poke(ADDR_SOUND, 0xE1);
        mem.poke(ADDR_SOUND + 1, 0x1C);
        mem.poke(ADDR_SOUND + 65, 128);
        let mut apu = Apu::new(SAMPLE_RATE);
        apu.sfx(&mem, 0, -1, 0, 0);
        assert!(apu.channel_active(0));
    }

    #[test]
    fn test_idle_channel_zero_fills() {
        let mem = Memory::new();
        let mut apu = Apu::new(SAMPLE_RATE);
        let mut buffer = [1.0f32; 64];
        apu.fill_buffer(&mem, &mut buffer, 2);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }
}
