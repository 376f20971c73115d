//! Fantasy console emulator core
//!
//! A complete fantasy console core in Rust, including:
//! - flat 32 KiB memory with named register regions
//! - PNG cartridge container decoding and script extraction
//! - shorthand-syntax normalization for cartridge scripts
//! - PPU (sprite, map and primitive rasterization)
//! - APU (packed note decoding and waveform synthesis)
//! - builtin dispatch and frame driving for a host script engine

#![forbid(unsafe_code)]

pub mod apu;
pub mod builtins;
pub mod cartridge;
pub mod emulator;
pub mod input;
pub mod memory;
pub mod ppu;
pub mod script;
pub mod syntax;

pub use apu::{Apu, AudioNote, CHANNEL_COUNT, SAMPLE_RATE};
pub use builtins::Builtin;
pub use cartridge::{Cartridge, CartridgeError};
pub use emulator::{Chipset, Emulator, EmulatorError};
pub use input::{Button, InputState, BUTTON_COUNT};
pub use memory::{Memory, ADDR_SOUND, ADDR_SPRITE, ADDR_USER, ADDR_VRAM, MEM_SIZE, VRAM_SIZE};
pub use script::{ScriptEngine, ScriptError, Value};
pub use syntax::normalize;
