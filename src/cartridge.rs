//! Cartridge container decoding
//!
//! Cartridges ship as 160x205 RGBA PNG images. Each pixel hides one ROM
//! byte in the two low bits of its four channels:
//! byte = ((A & 3) << 6) | ((R & 3) << 4) | ((G & 3) << 2) | (B & 3)
//! The 32768-byte ROM is followed by five metadata bytes: a version byte
//! and a big-endian 32-bit build number.
//!
//! Script text lives in the code window at $4300, either as plain text
//! behind a `:c:` marker or compressed with a custom LZ-style scheme.

use thiserror::Error;

/// Cartridge image width in pixels
pub const IMAGE_WIDTH: u32 = 160;
/// Cartridge image height in pixels
pub const IMAGE_HEIGHT: u32 = 205;

/// Decoded ROM size in bytes
pub const ROM_SIZE: usize = 0x8000;
/// Metadata tail size in bytes (version + build number)
pub const META_SIZE: usize = 0x5;
/// Total decoded cartridge size
pub const CART_SIZE: usize = ROM_SIZE + META_SIZE;

/// Start of the code window inside the ROM
const CODE_BASE: usize = 0x4300;
/// Offset of the big-endian decompressed-size field
const CODE_SIZE_FIELD: usize = 0x4304;
/// First byte of the compressed stream
const CODE_STREAM: usize = 0x4308;

/// Literal alphabet for the compressed code format. Control bytes
/// 0x01-0x3B index into this table directly.
const CODE_ALPHABET: &[u8] =
    b"\n 0123456789abcdefghijklmnopqrstuvwxyz!#%(){}[]<>+=/*:;.,~_";

/// Marker for uncompressed code in the code window
const PLAIN_MARKER: &[u8] = b":c:";

/// Cartridge error types
#[derive(Debug, Error)]
pub enum CartridgeError {
    /// The container is not a 160x205 RGBA image
    #[error("bad cartridge format: expected 160x205 RGBA image")]
    BadFormat,
    /// The container bytes could not be decoded as a PNG
    #[error("bad cartridge image: {0}")]
    BadImage(#[from] image::ImageError),
    /// A raw cartridge buffer had the wrong length
    #[error("bad cartridge size: expected {CART_SIZE} bytes, got {0}")]
    BadSize(usize),
    /// The compressed code stream ended mid-token
    #[error("compressed code truncated")]
    TruncatedCode,
    /// A back-reference pointed before the start of the output
    #[error("compressed code back-reference past start of output")]
    BadBackReference,
}

/// An immutable decoded cartridge
#[derive(Debug, Clone)]
pub struct Cartridge {
    rom: Vec<u8>,
    version: u8,
    build: u32,
}

impl Cartridge {
    /// Decode a cartridge from PNG container bytes
    pub fn from_png_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)?;
        if img.width() != IMAGE_WIDTH || img.height() != IMAGE_HEIGHT {
            return Err(CartridgeError::BadFormat);
        }
        let rgba = match img.as_rgba8() {
            Some(buf) => buf,
            None => return Err(CartridgeError::BadFormat),
        };

        let mut rom = Vec::with_capacity(CART_SIZE);
        for pixel in rgba.pixels() {
            if rom.len() >= CART_SIZE {
                break;
            }
            let [r, g, b, a] = pixel.0;
            rom.push(((a & 3) << 6) | ((r & 3) << 4) | ((g & 3) << 2) | (b & 3));
        }
        Self::from_rom(rom)
    }

    /// Build a cartridge from an already-decoded ROM buffer
    pub fn from_rom(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() != CART_SIZE {
            return Err(CartridgeError::BadSize(rom.len()));
        }
        let version = rom[ROM_SIZE];
        let build = u32::from_be_bytes([
            rom[ROM_SIZE + 1],
            rom[ROM_SIZE + 2],
            rom[ROM_SIZE + 3],
            rom[ROM_SIZE + 4],
        ]);
        log::debug!("cartridge decoded: version {version}, build {build}");
        Ok(Self { rom, version, build })
    }

    /// The decoded ROM bytes (32768 + 5 metadata bytes)
    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    /// Format version byte from the metadata tail
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Build number from the metadata tail
    pub fn build(&self) -> u32 {
        self.build
    }

    /// Extract the cartridge script from the code window.
    ///
    /// A leading `:c:` marker means the code is stored as plain text up to
    /// the first NUL byte or the end of the ROM. Anything else is treated
    /// as a compressed stream.
    pub fn extract_script(&self) -> Result<String, CartridgeError> {
        if self.rom[CODE_BASE..].starts_with(PLAIN_MARKER) {
            let text = &self.rom[CODE_BASE + PLAIN_MARKER.len()..ROM_SIZE];
            let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
            return Ok(text[..end].iter().map(|&b| b as char).collect());
        }
        self.decompress_script()
    }

    /// Decompress the code stream.
    ///
    /// Control byte 0x00 escapes the following raw byte; bytes below 0x3C
    /// index the literal alphabet; anything else combines with the next
    /// byte into a back-reference (offset = (b - 0x3C) * 16 + (next & 0xF),
    /// length = (next >> 4) + 2) copied from earlier output. Copies may
    /// overlap their own output, which is how runs are encoded.
    fn decompress_script(&self) -> Result<String, CartridgeError> {
        let size = ((self.rom[CODE_SIZE_FIELD] as usize) << 8)
            | self.rom[CODE_SIZE_FIELD + 1] as usize;
        let mut out: Vec<u8> = Vec::with_capacity(size);
        let mut index = CODE_STREAM;

        while out.len() < size && index < ROM_SIZE {
            let control = self.rom[index];
            if control == 0x00 {
                index += 1;
                if index >= ROM_SIZE {
                    return Err(CartridgeError::TruncatedCode);
                }
                out.push(self.rom[index]);
            } else if control < 0x3C {
                out.push(CODE_ALPHABET[control as usize - 1]);
            } else {
                index += 1;
                if index >= ROM_SIZE {
                    return Err(CartridgeError::TruncatedCode);
                }
                let next = self.rom[index];
                let offset = (control as usize - 0x3C) * 16 + (next & 0x0F) as usize;
                let length = (next >> 4) as usize + 2;
                if offset == 0 || offset > out.len() {
                    return Err(CartridgeError::BadBackReference);
                }
                // Byte-at-a-time so the copy can consume its own output.
                let start = out.len() - offset;
                for i in 0..length {
                    let byte = out[start + i];
                    out.push(byte);
                }
            }
            index += 1;
        }
        Ok(out.iter().map(|&b| b as char).collect())
    }
}
