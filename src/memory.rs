//! Flat 32 KiB address space with named register regions
//!
//! The console memory map:
//! $0000-$0FFF - Sprite sheet (4-bit pixels, two per byte)
//! $1000-$1FFF - Shared sprite/map region (map rows 32-63)
//! $2000-$2FFF - Map (rows 0-31)
//! $3000-$30FF - Sprite flags (one byte per sprite)
//! $3100-$31FF - Music patterns
//! $3200-$42FF - Sound effect patterns (68 bytes each)
//! $4300-$5DFF - General purpose RAM
//! $5E00-$5EFF - Persistent cart data window
//! $5F00-$5F3F - Draw state registers (palettes, clip, pen, cursor, camera)
//! $6000-$7FFF - Video RAM (128x128, 4-bit pixels, two per byte)

/// Total addressable memory in bytes
pub const MEM_SIZE: usize = 0x8000;

/// Sprite sheet base address
pub const ADDR_SPRITE: u16 = 0x0000;
/// Shared sprite/map region base address
pub const ADDR_SHARED: u16 = 0x1000;
/// Map base address (rows 0-31)
pub const ADDR_MAP: u16 = 0x2000;
/// Sprite flag table base address
pub const ADDR_FLAGS: u16 = 0x3000;
/// Music pattern base address
pub const ADDR_MUSIC: u16 = 0x3100;
/// Sound effect pattern base address
pub const ADDR_SOUND: u16 = 0x3200;
/// General purpose RAM base address
pub const ADDR_USER: u16 = 0x4300;
/// Persistent cart data window base address
pub const ADDR_CARTDATA: u16 = 0x5E00;
/// Draw palette base address (16 entries)
pub const ADDR_DRAW_PALETTE: u16 = 0x5F00;
/// Screen palette base address (16 entries)
pub const ADDR_SCREEN_PALETTE: u16 = 0x5F10;
/// Clip rectangle registers (x0, y0, x1, y1)
pub const ADDR_CLIP: u16 = 0x5F20;
/// Pen (current draw color) register
pub const ADDR_PEN: u16 = 0x5F25;
/// Cursor position registers (x, y)
pub const ADDR_CURSOR: u16 = 0x5F26;
/// Camera offset registers (two i16 little-endian)
pub const ADDR_CAMERA: u16 = 0x5F28;
/// Screen effect register
pub const ADDR_SCREEN_EFFECT: u16 = 0x5F2C;
/// Devkit mode register
pub const ADDR_DEVKIT: u16 = 0x5F2D;
/// Fill pattern register (u16 little-endian)
pub const ADDR_FILL_PATTERN: u16 = 0x5F31;
/// Video RAM base address
pub const ADDR_VRAM: u16 = 0x6000;
/// Video RAM size in bytes (128x128 pixels, two per byte)
pub const VRAM_SIZE: usize = 0x2000;

/// Transparency bit in a palette entry (low nibble is the color index)
pub const PAL_TRANSPARENT: u8 = 0x10;

/// Cached decode of the camera offset registers.
///
/// The camera window is read on every draw call, so the signed 16-bit
/// little-endian decode is cached and marked dirty whenever a write
/// lands inside $5F28-$5F2B (including bulk copies and fills).
#[derive(Debug, Clone, Copy)]
struct CameraCache {
    x: i32,
    y: i32,
    dirty: bool,
}

/// Memory structure
#[derive(Debug, Clone)]
pub struct Memory {
    ram: Vec<u8>,
    camera: CameraCache,
}

impl Memory {
    /// Create a new memory instance with default draw state
    pub fn new() -> Self {
        let mut mem = Self {
            ram: vec![0; MEM_SIZE],
            camera: CameraCache {
                x: 0,
                y: 0,
                dirty: false,
            },
        };
        mem.reset_draw_palette();
        mem.reset_screen_palette();
        mem.reset_clip();
        mem
    }

    /// Read a byte. Out-of-range addresses read as zero.
    pub fn peek(&self, addr: u16) -> u8 {
        if (addr as usize) < MEM_SIZE {
            self.ram[addr as usize]
        } else {
            0
        }
    }

    /// Write a byte. Out-of-range addresses are silently dropped.
    pub fn poke(&mut self, addr: u16, value: u8) {
        let addr = addr as usize;
        if addr < MEM_SIZE {
            self.ram[addr] = value;
            if Self::touches_camera(addr, addr + 1) {
                self.camera.dirty = true;
            }
        }
    }

    /// Fill `length` bytes starting at `start` with `value`.
    ///
    /// Fills with an amortized doubling strategy: seed a short literal
    /// prefix, then repeatedly duplicate the already-written region.
    pub fn block_set(&mut self, start: u16, value: u8, length: u16) {
        let begin = (start as usize).min(MEM_SIZE);
        let end = (start as usize + length as usize).min(MEM_SIZE);
        if begin >= end {
            return;
        }
        let total = end - begin;
        let seed = total.min(4);
        for b in &mut self.ram[begin..begin + seed] {
            *b = value;
        }
        let mut filled = seed;
        while filled < total {
            let chunk = filled.min(total - filled);
            self.ram
                .copy_within(begin..begin + chunk, begin + filled);
            filled += chunk;
        }
        if Self::touches_camera(begin, end) {
            self.camera.dirty = true;
        }
    }

    /// Copy `length` bytes from `src` to `dst` with memmove semantics.
    ///
    /// Reads outside the address space produce zeros, writes outside are
    /// dropped, so overlapping and partially out-of-range copies are safe.
    pub fn block_copy(&mut self, dst: u16, src: u16, length: u16) {
        let len = length as usize;
        let staged: Vec<u8> = (0..len)
            .map(|i| {
                let a = src as usize + i;
                if a < MEM_SIZE {
                    self.ram[a]
                } else {
                    0
                }
            })
            .collect();
        let begin = (dst as usize).min(MEM_SIZE);
        let end = (dst as usize + len).min(MEM_SIZE);
        self.ram[begin..end].copy_from_slice(&staged[..end - begin]);
        if Self::touches_camera(begin, end) {
            self.camera.dirty = true;
        }
    }

    /// Copy a span of decoded ROM bytes into memory
    pub fn load_rom(&mut self, rom: &[u8], offset: usize, length: usize) {
        let end = (offset + length).min(MEM_SIZE).min(rom.len());
        if offset < end {
            self.ram[offset..end].copy_from_slice(&rom[offset..end]);
        }
        if Self::touches_camera(offset, end) {
            self.camera.dirty = true;
        }
    }

    fn touches_camera(begin: usize, end: usize) -> bool {
        let cam = ADDR_CAMERA as usize;
        begin < cam + 4 && end > cam
    }

    fn refresh_camera(&mut self) {
        if self.camera.dirty {
            let base = ADDR_CAMERA as usize;
            self.camera.x =
                i16::from_le_bytes([self.ram[base], self.ram[base + 1]]) as i32;
            self.camera.y =
                i16::from_le_bytes([self.ram[base + 2], self.ram[base + 3]]) as i32;
            self.camera.dirty = false;
        }
    }

    /// Current camera x offset (lazily decoded from the register window)
    pub fn camera_x(&mut self) -> i32 {
        self.refresh_camera();
        self.camera.x
    }

    /// Current camera y offset (lazily decoded from the register window)
    pub fn camera_y(&mut self) -> i32 {
        self.refresh_camera();
        self.camera.y
    }

    /// Write both camera offset registers
    pub fn set_camera(&mut self, x: i16, y: i16) {
        let [xl, xh] = x.to_le_bytes();
        let [yl, yh] = y.to_le_bytes();
        self.poke(ADDR_CAMERA, xl);
        self.poke(ADDR_CAMERA + 1, xh);
        self.poke(ADDR_CAMERA + 2, yl);
        self.poke(ADDR_CAMERA + 3, yh);
    }

    /// Current pen (draw color) register
    pub fn pen(&self) -> u8 {
        self.peek(ADDR_PEN)
    }

    /// Set the pen (draw color) register
    pub fn set_pen(&mut self, color: u8) {
        self.poke(ADDR_PEN, color);
    }

    /// Clip rectangle as (x0, y0, x1, y1), both corners inclusive
    pub fn clip(&self) -> (u8, u8, u8, u8) {
        (
            self.peek(ADDR_CLIP),
            self.peek(ADDR_CLIP + 1),
            self.peek(ADDR_CLIP + 2),
            self.peek(ADDR_CLIP + 3),
        )
    }

    /// Set the clip rectangle registers
    pub fn set_clip(&mut self, x0: u8, y0: u8, x1: u8, y1: u8) {
        self.poke(ADDR_CLIP, x0);
        self.poke(ADDR_CLIP + 1, y0);
        self.poke(ADDR_CLIP + 2, x1);
        self.poke(ADDR_CLIP + 3, y1);
    }

    /// Cursor position as (x, y)
    pub fn cursor(&self) -> (u8, u8) {
        (self.peek(ADDR_CURSOR), self.peek(ADDR_CURSOR + 1))
    }

    /// Set the cursor position registers
    pub fn set_cursor(&mut self, x: u8, y: u8) {
        self.poke(ADDR_CURSOR, x);
        self.poke(ADDR_CURSOR + 1, y);
    }

    /// Snapshot view of the 8192-byte video RAM region
    pub fn video_buffer(&self) -> &[u8] {
        &self.ram[ADDR_VRAM as usize..ADDR_VRAM as usize + VRAM_SIZE]
    }

    /// Reset the draw palette: entry 0 transparent black, 1-15 identity opaque
    pub fn reset_draw_palette(&mut self) {
        for i in 0..16u16 {
            self.poke(ADDR_DRAW_PALETTE + i, i as u8);
        }
        self.poke(ADDR_DRAW_PALETTE, PAL_TRANSPARENT);
    }

    /// Reset the screen palette to the identity mapping, all opaque
    pub fn reset_screen_palette(&mut self) {
        for i in 0..16u16 {
            self.poke(ADDR_SCREEN_PALETTE + i, i as u8);
        }
    }

    /// Reset the transparency bits: color 0 transparent, 1-15 opaque
    pub fn reset_transparency(&mut self) {
        for i in 0..16u16 {
            let entry = self.peek(ADDR_DRAW_PALETTE + i) & !PAL_TRANSPARENT;
            self.poke(ADDR_DRAW_PALETTE + i, entry);
        }
        let zero = self.peek(ADDR_DRAW_PALETTE) | PAL_TRANSPARENT;
        self.poke(ADDR_DRAW_PALETTE, zero);
    }

    /// Reset the clip rectangle to the full screen
    pub fn reset_clip(&mut self) {
        self.set_clip(0, 0, 127, 127);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
