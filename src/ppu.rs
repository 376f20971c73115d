//! Picture processing unit
//!
//! The rasterizer has no state of its own: every pixel, register and
//! palette entry lives in [`Memory`], so the drawing operations are plain
//! functions over it.
//!
//! Key facts:
//! - screen and sprite sheet are 128x128, 4 bits per pixel, two pixels
//!   per byte (low nibble = even x, high nibble = odd x)
//! - every draw call applies the camera offset and the clip rectangle
//! - colors pass through the draw palette before they are stored; sprite
//!   sampling additionally honors the palette transparency bit

use crate::memory::{
    Memory, ADDR_DRAW_PALETTE, ADDR_FILL_PATTERN, ADDR_FLAGS, ADDR_MAP, ADDR_SCREEN_PALETTE,
    ADDR_SHARED, ADDR_SPRITE, ADDR_VRAM, MEM_SIZE, PAL_TRANSPARENT, VRAM_SIZE,
};

/// Screen width and height in pixels
pub const SCREEN_SIZE: i32 = 128;
/// Sprites per sprite sheet row
pub const SPRITES_PER_ROW: i32 = 16;

/// Read one 4-bit element from a packed pixel region.
/// Even elements occupy the low nibble, odd elements the high nibble.
pub fn peek_nibble(mem: &Memory, base: u16, element: usize) -> u8 {
    let addr = base as usize + element / 2;
    if addr >= MEM_SIZE {
        return 0;
    }
    let byte = mem.peek(addr as u16);
    if element % 2 == 0 {
        byte & 0x0F
    } else {
        byte >> 4
    }
}

/// Write one 4-bit element into a packed pixel region
pub fn poke_nibble(mem: &mut Memory, base: u16, element: usize, value: u8) {
    let addr = base as usize + element / 2;
    if addr >= MEM_SIZE {
        return;
    }
    let byte = mem.peek(addr as u16);
    let merged = if element % 2 == 0 {
        (byte & 0xF0) | (value & 0x0F)
    } else {
        (byte & 0x0F) | (value << 4)
    };
    mem.poke(addr as u16, merged);
}

/// Map a logical color through the draw palette
fn draw_color(mem: &Memory, color: u8) -> u8 {
    mem.peek(ADDR_DRAW_PALETTE + (color & 0x0F) as u16) & 0x0F
}

/// Draw palette entry for a logical color, transparency bit included
fn palette_entry(mem: &Memory, color: u8) -> u8 {
    mem.peek(ADDR_DRAW_PALETTE + (color & 0x0F) as u16)
}

/// Write an already-remapped color at screen coordinates, applying the
/// camera offset and the clip rectangle.
fn plot(mem: &mut Memory, x: i32, y: i32, color: u8) {
    // Widened so coordinates near the i32 limits subtract safely.
    let sx = x as i64 - mem.camera_x() as i64;
    let sy = y as i64 - mem.camera_y() as i64;
    if sx < 0 || sy < 0 || sx >= SCREEN_SIZE as i64 || sy >= SCREEN_SIZE as i64 {
        return;
    }
    let (sx, sy) = (sx as i32, sy as i32);
    let (cx0, cy0, cx1, cy1) = mem.clip();
    if sx < cx0 as i32 || sy < cy0 as i32 || sx > cx1 as i32 || sy > cy1 as i32 {
        return;
    }
    poke_nibble(mem, ADDR_VRAM, (sy * SCREEN_SIZE + sx) as usize, color);
}

/// Current pen, remapped through the draw palette
fn pen_color(mem: &Memory) -> u8 {
    draw_color(mem, mem.pen())
}

/// Set a pixel. A color argument also sets the pen.
pub fn pset(mem: &mut Memory, x: i32, y: i32, color: Option<u8>) {
    if let Some(c) = color {
        mem.set_pen(c);
    }
    let c = pen_color(mem);
    plot(mem, x, y, c);
}

/// Read a pixel back from the screen (camera-relative, 0 off screen)
pub fn pget(mem: &mut Memory, x: i32, y: i32) -> u8 {
    let sx = x as i64 - mem.camera_x() as i64;
    let sy = y as i64 - mem.camera_y() as i64;
    if sx < 0 || sy < 0 || sx >= SCREEN_SIZE as i64 || sy >= SCREEN_SIZE as i64 {
        return 0;
    }
    peek_nibble(mem, ADDR_VRAM, (sy * SCREEN_SIZE as i64 + sx) as usize)
}

/// Clear the whole screen to color 0
pub fn cls(mem: &mut Memory) {
    mem.block_set(ADDR_VRAM, 0, VRAM_SIZE as u16);
}

/// Draw a line with a single-error-term Bresenham walk.
///
/// The walk always advances x by one and accumulates one error term, so
/// slopes steeper than 1 come out as a sparse diagonal. Cartridges rely
/// on that look, so it stays.
pub fn line(mem: &mut Memory, x0: i32, y0: i32, x1: i32, y1: i32, color: Option<u8>) {
    if let Some(c) = color {
        mem.set_pen(c);
    }
    let c = pen_color(mem);

    let (x0, y0, x1, y1) = if x0 > x1 {
        (x1, y1, x0, y0)
    } else {
        (x0, y0, x1, y1)
    };
    // 64-bit error terms so extreme endpoints cannot overflow the walk.
    let dx = x1 as i64 - x0 as i64;
    let dy = (y1 as i64 - y0 as i64).abs();
    let step: i64 = if y1 >= y0 { 1 } else { -1 };
    let mut err = 2 * dy - dx;
    let mut y = y0 as i64;
    for x in x0..=x1 {
        plot(mem, x, y as i32, c);
        if err > 0 {
            y += step;
            err -= 2 * dx;
        }
        err += 2 * dy;
    }
}

/// Plot the eight symmetric points of a circle octant
fn circle_points(mem: &mut Memory, x0: i32, y0: i32, x: i32, y: i32, c: u8) {
    plot(mem, x0.wrapping_add(x), y0.wrapping_add(y), c);
    plot(mem, x0.wrapping_sub(x), y0.wrapping_add(y), c);
    plot(mem, x0.wrapping_add(x), y0.wrapping_sub(y), c);
    plot(mem, x0.wrapping_sub(x), y0.wrapping_sub(y), c);
    plot(mem, x0.wrapping_add(y), y0.wrapping_add(x), c);
    plot(mem, x0.wrapping_sub(y), y0.wrapping_add(x), c);
    plot(mem, x0.wrapping_add(y), y0.wrapping_sub(x), c);
    plot(mem, x0.wrapping_sub(y), y0.wrapping_sub(x), c);
}

fn hline(mem: &mut Memory, xa: i32, xb: i32, y: i32, c: u8) {
    // Only the camera window can hold visible pixels; plot discards the
    // rest, so the span is clamped to it before walking.
    let cam = mem.camera_x();
    let lo = xa.min(xb).max(cam);
    let hi = xa.max(xb).min(cam + SCREEN_SIZE - 1);
    for x in lo..=hi {
        plot(mem, x, y, c);
    }
}

/// Draw a circle outline with the midpoint algorithm. The radius is
/// pre-incremented by one; `circ(x, y, 0)` still plots a point and every
/// circle reads one pixel fatter than its argument.
pub fn circ(mem: &mut Memory, x0: i32, y0: i32, r: i32, color: Option<u8>) {
    if let Some(c) = color {
        mem.set_pen(c);
    }
    let c = pen_color(mem);
    // The increment wraps like a 32-bit register, so the largest radius
    // comes out negative and draws nothing instead of panicking.
    let radius = r.wrapping_add(1);
    if radius < 0 {
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while y <= x {
        circle_points(mem, x0, y0, x, y, c);
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Draw a filled circle (same radius convention as [`circ`])
pub fn circfill(mem: &mut Memory, x0: i32, y0: i32, r: i32, color: Option<u8>) {
    if let Some(c) = color {
        mem.set_pen(c);
    }
    let c = pen_color(mem);
    let radius = r.wrapping_add(1);
    if radius < 0 {
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while y <= x {
        hline(mem, x0.wrapping_sub(x), x0.wrapping_add(x), y0.wrapping_add(y), c);
        hline(mem, x0.wrapping_sub(x), x0.wrapping_add(x), y0.wrapping_sub(y), c);
        hline(mem, x0.wrapping_sub(y), x0.wrapping_add(y), y0.wrapping_add(x), c);
        hline(mem, x0.wrapping_sub(y), x0.wrapping_add(y), y0.wrapping_sub(x), c);
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

fn ordered_clamped(a: i32, b: i32) -> (i32, i32) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (lo.clamp(0, SCREEN_SIZE - 1), hi.clamp(0, SCREEN_SIZE - 1))
}

/// Draw a rectangle outline between two corners
pub fn rect(mem: &mut Memory, x0: i32, y0: i32, x1: i32, y1: i32, color: Option<u8>) {
    if let Some(c) = color {
        mem.set_pen(c);
    }
    let c = pen_color(mem);
    let (x0, x1) = ordered_clamped(x0, x1);
    let (y0, y1) = ordered_clamped(y0, y1);
    for x in x0..=x1 {
        plot(mem, x, y0, c);
        plot(mem, x, y1, c);
    }
    for y in y0..=y1 {
        plot(mem, x0, y, c);
        plot(mem, x1, y, c);
    }
}

/// Draw a filled rectangle between two corners
pub fn rectfill(mem: &mut Memory, x0: i32, y0: i32, x1: i32, y1: i32, color: Option<u8>) {
    if let Some(c) = color {
        mem.set_pen(c);
    }
    let c = pen_color(mem);
    let (x0, x1) = ordered_clamped(x0, x1);
    let (y0, y1) = ordered_clamped(y0, y1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            plot(mem, x, y, c);
        }
    }
}

/// Read a sprite sheet pixel
pub fn sget(mem: &Memory, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= SCREEN_SIZE || y >= SCREEN_SIZE {
        return 0;
    }
    peek_nibble(mem, ADDR_SPRITE, (y * SCREEN_SIZE + x) as usize)
}

/// Write a sprite sheet pixel
pub fn sset(mem: &mut Memory, x: i32, y: i32, color: u8) {
    if x < 0 || y < 0 || x >= SCREEN_SIZE || y >= SCREEN_SIZE {
        return;
    }
    poke_nibble(mem, ADDR_SPRITE, (y * SCREEN_SIZE + x) as usize, color & 0x0F);
}

/// Full flag byte for a sprite
pub fn fget(mem: &Memory, n: i32) -> u8 {
    if !(0..256).contains(&n) {
        return 0;
    }
    mem.peek(ADDR_FLAGS + n as u16)
}

/// Single flag bit for a sprite
pub fn fget_bit(mem: &Memory, n: i32, bit: i32) -> bool {
    if !(0..8).contains(&bit) {
        return false;
    }
    fget(mem, n) & (1 << bit) != 0
}

/// Replace the full flag byte for a sprite
pub fn fset(mem: &mut Memory, n: i32, flags: u8) {
    if (0..256).contains(&n) {
        mem.poke(ADDR_FLAGS + n as u16, flags);
    }
}

/// Set or clear a single flag bit for a sprite
pub fn fset_bit(mem: &mut Memory, n: i32, bit: i32, value: bool) {
    if !(0..256).contains(&n) || !(0..8).contains(&bit) {
        return;
    }
    let flags = fget(mem, n);
    let flags = if value {
        flags | (1 << bit)
    } else {
        flags & !(1 << bit)
    };
    mem.poke(ADDR_FLAGS + n as u16, flags);
}

/// Read a map cell. Rows 0-31 live in the map region, rows 32-63 in the
/// shared sprite/map region.
pub fn mget(mem: &Memory, cel_x: i32, cel_y: i32) -> u8 {
    if !(0..SCREEN_SIZE).contains(&cel_x) {
        return 0;
    }
    match cel_y {
        0..=31 => mem.peek(ADDR_MAP + (cel_y * SCREEN_SIZE + cel_x) as u16),
        32..=63 => mem.peek(ADDR_SHARED + ((cel_y - 32) * SCREEN_SIZE + cel_x) as u16),
        _ => 0,
    }
}

/// Write a map cell (same two-region split as [`mget`])
pub fn mset(mem: &mut Memory, cel_x: i32, cel_y: i32, value: u8) {
    if !(0..SCREEN_SIZE).contains(&cel_x) {
        return;
    }
    match cel_y {
        0..=31 => mem.poke(ADDR_MAP + (cel_y * SCREEN_SIZE + cel_x) as u16, value),
        32..=63 => mem.poke(ADDR_SHARED + ((cel_y - 32) * SCREEN_SIZE + cel_x) as u16, value),
        _ => {}
    }
}

/// Draw sprite `n` (and its `w` x `h` cell neighbors) at screen (x, y).
///
/// Pixels whose draw palette entry carries the transparency bit are
/// skipped; the rest are remapped through the palette before storing.
pub fn spr(mem: &mut Memory, n: i32, x: i32, y: i32, w: f64, h: f64, flip_x: bool, flip_y: bool) {
    let width = (8.0 * w) as i32;
    let height = (8.0 * h) as i32;
    let sprite_x = (n % SPRITES_PER_ROW) * 8;
    let sprite_y = (n / SPRITES_PER_ROW) * 8;

    for yy in 0..height {
        for xx in 0..width {
            let sx = sprite_x + if flip_x { width - 1 - xx } else { xx };
            let sy = sprite_y + if flip_y { height - 1 - yy } else { yy };
            if sx < 0 || sy < 0 || sx >= SCREEN_SIZE || sy >= SCREEN_SIZE {
                continue;
            }
            let color = peek_nibble(mem, ADDR_SPRITE, (sy * SCREEN_SIZE + sx) as usize);
            let entry = palette_entry(mem, color);
            if entry & PAL_TRANSPARENT != 0 {
                continue;
            }
            plot(mem, x.wrapping_add(xx), y.wrapping_add(yy), entry & 0x0F);
        }
    }
}

/// Stretch-blit a sprite sheet region to the screen.
/// `dw`/`dh` default to the source size.
#[allow(clippy::too_many_arguments)]
pub fn sspr(
    mem: &mut Memory,
    sx: i32,
    sy: i32,
    sw: i32,
    sh: i32,
    dx: i32,
    dy: i32,
    dw: Option<i32>,
    dh: Option<i32>,
    flip_x: bool,
    flip_y: bool,
) {
    let dw = dw.unwrap_or(sw);
    let dh = dh.unwrap_or(sh);
    if sw <= 0 || sh <= 0 || dw <= 0 || dh <= 0 {
        return;
    }
    for yy in 0..dh {
        for xx in 0..dw {
            let step_x = (if flip_x { dw - 1 - xx } else { xx }) as i64;
            let step_y = (if flip_y { dh - 1 - yy } else { yy }) as i64;
            let u = sx as i64 + step_x * sw as i64 / dw as i64;
            let v = sy as i64 + step_y * sh as i64 / dh as i64;
            if u < 0 || v < 0 || u >= SCREEN_SIZE as i64 || v >= SCREEN_SIZE as i64 {
                continue;
            }
            let color = peek_nibble(mem, ADDR_SPRITE, (v * SCREEN_SIZE as i64 + u) as usize);
            let entry = palette_entry(mem, color);
            if entry & PAL_TRANSPARENT != 0 {
                continue;
            }
            plot(mem, dx.wrapping_add(xx), dy.wrapping_add(yy), entry & 0x0F);
        }
    }
}

/// Draw a block of map cells.
///
/// Empty cells (sprite 0) are skipped. A non-zero `layer` is a bitmask
/// filter: a cell draws only when its sprite flags contain every bit of
/// the mask, so layer 0 draws every non-empty cell.
#[allow(clippy::too_many_arguments)]
pub fn map(
    mem: &mut Memory,
    cel_x: i32,
    cel_y: i32,
    sx: i32,
    sy: i32,
    cel_w: i32,
    cel_h: i32,
    layer: u8,
) {
    for cy in 0..cel_h {
        for cx in 0..cel_w {
            let n = mget(mem, cel_x + cx, cel_y + cy);
            if n == 0 {
                continue;
            }
            let flags = fget(mem, n as i32);
            if flags & layer != layer {
                continue;
            }
            spr(mem, n as i32, sx + cx * 8, sy + cy * 8, 1.0, 1.0, false, false);
        }
    }
}

/// Set the pen register. No argument restores the default pen (color 6).
pub fn color(mem: &mut Memory, col: Option<u8>) {
    mem.set_pen(col.unwrap_or(6));
}

/// Set the text cursor registers
pub fn cursor(mem: &mut Memory, x: u8, y: u8) {
    mem.set_cursor(x, y);
}

/// Set the fill pattern register
pub fn fillp(mem: &mut Memory, pattern: u16) {
    let [lo, hi] = pattern.to_le_bytes();
    mem.poke(ADDR_FILL_PATTERN, lo);
    mem.poke(ADDR_FILL_PATTERN + 1, hi);
}

/// Print text at the cursor (or at an explicit position).
///
/// Glyph rasterization is not part of this core; the call maintains the
/// cursor and pen registers and reports the text to the log facade.
pub fn print(mem: &mut Memory, text: &str, x: Option<i32>, y: Option<i32>, color: Option<u8>) {
    if let Some(c) = color {
        mem.set_pen(c);
    }
    if let (Some(x), Some(y)) = (x, y) {
        mem.set_cursor(x as u8, y as u8);
    }
    let (cx, cy) = mem.cursor();
    log::trace!("print at ({cx},{cy}): {text}");
    mem.set_cursor(cx, cy.wrapping_add(6));
}

/// Remap a color in palette table `p` (0 = draw, 1 = screen).
/// Transparency bits in the draw palette survive the remap.
pub fn pal(mem: &mut Memory, c0: u8, c1: u8, p: u8) {
    if p == 1 {
        mem.poke(ADDR_SCREEN_PALETTE + (c0 & 0x0F) as u16, c1 & 0x0F);
    } else {
        let addr = ADDR_DRAW_PALETTE + (c0 & 0x0F) as u16;
        let entry = (mem.peek(addr) & PAL_TRANSPARENT) | (c1 & 0x0F);
        mem.poke(addr, entry);
    }
}

/// Reset both palette tables to their defaults
pub fn pal_reset(mem: &mut Memory) {
    mem.reset_draw_palette();
    mem.reset_screen_palette();
}

/// Set or clear the transparency bit for a color
pub fn palt(mem: &mut Memory, c: u8, transparent: bool) {
    let addr = ADDR_DRAW_PALETTE + (c & 0x0F) as u16;
    let entry = mem.peek(addr);
    let entry = if transparent {
        entry | PAL_TRANSPARENT
    } else {
        entry & !PAL_TRANSPARENT
    };
    mem.poke(addr, entry);
}

/// Set the clip rectangle from an origin and size
pub fn clip(mem: &mut Memory, x: i32, y: i32, w: i32, h: i32) {
    let x0 = x.clamp(0, SCREEN_SIZE - 1);
    let y0 = y.clamp(0, SCREEN_SIZE - 1);
    let x1 = x.saturating_add(w).saturating_sub(1).clamp(0, SCREEN_SIZE - 1);
    let y1 = y.saturating_add(h).saturating_sub(1).clamp(0, SCREEN_SIZE - 1);
    mem.set_clip(x0 as u8, y0 as u8, x1 as u8, y1 as u8);
}
