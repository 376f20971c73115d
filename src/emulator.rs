//! Console bridge
//!
//! Two layers live here. [`Chipset`] owns the hardware state (memory,
//! audio, input, PRNG) and exposes the whole builtin surface through one
//! uniform entry point, [`Chipset::invoke`]. [`Emulator`] pairs a chipset
//! with a host-supplied [`ScriptEngine`] and drives the cartridge
//! lifecycle: load, `_init`, then `_update`/`_draw` once per frame.
//!
//! Number semantics for the bitwise builtins follow the console's 16.16
//! fixed-point model: values are scaled by 65536, truncated toward zero
//! into 32 bits, operated on, and scaled back. Angles are full turns in
//! [0, 1) and `sin` is negated (screen y grows downward).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::apu::Apu;
use crate::builtins::Builtin;
use crate::cartridge::{Cartridge, CartridgeError};
use crate::input::{Button, InputState};
use crate::memory::{Memory, ADDR_USER};
use crate::ppu;
use crate::script::{ScriptEngine, ScriptError, Value};
use crate::syntax;

/// Fixed-point scale for the bitwise builtins (16.16)
const FRAC: f64 = 65536.0;

/// Dialect-level helpers defined in script source rather than as
/// builtins: collection utilities and coroutine aliases. Loaded once at
/// construction, before any cartridge code runs.
const DIALECT_HELPERS: &str = r#"
function tostr(x)
    if type(x) == "number" then
        return tostring(math.floor(x * 10000) / 10000)
    end
    return tostring(x)
end

function add(a, v)
    if a == nil then
        return
    end
    table.insert(a, v)
end

function del(a, dv)
    if a == nil then
        return
    end
    for i, v in ipairs(a) do
        if v == dv then
            table.remove(a, i)
            return
        end
    end
end

function foreach(a, f)
    if not a then
        return
    end
    for i, v in ipairs(a) do
        f(v)
    end
end

function all(t)
    local i = 0
    local n = #t
    return function()
        i = i + 1
        if i <= n then
            return t[i]
        end
    end
end

function count(a)
    return #a
end

cocreate = coroutine.create
coresume = coroutine.resume
costatus = coroutine.status
yield = coroutine.yield
"#;

/// Emulator error types
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// The cartridge container or its code stream is malformed
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    /// The script engine reported an error
    #[error(transparent)]
    Script(#[from] ScriptError),
}

fn to_fixed(x: f64) -> i32 {
    (x * FRAC) as i64 as i32
}

fn from_fixed(x: i32) -> f64 {
    x as f64 / FRAC
}

fn num(args: &[Value], i: usize) -> Option<f64> {
    args.get(i).and_then(Value::as_number)
}

fn int(args: &[Value], i: usize) -> Option<i32> {
    args.get(i).and_then(Value::as_i32)
}

fn byte(args: &[Value], i: usize) -> Option<u8> {
    int(args, i).map(|n| n as u8)
}

fn addr(args: &[Value], i: usize) -> Option<u16> {
    num(args, i).map(|n| n as i64 as u16)
}

fn flag(args: &[Value], i: usize) -> bool {
    args.get(i).map(Value::truthy).unwrap_or(false)
}

fn number(n: f64) -> Vec<Value> {
    vec![Value::Number(n)]
}

/// The hardware half of the console
#[derive(Debug)]
pub struct Chipset {
    pub memory: Memory,
    pub apu: Apu,
    pub input: InputState,
    rng: StdRng,
}

impl Chipset {
    /// Create a chipset with cleared memory and a time-independent PRNG
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            apu: Apu::default(),
            input: InputState::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Reseed the script-visible PRNG
    pub fn seed_rng(&mut self, seed: f64) {
        self.rng = StdRng::seed_from_u64((seed * FRAC) as i64 as u64);
    }

    /// Dispatch one builtin call.
    ///
    /// Arguments arrive as loosely typed [`Value`]s straight from the
    /// engine; a missing or non-numeric required argument turns the call
    /// into a no-op (or a zero result) rather than an error, matching how
    /// forgiving the console is toward cartridge code.
    pub fn invoke(&mut self, builtin: Builtin, args: &[Value]) -> Vec<Value> {
        match builtin {
            // -- math ----------------------------------------------------
            Builtin::Abs => number(num(args, 0).unwrap_or(0.0).abs()),
            Builtin::Atan2 => {
                let dx = num(args, 0).unwrap_or(0.0);
                let dy = num(args, 1).unwrap_or(0.0);
                number(1.0 - dy.atan2(dx) / std::f64::consts::TAU)
            }
            Builtin::Band => {
                let x = num(args, 0).unwrap_or(0.0);
                let y = num(args, 1).unwrap_or(0.0);
                number(from_fixed(to_fixed(x) & to_fixed(y)))
            }
            Builtin::Bnot => number(from_fixed(!to_fixed(num(args, 0).unwrap_or(0.0)))),
            Builtin::Bor => {
                let x = num(args, 0).unwrap_or(0.0);
                let y = num(args, 1).unwrap_or(0.0);
                number(from_fixed(to_fixed(x) | to_fixed(y)))
            }
            Builtin::Bxor => {
                let x = num(args, 0).unwrap_or(0.0);
                let y = num(args, 1).unwrap_or(0.0);
                number(from_fixed(to_fixed(x) ^ to_fixed(y)))
            }
            Builtin::Cos => {
                number((num(args, 0).unwrap_or(0.0) * std::f64::consts::TAU).cos())
            }
            Builtin::Sin => {
                number(-(num(args, 0).unwrap_or(0.0) * std::f64::consts::TAU).sin())
            }
            Builtin::Flr => number(num(args, 0).unwrap_or(0.0).floor()),
            Builtin::Max => {
                number(num(args, 0).unwrap_or(0.0).max(num(args, 1).unwrap_or(0.0)))
            }
            Builtin::Min => {
                number(num(args, 0).unwrap_or(0.0).min(num(args, 1).unwrap_or(0.0)))
            }
            Builtin::Mid => {
                let x = num(args, 0).unwrap_or(0.0);
                let y = num(args, 1).unwrap_or(0.0);
                let z = num(args, 2).unwrap_or(0.0);
                number(x.min(y).max(x.max(y).min(z)))
            }
            Builtin::Rnd => {
                let limit = num(args, 0).unwrap_or(1.0);
                number(self.rng.gen::<f64>() * limit)
            }
            Builtin::Srand => {
                self.seed_rng(num(args, 0).unwrap_or(0.0));
                vec![]
            }
            Builtin::Shl => {
                let x = num(args, 0).unwrap_or(0.0);
                let n = int(args, 1).unwrap_or(0);
                number(from_fixed(to_fixed(x).wrapping_shl(n as u32)))
            }
            Builtin::Shr => {
                let x = num(args, 0).unwrap_or(0.0);
                let n = int(args, 1).unwrap_or(0);
                number(from_fixed(to_fixed(x).wrapping_shr(n as u32)))
            }
            Builtin::Sqrt => number(num(args, 0).unwrap_or(0.0).sqrt()),

            // -- memory --------------------------------------------------
            Builtin::Peek => {
                let value = addr(args, 0).map(|a| self.memory.peek(a)).unwrap_or(0);
                number(value as f64)
            }
            Builtin::Poke => {
                if let (Some(a), Some(v)) = (addr(args, 0), byte(args, 1)) {
                    self.memory.poke(a, v);
                }
                vec![]
            }
            Builtin::Memcpy => {
                if let (Some(dst), Some(src), Some(len)) =
                    (addr(args, 0), addr(args, 1), addr(args, 2))
                {
                    self.memory.block_copy(dst, src, len);
                }
                vec![]
            }
            Builtin::Memset => {
                if let (Some(start), Some(value), Some(len)) =
                    (addr(args, 0), byte(args, 1), addr(args, 2))
                {
                    self.memory.block_set(start, value, len);
                }
                vec![]
            }

            // -- graphics ------------------------------------------------
            Builtin::Camera => {
                let x = int(args, 0).unwrap_or(0);
                let y = int(args, 1).unwrap_or(0);
                self.memory.set_camera(x as i16, y as i16);
                vec![]
            }
            Builtin::Circ => {
                if let (Some(x), Some(y), Some(r)) = (int(args, 0), int(args, 1), int(args, 2)) {
                    ppu::circ(&mut self.memory, x, y, r, byte(args, 3));
                }
                vec![]
            }
            Builtin::Circfill => {
                if let (Some(x), Some(y), Some(r)) = (int(args, 0), int(args, 1), int(args, 2)) {
                    ppu::circfill(&mut self.memory, x, y, r, byte(args, 3));
                }
                vec![]
            }
            Builtin::Clip => {
                if let (Some(x), Some(y), Some(w), Some(h)) =
                    (int(args, 0), int(args, 1), int(args, 2), int(args, 3))
                {
                    ppu::clip(&mut self.memory, x, y, w, h);
                } else {
                    self.memory.reset_clip();
                }
                vec![]
            }
            Builtin::Cls => {
                ppu::cls(&mut self.memory);
                vec![]
            }
            Builtin::Color => {
                ppu::color(&mut self.memory, byte(args, 0));
                vec![]
            }
            Builtin::Cursor => {
                let x = byte(args, 0).unwrap_or(0);
                let y = byte(args, 1).unwrap_or(0);
                ppu::cursor(&mut self.memory, x, y);
                vec![]
            }
            Builtin::Fget => {
                let n = match int(args, 0) {
                    Some(n) => n,
                    None => return number(0.0),
                };
                match int(args, 1) {
                    Some(bit) => vec![Value::Boolean(ppu::fget_bit(&self.memory, n, bit))],
                    None => number(ppu::fget(&self.memory, n) as f64),
                }
            }
            Builtin::Fset => {
                if let Some(n) = int(args, 0) {
                    if args.len() >= 3 {
                        if let Some(bit) = int(args, 1) {
                            ppu::fset_bit(&mut self.memory, n, bit, flag(args, 2));
                        }
                    } else if let Some(flags) = byte(args, 1) {
                        ppu::fset(&mut self.memory, n, flags);
                    }
                }
                vec![]
            }
            Builtin::Fillp => {
                ppu::fillp(&mut self.memory, int(args, 0).unwrap_or(0) as u16);
                vec![]
            }
            Builtin::Flip => vec![],
            Builtin::Line => {
                if let (Some(x0), Some(y0), Some(x1), Some(y1)) =
                    (int(args, 0), int(args, 1), int(args, 2), int(args, 3))
                {
                    ppu::line(&mut self.memory, x0, y0, x1, y1, byte(args, 4));
                }
                vec![]
            }
            Builtin::Map => {
                if let (Some(cx), Some(cy), Some(sx), Some(sy), Some(cw), Some(ch)) = (
                    int(args, 0),
                    int(args, 1),
                    int(args, 2),
                    int(args, 3),
                    int(args, 4),
                    int(args, 5),
                ) {
                    let layer = byte(args, 6).unwrap_or(0);
                    ppu::map(&mut self.memory, cx, cy, sx, sy, cw, ch, layer);
                }
                vec![]
            }
            Builtin::Mget => {
                let x = int(args, 0).unwrap_or(-1);
                let y = int(args, 1).unwrap_or(-1);
                number(ppu::mget(&self.memory, x, y) as f64)
            }
            Builtin::Mset => {
                if let (Some(x), Some(y), Some(v)) = (int(args, 0), int(args, 1), byte(args, 2)) {
                    ppu::mset(&mut self.memory, x, y, v);
                }
                vec![]
            }
            Builtin::Pal => {
                if let (Some(c0), Some(c1)) = (byte(args, 0), byte(args, 1)) {
                    ppu::pal(&mut self.memory, c0, c1, byte(args, 2).unwrap_or(0));
                } else {
                    ppu::pal_reset(&mut self.memory);
                }
                vec![]
            }
            Builtin::Palt => {
                match byte(args, 0) {
                    Some(c) => ppu::palt(&mut self.memory, c, flag(args, 1)),
                    None => self.memory.reset_transparency(),
                }
                vec![]
            }
            Builtin::Pget => {
                let x = int(args, 0).unwrap_or(-1);
                let y = int(args, 1).unwrap_or(-1);
                number(ppu::pget(&mut self.memory, x, y) as f64)
            }
            Builtin::Print => {
                let text = args.first().map(Value::display).unwrap_or_default();
                ppu::print(
                    &mut self.memory,
                    &text,
                    int(args, 1),
                    int(args, 2),
                    byte(args, 3),
                );
                vec![]
            }
            Builtin::Pset => {
                if let (Some(x), Some(y)) = (int(args, 0), int(args, 1)) {
                    ppu::pset(&mut self.memory, x, y, byte(args, 2));
                }
                vec![]
            }
            Builtin::Rect => {
                if let (Some(x0), Some(y0), Some(x1), Some(y1)) =
                    (int(args, 0), int(args, 1), int(args, 2), int(args, 3))
                {
                    ppu::rect(&mut self.memory, x0, y0, x1, y1, byte(args, 4));
                }
                vec![]
            }
            Builtin::Rectfill => {
                if let (Some(x0), Some(y0), Some(x1), Some(y1)) =
                    (int(args, 0), int(args, 1), int(args, 2), int(args, 3))
                {
                    ppu::rectfill(&mut self.memory, x0, y0, x1, y1, byte(args, 4));
                }
                vec![]
            }
            Builtin::Sget => {
                let x = int(args, 0).unwrap_or(-1);
                let y = int(args, 1).unwrap_or(-1);
                number(ppu::sget(&self.memory, x, y) as f64)
            }
            Builtin::Sset => {
                if let (Some(x), Some(y), Some(c)) = (int(args, 0), int(args, 1), byte(args, 2)) {
                    ppu::sset(&mut self.memory, x, y, c);
                }
                vec![]
            }
            Builtin::Spr => {
                if let (Some(n), Some(x), Some(y)) = (int(args, 0), int(args, 1), int(args, 2)) {
                    ppu::spr(
                        &mut self.memory,
                        n,
                        x,
                        y,
                        num(args, 3).unwrap_or(1.0),
                        num(args, 4).unwrap_or(1.0),
                        flag(args, 5),
                        flag(args, 6),
                    );
                }
                vec![]
            }
            Builtin::Sspr => {
                if let (Some(sx), Some(sy), Some(sw), Some(sh), Some(dx), Some(dy)) = (
                    int(args, 0),
                    int(args, 1),
                    int(args, 2),
                    int(args, 3),
                    int(args, 4),
                    int(args, 5),
                ) {
                    ppu::sspr(
                        &mut self.memory,
                        sx,
                        sy,
                        sw,
                        sh,
                        dx,
                        dy,
                        int(args, 6),
                        int(args, 7),
                        flag(args, 8),
                        flag(args, 9),
                    );
                }
                vec![]
            }

            // -- audio ---------------------------------------------------
            Builtin::Music => {
                self.apu.music(
                    int(args, 0).unwrap_or(-1),
                    int(args, 1).unwrap_or(0),
                    int(args, 2).unwrap_or(0),
                );
                vec![]
            }
            Builtin::Sfx => {
                if let Some(n) = int(args, 0) {
                    self.apu.sfx(
                        &self.memory,
                        n,
                        int(args, 1).unwrap_or(-1),
                        int(args, 2).unwrap_or(0),
                        int(args, 3).unwrap_or(0),
                    );
                }
                vec![]
            }

            // -- input ---------------------------------------------------
            Builtin::Btn => {
                let held = int(args, 0)
                    .and_then(|n| u8::try_from(n).ok())
                    .and_then(Button::from_index)
                    .map(|b| self.input.held(b))
                    .unwrap_or(false);
                vec![Value::Boolean(held)]
            }
            Builtin::Btnp => {
                let pressed = int(args, 0)
                    .and_then(|n| u8::try_from(n).ok())
                    .and_then(Button::from_index)
                    .map(|b| self.input.pressed(b))
                    .unwrap_or(false);
                vec![Value::Boolean(pressed)]
            }
        }
    }

    /// Host audio pull path: synthesize into an interleaved buffer
    pub fn fill_audio_buffer(&mut self, data: &mut [f32], channels: usize) {
        self.apu.fill_buffer(&self.memory, data, channels);
    }
}

impl Default for Chipset {
    fn default() -> Self {
        Self::new()
    }
}

/// Emulator structure: a chipset driven by a script engine
pub struct Emulator<E: ScriptEngine> {
    chipset: Chipset,
    engine: E,
}

impl<E: ScriptEngine> Emulator<E> {
    /// Pair a chipset with an engine and preload the dialect helpers
    pub fn new(engine: E) -> Result<Self, ScriptError> {
        let mut emulator = Self {
            chipset: Chipset::new(),
            engine,
        };
        emulator.run(DIALECT_HELPERS)?;
        Ok(emulator)
    }

    /// Normalize shorthand syntax and hand the source to the engine
    pub fn run(&mut self, source: &str) -> Result<(), ScriptError> {
        let source = syntax::normalize(source);
        self.engine.run(&mut self.chipset, &source)
    }

    /// Load a cartridge: copy its data sections into memory, run its
    /// script, then call `_init` if the script defined one.
    pub fn load_cartridge(&mut self, cart: &Cartridge) -> Result<(), EmulatorError> {
        self.chipset.memory.load_rom(cart.rom(), 0, ADDR_USER as usize);
        let script = cart.extract_script()?;
        log::debug!("cartridge script: {} chars", script.len());
        self.run(&script)?;
        if self.engine.has_global("_init") {
            self.engine.call(&mut self.chipset, "_init", &[])?;
        }
        Ok(())
    }

    /// Latch a button press for the coming frame
    pub fn send_input(&mut self, button: Button) {
        self.chipset.input.press(button);
    }

    /// Run one frame: `_update` then `_draw` (each only if defined),
    /// then roll the input double buffer.
    pub fn update(&mut self) -> Result<(), ScriptError> {
        if self.engine.has_global("_update") {
            self.engine.call(&mut self.chipset, "_update", &[])?;
        }
        if self.engine.has_global("_draw") {
            self.engine.call(&mut self.chipset, "_draw", &[])?;
        }
        self.chipset.input.next_frame();
        Ok(())
    }

    /// The 8192-byte packed framebuffer
    pub fn screen(&self) -> &[u8] {
        self.chipset.memory.video_buffer()
    }

    /// Host audio pull path
    pub fn fill_audio_buffer(&mut self, data: &mut [f32], channels: usize) {
        self.chipset.fill_audio_buffer(data, channels);
    }

    /// Direct chipset access
    pub fn chipset(&mut self) -> &mut Chipset {
        &mut self.chipset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    fn first_number(results: Vec<Value>) -> f64 {
        match results.first() {
            Some(Value::Number(v)) => *v,
            other => panic!("expected a number result, got {other:?}"),
        }
    }

    #[test]
    fn test_band_integer_and_fractional() {
        let mut chipset = Chipset::new();
        assert_eq!(
            first_number(chipset.invoke(Builtin::Band, &[n(3.0), n(2.0)])),
            2.0
        );
        assert_eq!(
            first_number(chipset.invoke(Builtin::Band, &[n(3.25), n(2.75)])),
            2.25
        );
    }

    #[test]
    fn test_shl_overflows_to_negative() {
        let mut chipset = Chipset::new();
        assert_eq!(
            first_number(chipset.invoke(Builtin::Shl, &[n(1.0), n(15.0)])),
            -32768.0
        );
    }

    #[test]
    fn test_mid_clamps() {
        let mut chipset = Chipset::new();
        assert_eq!(
            first_number(chipset.invoke(Builtin::Mid, &[n(1.0), n(5.0), n(3.0)])),
            3.0
        );
        assert_eq!(
            first_number(chipset.invoke(Builtin::Mid, &[n(1.0), n(5.0), n(0.0)])),
            1.0
        );
    }

    #[test]
    fn test_peek_poke_through_dispatch() {
        let mut chipset = Chipset::new();
        chipset.invoke(Builtin::Poke, &[n(0x4300 as f64), n(0x42 as f64)]);
        assert_eq!(
            first_number(chipset.invoke(Builtin::Peek, &[n(0x4300 as f64)])),
            0x42 as f64
        );
    }

    #[test]
    fn test_srand_reproducibility() {
        let mut a = Chipset::new();
        let mut b = Chipset::new();
        a.invoke(Builtin::Srand, &[n(7.0)]);
        b.invoke(Builtin::Srand, &[n(7.0)]);
        for _ in 0..16 {
            let x = first_number(a.invoke(Builtin::Rnd, &[n(1.0)]));
            let y = first_number(b.invoke(Builtin::Rnd, &[n(1.0)]));
            assert_eq!(x, y);
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_btn_defaults_false() {
        let mut chipset = Chipset::new();
        assert_eq!(
            chipset.invoke(Builtin::Btn, &[n(0.0)]),
            vec![Value::Boolean(false)]
        );
        chipset.input.press(Button::Left);
        assert_eq!(
            chipset.invoke(Builtin::Btn, &[n(0.0)]),
            vec![Value::Boolean(true)]
        );
    }
}
