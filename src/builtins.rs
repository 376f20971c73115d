//! The builtin function table
//!
//! Every function the console exposes to cartridge scripts is a variant
//! of the closed [`Builtin`] enum. Engines register each name once by
//! walking [`Builtin::ALL`] and routing calls through
//! [`Chipset::invoke`](crate::emulator::Chipset::invoke); there is no
//! string-keyed dispatch inside the core.

/// Every script-visible builtin function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    // Math
    Abs,
    Atan2,
    Band,
    Bnot,
    Bor,
    Bxor,
    Cos,
    Flr,
    Max,
    Mid,
    Min,
    Rnd,
    Shl,
    Shr,
    Sin,
    Sqrt,
    Srand,
    // Memory
    Memcpy,
    Memset,
    Peek,
    Poke,
    // Graphics
    Camera,
    Circ,
    Circfill,
    Clip,
    Cls,
    Color,
    Cursor,
    Fget,
    Fillp,
    Flip,
    Fset,
    Line,
    Map,
    Mget,
    Mset,
    Pal,
    Palt,
    Pget,
    Print,
    Pset,
    Rect,
    Rectfill,
    Sget,
    Spr,
    Sset,
    Sspr,
    // Audio
    Music,
    Sfx,
    // Input
    Btn,
    Btnp,
}

impl Builtin {
    /// Every builtin, in registration order
    pub const ALL: [Builtin; 51] = [
        Builtin::Abs,
        Builtin::Atan2,
        Builtin::Band,
        Builtin::Bnot,
        Builtin::Bor,
        Builtin::Bxor,
        Builtin::Cos,
        Builtin::Flr,
        Builtin::Max,
        Builtin::Mid,
        Builtin::Min,
        Builtin::Rnd,
        Builtin::Shl,
        Builtin::Shr,
        Builtin::Sin,
        Builtin::Sqrt,
        Builtin::Srand,
        Builtin::Memcpy,
        Builtin::Memset,
        Builtin::Peek,
        Builtin::Poke,
        Builtin::Camera,
        Builtin::Circ,
        Builtin::Circfill,
        Builtin::Clip,
        Builtin::Cls,
        Builtin::Color,
        Builtin::Cursor,
        Builtin::Fget,
        Builtin::Fillp,
        Builtin::Flip,
        Builtin::Fset,
        Builtin::Line,
        Builtin::Map,
        Builtin::Mget,
        Builtin::Mset,
        Builtin::Pal,
        Builtin::Palt,
        Builtin::Pget,
        Builtin::Print,
        Builtin::Pset,
        Builtin::Rect,
        Builtin::Rectfill,
        Builtin::Sget,
        Builtin::Spr,
        Builtin::Sset,
        Builtin::Sspr,
        Builtin::Music,
        Builtin::Sfx,
        Builtin::Btn,
        Builtin::Btnp,
    ];

    /// The global name scripts call this builtin by
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Abs => "abs",
            Builtin::Atan2 => "atan2",
            Builtin::Band => "band",
            Builtin::Bnot => "bnot",
            Builtin::Bor => "bor",
            Builtin::Bxor => "bxor",
            Builtin::Cos => "cos",
            Builtin::Flr => "flr",
            Builtin::Max => "max",
            Builtin::Mid => "mid",
            Builtin::Min => "min",
            Builtin::Rnd => "rnd",
            Builtin::Shl => "shl",
            Builtin::Shr => "shr",
            Builtin::Sin => "sin",
            Builtin::Sqrt => "sqrt",
            Builtin::Srand => "srand",
            Builtin::Memcpy => "memcpy",
            Builtin::Memset => "memset",
            Builtin::Peek => "peek",
            Builtin::Poke => "poke",
            Builtin::Camera => "camera",
            Builtin::Circ => "circ",
            Builtin::Circfill => "circfill",
            Builtin::Clip => "clip",
            Builtin::Cls => "cls",
            Builtin::Color => "color",
            Builtin::Cursor => "cursor",
            Builtin::Fget => "fget",
            Builtin::Fillp => "fillp",
            Builtin::Flip => "flip",
            Builtin::Fset => "fset",
            Builtin::Line => "line",
            Builtin::Map => "map",
            Builtin::Mget => "mget",
            Builtin::Mset => "mset",
            Builtin::Pal => "pal",
            Builtin::Palt => "palt",
            Builtin::Pget => "pget",
            Builtin::Print => "print",
            Builtin::Pset => "pset",
            Builtin::Rect => "rect",
            Builtin::Rectfill => "rectfill",
            Builtin::Sget => "sget",
            Builtin::Spr => "spr",
            Builtin::Sset => "sset",
            Builtin::Sspr => "sspr",
            Builtin::Music => "music",
            Builtin::Sfx => "sfx",
            Builtin::Btn => "btn",
            Builtin::Btnp => "btnp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = Builtin::ALL.iter().map(|b| b.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Builtin::ALL.len());
    }

    #[test]
    fn test_table_covers_core_surface() {
        assert!(Builtin::ALL.contains(&Builtin::Spr));
        assert!(Builtin::ALL.contains(&Builtin::Sfx));
        assert!(Builtin::ALL.contains(&Builtin::Btnp));
        assert_eq!(Builtin::Cls.name(), "cls");
    }
}
