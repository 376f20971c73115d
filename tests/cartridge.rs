//! Cartridge container and code stream tests

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use pico_core::cartridge::{Cartridge, CartridgeError, CART_SIZE, IMAGE_HEIGHT, IMAGE_WIDTH, ROM_SIZE};

/// Hide a decoded ROM inside the two low bits of every pixel channel,
/// the inverse of the loader's reconstruction.
fn encode_cartridge_png(rom: &[u8]) -> Vec<u8> {
    let mut img = RgbaImage::new(IMAGE_WIDTH, IMAGE_HEIGHT);
    for (i, pixel) in img.pixels_mut().enumerate() {
        let byte = rom.get(i).copied().unwrap_or(0);
        let r = (byte >> 4) & 3;
        let g = (byte >> 2) & 3;
        let b = byte & 3;
        let a = (byte >> 6) & 3;
        // High channel bits are arbitrary carrier data; keep alpha high
        // so the image stays visibly opaque.
        *pixel = Rgba([0x80 | r, 0x40 | g, 0x20 | b, 0xFC | a]);
    }
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn rom_with_plain_code(code: &str) -> Vec<u8> {
    let mut rom = vec![0u8; CART_SIZE];
    let window = &mut rom[0x4300..];
    window[..3].copy_from_slice(b":c:");
    window[3..3 + code.len()].copy_from_slice(code.as_bytes());
    rom
}

#[test]
fn test_png_roundtrip() {
    let mut rom = rom_with_plain_code("print(1)");
    rom[0] = 0xAB;
    rom[ROM_SIZE - 1] = 0xCD;
    rom[ROM_SIZE] = 3; // version
    rom[ROM_SIZE + 4] = 42; // build, low byte of big-endian u32

    let png = encode_cartridge_png(&rom);
    let cart = Cartridge::from_png_bytes(&png).unwrap();
    assert_eq!(cart.rom()[0], 0xAB);
    assert_eq!(cart.rom()[ROM_SIZE - 1], 0xCD);
    assert_eq!(cart.version(), 3);
    assert_eq!(cart.build(), 42);
    assert_eq!(cart.extract_script().unwrap(), "print(1)");
}

#[test]
fn test_wrong_dimensions_rejected() {
    let img = RgbaImage::new(128, 128);
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    assert!(matches!(
        Cartridge::from_png_bytes(&bytes),
        Err(CartridgeError::BadFormat)
    ));
}

#[test]
fn test_garbage_bytes_rejected() {
    assert!(matches!(
        Cartridge::from_png_bytes(b"not a png at all"),
        Err(CartridgeError::BadImage(_))
    ));
}

#[test]
fn test_plain_code_stops_at_nul() {
    let mut rom = rom_with_plain_code("x = 1");
    // Garbage after the NUL terminator must not leak into the script.
    rom[0x4300 + 3 + 5] = 0;
    rom[0x4300 + 3 + 6] = b'!';
    let cart = Cartridge::from_rom(rom).unwrap();
    assert_eq!(cart.extract_script().unwrap(), "x = 1");
}

#[test]
fn test_compressed_literals_and_run() {
    let mut rom = vec![0u8; CART_SIZE];
    // Alphabet: index 0 is '\n', 1 is ' ', 12 is 'a'; control = index + 1.
    // One literal 'a' then a back-reference (offset 1, length 5) that
    // consumes its own output: "aaaaaa".
    rom[0x4305] = 6; // decompressed size, big-endian low byte
    rom[0x4308] = 13; // 'a'
    rom[0x4309] = 0x3C; // back-reference, offset high part 0
    rom[0x430A] = 0x31; // length (3 + 2) << 4 | offset 1
    let cart = Cartridge::from_rom(rom).unwrap();
    assert_eq!(cart.extract_script().unwrap(), "aaaaaa");
}

#[test]
fn test_compressed_escape_byte() {
    let mut rom = vec![0u8; CART_SIZE];
    rom[0x4305] = 2;
    rom[0x4308] = 0x00; // escape
    rom[0x4309] = b'Z'; // raw byte outside the alphabet
    rom[0x430A] = 13; // 'a'
    let cart = Cartridge::from_rom(rom).unwrap();
    assert_eq!(cart.extract_script().unwrap(), "Za");
}

#[test]
fn test_truncated_escape_is_an_error() {
    let mut rom = vec![0u8; CART_SIZE];
    // Promise far more output than the stream holds.
    rom[0x4304] = 0xFF;
    rom[0x4305] = 0xFF;
    // One literal shifts the zero stream onto odd alignment, so the
    // escape-pair walk lands on the very last byte with no raw byte
    // left to consume.
    rom[0x4308] = 13; // 'a'
    let cart = Cartridge::from_rom(rom).unwrap();
    assert!(matches!(
        cart.extract_script(),
        Err(CartridgeError::TruncatedCode)
    ));
}
