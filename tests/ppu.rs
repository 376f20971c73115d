//! Rasterizer tests against the packed framebuffer

use pico_core::memory::Memory;
use pico_core::ppu;

#[test]
fn test_cls_clears_framebuffer() {
    let mut mem = Memory::new();
    ppu::pset(&mut mem, 64, 64, Some(7));
    ppu::cls(&mut mem);
    assert!(mem.video_buffer().iter().all(|&b| b == 0));
}

#[test]
fn test_clip_blocks_outside_writes() {
    let mut mem = Memory::new();
    ppu::clip(&mut mem, 10, 10, 20, 20);
    ppu::pset(&mut mem, 5, 5, Some(7));
    ppu::pset(&mut mem, 15, 15, Some(7));
    ppu::pset(&mut mem, 30, 30, Some(7));
    assert_eq!(ppu::pget(&mut mem, 5, 5), 0);
    assert_eq!(ppu::pget(&mut mem, 15, 15), 7);
    assert_eq!(ppu::pget(&mut mem, 30, 30), 0);

    // clip() with no explicit rectangle restores the full screen.
    mem.reset_clip();
    ppu::pset(&mut mem, 5, 5, Some(7));
    assert_eq!(ppu::pget(&mut mem, 5, 5), 7);
}

#[test]
fn test_horizontal_line() {
    let mut mem = Memory::new();
    ppu::line(&mut mem, 10, 20, 20, 20, Some(8));
    for x in 10..=20 {
        assert_eq!(ppu::pget(&mut mem, x, 20), 8);
    }
    assert_eq!(ppu::pget(&mut mem, 9, 20), 0);
    assert_eq!(ppu::pget(&mut mem, 21, 20), 0);
}

#[test]
fn test_line_endpoint_order_does_not_matter() {
    let mut a = Memory::new();
    let mut b = Memory::new();
    ppu::line(&mut a, 5, 5, 25, 15, Some(8));
    ppu::line(&mut b, 25, 15, 5, 5, Some(8));
    assert_eq!(a.video_buffer(), b.video_buffer());
}

#[test]
fn test_rectfill_covers_region() {
    let mut mem = Memory::new();
    ppu::rectfill(&mut mem, 4, 4, 6, 6, Some(12));
    for y in 4..=6 {
        for x in 4..=6 {
            assert_eq!(ppu::pget(&mut mem, x, y), 12);
        }
    }
    assert_eq!(ppu::pget(&mut mem, 7, 4), 0);
}

#[test]
fn test_rect_corners_swap() {
    let mut mem = Memory::new();
    ppu::rect(&mut mem, 20, 20, 10, 10, Some(3));
    assert_eq!(ppu::pget(&mut mem, 10, 10), 3);
    assert_eq!(ppu::pget(&mut mem, 20, 20), 3);
    assert_eq!(ppu::pget(&mut mem, 15, 15), 0);
}

#[test]
fn test_circfill_contains_center() {
    let mut mem = Memory::new();
    ppu::circfill(&mut mem, 64, 64, 4, Some(9));
    assert_eq!(ppu::pget(&mut mem, 64, 64), 9);
    assert_eq!(ppu::pget(&mut mem, 64, 60), 9);
    assert_eq!(ppu::pget(&mut mem, 64, 40), 0);
}

#[test]
fn test_circle_radius_at_integer_limit() {
    let mut mem = Memory::new();
    // The one-fatter radius wraps past i32::MAX and draws nothing.
    ppu::circ(&mut mem, 64, 64, i32::MAX, Some(7));
    ppu::circfill(&mut mem, 64, 64, i32::MAX, Some(7));
    ppu::circ(&mut mem, 64, 64, -2, Some(7));
    assert!(mem.video_buffer().iter().all(|&b| b == 0));
}

#[test]
fn test_extreme_coordinates_draw_nothing() {
    let mut mem = Memory::new();
    ppu::pset(&mut mem, i32::MAX, i32::MIN, Some(7));
    ppu::line(&mut mem, i32::MAX, i32::MAX, i32::MAX, i32::MIN, Some(7));
    assert!(mem.video_buffer().iter().all(|&b| b == 0));

    // An oversized clip rectangle saturates to the full screen.
    ppu::clip(&mut mem, 0, 0, i32::MAX, i32::MAX);
    ppu::pset(&mut mem, 5, 5, Some(7));
    assert_eq!(ppu::pget(&mut mem, 5, 5), 7);
}

#[test]
fn test_spr_draws_and_skips_transparent() {
    let mut mem = Memory::new();
    // Sprite 0: one solid pixel at (0,0), color 0 everywhere else.
    ppu::sset(&mut mem, 0, 0, 5);
    // Background pixel the transparent sprite texel must not clobber.
    ppu::pset(&mut mem, 11, 10, Some(9));

    ppu::spr(&mut mem, 0, 10, 10, 1.0, 1.0, false, false);
    assert_eq!(ppu::pget(&mut mem, 10, 10), 5);
    assert_eq!(ppu::pget(&mut mem, 11, 10), 9);
}

#[test]
fn test_spr_flip_x() {
    let mut mem = Memory::new();
    ppu::sset(&mut mem, 0, 0, 5);
    ppu::spr(&mut mem, 0, 0, 0, 1.0, 1.0, true, false);
    assert_eq!(ppu::pget(&mut mem, 7, 0), 5);
    assert_eq!(ppu::pget(&mut mem, 0, 0), 0);
}

#[test]
fn test_spr_row_major_indexing() {
    let mut mem = Memory::new();
    // Sprite 17 starts at sheet (8, 8).
    ppu::sset(&mut mem, 8, 8, 6);
    ppu::spr(&mut mem, 17, 0, 0, 1.0, 1.0, false, false);
    assert_eq!(ppu::pget(&mut mem, 0, 0), 6);
}

#[test]
fn test_sspr_default_destination_size() {
    let mut mem = Memory::new();
    ppu::sset(&mut mem, 0, 0, 4);
    ppu::sset(&mut mem, 1, 1, 4);
    ppu::sspr(&mut mem, 0, 0, 2, 2, 20, 20, None, None, false, false);
    assert_eq!(ppu::pget(&mut mem, 20, 20), 4);
    assert_eq!(ppu::pget(&mut mem, 21, 21), 4);
}

#[test]
fn test_sspr_doubles_pixels() {
    let mut mem = Memory::new();
    ppu::sset(&mut mem, 0, 0, 4);
    ppu::sspr(&mut mem, 0, 0, 1, 1, 30, 30, Some(2), Some(2), false, false);
    for (x, y) in [(30, 30), (31, 30), (30, 31), (31, 31)] {
        assert_eq!(ppu::pget(&mut mem, x, y), 4);
    }
}

#[test]
fn test_map_draws_cells_and_skips_zero() {
    let mut mem = Memory::new();
    ppu::sset(&mut mem, 8, 0, 7); // sprite 1 texel
    ppu::mset(&mut mem, 0, 0, 1);
    // Cell (1,0) stays sprite 0 and must not draw.
    ppu::pset(&mut mem, 8, 0, Some(9));

    ppu::map(&mut mem, 0, 0, 0, 0, 2, 1, 0);
    assert_eq!(ppu::pget(&mut mem, 0, 0), 7);
    assert_eq!(ppu::pget(&mut mem, 8, 0), 9);
}

#[test]
fn test_map_layer_filter() {
    let mut mem = Memory::new();
    ppu::sset(&mut mem, 8, 0, 7);
    ppu::mset(&mut mem, 0, 0, 1);
    ppu::fset(&mut mem, 1, 0b01);

    // Mask bit 1 is not set on the sprite: cell filtered out.
    ppu::map(&mut mem, 0, 0, 0, 0, 1, 1, 0b10);
    assert_eq!(ppu::pget(&mut mem, 0, 0), 0);

    // Matching mask draws it.
    ppu::map(&mut mem, 0, 0, 0, 0, 1, 1, 0b01);
    assert_eq!(ppu::pget(&mut mem, 0, 0), 7);
}

#[test]
fn test_pal_remaps_draw_color() {
    let mut mem = Memory::new();
    ppu::pal(&mut mem, 7, 8, 0);
    ppu::pset(&mut mem, 0, 0, Some(7));
    assert_eq!(ppu::pget(&mut mem, 0, 0), 8);

    ppu::pal_reset(&mut mem);
    ppu::pset(&mut mem, 1, 0, Some(7));
    assert_eq!(ppu::pget(&mut mem, 1, 0), 7);
}

#[test]
fn test_palt_makes_color_transparent_for_sprites() {
    let mut mem = Memory::new();
    ppu::sset(&mut mem, 0, 0, 5);
    ppu::palt(&mut mem, 5, true);
    ppu::spr(&mut mem, 0, 0, 0, 1.0, 1.0, false, false);
    assert_eq!(ppu::pget(&mut mem, 0, 0), 0);

    ppu::palt(&mut mem, 5, false);
    ppu::spr(&mut mem, 0, 0, 0, 1.0, 1.0, false, false);
    assert_eq!(ppu::pget(&mut mem, 0, 0), 5);
}

#[test]
fn test_print_advances_cursor() {
    let mut mem = Memory::new();
    ppu::print(&mut mem, "hello", Some(4), Some(10), Some(7));
    assert_eq!(mem.cursor(), (4, 16));
    assert_eq!(mem.pen(), 7);

    ppu::print(&mut mem, "again", None, None, None);
    assert_eq!(mem.cursor(), (4, 22));
}
