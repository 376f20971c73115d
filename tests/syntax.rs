//! Shorthand normalization over realistic cartridge source

use pico_core::syntax::normalize;

#[test]
fn test_multiline_script() {
    let source = "x = 0\nfunction _update()\n x += 1\n if (x > 10) x = 0\nend";
    let expected =
        "x = 0\nfunction _update()\n x = x + (1) \n if (x > 10) then x = 0 end\nend";
    assert_eq!(normalize(source), expected);
}

#[test]
fn test_if_shorthand_case_insensitive() {
    assert_eq!(normalize("IF (a) b = 1"), "if (a) then b = 1 end");
}

#[test]
fn test_if_inside_identifier_untouched() {
    let source = "motif (x)";
    assert_eq!(normalize(source), source);
}

#[test]
fn test_compound_with_index_target() {
    assert_eq!(normalize("a[1] += 2"), "a[1] = a[1] + (2) ");
}

#[test]
fn test_compound_with_field_target() {
    assert_eq!(normalize("p.x += p.dx"), "p.x = p.x + (p.dx) ");
}

#[test]
fn test_not_equal_rewrites_everywhere() {
    assert_eq!(
        normalize("if (a != b) c = 1"),
        "if (a ~= b) then c = 1 end"
    );
}

#[test]
fn test_nested_if_shorthand() {
    assert_eq!(
        normalize("if (a) if (b) c = 1"),
        "if (a) then if (b) then c = 1 end end"
    );
}

#[test]
fn test_hex_literal_in_expression() {
    assert_eq!(normalize("mask += 0x10"), "mask = mask + (0x10) ");
}

#[test]
fn test_negative_literal_in_expression() {
    assert_eq!(normalize("v += -1"), "v = v + (-1) ");
}

#[test]
fn test_division_and_modulo() {
    assert_eq!(normalize("t /= 2"), "t = t / (2) ");
    assert_eq!(normalize("t %= 8"), "t = t % (8) ");
}

#[test]
fn test_unbalanced_if_and_compound_are_left_alone() {
    assert_eq!(normalize("if (x"), "if (x");
    assert_eq!(normalize("x += (1"), "x += (1");
}
