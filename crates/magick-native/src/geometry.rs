//! Geometry text parsing (`WxH+X+Y` plus modifiers).

use magick_ffi_common::abi::geometry_flags as flags;
use magick_ffi_common::GeometryInfoC;

const MODIFIERS: &[(char, u32)] = &[
    ('%', flags::PERCENT_VALUE),
    ('!', flags::ASPECT_VALUE),
    ('<', flags::LESS_VALUE),
    ('>', flags::GREATER_VALUE),
    ('^', flags::MINIMUM_VALUE),
    ('@', flags::AREA_VALUE),
];

/// Parse geometry text. Returns `None` when nothing usable was found.
pub fn parse(text: &str) -> Option<GeometryInfoC> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some((w, h)) = text.split_once(':') {
        let width = w.trim().parse().ok()?;
        let height = h.trim().parse().ok()?;
        return Some(GeometryInfoC {
            width,
            height,
            flags: flags::WIDTH_VALUE | flags::HEIGHT_VALUE | flags::ASPECT_RATIO_VALUE,
            ..GeometryInfoC::default()
        });
    }

    let mut info = GeometryInfoC::default();
    let mut body = String::with_capacity(text.len());
    for c in text.chars() {
        match MODIFIERS.iter().find(|(m, _)| *m == c) {
            Some((_, flag)) => info.flags |= flag,
            None => body.push(c),
        }
    }

    let mut rest = body.as_str();
    let (width, tail) = take_digits(rest);
    if let Some(width) = width {
        info.width = width;
        info.flags |= flags::WIDTH_VALUE;
    }
    rest = tail;

    if let Some(tail) = rest.strip_prefix(['x', 'X']) {
        let (height, tail) = take_digits(tail);
        if let Some(height) = height {
            info.height = height;
            info.flags |= flags::HEIGHT_VALUE;
        }
        rest = tail;
    }

    if rest.starts_with(['+', '-']) {
        let (x, tail) = take_offset(rest)?;
        info.x = x;
        info.flags |= flags::X_VALUE;
        rest = tail;
        if rest.starts_with(['+', '-']) {
            let (y, tail) = take_offset(rest)?;
            info.y = y;
            info.flags |= flags::Y_VALUE;
            rest = tail;
        }
    }

    if !rest.is_empty() || info.flags == flags::NO_VALUE {
        return None;
    }
    Some(info)
}

fn take_digits(text: &str) -> (Option<usize>, &str) {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if end == 0 {
        return (None, text);
    }
    (text[..end].parse().ok(), &text[end..])
}

fn take_offset(text: &str) -> Option<(isize, &str)> {
    let negative = text.starts_with('-');
    let (value, tail) = take_digits(&text[1..]);
    let value = value? as isize;
    Some((if negative { -value } else { value }, tail))
}

/// Format geometry back to text.
pub fn format(info: &GeometryInfoC) -> String {
    if info.flags & flags::ASPECT_RATIO_VALUE != 0 {
        return format!("{}:{}", info.width, info.height);
    }

    let mut text = String::new();
    if info.flags & flags::WIDTH_VALUE != 0 {
        text.push_str(&info.width.to_string());
    }
    if info.flags & flags::HEIGHT_VALUE != 0 {
        text.push('x');
        text.push_str(&info.height.to_string());
    }
    if info.flags & (flags::X_VALUE | flags::Y_VALUE) != 0 {
        text.push_str(&format!("{:+}{:+}", info.x, info.y));
    }
    for (modifier, flag) in MODIFIERS {
        if info.flags & flag != 0 {
            text.push(*modifier);
        }
    }
    text
}
