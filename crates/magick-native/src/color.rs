//! Native color instances and color text parsing.

use crate::quantum::{self, Quantum, QUANTUM_DEPTH, QUANTUM_RANGE};

/// Color channels as stored behind a `RawColor` handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorInstance {
    pub red: Quantum,
    pub green: Quantum,
    pub blue: Quantum,
    pub alpha: Quantum,
    pub black: Quantum,
    pub is_cmyk: bool,
}

impl Default for ColorInstance {
    /// Opaque black.
    fn default() -> Self {
        let zero = quantum::from_f64(0.0);
        Self {
            red: zero,
            green: zero,
            blue: zero,
            alpha: quantum::opaque(),
            black: zero,
            is_cmyk: false,
        }
    }
}

const NAMED_COLORS: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("lime", [0, 255, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("purple", [128, 0, 128, 255]),
    ("none", [0, 0, 0, 0]),
    ("transparent", [0, 0, 0, 0]),
];

impl ColorInstance {
    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self {
            red: quantum::scale_from(u32::from(rgba[0]), 255),
            green: quantum::scale_from(u32::from(rgba[1]), 255),
            blue: quantum::scale_from(u32::from(rgba[2]), 255),
            alpha: quantum::scale_from(u32::from(rgba[3]), 255),
            ..Self::default()
        }
    }

    pub fn is_opaque(&self) -> bool {
        quantum::to_f64(self.alpha) >= QUANTUM_RANGE
    }

    /// Parse color text: `#RGB`, `#RRGGBB`, `#RRGGBBAA`, the 16-bit variants,
    /// `rgb()`/`rgba()`, `cmyk()`/`cmyka()`, or a known color name.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = text.to_ascii_lowercase();
        if let Some(args) = function_args(&lower, "rgba").or_else(|| function_args(&lower, "rgb")) {
            return parse_rgb(&args);
        }
        if let Some(args) = function_args(&lower, "cmyka").or_else(|| function_args(&lower, "cmyk")) {
            return parse_cmyk(&args);
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, rgba)| Self::from_rgba8(*rgba))
    }

    /// Hex text at the build's depth: two digits per channel for 8-bit
    /// quanta, four otherwise. CMYK colors use `cmyka(...)`.
    pub fn to_text(&self) -> String {
        if self.is_cmyk {
            return format!(
                "cmyka({},{},{},{},{:.4})",
                quantum::scale_to(self.red, 255),
                quantum::scale_to(self.green, 255),
                quantum::scale_to(self.blue, 255),
                quantum::scale_to(self.black, 255),
                quantum::to_f64(self.alpha) / QUANTUM_RANGE
            );
        }
        let channels = [self.red, self.green, self.blue, self.alpha];
        let mut text = String::from("#");
        for channel in channels {
            if QUANTUM_DEPTH == 8 {
                text.push_str(&format!("{:02X}", quantum::scale_to(channel, 0xFF)));
            } else {
                text.push_str(&format!("{:04X}", quantum::scale_to(channel, 0xFFFF)));
            }
        }
        text
    }
}

fn function_args(text: &str, name: &str) -> Option<Vec<String>> {
    let inner = text.strip_prefix(name)?.trim_start();
    let inner = inner.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(|a| a.trim().to_string()).collect())
}

/// A channel argument in `0..=255` or a percentage, scaled to a quantum.
fn parse_channel(arg: &str) -> Option<Quantum> {
    if let Some(percent) = arg.strip_suffix('%') {
        let value: f64 = percent.trim().parse().ok()?;
        if !(0.0..=100.0).contains(&value) {
            return None;
        }
        return Some(quantum::from_f64(value / 100.0 * QUANTUM_RANGE));
    }
    let value: f64 = arg.parse().ok()?;
    if !(0.0..=255.0).contains(&value) {
        return None;
    }
    Some(quantum::from_f64(value / 255.0 * QUANTUM_RANGE))
}

/// An alpha argument in `0.0..=1.0` or a percentage.
fn parse_alpha(arg: &str) -> Option<Quantum> {
    if arg.ends_with('%') {
        return parse_channel(arg);
    }
    let value: f64 = arg.parse().ok()?;
    if !(0.0..=1.0).contains(&value) {
        return None;
    }
    Some(quantum::from_f64(value * QUANTUM_RANGE))
}

fn parse_rgb(args: &[String]) -> Option<ColorInstance> {
    let alpha = match args.len() {
        3 => quantum::opaque(),
        4 => parse_alpha(&args[3])?,
        _ => return None,
    };
    Some(ColorInstance {
        red: parse_channel(&args[0])?,
        green: parse_channel(&args[1])?,
        blue: parse_channel(&args[2])?,
        alpha,
        ..ColorInstance::default()
    })
}

fn parse_cmyk(args: &[String]) -> Option<ColorInstance> {
    let alpha = match args.len() {
        4 => quantum::opaque(),
        5 => parse_alpha(&args[4])?,
        _ => return None,
    };
    Some(ColorInstance {
        red: parse_channel(&args[0])?,
        green: parse_channel(&args[1])?,
        blue: parse_channel(&args[2])?,
        black: parse_channel(&args[3])?,
        alpha,
        is_cmyk: true,
    })
}

fn parse_hex(hex: &str) -> Option<ColorInstance> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let (digits, count) = match hex.len() {
        3 => (1, 3),
        4 => (1, 4),
        6 => (2, 3),
        8 => (2, 4),
        12 => (4, 3),
        16 => (4, 4),
        _ => return None,
    };
    let max = (1u32 << (4 * digits)) - 1;
    let mut channels = [quantum::opaque(); 4];
    for (i, channel) in channels.iter_mut().enumerate().take(count) {
        let part = &hex[i * digits..(i + 1) * digits];
        let value = u32::from_str_radix(part, 16).ok()?;
        *channel = quantum::scale_from(value, max);
    }
    Some(ColorInstance {
        red: channels[0],
        green: channels[1],
        blue: channels[2],
        alpha: channels[3],
        ..ColorInstance::default()
    })
}
