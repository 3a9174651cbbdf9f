/// ANSI color formatting per user color mode

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a user's terminal wants colors rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// No escape sequences at all
    None,
    /// Dark text for light backgrounds
    Light,
    /// Bright text for dark backgrounds
    #[default]
    Dark,
}

impl ColorMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "none" => Some(ColorMode::None),
            "light" => Some(ColorMode::Light),
            "dark" => Some(ColorMode::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorMode::None => "None",
            ColorMode::Light => "Light",
            ColorMode::Dark => "Dark",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Gray,
}

impl Color {
    /// SGR sequence for this color under `mode`
    fn code(self, mode: ColorMode) -> &'static str {
        let bright = mode == ColorMode::Dark;
        match (self, bright) {
            (Color::Red, true) => "\x1b[1;31m",
            (Color::Red, false) => "\x1b[0;31m",
            (Color::Green, true) => "\x1b[1;32m",
            (Color::Green, false) => "\x1b[0;32m",
            (Color::Yellow, true) => "\x1b[1;33m",
            (Color::Yellow, false) => "\x1b[0;33m",
            (Color::Blue, true) => "\x1b[1;34m",
            (Color::Blue, false) => "\x1b[0;34m",
            (Color::Magenta, true) => "\x1b[1;35m",
            (Color::Magenta, false) => "\x1b[0;35m",
            (Color::Cyan, true) => "\x1b[1;36m",
            (Color::Cyan, false) => "\x1b[0;36m",
            // White text vanishes on a light background
            (Color::White, true) => "\x1b[1;37m",
            (Color::White, false) => "\x1b[0;30m",
            (Color::Gray, _) => "\x1b[0;37m",
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Wrap `text` in the escape sequences for `color`
pub fn colorize(mode: ColorMode, color: Color, text: &str) -> String {
    if mode == ColorMode::None || text.is_empty() {
        return text.to_string();
    }

    format!("{}{}{}", color.code(mode), text, RESET)
}
