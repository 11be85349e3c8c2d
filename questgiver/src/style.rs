//! Styling helpers for terminal output.
//!
//! The [`DialogStyle`] trait provides convenience methods for applying ANSI styling via
//! the `colored` crate. Implementations for `&str` and `String` are provided so string
//! literals can be styled directly.

use colored::{ColoredString, Colorize};
use questgiver_data::TextColor;

/// Convenience trait for applying color and style to dialog output.
pub trait DialogStyle {
    fn heading_style(&self) -> ColoredString;
    fn para_style(&self) -> ColoredString;
    fn highlight_style(&self) -> ColoredString;
    fn echo_style(&self) -> ColoredString;
    fn option_style(&self) -> ColoredString;
    fn option_number_style(&self) -> ColoredString;
    fn continue_style(&self) -> ColoredString;
    fn tooltip_style(&self) -> ColoredString;
    fn image_style(&self) -> ColoredString;
    fn error_style(&self) -> ColoredString;
    fn with_color(&self, color: TextColor) -> ColoredString;
}

impl DialogStyle for &str {
    fn heading_style(&self) -> ColoredString {
        self.truecolor(223, 77, 10).underline()
    }
    fn para_style(&self) -> ColoredString {
        self.truecolor(210, 210, 200)
    }
    fn highlight_style(&self) -> ColoredString {
        self.bold().truecolor(220, 180, 40)
    }
    fn echo_style(&self) -> ColoredString {
        self.italic().truecolor(102, 208, 250)
    }
    fn option_style(&self) -> ColoredString {
        self.truecolor(110, 220, 110)
    }
    fn option_number_style(&self) -> ColoredString {
        let bracketed = format!("[{self}]");
        bracketed.truecolor(75, 80, 75)
    }
    fn continue_style(&self) -> ColoredString {
        self.italic().truecolor(230, 230, 30)
    }
    fn tooltip_style(&self) -> ColoredString {
        self.dimmed().italic()
    }
    fn image_style(&self) -> ColoredString {
        self.dimmed().truecolor(80, 80, 230)
    }
    fn error_style(&self) -> ColoredString {
        self.truecolor(230, 30, 30)
    }
    fn with_color(&self, color: TextColor) -> ColoredString {
        self.truecolor(color.r, color.g, color.b)
    }
}

impl DialogStyle for String {
    fn heading_style(&self) -> ColoredString {
        self.as_str().heading_style()
    }
    fn para_style(&self) -> ColoredString {
        self.as_str().para_style()
    }
    fn highlight_style(&self) -> ColoredString {
        self.as_str().highlight_style()
    }
    fn echo_style(&self) -> ColoredString {
        self.as_str().echo_style()
    }
    fn option_style(&self) -> ColoredString {
        self.as_str().option_style()
    }
    fn option_number_style(&self) -> ColoredString {
        self.as_str().option_number_style()
    }
    fn continue_style(&self) -> ColoredString {
        self.as_str().continue_style()
    }
    fn tooltip_style(&self) -> ColoredString {
        self.as_str().tooltip_style()
    }
    fn image_style(&self) -> ColoredString {
        self.as_str().image_style()
    }
    fn error_style(&self) -> ColoredString {
        self.as_str().error_style()
    }
    fn with_color(&self, color: TextColor) -> ColoredString {
        self.as_str().with_color(color)
    }
}
