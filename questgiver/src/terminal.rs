//! A presentation surface that prints straight to the terminal.
//!
//! Options are listed with numbers; [`TerminalSurface::choose`] maps the number the player
//! typed back to the option's text and id.

use colored::Colorize;
use log::debug;
use questgiver_data::{Image, Shortcut};
use textwrap::{fill, termwidth};

use crate::dialog::CONTINUE_OPTION_ID;
use crate::host::{Paragraph, PresentationSurface, RenderedOption};
use crate::style::DialogStyle;

#[derive(Debug, Default)]
pub struct TerminalSurface {
    options: Vec<RenderedOption>,
    shortcuts: Vec<(String, Shortcut)>,
    dismissed: bool,
}

impl TerminalSurface {
    pub fn new() -> TerminalSurface {
        TerminalSurface::default()
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    pub fn options(&self) -> &[RenderedOption] {
        &self.options
    }

    /// Print the current options as a numbered menu.
    pub fn print_options(&self) {
        if self.options.is_empty() {
            return;
        }
        println!();
        for (idx, option) in self.options.iter().enumerate() {
            let number = (idx + 1).to_string();
            let label = if option.id == CONTINUE_OPTION_ID {
                option.text.continue_style()
            } else if let Some(color) = option.color {
                option.text.with_color(color)
            } else {
                option.text.option_style()
            };
            let key = self
                .shortcuts
                .iter()
                .find(|(id, _)| id == &option.id)
                .map(|(_, shortcut)| format!(" ({})", describe_shortcut(shortcut)))
                .unwrap_or_default();
            println!("  {} {label}{}", number.option_number_style(), key.dimmed());
            if let Some(tooltip) = &option.tooltip {
                println!("      {}", tooltip.tooltip_style());
            }
        }
    }

    /// The option numbered `choice` in the last printed menu, as `(text, id)`.
    pub fn choose(&self, choice: usize) -> Option<(String, String)> {
        let option = self.options.get(choice.checked_sub(1)?)?;
        Some((option.text.clone(), option.id.clone()))
    }

    /// The option bound to the shortcut `key`, as `(text, id)`.
    pub fn choose_shortcut(&self, key: char) -> Option<(String, String)> {
        let (id, _) = self.shortcuts.iter().find(|(_, shortcut)| shortcut.key == key)?;
        let option = self.options.iter().find(|option| &option.id == id)?;
        Some((option.text.clone(), option.id.clone()))
    }
}

fn describe_shortcut(shortcut: &Shortcut) -> String {
    let mut parts = Vec::new();
    if shortcut.hold_ctrl {
        parts.push("ctrl".to_string());
    }
    if shortcut.hold_alt {
        parts.push("alt".to_string());
    }
    if shortcut.hold_shift {
        parts.push("shift".to_string());
    }
    parts.push(shortcut.key.to_string());
    parts.join("+")
}

/// Color each highlighted fragment where it occurs, in order.
fn render_paragraph(para: &Paragraph) -> String {
    let base = |s: &str| match para.color {
        Some(color) => s.with_color(color).to_string(),
        None => s.para_style().to_string(),
    };
    let mut out = String::new();
    let mut rest = para.text.as_str();
    for highlight in &para.highlights {
        if let Some(at) = rest.find(highlight.as_str()) {
            out.push_str(&base(&rest[..at]));
            out.push_str(&highlight.highlight_style().to_string());
            rest = &rest[at + highlight.len()..];
        }
    }
    out.push_str(&base(rest));
    out
}

impl PresentationSurface for TerminalSurface {
    fn clear_options(&mut self) {
        self.options.clear();
        self.shortcuts.clear();
    }

    fn add_option(&mut self, option: RenderedOption) {
        self.options.push(option);
    }

    fn set_shortcut(&mut self, option_id: &str, shortcut: Shortcut) {
        self.shortcuts.push((option_id.to_string(), shortcut));
    }

    fn show_image(&mut self, image: &Image) {
        debug!("showing image {}/{}", image.category, image.id);
        let caption = format!("[image: {}/{}]", image.category, image.id);
        println!("{}", caption.image_style());
    }

    fn add_para(&mut self, para: Paragraph) {
        println!("{}", fill(&render_paragraph(&para), termwidth()));
        println!();
    }

    fn dismiss(&mut self) {
        self.dismissed = true;
        self.options.clear();
        self.shortcuts.clear();
        println!("{}", "-- dialog closed --".dimmed());
    }
}
