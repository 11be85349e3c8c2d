//! Text substitution and highlight markup.
//!
//! Quest text is written once and filled in late: a [`TextTable`] maps placeholder
//! names to getters that are evaluated at format time, so values that only exist
//! after a quest has picked its destinations still show up correctly.
//!
//! # Syntax
//! - `${name}` is replaced by the current value of the `name` getter. Unknown names,
//!   and getters that return `None`, leave the placeholder untouched.
//! - `==text==` marks a highlighted span. [`highlights`] strips the markers and
//!   returns the spans separately so the surface can color them.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("valid regex"));
static HIGHLIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)==(.*?)==").expect("valid regex"));

/// Getter producing the current value of a placeholder.
pub type ReplacementGetter = Rc<dyn Fn() -> Option<String>>;

/// Named placeholder getters shared by every quest.
#[derive(Clone, Default)]
pub struct TextTable {
    getters: BTreeMap<String, ReplacementGetter>,
}

impl TextTable {
    /// Install or replace the getter for `name`.
    pub fn set(&mut self, name: impl Into<String>, getter: impl Fn() -> Option<String> + 'static) {
        self.getters.insert(name.into(), Rc::new(getter));
    }

    pub fn remove(&mut self, name: &str) {
        self.getters.remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.getters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.getters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.getters.is_empty()
    }

    /// Evaluate one placeholder.
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.getters.get(name).and_then(|getter| getter())
    }

    /// Substitute every resolvable `${name}` in `template`.
    pub fn format(&self, template: &str) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                self.resolve(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl fmt::Debug for TextTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextTable")
            .field("names", &self.getters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Text with its highlight markers removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighted {
    pub text: String,
    pub highlights: Vec<String>,
}

/// Strip `==...==` markers from `text`, collecting the highlighted fragments in order.
pub fn highlights(text: &str) -> Highlighted {
    let spans = HIGHLIGHT.captures_iter(text).map(|caps| caps[1].to_string()).collect();
    let plain = HIGHLIGHT.replace_all(text, "$1").into_owned();
    Highlighted {
        text: plain,
        highlights: spans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn format_replaces_known_placeholders() {
        let mut table = TextTable::default();
        table.set("dragonPlanet", || Some("Gilead".into()));
        assert_eq!(table.format("Fly to ${dragonPlanet}."), "Fly to Gilead.");
    }

    #[test]
    fn unknown_and_empty_placeholders_stay_verbatim() {
        let mut table = TextTable::default();
        table.set("startPlanet", || None);
        assert_eq!(
            table.format("${startPlanet} and ${nowhere}"),
            "${startPlanet} and ${nowhere}"
        );
    }

    #[test]
    fn getters_are_evaluated_at_format_time() {
        let value = Rc::new(RefCell::new(None::<String>));
        let mut table = TextTable::default();
        let source = Rc::clone(&value);
        table.set("dest", move || source.borrow().clone());
        assert_eq!(table.format("to ${dest}"), "to ${dest}");
        *value.borrow_mut() = Some("Chicomoztoc".into());
        assert_eq!(table.format("to ${dest}"), "to Chicomoztoc");
    }

    #[test]
    fn highlights_are_extracted_in_order() {
        let result = highlights("Pay ==95,000== credits to ==Riley==.");
        assert_eq!(result.text, "Pay 95,000 credits to Riley.");
        assert_eq!(result.highlights, vec!["95,000".to_string(), "Riley".to_string()]);
    }

    #[test]
    fn text_without_markers_is_unchanged() {
        let result = highlights("Nothing to see here.");
        assert_eq!(result.text, "Nothing to see here.");
        assert!(result.highlights.is_empty());
    }
}
