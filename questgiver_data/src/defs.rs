use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use variantly::Variantly;

/// Coarse lifecycle class shared by every quest stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Variantly)]
pub enum Progress {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::NotStarted => write!(f, "not started"),
            Progress::InProgress => write!(f, "in progress"),
            Progress::Completed => write!(f, "completed"),
        }
    }
}

/// A value held in the save-scoped durable store.
///
/// Primitive values are stored directly; anything richer is stored as a RON
/// `Record` and decoded by the property that owns the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Id(Uuid),
    Record(String),
}

impl StoredValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoredValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StoredValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoredValue::Text(s) | StoredValue::Record(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Identity of a dialog page.
///
/// Pages may be named or numbered; lookups that miss on exact identity fall back
/// to comparing the rendered form, so `Number(2)` is found by `Name("2")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageId {
    Name(String),
    Number(i64),
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageId::Name(name) => write!(f, "{name}"),
            PageId::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for PageId {
    fn from(value: &str) -> Self {
        PageId::Name(value.to_string())
    }
}

impl From<String> for PageId {
    fn from(value: String) -> Self {
        PageId::Name(value)
    }
}

impl From<i64> for PageId {
    fn from(value: i64) -> Self {
        PageId::Number(value)
    }
}

impl From<i32> for PageId {
    fn from(value: i32) -> Self {
        PageId::Number(i64::from(value))
    }
}

/// Keyboard shortcut bound to a dialog option.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Shortcut {
    pub key: char,
    pub hold_ctrl: bool,
    pub hold_alt: bool,
    pub hold_shift: bool,
}

impl Shortcut {
    /// A shortcut with no modifier keys.
    pub fn key(key: char) -> Shortcut {
        Shortcut {
            key,
            hold_ctrl: false,
            hold_alt: false,
            hold_shift: false,
        }
    }
}

/// A portion of a sprite shown alongside a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub category: String,
    pub id: String,
    pub width: f32,
    pub height: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub display_width: f32,
    pub display_height: f32,
}

impl Image {
    /// A 128x128 portrait shown at full size.
    pub fn portrait(category: impl Into<String>, id: impl Into<String>) -> Image {
        Image {
            category: category.into(),
            id: id.into(),
            width: 128.0,
            height: 128.0,
            x_offset: 0.0,
            y_offset: 0.0,
            display_width: 128.0,
            display_height: 128.0,
        }
    }

    /// A 640x400 illustration scaled down to 480x300.
    pub fn illustration(category: impl Into<String>, id: impl Into<String>) -> Image {
        Image {
            category: category.into(),
            id: id.into(),
            width: 640.0,
            height: 400.0,
            x_offset: 0.0,
            y_offset: 0.0,
            display_width: 480.0,
            display_height: 300.0,
        }
    }
}

/// RGB text color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TextColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> TextColor {
        TextColor { r, g, b }
    }
}

/// A location at which a quest offer may be presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSite {
    pub id: String,
    pub name: String,
    pub faction_id: String,
    pub size: u8,
    /// Condition-only markets (uninhabited planets) are not populated.
    pub populated: bool,
}

/// Kind of intel entry. The registry holds at most one visible entry per class
/// for any quest that manages its intel automatically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntelClass(pub String);

impl IntelClass {
    pub fn new(name: impl Into<String>) -> IntelClass {
        IntelClass(name.into())
    }
}

impl fmt::Display for IntelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an offer creator. Pool entries are keyed by this, never by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatorKey(pub String);

impl CreatorKey {
    pub fn new(name: impl Into<String>) -> CreatorKey {
        CreatorKey(name.into())
    }
}

impl fmt::Display for CreatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
