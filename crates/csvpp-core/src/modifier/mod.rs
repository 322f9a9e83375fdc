//! Cell and row formatting modifiers.
//!
//! A modifier is written `[[key=value/key=value]]` before a cell's text, or
//! `![[...]]` on a row's first cell to apply to the whole row. Row modifiers
//! are the defaults for every cell in the row; cell modifiers override them.
//! `expand` and `freeze` only make sense for whole rows.

mod parser;

pub use parser::{ParsedCell, parse_cell};

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use csvpp_engine::engine::ExpandScope;
use thiserror::Error;

use crate::template::SPREADSHEET_INFINITY;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModifierError {
    #[error("unknown modifier `{0}`")]
    UnknownKey(String),

    #[error("invalid value `{value}` for modifier `{key}`")]
    InvalidValue { key: String, value: String },

    #[error("modifier `{0}` needs a value")]
    MissingValue(String),

    #[error("modifier `{0}` is only valid on a whole row (`![[...]]`)")]
    RowOnly(String),

    #[error("row modifiers (`![[...]]`) are only allowed on the first cell")]
    RowModifierNotFirst,

    #[error("unterminated modifier, expected `]]`")]
    Unterminated,

    #[error("{0}")]
    Syntax(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BorderSide {
    All,
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BorderStyle {
    Dashed,
    Dotted,
    Double,
    Solid,
    SolidMedium,
    SolidThick,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextFormat {
    Bold,
    Italic,
    Strikethrough,
    Underline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumberFormat {
    Currency,
    Date,
    DateTime,
    Number,
    Percent,
    Text,
    Time,
    TimeDuration,
}

macro_rules! keyword_enum {
    ($ty:ident { $($($word:literal)|+ => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($($word)|+ => Ok($ty::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

keyword_enum!(HorizontalAlign { "left" | "l" => Left, "center" | "c" => Center, "right" | "r" => Right });
keyword_enum!(VerticalAlign { "top" | "t" => Top, "center" | "c" => Center, "bottom" | "b" => Bottom });
keyword_enum!(BorderSide {
    "all" | "a" => All,
    "top" | "t" => Top,
    "bottom" | "b" => Bottom,
    "left" | "l" => Left,
    "right" | "r" => Right,
});
keyword_enum!(BorderStyle {
    "dashed" | "dash" => Dashed,
    "dotted" | "dot" => Dotted,
    "double" | "dbl" => Double,
    "solid" | "1" => Solid,
    "solid_medium" | "solidmedium" | "2" => SolidMedium,
    "solid_thick" | "solidthick" | "3" => SolidThick,
});
keyword_enum!(TextFormat {
    "bold" | "b" => Bold,
    "italic" | "i" => Italic,
    "strikethrough" | "s" => Strikethrough,
    "underline" | "u" => Underline,
});
keyword_enum!(NumberFormat {
    "currency" | "c" => Currency,
    "date" | "d" => Date,
    "datetime" | "dt" => DateTime,
    "number" | "n" => Number,
    "percent" | "p" => Percent,
    "text" | "t" => Text,
    "time" | "tm" => Time,
    "timeduration" | "td" => TimeDuration,
});

/// A colour written `#rrggbb`, `rrggbb` or the short `#rgb` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

fn rgb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#?(?:(?<long>[0-9a-fA-F]{6})|(?<short>[0-9a-fA-F]{3}))$")
            .expect("colour regex must compile")
    })
}

impl FromStr for Rgb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = rgb_re().captures(s.trim()).ok_or(())?;
        let hex = match (caps.name("long"), caps.name("short")) {
            (Some(long), _) => long.as_str().to_string(),
            (None, Some(short)) => short.as_str().chars().flat_map(|c| [c, c]).collect(),
            (None, None) => return Err(()),
        };
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ());
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// The `expand` row modifier.
///
/// `amount` of None repeats up to the bottom of the sheet. `starts_at` and
/// `ends_at` stay None until the row has been placed by expansion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Expand {
    pub amount: Option<usize>,
    pub starts_at: Option<usize>,
    pub ends_at: Option<usize>,
}

impl Expand {
    pub fn new(amount: Option<usize>) -> Self {
        Expand {
            amount,
            ..Expand::default()
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.amount.is_none()
    }

    pub fn is_expanded(&self) -> bool {
        self.starts_at.is_some()
    }

    /// Rows in which variables bound inside this expand are visible. None
    /// until expanded. Unbounded expands stay open-ended.
    pub fn scope(&self) -> Option<ExpandScope> {
        let starts_at = self.starts_at?;
        Some(ExpandScope {
            starts_at,
            ends_at: if self.is_unbounded() { None } else { self.ends_at },
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Modifier {
    pub horizontal_align: Option<HorizontalAlign>,
    pub vertical_align: Option<VerticalAlign>,
    pub borders: BTreeSet<BorderSide>,
    pub border_color: Option<Rgb>,
    pub border_style: Option<BorderStyle>,
    pub color: Option<Rgb>,
    pub font_color: Option<Rgb>,
    pub font_family: Option<String>,
    pub font_size: Option<u32>,
    pub formats: BTreeSet<TextFormat>,
    pub note: Option<String>,
    pub number_format: Option<NumberFormat>,
    pub validate: Option<String>,
    pub var: Option<String>,
    pub expand: Option<Expand>,
    pub freeze: bool,
}

impl Modifier {
    /// The defaults a row modifier hands to each of its cells. Row-only
    /// settings and the row's own variable binding stay on the row.
    pub fn cell_defaults(&self) -> Modifier {
        Modifier {
            var: None,
            expand: None,
            freeze: false,
            ..self.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Modifier::default()
    }

    /// Apply one `key=value` pair. `row` says whether this is a row modifier.
    pub fn set(&mut self, key: &str, value: Option<&str>, row: bool) -> Result<(), ModifierError> {
        let key = key.trim().to_ascii_lowercase();
        let canonical = canonical_key(&key).ok_or_else(|| ModifierError::UnknownKey(key.clone()))?;

        match canonical {
            "expand" => {
                if !row {
                    return Err(ModifierError::RowOnly(key));
                }
                let amount = match value {
                    None => None,
                    Some(v) => Some(
                        v.trim()
                            .parse::<usize>()
                            .ok()
                            .filter(|n| (1..=SPREADSHEET_INFINITY).contains(n))
                            .ok_or_else(|| invalid(&key, v))?,
                    ),
                };
                self.expand = Some(Expand::new(amount));
                return Ok(());
            }
            "freeze" => {
                if !row {
                    return Err(ModifierError::RowOnly(key));
                }
                self.freeze = true;
                return Ok(());
            }
            _ => {}
        }

        let value = value.ok_or_else(|| ModifierError::MissingValue(key.clone()))?;
        let parsed = |v: &str| v.trim().to_string();

        match canonical {
            "align" => {
                if let Ok(h) = value.parse() {
                    self.horizontal_align = Some(h);
                } else if let Ok(v) = value.parse() {
                    self.vertical_align = Some(v);
                } else {
                    return Err(invalid(&key, value));
                }
            }
            "halign" => self.horizontal_align = Some(value.parse().map_err(|_| invalid(&key, value))?),
            "valign" => self.vertical_align = Some(value.parse().map_err(|_| invalid(&key, value))?),
            "border" => {
                self.borders.insert(value.parse().map_err(|_| invalid(&key, value))?);
            }
            "bordercolor" => self.border_color = Some(value.parse().map_err(|_| invalid(&key, value))?),
            "borderstyle" => self.border_style = Some(value.parse().map_err(|_| invalid(&key, value))?),
            "color" => self.color = Some(value.parse().map_err(|_| invalid(&key, value))?),
            "fontcolor" => self.font_color = Some(value.parse().map_err(|_| invalid(&key, value))?),
            "fontfamily" => self.font_family = Some(parsed(value)),
            "fontsize" => {
                self.font_size = Some(value.trim().parse().map_err(|_| invalid(&key, value))?)
            }
            "format" => {
                self.formats.insert(value.parse().map_err(|_| invalid(&key, value))?);
            }
            "note" => self.note = Some(value.to_string()),
            "numberformat" => {
                self.number_format = Some(value.parse().map_err(|_| invalid(&key, value))?)
            }
            "validate" => self.validate = Some(parsed(value)),
            "var" => {
                let id = parsed(value);
                if !is_identifier(&id) {
                    return Err(invalid(&key, value));
                }
                self.var = Some(id);
            }
            _ => return Err(ModifierError::UnknownKey(key)),
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ModifierError {
    ModifierError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn is_identifier(id: &str) -> bool {
    let mut chars = id.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Map a key or its short alias to the full key name.
fn canonical_key(key: &str) -> Option<&'static str> {
    Some(match key {
        "align" => "align",
        "border" | "b" => "border",
        "bordercolor" | "bc" => "bordercolor",
        "borderstyle" | "bs" => "borderstyle",
        "color" | "c" => "color",
        "expand" | "e" => "expand",
        "fontcolor" | "fc" => "fontcolor",
        "fontfamily" | "ff" => "fontfamily",
        "fontsize" | "fs" => "fontsize",
        "format" | "f" => "format",
        "freeze" => "freeze",
        "halign" | "ha" => "halign",
        "valign" | "va" => "valign",
        "note" | "n" => "note",
        "numberformat" | "nf" => "numberformat",
        "validate" => "validate",
        "var" => "var",
        _ => return None,
    })
}
