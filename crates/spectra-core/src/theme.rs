//! Kind-to-color themes.
//!
//! A [`Theme`] is an immutable value. Controllers hold it behind an `Arc`,
//! so two buffers can be highlighted with different themes at the same
//! time and nothing can recolor a theme out from under a renderer.
//!
//! ## Theme files
//!
//! ```toml
//! name = "solarized"
//! default = "#657b83"
//!
//! [styles]
//! keyword = "#859900"
//! "source.lang.swift.syntaxtype.string" = "#2aa198"
//! ```
//!
//! Style keys accept any tag [`TokenKind::from_tag`] understands.

use serde::{Deserialize, Serialize};
use spectra_syntax::TokenKind;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::{CoreError, CoreResult};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidColor(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An immutable mapping from token kind to color.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    name: String,
    default: Color,
    styles: HashMap<TokenKind, Color>,
}

impl Theme {
    pub fn new(
        name: impl Into<String>,
        default: Color,
        styles: impl IntoIterator<Item = (TokenKind, Color)>,
    ) -> Self {
        Self {
            name: name.into(),
            default,
            styles: styles.into_iter().collect(),
        }
    }

    /// Palette used for analyzer-tokenized sources.
    pub fn xcode() -> Self {
        let keyword = Color::rgb(0xcb, 0x35, 0x9f);
        let comment = Color::rgb(0x00, 0x83, 0x1f);
        let number = Color::rgb(0x38, 0x2e, 0xd3);
        Self::new(
            "xcode",
            Color::rgb(0x00, 0xff, 0x00),
            [
                (TokenKind::Keyword, keyword),
                (TokenKind::Identifier, Color::BLACK),
                (TokenKind::TypeIdentifier, Color::rgb(0x7a, 0x40, 0xa6)),
                (TokenKind::String, Color::rgb(0xea, 0x37, 0x12)),
                (TokenKind::Number, number),
                (TokenKind::Character, number),
                (TokenKind::Call, Color::rgb(0x32, 0x6d, 0x74)),
                (TokenKind::Comment, comment),
                (TokenKind::CommentMark, comment),
                (TokenKind::CommentUrl, comment),
                (TokenKind::DocComment, comment),
                (TokenKind::Attribute, keyword),
                (TokenKind::BuildConfig, Color::rgb(0x64, 0x38, 0x20)),
            ],
        )
    }

    /// Palette used for the groovy pattern table.
    pub fn groovy() -> Self {
        Self::new(
            "groovy",
            Color::BLACK,
            [
                (TokenKind::Comment, Color::rgb(0x80, 0x80, 0x80)),
                (TokenKind::String, Color::rgb(0xff, 0x00, 0xff)),
                (TokenKind::Character, Color::rgb(0x00, 0xff, 0x00)),
                (TokenKind::Number, Color::rgb(0xff, 0x00, 0x00)),
                (TokenKind::Call, Color::rgb(0x80, 0x00, 0x80)),
                (TokenKind::Keyword, Color::rgb(0x00, 0x00, 0xff)),
            ],
        )
    }

    /// Returns a builtin theme by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "xcode" => Some(Self::xcode()),
            "groovy" => Some(Self::groovy()),
            _ => None,
        }
    }

    /// The builtin palette paired with a language's tokenizer.
    pub fn for_language(language: &str) -> Self {
        match language {
            "groovy" => Self::groovy(),
            _ => Self::xcode(),
        }
    }

    /// Resolves a builtin name or a path to a theme file.
    pub fn resolve(name_or_path: &str) -> CoreResult<Self> {
        if let Some(theme) = Self::builtin(name_or_path) {
            return Ok(theme);
        }
        let path = Path::new(name_or_path);
        if path.is_file() {
            return Self::load_from(path);
        }
        Err(CoreError::UnknownTheme(name_or_path.to_string()))
    }

    /// Loads a theme file.
    pub fn load_from(path: impl AsRef<Path>) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parses theme file contents.
    pub fn from_toml(content: &str) -> CoreResult<Self> {
        let file: ThemeFile = toml::from_str(content)?;
        let styles = file
            .styles
            .iter()
            .map(|(tag, hex)| Ok((TokenKind::from_tag(tag), Color::from_hex(hex)?)))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self::new(file.name, Color::from_hex(&file.default)?, styles))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color for text no style applies to.
    pub fn default_color(&self) -> Color {
        self.default
    }

    /// Returns the mapped color, if any.
    pub fn get(&self, kind: TokenKind) -> Option<Color> {
        self.styles.get(&kind).copied()
    }

    /// Returns the color for `kind`, falling back to the default color.
    pub fn style_for_kind(&self, kind: TokenKind) -> Color {
        self.get(kind).unwrap_or_else(|| {
            tracing::warn!(theme = %self.name, kind = ?kind, "no style for token kind, using default");
            self.default
        })
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::xcode()
    }
}

/// On-disk theme layout.
#[derive(Debug, Serialize, Deserialize)]
struct ThemeFile {
    name: String,
    #[serde(default = "default_hex")]
    default: String,
    #[serde(default)]
    styles: HashMap<String, String>,
}

fn default_hex() -> String {
    Color::BLACK.to_hex()
}
