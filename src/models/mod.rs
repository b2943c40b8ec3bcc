use crate::surface::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A handwritten note as persisted in the note store.
///
/// Timestamps are milliseconds since the Unix epoch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub canvas_snapshot: Snapshot,
    pub text_content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    pub fn summary(&self) -> NoteSummary {
        NoteSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Sidebar row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    pub updated_at: i64,
}

/// Write request for the note store. `id: None` creates a new note.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub id: Option<String>,
    pub title: String,
    pub canvas_snapshot: Snapshot,
    pub text_content: String,
}

#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DrawMode {
    #[default]
    Draw,
    Erase,
}

/// Opaque RGB stroke color, written as `#RRGGBB`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("color `{s}` must start with `#`"))?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("color `{s}` must be #RRGGBB"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("color `{s}` is not hex"))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

pub const COLOR_PRESETS: [(&str, Color); 5] = [
    ("Black", BLACK),
    ("Blue", Color::rgb(0x00, 0x00, 0xFF)),
    ("Red", Color::rgb(0xFF, 0x00, 0x00)),
    ("Green", Color::rgb(0x00, 0x80, 0x00)),
    ("Purple", Color::rgb(0x80, 0x00, 0x80)),
];

pub const WEIGHT_PRESETS: [(&str, u32); 4] = [("Thin", 1), ("Normal", 2), ("Medium", 4), ("Thick", 6)];

pub const DEFAULT_WEIGHT: u32 = 2;

/// Pen configuration applied to subsequent strokes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolState {
    pub color: Color,
    pub weight: u32,
    pub mode: DrawMode,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            color: BLACK,
            weight: DEFAULT_WEIGHT,
            mode: DrawMode::Draw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_serializes_camel_case() {
        let note = Note {
            id: "note-1".to_string(),
            title: "Biology 101".to_string(),
            canvas_snapshot: Snapshot::blank(),
            text_content: "cells".to_string(),
            created_at: 10,
            updated_at: 20,
        };
        let v = serde_json::to_value(&note).expect("should serialize");
        assert_eq!(v["canvasSnapshot"], "");
        assert_eq!(v["textContent"], "cells");
        assert_eq!(v["createdAt"], 10);
        assert_eq!(v["updatedAt"], 20);
    }

    #[test]
    fn test_color_hex_roundtrip_and_validation() {
        let c: Color = "#800080".parse().expect("valid color");
        assert_eq!(c, Color::rgb(0x80, 0, 0x80));
        assert_eq!(c.to_hex(), "#800080");
        assert_eq!("#00ff00".parse::<Color>(), Ok(Color::rgb(0, 255, 0)));

        assert!("800080".parse::<Color>().is_err());
        assert!("#80008".parse::<Color>().is_err());
        assert!("#zzzzzz".parse::<Color>().is_err());
    }

    #[test]
    fn test_draw_mode_names_match_atrament() {
        assert_eq!(DrawMode::Erase.as_ref(), "erase");
        assert_eq!(DrawMode::Draw.to_string(), "draw");
        assert_eq!("erase".parse::<DrawMode>(), Ok(DrawMode::Erase));
        assert!("highlighter".parse::<DrawMode>().is_err());
    }

    #[test]
    fn test_default_tool_is_black_normal_draw() {
        let tool = ToolState::default();
        assert_eq!(tool.color.to_hex(), "#000000");
        assert_eq!(tool.weight, 2);
        assert_eq!(tool.mode, DrawMode::Draw);
        assert!(WEIGHT_PRESETS.iter().any(|(name, w)| *name == "Normal" && *w == tool.weight));
    }
}
