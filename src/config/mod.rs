use crate::recognition::DEFAULT_LANGUAGE;
use crate::store::DEFAULT_STORAGE_KEY;
use crate::surface::SurfaceConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub(crate) const DEFAULT_TOKEN_KEY: &str = "study-aid-token";

/// Runtime settings, read from `window.ENV` with per-field defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub storage_key: String,
    pub token_key: String,
    pub ocr_language: String,
    pub ocr_timeout_ms: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub smoothing: f64,
    pub adaptive_stroke: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let surface = SurfaceConfig::default();
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            ocr_language: DEFAULT_LANGUAGE.to_string(),
            ocr_timeout_ms: 60_000,
            canvas_width: surface.width,
            canvas_height: surface.height,
            smoothing: surface.smoothing,
            adaptive_stroke: surface.adaptive_stroke,
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn non_empty_or(raw: Option<String>, default: String) -> String {
    raw.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

impl AppConfig {
    /// Build from a `KEY -> value` lookup. Missing or unparseable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            storage_key: non_empty_or(lookup("NOTES_STORAGE_KEY"), d.storage_key),
            token_key: non_empty_or(lookup("SESSION_TOKEN_KEY"), d.token_key),
            ocr_language: non_empty_or(lookup("OCR_LANG"), d.ocr_language),
            ocr_timeout_ms: parse_or(lookup("OCR_TIMEOUT_MS"), d.ocr_timeout_ms),
            canvas_width: parse_or(lookup("CANVAS_WIDTH"), d.canvas_width),
            canvas_height: parse_or(lookup("CANVAS_HEIGHT"), d.canvas_height),
            smoothing: parse_or(lookup("CANVAS_SMOOTHING"), d.smoothing),
            adaptive_stroke: parse_or(lookup("CANVAS_ADAPTIVE_STROKE"), d.adaptive_stroke),
        }
    }

    /// Read `window.ENV.<KEY>`; values may be strings, numbers or booleans.
    pub fn from_window() -> Self {
        let env = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object());

        let Some(env) = env else {
            return Self::default();
        };

        Self::from_lookup(|key| {
            let v = js_sys::Reflect::get(&env, &key.into()).ok()?;
            if let Some(s) = v.as_string() {
                Some(s)
            } else if let Some(n) = v.as_f64() {
                Some(n.to_string())
            } else {
                v.as_bool().map(|b| b.to_string())
            }
        })
    }

    pub fn surface(&self) -> SurfaceConfig {
        SurfaceConfig {
            width: self.canvas_width,
            height: self.canvas_height,
            smoothing: self.smoothing,
            adaptive_stroke: self.adaptive_stroke,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_the_drawing_setup() {
        let c = AppConfig::default();
        assert_eq!(c.storage_key, "study-aid-notes");
        assert_eq!(c.ocr_language, "eng");
        assert_eq!(
            c.surface(),
            SurfaceConfig {
                width: 800,
                height: 600,
                smoothing: 0.85,
                adaptive_stroke: true,
            }
        );
    }

    #[test]
    fn test_lookup_overrides_and_ignores_garbage() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OCR_LANG", "deu"),
            ("OCR_TIMEOUT_MS", "1500"),
            ("CANVAS_WIDTH", "wide"),
            ("CANVAS_ADAPTIVE_STROKE", "false"),
            ("NOTES_STORAGE_KEY", "   "),
        ]);
        let c = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(c.ocr_language, "deu");
        assert_eq!(c.ocr_timeout_ms, 1500);
        assert_eq!(c.canvas_width, 800);
        assert!(!c.adaptive_stroke);
        assert_eq!(c.storage_key, "study-aid-notes");
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let c: AppConfig =
            serde_json::from_str(r#"{"ocr_language": "fra"}"#).expect("parses");
        assert_eq!(c.ocr_language, "fra");
        assert_eq!(c.canvas_height, 600);
    }
}
