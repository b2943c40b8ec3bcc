use thiserror::Error;

/// Coarse classification of [`NoteError`], cheap to copy into UI state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum NoteErrorKind {
    Validation,
    Decode,
    Recognition,
    Corruption,
    NotFound,
    Busy,
    Storage,
    Unavailable,
}

/// Everything the note subsystem can fail with.
///
/// All variants are recoverable: the session surfaces them as notices and keeps
/// the editor (and any unsaved edits) alive.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum NoteError {
    #[error("{0}")]
    Validation(String),

    #[error("Could not decode snapshot: {0}")]
    Decode(String),

    #[error("Failed to recognize text: {0}")]
    Recognition(String),

    #[error("Saved notes could not be read: {0}")]
    Corruption(String),

    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("{0} is already in progress")]
    Busy(&'static str),

    #[error("Could not write to storage: {0}")]
    Storage(String),

    #[error("{0} is not available")]
    Unavailable(String),
}

impl NoteError {
    pub fn kind(&self) -> NoteErrorKind {
        match self {
            Self::Validation(_) => NoteErrorKind::Validation,
            Self::Decode(_) => NoteErrorKind::Decode,
            Self::Recognition(_) => NoteErrorKind::Recognition,
            Self::Corruption(_) => NoteErrorKind::Corruption,
            Self::NotFound(_) => NoteErrorKind::NotFound,
            Self::Busy(_) => NoteErrorKind::Busy,
            Self::Storage(_) => NoteErrorKind::Storage,
            Self::Unavailable(_) => NoteErrorKind::Unavailable,
        }
    }

    /// Convert a JS exception into a message, falling back to its debug form.
    pub(crate) fn js_message(value: &wasm_bindgen::JsValue) -> String {
        if let Some(s) = value.as_string() {
            return s;
        }
        js_sys::Reflect::get(value, &"message".into())
            .ok()
            .and_then(|m| m.as_string())
            .unwrap_or_else(|| format!("{value:?}"))
    }
}

pub type NoteResult<T> = Result<T, NoteError>;
