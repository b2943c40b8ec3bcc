use crate::error::{NoteError, NoteResult};
use crate::models::Note;
use crate::surface::Snapshot;
use crate::util::parse_iso_ms;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

pub(crate) const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    notes: &'a [Note],
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    notes: Vec<Note>,
}

/// Shape written by the earlier JavaScript notes page: a bare array with ISO
/// timestamps and the snapshot under `canvasData`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyNote {
    id: String,
    title: String,
    #[serde(default)]
    canvas_data: Option<String>,
    #[serde(default)]
    text_content: Option<String>,
    created_at: String,
    updated_at: String,
}

impl LegacyNote {
    fn migrate(self) -> NoteResult<Note> {
        let ts = |field: &str, raw: &str| {
            parse_iso_ms(raw).ok_or_else(|| {
                NoteError::Corruption(format!("note `{}` has invalid {field} `{raw}`", self.id))
            })
        };
        let created_at = ts("createdAt", &self.created_at)?;
        let updated_at = ts("updatedAt", &self.updated_at)?;

        Ok(Note {
            canvas_snapshot: self
                .canvas_data
                .map(Snapshot::from_encoded)
                .unwrap_or_default(),
            text_content: self.text_content.unwrap_or_default(),
            id: self.id,
            title: self.title,
            created_at,
            updated_at,
        })
    }
}

/// Decoded collection plus whether it came from the legacy format.
pub(crate) struct Decoded {
    pub notes: Vec<Note>,
    pub migrated: bool,
}

pub(crate) fn encode(notes: &[Note]) -> NoteResult<String> {
    serde_json::to_string(&EnvelopeRef {
        version: FORMAT_VERSION,
        notes,
    })
    .map_err(|e| NoteError::Storage(e.to_string()))
}

/// Decode a persisted collection, whole or not at all.
pub(crate) fn decode(raw: &str) -> NoteResult<Decoded> {
    let corrupt = |e: serde_json::Error| NoteError::Corruption(e.to_string());

    let value: Value = serde_json::from_str(raw).map_err(corrupt)?;
    let decoded = match value {
        Value::Array(_) => {
            let legacy: Vec<LegacyNote> = serde_json::from_value(value).map_err(corrupt)?;
            let notes = legacy
                .into_iter()
                .map(LegacyNote::migrate)
                .collect::<NoteResult<Vec<_>>>()?;
            Decoded {
                notes,
                migrated: true,
            }
        }
        Value::Object(_) => {
            let env: Envelope = serde_json::from_value(value).map_err(corrupt)?;
            if env.version != FORMAT_VERSION {
                return Err(NoteError::Corruption(format!(
                    "unsupported format version {}",
                    env.version
                )));
            }
            Decoded {
                notes: env.notes,
                migrated: false,
            }
        }
        _ => {
            return Err(NoteError::Corruption(
                "expected a list of notes".to_string(),
            ))
        }
    };

    validate(&decoded.notes)?;
    Ok(decoded)
}

fn validate(notes: &[Note]) -> NoteResult<()> {
    let mut seen = HashSet::with_capacity(notes.len());
    for n in notes {
        if n.id.trim().is_empty() {
            return Err(NoteError::Corruption("note without id".to_string()));
        }
        if !seen.insert(n.id.as_str()) {
            return Err(NoteError::Corruption(format!("duplicate note id `{}`", n.id)));
        }
        if n.created_at > n.updated_at {
            return Err(NoteError::Corruption(format!(
                "note `{}` was updated before it was created",
                n.id
            )));
        }
    }
    Ok(())
}
