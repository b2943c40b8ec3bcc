mod persisted;

use crate::error::{NoteError, NoteResult};
use crate::models::{Note, NoteDraft, NoteSummary};
use crate::storage::KeyValueStore;
use crate::util::{new_note_id, now_ms};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const DEFAULT_STORAGE_KEY: &str = "study-aid-notes";

fn backup_key(key: &str) -> String {
    format!("{key}.corrupt")
}

/// Ordered note collection mirrored to a single key-value record.
///
/// Every mutation serializes the whole next collection and writes it before the
/// in-memory copy is replaced, so a failed write changes nothing.
pub struct NoteStore<K: KeyValueStore> {
    kv: K,
    key: String,
    notes: Vec<Note>,
    load_error: Option<NoteError>,
    clock: Rc<dyn Fn() -> i64>,
}

impl<K: KeyValueStore> NoteStore<K> {
    /// Load the collection stored under `key`.
    ///
    /// Never fails: unreadable data leaves the store empty and is reported
    /// through [`NoteStore::take_load_error`]. The raw value is copied to
    /// `<key>.corrupt` so the next write does not destroy it.
    pub fn open(kv: K, key: impl Into<String>) -> Self {
        let key = key.into();
        let mut store = Self {
            kv,
            key,
            notes: Vec::new(),
            load_error: None,
            clock: Rc::new(now_ms),
        };
        store.load();
        store
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + 'static) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    fn load(&mut self) {
        let raw = match self.kv.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no saved notes");
                return;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "notes storage unreadable");
                self.load_error = Some(e);
                return;
            }
        };

        match persisted::decode(&raw) {
            Ok(decoded) => {
                info!(
                    key = %self.key,
                    count = decoded.notes.len(),
                    migrated = decoded.migrated,
                    "loaded notes"
                );
                self.notes = decoded.notes;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "saved notes are corrupt, starting empty");
                if let Err(backup_err) = self.kv.set_item(&backup_key(&self.key), &raw) {
                    warn!(error = %backup_err, "could not back up corrupt notes");
                }
                self.load_error = Some(e);
            }
        }
    }

    /// The error hit while loading, if any. Reported once.
    pub fn take_load_error(&mut self) -> Option<NoteError> {
        self.load_error.take()
    }

    /// Summaries in insertion order.
    pub fn list(&self) -> Vec<NoteSummary> {
        self.notes.iter().map(Note::summary).collect()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    pub fn get(&self, id: &str) -> NoteResult<Note> {
        self.position(id)
            .map(|i| self.notes[i].clone())
            .ok_or_else(|| NoteError::NotFound(id.to_string()))
    }

    /// Insert a new note, generating an id when the draft has none.
    pub fn create(&mut self, draft: NoteDraft) -> NoteResult<String> {
        if let Some(id) = draft.id.as_deref() {
            if self.contains(id) {
                return Err(NoteError::Validation(format!("note `{id}` already exists")));
            }
        }
        let note = self.insert(draft)?;
        Ok(note.id)
    }

    /// Replace the note with the draft's id, or insert it as new.
    ///
    /// Replacing keeps `created_at` and the note's position and refreshes
    /// `updated_at`; inserting stamps both timestamps with the same instant.
    pub fn upsert(&mut self, draft: NoteDraft) -> NoteResult<Note> {
        let Some(idx) = draft.id.as_deref().and_then(|id| self.position(id)) else {
            return self.insert(draft);
        };

        let prev = &self.notes[idx];
        let note = Note {
            id: prev.id.clone(),
            title: draft.title,
            canvas_snapshot: draft.canvas_snapshot,
            text_content: draft.text_content,
            created_at: prev.created_at,
            // Clock skew must not break created_at <= updated_at.
            updated_at: (self.clock)().max(prev.created_at),
        };

        let mut next = self.notes.clone();
        next[idx] = note.clone();
        self.commit(next)?;

        debug!(id = %note.id, "updated note");
        Ok(note)
    }

    fn insert(&mut self, draft: NoteDraft) -> NoteResult<Note> {
        let id = match draft.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => self.fresh_id(),
        };
        let now = (self.clock)();
        let note = Note {
            id,
            title: draft.title,
            canvas_snapshot: draft.canvas_snapshot,
            text_content: draft.text_content,
            created_at: now,
            updated_at: now,
        };

        let mut next = self.notes.clone();
        next.push(note.clone());
        self.commit(next)?;

        info!(id = %note.id, "created note");
        Ok(note)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = new_note_id();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Remove a note, returning what was removed.
    pub fn delete(&mut self, id: &str) -> NoteResult<Note> {
        let idx = self
            .position(id)
            .ok_or_else(|| NoteError::NotFound(id.to_string()))?;

        let mut next = self.notes.clone();
        let removed = next.remove(idx);
        // An empty collection is persisted too, otherwise the last note comes back on reload.
        self.commit(next)?;

        info!(id = %removed.id, "deleted note");
        Ok(removed)
    }

    fn commit(&mut self, next: Vec<Note>) -> NoteResult<()> {
        let raw = persisted::encode(&next)?;
        self.kv.set_item(&self.key, &raw).map_err(|e| {
            warn!(key = %self.key, error = %e, "failed to persist notes");
            e
        })?;
        self.notes = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoteErrorKind;
    use crate::storage::MemoryStorage;
    use crate::surface::Snapshot;
    use std::cell::Cell;

    fn draft(id: Option<&str>, title: &str) -> NoteDraft {
        NoteDraft {
            id: id.map(str::to_string),
            title: title.to_string(),
            canvas_snapshot: Snapshot::from_png_bytes(title.as_bytes()),
            text_content: format!("text of {title}"),
        }
    }

    /// A clock that advances by one second on every read.
    fn ticking_clock() -> impl Fn() -> i64 {
        let t = Cell::new(1_700_000_000_000);
        move || {
            let now = t.get();
            t.set(now + 1_000);
            now
        }
    }

    fn open(kv: &MemoryStorage) -> NoteStore<MemoryStorage> {
        NoteStore::open(kv.clone(), DEFAULT_STORAGE_KEY).with_clock(ticking_clock())
    }

    #[test]
    fn test_empty_storage_opens_empty_without_error() {
        let mut store = open(&MemoryStorage::new());
        assert!(store.is_empty());
        assert!(store.take_load_error().is_none());
    }

    #[test]
    fn test_reload_reconstructs_equal_collection() {
        let kv = MemoryStorage::new();
        let mut store = open(&kv);
        let a = store.upsert(draft(None, "Biology 101")).expect("save a");
        let b = store.upsert(draft(None, "Chemistry")).expect("save b");

        let mut reloaded = open(&kv);
        assert!(reloaded.take_load_error().is_none());
        assert_eq!(reloaded.notes(), &[a.clone(), b]);
        assert_eq!(reloaded.get(&a.id).expect("present"), a);
    }

    #[test]
    fn test_insert_sets_equal_timestamps_and_fresh_id() {
        let mut store = open(&MemoryStorage::new());
        let note = store.upsert(draft(None, "Biology 101")).expect("save");
        assert!(note.id.starts_with("note-"));
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn test_upsert_existing_replaces_in_place_and_refreshes_updated_at() {
        let mut store = open(&MemoryStorage::new());
        let a = store.upsert(draft(None, "A")).expect("a");
        let b = store.upsert(draft(None, "B")).expect("b");

        let a2 = store
            .upsert(draft(Some(&a.id), "A revised"))
            .expect("update a");
        assert_eq!(a2.id, a.id);
        assert_eq!(a2.created_at, a.created_at);
        assert!(a2.updated_at > a.updated_at);

        // insertion order is not re-sorted on update
        let ids: Vec<_> = store.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id.clone(), b.id]);
        assert_eq!(store.list()[0].title, "A revised");
    }

    #[test]
    fn test_upsert_is_idempotent_apart_from_updated_at() {
        let mut store = open(&MemoryStorage::new());
        let first = store.upsert(draft(None, "Same")).expect("first");
        let same = draft(Some(&first.id), "Same");

        let second = store.upsert(same.clone()).expect("second");
        let after_second = store.notes().to_vec();
        let third = store.upsert(same).expect("third");

        assert_eq!(store.len(), 1);
        let strip = |n: &Note| Note {
            updated_at: 0,
            ..n.clone()
        };
        assert_eq!(strip(&second), strip(&third));
        assert_eq!(strip(&after_second[0]), strip(&store.notes()[0]));
        assert!(third.updated_at >= second.updated_at);
    }

    #[test]
    fn test_upsert_unknown_id_inserts_with_that_id() {
        let mut store = open(&MemoryStorage::new());
        let n = store
            .upsert(draft(Some("note-imported"), "Imported"))
            .expect("insert");
        assert_eq!(n.id, "note-imported");
        assert_eq!(n.created_at, n.updated_at);
    }

    #[test]
    fn test_create_rejects_existing_id() {
        let mut store = open(&MemoryStorage::new());
        let id = store.create(draft(None, "A")).expect("create");
        let err = store.create(draft(Some(&id), "A again")).unwrap_err();
        assert_eq!(err.kind(), NoteErrorKind::Validation);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_and_not_found() {
        let kv = MemoryStorage::new();
        let mut store = open(&kv);
        let a = store.upsert(draft(None, "A")).expect("a");

        let removed = store.delete(&a.id).expect("delete");
        assert_eq!(removed.id, a.id);
        assert!(store.list().is_empty());

        assert_eq!(
            store.delete(&a.id).unwrap_err().kind(),
            NoteErrorKind::NotFound
        );
        assert_eq!(store.get(&a.id).unwrap_err().kind(), NoteErrorKind::NotFound);

        // deleting the last note is persisted
        assert!(open(&kv).is_empty());
    }

    #[test]
    fn test_failed_write_leaves_store_and_medium_untouched() {
        let kv = MemoryStorage::new();
        let mut store = open(&kv);
        let a = store.upsert(draft(None, "A")).expect("a");
        let before = kv.raw(DEFAULT_STORAGE_KEY);

        kv.set_fail_writes(true);
        let err = store
            .upsert(draft(Some(&a.id), "A changed"))
            .unwrap_err();
        assert_eq!(err.kind(), NoteErrorKind::Storage);
        assert!(store.upsert(draft(None, "B")).is_err());
        assert!(store.delete(&a.id).is_err());

        assert_eq!(store.notes(), &[a]);
        assert_eq!(kv.raw(DEFAULT_STORAGE_KEY), before);
    }

    #[test]
    fn test_corrupt_storage_fails_closed_and_keeps_backup() {
        let kv = MemoryStorage::new();
        kv.set_item(DEFAULT_STORAGE_KEY, "[{\"id\": 3").expect("seed");

        let mut store = open(&kv);
        assert!(store.is_empty());
        assert_eq!(
            store.take_load_error().map(|e| e.kind()),
            Some(NoteErrorKind::Corruption)
        );
        assert!(store.take_load_error().is_none());
        assert_eq!(
            kv.raw("study-aid-notes.corrupt").as_deref(),
            Some("[{\"id\": 3")
        );

        // the store is usable afterwards
        store.upsert(draft(None, "Fresh start")).expect("save");
        assert_eq!(open(&kv).len(), 1);
    }

    #[test]
    fn test_legacy_collection_is_rewritten_in_current_format_on_next_write() {
        let kv = MemoryStorage::new();
        kv.set_item(
            DEFAULT_STORAGE_KEY,
            r#"[{"id":"note-1","title":"Old","canvasData":"","textContent":"hi",
                "createdAt":"2024-03-05T14:07:00.000Z","updatedAt":"2024-03-05T14:07:00.000Z"}]"#,
        )
        .expect("seed");

        let mut store = open(&kv);
        assert_eq!(store.list()[0].title, "Old");

        store.upsert(draft(None, "New")).expect("save");
        let raw = kv.raw(DEFAULT_STORAGE_KEY).expect("written");
        assert!(raw.starts_with("{\"version\":1"));
        assert_eq!(open(&kv).len(), 2);
    }
}
