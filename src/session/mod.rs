use crate::error::{NoteError, NoteResult};
use crate::models::{Color, DrawMode, Note, NoteDraft, NoteSummary, ToolState};
use crate::recognition::{append_recognized, RecognitionEngine, RecognitionGateway};
use crate::storage::KeyValueStore;
use crate::store::NoteStore;
use crate::surface::DrawingSurface;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Which note the editor is bound to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EditorMode {
    #[default]
    Idle,
    EditingExisting(String),
    EditingNew,
}

impl EditorMode {
    pub fn is_editing(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn note_id(&self) -> Option<&str> {
        match self {
            Self::EditingExisting(id) => Some(id),
            _ => None,
        }
    }
}

/// Point-in-time view of the editor for rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditorState {
    pub mode: EditorMode,
    pub tool: ToolState,
    pub pending_title: String,
    pub pending_text: String,
    pub is_saving: bool,
    pub is_recognizing: bool,
    /// Id of a note whose snapshot is still loading.
    pub loading: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A later `select`, `create_new` or `delete` took over before the load finished.
    Superseded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognizeOutcome {
    /// The text now in the editor.
    Merged(String),
    /// The editor moved to another note before recognition finished.
    Discarded,
}

#[derive(Default)]
struct SessionState {
    mode: EditorMode,
    tool: ToolState,
    pending_title: String,
    pending_text: String,
    /// Bumped whenever the editing target actually changes; guards recognition merges.
    target_gen: u64,
    /// Bumped per load request; only the latest may touch the surface.
    load_gen: u64,
    loading: Option<String>,
}

struct Shared<S, E, K: KeyValueStore> {
    surface: S,
    gateway: RecognitionGateway<E>,
    store: RefCell<NoteStore<K>>,
    state: RefCell<SessionState>,
    saving: Cell<bool>,
}

/// Orchestrates the drawing surface, text recognition and the note store for
/// one editor page.
///
/// All methods take `&self`; async ones can overlap on a single thread and
/// resolve their races through generation counters. No `RefCell` borrow is
/// held across an await.
pub struct NoteSession<S, E, K: KeyValueStore> {
    shared: Rc<Shared<S, E, K>>,
}

impl<S, E, K: KeyValueStore> Clone for NoteSession<S, E, K> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

struct SavingGuard<'a>(&'a Cell<bool>);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S, E, K> NoteSession<S, E, K>
where
    S: DrawingSurface,
    E: RecognitionEngine,
    K: KeyValueStore,
{
    pub fn new(surface: S, gateway: RecognitionGateway<E>, store: NoteStore<K>) -> Self {
        let state = SessionState::default();
        surface.configure(&state.tool);
        Self {
            shared: Rc::new(Shared {
                surface,
                gateway,
                store: RefCell::new(store),
                state: RefCell::new(state),
                saving: Cell::new(false),
            }),
        }
    }

    pub fn surface(&self) -> &S {
        &self.shared.surface
    }

    pub fn state(&self) -> EditorState {
        let st = self.shared.state.borrow();
        EditorState {
            mode: st.mode.clone(),
            tool: st.tool,
            pending_title: st.pending_title.clone(),
            pending_text: st.pending_text.clone(),
            is_saving: self.shared.saving.get(),
            is_recognizing: self.shared.gateway.is_busy(),
            loading: st.loading.clone(),
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.shared.state.borrow().mode.clone()
    }

    pub fn notes(&self) -> Vec<NoteSummary> {
        self.shared.store.borrow().list()
    }

    pub fn note(&self, id: &str) -> NoteResult<Note> {
        self.shared.store.borrow().get(id)
    }

    /// Error from loading the persisted collection, reported once.
    pub fn take_store_error(&self) -> Option<NoteError> {
        self.shared.store.borrow_mut().take_load_error()
    }

    pub fn set_pending_title(&self, title: impl Into<String>) {
        self.shared.state.borrow_mut().pending_title = title.into();
    }

    pub fn set_pending_text(&self, text: impl Into<String>) {
        self.shared.state.borrow_mut().pending_text = text.into();
    }

    pub fn set_tool(&self, tool: ToolState) {
        self.shared.state.borrow_mut().tool = tool;
        self.shared.surface.configure(&tool);
        debug!(color = %tool.color, weight = tool.weight, mode = %tool.mode, "tool changed");
    }

    pub fn set_color(&self, color: Color) {
        let tool = self.shared.state.borrow().tool;
        self.set_tool(ToolState { color, ..tool });
    }

    pub fn set_weight(&self, weight: u32) {
        let tool = self.shared.state.borrow().tool;
        self.set_tool(ToolState { weight, ..tool });
    }

    pub fn set_draw_mode(&self, mode: DrawMode) {
        let tool = self.shared.state.borrow().tool;
        self.set_tool(ToolState { mode, ..tool });
    }

    fn require_editing(&self) -> NoteResult<EditorMode> {
        let mode = self.mode();
        if mode.is_editing() {
            Ok(mode)
        } else {
            Err(NoteError::Validation("No note is open".to_string()))
        }
    }

    /// Cancel an outstanding snapshot load, if any.
    fn cancel_load(&self, st: &mut SessionState) {
        st.load_gen += 1;
        if st.loading.take().is_some() {
            self.shared.surface.set_input_enabled(true);
        }
    }

    /// Start a blank, unsaved note.
    pub fn create_new(&self) {
        {
            let mut st = self.shared.state.borrow_mut();
            self.cancel_load(&mut st);
            st.target_gen += 1;
            st.mode = EditorMode::EditingNew;
            st.pending_title.clear();
            st.pending_text.clear();
        }
        self.shared.surface.clear();
        info!("editing new note");
    }

    /// Open an existing note.
    ///
    /// Only the most recent `select` reaches the surface; an older one that
    /// resolves later returns [`LoadOutcome::Superseded`] and changes nothing.
    /// A decode failure keeps the editor on whatever it showed before.
    pub async fn select(&self, id: &str) -> NoteResult<LoadOutcome> {
        let note = self.note(id)?;

        let gen = {
            let mut st = self.shared.state.borrow_mut();
            st.load_gen += 1;
            st.loading = Some(id.to_string());
            st.load_gen
        };
        self.shared.surface.set_input_enabled(false);
        debug!(id, gen, "loading note");

        let decoded = if note.canvas_snapshot.is_blank() {
            Ok(None)
        } else {
            self.shared
                .surface
                .decode_snapshot(&note.canvas_snapshot)
                .await
                .map(Some)
        };

        let mut st = self.shared.state.borrow_mut();
        if st.load_gen != gen {
            debug!(id, gen, "discarding stale note load");
            return Ok(LoadOutcome::Superseded);
        }
        st.loading = None;
        self.shared.surface.set_input_enabled(true);

        let decoded = decoded.map_err(|e| {
            warn!(id, error = %e, "note failed to load");
            e
        })?;
        match decoded {
            Some(image) => self.shared.surface.render_decoded(image),
            None => self.shared.surface.clear(),
        }

        // The target only changes once the load lands; a pending or failed
        // load leaves recognition for the open note valid.
        st.target_gen += 1;
        st.mode = EditorMode::EditingExisting(note.id);
        st.pending_title = note.title;
        st.pending_text = note.text_content;
        info!(id, "note opened");
        Ok(LoadOutcome::Applied)
    }

    /// Persist the open note and bind the editor to it.
    ///
    /// The snapshot is taken at the moment of the call. Storage is synchronous,
    /// so the write has landed when this returns.
    pub fn save(&self) -> NoteResult<Note> {
        let mode = self.require_editing()?;
        if self.shared.saving.replace(true) {
            return Err(NoteError::Busy("Saving"));
        }
        let _guard = SavingGuard(&self.shared.saving);

        let (title, text) = {
            let st = self.shared.state.borrow();
            (st.pending_title.trim().to_string(), st.pending_text.clone())
        };
        if title.is_empty() {
            return Err(NoteError::Validation(
                "Please enter a title for your note".to_string(),
            ));
        }

        let draft = NoteDraft {
            id: mode.note_id().map(str::to_string),
            title,
            canvas_snapshot: self.shared.surface.export_snapshot(),
            text_content: text,
        };
        let note = self.shared.store.borrow_mut().upsert(draft)?;

        let mut st = self.shared.state.borrow_mut();
        st.mode = EditorMode::EditingExisting(note.id.clone());
        st.pending_title = note.title.clone();
        info!(id = %note.id, "note saved");
        Ok(note)
    }

    /// Delete a note; closes the editor if it was the open one.
    pub fn delete(&self, id: &str) -> NoteResult<()> {
        self.shared.store.borrow_mut().delete(id)?;

        let closed = {
            let mut st = self.shared.state.borrow_mut();
            if st.loading.as_deref() == Some(id) {
                self.cancel_load(&mut st);
            }
            if st.mode.note_id() == Some(id) {
                st.target_gen += 1;
                st.mode = EditorMode::Idle;
                st.pending_title.clear();
                st.pending_text.clear();
                true
            } else {
                false
            }
        };
        if closed {
            self.shared.surface.clear();
            info!(id, "open note deleted, editor closed");
        }
        Ok(())
    }

    /// [`NoteSession::delete`] behind a confirmation. Returns `false` when the
    /// user declined.
    pub fn delete_confirmed(
        &self,
        id: &str,
        confirm: impl FnOnce(&NoteSummary) -> bool,
    ) -> NoteResult<bool> {
        let summary = self.note(id)?.summary();
        if !confirm(&summary) {
            debug!(id, "delete cancelled");
            return Ok(false);
        }
        self.delete(id)?;
        Ok(true)
    }

    /// Run OCR over the current drawing and append the result to the text.
    ///
    /// Rejected with [`NoteError::Busy`] while another recognition runs. If the
    /// editor moved to another note meanwhile, the result is dropped.
    pub async fn recognize_text(&self) -> NoteResult<RecognizeOutcome> {
        self.require_editing()?;
        if self.shared.gateway.is_busy() {
            return Err(NoteError::Busy("Text recognition"));
        }

        let gen = self.shared.state.borrow().target_gen;
        let snapshot = self.shared.surface.export_snapshot();
        let result = self.shared.gateway.recognize(&snapshot).await;

        let text = result.map_err(|e| {
            warn!(error = %e, "recognition failed");
            e
        })?;

        let mut st = self.shared.state.borrow_mut();
        if st.target_gen != gen {
            debug!("discarding recognition result for a note no longer open");
            return Ok(RecognizeOutcome::Discarded);
        }
        st.pending_text = append_recognized(&st.pending_text, &text);
        Ok(RecognizeOutcome::Merged(st.pending_text.clone()))
    }

    /// Wipe the drawing. Title, text and the stored note are untouched.
    pub fn clear_canvas(&self) -> NoteResult<()> {
        self.require_editing()?;
        self.shared.surface.clear();
        Ok(())
    }
}
