mod app;
mod auth;
mod components;
mod config;
mod error;
mod logging;
mod models;
mod pages;
mod recognition;
mod session;
mod storage;
mod store;
mod surface;
mod util;

pub use app::App;
pub use auth::{guard_route, has_session_token, RouteDecision};
pub use config::AppConfig;
pub use error::{NoteError, NoteErrorKind, NoteResult};
pub use models::{Color, DrawMode, Note, NoteDraft, NoteSummary, ToolState};
pub use recognition::{RecognitionEngine, RecognitionGateway, TesseractEngine};
pub use session::{EditorMode, EditorState, LoadOutcome, NoteSession, RecognizeOutcome};
pub use storage::{KeyValueStore, LocalStorage, MemoryStorage};
pub use store::NoteStore;
pub use surface::{CanvasSurface, DrawingSurface, HeadlessSurface, Snapshot, SurfaceConfig};

use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const KEY: &str = "study-aid-notes-wasm-test";

    #[wasm_bindgen_test]
    fn test_notes_survive_reopening_local_storage() {
        let _ = LocalStorage.remove_item(KEY);

        let mut store = NoteStore::open(LocalStorage, KEY);
        let note = store
            .upsert(NoteDraft {
                id: None,
                title: "Cell biology".to_string(),
                canvas_snapshot: Snapshot::blank(),
                text_content: "mitochondria".to_string(),
            })
            .expect("save");

        let reopened = NoteStore::open(LocalStorage, KEY);
        assert_eq!(reopened.get(&note.id).expect("present").text_content, "mitochondria");

        let _ = LocalStorage.remove_item(KEY);
    }

    #[wasm_bindgen_test]
    fn test_config_defaults_without_window_env() {
        let config = AppConfig::from_window();
        assert_eq!(config.ocr_language, "eng");
        assert_eq!(config.surface().width, 800);
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    logging::init();
    mount_to_body(App);
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_headless_session_round_trip() {
        let kv = MemoryStorage::new();
        let surface = HeadlessSurface::new(SurfaceConfig {
            width: 16,
            height: 16,
            ..SurfaceConfig::default()
        });
        let store = NoteStore::open(kv.clone(), "lib-test");
        let session = NoteSession::new(
            surface,
            RecognitionGateway::new(NoEngine, "eng"),
            store,
        );

        session.create_new();
        assert!(session.surface().stroke(&[(2.0, 2.0), (12.0, 12.0)]));
        session.set_pending_title("Sketch");
        let saved = session.save().expect("save");

        session.create_new();
        assert!(session.surface().is_blank());
        assert_eq!(
            block_on(session.select(&saved.id)).expect("select"),
            LoadOutcome::Applied
        );
        assert!(!session.surface().is_blank());
        assert_eq!(session.mode(), EditorMode::EditingExisting(saved.id.clone()));

        let reopened = NoteStore::open(kv, "lib-test");
        assert_eq!(reopened.get(&saved.id).expect("persisted").title, "Sketch");
    }

    struct NoEngine;

    #[async_trait::async_trait(?Send)]
    impl RecognitionEngine for NoEngine {
        async fn recognize(&self, _: &Snapshot, _: &str) -> NoteResult<String> {
            Err(NoteError::Unavailable("OCR".to_string()))
        }
    }
}
