use super::RecognitionEngine;
use crate::error::{NoteError, NoteResult};
use crate::surface::Snapshot;
use async_trait::async_trait;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

// Tesseract.js is loaded as a global by index.html.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = Tesseract, js_name = recognize, catch)]
    fn tesseract_recognize(
        image: &str,
        language: &str,
        options: &JsValue,
    ) -> Result<js_sys::Promise, JsValue>;
}

/// OCR through Tesseract.js, bounded by a timeout.
pub struct TesseractEngine {
    timeout_ms: i32,
}

impl TesseractEngine {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms: timeout_ms.min(i32::MAX as u32) as i32,
        }
    }

    /// A promise that rejects after the configured timeout.
    fn deadline(&self) -> NoteResult<js_sys::Promise> {
        let window =
            web_sys::window().ok_or_else(|| NoteError::Unavailable("window".to_string()))?;
        let timeout_ms = self.timeout_ms;
        Ok(js_sys::Promise::new(&mut |_resolve, reject| {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_1(
                &reject,
                timeout_ms,
                &JsValue::from_str("recognition timed out"),
            );
        }))
    }
}

#[async_trait(?Send)]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(&self, snapshot: &Snapshot, language: &str) -> NoteResult<String> {
        // Progress events are informational only.
        let logger = Closure::<dyn FnMut(JsValue)>::new(|m: JsValue| {
            let status = js_sys::Reflect::get(&m, &"status".into())
                .ok()
                .and_then(|s| s.as_string())
                .unwrap_or_default();
            let progress = js_sys::Reflect::get(&m, &"progress".into())
                .ok()
                .and_then(|p| p.as_f64())
                .unwrap_or_default();
            debug!(%status, progress, "tesseract progress");
        })
        // Owned by the JS GC: a timed-out job may keep reporting progress.
        .into_js_value();
        let options = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&options, &"logger".into(), &logger);

        let job = tesseract_recognize(snapshot.as_str(), language, &options)
            .map_err(|e| NoteError::Unavailable(format!("Tesseract ({})", NoteError::js_message(&e))))?;
        let race = js_sys::Promise::race(&js_sys::Array::of2(&job, &JsValue::from(self.deadline()?)));

        let result = JsFuture::from(race)
            .await
            .map_err(|e| NoteError::Recognition(NoteError::js_message(&e)))?;

        js_sys::Reflect::get(&result, &"data".into())
            .and_then(|data| js_sys::Reflect::get(&data, &"text".into()))
            .ok()
            .and_then(|t| t.as_string())
            .ok_or_else(|| NoteError::Recognition("unexpected Tesseract result".to_string()))
    }
}
