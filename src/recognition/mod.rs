mod tesseract;

pub use tesseract::TesseractEngine;

use crate::error::{NoteError, NoteResult};
use crate::surface::Snapshot;
use async_trait::async_trait;
use std::cell::Cell;
use tracing::{debug, info};

pub const DEFAULT_LANGUAGE: &str = "eng";

/// Something that reads text off an encoded image.
#[async_trait(?Send)]
pub trait RecognitionEngine {
    /// Extract text from `snapshot`. Failures are [`NoteError::Recognition`].
    async fn recognize(&self, snapshot: &Snapshot, language: &str) -> NoteResult<String>;
}

/// Single-flight front door to a [`RecognitionEngine`].
///
/// A call made while another is outstanding is rejected with
/// [`NoteError::Busy`]; there is no queue. The gateway never touches the
/// drawing surface or the note store.
pub struct RecognitionGateway<E> {
    engine: E,
    language: String,
    in_flight: Cell<bool>,
}

/// Clears the in-flight flag even when the recognizing future is dropped.
struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<E: RecognitionEngine> RecognitionGateway<E> {
    pub fn new(engine: E, language: impl Into<String>) -> Self {
        Self {
            engine,
            language: language.into(),
            in_flight: Cell::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn recognize(&self, snapshot: &Snapshot) -> NoteResult<String> {
        if self.in_flight.replace(true) {
            debug!("recognition rejected, another request is in flight");
            return Err(NoteError::Busy("Text recognition"));
        }
        let _guard = InFlight(&self.in_flight);

        if snapshot.is_blank() {
            return Err(NoteError::Recognition("the canvas is empty".to_string()));
        }
        snapshot
            .data_url()
            .map_err(|e| NoteError::Recognition(e.to_string()))?;

        info!(language = %self.language, "recognizing text");
        let raw = self
            .engine
            .recognize(snapshot, &self.language)
            .await
            .map_err(|e| match e {
                NoteError::Recognition(_) => e,
                other => NoteError::Recognition(other.to_string()),
            })?;

        let text = raw.trim_end();
        if text.is_empty() {
            return Err(NoteError::Recognition("no text was found".to_string()));
        }
        debug!(chars = text.len(), "recognition finished");
        Ok(text.to_string())
    }
}

/// Append recognized text after existing content, one line break apart.
pub fn append_recognized(existing: &str, recognized: &str) -> String {
    if existing.is_empty() {
        recognized.to_string()
    } else {
        format!("{existing}\n{recognized}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoteErrorKind;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::poll;
    use std::cell::RefCell;

    /// Engine that waits for the test to hand it an answer.
    #[derive(Default)]
    struct Manual {
        pending: RefCell<Vec<oneshot::Sender<NoteResult<String>>>>,
        calls: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl RecognitionEngine for Manual {
        async fn recognize(&self, _: &Snapshot, _: &str) -> NoteResult<String> {
            self.calls.set(self.calls.get() + 1);
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().push(tx);
            rx.await
                .unwrap_or_else(|_| Err(NoteError::Recognition("dropped".to_string())))
        }
    }

    impl Manual {
        fn answer(&self, result: NoteResult<String>) {
            let tx = self.pending.borrow_mut().remove(0);
            let _ = tx.send(result);
        }
    }

    fn ink() -> Snapshot {
        Snapshot::from_png_bytes(b"png")
    }

    #[test]
    fn test_append_policy() {
        assert_eq!(append_recognized("Hello", "World"), "Hello\nWorld");
        assert_eq!(append_recognized("", "World"), "World");
        assert_eq!(append_recognized("a\n", "b"), "a\n\nb");
    }

    #[test]
    fn test_overlapping_call_is_rejected_with_busy() {
        let gw = RecognitionGateway::new(Manual::default(), DEFAULT_LANGUAGE);
        block_on(async {
            let snap = ink();
            let mut first = Box::pin(gw.recognize(&snap));
            assert!(poll!(first.as_mut()).is_pending());
            assert!(gw.is_busy());

            let second = gw.recognize(&snap).await;
            assert_eq!(second.unwrap_err().kind(), NoteErrorKind::Busy);
            assert_eq!(gw.engine().calls.get(), 1);

            gw.engine().answer(Ok("Photosynthesis\n".to_string()));
            assert_eq!(first.await.expect("first succeeds"), "Photosynthesis");
            assert!(!gw.is_busy());
        });
    }

    #[test]
    fn test_dropping_a_request_frees_the_slot() {
        let gw = RecognitionGateway::new(Manual::default(), DEFAULT_LANGUAGE);
        block_on(async {
            let snap = ink();
            {
                let mut first = Box::pin(gw.recognize(&snap));
                assert!(poll!(first.as_mut()).is_pending());
            }
            assert!(!gw.is_busy());
        });
    }

    #[test]
    fn test_empty_inputs_and_outputs_are_recognition_errors() {
        let gw = RecognitionGateway::new(Manual::default(), DEFAULT_LANGUAGE);
        block_on(async {
            let err = gw.recognize(&Snapshot::blank()).await.unwrap_err();
            assert_eq!(err.kind(), NoteErrorKind::Recognition);
            let err = gw
                .recognize(&Snapshot::from_encoded("not an image"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), NoteErrorKind::Recognition);
            assert_eq!(gw.engine().calls.get(), 0);

            let snap = ink();
            let mut req = Box::pin(gw.recognize(&snap));
            assert!(poll!(req.as_mut()).is_pending());
            gw.engine().answer(Ok("  \n ".to_string()));
            assert_eq!(req.await.unwrap_err().kind(), NoteErrorKind::Recognition);
            assert!(!gw.is_busy());
        });
    }

    #[test]
    fn test_only_trailing_whitespace_is_trimmed() {
        let gw = RecognitionGateway::new(Manual::default(), DEFAULT_LANGUAGE);
        block_on(async {
            let snap = ink();
            let mut req = Box::pin(gw.recognize(&snap));
            assert!(poll!(req.as_mut()).is_pending());
            gw.engine().answer(Ok("  - indented item\n\n".to_string()));
            assert_eq!(req.await.expect("text"), "  - indented item");
        });
    }

    #[test]
    fn test_engine_failures_surface_as_recognition_errors() {
        let gw = RecognitionGateway::new(Manual::default(), DEFAULT_LANGUAGE);
        block_on(async {
            let snap = ink();
            let mut req = Box::pin(gw.recognize(&snap));
            assert!(poll!(req.as_mut()).is_pending());
            gw.engine()
                .answer(Err(NoteError::Unavailable("Tesseract".to_string())));

            let err = req.await.unwrap_err();
            assert_eq!(err.kind(), NoteErrorKind::Recognition);
            assert!(err.to_string().contains("Tesseract is not available"));
        });
    }
}
