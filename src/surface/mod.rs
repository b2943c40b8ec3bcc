mod canvas;
mod headless;
mod snapshot;

pub use canvas::CanvasSurface;
pub use headless::HeadlessSurface;
pub use snapshot::{DataUrl, Snapshot};

use crate::error::NoteResult;
use crate::models::ToolState;
use async_trait::async_trait;

/// Fixed parameters a drawing surface is created with.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub smoothing: f64,
    pub adaptive_stroke: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            smoothing: 0.85,
            adaptive_stroke: true,
        }
    }
}

/// A pixel surface that turns pointer input into ink.
///
/// The surface is the only owner of pixel data. Loading is split in two so a
/// caller can drop a decode that finished too late: `decode_snapshot` does the
/// asynchronous work without touching pixels, `render_decoded` replaces the
/// surface contents synchronously.
#[async_trait(?Send)]
pub trait DrawingSurface {
    type Decoded;

    /// Apply pen settings to subsequent strokes. Existing pixels are kept.
    fn configure(&self, tool: &ToolState);

    /// Erase every pixel.
    fn clear(&self);

    /// Allow or refuse pointer input. Refused while a snapshot is loading so no
    /// stroke ends up underneath the loaded image.
    fn set_input_enabled(&self, enabled: bool);

    async fn decode_snapshot(&self, snapshot: &Snapshot) -> NoteResult<Self::Decoded>;

    /// Clear, then paint the decoded image at the origin.
    fn render_decoded(&self, decoded: Self::Decoded);

    /// Capture the current pixels.
    fn export_snapshot(&self) -> Snapshot;

    /// Clear and render `snapshot`; on a decode failure the surface is left blank.
    async fn load_snapshot(&self, snapshot: &Snapshot) -> NoteResult<()> {
        if snapshot.is_blank() {
            self.clear();
            return Ok(());
        }

        self.set_input_enabled(false);
        let decoded = self.decode_snapshot(snapshot).await;
        let result = match decoded {
            Ok(image) => {
                self.render_decoded(image);
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        };
        self.set_input_enabled(true);
        result
    }
}
