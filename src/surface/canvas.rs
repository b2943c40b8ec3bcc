use super::{DrawingSurface, Snapshot, SurfaceConfig};
use crate::error::{NoteError, NoteResult};
use crate::models::ToolState;
use async_trait::async_trait;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

// Atrament is loaded as a global by index.html.
#[wasm_bindgen]
extern "C" {
    type Atrament;

    #[wasm_bindgen(constructor, catch)]
    fn new(canvas: &HtmlCanvasElement, options: &JsValue) -> Result<Atrament, JsValue>;

    #[wasm_bindgen(method, setter)]
    fn set_color(this: &Atrament, color: &str);

    #[wasm_bindgen(method, setter)]
    fn set_weight(this: &Atrament, weight: f64);

    #[wasm_bindgen(method, setter)]
    fn set_mode(this: &Atrament, mode: &str);

    #[wasm_bindgen(method)]
    fn clear(this: &Atrament);
}

/// Browser canvas driven by the Atrament freehand-ink library.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    ink: Atrament,
}

impl CanvasSurface {
    pub fn attach(
        canvas: HtmlCanvasElement,
        config: &SurfaceConfig,
        tool: &ToolState,
    ) -> NoteResult<Self> {
        canvas.set_width(config.width);
        canvas.set_height(config.height);

        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or_else(|| NoteError::Unavailable("2d canvas context".to_string()))?;

        let options = js_sys::Object::new();
        let set = |k: &str, v: JsValue| {
            let _ = js_sys::Reflect::set(&options, &k.into(), &v);
        };
        set("width", config.width.into());
        set("height", config.height.into());
        set("color", tool.color.to_hex().into());
        set("weight", tool.weight.into());
        set("smoothing", config.smoothing.into());
        set("adaptiveStroke", config.adaptive_stroke.into());

        let ink = Atrament::new(&canvas, &options)
            .map_err(|e| NoteError::Unavailable(format!("Atrament ({})", NoteError::js_message(&e))))?;

        let surface = Self { canvas, ctx, ink };
        surface.configure(tool);
        Ok(surface)
    }
}

#[async_trait(?Send)]
impl DrawingSurface for CanvasSurface {
    type Decoded = HtmlImageElement;

    fn configure(&self, tool: &ToolState) {
        self.ink.set_color(&tool.color.to_hex());
        self.ink.set_weight(tool.weight as f64);
        self.ink.set_mode(tool.mode.as_ref());
    }

    fn clear(&self) {
        self.ink.clear();
    }

    fn set_input_enabled(&self, enabled: bool) {
        let value = if enabled { "auto" } else { "none" };
        let _ = self.canvas.style().set_property("pointer-events", value);
    }

    async fn decode_snapshot(&self, snapshot: &Snapshot) -> NoteResult<HtmlImageElement> {
        snapshot.data_url()?;

        let img = HtmlImageElement::new()
            .map_err(|e| NoteError::Unavailable(NoteError::js_message(&e)))?;
        img.set_src(snapshot.as_str());
        JsFuture::from(img.decode())
            .await
            .map_err(|e| NoteError::Decode(NoteError::js_message(&e)))?;
        Ok(img)
    }

    fn render_decoded(&self, decoded: HtmlImageElement) {
        self.clear();
        if let Err(e) = self
            .ctx
            .draw_image_with_html_image_element(&decoded, 0.0, 0.0)
        {
            warn!(error = %NoteError::js_message(&e), "drawing snapshot failed");
        }
    }

    fn export_snapshot(&self) -> Snapshot {
        match self.canvas.to_data_url() {
            Ok(url) => Snapshot::from_encoded(url),
            Err(e) => {
                // Only a tainted canvas refuses; ours never draws cross-origin images.
                warn!(error = %NoteError::js_message(&e), "canvas export failed");
                Snapshot::blank()
            }
        }
    }
}
