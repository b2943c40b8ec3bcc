use super::{DrawingSurface, Snapshot, SurfaceConfig};
use crate::error::{NoteError, NoteResult};
use crate::models::{DrawMode, ToolState};
use async_trait::async_trait;
use image::{imageops, DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::cell::RefCell;
use std::io::Cursor;
use tracing::{debug, warn};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

struct Raster {
    pixels: RgbaImage,
    tool: ToolState,
    input_enabled: bool,
}

/// In-process raster surface.
///
/// Strokes are stamped as discs along each polyline segment; erase mode stamps
/// transparent pixels. Exports PNG data URLs like a browser canvas does.
pub struct HeadlessSurface {
    config: SurfaceConfig,
    raster: RefCell<Raster>,
}

impl HeadlessSurface {
    pub fn new(config: SurfaceConfig) -> Self {
        let raster = Raster {
            pixels: RgbaImage::from_pixel(config.width, config.height, TRANSPARENT),
            tool: ToolState::default(),
            input_enabled: true,
        };
        Self {
            config,
            raster: RefCell::new(raster),
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn tool(&self) -> ToolState {
        self.raster.borrow().tool
    }

    pub fn input_enabled(&self) -> bool {
        self.raster.borrow().input_enabled
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let raster = self.raster.borrow();
        (x < raster.pixels.width() && y < raster.pixels.height())
            .then(|| raster.pixels.get_pixel(x, y).0)
    }

    pub fn is_blank(&self) -> bool {
        self.raster.borrow().pixels.pixels().all(|p| p.0[3] == 0)
    }

    /// Draw a pointer stroke through `points`. Returns `false` when input is
    /// currently refused.
    pub fn stroke(&self, points: &[(f32, f32)]) -> bool {
        let mut raster = self.raster.borrow_mut();
        if !raster.input_enabled {
            debug!("stroke refused while input is disabled");
            return false;
        }

        let tool = raster.tool;
        let ink = match tool.mode {
            DrawMode::Draw => Rgba([tool.color.r, tool.color.g, tool.color.b, 255]),
            DrawMode::Erase => TRANSPARENT,
        };
        let radius = (tool.weight as f32 / 2.0).max(0.5);

        match points {
            [] => {}
            [p] => stamp(&mut raster.pixels, *p, radius, ink),
            _ => {
                for seg in points.windows(2) {
                    let (a, b) = (seg[0], seg[1]);
                    let dist = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
                    let steps = (dist / (radius / 2.0).max(0.5)).ceil().max(1.0) as u32;
                    for i in 0..=steps {
                        let t = i as f32 / steps as f32;
                        let p = (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
                        stamp(&mut raster.pixels, p, radius, ink);
                    }
                }
            }
        }
        true
    }
}

fn stamp(pixels: &mut RgbaImage, (cx, cy): (f32, f32), radius: f32, ink: Rgba<u8>) {
    let reach = (radius + 0.5).powi(2);
    let (w, h) = (pixels.width() as i64, pixels.height() as i64);

    let x0 = (cx - radius).floor() as i64 - 1;
    let x1 = (cx + radius).ceil() as i64 + 1;
    let y0 = (cy - radius).floor() as i64 - 1;
    let y1 = (cy + radius).ceil() as i64 + 1;

    for y in y0.max(0)..=y1.min(h - 1) {
        for x in x0.max(0)..=x1.min(w - 1) {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= reach {
                pixels.put_pixel(x as u32, y as u32, ink);
            }
        }
    }
}

#[async_trait(?Send)]
impl DrawingSurface for HeadlessSurface {
    type Decoded = RgbaImage;

    fn configure(&self, tool: &ToolState) {
        self.raster.borrow_mut().tool = *tool;
    }

    fn clear(&self) {
        let mut raster = self.raster.borrow_mut();
        for p in raster.pixels.pixels_mut() {
            *p = TRANSPARENT;
        }
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.raster.borrow_mut().input_enabled = enabled;
    }

    async fn decode_snapshot(&self, snapshot: &Snapshot) -> NoteResult<RgbaImage> {
        let bytes = snapshot.decode_bytes()?;
        let image =
            image::load_from_memory(&bytes).map_err(|e| NoteError::Decode(e.to_string()))?;
        Ok(image.to_rgba8())
    }

    fn render_decoded(&self, decoded: RgbaImage) {
        self.clear();
        imageops::replace(&mut self.raster.borrow_mut().pixels, &decoded, 0, 0);
    }

    fn export_snapshot(&self) -> Snapshot {
        let image = DynamicImage::ImageRgba8(self.raster.borrow().pixels.clone());
        let mut bytes = Vec::new();
        match image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png) {
            Ok(()) => Snapshot::from_png_bytes(&bytes),
            Err(e) => {
                // Encoding into memory only fails on allocation problems.
                warn!(error = %e, "png encoding failed");
                Snapshot::blank()
            }
        }
    }
}
