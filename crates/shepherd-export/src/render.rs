//! Renderer seam for image-format exports.
//!
//! Offscreen widget drawing belongs to the embedding application (canvas,
//! skia, print pipeline, ...). The queue only fixes the contract: a widget
//! set plus a sized surface spec in, encoded bytes out.

use crate::error::Result;
use crate::job::{ExportFormat, ExportOptions};
use crate::widget::WidgetSnapshot;
use async_trait::async_trait;

/// Surface specification for a render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSpec {
    /// Target format (png, pdf, or svg).
    pub format: ExportFormat,

    /// Surface width in pixels.
    pub width: u32,

    /// Surface height in pixels.
    pub height: u32,

    /// Quality, 0-100.
    pub quality: u8,
}

impl RenderSpec {
    /// Build a spec from job options: page size and orientation determine
    /// the surface dimensions, quality is clamped to 100.
    pub fn from_options(format: ExportFormat, options: &ExportOptions) -> Self {
        let (w, h) = options.page_size.dimensions();
        let (width, height) = match options.orientation {
            crate::job::Orientation::Portrait => (w, h),
            crate::job::Orientation::Landscape => (h, w),
        };
        Self {
            format,
            width,
            height,
            quality: options.quality.min(100),
        }
    }
}

/// Renders widgets onto an offscreen surface and encodes the result.
#[async_trait]
pub trait WidgetRenderer: Send + Sync {
    /// Render the widgets into `spec.format` bytes.
    async fn render(&self, widgets: &[WidgetSnapshot], spec: &RenderSpec) -> Result<Vec<u8>>;
}
