//! # shepherd-export
//!
//! Asynchronous, cancellable export jobs for dashboard widgets.
//!
//! The queue owns all job state. Data formats (json/csv/excel) are encoded
//! on blocking workers so the caller's thread stays responsive; image
//! formats (png/pdf/svg) are delegated to an injected [`WidgetRenderer`] —
//! the offscreen drawing itself belongs to the embedding application.

pub mod encode;
pub mod error;
pub mod job;
pub mod queue;
pub mod render;
pub mod widget;

pub use error::{ExportError, Result};
pub use job::{
    DownloadHandle, ExportFormat, ExportJob, ExportOptions, ExportStatus, Orientation, PageSize,
};
pub use queue::ExportQueue;
pub use render::{RenderSpec, WidgetRenderer};
pub use widget::{WidgetDataSource, WidgetSnapshot};
