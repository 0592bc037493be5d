//! Widget data access for exports.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Tabular snapshot of one dashboard widget at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    /// Widget id.
    pub id: String,

    /// Display title; becomes the sheet/section name in tabular exports.
    pub title: String,

    /// Column headers.
    pub columns: Vec<String>,

    /// Row data; cells are JSON values so numeric columns stay numeric in
    /// formats that distinguish them.
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Source of widget snapshots, implemented by the embedding dashboard.
#[async_trait]
pub trait WidgetDataSource: Send + Sync {
    /// Snapshot a widget's current data.
    async fn snapshot(&self, widget_id: &str) -> Result<WidgetSnapshot>;
}
