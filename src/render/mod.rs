mod path_pool;
mod primitives;
mod recording_backend;

pub use path_pool::PathPool;
pub use primitives::{Color, Fill, GradientKey, StyleKey, Stroke};
pub use recording_backend::{
    LayerChild, LayerRecord, PathCommand, PathRecord, RecordingBackend, TextRecord,
};

use serde::{Deserialize, Serialize};

use crate::core::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(u32);

impl LayerId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathId(u32);

impl PathId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextId(u32);

impl TextId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Where an attached path lands among its layer's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    /// First child, painted below everything else.
    Back,
    /// Last child, painted above everything else.
    Front,
}

/// Contract implemented by any vector-graphics backend.
///
/// Layout code only ever talks to the backend through these handles, so the
/// same table and controller logic drives a real canvas, an SVG writer or the
/// headless [`RecordingBackend`] used by tests.
pub trait PathBackend {
    fn create_layer(&mut self) -> LayerId;

    /// Re-parents `layer`; `None` detaches it from the scene.
    fn set_layer_parent(&mut self, layer: LayerId, parent: Option<LayerId>);

    fn set_layer_z_index(&mut self, layer: LayerId, z_index: i32);

    fn create_path(&mut self) -> PathId;

    fn attach_path(&mut self, path: PathId, layer: LayerId, placement: Placement);

    fn detach_path(&mut self, path: PathId);

    fn set_path_fill(&mut self, path: PathId, fill: &Fill);

    fn set_path_stroke(&mut self, path: PathId, stroke: &Stroke);

    fn move_to(&mut self, path: PathId, x: f64, y: f64);

    fn line_to(&mut self, path: PathId, x: f64, y: f64);

    fn close_path(&mut self, path: PathId);

    /// Drops every segment of `path`, keeping its style.
    fn clear_path(&mut self, path: PathId);

    fn create_text(&mut self) -> TextId;

    /// Replaces the text run and its layout box.
    fn set_text(&mut self, text: TextId, value: &str, bounds: Rect);

    /// Re-parents `text`; `None` detaches it from the scene.
    fn set_text_parent(&mut self, text: TextId, layer: Option<LayerId>);

    fn set_text_visible(&mut self, text: TextId, visible: bool);

    /// Width and height of `value` in pixels.
    fn measure_text(&self, value: &str) -> (f64, f64);
}
