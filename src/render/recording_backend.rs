use crate::core::Rect;
use crate::render::{Fill, LayerId, PathBackend, PathId, Placement, Stroke, TextId};

/// One recorded path segment command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Close,
}

/// Child of a layer, in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerChild {
    Layer(LayerId),
    Path(PathId),
    Text(TextId),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerRecord {
    pub parent: Option<LayerId>,
    pub z_index: i32,
    pub children: Vec<LayerChild>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathRecord {
    pub layer: Option<LayerId>,
    pub fill: Fill,
    pub stroke: Stroke,
    pub commands: Vec<PathCommand>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRecord {
    pub layer: Option<LayerId>,
    pub value: String,
    pub bounds: Rect,
    pub visible: bool,
}

/// Headless backend that keeps the whole scene in memory.
///
/// Used by tests and headless layout runs. `revision` advances on every
/// mutating call, so callers can assert that a redraw did no work.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub layers: Vec<LayerRecord>,
    pub paths: Vec<PathRecord>,
    pub texts: Vec<TextRecord>,
    pub revision: u64,
    /// Width of one character used by `measure_text`.
    pub char_width: f64,
    pub line_height: f64,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            char_width: 7.0,
            line_height: 16.0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn layer(&self, layer: LayerId) -> Option<&LayerRecord> {
        self.layers.get(layer.raw() as usize)
    }

    #[must_use]
    pub fn path(&self, path: PathId) -> Option<&PathRecord> {
        self.paths.get(path.raw() as usize)
    }

    #[must_use]
    pub fn text(&self, text: TextId) -> Option<&TextRecord> {
        self.texts.get(text.raw() as usize)
    }

    /// Attached paths of `layer` in paint order.
    #[must_use]
    pub fn layer_paths(&self, layer: LayerId) -> Vec<PathId> {
        self.layer(layer)
            .map(|record| {
                record
                    .children
                    .iter()
                    .filter_map(|child| match child {
                        LayerChild::Path(path) => Some(*path),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Attached paths that carry at least one segment.
    #[must_use]
    pub fn drawn_paths(&self) -> Vec<&PathRecord> {
        self.paths
            .iter()
            .filter(|path| path.layer.is_some() && !path.commands.is_empty())
            .collect()
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn detach_child(&mut self, layer: Option<LayerId>, child: LayerChild) {
        if let Some(record) = layer.and_then(|layer| self.layers.get_mut(layer.raw() as usize)) {
            record.children.retain(|existing| *existing != child);
        }
    }

    fn path_mut(&mut self, path: PathId) -> Option<&mut PathRecord> {
        self.paths.get_mut(path.raw() as usize)
    }
}

impl PathBackend for RecordingBackend {
    fn create_layer(&mut self) -> LayerId {
        self.bump();
        let id = LayerId::new(self.layers.len() as u32);
        self.layers.push(LayerRecord::default());
        id
    }

    fn set_layer_parent(&mut self, layer: LayerId, parent: Option<LayerId>) {
        self.bump();
        let previous = self.layer(layer).and_then(|record| record.parent);
        self.detach_child(previous, LayerChild::Layer(layer));
        if let Some(record) = self.layers.get_mut(layer.raw() as usize) {
            record.parent = parent;
        }
        if let Some(parent) = parent.and_then(|parent| self.layers.get_mut(parent.raw() as usize)) {
            parent.children.push(LayerChild::Layer(layer));
        }
    }

    fn set_layer_z_index(&mut self, layer: LayerId, z_index: i32) {
        self.bump();
        if let Some(record) = self.layers.get_mut(layer.raw() as usize) {
            record.z_index = z_index;
        }
    }

    fn create_path(&mut self) -> PathId {
        self.bump();
        let id = PathId::new(self.paths.len() as u32);
        self.paths.push(PathRecord::default());
        id
    }

    fn attach_path(&mut self, path: PathId, layer: LayerId, placement: Placement) {
        self.detach_path(path);
        if let Some(record) = self.layers.get_mut(layer.raw() as usize) {
            match placement {
                Placement::Back => record.children.insert(0, LayerChild::Path(path)),
                Placement::Front => record.children.push(LayerChild::Path(path)),
            }
        }
        if let Some(record) = self.path_mut(path) {
            record.layer = Some(layer);
        }
    }

    fn detach_path(&mut self, path: PathId) {
        self.bump();
        let previous = self.path(path).and_then(|record| record.layer);
        self.detach_child(previous, LayerChild::Path(path));
        if let Some(record) = self.path_mut(path) {
            record.layer = None;
        }
    }

    fn set_path_fill(&mut self, path: PathId, fill: &Fill) {
        self.bump();
        if let Some(record) = self.path_mut(path) {
            record.fill = fill.clone();
        }
    }

    fn set_path_stroke(&mut self, path: PathId, stroke: &Stroke) {
        self.bump();
        if let Some(record) = self.path_mut(path) {
            record.stroke = stroke.clone();
        }
    }

    fn move_to(&mut self, path: PathId, x: f64, y: f64) {
        self.bump();
        if let Some(record) = self.path_mut(path) {
            record.commands.push(PathCommand::MoveTo(x, y));
        }
    }

    fn line_to(&mut self, path: PathId, x: f64, y: f64) {
        self.bump();
        if let Some(record) = self.path_mut(path) {
            record.commands.push(PathCommand::LineTo(x, y));
        }
    }

    fn close_path(&mut self, path: PathId) {
        self.bump();
        if let Some(record) = self.path_mut(path) {
            record.commands.push(PathCommand::Close);
        }
    }

    fn clear_path(&mut self, path: PathId) {
        self.bump();
        if let Some(record) = self.path_mut(path) {
            record.commands.clear();
        }
    }

    fn create_text(&mut self) -> TextId {
        self.bump();
        let id = TextId::new(self.texts.len() as u32);
        self.texts.push(TextRecord {
            visible: true,
            ..TextRecord::default()
        });
        id
    }

    fn set_text(&mut self, text: TextId, value: &str, bounds: Rect) {
        self.bump();
        if let Some(record) = self.texts.get_mut(text.raw() as usize) {
            record.value = value.to_owned();
            record.bounds = bounds;
        }
    }

    fn set_text_parent(&mut self, text: TextId, layer: Option<LayerId>) {
        self.bump();
        let previous = self.text(text).and_then(|record| record.layer);
        self.detach_child(previous, LayerChild::Text(text));
        if let Some(record) = layer.and_then(|layer| self.layers.get_mut(layer.raw() as usize)) {
            record.children.push(LayerChild::Text(text));
        }
        if let Some(record) = self.texts.get_mut(text.raw() as usize) {
            record.layer = layer;
        }
    }

    fn set_text_visible(&mut self, text: TextId, visible: bool) {
        self.bump();
        if let Some(record) = self.texts.get_mut(text.raw() as usize) {
            record.visible = visible;
        }
    }

    fn measure_text(&self, value: &str) -> (f64, f64) {
        (value.chars().count() as f64 * self.char_width, self.line_height)
    }
}

#[cfg(test)]
mod tests {
    use super::{PathCommand, RecordingBackend};
    use crate::render::{PathBackend, Placement};

    #[test]
    fn attach_respects_placement() {
        let mut backend = RecordingBackend::new();
        let layer = backend.create_layer();
        let front = backend.create_path();
        let back = backend.create_path();
        backend.attach_path(front, layer, Placement::Front);
        backend.attach_path(back, layer, Placement::Back);
        assert_eq!(backend.layer_paths(layer), vec![back, front]);

        backend.detach_path(back);
        assert_eq!(backend.layer_paths(layer), vec![front]);
        assert_eq!(backend.path(back).and_then(|path| path.layer), None);
    }

    #[test]
    fn path_commands_are_recorded_and_cleared() {
        let mut backend = RecordingBackend::new();
        let path = backend.create_path();
        backend.move_to(path, 0.0, 0.0);
        backend.line_to(path, 10.0, 0.0);
        backend.close_path(path);
        assert_eq!(
            backend.path(path).map(|record| record.commands.clone()),
            Some(vec![
                PathCommand::MoveTo(0.0, 0.0),
                PathCommand::LineTo(10.0, 0.0),
                PathCommand::Close,
            ])
        );
        let before = backend.revision;
        backend.clear_path(path);
        assert!(backend.revision > before);
        assert!(backend.path(path).is_some_and(|record| record.commands.is_empty()));
    }

    #[test]
    fn reparenting_a_layer_moves_it_between_parents() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_layer();
        let b = backend.create_layer();
        let child = backend.create_layer();
        backend.set_layer_parent(child, Some(a));
        backend.set_layer_parent(child, Some(b));
        assert!(backend.layer(a).is_some_and(|record| record.children.is_empty()));
        assert_eq!(backend.layer(b).map(|record| record.children.len()), Some(1));
    }
}
