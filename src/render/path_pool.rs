use indexmap::IndexMap;

use crate::render::{Fill, LayerId, PathBackend, PathId, Placement, Stroke, StyleKey};

/// Reusable paths keyed by style: one fill path per distinct fill and one
/// border path per distinct stroke.
///
/// Released paths are cleared, detached and parked on a free list that both
/// families draw from.
#[derive(Debug, Default)]
pub struct PathPool {
    free: Vec<PathId>,
    fill_paths: IndexMap<StyleKey, PathId>,
    border_paths: IndexMap<StyleKey, PathId>,
}

impl PathPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fill_path_count(&self) -> usize {
        self.fill_paths.len()
    }

    #[must_use]
    pub fn border_path_count(&self) -> usize {
        self.border_paths.len()
    }

    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn reset_fills<B: PathBackend + ?Sized>(&mut self, backend: &mut B) {
        Self::release(&mut self.fill_paths, &mut self.free, backend);
    }

    pub fn reset_borders<B: PathBackend + ?Sized>(&mut self, backend: &mut B) {
        Self::release(&mut self.border_paths, &mut self.free, backend);
    }

    fn release<B: PathBackend + ?Sized>(
        paths: &mut IndexMap<StyleKey, PathId>,
        free: &mut Vec<PathId>,
        backend: &mut B,
    ) {
        for (_, path) in paths.drain(..) {
            backend.clear_path(path);
            backend.detach_path(path);
            free.push(path);
        }
    }

    fn acquire<B: PathBackend + ?Sized>(&mut self, backend: &mut B) -> PathId {
        self.free.pop().unwrap_or_else(|| backend.create_path())
    }

    /// Path painting `fill`, attached at the back of `layer`.
    pub fn fill_path<B: PathBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        layer: LayerId,
        fill: &Fill,
    ) -> PathId {
        let key = fill.key();
        if let Some(path) = self.fill_paths.get(&key) {
            return *path;
        }
        let path = self.acquire(backend);
        backend.attach_path(path, layer, Placement::Back);
        backend.set_path_fill(path, fill);
        backend.set_path_stroke(path, &Stroke::None);
        self.fill_paths.insert(key, path);
        path
    }

    /// Path painting `stroke`, attached at the front of `layer`.
    pub fn border_path<B: PathBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        layer: LayerId,
        stroke: &Stroke,
    ) -> PathId {
        let key = stroke.key();
        if let Some(path) = self.border_paths.get(&key) {
            return *path;
        }
        let path = self.acquire(backend);
        backend.attach_path(path, layer, Placement::Front);
        backend.set_path_stroke(path, stroke);
        backend.set_path_fill(path, &Fill::None);
        self.border_paths.insert(key, path);
        path
    }
}
