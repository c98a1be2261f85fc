use std::fmt;

use tracing::debug;

use crate::core::{Consistent, Rect};
use crate::render::{LayerId, PathBackend, TextId};

use super::{Table, TableState};

/// Drawable placed inside a cell.
///
/// The table hands every owner cell's content its container layer and padded
/// bounds, then calls [`CellContent::draw`]. Content of a cell covered by a
/// merged neighbour is disabled and still drawn so it can hide itself.
pub trait CellContent: fmt::Debug {
    fn set_container(&mut self, layer: Option<LayerId>);

    fn set_parent_bounds(&mut self, bounds: Rect);

    fn set_enabled(&mut self, enabled: bool);

    fn draw(&mut self, backend: &mut dyn PathBackend);

    /// Releases everything the content put into the backend.
    fn remove(&mut self, backend: &mut dyn PathBackend);

    /// Plain text carried by the content, if any.
    fn text(&self) -> Option<&str> {
        None
    }
}

/// Text cell content.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    value: String,
    handle: Option<TextId>,
    container: Option<LayerId>,
    attached_to: Option<LayerId>,
    bounds: Rect,
    enabled: bool,
}

impl TextContent {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            handle: None,
            container: None,
            attached_to: None,
            bounds: Rect::default(),
            enabled: true,
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn handle(&self) -> Option<TextId> {
        self.handle
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl CellContent for TextContent {
    fn set_container(&mut self, layer: Option<LayerId>) {
        self.container = layer;
    }

    fn set_parent_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn draw(&mut self, backend: &mut dyn PathBackend) {
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let handle = backend.create_text();
                self.handle = Some(handle);
                handle
            }
        };
        if self.enabled {
            backend.set_text(handle, &self.value, self.bounds);
        }
        let parent = self.container.filter(|_| self.enabled);
        if parent != self.attached_to {
            backend.set_text_parent(handle, parent);
            self.attached_to = parent;
        }
        backend.set_text_visible(handle, self.enabled);
    }

    fn remove(&mut self, backend: &mut dyn PathBackend) {
        if let Some(handle) = self.handle {
            backend.set_text_parent(handle, None);
        }
        self.attached_to = None;
    }

    fn text(&self) -> Option<&str> {
        Some(&self.value)
    }
}

impl<B: PathBackend> Table<B> {
    /// Clears replaced content, then lays out and draws every cell's content.
    pub(super) fn check_content(&mut self, content_layer: LayerId) -> bool {
        if !self.has_invalidation_state(TableState::CONTENT) {
            return false;
        }

        let cleared = self.content_to_clear.len();
        while let Some(mut content) = self.content_to_clear.pop() {
            content.set_container(None);
            content.remove(&mut self.backend);
        }

        let mut drawn = 0_usize;
        for index in 0..self.cells.len() {
            let cell = &self.cells[index];
            if cell.content.is_none() {
                continue;
            }
            let bounds = cell.is_owner().then(|| {
                let outer = self.cell_bounds(cell.row(), cell.col(), cell.span());
                self.style_chain()
                    .padding(&cell.settings, cell.row(), cell.col())
                    .tighten(outer)
            });

            let backend = &mut self.backend;
            let Some(content) = self.cells[index].content.as_mut() else {
                continue;
            };
            match bounds {
                Some(bounds) => {
                    content.set_enabled(true);
                    content.set_container(Some(content_layer));
                    content.set_parent_bounds(bounds);
                }
                None => content.set_enabled(false),
            }
            content.draw(backend);
            drawn += 1;
        }

        self.mark_consistent(TableState::CONTENT);
        debug!(cleared, drawn, "table content drawn");
        true
    }
}
