//! Ordered surface collection.
//!
//! Index 0 is the front-most surface: hit-testing scans forward, painting
//! runs back to front.

use log::{debug, info};
use quadmap_engine::paint::Color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::media::MediaSource;
use crate::placement::{Placement, PlacementConfig, Stage};
use crate::surface::{Surface, SurfaceId, SurfaceStatus};

/// Read-only row of the surface list.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceListEntry {
    pub index: usize,
    pub id: SurfaceId,
    pub name: String,
    pub status: SurfaceStatus,
    pub color: Color,
    pub selected: bool,
    pub can_move_up: bool,
    pub can_move_down: bool,
}

#[derive(Debug)]
pub struct Registry {
    surfaces: Vec<Surface>,
    selected: Option<usize>,
    next_id: u64,
    rng: StdRng,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic surface colors.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            surfaces: Vec::new(),
            selected: None,
            next_id: 1,
            rng,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Surface> {
        self.surfaces.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Surface> {
        self.surfaces.get_mut(index)
    }

    pub fn index_of(&self, id: SurfaceId) -> Option<usize> {
        self.surfaces.iter().position(|s| s.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.iter()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Appends a surface auto-fitted for the next index.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        source: MediaSource,
        stage: &Stage,
        config: &PlacementConfig,
    ) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;

        let placement = Placement::new(*stage, *config, self.surfaces.len());
        let color = self.next_color();
        let surface = Surface::new(id, name, source, color, &placement);
        info!(
            "registry: added {} {id} '{}' at index {}",
            surface.source().kind(),
            surface.name(),
            self.surfaces.len()
        );
        self.surfaces.push(surface);
        id
    }

    /// Drops the surface at `index` and its media. Out of range is a no-op.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.surfaces.len() {
            return false;
        }
        let removed = self.surfaces.remove(index);
        info!("registry: removed {} '{}'", removed.id(), removed.name());
        drop(removed);

        self.selected = match self.selected {
            Some(sel) if sel == index => {
                if self.surfaces.is_empty() {
                    None
                } else {
                    Some(index.min(self.surfaces.len() - 1))
                }
            }
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        true
    }

    /// Swaps `index` one step toward the front.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.surfaces.len() {
            return false;
        }
        self.swap(index, index - 1);
        true
    }

    /// Swaps `index` one step toward the back.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.surfaces.len() {
            return false;
        }
        self.swap(index, index + 1);
        true
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.surfaces.swap(a, b);
        self.selected = match self.selected {
            Some(s) if s == a => Some(b),
            Some(s) if s == b => Some(a),
            other => other,
        };
        debug!("registry: swapped {a} and {b}");
    }

    // ── selection ─────────────────────────────────────────────────────────

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.surfaces.len() {
            return false;
        }
        if self.selected != Some(index) {
            self.selected = Some(index);
            info!("registry: selected '{}'", self.surfaces[index].name());
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    #[inline]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_surface(&self) -> Option<&Surface> {
        self.selected.and_then(|i| self.surfaces.get(i))
    }

    pub fn selected_surface_mut(&mut self) -> Option<&mut Surface> {
        self.selected.and_then(|i| self.surfaces.get_mut(i))
    }

    // ── views ─────────────────────────────────────────────────────────────

    /// Non-hidden surfaces with their index, front to back.
    pub fn visible(&self) -> impl DoubleEndedIterator<Item = (usize, &Surface)> {
        self.surfaces.iter().enumerate().filter(|(_, s)| s.is_visible())
    }

    /// Non-hidden surfaces, back to front.
    pub fn paint_order(&self) -> impl Iterator<Item = (usize, &Surface)> {
        self.visible().rev()
    }

    pub(crate) fn surfaces_mut(&mut self) -> &mut [Surface] {
        &mut self.surfaces
    }

    pub fn list_view(&self) -> Vec<SurfaceListEntry> {
        let last = self.surfaces.len().saturating_sub(1);
        self.surfaces
            .iter()
            .enumerate()
            .map(|(index, s)| SurfaceListEntry {
                index,
                id: s.id(),
                name: s.name().to_owned(),
                status: s.status(),
                color: s.color(),
                selected: self.selected == Some(index),
                can_move_up: index > 0,
                can_move_down: index < last,
            })
            .collect()
    }

    fn next_color(&mut self) -> Color {
        let r = self.rng.random_range(100..=255u8);
        let g = self.rng.random_range(100..=255u8);
        let b = self.rng.random_range(100..=255u8);
        Color::from_srgb_u8(r, g, b, 255)
    }
}
