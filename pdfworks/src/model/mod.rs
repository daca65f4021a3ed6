//! Ordered, id-keyed page model with per-page transform state.
//!
//! The model never touches PDF bytes. It records what the user did to each
//! page (order, rotation, crop, selection) and hands that to the thumbnail
//! pipeline and the exporter. `source_page` always refers to the page number
//! in the loaded document and is never renumbered.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::PageRange;
use crate::document::{CropBox, PageSize, Rotation};
use crate::error::{PdfWorksError, Result};

/// Stable identity of a page inside one [`PageModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PageId(u64);

impl PageId {
    /// Raw id value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Transform state of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDescriptor {
    /// Identity in the model.
    pub id: PageId,
    /// 1-based page number in the source document.
    pub source_page: u32,
    /// Rotation delta applied on top of the page's own rotation.
    pub rotation: Rotation,
    /// Crop box in point space, relative to the media box origin.
    pub crop: Option<CropBox>,
    /// Whether the page is exported.
    pub selected: bool,
    /// Media box size, when known.
    pub page_size: Option<PageSize>,
}

/// Arena of page descriptors plus their order.
#[derive(Debug, Clone, Default)]
pub struct PageModel {
    pages: HashMap<PageId, PageDescriptor>,
    order: Vec<PageId>,
}

impl PageModel {
    /// One selected, unrotated, uncropped descriptor per page, in page order.
    pub fn initialize(page_count: usize) -> Self {
        Self::build((0..page_count).map(|_| None))
    }

    /// Like [`PageModel::initialize`], recording page sizes for crop clamping.
    pub fn with_page_sizes(sizes: &[PageSize]) -> Self {
        Self::build(sizes.iter().copied().map(Some))
    }

    fn build(sizes: impl Iterator<Item = Option<PageSize>>) -> Self {
        let mut model = Self::default();
        for (index, page_size) in sizes.enumerate() {
            let id = PageId(index as u64 + 1);
            model.order.push(id);
            model.pages.insert(
                id,
                PageDescriptor {
                    id,
                    source_page: index as u32 + 1,
                    rotation: Rotation::NONE,
                    crop: None,
                    selected: true,
                    page_size,
                },
            );
        }
        model
    }

    /// Number of descriptors (selected or not).
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when every descriptor has been removed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in current order.
    pub fn ids(&self) -> &[PageId] {
        &self.order
    }

    /// Descriptors in current order.
    pub fn iter(&self) -> impl Iterator<Item = &PageDescriptor> {
        self.order.iter().filter_map(|id| self.pages.get(id))
    }

    /// Look up a descriptor.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPage` if the id is not in the model.
    pub fn get(&self, id: PageId) -> Result<&PageDescriptor> {
        self.pages.get(&id).ok_or(PdfWorksError::UnknownPage { id })
    }

    fn get_mut(&mut self, id: PageId) -> Result<&mut PageDescriptor> {
        self.pages.get_mut(&id).ok_or(PdfWorksError::UnknownPage { id })
    }

    /// Replace the order with `permutation`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPermutation` unless `permutation` contains every id of
    /// the model exactly once. The model is unchanged on error.
    pub fn reorder(&mut self, permutation: &[PageId]) -> Result<()> {
        if permutation.len() != self.order.len() {
            return Err(PdfWorksError::invalid_permutation(format!(
                "expected {} ids, got {}",
                self.order.len(),
                permutation.len()
            )));
        }

        let mut seen = HashSet::with_capacity(permutation.len());
        for id in permutation {
            if !self.pages.contains_key(id) {
                return Err(PdfWorksError::invalid_permutation(format!("unknown page {id}")));
            }
            if !seen.insert(*id) {
                return Err(PdfWorksError::invalid_permutation(format!("duplicate page {id}")));
            }
        }

        self.order = permutation.to_vec();
        Ok(())
    }

    /// Add `delta` degrees to a page's rotation. Negative deltas are allowed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRotation` unless `delta` is a multiple of 90, and
    /// `UnknownPage` for unknown ids.
    pub fn rotate(&mut self, id: PageId, delta: i64) -> Result<Rotation> {
        let page = self.get_mut(id)?;
        page.rotation = page.rotation.rotate(delta)?;
        Ok(page.rotation)
    }

    /// Rotate every page by `delta`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRotation` unless `delta` is a multiple of 90.
    pub fn rotate_all(&mut self, delta: i64) -> Result<()> {
        let delta = Rotation::from_degrees(delta)?;
        for page in self.pages.values_mut() {
            page.rotation = page.rotation.compose(delta);
        }
        Ok(())
    }

    /// Set a crop box, clamped into the page bounds when the size is known.
    ///
    /// Returns the stored box.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCropBox` for non-finite input and `UnknownPage` for
    /// unknown ids.
    pub fn set_crop(&mut self, id: PageId, crop: CropBox) -> Result<CropBox> {
        let page = self.get_mut(id)?;
        let bounds = page.page_size.unwrap_or(PageSize::new(f32::MAX, f32::MAX));
        let clamped = crop.clamp_to(bounds)?;
        page.crop = Some(clamped);
        Ok(clamped)
    }

    /// Remove a page's crop box.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPage` for unknown ids.
    pub fn clear_crop(&mut self, id: PageId) -> Result<()> {
        self.get_mut(id)?.crop = None;
        Ok(())
    }

    /// Exclude a page from export while keeping it in the model.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPage` for unknown ids.
    pub fn deselect(&mut self, id: PageId) -> Result<()> {
        self.get_mut(id)?.selected = false;
        Ok(())
    }

    /// Include a page in export again.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPage` for unknown ids.
    pub fn select(&mut self, id: PageId) -> Result<()> {
        self.get_mut(id)?.selected = true;
        Ok(())
    }

    /// Select exactly the pages whose source page falls in `range`.
    ///
    /// Returns the number of selected pages.
    pub fn select_only(&mut self, range: &PageRange) -> usize {
        let mut selected = 0;
        for page in self.pages.values_mut() {
            page.selected = range.contains(page.source_page);
            selected += usize::from(page.selected);
        }
        selected
    }

    /// Delete a descriptor. Remaining pages keep their `source_page`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPage` for unknown ids.
    pub fn remove(&mut self, id: PageId) -> Result<PageDescriptor> {
        let removed = self.pages.remove(&id).ok_or(PdfWorksError::UnknownPage { id })?;
        self.order.retain(|other| *other != id);
        Ok(removed)
    }

    /// Number of selected pages.
    pub fn selected_count(&self) -> usize {
        self.pages.values().filter(|p| p.selected).count()
    }

    /// Selected descriptors in current order.
    pub fn export_order(&self) -> Vec<PageDescriptor> {
        self.iter().filter(|p| p.selected).cloned().collect()
    }

    /// Immutable copy of the model for background consumers.
    pub fn snapshot(&self) -> PageModelSnapshot {
        PageModelSnapshot {
            pages: self.iter().cloned().collect(),
        }
    }
}

/// Frozen view of a [`PageModel`]; cheap to clone and share across threads.
#[derive(Debug, Clone)]
pub struct PageModelSnapshot {
    pages: Arc<[PageDescriptor]>,
}

impl PageModelSnapshot {
    /// All descriptors in model order.
    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    /// Selected descriptors in model order.
    pub fn export_order(&self) -> impl Iterator<Item = &PageDescriptor> {
        self.pages.iter().filter(|p| p.selected)
    }

    /// Number of selected descriptors.
    pub fn selected_count(&self) -> usize {
        self.export_order().count()
    }
}
