//! Display targets and the host that hands them out.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use glam::UVec2;
use image::RgbaImage;

/// Host-assigned identity of a display target.
pub type TargetId = u64;

/// Supplier of display targets.
///
/// The host owns whatever window or widget shows a target; resize and close
/// come back as input events.
pub trait DisplayHost {
    /// Allocates a target of `size` pixels.
    fn acquire(&self, size: UVec2) -> TargetId;

    /// Releases a target.
    fn release(&self, id: TargetId);

    /// Resizes a target.
    fn resize(&self, id: TargetId, size: UVec2);

    /// Shows or hides a target.
    fn set_visible(&self, id: TargetId, visible: bool);

    /// Shows a finished frame.
    fn present(&self, id: TargetId, frame: &RgbaImage);
}

/// Bookkeeping of one live target of a [`HeadlessDisplayHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetInfo {
    /// Current size in pixels.
    pub size: UVec2,
    /// Whether the target is shown.
    pub visible: bool,
    /// Number of frames presented.
    pub frames: u64,
}

/// A host without windows that tracks what would be on screen.
#[derive(Debug, Default)]
pub struct HeadlessDisplayHost {
    next_id: Cell<TargetId>,
    live: RefCell<BTreeMap<TargetId, TargetInfo>>,
    acquired: Cell<u64>,
    released: Cell<u64>,
}

impl HeadlessDisplayHost {
    /// Creates a host with no targets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of targets currently allocated.
    pub fn live_targets(&self) -> usize {
        self.live.borrow().len()
    }

    /// Returns the total number of acquisitions.
    pub fn acquired(&self) -> u64 {
        self.acquired.get()
    }

    /// Returns the total number of releases.
    pub fn released(&self) -> u64 {
        self.released.get()
    }

    /// Returns the state of a live target.
    pub fn info(&self, id: TargetId) -> Option<TargetInfo> {
        self.live.borrow().get(&id).copied()
    }

    fn with_target(&self, id: TargetId, f: impl FnOnce(&mut TargetInfo)) {
        match self.live.borrow_mut().get_mut(&id) {
            Some(info) => f(info),
            None => log::warn!("display target {id} is not allocated"),
        }
    }
}

impl DisplayHost for HeadlessDisplayHost {
    fn acquire(&self, size: UVec2) -> TargetId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.acquired.set(self.acquired.get() + 1);
        self.live.borrow_mut().insert(
            id,
            TargetInfo {
                size,
                visible: true,
                frames: 0,
            },
        );
        log::debug!("acquired display target {id} ({}x{})", size.x, size.y);
        id
    }

    fn release(&self, id: TargetId) {
        if self.live.borrow_mut().remove(&id).is_some() {
            self.released.set(self.released.get() + 1);
            log::debug!("released display target {id}");
        } else {
            log::warn!("display target {id} released twice");
        }
    }

    fn resize(&self, id: TargetId, size: UVec2) {
        self.with_target(id, |info| info.size = size);
    }

    fn set_visible(&self, id: TargetId, visible: bool) {
        self.with_target(id, |info| info.visible = visible);
    }

    fn present(&self, id: TargetId, _frame: &RgbaImage) {
        self.with_target(id, |info| info.frames += 1);
    }
}

/// A display target and the framebuffer drawn into it.
#[derive(Debug, Clone)]
pub struct DisplayTarget {
    id: TargetId,
    framebuffer: RgbaImage,
}

impl DisplayTarget {
    /// Acquires a target from `host`.
    pub fn acquire(host: &dyn DisplayHost, size: UVec2) -> Self {
        let size = size.max(UVec2::ONE);
        Self {
            id: host.acquire(size),
            framebuffer: RgbaImage::new(size.x, size.y),
        }
    }

    /// Returns the host identity.
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Returns the framebuffer size.
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.framebuffer.width(), self.framebuffer.height())
    }

    /// Returns the framebuffer.
    pub fn framebuffer(&self) -> &RgbaImage {
        &self.framebuffer
    }

    /// Returns the framebuffer mutably.
    pub fn framebuffer_mut(&mut self) -> &mut RgbaImage {
        &mut self.framebuffer
    }

    /// Reallocates the framebuffer if the size changed. Returns true if it did.
    pub fn resize(&mut self, host: &dyn DisplayHost, size: UVec2) -> bool {
        let size = size.max(UVec2::ONE);
        if size == self.size() {
            return false;
        }
        self.framebuffer = RgbaImage::new(size.x, size.y);
        host.resize(self.id, size);
        true
    }

    /// Hands the framebuffer to the host.
    pub fn present(&self, host: &dyn DisplayHost) {
        host.present(self.id, &self.framebuffer);
    }

    /// Returns the target to the host.
    pub fn release(self, host: &dyn DisplayHost) {
        host.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release() {
        let host = HeadlessDisplayHost::new();
        let target = DisplayTarget::acquire(&host, UVec2::new(8, 4));
        assert_eq!(host.live_targets(), 1);
        assert_eq!(target.size(), UVec2::new(8, 4));
        target.present(&host);
        assert_eq!(host.info(target.id()).unwrap().frames, 1);

        target.release(&host);
        assert_eq!(host.live_targets(), 0);
        assert_eq!((host.acquired(), host.released()), (1, 1));
    }

    #[test]
    fn test_resize() {
        let host = HeadlessDisplayHost::new();
        let mut target = DisplayTarget::acquire(&host, UVec2::new(8, 8));
        assert!(!target.resize(&host, UVec2::new(8, 8)));
        assert!(target.resize(&host, UVec2::new(3, 5)));
        assert_eq!(host.info(target.id()).unwrap().size, UVec2::new(3, 5));
        assert_eq!(target.framebuffer().dimensions(), (3, 5));
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let host = HeadlessDisplayHost::new();
        let target = DisplayTarget::acquire(&host, UVec2::ZERO);
        assert_eq!(target.size(), UVec2::ONE);
    }
}
