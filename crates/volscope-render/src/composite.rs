//! Paging composite of several off-screen surfaces.
//!
//! Members are kept in insertion order; member `x` gets the weight of the
//! current [`SmoothingLaw`] at page `t`. The composite redraws after every
//! broadcast fan-out, so each member's buffer is already up to date.

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use glam::UVec2;
use image::RgbaImage;
use volscope_core::{
    clamp_page, page_weights, BlendMode, Result, SmoothingLaw, SubscriptionId, VolscopeError,
    VolumeIndex,
};

use crate::compositor::Compositor;
use crate::input::{Delivery, InputEvent, InputRouter, Route};
use crate::scope::ViewScope;
use crate::screenshot::{save_image, ScreenshotError};
use crate::surface::SceneSurface;
use crate::target::DisplayTarget;

/// Lifecycle state of a [`CompositeView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeState {
    /// No members and no display.
    Empty,
    /// At least one member and a live display.
    Active,
}

struct Member {
    surface: SceneSurface,
    weight: f32,
}

struct CompositeInner {
    scope: Rc<ViewScope>,
    members: Vec<Member>,
    page: f32,
    law: SmoothingLaw,
    mode: BlendMode,
    size: UVec2,
    router: InputRouter,
    display: Option<DisplayTarget>,
    subscription: Option<SubscriptionId>,
    finalized: bool,
}

impl CompositeInner {
    fn position(&self, surface: &SceneSurface) -> Option<usize> {
        self.members.iter().position(|m| m.surface.ptr_eq(surface))
    }

    fn recompute_weights(&mut self) {
        self.page = clamp_page(self.page, self.members.len());
        let weights = page_weights(self.members.len(), self.page, self.law);
        for (member, weight) in self.members.iter_mut().zip(weights) {
            member.weight = weight;
        }
    }

    fn release_display(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.scope.broadcaster().unsubscribe_after_fanout(id);
        }
        if let Some(display) = self.display.take() {
            display.release(self.scope.host());
            log::debug!("composite display released");
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(display) = self.display.as_mut() else {
            return Ok(());
        };
        let mut compositor =
            Compositor::new(display.size(), self.mode, self.scope.background());
        for member in &self.members {
            member
                .surface
                .with_off_screen_output(|image| compositor.add_layer(image, member.weight))?;
        }
        compositor.finish_into(display.framebuffer_mut());
        display.present(self.scope.host());
        Ok(())
    }
}

impl Drop for CompositeInner {
    fn drop(&mut self) {
        if self.display.is_some() {
            log::warn!(
                "composite view dropped with {} member(s)",
                self.members.len()
            );
        }
        self.release_display();
    }
}

/// Blends the off-screen buffers of member surfaces into one display.
///
/// Cloning yields another handle to the same composite.
#[derive(Clone)]
pub struct CompositeView {
    inner: Rc<RefCell<CompositeInner>>,
}

impl fmt::Debug for CompositeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("CompositeView")
                .field("members", &inner.members.len())
                .field("page", &inner.page)
                .field("law", &inner.law)
                .finish(),
            Err(_) => f.write_str("CompositeView { <busy> }"),
        }
    }
}

impl CompositeView {
    /// Creates an empty composite with a display of `size` pixels.
    pub fn new(scope: Rc<ViewScope>, size: UVec2, law: SmoothingLaw, mode: BlendMode) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CompositeInner {
                scope,
                members: Vec::new(),
                page: 0.0,
                law,
                mode,
                size: size.max(UVec2::ONE),
                router: InputRouter::new(),
                display: None,
                subscription: None,
                finalized: false,
            })),
        }
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> CompositeState {
        if self.inner.borrow().display.is_some() {
            CompositeState::Active
        } else {
            CompositeState::Empty
        }
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.inner.borrow().members.len()
    }

    /// Returns true if there are no members.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().members.is_empty()
    }

    /// Returns true once [`finalize`](Self::finalize) succeeded.
    pub fn is_finalized(&self) -> bool {
        self.inner.borrow().finalized
    }

    /// Returns true if `surface` is a member.
    pub fn contains(&self, surface: &SceneSurface) -> bool {
        self.inner.borrow().position(surface).is_some()
    }

    /// Returns the member volume indices in insertion order.
    pub fn members(&self) -> Vec<VolumeIndex> {
        self.inner
            .borrow()
            .members
            .iter()
            .map(|m| m.surface.index())
            .collect()
    }

    /// Returns the member weights in insertion order.
    pub fn weights(&self) -> Vec<f32> {
        self.inner.borrow().members.iter().map(|m| m.weight).collect()
    }

    /// Returns the current page position.
    pub fn page(&self) -> f32 {
        self.inner.borrow().page
    }

    /// Returns the smoothing law.
    pub fn smoothing_law(&self) -> SmoothingLaw {
        self.inner.borrow().law
    }

    /// Returns the blend mode.
    pub fn blend_mode(&self) -> BlendMode {
        self.inner.borrow().mode
    }

    /// Returns the display size.
    pub fn size(&self) -> UVec2 {
        self.inner.borrow().size
    }

    /// Returns the volume index of the surface receiving forwarded input.
    pub fn linked(&self) -> Option<VolumeIndex> {
        self.inner
            .borrow()
            .router
            .linked()
            .map(SceneSurface::index)
    }

    /// Adds an active off-screen surface as the last member.
    ///
    /// The first member allocates the display and receives its input.
    pub fn add(&self, surface: &SceneSurface) -> Result<()> {
        let size = {
            let inner = self.inner.borrow();
            if inner.finalized {
                return Err(VolscopeError::CompositeFinalized);
            }
            if inner.position(surface).is_some() {
                return Err(VolscopeError::AlreadyMember(surface.index()));
            }
            if !surface.is_active() {
                return Err(VolscopeError::SurfaceInactive(surface.index()));
            }
            if !surface.is_off_screen() {
                return Err(VolscopeError::NotOffScreen(surface.index()));
            }
            inner.size
        };
        surface.set_fixed_size(size);

        let mut inner = self.inner.borrow_mut();
        inner.members.push(Member {
            surface: surface.clone(),
            weight: 0.0,
        });
        if inner.display.is_none() {
            let display = DisplayTarget::acquire(inner.scope.host(), size);
            let weak = Rc::downgrade(&self.inner);
            let subscription = inner.scope.broadcaster().subscribe_after_fanout(move |_| {
                if let Some(inner) = weak.upgrade() {
                    CompositeView { inner }.refresh();
                }
            });
            inner.display = Some(display);
            inner.subscription = Some(subscription);
            inner.router.link(surface.clone());
            log::debug!("composite display acquired");
        }
        inner.recompute_weights();
        log::info!(
            "surface {} joined the composite ({} member(s))",
            surface.index(),
            inner.members.len()
        );
        inner.redraw()
    }

    /// Removes a member. Returns false if `surface` was not a member.
    ///
    /// Removing the linked member links the first remaining member, which
    /// takes over a drag in progress; removing the last member releases the
    /// display. The removed surface gets its own render size back.
    pub fn remove(&self, surface: &SceneSurface) -> Result<bool> {
        let mut inner = self.inner.borrow_mut();
        let Some(position) = inner.position(surface) else {
            return Ok(false);
        };
        inner.members.remove(position);
        log::info!(
            "surface {} left the composite ({} member(s))",
            surface.index(),
            inner.members.len()
        );

        if inner.router.is_linked_to(surface) {
            let gesture = surface.take_gesture();
            let next = inner.members.first().map(|m| m.surface.clone());
            match next {
                Some(next) => {
                    next.resume_gesture(gesture);
                    inner.router.link(next);
                }
                None => inner.router.unlink(),
            }
        }
        surface.clear_fixed_size();
        if inner.members.is_empty() {
            inner.page = 0.0;
            inner.release_display();
            return Ok(true);
        }
        inner.recompute_weights();
        inner.redraw()?;
        Ok(true)
    }

    /// Moves to page `t`, clamped to `[0, n - 1]`.
    pub fn set_page(&self, t: f32) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.page = t;
        inner.recompute_weights();
        inner.redraw()
    }

    /// Changes the smoothing law and re-applies it at the current page.
    pub fn set_smoothing_law(&self, law: SmoothingLaw) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.law = law;
        inner.recompute_weights();
        inner.redraw()
    }

    /// Changes the blend mode.
    pub fn set_blend_mode(&self, mode: BlendMode) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.mode = mode;
        inner.redraw()
    }

    /// Recomposites from the members' current buffers.
    pub fn refresh(&self) {
        let Ok(mut inner) = self.inner.try_borrow_mut() else {
            log::trace!("composite busy, skipping refresh");
            return;
        };
        if let Err(err) = inner.redraw() {
            log::warn!("composite refresh failed: {err}");
        }
    }

    /// Applies an input event received on the composite display.
    ///
    /// Resizes are handled here and resize every member buffer; other events
    /// go to the linked member.
    pub fn handle_input(&self, event: &InputEvent) -> Result<Delivery> {
        let route = {
            let inner = self.inner.borrow();
            if inner.finalized {
                return Err(VolscopeError::CompositeFinalized);
            }
            inner.router.route(event)
        };
        match route {
            Route::Local => {
                if let InputEvent::Resize { size } = *event {
                    self.resize(size)?;
                }
                Ok(Delivery::Local)
            }
            Route::Forward(surface) => {
                log::trace!("forwarding {event:?} to surface {}", surface.index());
                surface.handle_input(event);
                Ok(Delivery::Forwarded(surface.index()))
            }
            Route::Drop => Ok(Delivery::Dropped),
        }
    }

    /// Resizes the display and every member buffer.
    pub fn resize(&self, size: UVec2) -> Result<()> {
        let size = size.max(UVec2::ONE);
        let members: Vec<SceneSurface> = {
            let mut inner = self.inner.borrow_mut();
            inner.size = size;
            let scope = Rc::clone(&inner.scope);
            if let Some(display) = inner.display.as_mut() {
                display.resize(scope.host(), size);
            }
            inner.members.iter().map(|m| m.surface.clone()).collect()
        };
        for surface in &members {
            surface.set_fixed_size(size);
        }
        self.inner.borrow_mut().redraw()
    }

    /// Returns a copy of the composite image, if active.
    pub fn image(&self) -> Option<RgbaImage> {
        self.inner
            .borrow()
            .display
            .as_ref()
            .map(|d| d.framebuffer().clone())
    }

    /// Saves the composite image as PNG or JPEG.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> std::result::Result<(), ScreenshotError> {
        let image = self.image().ok_or(ScreenshotError::InvalidImageData)?;
        save_image(path, &image)
    }

    /// Releases the compositing pipeline. Only valid without members.
    pub fn finalize(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.finalized {
            return Err(VolscopeError::CompositeFinalized);
        }
        if !inner.members.is_empty() {
            return Err(VolscopeError::CompositeNotEmpty(inner.members.len()));
        }
        inner.release_display();
        inner.finalized = true;
        log::debug!("composite finalized");
        Ok(())
    }
}
