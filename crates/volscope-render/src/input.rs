//! Input events, per-surface interaction handling and input routing.

use glam::{Quat, UVec2, Vec2};
use volscope_core::{InteractorStyle, VolumeIndex};
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

use crate::camera::CameraHub;
use crate::surface::SceneSurface;

/// Degrees of rotation per pixel of trackball drag.
const ROTATE_DEGREES_PER_PIXEL: f32 = 0.5;
/// Degrees of rotation per pixel of joystick offset per timer tick.
const JOYSTICK_DEGREES_PER_PIXEL: f32 = 0.05;
/// Dolly factor per wheel notch.
const WHEEL_DOLLY: f32 = 1.1;

/// An input event arriving on a display target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer moved to `pos` (pixels, origin top-left).
    PointerMove { pos: Vec2 },
    /// Pointer button pressed or released at `pos`.
    Button {
        button: MouseButton,
        state: ElementState,
        pos: Vec2,
    },
    /// Wheel scrolled by `delta` notches (positive = toward the scene).
    Wheel { delta: f32 },
    /// Key pressed or released.
    Key { code: KeyCode, state: ElementState },
    /// Animation timer tick.
    Timer,
    /// Pointer entered the target.
    Enter,
    /// Pointer left the target.
    Leave,
    /// Target resized to `size` pixels.
    Resize { size: UVec2 },
}

impl InputEvent {
    /// Returns true for events that originate from interactive manipulation.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            InputEvent::PointerMove { .. } | InputEvent::Wheel { .. } | InputEvent::Timer
        )
    }
}

/// What an [`Interactor`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    /// Nothing changed.
    Ignored,
    /// The shared camera moved.
    CameraMoved,
    /// The surface's own volume prop moved.
    PropMoved,
    /// A drag ended.
    Released,
    /// A style hotkey selected a new style.
    StyleChanged(InteractorStyle),
    /// The camera should be re-fitted to the data.
    Refit,
    /// The target was resized.
    Resized(UVec2),
}

/// State an [`Interactor`] may manipulate.
pub struct InteractionContext<'a> {
    /// Shared camera.
    pub camera: &'a CameraHub,
    /// Rotation of the surface's volume prop about the data center.
    pub prop: &'a mut Quat,
    /// Current interaction style.
    pub style: InteractorStyle,
    /// Size of the target receiving the event.
    pub viewport: UVec2,
}

/// Turns pointer and key events into camera or prop manipulation.
#[derive(Debug, Clone, Default)]
pub struct Interactor {
    pressed: Option<MouseButton>,
    last: Vec2,
}

impl Interactor {
    /// Creates an idle interactor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the button of the drag in progress, if any.
    pub fn pressed(&self) -> Option<MouseButton> {
        self.pressed
    }

    /// Applies one event.
    pub fn handle(&mut self, event: &InputEvent, ctx: &mut InteractionContext<'_>) -> Response {
        match *event {
            InputEvent::PointerMove { pos } => {
                let delta = pos - self.last;
                self.last = pos;
                match self.pressed {
                    Some(button) if !ctx.style.is_joystick() => drag(button, delta, ctx),
                    _ => Response::Ignored,
                }
            }
            InputEvent::Button {
                button,
                state: ElementState::Pressed,
                pos,
            } => {
                self.pressed = Some(button);
                self.last = pos;
                Response::Ignored
            }
            InputEvent::Button {
                state: ElementState::Released,
                ..
            } => {
                if self.pressed.take().is_some() {
                    Response::Released
                } else {
                    Response::Ignored
                }
            }
            InputEvent::Wheel { delta } => {
                if delta == 0.0 {
                    return Response::Ignored;
                }
                ctx.camera.update(|c| c.dolly(WHEEL_DOLLY.powf(delta)));
                Response::CameraMoved
            }
            InputEvent::Timer => match self.pressed {
                Some(button) if ctx.style.is_joystick() => {
                    // Joystick styles move at a rate given by the offset from the center.
                    let center = ctx.viewport.as_vec2() * 0.5;
                    let offset = (self.last - center) * JOYSTICK_DEGREES_PER_PIXEL;
                    drag(button, offset / ROTATE_DEGREES_PER_PIXEL, ctx)
                }
                _ => Response::Ignored,
            },
            InputEvent::Key {
                code,
                state: ElementState::Pressed,
            } => key(code, ctx.style),
            InputEvent::Key { .. } | InputEvent::Enter | InputEvent::Leave => Response::Ignored,
            InputEvent::Resize { size } => Response::Resized(size),
        }
    }
}

fn key(code: KeyCode, style: InteractorStyle) -> Response {
    let hotkey = match code {
        KeyCode::KeyR => return Response::Refit,
        KeyCode::KeyJ => 'j',
        KeyCode::KeyT => 't',
        KeyCode::KeyC => 'c',
        KeyCode::KeyA => 'a',
        _ => return Response::Ignored,
    };
    let next = style.with_key(hotkey);
    if next == style {
        Response::Ignored
    } else {
        Response::StyleChanged(next)
    }
}

fn drag(button: MouseButton, delta: Vec2, ctx: &mut InteractionContext<'_>) -> Response {
    if delta == Vec2::ZERO {
        return Response::Ignored;
    }
    let degrees = delta * ROTATE_DEGREES_PER_PIXEL;
    match button {
        MouseButton::Left if ctx.style.moves_actor() => {
            let camera = ctx.camera.borrow();
            let spin = Quat::from_axis_angle(camera.up.normalize_or_zero(), degrees.x.to_radians())
                * Quat::from_axis_angle(camera.right(), degrees.y.to_radians());
            *ctx.prop = (spin * *ctx.prop).normalize();
            Response::PropMoved
        }
        MouseButton::Left => {
            ctx.camera.update(|c| {
                c.azimuth(-degrees.x);
                c.elevation(degrees.y);
            });
            Response::CameraMoved
        }
        MouseButton::Right => {
            ctx.camera.update(|c| c.dolly(1.01_f32.powf(-delta.y)));
            Response::CameraMoved
        }
        MouseButton::Middle => {
            ctx.camera.update(|c| {
                let scale = c.distance() * 0.002;
                c.pan(-delta.x * scale, delta.y * scale);
            });
            Response::CameraMoved
        }
        _ => Response::Ignored,
    }
}

/// Where a routed event goes.
#[derive(Debug, Clone)]
pub enum Route {
    /// Handled by the display that received it.
    Local,
    /// Forwarded to a linked surface.
    Forward(SceneSurface),
    /// Nobody can handle it.
    Drop,
}

/// Where a routed event ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handled by the receiving display.
    Local,
    /// Handled by the linked surface with this volume index.
    Forwarded(VolumeIndex),
    /// Discarded.
    Dropped,
}

/// Routes the events of one display target to a linked surface.
///
/// Resize events always stay with the receiving display; everything else is
/// forwarded to the linked surface, or dropped when nothing is linked.
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    link: Option<SceneSurface>,
}

impl InputRouter {
    /// Creates an unlinked router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Links the router to `surface`, replacing any previous link.
    pub fn link(&mut self, surface: SceneSurface) {
        log::trace!("input linked to surface {}", surface.index());
        self.link = Some(surface);
    }

    /// Removes the link.
    pub fn unlink(&mut self) {
        self.link = None;
    }

    /// Returns the linked surface.
    pub fn linked(&self) -> Option<&SceneSurface> {
        self.link.as_ref()
    }

    /// Returns true if `surface` is the linked surface.
    pub fn is_linked_to(&self, surface: &SceneSurface) -> bool {
        self.link.as_ref().is_some_and(|s| s.ptr_eq(surface))
    }

    /// Decides where `event` goes.
    pub fn route(&self, event: &InputEvent) -> Route {
        if matches!(event, InputEvent::Resize { .. }) {
            return Route::Local;
        }
        match &self.link {
            Some(surface) => Route::Forward(surface.clone()),
            None => Route::Drop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(button: MouseButton, pos: Vec2) -> InputEvent {
        InputEvent::Button {
            button,
            state: ElementState::Pressed,
            pos,
        }
    }

    fn release(button: MouseButton) -> InputEvent {
        InputEvent::Button {
            button,
            state: ElementState::Released,
            pos: Vec2::ZERO,
        }
    }

    fn run(
        interactor: &mut Interactor,
        hub: &CameraHub,
        prop: &mut Quat,
        style: InteractorStyle,
        event: InputEvent,
    ) -> Response {
        let mut ctx = InteractionContext {
            camera: hub,
            prop,
            style,
            viewport: UVec2::new(100, 100),
        };
        interactor.handle(&event, &mut ctx)
    }

    #[test]
    fn test_trackball_camera_drag() {
        let hub = CameraHub::new();
        let mut prop = Quat::IDENTITY;
        let mut it = Interactor::new();
        let style = InteractorStyle::TrackballCamera;
        let before = hub.camera();

        let move_to = |x| InputEvent::PointerMove { pos: Vec2::new(x, 10.0) };
        assert_eq!(run(&mut it, &hub, &mut prop, style, move_to(10.0)), Response::Ignored);
        run(&mut it, &hub, &mut prop, style, press(MouseButton::Left, Vec2::new(10.0, 10.0)));
        assert_eq!(
            run(&mut it, &hub, &mut prop, style, move_to(30.0)),
            Response::CameraMoved
        );
        assert_ne!(hub.camera().position, before.position);
        assert_eq!(prop, Quat::IDENTITY);
        assert_eq!(
            run(&mut it, &hub, &mut prop, style, release(MouseButton::Left)),
            Response::Released
        );
        assert_eq!(it.pressed(), None);
    }

    #[test]
    fn test_actor_drag_moves_prop_only() {
        let hub = CameraHub::new();
        let mut prop = Quat::IDENTITY;
        let mut it = Interactor::new();
        let style = InteractorStyle::TrackballActor;
        let before = hub.camera();

        run(&mut it, &hub, &mut prop, style, press(MouseButton::Left, Vec2::ZERO));
        let response = run(
            &mut it,
            &hub,
            &mut prop,
            style,
            InputEvent::PointerMove { pos: Vec2::new(20.0, 0.0) },
        );
        assert_eq!(response, Response::PropMoved);
        assert_ne!(prop, Quat::IDENTITY);
        assert_eq!(hub.camera(), before);
    }

    #[test]
    fn test_joystick_moves_on_timer() {
        let hub = CameraHub::new();
        let mut prop = Quat::IDENTITY;
        let mut it = Interactor::new();
        let style = InteractorStyle::JoystickCamera;

        run(&mut it, &hub, &mut prop, style, press(MouseButton::Left, Vec2::new(90.0, 50.0)));
        let response = run(
            &mut it,
            &hub,
            &mut prop,
            style,
            InputEvent::PointerMove { pos: Vec2::new(95.0, 50.0) },
        );
        assert_eq!(response, Response::Ignored);
        assert_eq!(
            run(&mut it, &hub, &mut prop, style, InputEvent::Timer),
            Response::CameraMoved
        );
    }

    #[test]
    fn test_wheel_dollies() {
        let hub = CameraHub::new();
        let mut prop = Quat::IDENTITY;
        let mut it = Interactor::new();
        let before = hub.camera().distance();
        let response = run(
            &mut it,
            &hub,
            &mut prop,
            InteractorStyle::TrackballCamera,
            InputEvent::Wheel { delta: 1.0 },
        );
        assert_eq!(response, Response::CameraMoved);
        assert!(hub.camera().distance() < before);
    }

    #[test]
    fn test_style_keys() {
        let hub = CameraHub::new();
        let mut prop = Quat::IDENTITY;
        let mut it = Interactor::new();
        let key = |code| InputEvent::Key {
            code,
            state: ElementState::Pressed,
        };
        let style = InteractorStyle::TrackballCamera;
        assert_eq!(
            run(&mut it, &hub, &mut prop, style, key(KeyCode::KeyJ)),
            Response::StyleChanged(InteractorStyle::JoystickCamera)
        );
        assert_eq!(
            run(&mut it, &hub, &mut prop, style, key(KeyCode::KeyT)),
            Response::Ignored
        );
        assert_eq!(
            run(&mut it, &hub, &mut prop, style, key(KeyCode::KeyR)),
            Response::Refit
        );
        assert_eq!(
            run(&mut it, &hub, &mut prop, style, key(KeyCode::KeyQ)),
            Response::Ignored
        );
    }

    #[test]
    fn test_unlinked_router() {
        let router = InputRouter::new();
        assert!(matches!(router.route(&InputEvent::Timer), Route::Drop));
        assert!(matches!(
            router.route(&InputEvent::Resize {
                size: UVec2::new(4, 4)
            }),
            Route::Local
        ));
        assert!(router.linked().is_none());
    }
}
