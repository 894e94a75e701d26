//! Session settings.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use glam::{UVec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::blend::{BlendMode, SmoothingLaw};
use crate::error::{Result, VolscopeError};

/// Settings shared by every view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Combined size of volumes allowed on the GPU, in megabytes.
    pub gpu_mem_limit_mb: u64,

    /// Initial interaction style.
    pub interactor_style: InteractorStyle,

    /// Whether volumes are rendered with gradient shading.
    pub shaded: bool,

    /// Whether interactive renders trade quality for speed.
    pub progressive: bool,

    /// Minimum interval between forwarded pointer-move renders (0 = none).
    pub pointer_debounce_ms: u64,

    /// Smoothing law of new composite views.
    pub smoothing_law: SmoothingLaw,

    /// Blend mode of new composite views.
    pub blend_mode: BlendMode,

    /// Default size of render targets in pixels.
    pub viewport: UVec2,

    /// Background color.
    pub background: Vec3,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gpu_mem_limit_mb: 1 << 10,
            interactor_style: InteractorStyle::default(),
            shaded: false,
            progressive: true,
            pointer_debounce_ms: 30,
            smoothing_law: SmoothingLaw::default(),
            blend_mode: BlendMode::default(),
            viewport: UVec2::new(300, 300),
            background: Vec3::ZERO,
        }
    }
}

impl Settings {
    /// Returns the GPU memory limit in bytes.
    pub fn gpu_mem_limit_bytes(&self) -> u64 {
        self.gpu_mem_limit_mb.saturating_mul(1 << 20)
    }

    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes settings to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Writes settings to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// How pointer drags manipulate a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InteractorStyle {
    /// Camera moves continuously while the button is held.
    JoystickCamera,
    /// Prop moves continuously while the button is held.
    JoystickActor,
    /// Camera follows the pointer displacement.
    #[default]
    TrackballCamera,
    /// Prop follows the pointer displacement.
    TrackballActor,
    /// Camera driven by touch-style gestures.
    MultiTouchCamera,
}

impl InteractorStyle {
    /// All styles, in index order.
    pub const ALL: [InteractorStyle; 5] = [
        InteractorStyle::JoystickCamera,
        InteractorStyle::JoystickActor,
        InteractorStyle::TrackballCamera,
        InteractorStyle::TrackballActor,
        InteractorStyle::MultiTouchCamera,
    ];

    /// Returns display name.
    pub fn name(self) -> &'static str {
        match self {
            InteractorStyle::JoystickCamera => "joystick camera",
            InteractorStyle::JoystickActor => "joystick actor",
            InteractorStyle::TrackballCamera => "trackball camera",
            InteractorStyle::TrackballActor => "trackball actor",
            InteractorStyle::MultiTouchCamera => "multi-touch camera",
        }
    }

    /// Returns true if the style manipulates the volume prop instead of the camera.
    pub fn moves_actor(self) -> bool {
        matches!(
            self,
            InteractorStyle::JoystickActor | InteractorStyle::TrackballActor
        )
    }

    /// Returns true for joystick styles.
    pub fn is_joystick(self) -> bool {
        matches!(
            self,
            InteractorStyle::JoystickCamera | InteractorStyle::JoystickActor
        )
    }

    /// Returns the style with the given motion and target.
    pub fn from_parts(joystick: bool, actor: bool) -> Self {
        match (joystick, actor) {
            (true, false) => InteractorStyle::JoystickCamera,
            (true, true) => InteractorStyle::JoystickActor,
            (false, false) => InteractorStyle::TrackballCamera,
            (false, true) => InteractorStyle::TrackballActor,
        }
    }

    /// Returns the style after a style hotkey.
    ///
    /// `j`/`t` choose joystick/trackball motion and `c`/`a` choose the camera
    /// or the actor as target. Other keys leave the style unchanged.
    pub fn with_key(self, key: char) -> Self {
        let joystick = self.is_joystick();
        let actor = self.moves_actor();
        match key.to_ascii_lowercase() {
            'j' => Self::from_parts(true, actor),
            't' => Self::from_parts(false, actor),
            'c' => Self::from_parts(joystick, false),
            'a' => Self::from_parts(joystick, true),
            _ => self,
        }
    }
}

impl fmt::Display for InteractorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for InteractorStyle {
    type Error = VolscopeError;

    fn try_from(value: u32) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| VolscopeError::unknown("interactor style", value))
    }
}

impl FromStr for InteractorStyle {
    type Err = VolscopeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| VolscopeError::unknown("interactor style", s))
    }
}
