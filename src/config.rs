//! Simulation tunables and grid-resolution derivation.

use serde::{Deserialize, Serialize};

/// Upper bound on the per-frame time step. A stalled or backgrounded host
/// would otherwise feed the solver a dt large enough to blow it up.
pub const MAX_FRAME_TIME: f32 = 1.0 / 60.0;

/// Background color composited behind the dye when the effect is opaque.
/// Channels are normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Per-session tunables.
///
/// Serde field names match the option names a host passes in
/// (`SIM_RESOLUTION`, `DYE_RESOLUTION`, ...), so a JSON options object
/// deserializes directly. Unknown options are ignored, missing ones take
/// their defaults. Only `paused` mutates after initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SimulationConfig {
    /// Base resolution of the velocity/pressure grid (shorter screen edge).
    pub sim_resolution: u32,
    /// Base resolution of the visible dye grid.
    pub dye_resolution: u32,
    /// Base resolution of offscreen frame captures.
    pub capture_resolution: u32,
    pub density_dissipation: f32,
    pub velocity_dissipation: f32,
    /// Attenuation applied to the previous frame's pressure field before
    /// the Jacobi iterations start.
    pub pressure: f32,
    pub pressure_iterations: u32,
    /// Vorticity-confinement strength.
    pub curl: f32,
    pub splat_radius: f32,
    pub splat_force: f32,
    pub shading: bool,
    pub color_update_speed: f32,
    pub back_color: BackColor,
    pub transparent: bool,
    #[serde(skip)]
    pub paused: bool,
}

impl SimulationConfig {
    /// Parses a host-provided JSON options object, e.g.
    /// `{"SIM_RESOLUTION": 64, "SHADING": false}`. Missing options default.
    pub fn from_json(options: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(options)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sim_resolution: 128,
            dye_resolution: 1440,
            capture_resolution: 512,
            density_dissipation: 3.5,
            velocity_dissipation: 2.0,
            pressure: 0.1,
            pressure_iterations: 20,
            curl: 3.0,
            splat_radius: 0.2,
            splat_force: 6000.0,
            shading: true,
            color_update_speed: 10.0,
            back_color: BackColor { r: 0.5, g: 0.0, b: 0.0 },
            transparent: true,
            paused: false,
        }
    }
}

/// Derives grid dimensions from the visible surface: the shorter screen
/// dimension maps to `base`, the longer one scales by aspect ratio, rounded
/// to the nearest integer.
pub fn grid_resolution(base: u32, surface_width: u32, surface_height: u32) -> (u32, u32) {
    let width = surface_width.max(1) as f32;
    let height = surface_height.max(1) as f32;
    let mut aspect = width / height;
    if aspect < 1.0 {
        aspect = 1.0 / aspect;
    }
    let min = base.max(1);
    let max = ((base.max(1) as f32) * aspect).round() as u32;
    if surface_width > surface_height {
        (max, min)
    } else {
        (min, max)
    }
}
