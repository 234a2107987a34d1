//! Pointer tracking and the per-tick input queue.
//!
//! Hosts forward raw device-pixel coordinates; everything here is converted
//! into the normalized UV space shared by the dye and velocity grids.
//! Events are queued and drained exactly once at the start of a frame tick,
//! so an event source on another thread context never mutates pointer state
//! mid-frame.

use std::collections::VecDeque;

use glam::Vec2;

use crate::color::Rgb;

/// The synthetic pointer slot that exists from bootstrap onward.
pub const SYNTHETIC_POINTER_ID: i32 = -1;

#[derive(Debug, Clone)]
pub struct Pointer {
    pub id: i32,
    /// Current position in normalized texture coordinates, v up.
    pub texcoord: Vec2,
    pub prev_texcoord: Vec2,
    /// Aspect-corrected movement since the previous sample.
    pub delta: Vec2,
    pub down: bool,
    /// Set by movement, cleared when the frame tick consumes it.
    pub moved: bool,
    pub color: Rgb,
}

impl Default for Pointer {
    fn default() -> Self {
        Self {
            id: SYNTHETIC_POINTER_ID,
            texcoord: Vec2::ZERO,
            prev_texcoord: Vec2::ZERO,
            delta: Vec2::ZERO,
            down: false,
            moved: false,
            color: Rgb::default(),
        }
    }
}

impl Pointer {
    /// Pointer-down: snap to the contact position and take a new color.
    pub fn press(&mut self, id: i32, position: Vec2, surface: Vec2, color: Rgb) {
        self.id = id;
        self.down = true;
        self.moved = false;
        self.texcoord = to_uv(position, surface);
        self.prev_texcoord = self.texcoord;
        self.delta = Vec2::ZERO;
        self.color = color;
    }

    /// Pointer-move: update position and the aspect-corrected delta.
    pub fn advance(&mut self, position: Vec2, surface: Vec2) {
        self.prev_texcoord = self.texcoord;
        self.texcoord = to_uv(position, surface);
        let aspect = surface.x / surface.y;
        self.delta = Vec2::new(
            correct_delta_x(self.texcoord.x - self.prev_texcoord.x, aspect),
            correct_delta_y(self.texcoord.y - self.prev_texcoord.y, aspect),
        );
        self.moved = self.delta.x.abs() > 0.0 || self.delta.y.abs() > 0.0;
    }

    pub fn release(&mut self) {
        self.down = false;
    }
}

/// Device pixels (origin top-left) to normalized UV (v = 1 at the top edge).
pub fn to_uv(position: Vec2, surface: Vec2) -> Vec2 {
    Vec2::new(position.x / surface.x, 1.0 - position.y / surface.y)
}

fn correct_delta_x(delta: f32, aspect: f32) -> f32 {
    if aspect < 1.0 { delta * aspect } else { delta }
}

fn correct_delta_y(delta: f32, aspect: f32) -> f32 {
    if aspect > 1.0 { delta / aspect } else { delta }
}

/// Widens the splat radius on wide surfaces so the visible footprint stays
/// round regardless of canvas aspect ratio.
pub fn correct_radius(radius: f32, aspect: f32) -> f32 {
    if aspect > 1.0 { radius * aspect } else { radius }
}

/// Raw host input, in device pixels relative to the surface's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
}

/// FIFO handoff between the host's event source and the frame tick.
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<PointerEvent>,
}

impl InputQueue {
    pub fn push(&mut self, event: PointerEvent) {
        self.events.push_back(event);
    }

    /// Drains every pending event in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = PointerEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
