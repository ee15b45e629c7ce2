//! Per-tick input state handed to the player.

/// Mouse look sensitivity in degrees per pixel.
pub const MOUSE_SENSITIVITY: f32 = 0.025;
/// Pitch limit in degrees.
pub const PITCH_LIMIT: f32 = 88.0;

/// Pressed-key and pointer state sampled once per tick by the windowing
/// collaborator. `fly` carries the F-toggle state, not a key edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputBundle {
    /// W
    pub forward: bool,
    /// S
    pub back: bool,
    /// A
    pub left: bool,
    /// D
    pub right: bool,
    /// E, vertical ascent while flying
    pub ascend: bool,
    /// Q, vertical descent while flying
    pub descend: bool,
    /// Space: jump on the floor, swim in liquid
    pub jump: bool,
    /// F toggle state
    pub fly: bool,
    /// Mouse movement since the pointer was last re-centered, in pixels.
    pub mouse_dx: f32,
    pub mouse_dy: f32,
}
