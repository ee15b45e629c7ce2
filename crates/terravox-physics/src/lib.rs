//! Player physics and voxel raycasting: swept AABB collision against the
//! chunk grid and grid-march block picking.

pub mod camera;
pub mod input;
pub mod player;
pub mod raycast;

pub use camera::Camera;
pub use input::InputBundle;
pub use player::Player;
pub use raycast::{grid_march, GridHit};
