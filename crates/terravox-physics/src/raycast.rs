//! Grid-march raycasting (voxel DDA) against the terrain.

use glam::IVec3;
use terravox_core::math::Ray;
use terravox_core::{BlockType, Direction, Result};
use terravox_world::Terrain;

/// First non-empty cell found by a grid march.
#[derive(Clone, Copy, Debug)]
pub struct GridHit {
    /// Distance along the ray to the hit.
    pub distance: f32,
    /// The cell containing the hit block.
    pub cell: IVec3,
    /// The face of the cell the ray entered through.
    pub face: Direction,
}

/// March a ray through the voxel grid up to its reach and return the
/// first non-empty cell, or `None` if the ray runs out.
///
/// Starting exactly on a cell boundary while heading negatively advances
/// into the cell behind the boundary instead of re-testing the starting
/// cell forever. Leaving loaded terrain surfaces `OutOfRange`.
pub fn grid_march(ray: Ray, terrain: &Terrain) -> Result<Option<GridHit>> {
    let max_len = ray.length();
    if max_len == 0.0 {
        return Ok(None);
    }

    let mut origin = [ray.origin.x, ray.origin.y, ray.origin.z];
    let dir = [
        ray.direction.x / max_len,
        ray.direction.y / max_len,
        ray.direction.z / max_len,
    ];
    let mut cell = [
        origin[0].floor() as i32,
        origin[1].floor() as i32,
        origin[2].floor() as i32,
    ];

    let mut travelled = 0.0_f32;
    while travelled < max_len {
        let mut min_t = 3.0_f32.sqrt();
        let mut crossed_axis = None;
        for axis in 0..3 {
            if dir[axis] != 0.0 {
                let mut offset = dir[axis].signum().max(0.0);
                if cell[axis] as f32 == origin[axis] && offset == 0.0 {
                    offset = -1.0;
                }
                let next_boundary = (cell[axis] as f32 + offset - origin[axis]) / dir[axis];
                let next_boundary = next_boundary.min(max_len);
                if next_boundary < min_t {
                    min_t = next_boundary;
                    crossed_axis = Some(axis);
                }
            }
        }
        let Some(axis) = crossed_axis else {
            // Unreachable with a non-zero direction; a march that cannot
            // pick an axis is a programming error.
            unreachable!("grid march found no axis to step along");
        };

        travelled += min_t;
        for (component, step) in origin.iter_mut().zip(dir) {
            *component += step * min_t;
        }
        // Entering from the negative side lands in the cell behind the
        // crossed boundary.
        let mut entered = [
            origin[0].floor() as i32,
            origin[1].floor() as i32,
            origin[2].floor() as i32,
        ];
        if dir[axis] < 0.0 {
            entered[axis] -= 1;
        }
        cell = entered;

        let block = terrain.global_block_at(cell[0], cell[1], cell[2])?;
        if block != BlockType::Empty {
            let face = match (axis, dir[axis] > 0.0) {
                (0, true) => Direction::XNeg,
                (0, false) => Direction::XPos,
                (1, true) => Direction::YNeg,
                (1, false) => Direction::YPos,
                (2, true) => Direction::ZNeg,
                _ => Direction::ZPos,
            };
            return Ok(Some(GridHit {
                distance: travelled.min(max_len),
                cell: IVec3::from_array(cell),
                face,
            }));
        }
    }

    Ok(None)
}
