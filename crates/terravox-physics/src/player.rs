//! Player state, movement physics, and block picking.

use glam::{IVec3, Vec3};
use terravox_core::math::Ray;
use terravox_core::{BlockType, Result};
use terravox_world::Terrain;

use crate::camera::Camera;
use crate::input::{InputBundle, MOUSE_SENSITIVITY, PITCH_LIMIT};
use crate::raycast::{grid_march, GridHit};

const ACCELERATION: f32 = 0.5;
const FRICTION: f32 = 0.95;
const GRAVITY: f32 = -0.5;
/// Acceleration, friction, and gravity all scale by this while swimming.
const LIQUID_SCALE: f32 = 2.0 / 3.0;
/// One-shot vertical impulse of a jump off the floor.
const JUMP_IMPULSE: f32 = 20.0;
/// Fixed upward velocity while holding Space in liquid.
const SWIM_SPEED: f32 = 2.0;
/// Horizontal half-extent of the collision box.
const BODY_RADIUS: f32 = 0.4;
/// Eye height above the feet.
const EYE_HEIGHT: f32 = 1.5;
/// Reach of the picking ray.
const REACH: f32 = 3.0;
/// Nudge pushing axis probes onto the leading face.
const PROBE_NUDGE: f32 = 0.1;

/// Probe ring heights: feet, waist, head.
const RING_BOTTOM: f32 = 0.0;
const RING_MID: f32 = 1.0;
const RING_TOP: f32 = 1.9;

/// Corner offsets of one probe ring.
fn ring(y: f32) -> [Vec3; 4] {
    [
        Vec3::new(BODY_RADIUS, y, BODY_RADIUS),
        Vec3::new(-BODY_RADIUS, y, BODY_RADIUS),
        Vec3::new(BODY_RADIUS, y, -BODY_RADIUS),
        Vec3::new(-BODY_RADIUS, y, -BODY_RADIUS),
    ]
}

/// The player: a 1.9-unit-tall swept AABB with a camera at eye height.
///
/// States: flying toggles with F; walking transitions to airborne on a
/// jump or a walk-off and back to grounded on floor contact. Liquid
/// immersion orthogonally swaps in the swimming parameters.
pub struct Player {
    position: Vec3,
    velocity: Vec3,
    acceleration: Vec3,
    camera: Camera,
    pitch_degrees: f32,
    pub flying: bool,
    pub on_floor: bool,
    pub is_walking: bool,
    /// Block the player stands on, for the audio collaborator.
    pub on_top_of: BlockType,
    /// Liquid at head height, for the post-process collaborator.
    pub under_liquid_block: BlockType,
}

impl Player {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            camera: Camera::new(position + Vec3::new(0.0, EYE_HEIGHT, 0.0)),
            pitch_degrees: 0.0,
            flying: true,
            on_floor: true,
            is_walking: false,
            on_top_of: BlockType::Empty,
            under_liquid_block: BlockType::Empty,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Apply mouse look with the pitch clamp.
    pub fn look(&mut self, dx_pixels: f32, dy_pixels: f32) {
        let yaw = -dx_pixels * MOUSE_SENSITIVITY;
        let pitch = -dy_pixels * MOUSE_SENSITIVITY;

        if (pitch > 0.0 && self.pitch_degrees < PITCH_LIMIT)
            || (pitch < 0.0 && self.pitch_degrees > -PITCH_LIMIT)
        {
            self.pitch_degrees += pitch;
            self.camera.rotate_on_right_local(pitch);
        }
        self.camera.rotate_on_up_global(yaw);
    }

    /// Advance one tick: inputs, semi-implicit integration, and per-axis
    /// swept collision.
    pub fn tick(&mut self, dt: f32, input: &InputBundle, terrain: &Terrain) -> Result<()> {
        self.look(input.mouse_dx, input.mouse_dy);
        self.process_inputs(input, terrain)?;
        self.compute_physics(dt, terrain)
    }

    fn process_inputs(&mut self, input: &InputBundle, terrain: &Terrain) -> Result<()> {
        self.flying = input.fly;
        self.is_walking = false;

        let mut accel = ACCELERATION;
        let mut friction = FRICTION;
        let mut gravity = GRAVITY;

        // Any body corner in liquid counts as swimming.
        let swimming = !self.flying && self.in_liquid(terrain)?;
        if swimming {
            accel *= LIQUID_SCALE;
            friction *= LIQUID_SCALE;
            gravity *= LIQUID_SCALE;
        }

        self.velocity *= friction;
        self.acceleration = Vec3::ZERO;

        let forward = self.camera.forward();
        let right = self.camera.right();
        let up = self.camera.up();

        if input.forward {
            self.acceleration += accel * forward;
            self.is_walking = true;
        } else if input.back {
            self.acceleration -= accel * forward;
            self.is_walking = true;
        }
        if input.right {
            self.acceleration += accel * right;
            self.is_walking = true;
        } else if input.left {
            self.acceleration -= accel * right;
            self.is_walking = true;
        }

        if self.flying {
            if input.ascend {
                self.acceleration += accel * up;
            } else if input.descend {
                self.acceleration -= accel * up;
            }
        } else {
            if swimming {
                if input.jump {
                    self.velocity.y = SWIM_SPEED;
                }
            } else if input.jump && self.on_floor {
                self.velocity.y += JUMP_IMPULSE;
                self.on_floor = false;
            }
            self.acceleration.y = gravity;
        }

        self.velocity += self.acceleration;
        Ok(())
    }

    fn compute_physics(&mut self, dt: f32, terrain: &Terrain) -> Result<()> {
        let displacement = self.velocity * dt + 0.5 * self.acceleration * dt * dt;
        let ray = self.velocity * dt;

        let floor_hit = self.collide_floor(Vec3::new(0.0, ray.y, 0.0), terrain)?;

        let feet = self.position.floor().as_ivec3();
        let head_y = self.position.y.round() as i32 + 1;
        let above = terrain.global_block_at(feet.x, head_y, feet.z)?;
        self.under_liquid_block = if above.is_liquid() {
            above
        } else {
            BlockType::Empty
        };

        if self.flying {
            self.translate(Vec3::new(0.0, 0.0, displacement.z));
            self.translate(Vec3::new(displacement.x, 0.0, 0.0));
            self.translate(Vec3::new(0.0, displacement.y, 0.0));
            self.on_floor = floor_hit.is_some();
            return Ok(());
        }

        let below = terrain.global_block_at(feet.x, feet.y - 1, feet.z)?;
        let in_front = terrain.global_block_at(feet.x, feet.y, feet.z + 1)?;
        let behind = terrain.global_block_at(feet.x, feet.y, feet.z - 1)?;
        let to_right = terrain.global_block_at(feet.x + 1, feet.y, feet.z)?;
        let to_left = terrain.global_block_at(feet.x - 1, feet.y, feet.z)?;

        // Liquids never block: a blocked axis still moves when the cell it
        // pushes into is water or lava.
        let hit_z = self.collide_axis_z(Vec3::new(0.0, 0.0, ray.z), terrain)?;
        if hit_z.is_none()
            || (displacement.z > 0.0 && in_front.is_liquid())
            || (displacement.z <= 0.0 && behind.is_liquid())
        {
            self.translate(Vec3::new(0.0, 0.0, displacement.z));
        }

        let hit_x = self.collide_axis_x(Vec3::new(ray.x, 0.0, 0.0), terrain)?;
        if hit_x.is_none()
            || (displacement.x > 0.0 && to_right.is_liquid())
            || (displacement.x <= 0.0 && to_left.is_liquid())
        {
            self.translate(Vec3::new(displacement.x, 0.0, 0.0));
        }

        // Rising checks the head, falling checks the floor probe.
        let hit_y = if ray.y > 0.0 {
            self.collide_up(Vec3::new(0.0, ray.y, 0.0), terrain)?
        } else {
            floor_hit
        };
        if below.is_liquid() || hit_y.is_none() {
            self.translate(Vec3::new(0.0, displacement.y, 0.0));
        }

        if let Some(hit) = floor_hit {
            if !below.is_liquid() {
                self.on_top_of = terrain.global_block_at(hit.cell.x, hit.cell.y, hit.cell.z)?;
            }
        }
        self.on_floor = floor_hit.is_some();
        Ok(())
    }

    fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.camera.translate(delta);
    }

    /// Probe a set of ray origins; a liquid hit never blocks and wins over
    /// later probes, mirroring the per-probe early-out of the axis sweeps.
    fn probe(&self, origins: &[Vec3], ray: Vec3, terrain: &Terrain) -> Result<Option<GridHit>> {
        for &origin in origins {
            if let Some(hit) = grid_march(Ray::new(origin, ray), terrain)? {
                let block = terrain.global_block_at(hit.cell.x, hit.cell.y, hit.cell.z)?;
                if block.is_liquid() {
                    return Ok(None);
                }
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    /// Z-axis sweep from the corners on the leading Z face.
    fn collide_axis_z(&self, ray: Vec3, terrain: &Terrain) -> Result<Option<GridHit>> {
        let mut origins = Vec::with_capacity(6);
        for height in [RING_BOTTOM, RING_MID, RING_TOP] {
            for corner in ring(height) {
                if corner.z > 0.0 {
                    origins.push(self.position + corner + Vec3::new(0.0, 0.0, PROBE_NUDGE));
                }
            }
        }
        self.probe(&origins, ray, terrain)
    }

    /// X-axis sweep from the corners on the leading X face.
    fn collide_axis_x(&self, ray: Vec3, terrain: &Terrain) -> Result<Option<GridHit>> {
        let mut origins = Vec::with_capacity(6);
        for height in [RING_BOTTOM, RING_MID, RING_TOP] {
            for corner in ring(height) {
                if corner.x > 0.0 {
                    origins.push(self.position + corner + Vec3::new(PROBE_NUDGE, 0.0, 0.0));
                }
            }
        }
        self.probe(&origins, ray, terrain)
    }

    /// Upward sweep; probes start at head height.
    fn collide_up(&self, ray: Vec3, terrain: &Terrain) -> Result<Option<GridHit>> {
        let origins: Vec<Vec3> = ring(RING_TOP)
            .iter()
            .map(|corner| self.position + *corner)
            .collect();
        self.probe(&origins, ray, terrain)
    }

    /// Floor sweep from just above the feet. Liquid does count as floor
    /// contact here; the caller decides what standing in water means.
    fn collide_floor(&self, ray: Vec3, terrain: &Terrain) -> Result<Option<GridHit>> {
        for corner in ring(RING_BOTTOM) {
            let origin = self.position + corner + Vec3::Y;
            if let Some(hit) = grid_march(Ray::new(origin, ray), terrain)? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    /// Whether any body corner sits inside water or lava.
    pub fn in_liquid(&self, terrain: &Terrain) -> Result<bool> {
        for height in [RING_BOTTOM, RING_MID, RING_TOP] {
            for corner in ring(height) {
                let cell = (self.position + corner).floor().as_ivec3();
                if terrain.global_block_at(cell.x, cell.y, cell.z)?.is_liquid() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Remove the block under the crosshair. Bedrock is indestructible.
    pub fn delete_block(&self, terrain: &Terrain) -> Result<Option<IVec3>> {
        let ray = Ray::new(self.camera.position, self.camera.forward() * REACH);
        let Some(hit) = grid_march(ray, terrain)? else {
            return Ok(None);
        };
        if terrain.global_block_at(hit.cell.x, hit.cell.y, hit.cell.z)? == BlockType::Bedrock {
            return Ok(None);
        }
        terrain.set_global_block_at(hit.cell.x, hit.cell.y, hit.cell.z, BlockType::Empty)?;
        Ok(Some(hit.cell))
    }

    /// Place snow in the cell against the face under the crosshair.
    pub fn place_block(&self, terrain: &Terrain) -> Result<Option<IVec3>> {
        let ray = Ray::new(self.camera.position, self.camera.forward() * REACH);
        let Some(hit) = grid_march(ray, terrain)? else {
            return Ok(None);
        };
        let target = hit.cell + hit.face.offset();
        terrain.set_global_block_at(target.x, target.y, target.z, BlockType::Snow)?;
        Ok(Some(target))
    }
}
