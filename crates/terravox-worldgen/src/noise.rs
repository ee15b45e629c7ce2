//! Seeded gradient noise, biome classification, and the terrain
//! heightfield.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::WorldSeed;

/// Noise magnitude below which a column counts as a biome transition.
const TRANSITION_THRESHOLD: f32 = 0.01;
/// Base elevation both biomes build on.
const BIOME_FLOOR: f32 = 145.0;
/// Frequency of the biome-selection noise.
const BIOME_FREQUENCY: f32 = 0.005;

/// Biome classes of the overworld.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    Grassland,
    Mountain,
}

/// Permutation-based gradient noise keyed by a world seed.
///
/// The permutation table is shuffled once at construction, so for a fixed
/// seed every method is a pure function of its coordinates.
pub struct BiomeNoise {
    seed: WorldSeed,
    perm: [u8; 512],
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + t * (b - a)
}

#[inline]
fn grad2(hash: u8, x: f32, y: f32) -> f32 {
    let h = hash & 3;
    let u = if h & 1 != 0 { x } else { -x };
    let v = if h & 2 != 0 { y } else { -y };
    u + v
}

#[inline]
fn grad3(hash: u8, x: f32, y: f32, z: f32) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    let u = if h & 1 != 0 { -u } else { u };
    let v = if h & 2 != 0 { -v } else { v };
    u + v
}

/// Integer-lattice hash noise in [-1, 1].
fn basic(x: i32, y: i32) -> f32 {
    let n = x.wrapping_add(y.wrapping_mul(57));
    let n = (n << 13) ^ n;
    let m = n
        .wrapping_mul(n.wrapping_mul(n).wrapping_mul(15731).wrapping_add(789_221))
        .wrapping_add(1_376_312_589)
        & 0x7fff_ffff;
    1.0 - m as f32 / 1_073_741_824.0
}

/// Bilinear smoothing of [`basic`] over the cell containing (x, y).
fn smooth(x: f32, y: f32) -> f32 {
    let ix = x as i32;
    let iy = y as i32;
    let fx = x - ix as f32;
    let fy = y - iy as f32;

    let v1 = basic(ix, iy);
    let v2 = basic(ix + 1, iy);
    let v3 = basic(ix, iy + 1);
    let v4 = basic(ix + 1, iy + 1);

    lerp(fy, lerp(fx, v1, v2), lerp(fx, v3, v4))
}

impl BiomeNoise {
    /// Build the noise source for a seed, shuffling the permutation table
    /// with a portable RNG so the same seed reproduces the same world on
    /// every platform.
    pub fn new(seed: WorldSeed) -> Self {
        let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
        table.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&table);
        perm[256..].copy_from_slice(&table);
        Self { seed, perm }
    }

    pub fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Classic 2D gradient noise in [-1, 1].
    pub fn perlin(&self, x: f32, y: f32) -> f32 {
        let xi = (x.floor() as i32 & 255) as usize;
        let yi = (y.floor() as i32 & 255) as usize;
        let x = x - x.floor();
        let y = y - y.floor();

        let u = fade(x);
        let v = fade(y);

        let p = &self.perm;
        let a = p[xi] as usize + yi;
        let b = p[xi + 1] as usize + yi;

        lerp(
            v,
            lerp(u, grad2(p[a], x, y), grad2(p[b], x - 1.0, y)),
            lerp(u, grad2(p[a + 1], x, y - 1.0), grad2(p[b + 1], x - 1.0, y - 1.0)),
        )
    }

    /// Classic 3D gradient noise in [-1, 1]; drives the cave carver.
    pub fn perlin3d(&self, x: f32, y: f32, z: f32) -> f32 {
        let xi = (x.floor() as i32 & 255) as usize;
        let yi = (y.floor() as i32 & 255) as usize;
        let zi = (z.floor() as i32 & 255) as usize;
        let x = x - x.floor();
        let y = y - y.floor();
        let z = z - z.floor();

        let u = fade(x);
        let v = fade(y);
        let w = fade(z);

        let p = &self.perm;
        let a = p[xi] as usize + yi;
        let aa = p[a] as usize + zi;
        let ab = p[a + 1] as usize + zi;
        let b = p[xi + 1] as usize + yi;
        let ba = p[b] as usize + zi;
        let bb = p[b + 1] as usize + zi;

        lerp(
            w,
            lerp(
                v,
                lerp(u, grad3(p[aa], x, y, z), grad3(p[ba], x - 1.0, y, z)),
                lerp(u, grad3(p[ab], x, y - 1.0, z), grad3(p[bb], x - 1.0, y - 1.0, z)),
            ),
            lerp(
                v,
                lerp(
                    u,
                    grad3(p[aa + 1], x, y, z - 1.0),
                    grad3(p[ba + 1], x - 1.0, y, z - 1.0),
                ),
                lerp(
                    u,
                    grad3(p[ab + 1], x, y - 1.0, z - 1.0),
                    grad3(p[bb + 1], x - 1.0, y - 1.0, z - 1.0),
                ),
            ),
        )
    }

    /// Octave sum of [`BiomeNoise::perlin`], normalized back to [-1, 1].
    pub fn fractal(&self, x: f32, y: f32, octaves: u32, persistence: f32) -> f32 {
        let mut total = 0.0;
        let mut max_amplitude = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;

        for _ in 0..octaves {
            total += self.perlin(x * frequency, y * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        total / max_amplitude
    }

    /// Deterministic per-column hash in [0, 1); breaks biome ties inside
    /// the transition band.
    fn pseudo_random(&self, x: i32, z: i32) -> f32 {
        let n = (x as u32)
            .wrapping_mul(123_456_789)
            .wrapping_add((z as u32).wrapping_mul(987_654_321))
            .wrapping_add(self.seed.wrapping_mul(144_630_960));
        let n = (n ^ (n >> 13)).wrapping_mul(1_274_126_177);
        let n = n ^ (n >> 16);
        (n % 1000) as f32 / 1000.0
    }

    /// Whether the column sits in the band where the two biomes blend.
    pub fn is_transition(&self, x: i32, z: i32) -> bool {
        let value = self
            .perlin(x as f32 * BIOME_FREQUENCY, z as f32 * BIOME_FREQUENCY)
            .abs();
        value < TRANSITION_THRESHOLD
    }

    /// Biome of the column at (x, z).
    pub fn biome_at(&self, x: i32, z: i32) -> Biome {
        let value = self.perlin(x as f32 * BIOME_FREQUENCY, z as f32 * BIOME_FREQUENCY);
        if value > TRANSITION_THRESHOLD {
            Biome::Mountain
        } else if value < -TRANSITION_THRESHOLD {
            Biome::Grassland
        } else if self.pseudo_random(x, z) > 0.5 {
            Biome::Mountain
        } else {
            Biome::Grassland
        }
    }

    fn grassland_height(&self, x: i32, z: i32) -> f32 {
        BIOME_FLOOR + 30.0 * self.fractal(x as f32 * 0.01, z as f32 * 0.01, 4, 0.5)
    }

    fn mountain_height(&self, x: i32, z: i32) -> f32 {
        BIOME_FLOOR + 115.0 * self.fractal(x as f32 * 0.02, z as f32 * 0.02, 4, 0.5)
    }

    /// Surface height of the column at (x, z), blended across biome
    /// transitions and clamped to the world's vertical extent.
    pub fn height_at(&self, x: i32, z: i32) -> u8 {
        let grassland = self.grassland_height(x, z);
        let mountain = self.mountain_height(x, z);

        let height = if self.is_transition(x, z) {
            let t = smooth(x as f32 * BIOME_FREQUENCY, z as f32 * BIOME_FREQUENCY).abs();
            lerp(t, grassland, mountain)
        } else if self.biome_at(x, z) == Biome::Mountain {
            mountain
        } else {
            grassland
        };

        height.round().clamp(0.0, 255.0) as u8
    }
}
