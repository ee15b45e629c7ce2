//! Persistence: world metadata plus zone files holding modified-block
//! diffs against the generator.
//!
//! Layout under the world folder:
//!
//! ```text
//! <world>/world.json
//! <world>/Region_<rx>_<rz>/Zone_<zx>_<zz>.dat
//! ```
//!
//! A zone file is a 4-byte magic and 1-byte version, then chunk records
//! until EOF: local chunk x, local chunk z, a little-endian u16 count,
//! and `count` three-byte modifications (packed xz, y, block type).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use terravox_core::constants::ZONE_CHUNKS;
use terravox_core::{BlockType, Error, Result, ZonePos};
use terravox_worldgen::{Generator, River};
use tracing::warn;

use crate::chunk::Chunk;

const ZONE_MAGIC: [u8; 4] = *b"TVZ0";
const ZONE_VERSION: u8 = 1;

/// World metadata stored alongside the region directories.
///
/// Rivers are parameters of the generated baseline, so they are part of
/// the metadata; reconstructing them on load keeps zone diffs valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMeta {
    pub seed: u32,
    #[serde(default)]
    pub rivers: Vec<RiverMeta>,
}

/// Construction parameters of one river (all rivers share the canonical
/// rule set).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiverMeta {
    pub iterations: u32,
    pub angle_degrees: f64,
    pub step: f64,
    pub start_x: f64,
    pub start_z: f64,
}

impl RiverMeta {
    pub fn of(river: &River) -> Self {
        let (start_x, start_z) = river.start();
        Self {
            iterations: river.iterations(),
            angle_degrees: river.angle_degrees(),
            step: river.step(),
            start_x,
            start_z,
        }
    }

    pub fn build(&self) -> River {
        River::standard(
            self.iterations,
            self.angle_degrees,
            self.step,
            (self.start_x, self.start_z),
        )
    }
}

pub fn write_world_meta(world_dir: &Path, meta: &WorldMeta) -> Result<()> {
    fs::create_dir_all(world_dir)?;
    let json =
        serde_json::to_string_pretty(meta).map_err(|err| Error::Metadata(err.to_string()))?;
    fs::write(world_dir.join("world.json"), json)?;
    Ok(())
}

pub fn read_world_meta(world_dir: &Path) -> Result<WorldMeta> {
    let raw = fs::read_to_string(world_dir.join("world.json"))?;
    serde_json::from_str(&raw).map_err(|err| Error::Metadata(err.to_string()))
}

/// Path of a zone's save file inside its region directory.
fn zone_file_path(world_dir: &Path, zone: ZonePos) -> PathBuf {
    let (rx, rz) = zone.region();
    world_dir
        .join(format!("Region_{rx}_{rz}"))
        .join(format!("Zone_{}_{}.dat", zone.x, zone.z))
}

/// Whether a save file exists for the zone. False on empty folders.
pub fn zone_file_exists(world_dir: &Path, zone: ZonePos) -> bool {
    zone_file_path(world_dir, zone).is_file()
}

/// Write one zone: a record per chunk that has block data, containing
/// only the blocks differing from the generator baseline.
pub fn save_zone(
    world_dir: &Path,
    zone: ZonePos,
    chunks: &[Arc<Chunk>],
    generator: &Generator,
    rivers: &[River],
) -> Result<()> {
    let path = zone_file_path(world_dir, zone);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(&path)?);
    out.write_all(&ZONE_MAGIC)?;
    out.write_all(&[ZONE_VERSION])?;

    for chunk in chunks {
        if !chunk.has_block_data() {
            continue;
        }
        let pos = chunk.pos();
        let local_x = pos.x.div_euclid(16).rem_euclid(ZONE_CHUNKS) as u8;
        let local_z = pos.z.div_euclid(16).rem_euclid(ZONE_CHUNKS) as u8;

        let modified = chunk.modified_blocks(generator, rivers);
        if modified.len() > usize::from(u16::MAX) {
            warn!(
                chunk_x = pos.x,
                chunk_z = pos.z,
                count = modified.len(),
                "modified blocks exceed record capacity; truncating"
            );
        }
        let count = modified.len().min(usize::from(u16::MAX));

        out.write_all(&[local_x, local_z])?;
        out.write_all(&(count as u16).to_le_bytes())?;
        for &(xz, y, block) in &modified[..count] {
            out.write_all(&[xz, y, block])?;
        }
    }
    out.flush()?;
    Ok(())
}

enum ReadOutcome {
    Full,
    Eof,
    Partial,
}

fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> Result<ReadOutcome> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(if filled == 0 {
                ReadOutcome::Eof
            } else {
                ReadOutcome::Partial
            });
        }
        filled += n;
    }
    Ok(ReadOutcome::Full)
}

/// Load a zone file into the given chunks (the zone's 4 x 4 grid in
/// [`ZonePos::chunks`] order): regenerate each recorded chunk, then replay
/// its modifications.
///
/// A truncated file stops parsing but keeps every chunk already loaded.
/// Chunks the file never mentions are generated fresh so the zone cannot
/// end up with permanently missing block data.
pub fn load_zone(
    world_dir: &Path,
    zone: ZonePos,
    chunks: &[Arc<Chunk>],
    generator: &Generator,
    rivers: &[River],
) -> Result<()> {
    let path = zone_file_path(world_dir, zone);
    let mut input = BufReader::new(File::open(&path)?);

    let mut header = [0u8; 5];
    input.read_exact(&mut header)?;
    if header[..4] != ZONE_MAGIC {
        return Err(Error::Corrupt(format!("bad magic in {}", path.display())));
    }
    if header[4] != ZONE_VERSION {
        return Err(Error::Corrupt(format!(
            "unsupported zone version {} in {}",
            header[4],
            path.display()
        )));
    }

    'records: loop {
        let mut record_header = [0u8; 4];
        match read_exact_or_eof(&mut input, &mut record_header)? {
            ReadOutcome::Eof => break,
            ReadOutcome::Partial => {
                warn!("unexpected end of file in {}", path.display());
                break;
            }
            ReadOutcome::Full => {}
        }
        let [local_x, local_z, count_lo, count_hi] = record_header;
        let count = u16::from_le_bytes([count_lo, count_hi]);

        if local_x >= ZONE_CHUNKS as u8 || local_z >= ZONE_CHUNKS as u8 {
            return Err(Error::Corrupt(format!(
                "chunk record ({local_x}, {local_z}) outside zone in {}",
                path.display()
            )));
        }
        let Some(chunk) = chunks.get(usize::from(local_x) * ZONE_CHUNKS as usize + usize::from(local_z))
        else {
            return Err(Error::Corrupt(format!(
                "zone chunk list shorter than record index in {}",
                path.display()
            )));
        };

        chunk.reset_for_load();
        chunk.generate(generator, rivers);

        let mut record = [0u8; 3];
        for _ in 0..count {
            match read_exact_or_eof(&mut input, &mut record)? {
                ReadOutcome::Full => {}
                ReadOutcome::Eof | ReadOutcome::Partial => {
                    warn!("unexpected end of file in {}", path.display());
                    chunk.set_has_block_data(true);
                    chunk.set_needs_update(true);
                    break 'records;
                }
            }
            let [xz, y, raw] = record;
            let x = usize::from(xz >> 4) & 0x0f;
            let z = usize::from(xz & 0x0f);
            match BlockType::from_raw(raw) {
                Some(block) => chunk.set_local_block_at(x, usize::from(y), z, block),
                None => warn!(raw, "unknown block type in {}", path.display()),
            }
        }

        chunk.set_has_block_data(true);
        chunk.set_needs_update(true);
    }

    // Chunks without a record still need their baseline terrain.
    for chunk in chunks {
        if !chunk.has_block_data() {
            chunk.generate(generator, rivers);
            chunk.set_has_block_data(true);
            chunk.set_needs_update(true);
        }
    }

    Ok(())
}
