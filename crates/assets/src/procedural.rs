//! Procedural generators: the preferred acquisition tier.
//!
//! A generator owns one asset kind and builds full-detail geometry from the
//! spec alone, so output is deterministic and needs no I/O. Built-in
//! generators cover buildings and terrain; callers register their own for
//! other kinds.

use std::sync::Arc;

use crate::model::{AssetKind, AssetPayload, AssetSpec, DetailClass};
use crate::primitive::box_part;

/// Accuracy recorded for procedurally generated assets.
pub const PROCEDURAL_ACCURACY: f64 = 0.85;

/// Deterministic per-kind asset synthesis.
///
/// `generate` returns `None` when the spec is outside the generator's
/// domain (wrong kind, unusable dimensions); the chain then falls through
/// to the next tier.
pub trait ProceduralGenerator: Send + Sync {
    fn kind(&self) -> AssetKind;

    fn accuracy(&self) -> f64 {
        PROCEDURAL_ACCURACY
    }

    fn generate(&self, spec: &AssetSpec) -> Option<AssetPayload>;
}

/// Extruded box body plus per-floor window strips.
#[derive(Debug, Default)]
pub struct BuildingGenerator;

impl ProceduralGenerator for BuildingGenerator {
    fn kind(&self) -> AssetKind {
        AssetKind::Building
    }

    fn generate(&self, spec: &AssetSpec) -> Option<AssetPayload> {
        let AssetSpec::Building {
            width_m,
            depth_m,
            height_m,
            floors,
            ..
        } = *spec
        else {
            return None;
        };
        if !(dimension_ok(width_m) && dimension_ok(depth_m) && dimension_ok(height_m)) {
            return None;
        }

        let mut parts = vec![box_part(
            "body",
            DetailClass::Structural,
            width_m,
            depth_m,
            height_m,
            [0.0; 3],
        )];

        // One slab of windows per floor, proud of the south face.
        let floors = floors.max(1).min(200);
        let floor_height = height_m / floors as f64;
        for floor in 0..floors {
            let sill = floor as f64 * floor_height + floor_height * 0.3;
            parts.push(box_part(
                format!("windows_{floor}"),
                DetailClass::Decorative,
                width_m * 0.9,
                0.1,
                floor_height * 0.4,
                [0.0, -(depth_m / 2.0 + 0.05), sill],
            ));
        }

        Some(AssetPayload::Mesh { parts })
    }
}

/// Seeded value-noise heightfield.
#[derive(Debug, Default)]
pub struct TerrainGenerator;

impl ProceduralGenerator for TerrainGenerator {
    fn kind(&self) -> AssetKind {
        AssetKind::Terrain
    }

    fn accuracy(&self) -> f64 {
        0.8
    }

    fn generate(&self, spec: &AssetSpec) -> Option<AssetPayload> {
        let AssetSpec::Terrain {
            size_m,
            resolution,
            roughness,
            seed,
        } = *spec
        else {
            return None;
        };
        if !dimension_ok(size_m) || resolution < 2 || !roughness.is_finite() {
            return None;
        }

        let resolution = resolution.min(256);
        let amplitude = (size_m * 0.05 * roughness.clamp(0.0, 1.0)) as f32;

        let mut heights = Vec::with_capacity((resolution * resolution) as usize);
        for j in 0..resolution {
            for i in 0..resolution {
                heights.push(amplitude * value_noise(i, j, seed));
            }
        }

        Some(AssetPayload::TerrainGrid {
            resolution,
            size_m,
            heights,
        })
    }
}

fn dimension_ok(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

const LATTICE_CELL: u32 = 4;

/// Bilinear interpolation of hashed lattice values, two octaves. Output is
/// in [-1, 1] and fully determined by (i, j, seed).
fn value_noise(i: u32, j: u32, seed: u64) -> f32 {
    octave(i, j, seed, LATTICE_CELL) + 0.35 * octave(i, j, seed ^ 0x9E37_79B9, LATTICE_CELL / 2)
}

fn octave(i: u32, j: u32, seed: u64, cell: u32) -> f32 {
    let cell = cell.max(1);
    let (cx, fx) = (i / cell, (i % cell) as f32 / cell as f32);
    let (cy, fy) = (j / cell, (j % cell) as f32 / cell as f32);

    let v00 = lattice(cx, cy, seed);
    let v10 = lattice(cx + 1, cy, seed);
    let v01 = lattice(cx, cy + 1, seed);
    let v11 = lattice(cx + 1, cy + 1, seed);

    let sx = smoothstep(fx);
    let sy = smoothstep(fy);
    let a = v00 + (v10 - v00) * sx;
    let b = v01 + (v11 - v01) * sx;
    a + (b - a) * sy
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Hash of a lattice point into [-1, 1].
fn lattice(x: u32, y: u32, seed: u64) -> f32 {
    let mut h = seed
        ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    (h >> 11) as f32 / (1u64 << 53) as f32 * 2.0 - 1.0
}

/// The generators registered by default: buildings and terrain.
pub fn default_generators() -> Vec<Arc<dyn ProceduralGenerator>> {
    vec![Arc::new(BuildingGenerator), Arc::new(TerrainGenerator)]
}

#[cfg(test)]
mod tests {
    use super::{BuildingGenerator, ProceduralGenerator, TerrainGenerator, default_generators};
    use crate::model::{AssetKind, AssetPayload, AssetSpec, DetailClass};

    fn building() -> AssetSpec {
        AssetSpec::Building {
            width_m: 20.0,
            depth_m: 15.0,
            height_m: 100.0,
            floors: 25,
            style: None,
        }
    }

    fn terrain(seed: u64) -> AssetSpec {
        AssetSpec::Terrain {
            size_m: 500.0,
            resolution: 64,
            roughness: 0.6,
            seed,
        }
    }

    #[test]
    fn building_has_structure_and_decoration() {
        let AssetPayload::Mesh { parts } =
            BuildingGenerator.generate(&building()).expect("payload")
        else {
            panic!("expected mesh");
        };

        // One structural body plus one decorative strip per floor.
        assert_eq!(parts.len(), 26);
        assert_eq!(parts[0].detail, DetailClass::Structural);
        assert!(parts[1..].iter().all(|p| p.detail == DetailClass::Decorative));
    }

    #[test]
    fn generators_reject_other_kinds() {
        assert!(BuildingGenerator.generate(&terrain(1)).is_none());
        assert!(TerrainGenerator.generate(&building()).is_none());
    }

    #[test]
    fn terrain_is_deterministic_per_seed() {
        let a = TerrainGenerator.generate(&terrain(42)).expect("payload");
        let b = TerrainGenerator.generate(&terrain(42)).expect("payload");
        assert_eq!(a, b);

        let c = TerrainGenerator.generate(&terrain(43)).expect("payload");
        assert_ne!(a, c);
    }

    #[test]
    fn terrain_amplitude_scales_with_roughness() {
        let flat = AssetSpec::Terrain {
            size_m: 500.0,
            resolution: 32,
            roughness: 0.0,
            seed: 7,
        };
        let AssetPayload::TerrainGrid { heights, .. } =
            TerrainGenerator.generate(&flat).expect("payload")
        else {
            panic!("expected grid");
        };
        assert!(heights.iter().all(|h| *h == 0.0));
    }

    #[test]
    fn defaults_cover_buildings_and_terrain() {
        let kinds: Vec<AssetKind> = default_generators().iter().map(|g| g.kind()).collect();
        assert_eq!(kinds, vec![AssetKind::Building, AssetKind::Terrain]);
    }
}
