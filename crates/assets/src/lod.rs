//! Detail reduction.
//!
//! Reduction derives a new asset from a cached one rather than rebuilding
//! from the spec: meshes lose decorative parts at low levels, terrain grids
//! are downsampled, and accuracy is scaled down so a reduced asset never
//! claims more fidelity than its source.

use crate::model::{Asset, AssetOrigin, AssetPayload, DetailClass};

pub const MIN_DETAIL_LEVEL: u8 = 1;
pub const MAX_DETAIL_LEVEL: u8 = 5;

/// Cache id of the level-`level` derivative of `source_id`.
pub fn derived_id(source_id: &str, level: u8) -> String {
    format!("{source_id}_LOD{level}")
}

fn is_derived(id: &str) -> bool {
    id.rsplit_once("_LOD")
        .is_some_and(|(_, lvl)| lvl.parse::<u8>().is_ok())
}

fn accuracy_factor(level: u8) -> f64 {
    match level {
        1 => 0.2,
        2 => 0.35,
        3 => 0.55,
        _ => 0.8,
    }
}

/// Produces the reduced variant of `source` at `target_level` (clamped to
/// 1..=5). Level 5 and already-reduced sources come back unchanged; the
/// result's accuracy is always <= the source's.
pub fn reduce(source: &Asset, target_level: u8) -> Asset {
    let level = target_level.clamp(MIN_DETAIL_LEVEL, MAX_DETAIL_LEVEL);
    if level == MAX_DETAIL_LEVEL || is_derived(&source.id) {
        return source.clone();
    }

    let payload = match &source.payload {
        AssetPayload::Mesh { parts } => {
            let kept: Vec<_> = if level <= 3 {
                parts
                    .iter()
                    .filter(|p| p.detail == DetailClass::Structural)
                    .cloned()
                    .collect()
            } else {
                parts.clone()
            };
            AssetPayload::Mesh { parts: kept }
        }
        AssetPayload::TerrainGrid {
            resolution,
            size_m,
            heights,
        } => downsample_grid(*resolution, *size_m, heights, level),
        AssetPayload::ModelRef { uri } => AssetPayload::ModelRef { uri: uri.clone() },
    };

    let mut metadata = source.metadata.clone();
    metadata.origin = AssetOrigin::Cached;
    metadata.accuracy = source.metadata.accuracy * accuracy_factor(level);

    Asset {
        id: derived_id(&source.id, level),
        kind: source.kind,
        payload,
        animations: source.animations.clone(),
        metadata,
    }
}

/// Stride-sampled downsample: level 2 halves the resolution, level 1
/// quarters it, never below 2x2.
fn downsample_grid(resolution: u32, size_m: f64, heights: &[f32], level: u8) -> AssetPayload {
    let divisor = match level {
        1 => 4,
        2 => 2,
        _ => 1,
    };
    let target = (resolution / divisor).max(2).min(resolution);
    if target == resolution {
        return AssetPayload::TerrainGrid {
            resolution,
            size_m,
            heights: heights.to_vec(),
        };
    }

    let mut out = Vec::with_capacity((target * target) as usize);
    for j in 0..target {
        for i in 0..target {
            let si = i * (resolution - 1) / (target - 1);
            let sj = j * (resolution - 1) / (target - 1);
            out.push(heights[(sj * resolution + si) as usize]);
        }
    }
    AssetPayload::TerrainGrid {
        resolution: target,
        size_m,
        heights: out,
    }
}

#[cfg(test)]
mod tests {
    use super::{derived_id, reduce};
    use crate::model::{
        Asset, AssetKind, AssetMetadata, AssetOrigin, AssetPayload, DetailClass, Dimensions,
        MeshPart,
    };

    fn part(name: &str, detail: DetailClass) -> MeshPart {
        MeshPart {
            name: name.to_string(),
            detail,
            positions: vec![0.0; 9],
            indices: vec![0, 1, 2],
        }
    }

    fn mesh_asset() -> Asset {
        Asset {
            id: "building-abc".to_string(),
            kind: AssetKind::Building,
            payload: AssetPayload::Mesh {
                parts: vec![
                    part("body", DetailClass::Structural),
                    part("windows_0", DetailClass::Decorative),
                ],
            },
            animations: vec![],
            metadata: AssetMetadata {
                name: "building".to_string(),
                dimensions: Dimensions::new(20.0, 15.0, 100.0),
                origin: AssetOrigin::Procedural,
                accuracy: 0.85,
                license: None,
                attribution: None,
            },
        }
    }

    fn terrain_asset(resolution: u32) -> Asset {
        Asset {
            id: "terrain-xyz".to_string(),
            kind: AssetKind::Terrain,
            payload: AssetPayload::TerrainGrid {
                resolution,
                size_m: 500.0,
                heights: (0..resolution * resolution).map(|i| i as f32).collect(),
            },
            animations: vec![],
            metadata: AssetMetadata {
                name: "terrain".to_string(),
                dimensions: Dimensions::new(500.0, 500.0, 0.0),
                origin: AssetOrigin::Procedural,
                accuracy: 0.8,
                license: None,
                attribution: None,
            },
        }
    }

    #[test]
    fn low_levels_strip_decoration() {
        let reduced = reduce(&mesh_asset(), 2);
        let AssetPayload::Mesh { parts } = &reduced.payload else {
            panic!("expected mesh");
        };
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "body");
        assert_eq!(reduced.id, "building-abc_LOD2");
        assert_eq!(reduced.metadata.origin, AssetOrigin::Cached);
    }

    #[test]
    fn accuracy_never_increases() {
        for level in 1..=5 {
            let reduced = reduce(&mesh_asset(), level);
            assert!(reduced.metadata.accuracy <= 0.85, "level {level}");
        }
    }

    #[test]
    fn reduction_is_idempotent_at_the_same_level() {
        let once = reduce(&mesh_asset(), 3);
        let twice = reduce(&once, 3);
        assert_eq!(once, twice);
    }

    #[test]
    fn full_detail_level_is_identity() {
        let source = mesh_asset();
        let reduced = reduce(&source, 5);
        assert_eq!(reduced, source);
    }

    #[test]
    fn terrain_downsamples_by_level() {
        let reduced = reduce(&terrain_asset(64), 2);
        let AssetPayload::TerrainGrid {
            resolution,
            heights,
            ..
        } = &reduced.payload
        else {
            panic!("expected grid");
        };
        assert_eq!(*resolution, 32);
        assert_eq!(heights.len(), 1024);
        // Corners survive stride sampling.
        assert_eq!(heights[0], 0.0);
        assert_eq!(*heights.last().unwrap(), (64.0 * 64.0) - 1.0);
    }

    #[test]
    fn tiny_grids_never_drop_below_two() {
        let reduced = reduce(&terrain_asset(4), 1);
        let AssetPayload::TerrainGrid { resolution, .. } = &reduced.payload else {
            panic!("expected grid");
        };
        assert_eq!(*resolution, 2);
    }

    #[test]
    fn derived_id_format() {
        assert_eq!(derived_id("building-abc", 3), "building-abc_LOD3");
    }
}
