//! Primitive-geometry synthesis: the last non-trivial acquisition tier.
//!
//! Produces box/slab/grid approximations that still respect the requested
//! dimensions, plus the universal fallback that can never fail.

use crate::model::{AssetPayload, AssetSpec, DetailClass, MeshPart};

/// Accuracy recorded for primitive approximations.
pub const PRIMITIVE_ACCURACY: f64 = 0.4;
/// Accuracy recorded for the universal fallback.
pub const FALLBACK_ACCURACY: f64 = 0.1;

/// Axis-aligned box: `width` along x, `depth` along y, `height` along z,
/// base at z = offset_z, centered in x/y around (offset_x, offset_y).
pub fn box_part(
    name: impl Into<String>,
    detail: DetailClass,
    width: f64,
    depth: f64,
    height: f64,
    offset: [f64; 3],
) -> MeshPart {
    let hw = (width / 2.0) as f32;
    let hd = (depth / 2.0) as f32;
    let h = height as f32;
    let [ox, oy, oz] = [offset[0] as f32, offset[1] as f32, offset[2] as f32];

    let positions = vec![
        ox - hw, oy - hd, oz,     // 0
        ox + hw, oy - hd, oz,     // 1
        ox + hw, oy + hd, oz,     // 2
        ox - hw, oy + hd, oz,     // 3
        ox - hw, oy - hd, oz + h, // 4
        ox + hw, oy - hd, oz + h, // 5
        ox + hw, oy + hd, oz + h, // 6
        ox - hw, oy + hd, oz + h, // 7
    ];
    let indices = vec![
        0, 2, 1, 0, 3, 2, // bottom
        4, 5, 6, 4, 6, 7, // top
        0, 1, 5, 0, 5, 4, // south
        1, 2, 6, 1, 6, 5, // east
        2, 3, 7, 2, 7, 6, // north
        3, 0, 4, 3, 4, 7, // west
    ];

    MeshPart {
        name: name.into(),
        detail,
        positions,
        indices,
    }
}

fn valid(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Box/slab/grid approximation of a spec. `None` when the requested
/// dimensions cannot bound a shape, which hands over to the fallback tier.
pub fn synthesize_primitive(spec: &AssetSpec) -> Option<AssetPayload> {
    match *spec {
        AssetSpec::Building {
            width_m,
            depth_m,
            height_m,
            ..
        } => {
            if !(valid(width_m) && valid(depth_m) && valid(height_m)) {
                return None;
            }
            Some(AssetPayload::Mesh {
                parts: vec![box_part(
                    "body",
                    DetailClass::Structural,
                    width_m,
                    depth_m,
                    height_m,
                    [0.0; 3],
                )],
            })
        }
        AssetSpec::Vehicle {
            length_m,
            width_m,
            height_m,
            ..
        } => {
            if !(valid(length_m) && valid(width_m) && valid(height_m)) {
                return None;
            }
            Some(AssetPayload::Mesh {
                parts: vec![box_part(
                    "hull",
                    DetailClass::Structural,
                    width_m,
                    length_m,
                    height_m,
                    [0.0; 3],
                )],
            })
        }
        AssetSpec::Aircraft {
            wingspan_m,
            length_m,
            height_m,
            ..
        } => {
            if !(valid(wingspan_m) && valid(length_m) && valid(height_m)) {
                return None;
            }
            let fuselage_width = (wingspan_m * 0.12).max(1.0);
            Some(AssetPayload::Mesh {
                parts: vec![
                    box_part(
                        "fuselage",
                        DetailClass::Structural,
                        fuselage_width,
                        length_m,
                        height_m,
                        [0.0; 3],
                    ),
                    box_part(
                        "wings",
                        DetailClass::Structural,
                        wingspan_m,
                        length_m * 0.18,
                        height_m * 0.08,
                        [0.0, 0.0, height_m * 0.45],
                    ),
                ],
            })
        }
        AssetSpec::Terrain {
            size_m, resolution, ..
        } => {
            if !valid(size_m) || resolution < 2 {
                return None;
            }
            let resolution = resolution.min(256);
            Some(AssetPayload::TerrainGrid {
                resolution,
                size_m,
                heights: vec![0.0; (resolution * resolution) as usize],
            })
        }
        AssetSpec::Effect { radius_m, .. } => {
            if !valid(radius_m) {
                return None;
            }
            let r = radius_m as f32;
            Some(AssetPayload::Mesh {
                parts: vec![MeshPart {
                    name: "billboard".into(),
                    detail: DetailClass::Structural,
                    positions: vec![
                        -r, 0.0, 0.0, //
                        r, 0.0, 0.0, //
                        r, 0.0, 2.0 * r, //
                        -r, 0.0, 2.0 * r,
                    ],
                    indices: vec![0, 1, 2, 0, 2, 3],
                }],
            })
        }
    }
}

/// Unit box; the tier of last resort, total by construction.
pub fn fallback_payload() -> AssetPayload {
    AssetPayload::Mesh {
        parts: vec![box_part(
            "fallback",
            DetailClass::Structural,
            1.0,
            1.0,
            1.0,
            [0.0; 3],
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::{box_part, fallback_payload, synthesize_primitive};
    use crate::model::{AssetPayload, AssetSpec, DetailClass};

    #[test]
    fn box_part_respects_dimensions() {
        let part = box_part("b", DetailClass::Structural, 20.0, 10.0, 100.0, [0.0; 3]);
        assert_eq!(part.positions.len() / 3, 8);
        assert_eq!(part.indices.len() / 3, 12);

        let max_z = part
            .positions
            .chunks_exact(3)
            .map(|v| v[2])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_z, 100.0);
    }

    #[test]
    fn building_primitive_is_one_structural_box() {
        let spec = AssetSpec::Building {
            width_m: 20.0,
            depth_m: 15.0,
            height_m: 100.0,
            floors: 25,
            style: None,
        };
        let AssetPayload::Mesh { parts } = synthesize_primitive(&spec).expect("payload") else {
            panic!("expected mesh");
        };
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].detail, DetailClass::Structural);
    }

    #[test]
    fn invalid_dimensions_hand_over_to_fallback() {
        let spec = AssetSpec::Building {
            width_m: 0.0,
            depth_m: 15.0,
            height_m: 100.0,
            floors: 25,
            style: None,
        };
        assert!(synthesize_primitive(&spec).is_none());

        let AssetPayload::Mesh { parts } = fallback_payload() else {
            panic!("expected mesh");
        };
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn terrain_primitive_is_a_flat_grid() {
        let spec = AssetSpec::Terrain {
            size_m: 500.0,
            resolution: 32,
            roughness: 0.5,
            seed: 1,
        };
        let AssetPayload::TerrainGrid {
            resolution,
            heights,
            ..
        } = synthesize_primitive(&spec).expect("payload")
        else {
            panic!("expected grid");
        };
        assert_eq!(resolution, 32);
        assert_eq!(heights.len(), 1024);
        assert!(heights.iter().all(|h| *h == 0.0));
    }
}
