//! Asset data model.
//!
//! Specifications are a tagged union per kind with strongly-typed fields,
//! so acquisition code never shape-checks free-form attribute bags. Assets
//! are immutable once produced; detail reduction derives a new asset rather
//! than mutating the source.

use serde::{Deserialize, Serialize};

use crate::animation::AnimationClip;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Building,
    Vehicle,
    Aircraft,
    Terrain,
    Effect,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Building => "building",
            AssetKind::Vehicle => "vehicle",
            AssetKind::Aircraft => "aircraft",
            AssetKind::Terrain => "terrain",
            AssetKind::Effect => "effect",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Explosion,
    Collapse,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Explosion => "explosion",
            EffectKind::Collapse => "collapse",
        }
    }
}

/// Kind-specific asset specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssetSpec {
    Building {
        width_m: f64,
        depth_m: f64,
        height_m: f64,
        floors: u32,
        style: Option<String>,
    },
    Vehicle {
        length_m: f64,
        width_m: f64,
        height_m: f64,
        body: Option<String>,
    },
    Aircraft {
        wingspan_m: f64,
        length_m: f64,
        height_m: f64,
        model: Option<String>,
    },
    Terrain {
        size_m: f64,
        resolution: u32,
        roughness: f64,
        seed: u64,
    },
    Effect {
        effect: EffectKind,
        radius_m: f64,
        duration_s: f64,
    },
}

impl AssetSpec {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetSpec::Building { .. } => AssetKind::Building,
            AssetSpec::Vehicle { .. } => AssetKind::Vehicle,
            AssetSpec::Aircraft { .. } => AssetKind::Aircraft,
            AssetSpec::Terrain { .. } => AssetKind::Terrain,
            AssetSpec::Effect { .. } => AssetKind::Effect,
        }
    }

    /// Overall bounding dimensions the spec asks for.
    pub fn dimensions(&self) -> Dimensions {
        match *self {
            AssetSpec::Building {
                width_m,
                depth_m,
                height_m,
                ..
            } => Dimensions::new(width_m, depth_m, height_m),
            AssetSpec::Vehicle {
                length_m,
                width_m,
                height_m,
                ..
            } => Dimensions::new(width_m, length_m, height_m),
            AssetSpec::Aircraft {
                wingspan_m,
                length_m,
                height_m,
                ..
            } => Dimensions::new(wingspan_m, length_m, height_m),
            AssetSpec::Terrain { size_m, .. } => Dimensions::new(size_m, size_m, 0.0),
            AssetSpec::Effect { radius_m, .. } => {
                Dimensions::new(radius_m * 2.0, radius_m * 2.0, radius_m * 2.0)
            }
        }
    }

    /// Human-oriented name used in metadata.
    pub fn display_name(&self) -> String {
        let label = match self {
            AssetSpec::Building { style, .. } => style.as_deref(),
            AssetSpec::Vehicle { body, .. } => body.as_deref(),
            AssetSpec::Aircraft { model, .. } => model.as_deref(),
            AssetSpec::Terrain { .. } => None,
            AssetSpec::Effect { effect, .. } => Some(effect.as_str()),
        };
        match label {
            Some(label) => format!("{} ({label})", self.kind().as_str()),
            None => self.kind().as_str().to_string(),
        }
    }

    /// Canonical form hashed into the request id. Fields are formatted with
    /// fixed precision so the id is total even for unusual float values.
    fn canonical(&self) -> String {
        fn opt(s: &Option<String>) -> &str {
            s.as_deref().unwrap_or("-")
        }
        match self {
            AssetSpec::Building {
                width_m,
                depth_m,
                height_m,
                floors,
                style,
            } => format!("building|{width_m:.3}|{depth_m:.3}|{height_m:.3}|{floors}|{}", opt(style)),
            AssetSpec::Vehicle {
                length_m,
                width_m,
                height_m,
                body,
            } => format!("vehicle|{length_m:.3}|{width_m:.3}|{height_m:.3}|{}", opt(body)),
            AssetSpec::Aircraft {
                wingspan_m,
                length_m,
                height_m,
                model,
            } => format!("aircraft|{wingspan_m:.3}|{length_m:.3}|{height_m:.3}|{}", opt(model)),
            AssetSpec::Terrain {
                size_m,
                resolution,
                roughness,
                seed,
            } => format!("terrain|{size_m:.3}|{resolution}|{roughness:.4}|{seed}"),
            AssetSpec::Effect {
                effect,
                radius_m,
                duration_s,
            } => format!("effect|{}|{radius_m:.3}|{duration_s:.3}", effect.as_str()),
        }
    }

    /// Deterministic cache/dedup id: `"{kind}-{hash}"`.
    pub fn request_id(&self) -> String {
        let hash = blake3::hash(self.canonical().as_bytes());
        format!("{}-{}", self.kind().as_str(), &hash.to_hex().as_str()[..16])
    }
}

/// Request urgency. A scheduling/log hint only; tier order in the
/// acquisition chain is fixed regardless.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Interactive,
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub spec: AssetSpec,
    pub urgency: Urgency,
}

impl AssetRequest {
    pub fn interactive(spec: AssetSpec) -> Self {
        Self {
            spec,
            urgency: Urgency::Interactive,
        }
    }

    pub fn background(spec: AssetSpec) -> Self {
        Self {
            spec,
            urgency: Urgency::Background,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Dimensions {
    pub width_m: f64,
    pub depth_m: f64,
    pub height_m: f64,
}

impl Dimensions {
    pub fn new(width_m: f64, depth_m: f64, height_m: f64) -> Self {
        Self {
            width_m,
            depth_m,
            height_m,
        }
    }
}

/// Which acquisition path produced an asset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    /// A registered procedural generator.
    Procedural,
    /// An external model/knowledge source.
    External,
    /// Primitive-geometry synthesis (or the universal fallback).
    Generated,
    /// Derived from a cached asset (LOD reductions).
    Cached,
}

impl AssetOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetOrigin::Procedural => "procedural",
            AssetOrigin::External => "external",
            AssetOrigin::Generated => "generated",
            AssetOrigin::Cached => "cached",
        }
    }
}

/// Mesh parts are classified so detail reduction can strip decoration
/// without touching structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DetailClass {
    Structural,
    Decorative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub name: String,
    pub detail: DetailClass,
    /// Flat xyz triples, meters, asset-local frame.
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetPayload {
    Mesh { parts: Vec<MeshPart> },
    TerrainGrid {
        resolution: u32,
        size_m: f64,
        heights: Vec<f32>,
    },
    /// Reference to an externally hosted model.
    ModelRef { uri: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetMetadata {
    pub name: String,
    pub dimensions: Dimensions,
    pub origin: AssetOrigin,
    /// 0..1; detail reduction only ever lowers this.
    pub accuracy: f64,
    pub license: Option<String>,
    pub attribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: String,
    pub kind: AssetKind,
    pub payload: AssetPayload,
    pub animations: Vec<AnimationClip>,
    pub metadata: AssetMetadata,
}

impl Asset {
    /// Rough residency cost for cache budgeting.
    pub fn estimated_bytes(&self) -> usize {
        const ENTRY_OVERHEAD: usize = 256;
        let payload = match &self.payload {
            AssetPayload::Mesh { parts } => parts
                .iter()
                .map(|p| p.positions.len() * 4 + p.indices.len() * 4 + p.name.len())
                .sum(),
            AssetPayload::TerrainGrid { heights, .. } => heights.len() * 4,
            AssetPayload::ModelRef { uri } => uri.len(),
        };
        let animations: usize = self
            .animations
            .iter()
            .map(|clip| clip.keyframes.len() * 80 + clip.name.len())
            .sum();
        ENTRY_OVERHEAD + payload + animations
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetKind, AssetSpec, EffectKind};

    fn building(height_m: f64) -> AssetSpec {
        AssetSpec::Building {
            width_m: 20.0,
            depth_m: 15.0,
            height_m,
            floors: 8,
            style: None,
        }
    }

    #[test]
    fn request_id_is_deterministic() {
        assert_eq!(building(100.0).request_id(), building(100.0).request_id());
        assert_ne!(building(100.0).request_id(), building(101.0).request_id());
    }

    #[test]
    fn request_id_is_kind_prefixed() {
        assert!(building(100.0).request_id().starts_with("building-"));
        let effect = AssetSpec::Effect {
            effect: EffectKind::Explosion,
            radius_m: 5.0,
            duration_s: 1.5,
        };
        assert!(effect.request_id().starts_with("effect-"));
    }

    #[test]
    fn dimensions_reflect_the_spec() {
        let d = building(100.0).dimensions();
        assert_eq!((d.width_m, d.depth_m, d.height_m), (20.0, 15.0, 100.0));

        let aircraft = AssetSpec::Aircraft {
            wingspan_m: 35.8,
            length_m: 37.6,
            height_m: 12.0,
            model: Some("a320".into()),
        };
        assert_eq!(aircraft.dimensions().width_m, 35.8);
        assert_eq!(aircraft.kind(), AssetKind::Aircraft);
    }

    #[test]
    fn specs_round_trip_through_serde() {
        let spec = building(100.0);
        let json = serde_json::to_string(&spec).expect("serialize");
        assert!(json.contains(r#""kind":"building""#));
        let back: AssetSpec = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, spec);
    }
}
