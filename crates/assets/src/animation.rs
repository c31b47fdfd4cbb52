//! Keyframe clip synthesis.
//!
//! Path-following kinds sample the supplied path at evenly spaced
//! normalized times and derive rotation from local bearing/pitch between
//! consecutive points. Transient effect kinds use small fixed nonlinear
//! sequences. Output is always non-empty with times normalized to [0, 1].

/// One keyframe; `time` is normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub time: f64,
    /// Meters, [east, north, up].
    pub position: Option<[f64; 3]>,
    /// Radians, [heading, pitch, roll].
    pub rotation: Option<[f64; 3]>,
    pub scale: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration_s: f64,
    pub keyframes: Vec<Keyframe>,
    pub looping: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotionKind {
    Flight,
    Drive,
    Explosion,
    Collapse,
}

impl MotionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionKind::Flight => "flight",
            MotionKind::Drive => "drive",
            MotionKind::Explosion => "explosion",
            MotionKind::Collapse => "collapse",
        }
    }

    fn follows_path(&self) -> bool {
        matches!(self, MotionKind::Flight | MotionKind::Drive)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionParams {
    /// Path points in meters, [east, north, up]. Empty paths degrade to a
    /// single keyframe at the origin.
    pub path: Vec<[f64; 3]>,
    pub duration_s: f64,
}

pub fn synthesize(kind: MotionKind, params: &MotionParams) -> AnimationClip {
    let keyframes = if kind.follows_path() {
        path_keyframes(&params.path)
    } else {
        effect_keyframes(kind, &params.path)
    };

    AnimationClip {
        name: kind.as_str().to_string(),
        duration_s: params.duration_s.max(0.0),
        keyframes,
        looping: false,
    }
}

fn path_keyframes(path: &[[f64; 3]]) -> Vec<Keyframe> {
    match path.len() {
        0 => vec![Keyframe {
            time: 0.0,
            position: Some([0.0; 3]),
            rotation: None,
            scale: None,
        }],
        1 => vec![Keyframe {
            time: 0.0,
            position: Some(path[0]),
            rotation: None,
            scale: None,
        }],
        n => {
            let mut out = Vec::with_capacity(n);
            for (i, point) in path.iter().enumerate() {
                // The final point keeps the rotation of the last segment.
                let (a, b) = if i + 1 < n {
                    (path[i], path[i + 1])
                } else {
                    (path[i - 1], path[i])
                };
                out.push(Keyframe {
                    time: i as f64 / (n - 1) as f64,
                    position: Some(*point),
                    rotation: Some(segment_rotation(a, b)),
                    scale: None,
                });
            }
            out
        }
    }
}

/// Heading from north toward east, pitch from the horizontal plane.
fn segment_rotation(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    let de = b[0] - a[0];
    let dn = b[1] - a[1];
    let du = b[2] - a[2];
    let heading = de.atan2(dn);
    let pitch = du.atan2((de * de + dn * dn).sqrt());
    [heading, pitch, 0.0]
}

fn effect_keyframes(kind: MotionKind, path: &[[f64; 3]]) -> Vec<Keyframe> {
    let origin = path.first().copied().unwrap_or([0.0; 3]);
    match kind {
        MotionKind::Explosion => {
            // Rapid expansion, brief hold, fade-out collapse.
            let scales = [(0.0, 1.0), (0.15, 2.6), (0.5, 3.4), (1.0, 0.01)];
            scales
                .iter()
                .map(|&(time, s)| Keyframe {
                    time,
                    position: Some(origin),
                    rotation: None,
                    scale: Some([s, s, s]),
                })
                .collect()
        }
        MotionKind::Collapse => {
            // Vertical crumple: height shrinks while the base sinks.
            let stages = [(0.0, 1.0, 0.0), (0.3, 0.8, -0.1), (0.7, 0.35, -0.4), (1.0, 0.05, -0.6)];
            stages
                .iter()
                .map(|&(time, sy, dz)| Keyframe {
                    time,
                    position: Some([origin[0], origin[1], origin[2] + dz]),
                    rotation: None,
                    scale: Some([1.0, 1.0, sy]),
                })
                .collect()
        }
        MotionKind::Flight | MotionKind::Drive => unreachable!("path kinds handled by caller"),
    }
}
