//! mapper.rs
//! Re-expresses a raw device quaternion in the consumer's axis convention.
//!
//! The presets are fixed component-level reflections/permutations tuned against
//! specific hardware. They are kept exactly as written; no renormalisation.

use glam::Quat;
use serde::Deserialize;

/// 180° about the vertical (Y) axis, written out exactly.
pub const YAW_180: Quat = Quat::from_xyzw(0.0, 1.0, 0.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum MappingPreset {
    /// (x, y, -z, w)
    #[default]
    #[serde(alias = "PresetA")]
    A,
    /// (x, -z, y, w)
    #[serde(alias = "PresetB")]
    B,
    /// (-x, y, z, w)
    #[serde(alias = "PresetC")]
    C,
}

impl MappingPreset {
    #[inline]
    pub fn apply(self, q: Quat) -> Quat {
        match self {
            MappingPreset::A => Quat::from_xyzw(q.x, q.y, -q.z, q.w),
            MappingPreset::B => Quat::from_xyzw(q.x, -q.z, q.y, q.w),
            MappingPreset::C => Quat::from_xyzw(-q.x, q.y, q.z, q.w),
        }
    }
}

/// Applies the preset, then optionally composes the fixed yaw flip on the left
/// (rotates the whole frame, not the object's local frame).
#[inline]
pub fn map(raw: Quat, preset: MappingPreset, flip_front_back: bool) -> Quat {
    let mapped = preset.apply(raw);
    if flip_front_back {
        YAW_180 * mapped
    } else {
        mapped
    }
}
