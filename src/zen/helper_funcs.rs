use bevy::math::{Quat, Vec3};

/// Lowercases an asset name and strips its extension (`"Humans.MDS"` -> `"humans"`).
pub fn normalize_asset_name(name: &str) -> String {
    let trimmed = name.trim();
    let stem = match trimmed.rfind('.') {
        Some(dot) if dot > 0 => &trimmed[..dot],
        _ => trimmed,
    };
    stem.to_lowercase()
}

/// Cache key of a track: `"{mds}-{anim}"`, normalized.
pub fn track_cache_key(mds_name: &str, anim_name: &str) -> String {
    format!(
        "{}-{}",
        normalize_asset_name(mds_name),
        normalize_asset_name(anim_name)
    )
}

/// ZenGin rotations are stored with an inverted W relative to ours.
pub fn to_engine_quat(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, q.y, q.z, -q.w)
}

/// Projects onto the ground plane.
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Yaw-only rotation whose forward (-Z) points along `direction`.
pub fn look_rotation_xz(direction: Vec3) -> Option<Quat> {
    let flat = flatten(direction);
    if flat.length_squared() < 1e-8 {
        return None;
    }
    let dir = flat.normalize();
    Some(Quat::from_rotation_y(f32::atan2(-dir.x, -dir.z)))
}

/// Rotates `from` towards `to` by at most `max_angle` radians.
pub fn rotate_towards(from: Quat, to: Quat, max_angle: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_angle || angle <= f32::EPSILON {
        to
    } else {
        from.slerp(to, max_angle / angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_ignore_case_and_extension() {
        assert_eq!(
            track_cache_key("Humans.MDS", "S_WALKL"),
            track_cache_key("humans", "s_walkl")
        );
        assert_eq!(track_cache_key("HUMANS.mds", "S_RUN"), "humans-s_run");
    }

    #[test]
    fn look_rotation_faces_direction() {
        let rot = look_rotation_xz(Vec3::new(1.0, 5.0, 0.0)).unwrap();
        let forward = rot * Vec3::NEG_Z;
        assert!((forward - Vec3::X).length() < 1e-5);
        assert!(look_rotation_xz(Vec3::Y).is_none());
    }

    #[test]
    fn rotate_towards_is_capped() {
        let to = Quat::from_rotation_y(1.0);
        let step = rotate_towards(Quat::IDENTITY, to, 0.25);
        assert!((step.angle_between(Quat::IDENTITY) - 0.25).abs() < 1e-4);
        assert_eq!(rotate_towards(Quat::IDENTITY, to, 2.0), to);
    }
}
