use glam::{Mat4, Vec3};

const NEAR: f32 = 0.1;

/// Orthographic view projection of a directional light.
///
/// The light sits `height` above `target`, back along `direction`, and sees a
/// square of half width `extent` around it.
pub fn light_view_proj(direction: Vec3, target: Vec3, height: f32, extent: f32) -> Mat4 {
    let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let distance = if direction.y < -1e-3 {
        height / -direction.y
    } else {
        height.abs().max(extent)
    }
    .max(NEAR * 2.0);
    let eye = target - direction * distance;
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(eye, target, up);
    let projection = Mat4::orthographic_rh(
        -extent,
        extent,
        -extent,
        extent,
        NEAR,
        distance + 2.0 * extent,
    );
    projection * view
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(m: Mat4, p: Vec3) -> Vec3 {
        let clip = m * p.extend(1.0);
        clip.truncate() / clip.w
    }

    fn inside(ndc: Vec3) -> bool {
        ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && (0.0..=1.0).contains(&ndc.z)
    }

    #[test]
    fn target_lands_in_the_center() {
        let m = light_view_proj(Vec3::new(0.0, -1.0, 1.0), Vec3::ZERO, 10.0, 14.2);
        let ndc = project(m, Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5, "{ndc:?}");
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn ground_corners_fit_the_frustum() {
        let extent = 10.0 * std::f32::consts::SQRT_2;
        let m = light_view_proj(Vec3::new(0.0, -1.0, 1.0), Vec3::ZERO, 10.0, extent);
        for x in [-10.0, 10.0] {
            for z in [-10.0, 10.0] {
                let ndc = project(m, Vec3::new(x, 0.0, z));
                assert!(inside(ndc), "corner ({x}, {z}) -> {ndc:?}");
            }
        }
        // something standing on the ground is in front of it from the light
        let top = project(m, Vec3::new(0.0, 2.0, 0.0));
        let bottom = project(m, Vec3::ZERO);
        assert!(top.z < bottom.z);
    }

    #[test]
    fn straight_down_light_is_finite() {
        let m = light_view_proj(Vec3::NEG_Y, Vec3::ZERO, 10.0, 5.0);
        assert!(m.is_finite());
        let ndc = project(m, Vec3::ZERO);
        assert!((ndc.z - (10.0 - NEAR) / (10.0 + 10.0 - NEAR)).abs() < 1e-4);
    }

    #[test]
    fn horizontal_light_still_sees_the_target() {
        let m = light_view_proj(Vec3::X, Vec3::ZERO, 10.0, 5.0);
        assert!(m.is_finite());
        assert!(inside(project(m, Vec3::ZERO)));
    }
}
