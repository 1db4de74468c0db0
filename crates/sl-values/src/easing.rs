//! Easing curves
//!
//! Every curve maps progress `t` in `[0, 1]` to eased progress, with
//! `f(0) == 0` and `f(1) == 1`.

use sl_core::Easing;

/// Apply an easing curve; `t` is clamped to `[0, 1]`
pub fn ease(easing: Easing, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    match easing {
        Easing::Linear => t,
        Easing::EaseIn => t * t,
        Easing::EaseOut => t * (2.0 - t),
        Easing::EaseInOut => {
            if t < 0.5 {
                2.0 * t * t
            } else {
                -1.0 + (4.0 - 2.0 * t) * t
            }
        }
        Easing::CubicIn => t * t * t,
        Easing::CubicOut => {
            let u = t - 1.0;
            u * u * u + 1.0
        }
        Easing::CubicInOut => {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                let u = 2.0 * t - 2.0;
                0.5 * u * u * u + 1.0
            }
        }
    }
}

/// Linear interpolation between `a` and `b`
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 7] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(ease(easing, 0.0).abs() < 1e-9, "{easing:?} at 0");
            assert!((ease(easing, 1.0) - 1.0).abs() < 1e-9, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_clamped() {
        assert_eq!(ease(Easing::Linear, -1.0), 0.0);
        assert_eq!(ease(Easing::Linear, 2.0), 1.0);
    }

    #[test]
    fn test_curve_shape() {
        assert!(ease(Easing::EaseIn, 0.5) < 0.5);
        assert!(ease(Easing::EaseOut, 0.5) > 0.5);
        assert!((ease(Easing::EaseInOut, 0.5) - 0.5).abs() < 1e-9);
        assert!((ease(Easing::CubicInOut, 0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.25), 2.5);
        assert_eq!(lerp(4.0, 2.0, 0.5), 3.0);
    }
}
