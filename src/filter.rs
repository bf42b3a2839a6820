use nalgebra::{UnitQuaternion, Vector3};

use crate::quat::slerp_shortest;

/// Low-pass filter component
#[derive(Clone)]
struct LowPassFilter {
    prev: Option<f32>,
}

impl LowPassFilter {
    fn new() -> Self {
        Self { prev: None }
    }

    fn filter(&mut self, value: f32, alpha: f32) -> f32 {
        match self.prev {
            Some(prev) => {
                let result = alpha * value + (1.0 - alpha) * prev;
                self.prev = Some(result);
                result
            }
            None => {
                self.prev = Some(value);
                value
            }
        }
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// One Euro Filter (スカラー値用)
///
/// cutoff = min_cutoff + beta * |微分| の適応カットオフ。
/// dt は呼び出し側が供給する（内部に時計を持たない）。
#[derive(Clone)]
pub struct ScalarFilter {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    x_filter: LowPassFilter,
    dx_filter: LowPassFilter,
    prev_value: Option<f32>,
}

impl ScalarFilter {
    pub fn new(min_cutoff: f32, beta: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff: 1.0,
            x_filter: LowPassFilter::new(),
            dx_filter: LowPassFilter::new(),
            prev_value: None,
        }
    }

    pub fn filter(&mut self, value: f32, dt: f32) -> f32 {
        let dx = match self.prev_value {
            Some(prev) => {
                if dt > 0.0 {
                    (value - prev) / dt
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.prev_value = Some(value);

        let edx = self
            .dx_filter
            .filter(dx, smoothing_factor(dt, self.d_cutoff));
        let cutoff = self.min_cutoff + self.beta * edx.abs();
        self.x_filter.filter(value, smoothing_factor(dt, cutoff))
    }

    pub fn reset(&mut self) {
        self.x_filter.reset();
        self.dx_filter.reset();
        self.prev_value = None;
    }
}

/// One Euro Filter (3次元ベクトル用)
///
/// 成分ごとに独立したスカラーフィルタを適用する。
#[derive(Clone)]
pub struct VectorFilter {
    components: [ScalarFilter; 3],
}

impl VectorFilter {
    pub fn new(min_cutoff: f32, beta: f32) -> Self {
        Self {
            components: std::array::from_fn(|_| ScalarFilter::new(min_cutoff, beta)),
        }
    }

    pub fn filter(&mut self, value: Vector3<f32>, dt: f32) -> Vector3<f32> {
        Vector3::new(
            self.components[0].filter(value.x, dt),
            self.components[1].filter(value.y, dt),
            self.components[2].filter(value.z, dt),
        )
    }

    pub fn reset(&mut self) {
        for f in &mut self.components {
            f.reset();
        }
    }
}

/// One Euro Filter (姿勢クォータニオン用)
///
/// 微分はベクトルノルムではなく回転距離 (angle_to / dt)。
/// 補間は最短弧slerp。
#[derive(Clone)]
pub struct OrientationFilter {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    dv_filter: LowPassFilter,
    prev: Option<UnitQuaternion<f32>>,
}

impl OrientationFilter {
    pub fn new(min_cutoff: f32, beta: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff: 1.0,
            dv_filter: LowPassFilter::new(),
            prev: None,
        }
    }

    pub fn filter(&mut self, value: UnitQuaternion<f32>, dt: f32) -> UnitQuaternion<f32> {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(value);
                return value;
            }
        };

        // 回転速度 (rad/s)
        let dv = if dt > 0.0 {
            prev.angle_to(&value) / dt
        } else {
            0.0
        };
        let edv = self
            .dv_filter
            .filter(dv, smoothing_factor(dt, self.d_cutoff));
        let cutoff = self.min_cutoff + self.beta * edv.abs();
        let alpha = smoothing_factor(dt, cutoff);

        let result = slerp_shortest(&prev, &value, alpha);
        self.prev = Some(result);
        result
    }

    pub fn reset(&mut self) {
        self.dv_filter.reset();
        self.prev = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 30.0;

    #[test]
    fn test_smoothing_factor_bounds() {
        // alpha should be between 0 and 1
        for &cutoff in &[0.1, 1.0, 10.0, 100.0] {
            for &te in &[0.001, 0.01, 0.033, 0.1] {
                let alpha = smoothing_factor(te, cutoff);
                assert!(alpha > 0.0 && alpha < 1.0, "alpha={} for te={}, cutoff={}", alpha, te, cutoff);
            }
        }
    }

    #[test]
    fn test_scalar_filter_passthrough_first() {
        let mut f = ScalarFilter::new(1.0, 0.0);
        let result = f.filter(5.0, DT);
        assert_eq!(result, 5.0);
    }

    #[test]
    fn test_scalar_filter_smooths() {
        let mut f = ScalarFilter::new(1.0, 0.0);
        f.filter(0.0, DT);
        let result = f.filter(10.0, DT);
        assert!(result < 10.0, "Expected smoothing, got {}", result);
        assert!(result > 0.0, "Expected positive value, got {}", result);
    }

    #[test]
    fn test_scalar_filter_high_beta_responsive() {
        // High beta: fast movements should pass through with less filtering
        let mut f_low_beta = ScalarFilter::new(1.0, 0.0);
        let mut f_high_beta = ScalarFilter::new(1.0, 1.0);

        f_low_beta.filter(0.0, DT);
        f_high_beta.filter(0.0, DT);

        let r_low = f_low_beta.filter(10.0, DT);
        let r_high = f_high_beta.filter(10.0, DT);

        assert!(r_high > r_low, "High beta ({}) should be more responsive than low beta ({})", r_high, r_low);
    }

    #[test]
    fn test_scalar_filter_converges_on_constant_input() {
        // 一定入力では |出力 - 入力| が単調減少してε以下に収束すること
        let mut f = ScalarFilter::new(1.0, 0.0);
        f.filter(0.0, DT);

        let target = 10.0;
        let mut prev_err = f32::INFINITY;
        let mut converged = false;
        for _ in 0..300 {
            let out = f.filter(target, DT);
            let err = (out - target).abs();
            assert!(err < prev_err || err < 1e-4, "error must strictly decrease: {} -> {}", prev_err, err);
            prev_err = err;
            if err < 1e-3 {
                converged = true;
                break;
            }
        }
        assert!(converged, "did not converge, residual {}", prev_err);
    }

    #[test]
    fn test_scalar_filter_reset() {
        let mut f = ScalarFilter::new(1.0, 0.0);
        f.filter(1.0, DT);
        f.reset();
        // After reset, first frame passes through
        assert_eq!(f.filter(7.0, DT), 7.0);
    }

    #[test]
    fn test_vector_filter_componentwise() {
        let mut f = VectorFilter::new(1.0, 0.0);
        f.filter(Vector3::zeros(), DT);
        let out = f.filter(Vector3::new(2.0, 4.0, 6.0), DT);
        // 同じalphaが各成分に掛かるので比率が保たれる
        assert!((out.y / out.x - 2.0).abs() < 1e-4);
        assert!((out.z / out.x - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_orientation_filter_passthrough_first() {
        let mut f = OrientationFilter::new(1.0, 0.0);
        let q = UnitQuaternion::from_euler_angles(0.0, 0.5, 0.0);
        let result = f.filter(q, DT);
        assert!((result.angle_to(&q)).abs() < 1e-6);
    }

    #[test]
    fn test_orientation_filter_smooths_toward_target() {
        let mut f = OrientationFilter::new(1.0, 0.0);
        let start = UnitQuaternion::identity();
        let target = UnitQuaternion::from_euler_angles(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        f.filter(start, DT);
        let out = f.filter(target, DT);
        // 途中までしか進まない
        let progressed = start.angle_to(&out);
        assert!(progressed > 0.0 && progressed < start.angle_to(&target));
    }

    #[test]
    fn test_orientation_filter_converges_on_constant_input() {
        let mut f = OrientationFilter::new(1.0, 0.0);
        f.filter(UnitQuaternion::identity(), DT);
        let target = UnitQuaternion::from_euler_angles(0.3, 0.8, -0.2);
        let mut out = UnitQuaternion::identity();
        for _ in 0..300 {
            out = f.filter(target, DT);
        }
        assert!(out.angle_to(&target) < 1e-2, "residual angle {}", out.angle_to(&target));
    }

    #[test]
    fn test_orientation_filter_reset() {
        let mut f = OrientationFilter::new(1.0, 0.0);
        f.filter(UnitQuaternion::identity(), DT);
        f.reset();
        let q = UnitQuaternion::from_euler_angles(0.0, 1.0, 0.0);
        let result = f.filter(q, DT);
        assert!((result.angle_to(&q)).abs() < 1e-6);
    }
}
