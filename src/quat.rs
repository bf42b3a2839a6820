use nalgebra::{UnitQuaternion, Vector3};

/// 縮退ベクトル判定のしきい値
pub const EPS: f32 = 1e-6;

/// forward方向とup参照ベクトルからlook回転を構築
///
/// ローカルZ軸がforwardを向く回転。forwardが縮退している場合は
/// 恒等回転、forwardとupが平行な場合は代替up軸を選ぶ。
pub fn look_rotation(forward: &Vector3<f32>, up: &Vector3<f32>) -> UnitQuaternion<f32> {
    if !is_finite_vec(forward) || forward.norm_squared() < EPS {
        return UnitQuaternion::identity();
    }
    let up = if !is_finite_vec(up) || forward.cross(up).norm_squared() < EPS {
        // 平行: forwardとの直交性が取れる軸に差し替え
        if forward.cross(&Vector3::y()).norm_squared() < EPS {
            Vector3::x()
        } else {
            Vector3::y()
        }
    } else {
        *up
    };
    UnitQuaternion::face_towards(forward, &up)
}

/// 最短弧slerp
///
/// 半球を揃えてから球面補間する。ほぼ正反対の回転では
/// slerpが定義できないため補間先をそのまま返す。
pub fn slerp_shortest(
    a: &UnitQuaternion<f32>,
    b: &UnitQuaternion<f32>,
    t: f32,
) -> UnitQuaternion<f32> {
    let b = if a.coords.dot(&b.coords) < 0.0 {
        UnitQuaternion::new_unchecked(-b.into_inner())
    } else {
        *b
    };
    a.try_slerp(&b, t, 1.0e-6).unwrap_or(b)
}

/// 角度を (-180, 180] 度に折り返す
pub fn wrap_deg(deg: f32) -> f32 {
    let mut w = (deg % 360.0 + 360.0) % 360.0;
    if w > 180.0 {
        w -= 360.0;
    }
    w
}

/// inverse lerp (0..1にクランプ)
pub fn inverse_lerp(min: f32, max: f32, value: f32) -> f32 {
    let span = max - min;
    if span.abs() < EPS {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// NaN/Infを「信号なし」として代替値に置き換える
pub fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// 全成分が有限なベクトルか
pub fn is_finite_vec(v: &Vector3<f32>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
