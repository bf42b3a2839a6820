//! 解剖学的な関節可動域クランプ
//!
//! 親ローカルのオイラー角で軸ごとに独立クランプする。宣言のない
//! ボーンは素通し。ノイズ由来の不可能姿勢がスケルトンへ書き込まれる
//! のを防ぐ最終段。

use nalgebra::UnitQuaternion;

use crate::quat::wrap_deg;
use crate::skeleton::BoneId;

/// 軸ごとの可動域（度）
#[derive(Debug, Clone, Copy)]
struct AxisLimits {
    x: (f32, f32),
    y: (f32, f32),
    z: (f32, f32),
}

/// 可動域テーブル
///
/// pitch軸(y)は±90度以内に収める。オイラー分解の主値域を外れると
/// 再分解で等価角に化けてクランプが安定しない。
fn limits_for(bone: BoneId) -> Option<AxisLimits> {
    use BoneId::*;
    let lim = match bone {
        Hips => AxisLimits {
            x: (-30.0, 30.0),
            y: (-60.0, 60.0),
            z: (-30.0, 30.0),
        },
        Spine => AxisLimits {
            x: (-30.0, 30.0),
            y: (-40.0, 40.0),
            z: (-30.0, 30.0),
        },
        Head => AxisLimits {
            x: (-40.0, 40.0),
            y: (-70.0, 70.0),
            z: (-35.0, 35.0),
        },
        LeftUpperArm | RightUpperArm => AxisLimits {
            x: (-135.0, 135.0),
            y: (-85.0, 85.0),
            z: (-90.0, 90.0),
        },
        LeftLowerArm | RightLowerArm => AxisLimits {
            x: (-150.0, 150.0),
            y: (-85.0, 85.0),
            z: (-90.0, 90.0),
        },
        LeftUpperLeg | RightUpperLeg => AxisLimits {
            x: (-120.0, 120.0),
            y: (-60.0, 60.0),
            z: (-60.0, 60.0),
        },
        LeftLowerLeg | RightLowerLeg => AxisLimits {
            x: (-150.0, 150.0),
            y: (-30.0, 30.0),
            z: (-30.0, 30.0),
        },
        _ => return None,
    };
    Some(lim)
}

/// 候補姿勢を親ローカル可動域にクランプしたワールド姿勢を返す
pub fn clamp_orientation(
    bone: BoneId,
    parent: &UnitQuaternion<f32>,
    candidate: &UnitQuaternion<f32>,
) -> UnitQuaternion<f32> {
    let lim = match limits_for(bone) {
        Some(lim) => lim,
        None => return *candidate,
    };

    let local = parent.inverse() * candidate;
    let (roll, pitch, yaw) = local.euler_angles();

    let cx = wrap_deg(roll.to_degrees()).clamp(lim.x.0, lim.x.1);
    let cy = wrap_deg(pitch.to_degrees()).clamp(lim.y.0, lim.y.1);
    let cz = wrap_deg(yaw.to_degrees()).clamp(lim.z.0, lim.z.1);

    parent
        * UnitQuaternion::from_euler_angles(
            cx.to_radians(),
            cy.to_radians(),
            cz.to_radians(),
        )
}
