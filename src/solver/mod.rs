pub mod face;
pub mod hand;
pub mod pose;

pub use face::FaceSolver;
pub use hand::HandSolver;
pub use pose::PoseSolver;

use nalgebra::UnitQuaternion;

use crate::quat::slerp_shortest;
use crate::rig::{clamp_orientation, Rig};
use crate::skeleton::{AvatarSkeleton, BoneId};

/// 低信頼・リセット時にレスト姿勢へ戻す固定ブレンド率
pub const RELAX_RATE: f32 = 0.1;

/// 共通のボーン駆動経路
///
/// look回転からリグ相対の目標姿勢を組み、信頼度が足りれば
/// 姿勢フィルタ→呼び出し側のブレンド率、足りなければレスト姿勢へ
/// 固定レートで寄せる。書き込み前に可動域クランプを通す。
/// 戻り値は実際に書き込まれた姿勢（未バインドのボーンはNone）。
pub(crate) fn drive_bone<S: AvatarSkeleton>(
    rig: &mut Rig,
    skeleton: &mut S,
    bone: BoneId,
    look: UnitQuaternion<f32>,
    confident: bool,
    lerp: f32,
    dt: f32,
) -> Option<UnitQuaternion<f32>> {
    let joint = *rig.joint(bone)?;
    let current = skeleton.orientation(bone.name());

    let (target, rate) = if confident {
        let raw = look * joint.inverse_rest * joint.rest;
        (rig.filter_mut(bone).filter(raw, dt), lerp)
    } else {
        (joint.rest, RELAX_RATE)
    };

    let blended = slerp_shortest(&current, &target, rate);
    let parent_q = match joint.parent {
        Some(p) => skeleton.orientation(p.name()),
        None => UnitQuaternion::identity(),
    };
    let clamped = clamp_orientation(bone, &parent_q, &blended);
    skeleton.set_orientation(bone.name(), clamped);
    Some(clamped)
}

/// レスト姿勢へ向けた緩和（モード切替のリセットフレームなど）
pub(crate) fn relax_bone<S: AvatarSkeleton>(rig: &Rig, skeleton: &mut S, bone: BoneId) {
    let joint = match rig.joint(bone) {
        Some(j) => *j,
        None => return,
    };
    let current = skeleton.orientation(bone.name());
    let blended = slerp_shortest(&current, &joint.rest, RELAX_RATE);
    let parent_q = match joint.parent {
        Some(p) => skeleton.orientation(p.name()),
        None => UnitQuaternion::identity(),
    };
    let clamped = clamp_orientation(bone, &parent_q, &blended);
    skeleton.set_orientation(bone.name(), clamped);
}
