pub mod limits;

pub use limits::clamp_orientation;

use anyhow::{bail, Result};
use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, info};

use crate::config::FilterTuning;
use crate::filter::OrientationFilter;
use crate::landmark::Side;
use crate::quat::{look_rotation, EPS};
use crate::skeleton::{AvatarSkeleton, BoneId};

/// ボーン1本分のリグ情報
///
/// バインド時に一度だけ作られ、以後は不変。
#[derive(Debug, Clone, Copy)]
pub struct Joint {
    pub bone: BoneId,
    /// 連鎖上の最寄りの実在祖先。Noneはルート扱い（親姿勢=恒等）
    pub parent: Option<BoneId>,
    /// 連鎖上の最寄りの実在子孫。Noneは末端ボーン
    pub child: Option<BoneId>,
    /// バインド時のワールド姿勢（リラックス目標）
    pub rest: UnitQuaternion<f32>,
    /// レスト時のlook回転の逆元
    pub inverse_rest: UnitQuaternion<f32>,
}

/// アバター1体分のジョイントマップ + フィルタアリーナ
///
/// ボーンIDで固定長配列を引く。フレーム経路にハッシュ表は出てこない。
pub struct Rig {
    joints: [Option<Joint>; BoneId::COUNT],
    filters: Vec<OrientationFilter>,
    rest_forward: Vector3<f32>,
    palm_rest_up: [Vector3<f32>; 2],
}

impl Rig {
    /// スケルトンからリグを構築する
    ///
    /// 任意のオプションボーン欠損を許容する。胴体連鎖が1本も
    /// 見つからない場合のみ構築エラー。
    pub fn build<S: AvatarSkeleton>(skeleton: &S, tuning: &FilterTuning) -> Result<Self> {
        let rest_forward = rest_forward_of(skeleton);

        fn insert(list: Vec<Joint>, joints: &mut [Option<Joint>; BoneId::COUNT]) {
            for j in list {
                joints[j.bone as usize] = Some(j);
            }
        }

        let mut joints: [Option<Joint>; BoneId::COUNT] = [None; BoneId::COUNT];

        use BoneId::*;
        let torso = build_chain(
            skeleton,
            &[Hips, Spine, Chest, UpperChest, Neck, Head],
            None,
            None,
            &rest_forward,
        );
        if torso.is_empty() {
            bail!("skeleton has no torso bones (Hips..Head all missing)");
        }

        // 腕・脚の連鎖が胴体へ接続する先（実在する最上位の胴体ボーン）
        let torso_anchor = [UpperChest, Chest, Spine, Hips]
            .into_iter()
            .find(|b| skeleton.bone_exists(b.name()));
        let leg_anchor = if skeleton.bone_exists(Hips.name()) {
            Some(Hips)
        } else {
            torso_anchor
        };
        insert(torso, &mut joints);

        for arm_bones in [
            [LeftShoulder, LeftUpperArm, LeftLowerArm, LeftHand],
            [RightShoulder, RightUpperArm, RightLowerArm, RightHand],
        ] {
            let arm = build_chain(skeleton, &arm_bones, torso_anchor, None, &rest_forward);
            insert(arm, &mut joints);
        }

        for legs in [
            [LeftUpperLeg, LeftLowerLeg, LeftFoot, LeftToes],
            [RightUpperLeg, RightLowerLeg, RightFoot, RightToes],
        ] {
            let leg = build_chain(skeleton, &legs, leg_anchor, None, &rest_forward);
            insert(leg, &mut joints);
        }

        // 手の平面軸（レスト時）。指ボーンのlook基準に使う
        let mut palm_rest_up = [rest_forward; 2];
        for side in Side::BOTH {
            let hand = BoneId::hand(side);
            if !skeleton.bone_exists(hand.name()) {
                continue;
            }
            palm_rest_up[side.index()] =
                palm_up_of(skeleton, side).unwrap_or(rest_forward);

            // 手首のlook基準は体幹の正面ではなく手の平面法線。
            // 腕連鎖で作ったジョイントのinverse_restだけ差し替える
            if let Some(j) = joints[hand as usize].as_mut() {
                if let Some(off) = skeleton.first_child_offset(hand.name()) {
                    if off.norm_squared() > EPS {
                        j.inverse_rest =
                            look_rotation(&off, &palm_rest_up[side.index()]).inverse();
                    }
                }
            }

            for chain in BoneId::finger_chains(side) {
                let digit = build_chain(
                    skeleton,
                    &chain,
                    Some(hand),
                    None,
                    &palm_rest_up[side.index()],
                );
                insert(digit, &mut joints);
            }
        }

        let bound = joints.iter().filter(|j| j.is_some()).count();
        info!(bound, skipped = BoneId::COUNT - bound, "rig built");

        Ok(Self {
            joints,
            filters: vec![
                OrientationFilter::new(tuning.rotation_min_cutoff, tuning.rotation_beta);
                BoneId::COUNT
            ],
            rest_forward,
            palm_rest_up,
        })
    }

    pub fn joint(&self, bone: BoneId) -> Option<&Joint> {
        self.joints[bone as usize].as_ref()
    }

    pub fn is_bound(&self, bone: BoneId) -> bool {
        self.joints[bone as usize].is_some()
    }

    pub fn bound_bones(&self) -> impl Iterator<Item = BoneId> + '_ {
        BoneId::ALL.into_iter().filter(|b| self.is_bound(*b))
    }

    pub fn filter_mut(&mut self, bone: BoneId) -> &mut OrientationFilter {
        &mut self.filters[bone as usize]
    }

    pub fn reset_filters(&mut self) {
        for f in &mut self.filters {
            f.reset();
        }
    }

    /// バインド時の正面方向（腹側）
    pub fn rest_forward(&self) -> Vector3<f32> {
        self.rest_forward
    }

    /// レスト時の手の平面法線
    pub fn palm_rest_up(&self, side: Side) -> Vector3<f32> {
        self.palm_rest_up[side.index()]
    }
}

/// 正面方向をレスト姿勢から導出
///
/// 背骨・左右大腿の三角形の法線。脚のないリグは+Zを仮定する。
fn rest_forward_of<S: AvatarSkeleton>(skeleton: &S) -> Vector3<f32> {
    let spine = [BoneId::Spine, BoneId::Chest, BoneId::Hips]
        .into_iter()
        .find(|b| skeleton.bone_exists(b.name()));
    let (spine, l_leg, r_leg) = match (
        spine,
        skeleton.bone_exists(BoneId::LeftUpperLeg.name()),
        skeleton.bone_exists(BoneId::RightUpperLeg.name()),
    ) {
        (Some(s), true, true) => (s, BoneId::LeftUpperLeg, BoneId::RightUpperLeg),
        _ => {
            debug!("rest forward fallback to +Z");
            return Vector3::z();
        }
    };

    let s = skeleton.rest_position(spine.name());
    let l = skeleton.rest_position(l_leg.name());
    let r = skeleton.rest_position(r_leg.name());
    let normal = (r - s).cross(&(l - s));
    if normal.norm_squared() < EPS {
        debug!("degenerate torso triangle, rest forward fallback to +Z");
        return Vector3::z();
    }
    normal.normalize()
}

/// レスト位置から手の平面法線を計算
///
/// 実行時の手ソルバと同じ式 (人差し指基節 × 中指基節)。
fn palm_up_of<S: AvatarSkeleton>(skeleton: &S, side: Side) -> Option<Vector3<f32>> {
    let hand = skeleton.rest_position(BoneId::hand(side).name());
    let chains = BoneId::finger_chains(side);
    let index = chains[1][0];
    let middle = chains[2][0];
    if !skeleton.bone_exists(index.name()) || !skeleton.bone_exists(middle.name()) {
        return None;
    }
    let up = (skeleton.rest_position(index.name()) - hand)
        .cross(&(skeleton.rest_position(middle.name()) - hand));
    if up.norm_squared() < EPS {
        return None;
    }
    Some(up.normalize())
}

/// 順序付きボーンリストからジョイント連鎖を構築する
///
/// 実在するボーンごとに、親は手前方向への走査（なければfallback_parent）、
/// 子は先方向への走査（なければfallback_child、それもなければ末端扱い）で
/// 解決する。末端ボーンは自身の最初のスケルトン子オフセットをlook方向に
/// 使い、それもなければ恒等。
pub fn build_chain<S: AvatarSkeleton>(
    skeleton: &S,
    bones: &[BoneId],
    fallback_parent: Option<BoneId>,
    fallback_child: Option<BoneId>,
    up: &Vector3<f32>,
) -> Vec<Joint> {
    let present: Vec<bool> = bones
        .iter()
        .map(|b| skeleton.bone_exists(b.name()))
        .collect();

    let mut joints = Vec::new();
    for (i, &bone) in bones.iter().enumerate() {
        if !present[i] {
            debug!(bone = bone.name(), "absent bone skipped");
            continue;
        }

        let parent = (0..i)
            .rev()
            .find(|&j| present[j])
            .map(|j| bones[j])
            .or(fallback_parent);
        let child = (i + 1..bones.len())
            .find(|&j| present[j])
            .map(|j| bones[j])
            .or(fallback_child.filter(|b| skeleton.bone_exists(b.name())));

        let bone_pos = skeleton.rest_position(bone.name());
        let rest_look = match child {
            Some(c) => look_rotation(&(skeleton.rest_position(c.name()) - bone_pos), up),
            None => match skeleton.first_child_offset(bone.name()) {
                Some(off) if off.norm_squared() > EPS => look_rotation(&off, up),
                _ => UnitQuaternion::identity(),
            },
        };

        joints.push(Joint {
            bone,
            parent,
            child,
            rest: skeleton.orientation(bone.name()),
            inverse_rest: rest_look.inverse(),
        });
    }
    joints
}
