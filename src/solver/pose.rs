use nalgebra::Vector3;

use super::drive_bone;
use crate::config::{FilterTuning, RetargetConfig};
use crate::filter::VectorFilter;
use crate::landmark::{face, BodyLandmark, LandmarkSource};
use crate::quat::{is_finite_vec, look_rotation, slerp_shortest, EPS};
use crate::rig::Rig;
use crate::skeleton::{AvatarSkeleton, BoneId};

/// 頭の回転を背骨へ伝播させる減衰率
const SPINE_FROM_HEAD: f32 = 0.3;

/// 全身ソルバ
///
/// 33ランドマークを毎フレームフィルタし、腰・背骨・頭・四肢の
/// ボーン姿勢を解く。ランドマークのフィルタは信頼度に関わらず
/// 回して状態を温めておく。
pub struct PoseSolver {
    filters: Vec<VectorFilter>,
    positions: [Vector3<f32>; BodyLandmark::COUNT],
}

/// 四肢ボーンとランドマークペアの対応（上半身）
const UPPER_BODY: [(BoneId, BodyLandmark, BodyLandmark); 2] = [
    (
        BoneId::LeftUpperArm,
        BodyLandmark::LeftShoulder,
        BodyLandmark::LeftElbow,
    ),
    (
        BoneId::RightUpperArm,
        BodyLandmark::RightShoulder,
        BodyLandmark::RightElbow,
    ),
];

/// 前腕（肘は手首が弱くても追従させる特例がある）
const LOWER_ARMS: [(BoneId, BodyLandmark, BodyLandmark); 2] = [
    (
        BoneId::LeftLowerArm,
        BodyLandmark::LeftElbow,
        BodyLandmark::LeftWrist,
    ),
    (
        BoneId::RightLowerArm,
        BodyLandmark::RightElbow,
        BodyLandmark::RightWrist,
    ),
];

/// 下半身6ボーン
const LOWER_BODY: [(BoneId, BodyLandmark, BodyLandmark); 6] = [
    (
        BoneId::LeftUpperLeg,
        BodyLandmark::LeftHip,
        BodyLandmark::LeftKnee,
    ),
    (
        BoneId::RightUpperLeg,
        BodyLandmark::RightHip,
        BodyLandmark::RightKnee,
    ),
    (
        BoneId::LeftLowerLeg,
        BodyLandmark::LeftKnee,
        BodyLandmark::LeftAnkle,
    ),
    (
        BoneId::RightLowerLeg,
        BodyLandmark::RightKnee,
        BodyLandmark::RightAnkle,
    ),
    (
        BoneId::LeftFoot,
        BodyLandmark::LeftAnkle,
        BodyLandmark::LeftFootIndex,
    ),
    (
        BoneId::RightFoot,
        BodyLandmark::RightAnkle,
        BodyLandmark::RightFootIndex,
    ),
];

impl PoseSolver {
    pub fn new(tuning: &FilterTuning) -> Self {
        Self {
            filters: vec![
                VectorFilter::new(tuning.landmark_min_cutoff, tuning.landmark_beta);
                BodyLandmark::COUNT
            ],
            positions: [Vector3::zeros(); BodyLandmark::COUNT],
        }
    }

    pub fn reset(&mut self) {
        for f in &mut self.filters {
            f.reset();
        }
    }

    pub fn solve<L: LandmarkSource, S: AvatarSkeleton>(
        &mut self,
        rig: &mut Rig,
        source: &L,
        skeleton: &mut S,
        config: &RetargetConfig,
        face_available: bool,
        dt: f32,
    ) {
        let mut conf = [0.0f32; BodyLandmark::COUNT];
        for i in 0..BodyLandmark::COUNT {
            let lm = source.body(BodyLandmark::from_index(i).expect("dense index"));
            conf[i] = crate::quat::sanitize(lm.confidence, 0.0);
            let raw = lm.position();
            if is_finite_vec(&raw) {
                self.positions[i] = self.filters[i].filter(raw, dt);
            }
        }

        let positions = self.positions;
        let p = |i: BodyLandmark| positions[i as usize];
        let c = |i: BodyLandmark| conf[i as usize];
        let thr = config.pose_threshold;
        let lerp = config.lerp_percentage;

        use BodyLandmark::*;

        // アンカー: 肩・腰の中点と、その中間の背骨点
        let hip_anchor = (p(LeftHip) + p(RightHip)) * 0.5;
        let shoulder_anchor = (p(LeftShoulder) + p(RightShoulder)) * 0.5;
        let spine_anchor = hip_anchor + (shoulder_anchor - hip_anchor) * 0.5;

        // 正面: 背骨点と左右腰の三角形の法線（リグ構築と同じ式）
        let normal = (p(RightHip) - spine_anchor).cross(&(p(LeftHip) - spine_anchor));
        let forward = if is_finite_vec(&normal) && normal.norm_squared() > EPS {
            normal.normalize()
        } else {
            rig.rest_forward()
        };

        // 腰
        let hip_conf_ok = c(LeftHip) >= thr && c(RightHip) >= thr;
        if !config.upper_body_only {
            let look = look_rotation(&(shoulder_anchor - hip_anchor), &forward);
            drive_bone(rig, skeleton, BoneId::Hips, look, hip_conf_ok, lerp, dt);
        }

        // 頭: 頭蓋軸（上方向）をlook方向、顔法線をup参照にする
        let (skull_axis, face_normal) = self.head_basis(source, skeleton, config, face_available, &p);
        let head_conf_ok = c(Nose) >= thr;
        let look_head = look_rotation(&skull_axis, &face_normal);
        drive_bone(rig, skeleton, BoneId::Head, look_head, head_conf_ok, lerp, dt);

        // 背骨: 頭の回転を減衰して伝播（腰が見えている時のみ。上半身モードは常時）
        if hip_conf_ok || config.upper_body_only {
            if let Some(joint) = rig.joint(BoneId::Spine) {
                let spine_rest_look = joint.inverse_rest.inverse();
                let spine_look = slerp_shortest(&spine_rest_look, &look_head, SPINE_FROM_HEAD);
                drive_bone(rig, skeleton, BoneId::Spine, spine_look, head_conf_ok, lerp, dt);
            }
        }

        // 上半身の四肢
        for (bone, i, j) in UPPER_BODY {
            let look = look_rotation(&(p(j) - p(i)), &forward);
            let ok = c(i) >= thr && c(j) >= thr;
            drive_bone(rig, skeleton, bone, look, ok, lerp, dt);
        }
        // 前腕: 自身と子の両方が閾値未満の時だけレストへ落とす
        // （手首の読みが弱くても肘は追従し続ける）
        for (bone, i, j) in LOWER_ARMS {
            let look = look_rotation(&(p(j) - p(i)), &forward);
            let ok = c(i) >= thr || c(j) >= thr;
            drive_bone(rig, skeleton, bone, look, ok, lerp, dt);
        }

        if !config.upper_body_only {
            for (bone, i, j) in LOWER_BODY {
                let look = look_rotation(&(p(j) - p(i)), &forward);
                let ok = c(i) >= thr && c(j) >= thr;
                drive_bone(rig, skeleton, bone, look, ok, lerp, dt);
            }
        }
    }

    /// 頭の基底ベクトル（頭蓋軸・顔法線）を決める
    ///
    /// 優先順: 注視先指定 > 顔ランドマーク > 全身ランドマーク近似。
    fn head_basis<L: LandmarkSource, S: AvatarSkeleton>(
        &self,
        source: &L,
        skeleton: &S,
        config: &RetargetConfig,
        face_available: bool,
        p: &impl Fn(BodyLandmark) -> Vector3<f32>,
    ) -> (Vector3<f32>, Vector3<f32>) {
        use BodyLandmark::*;

        if let Some(target) = config.look_at {
            let target = Vector3::new(target[0], target[1], target[2]);
            let fwd = target - skeleton.rest_position(BoneId::Head.name());
            if fwd.norm_squared() > EPS {
                let fwd = fwd.normalize();
                // 頭蓋軸: グローバル上方向をfwdと直交化
                let up = Vector3::y() - fwd * fwd.y;
                if up.norm_squared() > EPS {
                    return (up.normalize(), fwd);
                }
            }
        }

        if face_available && source.face_score() >= config.face_threshold {
            let fa = |i: usize| source.face(i).position();
            let up = fa(face::FOREHEAD) - fa(face::CHIN);
            let right_to_left = fa(face::CHEEK_LEFT) - fa(face::CHEEK_RIGHT);
            let fwd = right_to_left.cross(&up);
            if is_finite_vec(&up) && is_finite_vec(&fwd) && fwd.norm_squared() > EPS {
                return (up, fwd);
            }
        }

        // 全身ランドマークからの近似: 目と口の中点で頭蓋軸、耳の線で法線
        let eye_mid = (p(LeftEye) + p(RightEye)) * 0.5;
        let mouth_mid = (p(MouthLeft) + p(MouthRight)) * 0.5;
        let up = eye_mid - mouth_mid;
        let right_to_left = p(LeftEar) - p(RightEar);
        let fwd = right_to_left.cross(&up);
        (up, fwd)
    }
}
