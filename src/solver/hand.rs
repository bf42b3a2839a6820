use nalgebra::Vector3;

use super::{drive_bone, relax_bone};
use crate::config::RetargetConfig;
use crate::landmark::{BodyLandmark, HandLandmark, LandmarkSource, Side, DIGIT_CHAINS};
use crate::quat::{is_finite_vec, look_rotation, slerp_shortest, EPS};
use crate::rig::Rig;
use crate::skeleton::{AvatarSkeleton, BoneId};

/// 前腕を手首姿勢へ寄せる固定ブレンド率
/// 手首境界での捻れの不連続を見えにくくする
const FOREARM_FOLLOW: f32 = 0.2;

/// 片手ソルバ
///
/// 手首姿勢は前腕から独立に、毎フレーム手の平面軸を再計算して解く。
/// 指15セグメントは指内の連続ランドマークペアで解く。
pub struct HandSolver {
    side: Side,
}

impl HandSolver {
    pub fn new(side: Side) -> Self {
        Self { side }
    }

    pub fn solve<L: LandmarkSource, S: AvatarSkeleton>(
        &self,
        rig: &mut Rig,
        source: &L,
        skeleton: &mut S,
        config: &RetargetConfig,
        dt: f32,
    ) {
        // 手配列は信頼度を持たないため、全身ストリームの手首信頼度で門番する
        let wrist_lm = match self.side {
            Side::Left => BodyLandmark::LeftWrist,
            Side::Right => BodyLandmark::RightWrist,
        };
        let wrist_conf = source.body(wrist_lm).confidence;
        if !(wrist_conf >= config.hand_threshold) {
            self.relax_all(rig, skeleton);
            return;
        }

        // 右手はX反転して左手と同じキラリティで扱う
        let mirror = self.side == Side::Right;
        let lm = |i: HandLandmark| {
            let p = source.hand(self.side, i).position();
            if mirror {
                Vector3::new(-p.x, p.y, p.z)
            } else {
                p
            }
        };

        // 手の平面軸を再計算（手首の姿勢は前腕と独立に決める）
        let wrist = lm(HandLandmark::Wrist);
        let index = lm(HandLandmark::IndexMcp);
        let middle = lm(HandLandmark::MiddleMcp);
        let forward = middle - wrist;
        let up = (index - wrist).cross(&forward);

        if !is_finite_vec(&forward)
            || !is_finite_vec(&up)
            || forward.norm_squared() < EPS
            || up.norm_squared() < EPS
        {
            // 縮退した手: 信号なしとして前フレームの姿勢を保つ
            return;
        }
        let up = up.normalize();

        let hand_bone = BoneId::hand(self.side);
        let look_wrist = look_rotation(&forward, &up);
        let written = drive_bone(
            rig,
            skeleton,
            hand_bone,
            look_wrist,
            true,
            config.lerp_percentage,
            dt,
        );

        // 前腕を手首姿勢へ20%だけ追従させる
        if let Some(wrist_world) = written {
            let forearm = BoneId::lower_arm(self.side);
            if rig.is_bound(forearm) {
                let current = skeleton.orientation(forearm.name());
                skeleton.set_orientation(
                    forearm.name(),
                    slerp_shortest(&current, &wrist_world, FOREARM_FOLLOW),
                );
            }
        }

        // 指15セグメント
        let score_ok = source.hand_score(self.side) >= config.hand_threshold;
        let chains = BoneId::finger_chains(self.side);
        for (digit, bones) in DIGIT_CHAINS.iter().zip(chains.iter()) {
            for (seg, &bone) in bones.iter().enumerate() {
                let dir = lm(digit[seg + 1]) - lm(digit[seg]);
                let look = look_rotation(&dir, &up);
                drive_bone(rig, skeleton, bone, look, score_ok, config.lerp_percentage, dt);
            }
        }
    }

    /// 手全体をレスト姿勢へ緩和する
    pub fn relax_all<S: AvatarSkeleton>(&self, rig: &Rig, skeleton: &mut S) {
        relax_bone(rig, skeleton, BoneId::hand(self.side));
        for chain in BoneId::finger_chains(self.side) {
            for bone in chain {
                relax_bone(rig, skeleton, bone);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterTuning;
    use crate::landmark::{Landmark, LandmarkFrame};
    use crate::skeleton::SimpleSkeleton;
    use nalgebra::UnitQuaternion;

    const DT: f32 = 1.0 / 30.0;

    fn set_hand(frame: &mut LandmarkFrame, side: Side, i: HandLandmark, pos: [f32; 3]) {
        frame.hands[side.index()][i as usize] = Landmark::new(pos[0], pos[1], pos[2], 1.0);
    }

    /// レスト（Tポーズの開いた手のひら）に一致する手フレーム
    ///
    /// 左手キラリティで作る。右手側にも同じ値を入れる（ソルバが反転する）。
    fn rest_hand_frame(wrist_conf: f32) -> LandmarkFrame {
        use HandLandmark::*;
        let mut f = LandmarkFrame::default();
        f.body[BodyLandmark::LeftWrist as usize] = Landmark::new(0.68, 1.34, 0.0, wrist_conf);
        f.body[BodyLandmark::RightWrist as usize] = Landmark::new(-0.68, 1.34, 0.0, wrist_conf);
        f.hand_scores = [0.9, 0.9];

        for side in Side::BOTH {
            set_hand(&mut f, side, Wrist, [0.68, 1.34, 0.0]);
            let digits: [(HandLandmark, f32); 5] = [
                (ThumbCmc, 0.04),
                (IndexMcp, 0.02),
                (MiddleMcp, 0.0),
                (RingMcp, -0.02),
                (LittleMcp, -0.04),
            ];
            for (base, z) in digits {
                let b = base as usize;
                for (seg, x) in [0.73f32, 0.765, 0.80, 0.83].iter().enumerate() {
                    f.hands[side.index()][b + seg] = Landmark::new(*x, 1.34, z, 1.0);
                }
            }
        }
        f
    }

    fn setup() -> (Rig, SimpleSkeleton) {
        let skeleton = SimpleSkeleton::default_humanoid();
        let rig = Rig::build(&skeleton, &FilterTuning::default()).unwrap();
        (rig, skeleton)
    }

    #[test]
    fn test_rest_hand_keeps_rest_pose() {
        let (mut rig, mut skeleton) = setup();
        let frame = rest_hand_frame(0.9);
        let config = RetargetConfig::default();

        for side in Side::BOTH {
            let solver = HandSolver::new(side);
            for _ in 0..60 {
                solver.solve(&mut rig, &frame, &mut skeleton, &config, DT);
            }
        }

        for bone in [
            BoneId::LeftHand,
            BoneId::RightHand,
            BoneId::LeftMiddleProximal,
            BoneId::RightIndexIntermediate,
        ] {
            let rest = rig.joint(bone).unwrap().rest;
            let angle = skeleton.orientation(bone.name()).angle_to(&rest);
            assert!(angle < 0.2, "{} drifted {} rad", bone.name(), angle);
        }
    }

    #[test]
    fn test_flat_palm_facing_camera_aligns_wrist() {
        let (mut rig, mut skeleton) = setup();
        // 指を上(+Y)、手のひらをカメラ(+Z)へ向けた開いた手
        use HandLandmark::*;
        let mut frame = rest_hand_frame(0.9);
        set_hand(&mut frame, Side::Left, Wrist, [0.68, 1.34, 0.0]);
        let digits: [(HandLandmark, f32); 5] = [
            (ThumbCmc, -0.04),
            (IndexMcp, -0.02),
            (MiddleMcp, 0.0),
            (RingMcp, 0.02),
            (LittleMcp, 0.04),
        ];
        for (base, dx) in digits {
            let b = base as usize;
            for (seg, y) in [1.39f32, 1.425, 1.46, 1.49].iter().enumerate() {
                frame.hands[Side::Left.index()][b + seg] =
                    Landmark::new(0.68 - dx, *y, 0.0, 1.0);
            }
        }

        let config = RetargetConfig::default();
        let solver = HandSolver::new(Side::Left);
        for _ in 0..150 {
            solver.solve(&mut rig, &frame, &mut skeleton, &config, DT);
        }

        // レスト時の手のひら法線(+Y)が書き込まれた姿勢で+Z(カメラ方向)を向く
        let wrist = skeleton.orientation("LeftHand");
        let palm_normal = wrist * Vector3::y();
        let deviation = palm_normal.angle(&Vector3::z()).to_degrees();
        assert!(deviation < 5.0, "palm normal off by {} deg", deviation);
    }

    #[test]
    fn test_weak_wrist_relaxes_whole_hand() {
        let (mut rig, mut skeleton) = setup();
        skeleton.set_orientation(
            "LeftMiddleProximal",
            UnitQuaternion::from_euler_angles(0.0, 0.8, 0.0),
        );
        skeleton.set_orientation("LeftHand", UnitQuaternion::from_euler_angles(0.5, 0.0, 0.0));

        let frame = rest_hand_frame(0.1);
        let config = RetargetConfig::default();
        let solver = HandSolver::new(Side::Left);
        for _ in 0..150 {
            solver.solve(&mut rig, &frame, &mut skeleton, &config, DT);
        }

        for bone in [BoneId::LeftHand, BoneId::LeftMiddleProximal] {
            let rest = rig.joint(bone).unwrap().rest;
            let angle = skeleton.orientation(bone.name()).angle_to(&rest);
            assert!(angle < 1e-2, "{} residual {}", bone.name(), angle);
        }
    }

    #[test]
    fn test_forearm_follows_wrist() {
        let (mut rig, mut skeleton) = setup();
        use HandLandmark::*;
        // 手のひらを上へ返す: 平面法線が+Yから+Z寄りへ
        let mut frame = rest_hand_frame(0.9);
        set_hand(&mut frame, Side::Left, IndexMcp, [0.73, 1.36, 0.02]);
        set_hand(&mut frame, Side::Left, MiddleMcp, [0.73, 1.36, 0.0]);

        let forearm_rest = rig.joint(BoneId::LeftLowerArm).unwrap().rest;
        let config = RetargetConfig::default();
        let solver = HandSolver::new(Side::Left);
        for _ in 0..60 {
            solver.solve(&mut rig, &frame, &mut skeleton, &config, DT);
        }

        // 前腕が手首に引っ張られてレストから動く
        let angle = skeleton.orientation("LeftLowerArm").angle_to(&forearm_rest);
        assert!(angle > 0.05, "forearm did not follow, moved {} rad", angle);
    }

    #[test]
    fn test_low_hand_score_relaxes_fingers_but_not_wrist() {
        let (mut rig, mut skeleton) = setup();
        let mut frame = rest_hand_frame(0.9);
        frame.hand_scores = [0.1, 0.1];
        // 指を曲げた位置にしても、スコアが低ければレストへ向かう
        set_hand(&mut frame, Side::Left, HandLandmark::IndexTip, [0.78, 1.30, 0.06]);
        skeleton.set_orientation(
            "LeftIndexDistal",
            UnitQuaternion::from_euler_angles(0.0, 0.7, 0.0),
        );

        let config = RetargetConfig::default();
        let solver = HandSolver::new(Side::Left);
        for _ in 0..150 {
            solver.solve(&mut rig, &frame, &mut skeleton, &config, DT);
        }

        let rest = rig.joint(BoneId::LeftIndexDistal).unwrap().rest;
        let angle = skeleton.orientation("LeftIndexDistal").angle_to(&rest);
        assert!(angle < 1e-2, "finger residual {}", angle);
    }
}
