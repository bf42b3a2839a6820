use anyhow::Result;
use tracing::debug;

use crate::config::{CaptureMode, RetargetConfig};
use crate::landmark::{LandmarkSource, Side};
use crate::rig::Rig;
use crate::skeleton::{AvatarSkeleton, ExpressionRig};
use crate::solver::{relax_bone, FaceSolver, HandSolver, PoseSolver};

/// リターゲティングコア
///
/// アバター1体につき1インスタンス。毎描画フレームにupdateを1回
/// 呼ぶ同期・単一スレッド設計で、内部にスロットリングは持たない。
/// モード変更はフレーム間で検出し、リセットフレームを1枚挟んでから
/// 新しいモードの解決を始める（ポップ防止）。
pub struct RetargetingCore {
    rig: Rig,
    pose: PoseSolver,
    left_hand: HandSolver,
    right_hand: HandSolver,
    face: FaceSolver,
    prev_mode: CaptureMode,
    prev_upper_body_only: bool,
}

impl RetargetingCore {
    /// アバターへバインドしてリグを構築する
    ///
    /// 失敗しうるのはここだけ（胴体ボーンが1本もない等）。
    pub fn bind<S: AvatarSkeleton>(skeleton: &S, config: &RetargetConfig) -> Result<Self> {
        let rig = Rig::build(skeleton, &config.filter)?;
        Ok(Self {
            rig,
            pose: PoseSolver::new(&config.filter),
            left_hand: HandSolver::new(Side::Left),
            right_hand: HandSolver::new(Side::Right),
            face: FaceSolver::new(&config.filter),
            prev_mode: config.mode,
            prev_upper_body_only: config.upper_body_only,
        })
    }

    /// 1フレーム分の解決
    ///
    /// dtは正の前フレーム間隔（秒）。呼び出し側がレート制御する。
    pub fn update<L, S, E>(
        &mut self,
        source: &L,
        skeleton: &mut S,
        expressions: &mut E,
        dt: f32,
        config: &RetargetConfig,
    ) where
        L: LandmarkSource,
        S: AvatarSkeleton,
        E: ExpressionRig,
    {
        if config.mode != self.prev_mode || config.upper_body_only != self.prev_upper_body_only
        {
            debug!(mode = ?config.mode, "mode change, reset frame");
            self.prev_mode = config.mode;
            self.prev_upper_body_only = config.upper_body_only;
            self.reset_toward_rest(skeleton);
            return;
        }

        if config.mode.includes_pose() {
            self.pose.solve(
                &mut self.rig,
                source,
                skeleton,
                config,
                config.mode.includes_face(),
                dt,
            );
        }
        if config.mode.includes_hands() {
            self.left_hand
                .solve(&mut self.rig, source, skeleton, config, dt);
            self.right_hand
                .solve(&mut self.rig, source, skeleton, config, dt);
        }
        if config.mode.includes_face() {
            self.face.solve(source, expressions, config, dt);
        }
    }

    /// リセットフレーム: 全フィルタ・較正を初期化し、バインド済みの
    /// 全ボーンをレスト方向へ1段階緩和する
    fn reset_toward_rest<S: AvatarSkeleton>(&mut self, skeleton: &mut S) {
        self.rig.reset_filters();
        self.pose.reset();
        self.face.reset();
        for bone in self.rig.bound_bones() {
            relax_bone(&self.rig, skeleton, bone);
        }
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureMode;
    use crate::landmark::{BodyLandmark, Landmark, LandmarkFrame};
    use crate::skeleton::{BoneId, SimpleSkeleton};
    use nalgebra::UnitQuaternion;

    const DT: f32 = 1.0 / 30.0;

    fn set_body(frame: &mut LandmarkFrame, i: BodyLandmark, pos: [f32; 3], conf: f32) {
        frame.body[i as usize] = Landmark::new(pos[0], pos[1], pos[2], conf);
    }

    /// 直立・開いた手・中立顔のフレーム
    fn full_frame(conf: f32) -> LandmarkFrame {
        use BodyLandmark::*;
        let mut f = LandmarkFrame::default();
        f.face_score = 0.9;
        f.hand_scores = [0.9, 0.9];

        for (i, pos) in [
            (Nose, [0.0, 1.55, 0.08]),
            (LeftEye, [0.03, 1.57, 0.07]),
            (RightEye, [-0.03, 1.57, 0.07]),
            (LeftEar, [0.07, 1.55, 0.0]),
            (RightEar, [-0.07, 1.55, 0.0]),
            (MouthLeft, [0.02, 1.50, 0.07]),
            (MouthRight, [-0.02, 1.50, 0.07]),
            (LeftShoulder, [0.16, 1.34, 0.0]),
            (RightShoulder, [-0.16, 1.34, 0.0]),
            (LeftElbow, [0.42, 1.34, 0.0]),
            (RightElbow, [-0.42, 1.34, 0.0]),
            (LeftWrist, [0.68, 1.34, 0.0]),
            (RightWrist, [-0.68, 1.34, 0.0]),
            (LeftHip, [0.09, 0.86, 0.0]),
            (RightHip, [-0.09, 0.86, 0.0]),
            (LeftKnee, [0.09, 0.48, 0.0]),
            (RightKnee, [-0.09, 0.48, 0.0]),
            (LeftAnkle, [0.09, 0.10, 0.0]),
            (RightAnkle, [-0.09, 0.10, 0.0]),
            (LeftFootIndex, [0.09, 0.02, 0.12]),
            (RightFootIndex, [-0.09, 0.02, 0.12]),
        ] {
            set_body(&mut f, i, pos, conf);
        }

        // 手: レスト一致の開いた手のひら（左手キラリティ）
        for side in Side::BOTH {
            f.hands[side.index()][0] = Landmark::new(0.68, 1.34, 0.0, 1.0);
            let digits: [(usize, f32); 5] =
                [(1, 0.04), (5, 0.02), (9, 0.0), (13, -0.02), (17, -0.04)];
            for (base, z) in digits {
                for (seg, x) in [0.73f32, 0.765, 0.80, 0.83].iter().enumerate() {
                    f.hands[side.index()][base + seg] = Landmark::new(*x, 1.34, z, 1.0);
                }
            }
        }

        // 顔: 中立の目・口
        use crate::landmark::face;
        let fa = |f: &mut LandmarkFrame, i: usize, p: [f32; 3]| {
            f.face[i] = Landmark::new(p[0], p[1], p[2], 1.0);
        };
        fa(&mut f, face::FOREHEAD, [0.0, 1.60, 0.07]);
        fa(&mut f, face::CHIN, [0.0, 1.44, 0.07]);
        fa(&mut f, face::CHEEK_LEFT, [0.07, 1.52, 0.02]);
        fa(&mut f, face::CHEEK_RIGHT, [-0.07, 1.52, 0.02]);
        fa(&mut f, face::LEFT_EYE_INNER, [0.02, 1.54, 0.06]);
        fa(&mut f, face::RIGHT_EYE_INNER, [-0.02, 1.54, 0.06]);
        fa(&mut f, face::LEFT_EYE_OUTER, [0.05, 1.54, 0.05]);
        fa(&mut f, face::RIGHT_EYE_OUTER, [-0.05, 1.54, 0.05]);
        fa(&mut f, face::UPPER_LIP_INNER, [0.0, 1.49, 0.07]);
        fa(&mut f, face::LOWER_LIP_INNER, [0.0, 1.486, 0.07]);
        fa(&mut f, face::MOUTH_CORNER_LEFT, [0.025, 1.485, 0.06]);
        fa(&mut f, face::MOUTH_CORNER_RIGHT, [-0.025, 1.485, 0.06]);
        fa(&mut f, face::LEFT_IRIS_CENTER, [0.035, 1.54, 0.06]);
        fa(&mut f, face::RIGHT_IRIS_CENTER, [-0.035, 1.54, 0.06]);

        use crate::landmark::face::eye::*;
        for side in Side::BOTH {
            let sign = if side == Side::Left { 1.0f32 } else { -1.0 };
            let e = &mut f.eyes[side.index()];
            e[OUTER_CORNER] = Landmark::new(sign * 0.05, 1.54, 0.05, 1.0);
            e[INNER_CORNER] = Landmark::new(sign * 0.02, 1.54, 0.06, 1.0);
            e[UPPER_OUTER] = Landmark::new(sign * 0.04, 1.548, 0.055, 1.0);
            e[UPPER_MID] = Landmark::new(sign * 0.035, 1.548, 0.055, 1.0);
            e[UPPER_INNER] = Landmark::new(sign * 0.03, 1.548, 0.055, 1.0);
            e[LOWER_INNER] = Landmark::new(sign * 0.03, 1.532, 0.055, 1.0);
            e[LOWER_MID] = Landmark::new(sign * 0.035, 1.532, 0.055, 1.0);
            e[LOWER_OUTER] = Landmark::new(sign * 0.04, 1.532, 0.055, 1.0);
        }
        f
    }

    fn raised_arm_frame() -> LandmarkFrame {
        let mut f = full_frame(0.9);
        set_body(&mut f, BodyLandmark::LeftElbow, [0.20, 1.60, 0.0], 0.9);
        set_body(&mut f, BodyLandmark::LeftWrist, [0.22, 1.85, 0.0], 0.9);
        f
    }

    #[test]
    fn test_bind_fails_without_torso() {
        let mut skeleton = SimpleSkeleton::default_humanoid();
        for name in ["Hips", "Spine", "Chest", "UpperChest", "Neck", "Head"] {
            skeleton.remove_bone(name);
        }
        assert!(RetargetingCore::bind(&skeleton, &RetargetConfig::default()).is_err());
    }

    #[test]
    fn test_full_pipeline_stays_near_rest() {
        let mut skeleton = SimpleSkeleton::default_humanoid();
        let config = RetargetConfig::default();
        let mut core = RetargetingCore::bind(&skeleton, &config).unwrap();
        let frame = full_frame(0.9);

        let mut expressions = SimpleSkeleton::new();
        for _ in 0..60 {
            core.update(&frame, &mut skeleton, &mut expressions, DT, &config);
        }

        for bone in [
            BoneId::Hips,
            BoneId::Head,
            BoneId::LeftUpperArm,
            BoneId::LeftHand,
            BoneId::LeftUpperLeg,
        ] {
            let rest = core.rig().joint(bone).unwrap().rest;
            let angle = skeleton.orientation(bone.name()).angle_to(&rest);
            assert!(angle < 0.25, "{} drifted {} rad", bone.name(), angle);
        }
        // 表情チャンネルは値域内
        use crate::solver::face::{CH_BLINK_L, CH_VISEME_A};
        assert!((0.0..=1.0).contains(&expressions.expression(CH_BLINK_L)));
        assert!((0.0..=1.0).contains(&expressions.expression(CH_VISEME_A)));
    }

    #[test]
    fn test_mode_switch_resets_toward_rest() {
        let mut skeleton = SimpleSkeleton::default_humanoid();
        let mut config = RetargetConfig::default();
        config.mode = CaptureMode::PoseOnly;
        let mut core = RetargetingCore::bind(&skeleton, &config).unwrap();

        // 腕を上げた状態へ収束させる
        let frame = raised_arm_frame();
        let mut expressions = SimpleSkeleton::new();
        for _ in 0..90 {
            core.update(&frame, &mut skeleton, &mut expressions, DT, &config);
        }
        let rest = core.rig().joint(BoneId::LeftUpperArm).unwrap().rest;
        let before = skeleton.orientation("LeftUpperArm").angle_to(&rest);
        assert!(before > 0.5, "arm should be raised, {}", before);

        // モード変更: リセットフレームでは新しい目標ではなくレストへ動く
        config.mode = CaptureMode::Full;
        core.update(&frame, &mut skeleton, &mut expressions, DT, &config);
        let after = skeleton.orientation("LeftUpperArm").angle_to(&rest);
        assert!(after < before, "reset frame must move toward rest: {} -> {}", before, after);

        // 次のフレームからは通常解決が再開する
        core.update(&frame, &mut skeleton, &mut expressions, DT, &config);
    }

    #[test]
    fn test_upper_body_flag_change_resets() {
        let mut skeleton = SimpleSkeleton::default_humanoid();
        let mut config = RetargetConfig::default();
        config.mode = CaptureMode::PoseOnly;
        let mut core = RetargetingCore::bind(&skeleton, &config).unwrap();
        let frame = raised_arm_frame();
        let mut expressions = SimpleSkeleton::new();
        for _ in 0..90 {
            core.update(&frame, &mut skeleton, &mut expressions, DT, &config);
        }
        let rest = core.rig().joint(BoneId::LeftUpperArm).unwrap().rest;
        let before = skeleton.orientation("LeftUpperArm").angle_to(&rest);

        config.upper_body_only = true;
        core.update(&frame, &mut skeleton, &mut expressions, DT, &config);
        let after = skeleton.orientation("LeftUpperArm").angle_to(&rest);
        assert!(after < before);
    }

    #[test]
    fn test_face_only_skips_pose_and_hands() {
        let mut skeleton = SimpleSkeleton::default_humanoid();
        let mut config = RetargetConfig::default();
        config.mode = CaptureMode::FaceOnly;
        let mut core = RetargetingCore::bind(&skeleton, &config).unwrap();

        let start = UnitQuaternion::from_euler_angles(0.0, 0.5, 0.0);
        skeleton.set_orientation("LeftUpperArm", start);
        skeleton.set_orientation("LeftHand", start);

        let frame = full_frame(0.9);
        let mut expressions = SimpleSkeleton::new();
        for _ in 0..30 {
            core.update(&frame, &mut skeleton, &mut expressions, DT, &config);
        }

        // ボーンは一切触らない
        assert!(skeleton.orientation("LeftUpperArm").angle_to(&start) < 1e-6);
        assert!(skeleton.orientation("LeftHand").angle_to(&start) < 1e-6);
    }

    #[test]
    fn test_pose_only_skips_expressions() {
        let mut skeleton = SimpleSkeleton::default_humanoid();
        let mut config = RetargetConfig::default();
        config.mode = CaptureMode::PoseOnly;
        let mut core = RetargetingCore::bind(&skeleton, &config).unwrap();

        let frame = full_frame(0.9);
        let mut expressions = SimpleSkeleton::new();
        for _ in 0..30 {
            core.update(&frame, &mut skeleton, &mut expressions, DT, &config);
        }
        use crate::solver::face::CH_BLINK_L;
        assert_eq!(expressions.expression(CH_BLINK_L), 0.0);
    }
}
