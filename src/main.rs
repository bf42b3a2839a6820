use std::f32::consts::TAU;

use kagami::config::RetargetConfig;
use kagami::landmark::face;
use kagami::landmark::{BodyLandmark, Landmark, LandmarkFrame, Side};
use kagami::retarget::RetargetingCore;
use kagami::skeleton::{AvatarSkeleton, SimpleSkeleton};
use kagami::solver::face::{CH_BLINK_L, CH_VISEME_A};

/// 合成ランドマークのデモ
///
/// カメラも推論エンジンも使わず、直立姿勢 + 左腕の振り +
/// 周期的なまばたきを合成してコアへ流し込む。
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== kagami 合成ランドマークデモ ({}) ===", env!("GIT_VERSION"));

    let mut skeleton = SimpleSkeleton::default_humanoid();
    let mut expressions = SimpleSkeleton::new();
    let config = RetargetConfig::default();
    let mut core = RetargetingCore::bind(&skeleton, &config)?;

    let dt = 1.0 / 30.0;
    for frame_no in 0..300u32 {
        let t = frame_no as f32 * dt;
        let frame = synth_frame(t);
        core.update(&frame, &mut skeleton, &mut expressions, dt, &config);

        if frame_no % 30 == 0 {
            let (roll, pitch, yaw) = skeleton.orientation("LeftUpperArm").euler_angles();
            println!(
                "t={:4.1}s 左上腕 rpy=({:6.1},{:6.1},{:6.1})deg まばたき={:.2} A={:.2}",
                t,
                roll.to_degrees(),
                pitch.to_degrees(),
                yaw.to_degrees(),
                expressions.expression(CH_BLINK_L),
                expressions.expression(CH_VISEME_A),
            );
        }
    }

    Ok(())
}

fn set_body(frame: &mut LandmarkFrame, i: BodyLandmark, pos: [f32; 3]) {
    frame.body[i as usize] = Landmark::new(pos[0], pos[1], pos[2], 0.9);
}

fn set_face(frame: &mut LandmarkFrame, i: usize, pos: [f32; 3]) {
    frame.face[i] = Landmark::new(pos[0], pos[1], pos[2], 1.0);
}

/// 時刻tの合成フレームを作る
fn synth_frame(t: f32) -> LandmarkFrame {
    use BodyLandmark::*;
    let mut f = LandmarkFrame::default();
    f.face_score = 0.9;
    f.hand_scores = [0.9, 0.9];

    // 直立の体幹・右腕・脚
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
        (RightElbow, [-0.42, 1.34, 0.0]),
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
        set_body(&mut f, i, pos);
    }

    // 左腕を上下に振る（肩を支点に±60度）
    let swing = (t * TAU / 4.0).sin() * 60.0f32.to_radians();
    let (sin, cos) = swing.sin_cos();
    let shoulder = [0.16f32, 1.34, 0.0];
    let elbow = [shoulder[0] + 0.26 * cos, shoulder[1] + 0.26 * sin, 0.0];
    let wrist = [shoulder[0] + 0.52 * cos, shoulder[1] + 0.52 * sin, 0.0];
    set_body(&mut f, LeftElbow, elbow);
    set_body(&mut f, LeftWrist, wrist);

    // 手: 開いた手のひら（左手キラリティで両手分）
    for side in Side::BOTH {
        f.hands[side.index()][0] = Landmark::new(0.68, 1.34, 0.0, 1.0);
        let digits: [(usize, f32); 5] = [(1, 0.04), (5, 0.02), (9, 0.0), (13, -0.02), (17, -0.04)];
        for (base, z) in digits {
            for (seg, x) in [0.73f32, 0.765, 0.80, 0.83].iter().enumerate() {
                f.hands[side.index()][base + seg] = Landmark::new(*x, 1.34, z, 1.0);
            }
        }
    }

    // 顔: 3秒周期で0.2秒のまばたき
    let blinking = (t % 3.0) < 0.2;
    let half_lid = if blinking { 0.001 } else { 0.008 };

    set_face(&mut f, face::FOREHEAD, [0.0, 1.60, 0.07]);
    set_face(&mut f, face::CHIN, [0.0, 1.44, 0.07]);
    set_face(&mut f, face::CHEEK_LEFT, [0.07, 1.52, 0.02]);
    set_face(&mut f, face::CHEEK_RIGHT, [-0.07, 1.52, 0.02]);
    set_face(&mut f, face::LEFT_EYE_INNER, [0.02, 1.54, 0.06]);
    set_face(&mut f, face::RIGHT_EYE_INNER, [-0.02, 1.54, 0.06]);
    set_face(&mut f, face::LEFT_EYE_OUTER, [0.05, 1.54, 0.05]);
    set_face(&mut f, face::RIGHT_EYE_OUTER, [-0.05, 1.54, 0.05]);
    set_face(&mut f, face::UPPER_LIP_INNER, [0.0, 1.49, 0.07]);
    set_face(&mut f, face::LOWER_LIP_INNER, [0.0, 1.486, 0.07]);
    set_face(&mut f, face::MOUTH_CORNER_LEFT, [0.025, 1.485, 0.06]);
    set_face(&mut f, face::MOUTH_CORNER_RIGHT, [-0.025, 1.485, 0.06]);
    set_face(&mut f, face::LEFT_IRIS_CENTER, [0.035, 1.54, 0.06]);
    set_face(&mut f, face::RIGHT_IRIS_CENTER, [-0.035, 1.54, 0.06]);

    use face::eye::*;
    for side in Side::BOTH {
        let sign = if side == Side::Left { 1.0f32 } else { -1.0 };
        let e = &mut f.eyes[side.index()];
        e[OUTER_CORNER] = Landmark::new(sign * 0.05, 1.54, 0.05, 1.0);
        e[INNER_CORNER] = Landmark::new(sign * 0.02, 1.54, 0.06, 1.0);
        e[UPPER_OUTER] = Landmark::new(sign * 0.04, 1.54 + half_lid, 0.055, 1.0);
        e[UPPER_MID] = Landmark::new(sign * 0.035, 1.54 + half_lid, 0.055, 1.0);
        e[UPPER_INNER] = Landmark::new(sign * 0.03, 1.54 + half_lid, 0.055, 1.0);
        e[LOWER_INNER] = Landmark::new(sign * 0.03, 1.54 - half_lid, 0.055, 1.0);
        e[LOWER_MID] = Landmark::new(sign * 0.035, 1.54 - half_lid, 0.055, 1.0);
        e[LOWER_OUTER] = Landmark::new(sign * 0.04, 1.54 - half_lid, 0.055, 1.0);
    }

    f
}
