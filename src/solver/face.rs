use super::RELAX_RATE;
use crate::config::{FilterTuning, RetargetConfig};
use crate::filter::ScalarFilter;
use crate::landmark::{face, LandmarkSource, Side};
use crate::quat::{inverse_lerp, sanitize, EPS};
use crate::skeleton::ExpressionRig;

/// 表情チャンネル名
pub const CH_BLINK_L: &str = "Blink_L";
pub const CH_BLINK_R: &str = "Blink_R";
pub const CH_GAZE_YAW_L: &str = "GazeYaw_L";
pub const CH_GAZE_PITCH_L: &str = "GazePitch_L";
pub const CH_GAZE_YAW_R: &str = "GazeYaw_R";
pub const CH_GAZE_PITCH_R: &str = "GazePitch_R";
pub const CH_VISEME_A: &str = "A";
pub const CH_VISEME_I: &str = "I";
pub const CH_VISEME_U: &str = "U";
pub const CH_VISEME_E: &str = "E";
pub const CH_VISEME_O: &str = "O";

/// 視線チャンネルの可動域（度）。チャンネル値はこの範囲の角度
pub const MAX_GAZE_YAW_DEG: f32 = 40.0;
pub const MAX_GAZE_PITCH_DEG: f32 = 20.0;

/// まばたきレンジの1フレームあたりのドリフト量
const RANGE_DRIFT: f32 = 0.002;
/// レンジの最小スパン（縮退防止）
const MIN_RANGE_SPAN: f32 = 0.05;

/// ゆっくりドリフトする開眼率レンジ
///
/// minは上へ、maxは下へ毎フレーム緩むため、照明や距離の変化に
/// 数秒で再適応する。
struct EyeRange {
    min: f32,
    max: f32,
}

impl EyeRange {
    fn new() -> Self {
        // minを0始まりにすると、最初のまばたきで較正が済むまでは
        // 開眼側に倒れる（閉眼側に倒れるより見た目の破綻が小さい）
        Self {
            min: 0.0,
            max: f32::NEG_INFINITY,
        }
    }

    /// 比を取り込んで正規化開眼率 (0..1) を返す
    fn update(&mut self, ratio: f32) -> f32 {
        self.min = self.min.min(ratio) + RANGE_DRIFT;
        self.max = (self.max.max(ratio) - RANGE_DRIFT).max(self.min + MIN_RANGE_SPAN);
        inverse_lerp(self.min, self.max, ratio)
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// 書き込み済みチャンネル値（顔ロスト時の減衰用に保持）
#[derive(Default, Clone, Copy)]
struct Channels {
    blink: [f32; 2],
    gaze_yaw: [f32; 2],
    gaze_pitch: [f32; 2],
    viseme: [f32; 5],
}

impl Channels {
    fn write_all<E: ExpressionRig>(&self, expressions: &mut E) {
        expressions.set_expression(CH_BLINK_L, self.blink[0]);
        expressions.set_expression(CH_BLINK_R, self.blink[1]);
        expressions.set_expression(CH_GAZE_YAW_L, self.gaze_yaw[0]);
        expressions.set_expression(CH_GAZE_YAW_R, self.gaze_yaw[1]);
        expressions.set_expression(CH_GAZE_PITCH_L, self.gaze_pitch[0]);
        expressions.set_expression(CH_GAZE_PITCH_R, self.gaze_pitch[1]);
        let names = [CH_VISEME_A, CH_VISEME_I, CH_VISEME_U, CH_VISEME_E, CH_VISEME_O];
        for (name, value) in names.into_iter().zip(self.viseme) {
            expressions.set_expression(name, value);
        }
    }

    fn decay(&mut self, rate: f32) {
        let k = 1.0 - rate;
        for v in self
            .blink
            .iter_mut()
            .chain(self.gaze_yaw.iter_mut())
            .chain(self.gaze_pitch.iter_mut())
            .chain(self.viseme.iter_mut())
        {
            *v *= k;
        }
    }
}

/// 顔ソルバ
///
/// まばたき・視線・口形の3推定器。それぞれ独立に平滑化して
/// 表情チャンネルへ書く。ボーンには触らない。
pub struct FaceSolver {
    ranges: [EyeRange; 2],
    blink_filters: [ScalarFilter; 2],
    gaze_yaw_filters: [ScalarFilter; 2],
    gaze_pitch_filters: [ScalarFilter; 2],
    viseme_filters: [ScalarFilter; 5],
    last: Channels,
}

impl FaceSolver {
    pub fn new(tuning: &FilterTuning) -> Self {
        let expr = |_: usize| ScalarFilter::new(tuning.expression_cutoff, 0.0);
        let gaze = |_: usize| ScalarFilter::new(1.0, tuning.gaze_beta);
        Self {
            ranges: [EyeRange::new(), EyeRange::new()],
            blink_filters: std::array::from_fn(expr),
            gaze_yaw_filters: std::array::from_fn(gaze),
            gaze_pitch_filters: std::array::from_fn(gaze),
            viseme_filters: std::array::from_fn(expr),
            last: Channels::default(),
        }
    }

    pub fn reset(&mut self) {
        for r in &mut self.ranges {
            r.reset();
        }
        for f in self
            .blink_filters
            .iter_mut()
            .chain(self.gaze_yaw_filters.iter_mut())
            .chain(self.gaze_pitch_filters.iter_mut())
            .chain(self.viseme_filters.iter_mut())
        {
            f.reset();
        }
        self.last = Channels::default();
    }

    pub fn solve<L: LandmarkSource, E: ExpressionRig>(
        &mut self,
        source: &L,
        expressions: &mut E,
        config: &RetargetConfig,
        dt: f32,
    ) {
        // 顔ロスト: 全チャンネルをニュートラルへ減衰させる
        if !(source.face_score() >= config.face_threshold) {
            self.last.decay(RELAX_RATE);
            self.last.write_all(expressions);
            return;
        }

        for side in Side::BOTH {
            self.solve_blink(source, side, config, dt);
            self.solve_gaze(source, side, dt);
        }
        self.solve_viseme(source, dt);
        self.last.write_all(expressions);
    }

    /// まばたき: 6点の目縦横比 + 適応レンジ + スナップ
    fn solve_blink<L: LandmarkSource>(
        &mut self,
        source: &L,
        side: Side,
        config: &RetargetConfig,
        dt: f32,
    ) {
        use face::eye;
        let e = |i: usize| source.eye(side, i).position();

        let width = (e(eye::OUTER_CORNER) - e(eye::INNER_CORNER)).norm().max(EPS);
        let lid = (e(eye::UPPER_OUTER) - e(eye::LOWER_OUTER)).norm()
            + (e(eye::UPPER_INNER) - e(eye::LOWER_INNER)).norm();
        let ratio = sanitize(lid / (2.0 * width), 0.0);

        let openness = self.ranges[side.index()].update(ratio);
        // スナップ: 閾値未満は完全閉眼、超過は完全開眼、間は線形
        let openness = if openness < config.blink.closed_below {
            0.0
        } else if openness > config.blink.open_above {
            1.0
        } else {
            inverse_lerp(config.blink.closed_below, config.blink.open_above, openness)
        };
        let intensity = 1.0 - openness;

        let smoothed = self.blink_filters[side.index()]
            .filter(intensity, dt)
            .clamp(0.0, 1.0);
        self.last.blink[side.index()] = smoothed;
    }

    /// 視線: 虹彩の目枠中心からのオフセットを角度域へ写像
    fn solve_gaze<L: LandmarkSource>(&mut self, source: &L, side: Side, dt: f32) {
        use face::eye;
        let e = |i: usize| source.eye(side, i).position();
        let iris_index = match side {
            Side::Left => face::LEFT_IRIS_CENTER,
            Side::Right => face::RIGHT_IRIS_CENTER,
        };
        let iris = source.face(iris_index).position();

        let center = (e(eye::OUTER_CORNER) + e(eye::INNER_CORNER)) * 0.5;
        let width = (e(eye::OUTER_CORNER) - e(eye::INNER_CORNER)).norm().max(EPS);
        let height = (e(eye::UPPER_MID) - e(eye::LOWER_MID)).norm().max(EPS);

        let dx = sanitize((iris.x - center.x) / (width * 0.5), 0.0).clamp(-1.0, 1.0);
        let dy = sanitize((iris.y - center.y) / (height * 0.5), 0.0).clamp(-1.0, 1.0);

        let yaw = self.gaze_yaw_filters[side.index()].filter(dx * MAX_GAZE_YAW_DEG, dt);
        let pitch = self.gaze_pitch_filters[side.index()].filter(dy * MAX_GAZE_PITCH_DEG, dt);
        self.last.gaze_yaw[side.index()] = yaw.clamp(-MAX_GAZE_YAW_DEG, MAX_GAZE_YAW_DEG);
        self.last.gaze_pitch[side.index()] =
            pitch.clamp(-MAX_GAZE_PITCH_DEG, MAX_GAZE_PITCH_DEG);
    }

    /// 口形: 口の開き・幅を目間距離で正規化し、固定の非線形ブレンドで
    /// 5母音の強度へ分配する（スケール不変）
    fn solve_viseme<L: LandmarkSource>(&mut self, source: &L, dt: f32) {
        let fa = |i: usize| source.face(i).position();

        let eye_inner = (fa(face::LEFT_EYE_INNER) - fa(face::RIGHT_EYE_INNER))
            .norm()
            .max(EPS);
        let eye_outer = (fa(face::LEFT_EYE_OUTER) - fa(face::RIGHT_EYE_OUTER))
            .norm()
            .max(EPS);
        let mouth_open = (fa(face::UPPER_LIP_INNER) - fa(face::LOWER_LIP_INNER)).norm();
        let mouth_width = (fa(face::MOUTH_CORNER_LEFT) - fa(face::MOUTH_CORNER_RIGHT)).norm();

        let ratio_y = inverse_lerp(0.17, 0.5, sanitize(mouth_open / eye_inner, 0.0));
        let ratio_x = inverse_lerp(0.45, 0.9, sanitize(mouth_width / eye_outer, 0.0));
        let mouth_x = ((ratio_x - 0.3) * 2.0).clamp(0.0, 1.0);

        let shape_i = (mouth_x * 2.0 * inverse_lerp(0.2, 0.7, ratio_y)).clamp(0.0, 1.0);
        let shape_a = ratio_y * 0.4 + ratio_y * (1.0 - shape_i) * 0.6;
        let shape_u = ratio_y * inverse_lerp(0.0, 0.3, 1.0 - shape_i) * 0.1;
        let shape_e = inverse_lerp(0.2, 1.0, shape_u) * (1.0 - shape_i) * 0.3;
        let shape_o = (1.0 - shape_i) * inverse_lerp(0.3, 1.0, ratio_y) * 0.4;

        for (slot, (filter, value)) in self
            .last
            .viseme
            .iter_mut()
            .zip(
                self.viseme_filters
                    .iter_mut()
                    .zip([shape_a, shape_i, shape_u, shape_e, shape_o]),
            )
        {
            *slot = filter.filter(value, dt).clamp(0.0, 1.0);
        }
    }
}
