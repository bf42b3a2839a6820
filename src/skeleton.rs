use std::collections::HashMap;

use nalgebra::{UnitQuaternion, Vector3};

use crate::landmark::Side;

/// ヒューマノイドボーンの稠密ID
///
/// フレーム毎の参照はこのIDで固定長配列を引く。名前はホスト側
/// スケルトンとの境界でのみ使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BoneId {
    Hips = 0,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
    LeftThumbProximal,
    LeftThumbIntermediate,
    LeftThumbDistal,
    LeftIndexProximal,
    LeftIndexIntermediate,
    LeftIndexDistal,
    LeftMiddleProximal,
    LeftMiddleIntermediate,
    LeftMiddleDistal,
    LeftRingProximal,
    LeftRingIntermediate,
    LeftRingDistal,
    LeftLittleProximal,
    LeftLittleIntermediate,
    LeftLittleDistal,
    RightThumbProximal,
    RightThumbIntermediate,
    RightThumbDistal,
    RightIndexProximal,
    RightIndexIntermediate,
    RightIndexDistal,
    RightMiddleProximal,
    RightMiddleIntermediate,
    RightMiddleDistal,
    RightRingProximal,
    RightRingIntermediate,
    RightRingDistal,
    RightLittleProximal,
    RightLittleIntermediate,
    RightLittleDistal,
}

impl BoneId {
    pub const COUNT: usize = 52;

    /// 宣言順（reprと同じ稠密な並び）の全ボーン
    pub const ALL: [BoneId; BoneId::COUNT] = [
        Self::Hips,
        Self::Spine,
        Self::Chest,
        Self::UpperChest,
        Self::Neck,
        Self::Head,
        Self::LeftShoulder,
        Self::LeftUpperArm,
        Self::LeftLowerArm,
        Self::LeftHand,
        Self::RightShoulder,
        Self::RightUpperArm,
        Self::RightLowerArm,
        Self::RightHand,
        Self::LeftUpperLeg,
        Self::LeftLowerLeg,
        Self::LeftFoot,
        Self::LeftToes,
        Self::RightUpperLeg,
        Self::RightLowerLeg,
        Self::RightFoot,
        Self::RightToes,
        Self::LeftThumbProximal,
        Self::LeftThumbIntermediate,
        Self::LeftThumbDistal,
        Self::LeftIndexProximal,
        Self::LeftIndexIntermediate,
        Self::LeftIndexDistal,
        Self::LeftMiddleProximal,
        Self::LeftMiddleIntermediate,
        Self::LeftMiddleDistal,
        Self::LeftRingProximal,
        Self::LeftRingIntermediate,
        Self::LeftRingDistal,
        Self::LeftLittleProximal,
        Self::LeftLittleIntermediate,
        Self::LeftLittleDistal,
        Self::RightThumbProximal,
        Self::RightThumbIntermediate,
        Self::RightThumbDistal,
        Self::RightIndexProximal,
        Self::RightIndexIntermediate,
        Self::RightIndexDistal,
        Self::RightMiddleProximal,
        Self::RightMiddleIntermediate,
        Self::RightMiddleDistal,
        Self::RightRingProximal,
        Self::RightRingIntermediate,
        Self::RightRingDistal,
        Self::RightLittleProximal,
        Self::RightLittleIntermediate,
        Self::RightLittleDistal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Hips => "Hips",
            Self::Spine => "Spine",
            Self::Chest => "Chest",
            Self::UpperChest => "UpperChest",
            Self::Neck => "Neck",
            Self::Head => "Head",
            Self::LeftShoulder => "LeftShoulder",
            Self::LeftUpperArm => "LeftUpperArm",
            Self::LeftLowerArm => "LeftLowerArm",
            Self::LeftHand => "LeftHand",
            Self::RightShoulder => "RightShoulder",
            Self::RightUpperArm => "RightUpperArm",
            Self::RightLowerArm => "RightLowerArm",
            Self::RightHand => "RightHand",
            Self::LeftUpperLeg => "LeftUpperLeg",
            Self::LeftLowerLeg => "LeftLowerLeg",
            Self::LeftFoot => "LeftFoot",
            Self::LeftToes => "LeftToes",
            Self::RightUpperLeg => "RightUpperLeg",
            Self::RightLowerLeg => "RightLowerLeg",
            Self::RightFoot => "RightFoot",
            Self::RightToes => "RightToes",
            Self::LeftThumbProximal => "LeftThumbProximal",
            Self::LeftThumbIntermediate => "LeftThumbIntermediate",
            Self::LeftThumbDistal => "LeftThumbDistal",
            Self::LeftIndexProximal => "LeftIndexProximal",
            Self::LeftIndexIntermediate => "LeftIndexIntermediate",
            Self::LeftIndexDistal => "LeftIndexDistal",
            Self::LeftMiddleProximal => "LeftMiddleProximal",
            Self::LeftMiddleIntermediate => "LeftMiddleIntermediate",
            Self::LeftMiddleDistal => "LeftMiddleDistal",
            Self::LeftRingProximal => "LeftRingProximal",
            Self::LeftRingIntermediate => "LeftRingIntermediate",
            Self::LeftRingDistal => "LeftRingDistal",
            Self::LeftLittleProximal => "LeftLittleProximal",
            Self::LeftLittleIntermediate => "LeftLittleIntermediate",
            Self::LeftLittleDistal => "LeftLittleDistal",
            Self::RightThumbProximal => "RightThumbProximal",
            Self::RightThumbIntermediate => "RightThumbIntermediate",
            Self::RightThumbDistal => "RightThumbDistal",
            Self::RightIndexProximal => "RightIndexProximal",
            Self::RightIndexIntermediate => "RightIndexIntermediate",
            Self::RightIndexDistal => "RightIndexDistal",
            Self::RightMiddleProximal => "RightMiddleProximal",
            Self::RightMiddleIntermediate => "RightMiddleIntermediate",
            Self::RightMiddleDistal => "RightMiddleDistal",
            Self::RightRingProximal => "RightRingProximal",
            Self::RightRingIntermediate => "RightRingIntermediate",
            Self::RightRingDistal => "RightRingDistal",
            Self::RightLittleProximal => "RightLittleProximal",
            Self::RightLittleIntermediate => "RightLittleIntermediate",
            Self::RightLittleDistal => "RightLittleDistal",
        }
    }

    pub fn hand(side: Side) -> BoneId {
        match side {
            Side::Left => Self::LeftHand,
            Side::Right => Self::RightHand,
        }
    }

    pub fn lower_arm(side: Side) -> BoneId {
        match side {
            Side::Left => Self::LeftLowerArm,
            Side::Right => Self::RightLowerArm,
        }
    }

    /// 指セグメントボーン（5指 × 付け根/中節/末節）
    pub fn finger_chains(side: Side) -> [[BoneId; 3]; 5] {
        match side {
            Side::Left => [
                [
                    Self::LeftThumbProximal,
                    Self::LeftThumbIntermediate,
                    Self::LeftThumbDistal,
                ],
                [
                    Self::LeftIndexProximal,
                    Self::LeftIndexIntermediate,
                    Self::LeftIndexDistal,
                ],
                [
                    Self::LeftMiddleProximal,
                    Self::LeftMiddleIntermediate,
                    Self::LeftMiddleDistal,
                ],
                [
                    Self::LeftRingProximal,
                    Self::LeftRingIntermediate,
                    Self::LeftRingDistal,
                ],
                [
                    Self::LeftLittleProximal,
                    Self::LeftLittleIntermediate,
                    Self::LeftLittleDistal,
                ],
            ],
            Side::Right => [
                [
                    Self::RightThumbProximal,
                    Self::RightThumbIntermediate,
                    Self::RightThumbDistal,
                ],
                [
                    Self::RightIndexProximal,
                    Self::RightIndexIntermediate,
                    Self::RightIndexDistal,
                ],
                [
                    Self::RightMiddleProximal,
                    Self::RightMiddleIntermediate,
                    Self::RightMiddleDistal,
                ],
                [
                    Self::RightRingProximal,
                    Self::RightRingIntermediate,
                    Self::RightRingDistal,
                ],
                [
                    Self::RightLittleProximal,
                    Self::RightLittleIntermediate,
                    Self::RightLittleDistal,
                ],
            ],
        }
    }
}

/// ホストスケルトンへの読み書き口
///
/// コアはボーンの生成・破棄は行わず、ワールド姿勢の読み書きと
/// バインド時のレスト位置・子オフセット参照だけを行う。
/// 存在しないボーンへの問い合わせは恒等姿勢/ゼロを返してよい
/// （リグ構築後のコアは存在確認済みのボーンしか参照しない）。
pub trait AvatarSkeleton {
    fn bone_exists(&self, bone: &str) -> bool;
    fn orientation(&self, bone: &str) -> UnitQuaternion<f32>;
    fn set_orientation(&mut self, bone: &str, orientation: UnitQuaternion<f32>);
    fn rest_position(&self, bone: &str) -> Vector3<f32>;
    /// 最初のスケルトン上の子へのオフセット（末端ボーンの視線方向用）
    fn first_child_offset(&self, bone: &str) -> Option<Vector3<f32>>;
}

/// 表情チャンネル（ブレンドシェイプ相当）への書き込み口
pub trait ExpressionRig {
    fn set_expression(&mut self, channel: &str, value: f32);
}

struct BoneState {
    orientation: UnitQuaternion<f32>,
    rest_position: Vector3<f32>,
    children: Vec<String>,
}

/// メモリ上の参照実装
///
/// エンジン非依存のホスト側実装。デモとテストのほか、
/// 独自レンダラを持つホストがそのまま使ってもよい。
pub struct SimpleSkeleton {
    bones: HashMap<String, BoneState>,
    expressions: HashMap<String, f32>,
}

impl SimpleSkeleton {
    pub fn new() -> Self {
        Self {
            bones: HashMap::new(),
            expressions: HashMap::new(),
        }
    }

    /// ボーンを追加（レスト姿勢は恒等、位置はメートル）
    pub fn add_bone(&mut self, name: &str, rest_position: [f32; 3], parent: Option<&str>) {
        self.bones.insert(
            name.to_string(),
            BoneState {
                orientation: UnitQuaternion::identity(),
                rest_position: Vector3::new(rest_position[0], rest_position[1], rest_position[2]),
                children: Vec::new(),
            },
        );
        if let Some(parent) = parent {
            if let Some(p) = self.bones.get_mut(parent) {
                p.children.push(name.to_string());
            }
        }
    }

    /// テスト・省略リグ用: ボーンを取り除く
    pub fn remove_bone(&mut self, name: &str) {
        self.bones.remove(name);
        for state in self.bones.values_mut() {
            state.children.retain(|c| c != name);
        }
    }

    pub fn expression(&self, channel: &str) -> f32 {
        self.expressions.get(channel).copied().unwrap_or(0.0)
    }

    /// 標準ヒューマノイド（Tポーズ、身長約1.6m、+Z正面、+X=アバター左）
    pub fn default_humanoid() -> Self {
        let mut s = Self::new();

        s.add_bone("Hips", [0.0, 0.90, 0.0], None);
        s.add_bone("Spine", [0.0, 1.02, 0.0], Some("Hips"));
        s.add_bone("Chest", [0.0, 1.14, 0.0], Some("Spine"));
        s.add_bone("UpperChest", [0.0, 1.26, 0.0], Some("Chest"));
        s.add_bone("Neck", [0.0, 1.38, 0.0], Some("UpperChest"));
        s.add_bone("Head", [0.0, 1.48, 0.0], Some("Neck"));
        s.add_bone("HeadTop", [0.0, 1.62, 0.0], Some("Head"));

        for (sign, side) in [(1.0f32, "Left"), (-1.0f32, "Right")] {
            let b = |base: &str| format!("{side}{base}");

            s.add_bone(&b("Shoulder"), [sign * 0.04, 1.34, 0.0], Some("UpperChest"));
            s.add_bone(&b("UpperArm"), [sign * 0.16, 1.34, 0.0], Some(&b("Shoulder")));
            s.add_bone(&b("LowerArm"), [sign * 0.42, 1.34, 0.0], Some(&b("UpperArm")));
            s.add_bone(&b("Hand"), [sign * 0.68, 1.34, 0.0], Some(&b("LowerArm")));

            s.add_bone(&b("UpperLeg"), [sign * 0.09, 0.86, 0.0], Some("Hips"));
            s.add_bone(&b("LowerLeg"), [sign * 0.09, 0.48, 0.0], Some(&b("UpperLeg")));
            s.add_bone(&b("Foot"), [sign * 0.09, 0.10, 0.0], Some(&b("LowerLeg")));
            s.add_bone(&b("Toes"), [sign * 0.09, 0.02, 0.12], Some(&b("Foot")));

            // 手首の子オフセットが指方向を向くよう中指を先頭に追加する
            for (digit, z) in [
                ("Middle", 0.0f32),
                ("Index", 0.02),
                ("Ring", -0.02),
                ("Little", -0.04),
                ("Thumb", 0.04),
            ] {
                let prox = b(&format!("{digit}Proximal"));
                let inter = b(&format!("{digit}Intermediate"));
                let dist = b(&format!("{digit}Distal"));
                let tip = b(&format!("{digit}Tip"));
                s.add_bone(&prox, [sign * 0.73, 1.34, z], Some(&b("Hand")));
                s.add_bone(&inter, [sign * 0.765, 1.34, z], Some(&prox));
                s.add_bone(&dist, [sign * 0.80, 1.34, z], Some(&inter));
                s.add_bone(&tip, [sign * 0.83, 1.34, z], Some(&dist));
            }
        }

        s
    }
}

impl Default for SimpleSkeleton {
    fn default() -> Self {
        Self::new()
    }
}

impl AvatarSkeleton for SimpleSkeleton {
    fn bone_exists(&self, bone: &str) -> bool {
        self.bones.contains_key(bone)
    }

    fn orientation(&self, bone: &str) -> UnitQuaternion<f32> {
        self.bones
            .get(bone)
            .map(|b| b.orientation)
            .unwrap_or_else(UnitQuaternion::identity)
    }

    fn set_orientation(&mut self, bone: &str, orientation: UnitQuaternion<f32>) {
        if let Some(b) = self.bones.get_mut(bone) {
            b.orientation = orientation;
        }
    }

    fn rest_position(&self, bone: &str) -> Vector3<f32> {
        self.bones
            .get(bone)
            .map(|b| b.rest_position)
            .unwrap_or_else(Vector3::zeros)
    }

    fn first_child_offset(&self, bone: &str) -> Option<Vector3<f32>> {
        let state = self.bones.get(bone)?;
        let child = state.children.first()?;
        let child_pos = self.bones.get(child)?.rest_position;
        Some(child_pos - state.rest_position)
    }
}

impl ExpressionRig for SimpleSkeleton {
    fn set_expression(&mut self, channel: &str, value: f32) {
        self.expressions.insert(channel.to_string(), value);
    }
}
