use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// キャプチャモード
///
/// どのソルバを走らせるかを決める。モード変更はフレーム間で
/// アトミックに適用され、リセットフレームを1枚挟む。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Full,
    PoseOnly,
    PoseAndHand,
    PoseAndFace,
    FaceOnly,
}

impl CaptureMode {
    pub fn includes_pose(self) -> bool {
        !matches!(self, Self::FaceOnly)
    }

    pub fn includes_hands(self) -> bool {
        matches!(self, Self::Full | Self::PoseAndHand)
    }

    pub fn includes_face(self) -> bool {
        matches!(self, Self::Full | Self::PoseAndFace | Self::FaceOnly)
    }
}

/// フィルタ調整値
///
/// One Euroの基準カットオフ(Hz)と速度応答係数。バインド時に
/// 各フィルタへ焼き込まれるため、変更はリバインドで反映される。
#[derive(Debug, Deserialize, Clone)]
pub struct FilterTuning {
    /// ランドマーク位置フィルタの基準カットオフ
    #[serde(default = "default_landmark_min_cutoff")]
    pub landmark_min_cutoff: f32,
    /// ランドマーク位置フィルタの速度応答
    #[serde(default = "default_landmark_beta")]
    pub landmark_beta: f32,
    /// ボーン姿勢フィルタの基準カットオフ
    #[serde(default = "default_rotation_min_cutoff")]
    pub rotation_min_cutoff: f32,
    /// ボーン姿勢フィルタの速度応答
    #[serde(default = "default_rotation_beta")]
    pub rotation_beta: f32,
    /// 表情チャンネルフィルタのカットオフ（速度応答なし）
    #[serde(default = "default_expression_cutoff")]
    pub expression_cutoff: f32,
    /// 視線フィルタの速度応答（角速度連動）
    #[serde(default = "default_gaze_beta")]
    pub gaze_beta: f32,
}

fn default_landmark_min_cutoff() -> f32 { 1.0 }
fn default_landmark_beta() -> f32 { 0.5 }
fn default_rotation_min_cutoff() -> f32 { 1.0 }
fn default_rotation_beta() -> f32 { 0.3 }
fn default_expression_cutoff() -> f32 { 4.0 }
fn default_gaze_beta() -> f32 { 0.6 }

impl Default for FilterTuning {
    fn default() -> Self {
        Self {
            landmark_min_cutoff: default_landmark_min_cutoff(),
            landmark_beta: default_landmark_beta(),
            rotation_min_cutoff: default_rotation_min_cutoff(),
            rotation_beta: default_rotation_beta(),
            expression_cutoff: default_expression_cutoff(),
            gaze_beta: default_gaze_beta(),
        }
    }
}

/// まばたき判定の調整値
///
/// 開眼率スナップの閾値。契約値ではなくチューニング対象。
#[derive(Debug, Deserialize, Clone)]
pub struct BlinkTuning {
    /// この開眼率未満で完全閉眼に張り付ける
    #[serde(default = "default_blink_closed_below")]
    pub closed_below: f32,
    /// この開眼率超で完全開眼に張り付ける
    #[serde(default = "default_blink_open_above")]
    pub open_above: f32,
}

fn default_blink_closed_below() -> f32 { 0.65 }
fn default_blink_open_above() -> f32 { 0.85 }

impl Default for BlinkTuning {
    fn default() -> Self {
        Self {
            closed_below: default_blink_closed_below(),
            open_above: default_blink_open_above(),
        }
    }
}

/// リターゲティングコアの設定
///
/// グローバル状態は持たず、毎フレームupdateに渡す。
#[derive(Debug, Deserialize, Clone)]
pub struct RetargetConfig {
    #[serde(default = "default_mode")]
    pub mode: CaptureMode,
    /// 全身ランドマークの信頼度閾値
    #[serde(default = "default_pose_threshold")]
    pub pose_threshold: f32,
    /// 手（手首信頼度・検出スコア）の閾値
    #[serde(default = "default_hand_threshold")]
    pub hand_threshold: f32,
    /// 顔検出スコアの閾値
    #[serde(default = "default_face_threshold")]
    pub face_threshold: f32,
    /// 上半身のみ駆動（着座配信など下半身が映らない場合）
    #[serde(default)]
    pub upper_body_only: bool,
    /// 現在姿勢→目標姿勢のブレンド率 (0..1)
    #[serde(default = "default_lerp_percentage")]
    pub lerp_percentage: f32,
    /// 頭の注視先（アバター空間、未指定ならランドマーク由来）
    #[serde(default)]
    pub look_at: Option<[f32; 3]>,
    #[serde(default)]
    pub filter: FilterTuning,
    #[serde(default)]
    pub blink: BlinkTuning,
}

fn default_mode() -> CaptureMode { CaptureMode::Full }
fn default_pose_threshold() -> f32 { 0.5 }
fn default_hand_threshold() -> f32 { 0.5 }
fn default_face_threshold() -> f32 { 0.5 }
fn default_lerp_percentage() -> f32 { 0.3 }

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            pose_threshold: default_pose_threshold(),
            hand_threshold: default_hand_threshold(),
            face_threshold: default_face_threshold(),
            upper_body_only: false,
            lerp_percentage: default_lerp_percentage(),
            look_at: None,
            filter: FilterTuning::default(),
            blink: BlinkTuning::default(),
        }
    }
}

impl RetargetConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RetargetConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_gates() {
        assert!(CaptureMode::Full.includes_pose());
        assert!(CaptureMode::Full.includes_hands());
        assert!(CaptureMode::Full.includes_face());

        assert!(CaptureMode::PoseOnly.includes_pose());
        assert!(!CaptureMode::PoseOnly.includes_hands());
        assert!(!CaptureMode::PoseOnly.includes_face());

        assert!(!CaptureMode::FaceOnly.includes_pose());
        assert!(CaptureMode::FaceOnly.includes_face());

        assert!(CaptureMode::PoseAndHand.includes_hands());
        assert!(!CaptureMode::PoseAndHand.includes_face());
        assert!(CaptureMode::PoseAndFace.includes_face());
        assert!(!CaptureMode::PoseAndFace.includes_hands());
    }

    #[test]
    fn test_default_config() {
        let config = RetargetConfig::default();
        assert_eq!(config.mode, CaptureMode::Full);
        assert_eq!(config.pose_threshold, 0.5);
        assert!(!config.upper_body_only);
        assert!(config.look_at.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            mode = "pose_and_face"
            pose_threshold = 0.4
            upper_body_only = true

            [filter]
            rotation_beta = 0.8
        "#;
        let config: RetargetConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mode, CaptureMode::PoseAndFace);
        assert_eq!(config.pose_threshold, 0.4);
        assert!(config.upper_body_only);
        assert_eq!(config.filter.rotation_beta, 0.8);
        // 未指定フィールドはデフォルト
        assert_eq!(config.hand_threshold, 0.5);
        assert_eq!(config.blink.closed_below, 0.65);
    }
}
