pub mod body;
pub mod face;
pub mod hand;

pub use body::BodyLandmark;
pub use hand::{HandLandmark, DIGIT_CHAINS};

use nalgebra::Vector3;

/// 左右の区別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 単一ランドマーク
///
/// 座標系はアバター空間 (X=右, Y=上, Z=前)。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// 信頼度スコア (0.0〜1.0)。手・顔配列では供給元が常に1.0を入れてよい
    pub confidence: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, confidence: f32) -> Self {
        Self { x, y, z, confidence }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            confidence: 0.0,
        }
    }
}

/// 推論バックエンドへの問い合わせ口
///
/// バックエンドの選択は構築時に一度だけ行う。フレーム中の配列は
/// 不変スナップショットとして扱い、コア側から書き換えない。
pub trait LandmarkSource {
    /// 全身ランドマーク（33点、信頼度つき）
    fn body(&self, index: BodyLandmark) -> Landmark;
    /// 手ランドマーク（左右21点ずつ。信頼度は持たない）
    ///
    /// 右手も左手と同じキラリティで供給する。ソルバ側がX反転して
    /// アバター空間へ戻す。信頼度は全身ストリームの手首から継承する。
    fn hand(&self, side: Side, index: HandLandmark) -> Landmark;
    /// 顔ランドマーク（468点 + 虹彩10点）
    fn face(&self, index: usize) -> Landmark;
    /// 目サブ領域ランドマーク（左右16点ずつ）
    fn eye(&self, side: Side, index: usize) -> Landmark;
    /// 顔全体の検出スコア
    fn face_score(&self) -> f32;
    /// 手の検出スコア
    fn hand_score(&self, side: Side) -> f32;
}

/// 1フレーム分のランドマークスナップショット
///
/// LandmarkSourceを直接実装しないバックエンドは、毎フレーム
/// この構造体に詰め替えてコアへ渡す。
#[derive(Clone)]
pub struct LandmarkFrame {
    pub body: [Landmark; BodyLandmark::COUNT],
    pub hands: [[Landmark; HandLandmark::COUNT]; 2],
    pub face: [Landmark; face::FACE_COUNT],
    pub eyes: [[Landmark; face::eye::COUNT]; 2],
    pub face_score: f32,
    pub hand_scores: [f32; 2],
}

impl Default for LandmarkFrame {
    fn default() -> Self {
        Self {
            body: [Landmark::default(); BodyLandmark::COUNT],
            hands: [[Landmark::default(); HandLandmark::COUNT]; 2],
            face: [Landmark::default(); face::FACE_COUNT],
            eyes: [[Landmark::default(); face::eye::COUNT]; 2],
            face_score: 0.0,
            hand_scores: [0.0; 2],
        }
    }
}

impl LandmarkSource for LandmarkFrame {
    fn body(&self, index: BodyLandmark) -> Landmark {
        self.body[index as usize]
    }

    fn hand(&self, side: Side, index: HandLandmark) -> Landmark {
        self.hands[side.index()][index as usize]
    }

    fn face(&self, index: usize) -> Landmark {
        self.face[index]
    }

    fn eye(&self, side: Side, index: usize) -> Landmark {
        self.eyes[side.index()][index]
    }

    fn face_score(&self) -> f32 {
        self.face_score
    }

    fn hand_score(&self, side: Side) -> f32 {
        self.hand_scores[side.index()]
    }
}
