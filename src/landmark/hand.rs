/// 手部推定モデルの 21 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    LittleMcp = 17,
    LittlePip = 18,
    LittleDip = 19,
    LittleTip = 20,
}

impl HandLandmark {
    pub const COUNT: usize = 21;
}

/// 指ごとのランドマーク連鎖（付け根→指先）
///
/// 各セグメントは連続ペア (i, i+1) から方向を取る。
/// 末端セグメントの「子」は指先ランドマーク。
pub const DIGIT_CHAINS: [[HandLandmark; 4]; 5] = [
    [
        HandLandmark::ThumbCmc,
        HandLandmark::ThumbMcp,
        HandLandmark::ThumbIp,
        HandLandmark::ThumbTip,
    ],
    [
        HandLandmark::IndexMcp,
        HandLandmark::IndexPip,
        HandLandmark::IndexDip,
        HandLandmark::IndexTip,
    ],
    [
        HandLandmark::MiddleMcp,
        HandLandmark::MiddlePip,
        HandLandmark::MiddleDip,
        HandLandmark::MiddleTip,
    ],
    [
        HandLandmark::RingMcp,
        HandLandmark::RingPip,
        HandLandmark::RingDip,
        HandLandmark::RingTip,
    ],
    [
        HandLandmark::LittleMcp,
        HandLandmark::LittlePip,
        HandLandmark::LittleDip,
        HandLandmark::LittleTip,
    ],
];
