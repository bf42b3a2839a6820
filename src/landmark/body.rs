/// 全身推定モデルの 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub const COUNT: usize = 33;

    pub fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            // repr(usize)の稠密な並びなのでtransmute相当の変換が成立する
            Some(ALL[index])
        } else {
            None
        }
    }
}

const ALL: [BodyLandmark; BodyLandmark::COUNT] = [
    BodyLandmark::Nose,
    BodyLandmark::LeftEyeInner,
    BodyLandmark::LeftEye,
    BodyLandmark::LeftEyeOuter,
    BodyLandmark::RightEyeInner,
    BodyLandmark::RightEye,
    BodyLandmark::RightEyeOuter,
    BodyLandmark::LeftEar,
    BodyLandmark::RightEar,
    BodyLandmark::MouthLeft,
    BodyLandmark::MouthRight,
    BodyLandmark::LeftShoulder,
    BodyLandmark::RightShoulder,
    BodyLandmark::LeftElbow,
    BodyLandmark::RightElbow,
    BodyLandmark::LeftWrist,
    BodyLandmark::RightWrist,
    BodyLandmark::LeftPinky,
    BodyLandmark::RightPinky,
    BodyLandmark::LeftIndex,
    BodyLandmark::RightIndex,
    BodyLandmark::LeftThumb,
    BodyLandmark::RightThumb,
    BodyLandmark::LeftHip,
    BodyLandmark::RightHip,
    BodyLandmark::LeftKnee,
    BodyLandmark::RightKnee,
    BodyLandmark::LeftAnkle,
    BodyLandmark::RightAnkle,
    BodyLandmark::LeftHeel,
    BodyLandmark::RightHeel,
    BodyLandmark::LeftFootIndex,
    BodyLandmark::RightFootIndex,
];
