//! 顔メッシュランドマークのインデックス契約
//!
//! 顔配列は468点のメッシュ + 10点の虹彩 (468..478)。
//! 目のサブ領域は左右それぞれ16点の輪郭配列として別途供給される。

/// 顔配列の総点数（メッシュ468 + 虹彩10）
pub const FACE_COUNT: usize = 478;

/// 鼻先
pub const NOSE_TIP: usize = 1;
/// 額中央
pub const FOREHEAD: usize = 10;
/// あご先
pub const CHIN: usize = 152;
/// 右頬外縁（被写体から見て右）
pub const CHEEK_RIGHT: usize = 234;
/// 左頬外縁
pub const CHEEK_LEFT: usize = 454;

/// 上唇内縁
pub const UPPER_LIP_INNER: usize = 13;
/// 下唇内縁
pub const LOWER_LIP_INNER: usize = 14;
/// 右口角
pub const MOUTH_CORNER_RIGHT: usize = 61;
/// 左口角
pub const MOUTH_CORNER_LEFT: usize = 291;

/// 左目頭・目尻（口と目の距離正規化に使用）
pub const LEFT_EYE_OUTER: usize = 263;
pub const LEFT_EYE_INNER: usize = 362;
pub const RIGHT_EYE_OUTER: usize = 33;
pub const RIGHT_EYE_INNER: usize = 133;

/// 虹彩中心
pub const LEFT_IRIS_CENTER: usize = 473;
pub const RIGHT_IRIS_CENTER: usize = 468;

/// 目サブ領域（16点輪郭）内の位置
///
/// 0 = 目尻(外側)、1..8 が上まぶたを内側へ、8 = 目頭(内側)、
/// 9..16 が下まぶたを外側へ戻る。まばたき比には上下で対になる
/// (3,13) と (5,11) を、縦幅には (4,12) を使う。
pub mod eye {
    pub const COUNT: usize = 16;
    pub const OUTER_CORNER: usize = 0;
    pub const UPPER_OUTER: usize = 3;
    pub const UPPER_MID: usize = 4;
    pub const UPPER_INNER: usize = 5;
    pub const INNER_CORNER: usize = 8;
    pub const LOWER_INNER: usize = 11;
    pub const LOWER_MID: usize = 12;
    pub const LOWER_OUTER: usize = 13;
}
