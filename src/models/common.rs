/// 貫通値が表引きされている参照距離（m）
pub const REFERENCE_DISTANCES_M: [f64; 4] = [100.0, 500.0, 1000.0, 1500.0];

/// 射撃距離の操作範囲（m）
pub const MIN_FIRING_DISTANCE_M: f64 = 100.0;
pub const MAX_FIRING_DISTANCE_M: f64 = 1500.0;
pub const DEFAULT_FIRING_DISTANCE_M: f64 = 500.0;

/// 目標の配備開始年より何年前までの砲弾を使用可能とみなすか
pub const ELIGIBILITY_LEAD_YEARS: i32 = 10;

pub const DEFAULT_FLIGHT_SCALE_M: f64 = 500.0;
pub const DEFAULT_SETTLE_S: f64 = 1.0;

/// 飛翔時間計算時の速度下限（ゼロ除算防止）
pub const MIN_PACING_VELOCITY_MPS: f64 = 1.0;

/// 射撃シーケンスの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireState {
    Idle,     // 待機
    Firing,   // 飛翔中
    Resolved, // 着弾・結果表示中
}

impl std::fmt::Display for FireState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FireState::Idle => "待機",
            FireState::Firing => "飛翔中",
            FireState::Resolved => "着弾",
        };
        write!(f, "{}", label)
    }
}

/// 射撃演出のペース設定
///
/// 飛翔時間と結果表示時間を決めるだけで、貫通計算には影響しません。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    /// 飛翔時間 = flight_scale_m / 砲口初速
    pub flight_scale_m: f64,
    /// 着弾後、待機に戻るまでの時間（秒）
    pub settle_s: f64,
}

impl PacingConfig {
    /// 砲口初速から飛翔時間（秒）を計算
    pub fn flight_duration(&self, velocity_mps: f64) -> f64 {
        self.flight_scale_m / velocity_mps.max(MIN_PACING_VELOCITY_MPS)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            flight_scale_m: DEFAULT_FLIGHT_SCALE_M,
            settle_s: DEFAULT_SETTLE_S,
        }
    }
}

/// 射撃距離が操作範囲内かどうか
pub fn is_in_firing_range(distance_m: f64) -> bool {
    distance_m.is_finite()
        && (MIN_FIRING_DISTANCE_M..=MAX_FIRING_DISTANCE_M).contains(&distance_m)
}
