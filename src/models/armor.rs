use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 被弾面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmorFace {
    #[default]
    Front,  // 車体正面
    Side,   // 側面
    Rear,   // 後面
    Turret, // 砲塔
    Top,    // 上面
}

impl FromStr for ArmorFace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "front" => Ok(ArmorFace::Front),
            "side" => Ok(ArmorFace::Side),
            "rear" => Ok(ArmorFace::Rear),
            "turret" => Ok(ArmorFace::Turret),
            "top" => Ok(ArmorFace::Top),
            _ => Err(format!(
                "無効な被弾面: {}. 利用可能: front, side, rear, turret, top",
                s
            )),
        }
    }
}

impl fmt::Display for ArmorFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArmorFace::Front => "車体正面",
            ArmorFace::Side => "側面",
            ArmorFace::Rear => "後面",
            ArmorFace::Turret => "砲塔",
            ArmorFace::Top => "上面",
        };
        write!(f, "{}", label)
    }
}

/// 目標の方向別装甲厚（mm）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ArmorProfile {
    pub front: f64,
    pub side: f64,
    pub rear: f64,
    pub turret: f64,
    #[serde(default)]
    pub top: Option<f64>,
}

impl ArmorProfile {
    /// 指定面の装甲厚。上面の値がない場合はNone
    pub fn thickness(&self, face: ArmorFace) -> Option<f64> {
        match face {
            ArmorFace::Front => Some(self.front),
            ArmorFace::Side => Some(self.side),
            ArmorFace::Rear => Some(self.rear),
            ArmorFace::Turret => Some(self.turret),
            ArmorFace::Top => self.top,
        }
    }

    /// 全ての装甲厚が有限かつ非負か
    pub fn is_valid(&self) -> bool {
        [self.front, self.side, self.rear, self.turret]
            .iter()
            .chain(self.top.iter())
            .all(|t| t.is_finite() && *t >= 0.0)
    }
}

/// 装甲厚の区分
///
/// 表示色の段階と同じ閾値（25/50/100/150mm）で分類します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmorTier {
    VeryThin, // < 25mm
    Thin,     // < 50mm
    Medium,   // < 100mm
    Thick,    // < 150mm
    Heavy,    // >= 150mm
}

impl ArmorTier {
    pub fn classify(thickness_mm: f64) -> Self {
        if thickness_mm < 25.0 {
            ArmorTier::VeryThin
        } else if thickness_mm < 50.0 {
            ArmorTier::Thin
        } else if thickness_mm < 100.0 {
            ArmorTier::Medium
        } else if thickness_mm < 150.0 {
            ArmorTier::Thick
        } else {
            ArmorTier::Heavy
        }
    }
}

/// 配備期間の文字列から開始年を取り出す
///
/// "1941-1945" や "1941" の形式を受け付けます。
pub fn parse_service_start_year(period: &str) -> Option<i32> {
    period
        .split(['-', '–'])
        .next()
        .map(str::trim)
        .and_then(|year| year.parse::<i32>().ok())
}
