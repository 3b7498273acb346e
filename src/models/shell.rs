use serde::{Deserialize, Serialize};
use std::fmt;

/// 砲弾種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ShellType {
    #[serde(rename = "AP")]
    Ap,
    #[serde(rename = "APHE")]
    Aphe,
    #[serde(rename = "APCR")]
    Apcr,
    #[serde(rename = "HEAT")]
    Heat,
    #[serde(rename = "HE")]
    He,
    #[serde(rename = "APDS")]
    Apds,
    #[serde(rename = "APFSDS")]
    Apfsds,
}

impl ShellType {
    /// 種別タグ（"AP", "HEAT" など）
    pub fn tag(&self) -> &'static str {
        match self {
            ShellType::Ap => "AP",
            ShellType::Aphe => "APHE",
            ShellType::Apcr => "APCR",
            ShellType::Heat => "HEAT",
            ShellType::He => "HE",
            ShellType::Apds => "APDS",
            ShellType::Apfsds => "APFSDS",
        }
    }

    /// 種別の表示名
    pub fn type_name(&self) -> &'static str {
        match self {
            ShellType::Ap => "徹甲弾",
            ShellType::Aphe => "徹甲榴弾",
            ShellType::Apcr => "硬芯徹甲弾",
            ShellType::Heat => "成形炸薬弾",
            ShellType::He => "榴弾",
            ShellType::Apds => "装弾筒付徹甲弾",
            ShellType::Apfsds => "装弾筒付翼安定徹甲弾",
        }
    }

    /// 運動エネルギー弾かどうか（距離とともに貫通力が落ちる）
    pub fn is_kinetic(&self) -> bool {
        matches!(
            self,
            ShellType::Ap | ShellType::Aphe | ShellType::Apcr | ShellType::Apds | ShellType::Apfsds
        )
    }
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// 砲弾の時代区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Origins,
    Interwar,
    WorldWar2,
    ColdWar,
    Modern,
}

impl Period {
    pub fn label(&self) -> &'static str {
        match self {
            Period::Origins => "黎明期",
            Period::Interwar => "戦間期",
            Period::WorldWar2 => "第二次世界大戦",
            Period::ColdWar => "冷戦期",
            Period::Modern => "現代",
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "origins" => Ok(Period::Origins),
            "interwar" => Ok(Period::Interwar),
            "world_war2" | "ww2" => Ok(Period::WorldWar2),
            "cold_war" | "coldwar" => Ok(Period::ColdWar),
            "modern" => Ok(Period::Modern),
            _ => Err(format!(
                "無効な時代区分: {}. 利用可能: origins, interwar, ww2, cold_war, modern",
                s
            )),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 参照距離ごとの貫通値（mm）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PenetrationTable {
    pub distance_100m: f64,
    pub distance_500m: f64,
    pub distance_1000m: f64,
    pub distance_1500m: f64,
}

impl PenetrationTable {
    pub fn new(distance_100m: f64, distance_500m: f64, distance_1000m: f64, distance_1500m: f64) -> Self {
        Self {
            distance_100m,
            distance_500m,
            distance_1000m,
            distance_1500m,
        }
    }

    /// 全距離で同じ貫通値（成形炸薬弾・榴弾用）
    pub fn flat(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    /// REFERENCE_DISTANCES_M と同じ順序の配列
    pub fn values(&self) -> [f64; 4] {
        [
            self.distance_100m,
            self.distance_500m,
            self.distance_1000m,
            self.distance_1500m,
        ]
    }

    /// 距離が伸びるにつれて貫通値が増えないか
    pub fn is_non_increasing(&self) -> bool {
        self.values().windows(2).all(|w| w[0] >= w[1])
    }

    /// 全距離で貫通値が等しいか
    pub fn is_flat(&self) -> bool {
        let values = self.values();
        values.iter().all(|v| *v == values[0])
    }
}

/// 砲弾
///
/// 弾薬カタログの参照データです。シミュレーション中に変更されることはありません。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Shell {
    pub id: String,
    pub name: String,
    pub caliber: String,
    #[serde(rename = "type")]
    pub shell_type: ShellType,
    pub penetration: PenetrationTable,
    /// 砲口初速（m/s）。演出の飛翔時間にのみ使用
    pub velocity_mps: f64,
    pub period: Period,
    pub country: String,
    /// 採用年
    pub year: i32,
    pub description: String,
    /// 表示色（"#rrggbb"）
    #[serde(default)]
    pub color: String,
}

impl Shell {
    pub fn summary(&self) -> String {
        format!(
            "{} [{} {}] {}年 {} (500m: {:.0}mm, {:.0}m/s)",
            self.name,
            self.caliber,
            self.shell_type,
            self.year,
            self.country,
            self.penetration.distance_500m,
            self.velocity_mps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape_checks() {
        assert!(PenetrationTable::new(69.0, 61.0, 51.0, 43.0).is_non_increasing());
        assert!(!PenetrationTable::new(69.0, 70.0, 51.0, 43.0).is_non_increasing());
        assert!(PenetrationTable::flat(280.0).is_flat());
        assert!(PenetrationTable::flat(280.0).is_non_increasing());
        assert!(!PenetrationTable::new(280.0, 280.0, 280.0, 279.0).is_flat());
    }

    #[test]
    fn test_shell_type_classification() {
        assert!(ShellType::Apfsds.is_kinetic());
        assert!(ShellType::Aphe.is_kinetic());
        assert!(!ShellType::Heat.is_kinetic());
        assert!(!ShellType::He.is_kinetic());
        assert_eq!(ShellType::Apcr.to_string(), "APCR");
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("ww2".parse::<Period>(), Ok(Period::WorldWar2));
        assert_eq!("Cold_War".parse::<Period>(), Ok(Period::ColdWar));
        assert!("bronze_age".parse::<Period>().is_err());
    }
}
