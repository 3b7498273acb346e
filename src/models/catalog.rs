//! # Catalog モジュール
//!
//! 弾薬カタログ（砲弾の参照データ表）を提供します。
//!
//! カタログはプロセス起動時に一度だけ構築され、以後は読み取り専用です。
//! 組み込みデータのほか、YAMLファイルから独自のカタログを読み込めます。
//! 読み込み時には貫通値の形状（運動エネルギー弾は距離とともに非増加、
//! 成形炸薬弾は全距離で一定）を検証します。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::models::{
    shell::{PenetrationTable, Period, Shell, ShellType},
    traits::IShellCatalog,
};

/// 弾薬カタログ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AmmunitionCatalog {
    shells: Vec<Shell>,
}

impl AmmunitionCatalog {
    /// 砲弾リストからカタログを作成（検証付き）
    #[cfg(test)]
    pub fn from_shells(shells: Vec<Shell>) -> Result<Self, CatalogError> {
        let catalog = Self { shells };
        catalog.validate()?;
        Ok(catalog)
    }

    /// YAMLファイルからカタログを読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CatalogError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CatalogError::IoError(path.to_path_buf(), e))?;

        let catalog: AmmunitionCatalog = serde_yaml::from_str(&contents)
            .map_err(|e| CatalogError::ParseError(path.to_path_buf(), e))?;

        catalog.validate()?;
        debug!("カタログ読み込み: {} ({}種)", path.display(), catalog.shells.len());

        Ok(catalog)
    }

    /// YAML文字列からカタログを読み込み
    #[cfg(test)]
    pub fn from_yaml_str(contents: &str) -> Result<Self, CatalogError> {
        let catalog: AmmunitionCatalog = serde_yaml::from_str(contents)
            .map_err(|e| CatalogError::ParseError(Path::new("<inline>").to_path_buf(), e))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// 参照データの検証
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.is_empty() {
            return Err(CatalogError::ValidationError("カタログに砲弾がありません".to_string()));
        }

        let mut ids = HashSet::new();

        for shell in &self.shells {
            if !ids.insert(shell.id.as_str()) {
                return Err(CatalogError::ValidationError(format!("砲弾IDが重複しています: {}", shell.id)));
            }

            let values = shell.penetration.values();
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(CatalogError::ValidationError(format!(
                    "{}: 貫通値は非負の有限値である必要があります",
                    shell.id
                )));
            }

            if !shell.velocity_mps.is_finite() || shell.velocity_mps <= 0.0 {
                return Err(CatalogError::ValidationError(format!(
                    "{}: 砲口初速は正の値である必要があります",
                    shell.id
                )));
            }

            if shell.shell_type == ShellType::Heat && !shell.penetration.is_flat() {
                return Err(CatalogError::ValidationError(format!(
                    "{}: HEAT弾の貫通値は全距離で等しい必要があります",
                    shell.id
                )));
            }

            if shell.shell_type.is_kinetic() && !shell.penetration.is_non_increasing() {
                return Err(CatalogError::ValidationError(format!(
                    "{}: {}弾の貫通値が距離とともに増加しています",
                    shell.id, shell.shell_type
                )));
            }
        }

        Ok(())
    }

    /// IDによる砲弾の取得
    pub fn get(&self, id: &str) -> Option<&Shell> {
        self.shells.iter().find(|shell| shell.id == id)
    }

    /// 時代区分による絞り込み
    pub fn shells_for_period(&self, period: Period) -> Vec<&Shell> {
        self.shells.iter().filter(|shell| shell.period == period).collect()
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    /// 組み込みの弾薬カタログ
    pub fn builtin() -> Self {
        Self { shells: builtin_shells() }
    }
}

impl IShellCatalog for AmmunitionCatalog {
    fn shells(&self) -> &[Shell] {
        &self.shells
    }

    fn get_shell(&self, id: &str) -> Option<&Shell> {
        self.get(id)
    }
}

/// カタログ読み込みエラー
#[derive(Debug)]
pub enum CatalogError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::FileNotFound(path) => {
                write!(f, "カタログファイルが見つかりません: {}", path.display())
            }
            CatalogError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            CatalogError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            CatalogError::ValidationError(msg) => {
                write!(f, "カタログ検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[allow(clippy::too_many_arguments)]
fn shell(
    id: &str,
    name: &str,
    caliber: &str,
    shell_type: ShellType,
    penetration: PenetrationTable,
    velocity_mps: f64,
    period: Period,
    country: &str,
    year: i32,
    description: &str,
    color: &str,
) -> Shell {
    Shell {
        id: id.to_string(),
        name: name.to_string(),
        caliber: caliber.to_string(),
        shell_type,
        penetration,
        velocity_mps,
        period,
        country: country.to_string(),
        year,
        description: description.to_string(),
        color: color.to_string(),
    }
}

fn builtin_shells() -> Vec<Shell> {
    vec![
        shell(
            "ap-37mm-ww1", "37mm 徹甲弾", "37 mm", ShellType::Ap,
            PenetrationTable::new(20.0, 15.0, 10.0, 5.0), 450.0,
            Period::Origins, "ソ連", 1927,
            "軽戦車向けの初期の徹甲弾。薄い装甲しか貫通できない。", "#ff6b6b",
        ),
        shell(
            "ap-45mm-prewar", "45mm BR-240", "45 mm", ShellType::Ap,
            PenetrationTable::new(43.0, 35.0, 28.0, 20.0), 760.0,
            Period::Interwar, "ソ連", 1934,
            "BT・T-26軽戦車の主力弾。軽装甲に有効。", "#ffd93d",
        ),
        shell(
            "ap-76mm-early", "76mm BR-350A", "76.2 mm", ShellType::Aphe,
            PenetrationTable::new(69.0, 61.0, 51.0, 43.0), 662.0,
            Period::WorldWar2, "ソ連", 1940,
            "T-34・KV-1の主力弾。被帽により傾斜装甲への貫通力が向上。", "#6bcf7f",
        ),
        shell(
            "apcr-76mm", "76mm BR-350P", "76.2 mm", ShellType::Apcr,
            PenetrationTable::new(92.0, 74.0, 55.0, 40.0), 950.0,
            Period::WorldWar2, "ソ連", 1943,
            "タングステン芯の硬芯徹甲弾。近距離で高い貫通力を持つ。", "#4dabf7",
        ),
        shell(
            "ap-88mm-german", "88mm Pzgr.39", "88 mm", ShellType::Aphe,
            PenetrationTable::new(165.0, 153.0, 138.0, 120.0), 773.0,
            Period::WorldWar2, "ドイツ", 1941,
            "ティーガー・フェルディナントの88mm砲弾。中戦車ならどれでも貫通する。", "#845ef7",
        ),
        shell(
            "ap-85mm", "85mm BR-365", "85 mm", ShellType::Aphe,
            PenetrationTable::new(102.0, 87.0, 69.0, 54.0), 792.0,
            Period::WorldWar2, "ソ連", 1944,
            "T-34-85・IS-1の砲弾。ティーガーやパンターの側面を撃ち抜ける。", "#20c997",
        ),
        shell(
            "ap-122mm", "122mm BR-471", "122 mm", ShellType::Aphe,
            PenetrationTable::new(145.0, 135.0, 120.0, 110.0), 781.0,
            Period::WorldWar2, "ソ連", 1943,
            "IS-2・IS-3の強力な砲弾。炸薬による装甲後方への効果が大きい。", "#f03e3e",
        ),
        shell(
            "heat-90mm", "90mm 成形炸薬弾", "90 mm", ShellType::Heat,
            PenetrationTable::flat(280.0), 914.0,
            Period::ColdWar, "アメリカ", 1950,
            "全距離で貫通力が一定のメタルジェットで装甲を穿つ。", "#ff8787",
        ),
        shell(
            "apds-105mm", "105mm L28A1", "105 mm", ShellType::Apds,
            PenetrationTable::new(268.0, 240.0, 200.0, 170.0), 1470.0,
            Period::ColdWar, "イギリス", 1958,
            "高初速による高い貫通力を持つ装弾筒付徹甲弾。", "#5c7cfa",
        ),
        shell(
            "apfsds-125mm", "125mm 3BM42 Mango", "125 mm", ShellType::Apfsds,
            PenetrationTable::new(470.0, 450.0, 420.0, 380.0), 1700.0,
            Period::Modern, "ソ連/ロシア", 1986,
            "タングステン芯の現代的な翼安定徹甲弾。複合装甲を貫通する。", "#e64980",
        ),
        shell(
            "apfsds-125mm-modern", "125mm 3BM60 Svinets", "125 mm", ShellType::Apfsds,
            PenetrationTable::new(650.0, 630.0, 600.0, 550.0), 1750.0,
            Period::Modern, "ロシア", 2015,
            "T-90M・T-14向けの最新翼安定徹甲弾。爆発反応装甲付きの複合装甲を貫通する。", "#ae3ec9",
        ),
        shell(
            "heat-125mm", "125mm 3BK29", "125 mm", ShellType::Heat,
            PenetrationTable::flat(550.0), 905.0,
            Period::Modern, "ソ連/ロシア", 1985,
            "強力な成形炸薬弾。タンデム弾頭で爆発反応装甲にも有効。", "#fd7e14",
        ),
        shell(
            "apfsds-120mm-nato", "120mm DM53", "120 mm", ShellType::Apfsds,
            PenetrationTable::new(560.0, 540.0, 510.0, 470.0), 1650.0,
            Period::Modern, "ドイツ/NATO", 2000,
            "レオパルト2・M1エイブラムス向けのタングステン芯翼安定徹甲弾。", "#15aabf",
        ),
        shell(
            "he-152mm", "152mm OF-530", "152 mm", ShellType::He,
            PenetrationTable::flat(0.0), 655.0,
            Period::WorldWar2, "ソ連", 1940,
            "KV-2の榴弾。装甲は貫通しないが、爆風で陣地や車両を破壊する。", "#fa5252",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = AmmunitionCatalog::builtin();
        assert_eq!(catalog.len(), 14);
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_lookup_and_period_filter() {
        let catalog = AmmunitionCatalog::builtin();
        let shell = catalog.get("ap-88mm-german").expect("88mm shell");
        assert_eq!(shell.penetration.distance_500m, 153.0);
        assert!(catalog.get("missing").is_none());

        let modern = catalog.shells_for_period(Period::Modern);
        assert_eq!(modern.len(), 4);
        assert!(modern.iter().all(|s| s.period == Period::Modern));
    }

    #[test]
    fn test_eligible_shells_for_service_period() {
        let catalog = AmmunitionCatalog::builtin();
        // 1941年配備の目標には1931年以降の砲弾が使用可能
        let eligible = catalog.eligible_shells(1941);
        assert!(eligible.iter().all(|s| s.year >= 1931));
        assert!(eligible.iter().any(|s| s.id == "ap-45mm-prewar"));
        assert!(!eligible.iter().any(|s| s.id == "ap-37mm-ww1"));
    }

    #[test]
    fn test_validation_rejects_bad_shapes() {
        let mut shells = AmmunitionCatalog::builtin().shells().to_vec();
        shells[0].penetration = PenetrationTable::new(10.0, 15.0, 10.0, 5.0);
        assert!(matches!(
            AmmunitionCatalog::from_shells(shells),
            Err(CatalogError::ValidationError(_))
        ));

        let mut shells = AmmunitionCatalog::builtin().shells().to_vec();
        let heat = shells.iter_mut().find(|s| s.shell_type == ShellType::Heat).expect("heat shell");
        heat.penetration.distance_1500m = 100.0;
        assert!(AmmunitionCatalog::from_shells(shells).is_err());

        let mut shells = AmmunitionCatalog::builtin().shells().to_vec();
        let duplicate = shells[1].clone();
        shells.push(duplicate);
        assert!(AmmunitionCatalog::from_shells(shells).is_err());

        let mut shells = AmmunitionCatalog::builtin().shells().to_vec();
        shells[2].velocity_mps = 0.0;
        assert!(AmmunitionCatalog::from_shells(shells).is_err());
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r##"
shells:
  - id: ap-test
    name: 試験徹甲弾
    caliber: 50 mm
    type: APCR
    penetration:
      distance_100m: 100
      distance_500m: 80
      distance_1000m: 60
      distance_1500m: 40
    velocity_mps: 1000
    period: world_war2
    country: 試験国
    year: 1942
    description: 試験用
    color: "#ffffff"
"##;
        let catalog = AmmunitionCatalog::from_yaml_str(yaml).expect("valid catalog");
        let shell = catalog.get("ap-test").expect("ap-test");
        assert_eq!(shell.shell_type, ShellType::Apcr);
        assert_eq!(shell.penetration.distance_1000m, 60.0);

        assert!(AmmunitionCatalog::from_yaml_str("shells: [ { id: x } ]").is_err());
        assert!(matches!(
            AmmunitionCatalog::from_yaml_str("shells: []"),
            Err(CatalogError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AmmunitionCatalog::from_file("no/such/catalog.yaml"),
            Err(CatalogError::FileNotFound(_))
        ));
    }
}
