use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::models::{
    armor::{parse_service_start_year, ArmorFace, ArmorProfile, ArmorTier},
    common::{PacingConfig, DEFAULT_FIRING_DISTANCE_M, DEFAULT_FLIGHT_SCALE_M, DEFAULT_SETTLE_S, is_in_firing_range},
};

/// シナリオメタデータ
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
    #[serde(default = "default_flight_scale_m")]
    pub flight_scale_m: f64,
    #[serde(default = "default_settle_s")]
    pub settle_s: f64,
}

impl SimulationConfig {
    pub fn pacing(&self) -> PacingConfig {
        PacingConfig {
            flight_scale_m: self.flight_scale_m,
            settle_s: self.settle_s,
        }
    }
}

fn default_flight_scale_m() -> f64 {
    DEFAULT_FLIGHT_SCALE_M
}

fn default_settle_s() -> f64 {
    DEFAULT_SETTLE_S
}

fn default_distance_m() -> f64 {
    DEFAULT_FIRING_DISTANCE_M
}

/// 目標設定
#[derive(Debug, Deserialize, Serialize)]
pub struct TargetConfig {
    pub name: String,
    /// 配備期間（"1941-1945" など）
    pub service_period: String,
    pub armor: ArmorProfile,
    #[serde(default)]
    pub face: ArmorFace,
}

impl TargetConfig {
    pub fn service_start_year(&self) -> Option<i32> {
        parse_service_start_year(&self.service_period)
    }
}

/// 初期状態
#[derive(Debug, Deserialize, Serialize)]
pub struct InitialConfig {
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default = "default_distance_m")]
    pub distance_m: f64,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            shell: None,
            distance_m: DEFAULT_FIRING_DISTANCE_M,
        }
    }
}

/// コマンドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Select,
    Distance,
    Face,
    Fire,
    Reset,
}

/// 時刻指定コマンド
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandConfig {
    pub at_s: f64,
    pub action: ActionKind,
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub face: Option<ArmorFace>,
}

/// 検証済みのコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    Select(String),
    Distance(f64),
    Face(ArmorFace),
    Fire,
    Reset,
}

impl std::fmt::Display for CommandAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandAction::Select(shell) => write!(f, "select({})", shell),
            CommandAction::Distance(distance) => write!(f, "distance({:.0}m)", distance),
            CommandAction::Face(face) => write!(f, "face({})", face),
            CommandAction::Fire => write!(f, "fire"),
            CommandAction::Reset => write!(f, "reset"),
        }
    }
}

impl CommandConfig {
    /// パラメータの揃ったコマンドに変換
    pub fn to_action(&self) -> Result<CommandAction, ScenarioError> {
        let missing = |field: &str| {
            ScenarioError::ValidationError(format!(
                "{:?} command at {:.2}s requires '{}'",
                self.action, self.at_s, field
            ))
        };

        match self.action {
            ActionKind::Select => self
                .shell
                .clone()
                .map(CommandAction::Select)
                .ok_or_else(|| missing("shell")),
            ActionKind::Distance => self
                .distance_m
                .map(CommandAction::Distance)
                .ok_or_else(|| missing("distance_m")),
            ActionKind::Face => self.face.map(CommandAction::Face).ok_or_else(|| missing("face")),
            ActionKind::Fire => Ok(CommandAction::Fire),
            ActionKind::Reset => Ok(CommandAction::Reset),
        }
    }
}

/// 完全なシナリオ設定
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub target: TargetConfig,
    #[serde(default)]
    pub initial: InitialConfig,
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        // YAML解析
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        // 基本的な検証
        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    #[cfg(test)]
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError(Path::new("<inline>").to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // 時間設定の検証
        // NaN・無限大は比較をすり抜けるため先に弾く
        if !self.sim.dt_s.is_finite() || self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::ValidationError("dt_s must be a finite positive number".to_string()));
        }
        if !self.sim.t_max_s.is_finite() || self.sim.t_max_s <= 0.0 {
            return Err(ScenarioError::ValidationError("t_max_s must be a finite positive number".to_string()));
        }
        if !self.sim.flight_scale_m.is_finite() || self.sim.flight_scale_m <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "flight_scale_m must be a finite positive number".to_string(),
            ));
        }
        if !self.sim.settle_s.is_finite() || self.sim.settle_s < 0.0 {
            return Err(ScenarioError::ValidationError(
                "settle_s must be a finite non-negative number".to_string(),
            ));
        }

        // 目標の検証
        if self.target.service_start_year().is_none() {
            return Err(ScenarioError::ValidationError(format!(
                "Invalid service_period: {}",
                self.target.service_period
            )));
        }
        if !self.target.armor.is_valid() {
            return Err(ScenarioError::ValidationError("Armor thickness must be non-negative".to_string()));
        }
        if self.target.armor.thickness(self.target.face).is_none() {
            return Err(ScenarioError::ValidationError(format!(
                "No armor value for face {:?}",
                self.target.face
            )));
        }

        // 初期距離の検証
        if !is_in_firing_range(self.initial.distance_m) {
            return Err(ScenarioError::ValidationError(format!(
                "Initial distance {} outside 100-1500m",
                self.initial.distance_m
            )));
        }

        // コマンドの検証
        for command in &self.commands {
            if !command.at_s.is_finite() || command.at_s < 0.0 || command.at_s >= self.sim.t_max_s {
                return Err(ScenarioError::ValidationError(format!(
                    "Command {:?} time {} outside simulation time {}",
                    command.action, command.at_s, self.sim.t_max_s
                )));
            }
            if let CommandAction::Face(face) = command.to_action()? {
                if self.target.armor.thickness(face).is_none() {
                    return Err(ScenarioError::ValidationError(format!(
                        "No armor value for face {:?}",
                        face
                    )));
                }
            }
        }

        Ok(())
    }

    /// 時刻順に並べた検証済みコマンド
    pub fn scheduled_commands(&self) -> Result<Vec<(f64, CommandAction)>, ScenarioError> {
        let mut commands = self
            .commands
            .iter()
            .map(|command| command.to_action().map(|action| (command.at_s, action)))
            .collect::<Result<Vec<_>, _>>()?;
        // 同時刻のコマンドは記述順を維持
        commands.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(commands)
    }

    /// 初期の被弾面の装甲厚
    pub fn initial_armor_mm(&self) -> f64 {
        self.target.armor.thickness(self.target.face).unwrap_or(self.target.armor.front)
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒", self.sim.t_max_s);
        println!("飛翔時間係数: {:.0}m", self.sim.flight_scale_m);
        println!("結果表示時間: {:.1}秒", self.sim.settle_s);
        println!();

        println!("=== 目標 ===");
        println!("名前: {}", self.target.name);
        println!("配備期間: {}", self.target.service_period);
        let armor = &self.target.armor;
        for face in [ArmorFace::Front, ArmorFace::Side, ArmorFace::Rear, ArmorFace::Turret, ArmorFace::Top] {
            if let Some(thickness) = armor.thickness(face) {
                println!("  {}: {:.0}mm ({:?})", face, thickness, ArmorTier::classify(thickness));
            }
        }
        println!("被弾面: {}", self.target.face);
        println!();

        println!("=== コマンド ===");
        println!("コマンド数: {}", self.commands.len());
        for command in &self.commands {
            match command.to_action() {
                Ok(action) => println!("  {:>6.2}秒: {}", command.at_s, action),
                Err(e) => println!("  {:>6.2}秒: {}", command.at_s, e),
            }
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}

#[cfg(test)]
mod tests {
    use super::*;

    const TIGER_SCENARIO: &str = r#"
meta:
  version: "1.0"
  name: Tiger front
  description: 88mm vs 76mm against a Tiger
sim:
  dt_s: 0.1
  t_max_s: 10.0
target:
  name: Tiger I
  service_period: "1942-1945"
  armor:
    front: 100
    side: 80
    rear: 80
    turret: 100
  face: front
initial:
  shell: ap-76mm-early
  distance_m: 500
commands:
  - { at_s: 3.0, action: select, shell: ap-88mm-german }
  - { at_s: 0.5, action: fire }
  - { at_s: 3.5, action: fire }
  - { at_s: 2.5, action: face, face: side }
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = ScenarioConfig::from_yaml_str(TIGER_SCENARIO).expect("valid scenario");
        assert_eq!(scenario.target.service_start_year(), Some(1942));
        assert_eq!(scenario.initial_armor_mm(), 100.0);
        assert_eq!(scenario.sim.settle_s, DEFAULT_SETTLE_S);
        assert_eq!(scenario.sim.pacing().flight_scale_m, DEFAULT_FLIGHT_SCALE_M);

        let commands = scenario.scheduled_commands().expect("commands");
        let times: Vec<f64> = commands.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![0.5, 2.5, 3.0, 3.5]);
        assert_eq!(commands[1].1, CommandAction::Face(ArmorFace::Side));
        assert_eq!(commands[2].1, CommandAction::Select("ap-88mm-german".to_string()));
    }

    #[test]
    fn test_validation_errors() {
        let bad_dt = TIGER_SCENARIO.replace("dt_s: 0.1", "dt_s: 0.0");
        assert!(matches!(
            ScenarioConfig::from_yaml_str(&bad_dt),
            Err(ScenarioError::ValidationError(_))
        ));

        let late_command = TIGER_SCENARIO.replace("at_s: 3.5", "at_s: 10.0");
        assert!(ScenarioConfig::from_yaml_str(&late_command).is_err());

        let missing_param = TIGER_SCENARIO.replace("action: select, shell: ap-88mm-german", "action: select");
        assert!(ScenarioConfig::from_yaml_str(&missing_param).is_err());

        let top_face = TIGER_SCENARIO.replace("face: side }", "face: top }");
        assert!(ScenarioConfig::from_yaml_str(&top_face).is_err());

        let bad_period = TIGER_SCENARIO.replace("\"1942-1945\"", "unknown");
        assert!(ScenarioConfig::from_yaml_str(&bad_period).is_err());

        let far = TIGER_SCENARIO.replace("distance_m: 500", "distance_m: 3000");
        assert!(ScenarioConfig::from_yaml_str(&far).is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let cases = [
            ("dt_s: 0.1", "dt_s: .nan"),
            ("dt_s: 0.1", "dt_s: .inf"),
            ("t_max_s: 10.0", "t_max_s: .inf"),
            ("t_max_s: 10.0", "t_max_s: .nan"),
            ("t_max_s: 10.0", "t_max_s: 10.0\n  flight_scale_m: .nan"),
            ("t_max_s: 10.0", "t_max_s: 10.0\n  settle_s: .inf"),
            ("at_s: 0.5", "at_s: .nan"),
        ];
        for (from, to) in cases {
            let yaml = TIGER_SCENARIO.replace(from, to);
            assert!(
                matches!(ScenarioConfig::from_yaml_str(&yaml), Err(ScenarioError::ValidationError(_))),
                "{} should be rejected",
                to
            );
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ScenarioConfig::from_yaml_str("meta: [oops"),
            Err(ScenarioError::ParseError(_, _))
        ));
        assert!(matches!(
            ScenarioConfig::from_file("scenarios/does_not_exist.yaml"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
