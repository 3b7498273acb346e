//! # Simulation モジュール
//!
//! シナリオのコマンド列を射撃シーケンス制御に対して再生するシミュレーション
//! エンジンを提供します。
//!
//! 固定時間刻み（Δt）で時間を進め、各ステップで以下の順に処理します：
//!
//! 1. **コマンド処理**: 現在時刻までに予定されたコマンドを制御器に適用
//! 2. **制御器処理**: 制御器の時計をΔt進め、飛翔・着弾・結果表示の締切を判定
//! 3. **通知処理**: 状態遷移通知を受け取り、ログと実行レポートに記録
//!
//! `run_realtime` はtokioのタイマーで各ステップを実時間に合わせて実行します。
//!
//! ## 使用例
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use crate::models::AmmunitionCatalog;
//! use crate::scenario::ScenarioConfig;
//! use crate::simulation::SimulationEngine;
//!
//! let config = ScenarioConfig::from_file("scenarios/tiger_front.yaml")?;
//! let catalog = Arc::new(AmmunitionCatalog::builtin());
//!
//! let mut engine = SimulationEngine::new(config, catalog, 1);
//! engine.initialize()?;
//! engine.run()?;
//! ```

use std::collections::VecDeque;
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::models::*;
use crate::scenario::{CommandAction, ScenarioConfig};

/// コマンド時刻の比較誤差
const TIME_EPSILON: f64 = 1e-9;

/// 着弾記録
#[derive(Debug, Clone, PartialEq)]
pub struct ShotRecord {
    pub time_s: f64,
    pub outcome: ShotOutcome,
}

/// 却下されたコマンドの記録
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRejection {
    pub time_s: f64,
    pub action: CommandAction,
    pub error: FireError,
}

/// 実行レポート
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub shots: Vec<ShotRecord>,
    pub rejections: Vec<CommandRejection>,
    pub transitions: usize,
}

impl RunReport {
    pub fn penetrations(&self) -> usize {
        self.shots.iter().filter(|s| s.outcome.penetrated).count()
    }

    pub fn print_summary(&self) {
        println!("=== 射撃結果 ===");
        println!("着弾数: {}", self.shots.len());
        println!("貫通数: {}", self.penetrations());
        for shot in &self.shots {
            println!("  {:>6.2}秒 [{}] {}", shot.time_s, shot.outcome.shell_id, shot.outcome.message);
        }
        if !self.rejections.is_empty() {
            println!("却下されたコマンド: {}", self.rejections.len());
            for rejection in &self.rejections {
                println!("  {:>6.2}秒 {}: {}", rejection.time_s, rejection.action, rejection.error);
            }
        }
    }
}

pub struct SimulationEngine {
    pub current_time: f64,
    pub dt: f64,
    pub max_time: f64,
    pub step_count: u64,

    pub controller: FireSequenceController<AmmunitionCatalog>,
    pub commands: VecDeque<(f64, CommandAction)>,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,

    notifications: mpsc::Receiver<FireNotification>,
    report: RunReport,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, catalog: Arc<AmmunitionCatalog>, verbose_level: u8) -> Self {
        let dt = scenario.sim.dt_s;
        let max_time = scenario.sim.t_max_s;

        let mut controller =
            FireSequenceController::new(catalog, scenario.initial_armor_mm(), scenario.sim.pacing());
        if let Some(year) = scenario.target.service_start_year() {
            controller = controller.with_service_start_year(year);
        }

        let (sender, notifications) = mpsc::channel();
        controller.subscribe(Box::new(sender));

        Self {
            current_time: 0.0,
            dt,
            max_time,
            step_count: 0,
            controller,
            commands: VecDeque::new(),
            scenario_config: scenario,
            verbose_level,
            notifications,
            report: RunReport::default(),
        }
    }

    pub fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        self.controller.set_distance(self.scenario_config.initial.distance_m)?;
        if let Some(shell_id) = self.scenario_config.initial.shell.clone() {
            self.controller.select_shell(&shell_id)?;
        }

        self.commands = self.scenario_config.scheduled_commands()?.into();

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  目標: {} ({})", self.scenario_config.target.name, self.scenario_config.target.face);
            info!("  装甲厚: {:.0}mm", self.controller.armor_thickness());
            info!("  使用可能な砲弾: {}種", self.controller.available_shells().len());
            info!("  コマンド: {}件", self.commands.len());
        }

        if self.verbose_level > 1 {
            if let Some(preview) = self.controller.penetration_preview() {
                debug!("初期貫通値: {:.0}mm ({:.0}m)", preview, self.controller.distance());
            }
        }

        Ok(())
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("=== シミュレーション実行開始 ===");

        while self.current_time < self.max_time {
            self.step();
            self.log_progress();
        }

        self.log_completion();
        Ok(())
    }

    /// 実時間に合わせて実行
    pub fn run_realtime(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("=== シミュレーション実行開始 (実時間) ===");

        let period = Duration::try_from_secs_f64(self.dt)?;
        if period.is_zero() {
            return Err(format!("時間刻みが短すぎます: {}秒", self.dt).into());
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        runtime.block_on(async {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            while self.current_time < self.max_time {
                interval.tick().await;
                self.step();
                self.log_progress();
            }
        });

        self.log_completion();
        Ok(())
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    fn step(&mut self) {
        self.process_commands();
        self.controller.tick(self.dt);
        self.process_notifications();

        self.step_count += 1;
        self.current_time = self.step_count as f64 * self.dt;
    }

    fn process_commands(&mut self) {
        while let Some((at_s, _)) = self.commands.front() {
            if *at_s > self.current_time + TIME_EPSILON {
                break;
            }
            let Some((at_s, action)) = self.commands.pop_front() else {
                break;
            };

            let result = match &action {
                CommandAction::Select(shell_id) => self.controller.select_shell(shell_id),
                CommandAction::Distance(distance_m) => self.controller.set_distance(*distance_m),
                CommandAction::Face(face) => match self.scenario_config.target.armor.thickness(*face) {
                    Some(thickness) => self.controller.set_armor_thickness(thickness),
                    None => Err(FireError::InvalidRequest(format!("被弾面 {} の装甲厚がありません", face))),
                },
                CommandAction::Fire => self.controller.fire(),
                CommandAction::Reset => {
                    self.controller.reset();
                    Ok(())
                }
            };

            match result {
                Ok(()) => debug!("コマンド実行: {:.2}秒 {}", at_s, action),
                Err(error) => {
                    warn!("コマンド却下: {:.2}秒 {}: {}", at_s, action, error);
                    self.report.rejections.push(CommandRejection { time_s: at_s, action, error });
                }
            }
        }
    }

    fn process_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            self.report.transitions += 1;

            if self.verbose_level > 1 {
                debug!("状態遷移: {:.2}秒 → {}", notification.time_s, notification.state);
            }

            if let Some(outcome) = notification.result {
                info!(
                    "結果: {:.2}秒 [{}] {} ({:?})",
                    notification.time_s,
                    outcome.shell_id,
                    outcome.message,
                    ArmorTier::classify(outcome.armor_mm)
                );
                self.report.shots.push(ShotRecord {
                    time_s: notification.time_s,
                    outcome,
                });
            }
        }
    }

    fn log_progress(&self) {
        if self.verbose_level > 2 {
            trace!(
                "時刻: {:.2}秒 (ステップ: {}, 状態: {})",
                self.current_time,
                self.step_count,
                self.controller.state()
            );
        }

        if self.step_count % 100 == 0 && self.verbose_level > 0 {
            let progress = (self.current_time / self.max_time) * 100.0;
            info!("進行状況: {:.1}% ({:.1}/{:.1}秒)", progress, self.current_time, self.max_time);
        }
    }

    fn log_completion(&self) {
        info!("=== シミュレーション完了 ===");
        info!("実行時間: {:.1}秒", self.current_time);
        info!("総ステップ数: {}", self.step_count);
        info!("着弾数: {} (貫通 {})", self.report.shots.len(), self.report.penetrations());
        if let Some(event) = self.controller.event() {
            info!("未完了の射撃: {} ({}秒に発射)", event.shell.id, event.fired_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
meta:
  version: "1.0"
  name: Tiger engagement
  description: 76mm then 88mm against a Tiger
sim:
  dt_s: 0.1
  t_max_s: 10.0
  flight_scale_m: 500
  settle_s: 1.0
target:
  name: Tiger I
  service_period: "1942-1945"
  armor:
    front: 100
    side: 80
    rear: 80
    turret: 100
initial:
  shell: ap-76mm-early
  distance_m: 500
commands:
  - { at_s: 0.5, action: fire }
  - { at_s: 0.6, action: fire }
  - { at_s: 3.0, action: select, shell: ap-88mm-german }
  - { at_s: 3.0, action: fire }
  - { at_s: 6.0, action: face, face: side }
  - { at_s: 6.0, action: distance, distance_m: 900 }
  - { at_s: 6.0, action: select, shell: ap-76mm-early }
  - { at_s: 6.0, action: fire }
  - { at_s: 6.5, action: reset }
"#;

    fn engine() -> SimulationEngine {
        let scenario = ScenarioConfig::from_yaml_str(SCENARIO).expect("valid scenario");
        let mut engine = SimulationEngine::new(scenario, Arc::new(AmmunitionCatalog::builtin()), 0);
        engine.initialize().expect("initialize");
        engine
    }

    #[test]
    fn test_replays_timeline() {
        let mut engine = engine();
        engine.run().expect("run");

        let report = engine.report();
        // 6.5秒のresetで3発目は着弾前に破棄される
        assert_eq!(report.shots.len(), 2);

        let first = &report.shots[0].outcome;
        assert_eq!(first.shell_id, "ap-76mm-early");
        assert!(!first.penetrated); // 61mm vs 100mm

        let second = &report.shots[1].outcome;
        assert_eq!(second.shell_id, "ap-88mm-german");
        assert!(second.penetrated); // 153mm vs 100mm
        assert_eq!(second.penetration_mm, 153.0);

        // 0.6秒の2発目は飛翔中のため却下
        assert_eq!(report.rejections.len(), 1);
        assert_eq!(report.rejections[0].action, CommandAction::Fire);
        assert_eq!(report.rejections[0].error, FireError::AlreadyInProgress);

        assert_eq!(engine.controller.state(), FireState::Idle);
        assert!(engine.controller.event().is_none());
    }

    #[test]
    fn test_impact_time_follows_velocity() {
        let mut engine = engine();
        engine.run().expect("run");

        // 662m/s → 500/662 ≈ 0.755秒後に着弾
        let first = &engine.report().shots[0];
        assert!((first.time_s - (0.5 + 500.0 / 662.0)).abs() < 1e-6);
    }

    #[test]
    fn test_face_change_updates_armor() {
        let mut engine = engine();
        while engine.current_time < 6.2 {
            engine.step();
        }
        assert_eq!(engine.controller.armor_thickness(), 80.0);
        assert_eq!(engine.controller.distance(), 900.0);
        assert_eq!(engine.controller.state(), FireState::Firing);
    }

    #[test]
    fn test_realtime_runs_to_max_time() {
        let short = SCENARIO
            .replace("t_max_s: 10.0", "t_max_s: 0.3")
            .split("commands:")
            .next()
            .map(|head| format!("{}commands:\n  - {{ at_s: 0.1, action: fire }}\n", head))
            .expect("scenario head");
        let scenario = ScenarioConfig::from_yaml_str(&short).expect("valid scenario");
        let mut engine = SimulationEngine::new(scenario, Arc::new(AmmunitionCatalog::builtin()), 0);
        engine.initialize().expect("initialize");
        engine.run_realtime().expect("run_realtime");

        assert_eq!(engine.step_count, 3);
        assert!((engine.current_time - 0.3).abs() < 1e-9);
        // 0.1秒に発射、着弾は0.1 + 500/662秒のため未着弾
        assert_eq!(engine.controller.state(), FireState::Firing);
        assert!(engine.report().shots.is_empty());
        assert!(engine.report().rejections.is_empty());
    }

    #[test]
    fn test_ineligible_initial_shell_fails_initialize() {
        let scenario = SCENARIO.replace("shell: ap-76mm-early\n  distance_m", "shell: ap-37mm-ww1\n  distance_m");
        let scenario = ScenarioConfig::from_yaml_str(&scenario).expect("valid scenario");
        let mut engine = SimulationEngine::new(scenario, Arc::new(AmmunitionCatalog::builtin()), 0);
        assert!(engine.initialize().is_err());
    }
}
