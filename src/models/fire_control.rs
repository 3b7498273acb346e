//! # Fire Control モジュール
//!
//! 1回の射撃を「発射 → 飛翔 → 着弾 → 結果表示 → 待機」の順に進める
//! 射撃シーケンス制御を提供します。
//!
//! 状態は `Idle → Firing → Resolved → Idle` と遷移し、各状態の終了時刻は
//! 遷移時に計算された締切時刻で管理されます。時間は外部のティック駆動
//! （固定Δtループやタイマー）から [`FireSequenceController::tick`] で進めます。
//! 描画側は [`IFireObserver`] を購読して状態遷移を受け取ります。
//!
//! 射撃中・結果表示中に砲弾・距離・装甲厚を変更した場合は、進行中の射撃を
//! 破棄して待機状態に戻してから変更を適用します。`reset` はどの状態からでも
//! 呼び出せ、何度呼んでも同じ結果になります。

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{
    common::{FireState, PacingConfig, DEFAULT_FIRING_DISTANCE_M, is_in_firing_range},
    penetration::{evaluate_shot, is_eligible, penetration_at_distance, ShotOutcome},
    shell::Shell,
    traits::{IFireObserver, IShellCatalog},
};

/// 状態遷移通知
#[derive(Debug, Clone, PartialEq)]
pub struct FireNotification {
    /// 遷移後の状態
    pub state: FireState,
    /// Resolvedへの遷移時のみ設定
    pub result: Option<ShotOutcome>,
    /// 遷移時刻（制御器の時計、秒）
    pub time_s: f64,
}

/// 進行中の射撃
#[derive(Debug, Clone)]
pub struct FireEvent {
    pub shell: Shell,
    pub armor_mm: f64,
    pub distance_m: f64,
    pub fired_at: f64,
    /// 着弾時刻
    pub impact_at: f64,
    /// 待機に戻る時刻（着弾時に確定）
    pub settle_at: Option<f64>,
    pub result: Option<ShotOutcome>,
}

/// 射撃シーケンス制御のエラー
#[derive(Debug, Clone, PartialEq)]
pub enum FireError {
    /// 必要な入力がない、または不正
    InvalidRequest(String),
    /// 射撃が既に進行中
    AlreadyInProgress,
    /// 射撃距離が操作範囲外
    OutOfRange(f64),
}

impl fmt::Display for FireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireError::InvalidRequest(msg) => write!(f, "不正な要求: {}", msg),
            FireError::AlreadyInProgress => write!(f, "射撃が既に進行中です"),
            FireError::OutOfRange(distance) => {
                write!(f, "射撃距離が範囲外です: {:.0}m (100〜1500m)", distance)
            }
        }
    }
}

impl std::error::Error for FireError {}

/// 射撃距離の検証
pub fn validate_distance(distance_m: f64) -> Result<(), FireError> {
    if is_in_firing_range(distance_m) {
        Ok(())
    } else {
        Err(FireError::OutOfRange(distance_m))
    }
}

/// 射撃シーケンス制御
pub struct FireSequenceController<C: IShellCatalog + ?Sized> {
    catalog: Arc<C>,
    pacing: PacingConfig,
    state: FireState,
    /// 制御器の時計（秒）
    clock: f64,
    selected_shell: Option<String>,
    distance_m: f64,
    armor_mm: f64,
    service_start_year: Option<i32>,
    event: Option<FireEvent>,
    /// 待機に戻った後も表示を続ける直前の結果
    last_result: Option<ShotOutcome>,
    observers: Vec<Box<dyn IFireObserver>>,
}

impl<C: IShellCatalog + ?Sized> FireSequenceController<C> {
    pub fn new(catalog: Arc<C>, armor_mm: f64, pacing: PacingConfig) -> Self {
        Self {
            catalog,
            pacing,
            state: FireState::Idle,
            clock: 0.0,
            selected_shell: None,
            distance_m: DEFAULT_FIRING_DISTANCE_M,
            armor_mm,
            service_start_year: None,
            event: None,
            last_result: None,
            observers: Vec::new(),
        }
    }

    /// 目標の配備開始年を設定（選択可能な砲弾を絞り込む）
    pub fn with_service_start_year(mut self, year: i32) -> Self {
        self.service_start_year = Some(year);
        self
    }

    /// 状態遷移通知の購読
    pub fn subscribe(&mut self, observer: Box<dyn IFireObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> FireState {
        self.state
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn distance(&self) -> f64 {
        self.distance_m
    }

    pub fn armor_thickness(&self) -> f64 {
        self.armor_mm
    }

    pub fn event(&self) -> Option<&FireEvent> {
        self.event.as_ref()
    }

    pub fn selected_shell(&self) -> Option<&Shell> {
        self.selected_shell
            .as_deref()
            .and_then(|id| self.catalog.get_shell(id))
    }

    /// 表示中の射撃結果
    pub fn result(&self) -> Option<&ShotOutcome> {
        match &self.event {
            Some(event) => event.result.as_ref(),
            None => self.last_result.as_ref(),
        }
    }

    /// 選択可能な砲弾の一覧
    pub fn available_shells(&self) -> Vec<&Shell> {
        match self.service_start_year {
            Some(year) => self.catalog.eligible_shells(year),
            None => self.catalog.shells().iter().collect(),
        }
    }

    /// 選択中の砲弾の現在距離における貫通値（表示用の補間値）
    pub fn penetration_preview(&self) -> Option<f64> {
        self.selected_shell()
            .map(|shell| penetration_at_distance(shell, self.distance_m))
    }

    /// 砲弾の選択
    pub fn select_shell(&mut self, id: &str) -> Result<(), FireError> {
        let shell = self
            .catalog
            .get_shell(id)
            .ok_or_else(|| FireError::InvalidRequest(format!("未知の砲弾ID: {}", id)))?;

        if let Some(year) = self.service_start_year {
            if !is_eligible(shell, year) {
                return Err(FireError::InvalidRequest(format!(
                    "砲弾 {} ({}年) は {}年配備の目標に使用できません",
                    id, shell.year, year
                )));
            }
        }

        self.reset();
        self.selected_shell = Some(id.to_string());
        debug!("砲弾選択: {}", id);
        Ok(())
    }

    /// 射撃距離の設定
    pub fn set_distance(&mut self, distance_m: f64) -> Result<(), FireError> {
        validate_distance(distance_m)?;
        self.reset();
        self.distance_m = distance_m;
        debug!("射撃距離設定: {:.0}m", distance_m);
        Ok(())
    }

    /// 目標の装甲厚の設定
    pub fn set_armor_thickness(&mut self, armor_mm: f64) -> Result<(), FireError> {
        if !armor_mm.is_finite() || armor_mm < 0.0 {
            return Err(FireError::InvalidRequest(format!("不正な装甲厚: {}", armor_mm)));
        }
        self.reset();
        self.armor_mm = armor_mm;
        debug!("装甲厚設定: {:.0}mm", armor_mm);
        Ok(())
    }

    /// 射撃開始
    pub fn fire(&mut self) -> Result<(), FireError> {
        if self.state != FireState::Idle {
            return Err(FireError::AlreadyInProgress);
        }

        let shell = self
            .selected_shell()
            .cloned()
            .ok_or_else(|| FireError::InvalidRequest("砲弾が選択されていません".to_string()))?;

        validate_distance(self.distance_m)?;

        let flight_s = self.pacing.flight_duration(shell.velocity_mps);
        info!(
            "発射: {} → 装甲 {:.0}mm, 距離 {:.0}m (飛翔 {:.2}秒)",
            shell.id, self.armor_mm, self.distance_m, flight_s
        );

        self.last_result = None;
        self.event = Some(FireEvent {
            shell,
            armor_mm: self.armor_mm,
            distance_m: self.distance_m,
            fired_at: self.clock,
            impact_at: self.clock + flight_s,
            settle_at: None,
            result: None,
        });
        self.transition(FireState::Firing, self.clock, None);

        Ok(())
    }

    /// 射撃の破棄（どの状態からでも待機に戻る）
    pub fn reset(&mut self) {
        self.event = None;
        self.last_result = None;

        if self.state != FireState::Idle {
            debug!("射撃を破棄: {}", self.state);
            self.transition(FireState::Idle, self.clock, None);
        }
    }

    /// 時間を進める
    ///
    /// 1回のティックで複数の締切を越えた場合は、各遷移を順に発生させます。
    pub fn tick(&mut self, dt: f64) {
        if dt > 0.0 {
            self.clock += dt;
        }

        loop {
            let deadline = match (self.state, &self.event) {
                (FireState::Firing, Some(event)) => event.impact_at,
                (FireState::Resolved, Some(event)) => match event.settle_at {
                    Some(settle_at) => settle_at,
                    None => break,
                },
                _ => break,
            };

            if self.clock < deadline {
                break;
            }

            match self.state {
                FireState::Firing => self.resolve(),
                FireState::Resolved => self.settle(),
                FireState::Idle => break,
            }
        }
    }

    /// 着弾処理（結果は1回だけ計算して固定）
    fn resolve(&mut self) {
        let Some(event) = self.event.as_mut() else {
            return;
        };

        let outcome = evaluate_shot(&event.shell, event.armor_mm, event.distance_m);
        let impact_at = event.impact_at;
        event.settle_at = Some(impact_at + self.pacing.settle_s);
        event.result = Some(outcome.clone());

        info!("着弾: {}", outcome.message);
        self.transition(FireState::Resolved, impact_at, Some(outcome));
    }

    /// 結果表示の終了
    fn settle(&mut self) {
        let Some(event) = self.event.take() else {
            return;
        };

        let settled_at = event.settle_at.unwrap_or(self.clock);
        self.last_result = event.result;
        self.transition(FireState::Idle, settled_at, None);
    }

    fn transition(&mut self, state: FireState, time_s: f64, result: Option<ShotOutcome>) {
        self.state = state;
        let notification = FireNotification { state, result, time_s };
        for observer in &mut self.observers {
            observer.on_transition(&notification);
        }
    }
}
