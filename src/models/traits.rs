use std::sync::mpsc;

use crate::models::{
    fire_control::FireNotification,
    penetration::is_eligible,
    shell::Shell,
};

/// 弾薬カタログのインターフェース
///
/// 射撃シーケンス制御はこのtraitを通してのみ参照データを読みます。
pub trait IShellCatalog {
    /// 全砲弾の取得
    fn shells(&self) -> &[Shell];

    /// IDによる砲弾の取得
    fn get_shell(&self, id: &str) -> Option<&Shell> {
        self.shells().iter().find(|shell| shell.id == id)
    }

    /// 配備開始年に対して使用可能な砲弾の取得
    fn eligible_shells(&self, service_start_year: i32) -> Vec<&Shell> {
        self.shells()
            .iter()
            .filter(|shell| is_eligible(shell, service_start_year))
            .collect()
    }
}

/// 状態遷移通知の購読者インターフェース
pub trait IFireObserver {
    /// 状態遷移ごとに呼ばれる
    fn on_transition(&mut self, notification: &FireNotification);
}

impl IFireObserver for mpsc::Sender<FireNotification> {
    fn on_transition(&mut self, notification: &FireNotification) {
        // 受信側が破棄されていれば通知は捨てる
        let _ = self.send(notification.clone());
    }
}
