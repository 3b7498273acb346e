// 定数と共通型
pub mod common;

// インターフェース（trait）定義
pub mod traits;

// 弾薬カタログと貫通判定
pub mod shell;
pub mod catalog;
pub mod penetration;

// 目標の装甲
pub mod armor;

// 射撃シーケンス制御
pub mod fire_control;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use shell::{Period, Shell};
pub use catalog::{AmmunitionCatalog, CatalogError};
pub use penetration::{can_penetrate, stepped_penetration, ShotOutcome};
pub use armor::{parse_service_start_year, ArmorTier};
pub use fire_control::{validate_distance, FireError, FireNotification, FireSequenceController};
