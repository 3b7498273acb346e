//! # 貫通判定モジュール
//!
//! 弾薬カタログの参照データに対する2つの純粋関数を提供します。
//!
//! - [`penetration_at_distance`]: 参照距離間を線形補間した表示用の貫通値
//! - [`can_penetrate`]: 射撃距離以下で最大の参照距離の値を使う段階的な判定
//!
//! 2つの関数は意図的に異なる値を使います。判定は射撃距離が属する区間の
//! 下限側（保守的な値）で行い、表示値は滑らかに補間します。両者を統一すると
//! 参照距離以外での判定結果が変わるため、別々の関数として維持します。

use crate::models::{
    common::{ELIGIBILITY_LEAD_YEARS, REFERENCE_DISTANCES_M},
    shell::Shell,
};

/// 射撃距離における貫通値（mm）を線形補間で計算
///
/// 100m未満は100mの値、1500m超は1500mの値に固定されます。
/// 有限で非負の距離に対して常に有限で非負の値を返します。
///
/// # 引数
///
/// * `shell` - 砲弾
/// * `distance_m` - 射撃距離（m）
pub fn penetration_at_distance(shell: &Shell, distance_m: f64) -> f64 {
    let values = shell.penetration.values();

    if distance_m <= REFERENCE_DISTANCES_M[0] {
        return values[0];
    }

    for i in 1..REFERENCE_DISTANCES_M.len() {
        let (near, far) = (REFERENCE_DISTANCES_M[i - 1], REFERENCE_DISTANCES_M[i]);
        if distance_m <= far {
            let ratio = (distance_m - near) / (far - near);
            return values[i - 1] - ratio * (values[i - 1] - values[i]);
        }
    }

    values[values.len() - 1]
}

/// 判定用の貫通値（mm）
///
/// 射撃距離以下で最大の参照距離の値をそのまま返します（補間なし）。
/// 500m未満は100mの値を使います。
pub fn stepped_penetration(shell: &Shell, distance_m: f64) -> f64 {
    let values = shell.penetration.values();
    let index = REFERENCE_DISTANCES_M
        .iter()
        .rposition(|reference| distance_m >= *reference)
        .unwrap_or(0);
    values[index]
}

/// 貫通判定
///
/// 判定用の貫通値が装甲厚を厳密に上回る場合のみ貫通とします（等しい場合は非貫通）。
pub fn can_penetrate(shell: &Shell, armor_mm: f64, distance_m: f64) -> bool {
    stepped_penetration(shell, distance_m) > armor_mm
}

/// 目標の配備開始年に対して砲弾が使用可能か
pub fn is_eligible(shell: &Shell, service_start_year: i32) -> bool {
    shell.year >= service_start_year - ELIGIBILITY_LEAD_YEARS
}

/// 1回の射撃結果
#[derive(Debug, Clone, PartialEq)]
pub struct ShotOutcome {
    pub shell_id: String,
    /// 表示用の補間貫通値（mm）
    pub penetration_mm: f64,
    /// 判定に使った段階的な貫通値（mm）
    pub decision_penetration_mm: f64,
    pub armor_mm: f64,
    pub distance_m: f64,
    pub penetrated: bool,
    pub message: String,
}

/// 射撃結果を計算
///
/// 表示値と判定をそれぞれ1回ずつ計算し、結果メッセージを組み立てます。
pub fn evaluate_shot(shell: &Shell, armor_mm: f64, distance_m: f64) -> ShotOutcome {
    let penetration_mm = penetration_at_distance(shell, distance_m);
    let penetrated = can_penetrate(shell, armor_mm, distance_m);
    let message = format_outcome_message(penetrated, penetration_mm, armor_mm, distance_m);

    ShotOutcome {
        shell_id: shell.id.clone(),
        penetration_mm,
        decision_penetration_mm: stepped_penetration(shell, distance_m),
        armor_mm,
        distance_m,
        penetrated,
        message,
    }
}

fn format_outcome_message(penetrated: bool, penetration_mm: f64, armor_mm: f64, distance_m: f64) -> String {
    if penetrated {
        format!(
            "貫通！ ({:.0} mm > {:.0} mm, 距離 {:.0} m)",
            penetration_mm, armor_mm, distance_m
        )
    } else {
        format!(
            "非貫通 ({:.0} mm < {:.0} mm, 距離 {:.0} m)",
            penetration_mm, armor_mm, distance_m
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::shell::{PenetrationTable, Period, ShellType};
    use proptest::prelude::*;

    fn test_shell(shell_type: ShellType, table: PenetrationTable) -> Shell {
        Shell {
            id: "test".to_string(),
            name: "試験弾".to_string(),
            caliber: "76 mm".to_string(),
            shell_type,
            penetration: table,
            velocity_mps: 700.0,
            period: Period::WorldWar2,
            country: "試験国".to_string(),
            year: 1941,
            description: String::new(),
            color: String::new(),
        }
    }

    fn br350a() -> Shell {
        test_shell(ShellType::Aphe, PenetrationTable::new(69.0, 61.0, 51.0, 43.0))
    }

    #[test]
    fn test_reference_points_are_exact() {
        let shell = br350a();
        assert_eq!(penetration_at_distance(&shell, 100.0), 69.0);
        assert_eq!(penetration_at_distance(&shell, 500.0), 61.0);
        assert_eq!(penetration_at_distance(&shell, 1000.0), 51.0);
        assert_eq!(penetration_at_distance(&shell, 1500.0), 43.0);
    }

    #[test]
    fn test_interpolation_inside_brackets() {
        let shell = br350a();
        assert!((penetration_at_distance(&shell, 300.0) - 65.0).abs() < 1e-9);
        assert!((penetration_at_distance(&shell, 1250.0) - 47.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamping() {
        let shell = br350a();
        assert_eq!(penetration_at_distance(&shell, 50.0), penetration_at_distance(&shell, 100.0));
        assert_eq!(penetration_at_distance(&shell, 0.0), 69.0);
        assert_eq!(penetration_at_distance(&shell, 5000.0), penetration_at_distance(&shell, 1500.0));
    }

    #[test]
    fn test_stepped_brackets() {
        let shell = br350a();
        assert_eq!(stepped_penetration(&shell, 50.0), 69.0);
        assert_eq!(stepped_penetration(&shell, 499.9), 69.0);
        assert_eq!(stepped_penetration(&shell, 500.0), 61.0);
        assert_eq!(stepped_penetration(&shell, 999.0), 61.0);
        assert_eq!(stepped_penetration(&shell, 1000.0), 51.0);
        assert_eq!(stepped_penetration(&shell, 1500.0), 43.0);
        assert_eq!(stepped_penetration(&shell, 9000.0), 43.0);
    }

    #[test]
    fn test_equal_armor_never_penetrates() {
        let shell = br350a();
        assert!(!can_penetrate(&shell, 61.0, 500.0));
        assert!(can_penetrate(&shell, 60.9, 500.0));
        assert!(!can_penetrate(&shell, 69.0, 100.0));
    }

    #[test]
    fn test_scenario_a_88mm_at_500m() {
        let shell = test_shell(ShellType::Aphe, PenetrationTable::new(165.0, 153.0, 138.0, 120.0));
        assert!(can_penetrate(&shell, 100.0, 500.0));
        assert_eq!(penetration_at_distance(&shell, 500.0), 153.0);
    }

    #[test]
    fn test_scenario_b_stepped_and_interpolated_diverge() {
        // 900mの判定は500mの値(61)、表示は61と51の補間(53)
        let shell = br350a();
        assert_eq!(stepped_penetration(&shell, 900.0), 61.0);
        assert!(!can_penetrate(&shell, 80.0, 900.0));
        assert!((penetration_at_distance(&shell, 900.0) - 53.0).abs() < 1e-9);
    }

    #[test]
    fn test_decision_uses_near_bracket_value_not_readout() {
        // 900mでは表示値(53)が装甲(55)を下回っても、判定は500mの値(61)で貫通
        let shell = br350a();
        let outcome = evaluate_shot(&shell, 55.0, 900.0);
        assert!(outcome.penetrated);
        assert!(outcome.penetration_mm < outcome.armor_mm);
        assert_eq!(outcome.decision_penetration_mm, 61.0);
    }

    #[test]
    fn test_he_never_penetrates() {
        let shell = test_shell(ShellType::He, PenetrationTable::flat(0.0));
        assert!(!can_penetrate(&shell, 0.0, 100.0));
        assert_eq!(penetration_at_distance(&shell, 700.0), 0.0);
    }

    #[test]
    fn test_eligibility_boundary() {
        let shell = br350a(); // 1941年
        assert!(is_eligible(&shell, 1951));
        assert!(!is_eligible(&shell, 1952));
        assert!(is_eligible(&shell, 1930));
    }

    #[test]
    fn test_outcome_message() {
        let shell = test_shell(ShellType::Aphe, PenetrationTable::new(165.0, 153.0, 138.0, 120.0));
        let outcome = evaluate_shot(&shell, 100.0, 500.0);
        assert!(outcome.penetrated);
        assert_eq!(outcome.message, "貫通！ (153 mm > 100 mm, 距離 500 m)");

        let outcome = evaluate_shot(&br350a(), 80.0, 900.0);
        assert_eq!(outcome.message, "非貫通 (53 mm < 80 mm, 距離 900 m)");
    }

    fn kinetic_table() -> impl Strategy<Value = PenetrationTable> {
        (0.0f64..700.0, 0.0f64..100.0, 0.0f64..100.0, 0.0f64..100.0).prop_map(|(v1500, a, b, c)| {
            PenetrationTable::new(v1500 + a + b + c, v1500 + a + b, v1500 + a, v1500)
        })
    }

    proptest! {
        #[test]
        fn prop_kinetic_penetration_is_monotonic(
            table in kinetic_table(),
            d1 in 100.0f64..=1500.0,
            d2 in 100.0f64..=1500.0,
        ) {
            let shell = test_shell(ShellType::Apfsds, table);
            let (near, far) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            prop_assert!(penetration_at_distance(&shell, near) >= penetration_at_distance(&shell, far) - 1e-9);
        }

        #[test]
        fn prop_heat_penetration_is_flat(value in 0.0f64..1000.0, distance in 0.0f64..100_000.0) {
            let shell = test_shell(ShellType::Heat, PenetrationTable::flat(value));
            prop_assert_eq!(penetration_at_distance(&shell, distance), value);
            prop_assert_eq!(stepped_penetration(&shell, distance), value);
        }

        #[test]
        fn prop_readout_stays_within_table(table in kinetic_table(), distance in 0.0f64..10_000.0) {
            let shell = test_shell(ShellType::Ap, table);
            let value = penetration_at_distance(&shell, distance);
            prop_assert!(value.is_finite());
            prop_assert!(value >= table.distance_1500m - 1e-9 && value <= table.distance_100m + 1e-9);
        }
    }
}
