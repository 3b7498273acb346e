mod logging;
mod models;
mod scenario;
mod simulation;

use std::sync::Arc;

use clap::{Arg, ArgMatches, Command};
use logging::{init_logging, level_for_verbosity, parse_log_level, LogConfig, LogOutput};
use models::*;
use scenario::ScenarioConfig;
use simulation::SimulationEngine;
use tracing::debug;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("shellsim")
        .version("0.1.0")
        .about("装甲貫通シミュレーション (Armor Penetration Simulator)")
        .long_about("砲弾・射撃距離・装甲厚から貫通の可否を判定し、\n\
                     発射から着弾・結果表示までの射撃シーケンスを時間駆動で再現します。")
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .action(clap::ArgAction::SetTrue)
                .help("弾薬カタログの一覧を表示")
                .conflicts_with("scenario")
        )
        .arg(
            Arg::new("period")
                .short('p')
                .long("period")
                .value_name("YEARS")
                .help("目標の配備期間 (例: 1941-1945) で使用可能な砲弾に絞り込む")
        )
        .arg(
            Arg::new("shell")
                .long("shell")
                .value_name("ID")
                .help("単発評価する砲弾ID")
                .requires("armor")
                .conflicts_with("scenario")
        )
        .arg(
            Arg::new("distance")
                .long("distance")
                .value_name("M")
                .value_parser(clap::value_parser!(f64))
                .default_value("500")
                .help("射撃距離 (100〜1500m)")
        )
        .arg(
            Arg::new("armor")
                .long("armor")
                .value_name("MM")
                .value_parser(clap::value_parser!(f64))
                .help("目標の装甲厚 (mm)")
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .requires("scenario")
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("realtime")
                .short('r')
                .long("realtime")
                .action(clap::ArgAction::SetTrue)
                .requires("scenario")
                .help("シナリオを実時間で再生")
        )
        .arg(
            Arg::new("catalog")
                .short('c')
                .long("catalog")
                .value_name("FILE")
                .help("組み込みの代わりに使用する弾薬カタログ(.yaml)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .value_parser(|s: &str| s.parse::<LogOutput>())
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let log_config = LogConfig {
        level: matches
            .get_one::<String>("log-level")
            .map(|level| parse_log_level(level))
            .unwrap_or_else(|| level_for_verbosity(verbose_level)),
        output: matches
            .get_one::<LogOutput>("log-output")
            .copied()
            .unwrap_or(LogOutput::Console),
        ..LogConfig::default()
    };

    let _log_guard = match init_logging(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&matches, verbose_level) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Arc::new(load_catalog(matches.get_one::<String>("catalog"))?);

    let service_start_year = match matches.get_one::<String>("period") {
        Some(period) => Some(
            parse_service_start_year(period)
                .ok_or_else(|| format!("配備期間を解析できません: {}", period))?,
        ),
        None => None,
    };

    if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        return run_scenario(
            scenario_path,
            catalog,
            matches.get_flag("info"),
            matches.get_flag("realtime"),
            verbose_level,
        );
    }

    if let Some(shell_id) = matches.get_one::<String>("shell") {
        let distance_m = matches.get_one::<f64>("distance").copied().unwrap_or(DEFAULT_FIRING_DISTANCE_M);
        let armor_mm = matches
            .get_one::<f64>("armor")
            .copied()
            .ok_or("--armor が指定されていません")?;
        return evaluate_single_shot(&catalog, shell_id, distance_m, armor_mm, service_start_year);
    }

    if matches.get_flag("list") || service_start_year.is_some() {
        print_catalog(&catalog, service_start_year);
        return Ok(());
    }

    show_default_help();
    Ok(())
}

fn load_catalog(path: Option<&String>) -> Result<AmmunitionCatalog, CatalogError> {
    match path {
        Some(path) => AmmunitionCatalog::from_file(path),
        None => {
            let catalog = AmmunitionCatalog::builtin();
            catalog.validate()?;
            debug!("組み込みカタログを使用: {}種", catalog.len());
            Ok(catalog)
        }
    }
}

/// 弾薬カタログの一覧表示
fn print_catalog(catalog: &AmmunitionCatalog, service_start_year: Option<i32>) {
    let shells = match service_start_year {
        Some(year) => {
            println!("=== {}年配備の目標に使用可能な砲弾 ===", year);
            catalog.eligible_shells(year)
        }
        None => {
            println!("=== 弾薬カタログ ({}種) ===", catalog.len());
            catalog.shells().iter().collect()
        }
    };

    for period in [Period::Origins, Period::Interwar, Period::WorldWar2, Period::ColdWar, Period::Modern] {
        let in_period: Vec<&&Shell> = shells.iter().filter(|shell| shell.period == period).collect();
        if in_period.is_empty() {
            continue;
        }
        println!();
        println!("[{}] {}種 (カタログ全体 {}種)", period, in_period.len(), catalog.shells_for_period(period).len());
        for shell in in_period {
            println!("  {:<22} {}", shell.id, shell.summary());
            println!("  {:<22} {} - {}", "", shell.shell_type.type_name(), shell.description);
        }
    }
}

/// 単発の射撃評価
///
/// 射撃シーケンス制御を使い、飛翔と着弾を一度に進めて結果を表示します。
fn evaluate_single_shot(
    catalog: &Arc<AmmunitionCatalog>,
    shell_id: &str,
    distance_m: f64,
    armor_mm: f64,
    service_start_year: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_distance(distance_m)?;

    let pacing = PacingConfig::default();
    let mut controller = FireSequenceController::new(Arc::clone(catalog), armor_mm, pacing);
    if let Some(year) = service_start_year {
        controller = controller.with_service_start_year(year);
    }
    controller.set_armor_thickness(armor_mm)?;
    controller.select_shell(shell_id)?;
    controller.set_distance(distance_m)?;

    let shell = controller.selected_shell().cloned().ok_or("砲弾が選択されていません")?;
    let flight_s = pacing.flight_duration(shell.velocity_mps);

    println!("砲弾: {}", shell.summary());
    println!("装甲: {:.0}mm ({:?})", armor_mm, ArmorTier::classify(armor_mm));
    if let Some(preview) = controller.penetration_preview() {
        println!("距離 {:.0}m での貫通値: {:.1}mm (判定値 {:.0}mm)", distance_m, preview, stepped_penetration(&shell, distance_m));
    }

    controller.fire()?;
    controller.tick(flight_s);

    let outcome = controller.result().ok_or("着弾結果がありません")?;
    println!("{} (飛翔 {:.2}秒, {})", outcome.message, controller.time(), controller.state());
    debug!("判定: can_penetrate = {}", can_penetrate(&shell, armor_mm, distance_m));

    Ok(())
}

/// シナリオファイルを読み込んで実行
fn run_scenario(
    scenario_path: &str,
    catalog: Arc<AmmunitionCatalog>,
    info_only: bool,
    realtime: bool,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    scenario.print_summary();
    println!();

    if info_only {
        return Ok(());
    }

    let mut simulation = SimulationEngine::new(scenario, catalog, verbose_level);
    simulation.initialize()?;

    if realtime {
        simulation.run_realtime()?;
    } else {
        simulation.run()?;
    }

    println!();
    simulation.report().print_summary();

    Ok(())
}

/// デフォルトヘルプを表示
fn show_default_help() {
    println!("使用方法:");
    println!("  shellsim [オプション]");
    println!();
    println!("オプション:");
    println!("  -l, --list                 弾薬カタログの一覧を表示");
    println!("  -p, --period <YEARS>       配備期間で使用可能な砲弾に絞り込む");
    println!("      --shell <ID>           単発評価する砲弾");
    println!("      --distance <M>         射撃距離 (既定 500m)");
    println!("      --armor <MM>           目標の装甲厚");
    println!("  -s, --scenario <FILE>      シナリオファイルを指定して実行");
    println!("  -i, --info                 シナリオ情報のみ表示");
    println!("  -r, --realtime             シナリオを実時間で再生");
    println!("  -c, --catalog <FILE>       独自の弾薬カタログを使用");
    println!("  -v, --verbose              詳細出力 (複数指定で詳細レベル上昇)");
    println!("  -h, --help                 このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/tiger_front.yaml     - ティーガーI正面への射撃");
    println!("  scenarios/cold_war_duel.yaml   - 冷戦期の砲弾による側面射撃");
    println!();
    println!("例:");
    println!("  shellsim --list --period 1941-1945");
    println!("  shellsim --shell ap-88mm-german --distance 900 --armor 100");
    println!("  shellsim -s scenarios/tiger_front.yaml -v");
    println!("  shellsim -s scenarios/cold_war_duel.yaml -r");
}
