// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 配置持久化在数据库文件中，并被应用状态读取
// ==========================================

mod helpers;

use chrono::NaiveTime;
use std::sync::Arc;
use tempfile::NamedTempFile;

use helpers::test_env::*;
use labour_ledger::app::AppState;
use labour_ledger::config::{config_keys, ConfigManager};
use labour_ledger::engine::DatetimeService;

fn temp_db() -> (NamedTempFile, String) {
    let temp_file = NamedTempFile::new().expect("无法创建临时文件");
    let db_path = temp_file.path().to_str().unwrap().to_string();
    (temp_file, db_path)
}

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = temp_db();
    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[test]
fn test_配置跨连接持久化() {
    let (_temp_file, db_path) = temp_db();
    {
        let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
        config
            .set_global_config_value(config_keys::PAYOUT_ROUNDING_SCALE, "4")
            .unwrap();
    }

    let config = ConfigManager::new(&db_path).expect("Failed to reopen ConfigManager");
    assert_eq!(config.get_payout_rounding_scale().unwrap(), 4);
    assert_eq!(
        config
            .get_global_config_value(config_keys::PAYOUT_ROUNDING_SCALE)
            .unwrap()
            .as_deref(),
        Some("4")
    );
    assert_eq!(
        config
            .get_global_config_value(config_keys::MAX_TIMEFRAME_DAYS)
            .unwrap(),
        None
    );
}

#[test]
fn test_应用状态使用配置的截止时间() {
    let (_temp_file, db_path) = temp_db();
    ConfigManager::new(&db_path)
        .unwrap()
        .set_global_config_value(config_keys::PAYOUT_CUTOFF_TIME, "04:15")
        .unwrap();

    let state = AppState::new(db_path).expect("无法初始化AppState");
    assert_eq!(
        state.datetime.cutoff_time(),
        NaiveTime::from_hms_opt(4, 15, 0).unwrap()
    );
}

#[test]
fn test_布尔配置解析() {
    let env = TestEnv::new();
    for (raw, expected) in [("0", false), ("off", false), ("YES", true), ("1", true), ("vielleicht", true)] {
        env.set_config(config_keys::ACTIVATE_ON_APPROVAL, raw);
        assert_eq!(
            env.state.config.get_activate_on_approval().unwrap(),
            expected,
            "raw value: {}",
            raw
        );
    }
}

#[test]
fn test_快照含默认值() {
    let env = TestEnv::new();
    env.set_config(config_keys::ALLOW_NEGATIVE_MEMBER_BALANCE, "true");

    let snapshot: serde_json::Value =
        serde_json::from_str(&env.state.config.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot[config_keys::ALLOW_NEGATIVE_MEMBER_BALANCE], "true");
    assert_eq!(snapshot[config_keys::PAYOUT_CUTOFF_TIME], "02:00");

    let shared: Arc<ConfigManager> = env.state.config.clone();
    assert!(shared.get_allow_negative_member_balance().unwrap());
}
