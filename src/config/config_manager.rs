// ==========================================
// 劳动时间经济核算系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::debug!(key, value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有配置的快照（JSON格式，含默认值）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let mut config_map: BTreeMap<String, String> = defaults::ALL
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        {
            let conn = self.get_conn()?;
            let mut stmt =
                conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (key, value) = row?;
                config_map.insert(key, value);
            }
        }

        serde_json::to_string(&json!(config_map)).map_err(|e| RepositoryError::Other(e.into()))
    }

    // ===== 结算 =====

    /// 每日截止时间（同步激活与结算）
    pub fn get_payout_cutoff_time(&self) -> RepositoryResult<NaiveTime> {
        let value = self.get_config_or_default(config_keys::PAYOUT_CUTOFF_TIME, defaults::PAYOUT_CUTOFF_TIME)?;
        Ok(NaiveTime::parse_from_str(value.trim(), "%H:%M").unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::PAYOUT_CUTOFF_TIME,
                raw_value = %value,
                "截止时间格式错误，使用默认值"
            );
            NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN)
        }))
    }

    /// 单笔结算保留小数位
    pub fn get_payout_rounding_scale(&self) -> RepositoryResult<u32> {
        let value =
            self.get_config_or_default(config_keys::PAYOUT_ROUNDING_SCALE, defaults::PAYOUT_ROUNDING_SCALE)?;
        Ok(value.trim().parse::<u32>().unwrap_or(2))
    }

    // ===== 计划 =====

    pub fn get_activate_on_approval(&self) -> RepositoryResult<bool> {
        let value =
            self.get_config_or_default(config_keys::ACTIVATE_ON_APPROVAL, defaults::ACTIVATE_ON_APPROVAL)?;
        Ok(parse_bool(&value, true))
    }

    pub fn get_max_timeframe_days(&self) -> RepositoryResult<i64> {
        let value =
            self.get_config_or_default(config_keys::MAX_TIMEFRAME_DAYS, defaults::MAX_TIMEFRAME_DAYS)?;
        Ok(value.trim().parse::<i64>().unwrap_or(365))
    }

    // ===== 成员 =====

    pub fn get_allow_negative_member_balance(&self) -> RepositoryResult<bool> {
        let value = self.get_config_or_default(
            config_keys::ALLOW_NEGATIVE_MEMBER_BALANCE,
            defaults::ALLOW_NEGATIVE_MEMBER_BALANCE,
        )?;
        Ok(parse_bool(&value, false))
    }
}

fn parse_bool(value: &str, fallback: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => fallback,
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 结算
    pub const PAYOUT_CUTOFF_TIME: &str = "payout.cutoff_time";
    pub const PAYOUT_ROUNDING_SCALE: &str = "payout.rounding_scale";

    // 计划
    pub const ACTIVATE_ON_APPROVAL: &str = "plan.activate_on_approval";
    pub const MAX_TIMEFRAME_DAYS: &str = "plan.max_timeframe_days";

    // 成员
    pub const ALLOW_NEGATIVE_MEMBER_BALANCE: &str = "member.allow_negative_balance";
}

mod defaults {
    use super::config_keys;

    pub const PAYOUT_CUTOFF_TIME: &str = "02:00";
    pub const PAYOUT_ROUNDING_SCALE: &str = "2";
    pub const ACTIVATE_ON_APPROVAL: &str = "true";
    pub const MAX_TIMEFRAME_DAYS: &str = "365";
    pub const ALLOW_NEGATIVE_MEMBER_BALANCE: &str = "false";

    pub const ALL: [(&str, &str); 5] = [
        (config_keys::PAYOUT_CUTOFF_TIME, PAYOUT_CUTOFF_TIME),
        (config_keys::PAYOUT_ROUNDING_SCALE, PAYOUT_ROUNDING_SCALE),
        (config_keys::ACTIVATE_ON_APPROVAL, ACTIVATE_ON_APPROVAL),
        (config_keys::MAX_TIMEFRAME_DAYS, MAX_TIMEFRAME_DAYS),
        (config_keys::ALLOW_NEGATIVE_MEMBER_BALANCE, ALLOW_NEGATIVE_MEMBER_BALANCE),
    ];
}
