// ==========================================
// 劳动时间经济核算系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少每日结算与交互写入并发时的 busy 错误
// - 统一建表入口（幂等），所有仓储共享同一套 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间戳存储格式（与所有仓储一致）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库并初始化 schema（测试/模拟用）
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 金额统一以 TEXT 存储（rust_decimal 字符串），避免 REAL 精度误差；
/// 余额在 Rust 侧汇总。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS account (
            account_id TEXT PRIMARY KEY,
            account_type TEXT NOT NULL CHECK(account_type IN ('p', 'r', 'a', 'prd', 'member', 'accounting'))
        );

        CREATE TABLE IF NOT EXISTS ledger_transaction (
            transaction_id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            sending_account TEXT NOT NULL REFERENCES account(account_id),
            receiving_account TEXT NOT NULL REFERENCES account(account_id),
            amount_sent TEXT NOT NULL,
            amount_received TEXT NOT NULL,
            purpose TEXT NOT NULL,
            plan_id TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_tx_sender ON ledger_transaction(sending_account);
        CREATE INDEX IF NOT EXISTS idx_tx_receiver ON ledger_transaction(receiving_account);
        CREATE INDEX IF NOT EXISTS idx_tx_plan ON ledger_transaction(plan_id);

        CREATE TABLE IF NOT EXISTS social_accounting (
            social_accounting_id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL UNIQUE REFERENCES account(account_id)
        );

        CREATE TABLE IF NOT EXISTS member (
            member_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            account_id TEXT NOT NULL UNIQUE REFERENCES account(account_id),
            registered_on TEXT NOT NULL,
            confirmed_on TEXT
        );

        CREATE TABLE IF NOT EXISTS company (
            company_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            means_account TEXT NOT NULL REFERENCES account(account_id),
            raw_material_account TEXT NOT NULL REFERENCES account(account_id),
            work_account TEXT NOT NULL REFERENCES account(account_id),
            product_account TEXT NOT NULL REFERENCES account(account_id),
            registered_on TEXT NOT NULL,
            confirmed_on TEXT
        );

        CREATE TABLE IF NOT EXISTS company_worker (
            company_id TEXT NOT NULL REFERENCES company(company_id) ON DELETE CASCADE,
            member_id TEXT NOT NULL REFERENCES member(member_id) ON DELETE CASCADE,
            PRIMARY KEY (company_id, member_id)
        );

        CREATE TABLE IF NOT EXISTS company_work_invite (
            invite_id TEXT PRIMARY KEY,
            company_id TEXT NOT NULL REFERENCES company(company_id) ON DELETE CASCADE,
            member_id TEXT NOT NULL REFERENCES member(member_id) ON DELETE CASCADE,
            UNIQUE(company_id, member_id)
        );

        CREATE TABLE IF NOT EXISTS plan_draft (
            draft_id TEXT PRIMARY KEY,
            creation_date TEXT NOT NULL,
            planner TEXT NOT NULL REFERENCES company(company_id),
            product_name TEXT NOT NULL,
            unit_of_distribution TEXT NOT NULL,
            amount_produced INTEGER NOT NULL,
            description TEXT NOT NULL,
            timeframe_days INTEGER NOT NULL,
            is_public_service INTEGER NOT NULL DEFAULT 0,
            labour_cost TEXT NOT NULL,
            resource_cost TEXT NOT NULL,
            means_cost TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_plan_draft_planner ON plan_draft(planner);

        CREATE TABLE IF NOT EXISTS cooperation (
            cooperation_id TEXT PRIMARY KEY,
            creation_date TEXT NOT NULL,
            name TEXT NOT NULL,
            definition TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS coordination_tenure (
            tenure_id TEXT PRIMARY KEY,
            company_id TEXT NOT NULL REFERENCES company(company_id),
            cooperation_id TEXT NOT NULL REFERENCES cooperation(cooperation_id) ON DELETE CASCADE,
            start_date TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tenure_coop ON coordination_tenure(cooperation_id, start_date);

        CREATE TABLE IF NOT EXISTS coordination_transfer_request (
            request_id TEXT PRIMARY KEY,
            requesting_tenure TEXT NOT NULL REFERENCES coordination_tenure(tenure_id),
            candidate TEXT NOT NULL REFERENCES company(company_id),
            request_date TEXT NOT NULL,
            is_closed INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS plan (
            plan_id TEXT PRIMARY KEY,
            creation_date TEXT NOT NULL,
            planner TEXT NOT NULL REFERENCES company(company_id),
            product_name TEXT NOT NULL,
            unit_of_distribution TEXT NOT NULL,
            amount_produced INTEGER NOT NULL,
            description TEXT NOT NULL,
            timeframe_days INTEGER NOT NULL,
            is_public_service INTEGER NOT NULL DEFAULT 0,
            labour_cost TEXT NOT NULL,
            resource_cost TEXT NOT NULL,
            means_cost TEXT NOT NULL,
            approval_date TEXT,
            approval_reason TEXT,
            activation_date TEXT,
            is_active INTEGER NOT NULL DEFAULT 0,
            expired INTEGER NOT NULL DEFAULT 0,
            active_days INTEGER,
            payout_count INTEGER NOT NULL DEFAULT 0,
            requested_cooperation TEXT REFERENCES cooperation(cooperation_id),
            cooperation TEXT REFERENCES cooperation(cooperation_id),
            is_available INTEGER NOT NULL DEFAULT 1,
            hidden_by_user INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_plan_planner ON plan(planner);
        CREATE INDEX IF NOT EXISTS idx_plan_active ON plan(is_active);
        CREATE INDEX IF NOT EXISTS idx_plan_cooperation ON plan(cooperation);

        CREATE TABLE IF NOT EXISTS purchase (
            purchase_id TEXT PRIMARY KEY,
            purchase_date TEXT NOT NULL,
            plan_id TEXT NOT NULL REFERENCES plan(plan_id),
            buyer TEXT NOT NULL,
            is_buyer_a_member INTEGER NOT NULL,
            price_per_unit TEXT NOT NULL,
            amount INTEGER NOT NULL,
            purpose TEXT NOT NULL CHECK(purpose IN ('means_of_prod', 'raw_materials', 'consumption'))
        );
        CREATE INDEX IF NOT EXISTS idx_purchase_buyer ON purchase(buyer);

        CREATE TABLE IF NOT EXISTS payout_factor (
            payout_factor_id INTEGER PRIMARY KEY AUTOINCREMENT,
            calculation_date TEXT NOT NULL,
            value TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payout_factor_date ON payout_factor(calculation_date);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_幂等() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_read_schema_version_无表返回none() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
