// ==========================================
// 劳动时间经济核算系统 - 应用状态
// ==========================================
// 职责: 打开数据库、建表、组装仓储/配置/时钟与常用用例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{
    DatetimeService, LedgerRepositories, SynchronizedPlanActivation, SystemDatetimeService,
    UpdatePlansAndPayout,
};
use crate::repository::error::RepositoryResult;
use crate::use_cases::{GetStatistics, ShowAccountDetails};

/// 应用状态
///
/// 所有仓储、配置与用例共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub repos: LedgerRepositories,
    pub config: Arc<ConfigManager>,
    pub datetime: Arc<dyn DatetimeService>,

    /// 每日结算
    pub payout: Arc<UpdatePlansAndPayout>,

    /// 截止时刻同步激活
    pub plan_activation: Arc<SynchronizedPlanActivation>,

    pub statistics: Arc<GetStatistics>,
    pub account_details: Arc<ShowAccountDetails>,
}

impl AppState {
    /// 使用系统时钟创建 AppState
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 结算截止时刻从配置读取
    pub fn new(db_path: String) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(&db_path)?;
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));
        let config = Arc::new(ConfigManager::from_connection(conn.clone()));
        let cutoff = config.get_payout_cutoff_time()?;
        let datetime: Arc<dyn DatetimeService> = Arc::new(SystemDatetimeService::new(cutoff));
        Ok(Self::assemble(db_path, conn, config, datetime))
    }

    /// 使用给定时钟创建 AppState（测试/模拟用）
    pub fn with_datetime(db_path: String, datetime: Arc<dyn DatetimeService>) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(&db_path)?;
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));
        let config = Arc::new(ConfigManager::from_connection(conn.clone()));
        Ok(Self::assemble(db_path, conn, config, datetime))
    }

    fn assemble(
        db_path: String,
        conn: Arc<Mutex<rusqlite::Connection>>,
        config: Arc<ConfigManager>,
        datetime: Arc<dyn DatetimeService>,
    ) -> Self {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);
        let repos = LedgerRepositories::from_connection(conn);

        let payout = Arc::new(UpdatePlansAndPayout::new(
            repos.clone(),
            config.clone(),
            datetime.clone(),
        ));
        let plan_activation = Arc::new(SynchronizedPlanActivation::new(
            repos.plan_repo.clone(),
            datetime.clone(),
        ));

        Self {
            db_path,
            statistics: Arc::new(GetStatistics::new(repos.clone())),
            account_details: Arc::new(ShowAccountDetails::new(repos.clone())),
            repos,
            config,
            datetime,
            payout,
            plan_activation,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先使用环境变量 LABOUR_LEDGER_DB_PATH，其次用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("LABOUR_LEDGER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./labour_ledger.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("labour-ledger");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("labour_ledger.db");
        }
    }
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FakeDatetimeService;
    use tempfile::NamedTempFile;

    #[test]
    fn test_创建应用状态() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let state = AppState::with_datetime(path, Arc::new(FakeDatetimeService::new())).unwrap();

        let stats = state.statistics.execute().unwrap();
        assert_eq!(stats.registered_members_count, 0);
        assert_eq!(stats.payout_factor, None);
    }

    #[test]
    fn test_环境变量指定数据库路径() {
        std::env::set_var("LABOUR_LEDGER_DB_PATH", " /tmp/ledger-test.db ");
        assert_eq!(get_default_db_path(), "/tmp/ledger-test.db");
        std::env::remove_var("LABOUR_LEDGER_DB_PATH");
    }
}
