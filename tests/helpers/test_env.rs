// ==========================================
// 集成测试环境
// ==========================================
// 职责: 临时数据库 + 可冻结时钟 + 常用准备步骤
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::NamedTempFile;
use uuid::Uuid;

use labour_ledger::app::AppState;
use labour_ledger::domain::plan::Plan;
use labour_ledger::domain::user::{Company, Member, SocialAccounting};
use labour_ledger::engine::{DatetimeService, FakeDatetimeService, LedgerRepositories, PayoutReport};
use labour_ledger::repository::RepositoryError;
use labour_ledger::use_cases::{
    AnswerCompanyWorkInvite, InviteWorkerToCompany, RegisterCompany, RegisterHoursWorked,
    RegisterMember,
};

/// 测试开始时刻
pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// 集成测试环境
///
/// 时钟冻结在 start_time()
pub struct TestEnv {
    pub state: AppState,
    pub clock: Arc<FakeDatetimeService>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl TestEnv {
    pub fn new() -> Self {
        labour_ledger::logging::init_test();

        let temp_file = NamedTempFile::new().expect("无法创建临时文件");
        let db_path = temp_file.path().to_str().unwrap().to_string();

        let clock = Arc::new(FakeDatetimeService::new());
        clock.freeze_time(start_time());
        let state = AppState::with_datetime(db_path, clock.clone()).expect("无法初始化AppState");

        Self {
            state,
            clock,
            _temp_file: temp_file,
        }
    }

    pub fn repos(&self) -> LedgerRepositories {
        self.state.repos.clone()
    }

    pub fn datetime(&self) -> Arc<dyn DatetimeService> {
        self.clock.clone()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn advance_days(&self, days: i64) -> NaiveDateTime {
        self.clock.advance_time(Duration::days(days))
    }

    pub fn set_config(&self, key: &str, value: &str) {
        self.state
            .config
            .set_global_config_value(key, value)
            .expect("写入配置失败");
    }

    /// 直接执行 SQL（建立/删除故障触发器等）
    pub fn execute_sql(&self, sql: &str) {
        self.repos()
            .in_transaction(|conn| conn.execute_batch(sql).map_err(RepositoryError::from))
            .expect("执行 SQL 失败");
    }

    /// 单值计数查询
    pub fn count(&self, sql: &str) -> i64 {
        self.repos()
            .in_transaction(|conn| {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                    .map_err(RepositoryError::from)
            })
            .expect("计数查询失败")
    }

    /// 另开连接（不启用外键）删除企业，制造计划方缺失的计划
    pub fn delete_company_unchecked(&self, id: &Uuid) {
        let conn = rusqlite::Connection::open(&self.state.db_path).expect("无法打开数据库");
        conn.execute_batch("PRAGMA foreign_keys = OFF;")
            .expect("关闭外键失败");
        conn.execute("DELETE FROM company WHERE company_id = ?1", [id.to_string()])
            .expect("删除企业失败");
    }

    // ===== 用户 =====

    pub fn register_company(&self, name: &str) -> Company {
        let email = format!("{}@company.example", Uuid::new_v4());
        let id = RegisterCompany::new(self.repos(), self.datetime())
            .execute(name, &email)
            .expect("注册企业失败");
        self.company(&id)
    }

    pub fn register_member(&self, name: &str) -> Member {
        let email = format!("{}@member.example", Uuid::new_v4());
        let id = RegisterMember::new(self.repos(), self.datetime())
            .execute(name, &email)
            .expect("注册成员失败");
        self.member(&id)
    }

    pub fn company(&self, id: &Uuid) -> Company {
        self.state.repos.company_repo.find_by_id(id).unwrap().expect("企业不存在")
    }

    pub fn member(&self, id: &Uuid) -> Member {
        self.state.repos.member_repo.find_by_id(id).unwrap().expect("成员不存在")
    }

    /// 邀请并接受
    pub fn hire(&self, company: &Company, member: &Member) {
        let invite = InviteWorkerToCompany::new(self.repos())
            .execute(company.id, member.id)
            .expect("邀请失败");
        AnswerCompanyWorkInvite::new(self.repos())
            .execute(member.id, invite, true)
            .expect("接受邀请失败");
    }

    /// 雇佣并发放工时，使成员账户有余额
    pub fn member_with_balance(&self, company: &Company, hours: Decimal) -> Member {
        let member = self.register_member("Arbeiterin");
        self.hire(company, &member);
        RegisterHoursWorked::new(self.repos(), self.datetime())
            .execute(company.id, member.id, hours)
            .expect("登记工时失败");
        member
    }

    // ===== 账户 =====

    pub fn balance(&self, account: &Uuid) -> Decimal {
        self.state
            .repos
            .account_repo
            .get_account_balance(account)
            .expect("查询余额失败")
    }

    pub fn social_accounting(&self) -> SocialAccounting {
        self.state
            .repos
            .social_accounting_repo
            .get_or_create_social_accounting()
            .unwrap()
    }

    // ===== 计划 =====

    pub fn plan(&self, id: &Uuid) -> Plan {
        self.state.repos.plan_repo.get_plan(id).unwrap().expect("计划不存在")
    }

    pub fn run_payout(&self) -> PayoutReport {
        self.state.payout.run().expect("结算失败")
    }
}
