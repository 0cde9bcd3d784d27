// ==========================================
// 劳动时间经济核算系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合引擎与用例所需的所有 Repository
// 目标: 用例构造只接收一个仓储集合参数
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, TransactionBehavior};

use crate::repository::error::RepositoryError;
use crate::repository::{
    AccountRepository, CompanyRepository, CooperationRepository, MemberRepository,
    PayoutFactorRepository, PlanDraftRepository, PlanRepository, PurchaseRepository,
    SocialAccountingRepository, TransactionRepository,
};

/// 核算仓储集合
///
/// 所有仓储共享同一个 `Arc<Mutex<Connection>>`。
#[derive(Clone)]
pub struct LedgerRepositories {
    conn: Arc<Mutex<Connection>>,
    pub account_repo: Arc<AccountRepository>,
    pub transaction_repo: Arc<TransactionRepository>,
    pub social_accounting_repo: Arc<SocialAccountingRepository>,
    pub member_repo: Arc<MemberRepository>,
    pub company_repo: Arc<CompanyRepository>,
    pub plan_draft_repo: Arc<PlanDraftRepository>,
    pub plan_repo: Arc<PlanRepository>,
    pub cooperation_repo: Arc<CooperationRepository>,
    pub purchase_repo: Arc<PurchaseRepository>,
    pub payout_factor_repo: Arc<PayoutFactorRepository>,
}

impl LedgerRepositories {
    /// 从共享连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn: conn.clone(),
            account_repo: Arc::new(AccountRepository::new(conn.clone())),
            transaction_repo: Arc::new(TransactionRepository::new(conn.clone())),
            social_accounting_repo: Arc::new(SocialAccountingRepository::new(conn.clone())),
            member_repo: Arc::new(MemberRepository::new(conn.clone())),
            company_repo: Arc::new(CompanyRepository::new(conn.clone())),
            plan_draft_repo: Arc::new(PlanDraftRepository::new(conn.clone())),
            plan_repo: Arc::new(PlanRepository::new(conn.clone())),
            cooperation_repo: Arc::new(CooperationRepository::new(conn.clone())),
            purchase_repo: Arc::new(PurchaseRepository::new(conn.clone())),
            payout_factor_repo: Arc::new(PayoutFactorRepository::new(conn)),
        }
    }

    /// 在单个 SQLite 事务中执行多步写入
    ///
    /// # 说明
    /// - 闭包执行期间持有连接锁；闭包内只能使用传入的连接，
    ///   调用任何仓储方法都会再次加锁而死锁
    /// - 使用 IMMEDIATE 事务，同一数据库文件的其他进程写入会等待 busy_timeout
    /// - 闭包返回 Err 时事务回滚
    pub fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let value = f(&tx)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }
}
