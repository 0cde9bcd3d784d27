// ==========================================
// 劳动时间经济核算系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod account_repo;
pub mod company_repo;
pub mod cooperation_repo;
pub mod error;
pub mod member_repo;
pub mod payout_factor_repo;
pub mod plan_draft_repo;
pub mod plan_repo;
pub mod purchase_repo;
pub mod row_utils;
pub mod social_accounting_repo;
pub mod sql_builder;
pub mod transaction_repo;

// 重导出核心仓储
pub use account_repo::AccountRepository;
pub use company_repo::CompanyRepository;
pub use cooperation_repo::CooperationRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use member_repo::MemberRepository;
pub use payout_factor_repo::PayoutFactorRepository;
pub use plan_draft_repo::{DraftUpdate, PlanDraftRepository};
pub use plan_repo::{PlanAggregates, PlanOrdering, PlanQuery, PlanRepository};
pub use purchase_repo::PurchaseRepository;
pub use social_accounting_repo::SocialAccountingRepository;
pub use transaction_repo::{NewTransaction, TransactionRepository};
