// ==========================================
// 劳动时间经济核算系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod account;
pub mod cooperation;
pub mod plan;
pub mod purchase;
pub mod types;
pub mod user;

// 重导出核心类型
pub use account::{plan_purpose, Account, PayoutFactor, Transaction};
pub use cooperation::{Cooperation, CoordinationTenure, CoordinationTransferRequest};
pub use plan::{Plan, PlanDraft, ProductionCosts};
pub use purchase::Purchase;
pub use types::{AccountType, Deviation, PurposeOfPurchase, TransactionType};
pub use user::{AccountOwner, Company, CompanyWorkInvite, Member, SocialAccounting};
