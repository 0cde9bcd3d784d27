// ==========================================
// 劳动时间经济核算系统 - 引擎层
// ==========================================
// 职责: 实现核算规则（定价、结算、账目分类），不拼 SQL
// 红线: Engine 只通过 Repository 访问数据
// ==========================================

pub mod accounting;
pub mod datetime;
pub mod error;
pub mod payout;
pub mod price_calculator;
pub mod repositories;

// 重导出核心引擎
pub use accounting::{StatementRow, UserAccountingService};
pub use datetime::{DatetimeService, FakeDatetimeService, SystemDatetimeService};
pub use error::{EngineError, EngineResult};
pub use payout::{PayoutFactorService, PayoutReport, SynchronizedPlanActivation, UpdatePlansAndPayout};
pub use price_calculator::PriceCalculator;
pub use repositories::LedgerRepositories;
