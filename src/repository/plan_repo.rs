// ==========================================
// 劳动时间经济核算系统 - 生产计划数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// core:       写入与单条读取
// query:      PlanQuery 过滤构建器
// aggregates: 活跃计划汇总
// ==========================================

mod aggregates;
mod core;
mod query;


pub use self::aggregates::PlanAggregates;
pub use self::core::PlanRepository;
pub(crate) use self::core::{
    claim_payout, insert_plan_from_draft, mark_expired, read_payout_count, write_active_days,
    write_activation, write_approval,
};
pub use self::query::{PlanOrdering, PlanQuery};
