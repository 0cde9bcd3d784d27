// ==========================================
// 劳动时间经济核算系统 - 引擎层错误类型
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("计划不存在: {0}")]
    PlanNotFound(Uuid),

    #[error("计划 {plan_id} 的产量非正: {amount}")]
    NonPositiveAmount { plan_id: Uuid, amount: i64 },

    #[error("计划 {0} 的计划方不存在")]
    PlannerNotFound(Uuid),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type EngineResult<T> = Result<T, EngineError>;
