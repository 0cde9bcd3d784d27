// ==========================================
// 劳动时间经济核算系统 - 价格计算
// ==========================================
// 个体价格 = 总成本 / 产量（公共服务为 0）
// 合作价格 = 同一合作中当前活跃计划个体价格的算术平均
// ==========================================

use crate::domain::plan::Plan;
use crate::engine::datetime::DatetimeService;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{PlanQuery, PlanRepository};
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct PriceCalculator {
    plan_repo: Arc<PlanRepository>,
    datetime: Arc<dyn DatetimeService>,
}

impl PriceCalculator {
    pub fn new(plan_repo: Arc<PlanRepository>, datetime: Arc<dyn DatetimeService>) -> Self {
        Self {
            plan_repo,
            datetime,
        }
    }

    /// 单位个体价格
    pub fn calculate_individual_price(plan: &Plan) -> EngineResult<Decimal> {
        if plan.is_public_service {
            return Ok(Decimal::ZERO);
        }
        if plan.amount_produced <= 0 {
            return Err(EngineError::NonPositiveAmount {
                plan_id: plan.id,
                amount: plan.amount_produced,
            });
        }
        Ok(plan.costs.total_cost() / Decimal::from(plan.amount_produced))
    }

    /// 单位合作价格
    pub fn calculate_cooperative_price(&self, plan: &Plan) -> EngineResult<Decimal> {
        if plan.is_public_service {
            return Ok(Decimal::ZERO);
        }
        let individual = Self::calculate_individual_price(plan)?;
        let cooperation = match plan.cooperation {
            Some(c) => c,
            None => return Ok(individual),
        };

        let now = self.datetime.now();
        let members = self.plan_repo.query_plans(
            &PlanQuery::new()
                .that_are_part_of_cooperation(cooperation)
                .that_are_active_as_of(now),
        )?;
        if members.is_empty() {
            return Ok(individual);
        }

        let mut total = Decimal::ZERO;
        for member in &members {
            total += Self::calculate_individual_price(member)?;
        }
        Ok(total / Decimal::from(members.len()))
    }
}
