use super::core::PlanRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::row_utils::get_decimal;
use rust_decimal::Decimal;
use serde::Serialize;

/// 活跃计划（is_active 标志）汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanAggregates {
    pub active_productive_plans: i64,
    pub active_public_plans: i64,
    /// 平均周期天数；无活跃计划时为 0
    pub average_timeframe_days: Decimal,
    pub planned_work: Decimal,
    pub planned_resources: Decimal,
    pub planned_means: Decimal,
}

impl PlanRepository {
    pub fn active_plan_aggregates(&self) -> RepositoryResult<PlanAggregates> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT is_public_service, timeframe_days, labour_cost, resource_cost, means_cost
             FROM plan WHERE is_active = 1",
        )?;

        let mut aggregates = PlanAggregates {
            active_productive_plans: 0,
            active_public_plans: 0,
            average_timeframe_days: Decimal::ZERO,
            planned_work: Decimal::ZERO,
            planned_resources: Decimal::ZERO,
            planned_means: Decimal::ZERO,
        };
        let mut timeframe_total: i64 = 0;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, bool>(0)?,
                row.get::<_, i64>(1)?,
                get_decimal(row, 2)?,
                get_decimal(row, 3)?,
                get_decimal(row, 4)?,
            ))
        })?;
        for row in rows {
            let (is_public, timeframe, labour, resources, means) = row?;
            if is_public {
                aggregates.active_public_plans += 1;
            } else {
                aggregates.active_productive_plans += 1;
            }
            timeframe_total += timeframe;
            aggregates.planned_work += labour;
            aggregates.planned_resources += resources;
            aggregates.planned_means += means;
        }

        let count = aggregates.active_productive_plans + aggregates.active_public_plans;
        if count > 0 {
            aggregates.average_timeframe_days = Decimal::from(timeframe_total) / Decimal::from(count);
        }
        Ok(aggregates)
    }
}
