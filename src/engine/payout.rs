// ==========================================
// 劳动时间经济核算系统 - 每日结算引擎
// ==========================================
// 结算系数 = (A − (P_o + R_o)) / (A + A_o)，分母为 0 时取 1
//   A:             生产性计划的日劳动成本之和
//   P_o, R_o, A_o: 公共服务计划的日固定资料/流动资料/劳动成本之和
// 只统计当前时刻处于活跃窗口内的计划
// ==========================================

use crate::config::ConfigManager;
use crate::domain::account::plan_purpose;
use crate::domain::plan::Plan;
use crate::engine::datetime::DatetimeService;
use crate::engine::error::EngineResult;
use crate::engine::repositories::LedgerRepositories;
use crate::repository::plan_repo::{claim_payout, mark_expired, read_payout_count, write_active_days};
use crate::repository::transaction_repo::insert_transaction;
use crate::repository::{NewTransaction, PlanQuery, PlanRepository};
use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PayoutFactorService - 结算系数计算
// ==========================================
pub struct PayoutFactorService {
    plan_repo: Arc<PlanRepository>,
}

impl PayoutFactorService {
    pub fn new(plan_repo: Arc<PlanRepository>) -> Self {
        Self { plan_repo }
    }

    pub fn calculate_payout_factor(&self, now: NaiveDateTime) -> EngineResult<Decimal> {
        let plans = self
            .plan_repo
            .query_plans(&PlanQuery::new().that_are_active_as_of(now))?;
        Ok(payout_factor_of(&plans))
    }
}

fn payout_factor_of(plans: &[Plan]) -> Decimal {
    let mut productive_labour = Decimal::ZERO;
    let mut public_means = Decimal::ZERO;
    let mut public_resources = Decimal::ZERO;
    let mut public_labour = Decimal::ZERO;

    for plan in plans {
        if plan.is_public_service {
            public_means += plan.daily_means_cost();
            public_resources += plan.daily_resource_cost();
            public_labour += plan.daily_labour_cost();
        } else {
            productive_labour += plan.daily_labour_cost();
        }
    }

    let denominator = productive_labour + public_labour;
    if denominator.is_zero() {
        return Decimal::ONE;
    }
    (productive_labour - (public_means + public_resources)) / denominator
}

/// 一次结算运行的结果
#[derive(Debug, Clone, Serialize)]
pub struct PayoutReport {
    pub run_at: NaiveDateTime,
    pub payout_factor: Decimal,
    pub payouts: usize,
    pub total_paid: Decimal,
    pub expired_plans: Vec<Uuid>,
}

// ==========================================
// UpdatePlansAndPayout - 更新计划状态并发放工资信用
// ==========================================
pub struct UpdatePlansAndPayout {
    repos: LedgerRepositories,
    config: Arc<ConfigManager>,
    datetime: Arc<dyn DatetimeService>,
}

impl UpdatePlansAndPayout {
    pub fn new(
        repos: LedgerRepositories,
        config: Arc<ConfigManager>,
        datetime: Arc<dyn DatetimeService>,
    ) -> Self {
        Self {
            repos,
            config,
            datetime,
        }
    }

    /// 执行一次结算；同一时刻重复执行不会重复发放
    #[instrument(skip(self))]
    pub fn run(&self) -> EngineResult<PayoutReport> {
        let now = self.datetime.now();
        let scale = self.config.get_payout_rounding_scale()?;

        let factor = PayoutFactorService::new(self.repos.plan_repo.clone()).calculate_payout_factor(now)?;
        self.repos.payout_factor_repo.store_payout_factor(now, factor)?;
        info!(payout_factor = %factor, "结算系数已计算");

        let social_accounting = self
            .repos
            .social_accounting_repo
            .get_or_create_social_accounting()?;

        let mut report = PayoutReport {
            run_at: now,
            payout_factor: factor,
            payouts: 0,
            total_paid: Decimal::ZERO,
            expired_plans: Vec::new(),
        };

        let active_plans = self
            .repos
            .plan_repo
            .query_plans(&PlanQuery::new().that_are_active())?;

        for plan in active_plans {
            let activation = match plan.activation_date {
                Some(t) if t <= now => t,
                _ => continue,
            };
            let planner = self.repos.company_repo.find_by_id(&plan.planner)?;
            if planner.is_none() {
                warn!(plan_id = %plan.id, "计划方不存在，跳过发放");
            }

            let elapsed_days = (now - activation).num_days();
            let active_days = elapsed_days.min(plan.timeframe_days);
            let payouts_due = (active_days + 1).min(plan.timeframe_days);
            let amount = (factor * plan.daily_labour_cost())
                .round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven);
            let purpose = plan_purpose(&plan.id);
            let is_expired = plan.is_expired_as_of(now);

            // 发放次数以库中 payout_count 为准，并发结算只有一方能占用同一次发放
            let (paid, expired_now) = self.repos.in_transaction(|conn| -> EngineResult<(usize, bool)> {
                write_active_days(conn, &plan.id, active_days)?;

                let mut paid = 0;
                if let Some(planner) = &planner {
                    let mut payout_count = read_payout_count(conn, &plan.id)?;
                    while payout_count < payouts_due && claim_payout(conn, &plan.id, payout_count)? {
                        insert_transaction(
                            conn,
                            NewTransaction {
                                date: now,
                                sending_account: social_accounting.account,
                                receiving_account: planner.work_account,
                                amount_sent: amount,
                                amount_received: amount,
                                purpose: &purpose,
                                plan_id: Some(plan.id),
                            },
                        )?;
                        payout_count += 1;
                        paid += 1;
                        debug!(plan_id = %plan.id, payout_count, amount = %amount, "工资信用已发放");
                    }
                }

                let expired_now = is_expired && mark_expired(conn, &plan.id)?;
                Ok((paid, expired_now))
            })?;

            report.payouts += paid;
            report.total_paid += amount * Decimal::from(paid);
            if expired_now {
                report.expired_plans.push(plan.id);
                info!(plan_id = %plan.id, "计划已到期");
            }
        }

        info!(
            payouts = report.payouts,
            total_paid = %report.total_paid,
            expired = report.expired_plans.len(),
            "结算完成"
        );
        Ok(report)
    }
}

// ==========================================
// SynchronizedPlanActivation - 同步激活
// ==========================================
// 在当日截止时刻激活所有已批准、未激活、未到期的计划
pub struct SynchronizedPlanActivation {
    plan_repo: Arc<PlanRepository>,
    datetime: Arc<dyn DatetimeService>,
}

impl SynchronizedPlanActivation {
    pub fn new(plan_repo: Arc<PlanRepository>, datetime: Arc<dyn DatetimeService>) -> Self {
        Self {
            plan_repo,
            datetime,
        }
    }

    /// 返回被激活的计划 id
    pub fn run(&self) -> EngineResult<Vec<Uuid>> {
        let activation_time = self.datetime.time_of_synchronized_plan_activation();
        let pending = self.plan_repo.query_plans(
            &PlanQuery::new()
                .that_are_approved()
                .that_are_not_yet_activated()
                .that_are_not_expired(),
        )?;

        let mut activated = Vec::with_capacity(pending.len());
        for plan in pending {
            self.plan_repo.activate_plan(&plan.id, activation_time)?;
            info!(plan_id = %plan.id, activation = %activation_time, "计划已同步激活");
            activated.push(plan.id);
        }
        Ok(activated)
    }
}
