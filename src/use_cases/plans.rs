// ==========================================
// 劳动时间经济核算系统 - 计划批准与查询
// ==========================================
// 批准: 草稿 → 计划（同一 id），社会核算发放 p/r 信用与预期销售
// 查询: 按产品名或 id 过滤，只返回当前活跃计划
// ==========================================

use crate::config::ConfigManager;
use crate::domain::account::plan_purpose;
use crate::domain::plan::{Plan, ProductionCosts};
use crate::engine::datetime::DatetimeService;
use crate::engine::error::EngineError;
use crate::engine::price_calculator::PriceCalculator;
use crate::engine::repositories::LedgerRepositories;
use crate::repository::error::RepositoryError;
use crate::repository::plan_draft_repo::remove_draft;
use crate::repository::plan_repo::{insert_plan_from_draft, write_activation, write_approval};
use crate::repository::transaction_repo::insert_transaction;
use crate::repository::{NewTransaction, PlanOrdering, PlanQuery};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("草稿不存在: {0}")]
    DraftNotFound(Uuid),

    #[error("计划不存在: {0}")]
    PlanNotFound(Uuid),

    #[error("只有计划方可以操作该计划")]
    NotPlanner,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn plan_of_planner(
    repos: &LedgerRepositories,
    plan_id: &Uuid,
    requester: &Uuid,
) -> Result<Plan, PlanError> {
    let plan = repos
        .plan_repo
        .get_plan(plan_id)?
        .ok_or(PlanError::PlanNotFound(*plan_id))?;
    if plan.planner != *requester {
        return Err(PlanError::NotPlanner);
    }
    Ok(plan)
}

// ==========================================
// ApprovePlan
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalResponse {
    pub plan_id: Uuid,
    pub is_activated: bool,
}

pub struct ApprovePlan {
    repos: LedgerRepositories,
    config: Arc<ConfigManager>,
    datetime: Arc<dyn DatetimeService>,
}

impl ApprovePlan {
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

    pub fn execute(&self, requester: Uuid, draft_id: Uuid) -> Result<ApprovalResponse, PlanError> {
        let draft = self
            .repos
            .plan_draft_repo
            .get_draft(&draft_id)?
            .ok_or(PlanError::DraftNotFound(draft_id))?;
        if draft.planner != requester {
            return Err(PlanError::NotPlanner);
        }
        let planner = self
            .repos
            .company_repo
            .find_by_id(&draft.planner)?
            .ok_or(EngineError::PlannerNotFound(draft.planner))?;

        let now = self.datetime.now();
        let social_accounting = self
            .repos
            .social_accounting_repo
            .get_or_create_social_accounting()?;
        let is_activated = self.config.get_activate_on_approval()?;
        let purpose = plan_purpose(&draft.id);

        // 建计划、删草稿、发放信用、激活：任一步失败则全部回滚
        let plan = self.repos.in_transaction(|conn| -> Result<Plan, PlanError> {
            let plan = insert_plan_from_draft(conn, &draft)?;
            remove_draft(conn, &draft.id)?;
            write_approval(conn, &plan.id, now, "approved")?;

            let credit = |receiver: Uuid, amount: Decimal| {
                insert_transaction(
                    conn,
                    NewTransaction {
                        date: now,
                        sending_account: social_accounting.account,
                        receiving_account: receiver,
                        amount_sent: amount,
                        amount_received: amount,
                        purpose: &purpose,
                        plan_id: Some(plan.id),
                    },
                )
            };
            credit(planner.means_account, plan.costs.means_cost)?;
            credit(planner.raw_material_account, plan.costs.resource_cost)?;
            if !plan.is_public_service {
                credit(planner.product_account, -plan.costs.total_cost())?;
            }

            if is_activated {
                write_activation(conn, &plan.id, now)?;
            }
            Ok(plan)
        })?;
        info!(plan_id = %plan.id, activated = is_activated, "计划已批准");
        Ok(ApprovalResponse {
            plan_id: plan.id,
            is_activated,
        })
    }
}

// ==========================================
// HidePlan / TogglePlanAvailability
// ==========================================
pub struct HidePlan {
    repos: LedgerRepositories,
}

impl HidePlan {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, requester: Uuid, plan_id: Uuid) -> Result<(), PlanError> {
        plan_of_planner(&self.repos, &plan_id, &requester)?;
        self.repos.plan_repo.hide_plan(&plan_id)?;
        info!(plan_id = %plan_id, "计划已隐藏");
        Ok(())
    }
}

pub struct TogglePlanAvailability {
    repos: LedgerRepositories,
}

impl TogglePlanAvailability {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    /// 返回切换后的可供应状态
    pub fn execute(&self, requester: Uuid, plan_id: Uuid) -> Result<bool, PlanError> {
        plan_of_planner(&self.repos, &plan_id, &requester)?;
        let available = self.repos.plan_repo.toggle_product_availability(&plan_id)?;
        info!(plan_id = %plan_id, available, "产品可供应状态已切换");
        Ok(available)
    }
}

// ==========================================
// ListActivePlansOfCompany
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivePlanInfo {
    pub plan_id: Uuid,
    pub product_name: String,
    pub activation_date: Option<NaiveDateTime>,
    pub expiration_date: Option<NaiveDateTime>,
    pub price_per_unit: Decimal,
    pub is_available: bool,
    pub is_cooperating: bool,
}

pub struct ListActivePlansOfCompany {
    repos: LedgerRepositories,
    prices: PriceCalculator,
}

impl ListActivePlansOfCompany {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        let prices = PriceCalculator::new(repos.plan_repo.clone(), datetime);
        Self { repos, prices }
    }

    pub fn execute(&self, company: Uuid) -> Result<Vec<ActivePlanInfo>, PlanError> {
        let plans = self.repos.plan_repo.query_plans(
            &PlanQuery::new()
                .planned_by(company)
                .that_are_active()
                .ordered_by(PlanOrdering::ActivationDateDesc),
        )?;
        let mut infos = Vec::with_capacity(plans.len());
        for plan in plans {
            infos.push(ActivePlanInfo {
                price_per_unit: self.prices.calculate_cooperative_price(&plan)?,
                expiration_date: plan.expiration_date(),
                plan_id: plan.id,
                product_name: plan.product_name,
                activation_date: plan.activation_date,
                is_available: plan.is_available,
                is_cooperating: plan.cooperation.is_some(),
            });
        }
        Ok(infos)
    }
}

// ==========================================
// ListExpiredPlansOfCompany
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiredPlanInfo {
    pub plan_id: Uuid,
    pub product_name: String,
    pub expiration_date: Option<NaiveDateTime>,
}

/// 已到期且未被计划方隐藏的计划
pub struct ListExpiredPlansOfCompany {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl ListExpiredPlansOfCompany {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    pub fn execute(&self, company: Uuid) -> Result<Vec<ExpiredPlanInfo>, PlanError> {
        let plans = self.repos.plan_repo.query_plans(
            &PlanQuery::new()
                .planned_by(company)
                .that_are_expired_as_of(self.datetime.now())
                .that_are_not_hidden()
                .ordered_by(PlanOrdering::ActivationDateDesc),
        )?;
        Ok(plans
            .into_iter()
            .map(|plan| ExpiredPlanInfo {
                expiration_date: plan.expiration_date(),
                plan_id: plan.id,
                product_name: plan.product_name,
            })
            .collect())
    }
}

// ==========================================
// QueryPlans
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum PlanFilter {
    #[default]
    ProductName,
    PlanId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum PlanSorting {
    #[default]
    ActivationDate,
    CompanyName,
    CreationDate,
}

impl From<PlanSorting> for PlanOrdering {
    fn from(sorting: PlanSorting) -> Self {
        match sorting {
            PlanSorting::ActivationDate => PlanOrdering::ActivationDateDesc,
            PlanSorting::CompanyName => PlanOrdering::PlannerNameAsc,
            PlanSorting::CreationDate => PlanOrdering::CreationDateDesc,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryPlansRequest {
    pub query_string: Option<String>,
    pub filter: PlanFilter,
    pub sorting: PlanSorting,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueriedPlan {
    pub plan_id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub product_name: String,
    pub description: String,
    pub price_per_unit: Decimal,
    pub is_public_service: bool,
    pub is_available: bool,
    pub is_cooperating: bool,
    pub activation_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanQueryResponse {
    pub results: Vec<QueriedPlan>,
    pub total_results: i64,
}

pub struct QueryPlans {
    repos: LedgerRepositories,
    prices: PriceCalculator,
    datetime: Arc<dyn DatetimeService>,
}

impl QueryPlans {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        let prices = PriceCalculator::new(repos.plan_repo.clone(), datetime.clone());
        Self {
            repos,
            prices,
            datetime,
        }
    }

    pub fn execute(&self, request: &QueryPlansRequest) -> Result<PlanQueryResponse, PlanError> {
        let mut query = PlanQuery::new().that_are_active_as_of(self.datetime.now());
        if let Some(text) = request.query_string.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = match request.filter {
                PlanFilter::ProductName => query.with_product_name_containing(text),
                PlanFilter::PlanId => query.with_id_containing(text),
            };
        }
        let total_results = self.repos.plan_repo.count_plans(&query)?;

        query = query.ordered_by(request.sorting.into());
        if let Some(offset) = request.offset {
            query = query.offset(offset);
        }
        if let Some(limit) = request.limit {
            query = query.limit(limit);
        }

        let plans = self.repos.plan_repo.query_plans(&query)?;
        let mut results = Vec::with_capacity(plans.len());
        for plan in plans {
            let company_name = self
                .repos
                .company_repo
                .find_by_id(&plan.planner)?
                .map(|c| c.name)
                .unwrap_or_default();
            results.push(QueriedPlan {
                price_per_unit: self.prices.calculate_cooperative_price(&plan)?,
                plan_id: plan.id,
                company_id: plan.planner,
                company_name,
                product_name: plan.product_name,
                description: plan.description,
                is_public_service: plan.is_public_service,
                is_available: plan.is_available,
                is_cooperating: plan.cooperation.is_some(),
                activation_date: plan.activation_date,
            });
        }
        debug!(total_results, returned = results.len(), "计划查询完成");
        Ok(PlanQueryResponse {
            results,
            total_results,
        })
    }
}

// ==========================================
// GetPlanDetails
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDetails {
    pub plan_id: Uuid,
    pub planner_id: Uuid,
    pub planner_name: String,
    pub product_name: String,
    pub description: String,
    pub unit_of_distribution: String,
    pub amount_produced: i64,
    pub timeframe_days: i64,
    pub is_public_service: bool,
    pub costs: ProductionCosts,
    pub is_active: bool,
    pub is_available: bool,
    pub active_days: Option<i64>,
    pub activation_date: Option<NaiveDateTime>,
    pub expiration_date: Option<NaiveDateTime>,
    pub individual_price: Decimal,
    pub cooperative_price: Decimal,
    pub cooperation: Option<Uuid>,
}

pub struct GetPlanDetails {
    repos: LedgerRepositories,
    prices: PriceCalculator,
}

impl GetPlanDetails {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        let prices = PriceCalculator::new(repos.plan_repo.clone(), datetime);
        Self { repos, prices }
    }

    pub fn execute(&self, plan_id: Uuid) -> Result<Option<PlanDetails>, PlanError> {
        let plan = match self.repos.plan_repo.get_plan(&plan_id)? {
            Some(p) => p,
            None => return Ok(None),
        };
        let planner_name = self
            .repos
            .company_repo
            .find_by_id(&plan.planner)?
            .map(|c| c.name)
            .unwrap_or_default();
        Ok(Some(PlanDetails {
            individual_price: PriceCalculator::calculate_individual_price(&plan)?,
            cooperative_price: self.prices.calculate_cooperative_price(&plan)?,
            expiration_date: plan.expiration_date(),
            plan_id: plan.id,
            planner_id: plan.planner,
            planner_name,
            product_name: plan.product_name,
            description: plan.description,
            unit_of_distribution: plan.unit_of_distribution,
            amount_produced: plan.amount_produced,
            timeframe_days: plan.timeframe_days,
            is_public_service: plan.is_public_service,
            costs: plan.costs,
            is_active: plan.is_active,
            is_available: plan.is_available,
            active_days: plan.active_days,
            activation_date: plan.activation_date,
            cooperation: plan.cooperation,
        }))
    }
}
