// ==========================================
// 劳动时间经济核算系统 - 合作
// ==========================================
// 计划方申请加入合作 → 协调者接受/拒绝
// 合作内计划按合作价（成员个体价平均）出售
// 协调权通过转移请求移交，每次移交开启新任期
// ==========================================

use crate::domain::cooperation::Cooperation;
use crate::domain::plan::Plan;
use crate::engine::datetime::DatetimeService;
use crate::engine::error::EngineError;
use crate::engine::price_calculator::PriceCalculator;
use crate::engine::repositories::LedgerRepositories;
use crate::repository::cooperation_repo::{
    close_transfer_request, insert_coordination_tenure, insert_cooperation,
};
use crate::repository::error::RepositoryError;
use crate::repository::PlanQuery;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CooperationError {
    #[error("企业不存在: {0}")]
    CompanyNotFound(Uuid),

    #[error("合作名称已被使用: {0}")]
    NameAlreadyTaken(String),

    #[error("计划不存在: {0}")]
    PlanNotFound(Uuid),

    #[error("合作不存在: {0}")]
    CooperationNotFound(Uuid),

    #[error("计划未激活: {0}")]
    PlanInactive(Uuid),

    #[error("计划已在合作中")]
    PlanAlreadyCooperating,

    #[error("计划已申请合作")]
    CooperationAlreadyRequested,

    #[error("公共服务计划不能参与合作")]
    PlanIsPublicService,

    #[error("计划未申请加入该合作")]
    CooperationNotRequested,

    #[error("计划不属于该合作")]
    PlanNotInCooperation,

    #[error("只有计划方可以执行此操作")]
    RequesterIsNotPlanner,

    #[error("只有协调者可以执行此操作")]
    RequesterIsNotCoordinator,

    #[error("只有计划方或协调者可以执行此操作")]
    RequesterIsNotPlannerOrCoordinator,

    #[error("候选企业不存在: {0}")]
    CandidateIsNotCompany(Uuid),

    #[error("候选企业已是协调者")]
    CandidateIsCurrentCoordinator,

    #[error("该合作已有未处理的转移请求")]
    TransferAlreadyPending,

    #[error("转移请求不存在: {0}")]
    TransferRequestNotFound(Uuid),

    #[error("转移请求已关闭")]
    TransferRequestClosed,

    #[error("接受方不是候选企业")]
    AcceptingCompanyIsNotCandidate,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

type CoopResult<T> = Result<T, CooperationError>;

fn find_plan(repos: &LedgerRepositories, plan_id: &Uuid) -> CoopResult<Plan> {
    repos
        .plan_repo
        .get_plan(plan_id)?
        .ok_or(CooperationError::PlanNotFound(*plan_id))
}

fn find_cooperation(repos: &LedgerRepositories, cooperation_id: &Uuid) -> CoopResult<Cooperation> {
    repos
        .cooperation_repo
        .get_cooperation(cooperation_id)?
        .ok_or(CooperationError::CooperationNotFound(*cooperation_id))
}

fn is_coordinator(repos: &LedgerRepositories, cooperation: &Uuid, company: &Uuid) -> CoopResult<bool> {
    Ok(repos
        .cooperation_repo
        .current_coordinator(cooperation)?
        .map_or(false, |c| c.id == *company))
}

// ==========================================
// CreateCooperation
// ==========================================
pub struct CreateCooperation {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl CreateCooperation {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    /// 返回合作 id；创建者成为首任协调者
    pub fn execute(&self, coordinator: Uuid, name: &str, definition: &str) -> CoopResult<Uuid> {
        if self.repos.company_repo.find_by_id(&coordinator)?.is_none() {
            return Err(CooperationError::CompanyNotFound(coordinator));
        }
        if self.repos.cooperation_repo.find_by_name(name)?.is_some() {
            return Err(CooperationError::NameAlreadyTaken(name.to_string()));
        }
        let now = self.datetime.now();
        let cooperation = self.repos.in_transaction(|conn| -> CoopResult<Cooperation> {
            let cooperation = insert_cooperation(conn, now, name, definition)?;
            insert_coordination_tenure(conn, &coordinator, &cooperation.id, now)?;
            Ok(cooperation)
        })?;
        info!(cooperation_id = %cooperation.id, coordinator = %coordinator, "合作已创建");
        Ok(cooperation.id)
    }
}

// ==========================================
// RequestCooperation
// ==========================================
pub struct RequestCooperation {
    repos: LedgerRepositories,
}

impl RequestCooperation {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, requester: Uuid, plan_id: Uuid, cooperation_id: Uuid) -> CoopResult<()> {
        let plan = find_plan(&self.repos, &plan_id)?;
        find_cooperation(&self.repos, &cooperation_id)?;
        if !plan.is_active {
            return Err(CooperationError::PlanInactive(plan_id));
        }
        if plan.cooperation.is_some() {
            return Err(CooperationError::PlanAlreadyCooperating);
        }
        if plan.requested_cooperation.is_some() {
            return Err(CooperationError::CooperationAlreadyRequested);
        }
        if plan.is_public_service {
            return Err(CooperationError::PlanIsPublicService);
        }
        if plan.planner != requester {
            return Err(CooperationError::RequesterIsNotPlanner);
        }
        self.repos
            .plan_repo
            .set_requested_cooperation(&plan_id, Some(cooperation_id))?;
        info!(plan_id = %plan_id, cooperation_id = %cooperation_id, "已申请加入合作");
        Ok(())
    }
}

// ==========================================
// AcceptCooperation / DenyCooperation
// ==========================================
pub struct AcceptCooperation {
    repos: LedgerRepositories,
}

impl AcceptCooperation {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, requester: Uuid, plan_id: Uuid, cooperation_id: Uuid) -> CoopResult<()> {
        let plan = find_plan(&self.repos, &plan_id)?;
        find_cooperation(&self.repos, &cooperation_id)?;
        if !plan.is_active {
            return Err(CooperationError::PlanInactive(plan_id));
        }
        if plan.cooperation.is_some() {
            return Err(CooperationError::PlanAlreadyCooperating);
        }
        if plan.is_public_service {
            return Err(CooperationError::PlanIsPublicService);
        }
        if plan.requested_cooperation != Some(cooperation_id) {
            return Err(CooperationError::CooperationNotRequested);
        }
        if !is_coordinator(&self.repos, &cooperation_id, &requester)? {
            return Err(CooperationError::RequesterIsNotCoordinator);
        }
        self.repos.plan_repo.join_cooperation(&plan_id, &cooperation_id)?;
        info!(plan_id = %plan_id, cooperation_id = %cooperation_id, "计划已加入合作");
        Ok(())
    }
}

pub struct DenyCooperation {
    repos: LedgerRepositories,
}

impl DenyCooperation {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, requester: Uuid, plan_id: Uuid, cooperation_id: Uuid) -> CoopResult<()> {
        let plan = find_plan(&self.repos, &plan_id)?;
        find_cooperation(&self.repos, &cooperation_id)?;
        if plan.requested_cooperation != Some(cooperation_id) {
            return Err(CooperationError::CooperationNotRequested);
        }
        if !is_coordinator(&self.repos, &cooperation_id, &requester)? {
            return Err(CooperationError::RequesterIsNotCoordinator);
        }
        self.repos.plan_repo.set_requested_cooperation(&plan_id, None)?;
        info!(plan_id = %plan_id, cooperation_id = %cooperation_id, "合作申请已拒绝");
        Ok(())
    }
}

// ==========================================
// CancelCooperationSolicitation
// ==========================================
pub struct CancelCooperationSolicitation {
    repos: LedgerRepositories,
}

impl CancelCooperationSolicitation {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    /// 有申请且请求方是计划方时撤回并返回 true
    pub fn execute(&self, requester: Uuid, plan_id: Uuid) -> CoopResult<bool> {
        let plan = match self.repos.plan_repo.get_plan(&plan_id)? {
            Some(p) => p,
            None => return Ok(false),
        };
        if plan.planner != requester || plan.requested_cooperation.is_none() {
            return Ok(false);
        }
        self.repos.plan_repo.set_requested_cooperation(&plan_id, None)?;
        info!(plan_id = %plan_id, "合作申请已撤回");
        Ok(true)
    }
}

// ==========================================
// EndCooperation
// ==========================================
pub struct EndCooperation {
    repos: LedgerRepositories,
}

impl EndCooperation {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, requester: Uuid, plan_id: Uuid, cooperation_id: Uuid) -> CoopResult<()> {
        let plan = find_plan(&self.repos, &plan_id)?;
        find_cooperation(&self.repos, &cooperation_id)?;
        if plan.cooperation != Some(cooperation_id) {
            return Err(CooperationError::PlanNotInCooperation);
        }
        if plan.planner != requester && !is_coordinator(&self.repos, &cooperation_id, &requester)? {
            return Err(CooperationError::RequesterIsNotPlannerOrCoordinator);
        }
        self.repos.plan_repo.set_cooperation(&plan_id, None)?;
        info!(plan_id = %plan_id, cooperation_id = %cooperation_id, "计划已退出合作");
        Ok(())
    }
}

// ==========================================
// 合作相关列表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CooperatingPlanInfo {
    pub plan_id: Uuid,
    pub plan_name: String,
    pub cooperation_id: Uuid,
    pub cooperation_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CooperationRequestInfo {
    pub plan_id: Uuid,
    pub plan_name: String,
    pub planner_id: Uuid,
    pub planner_name: String,
    pub cooperation_id: Uuid,
    pub cooperation_name: String,
}

pub struct ListMyCooperatingPlans {
    repos: LedgerRepositories,
}

impl ListMyCooperatingPlans {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, company: Uuid) -> CoopResult<Vec<CooperatingPlanInfo>> {
        if self.repos.company_repo.find_by_id(&company)?.is_none() {
            return Err(CooperationError::CompanyNotFound(company));
        }
        let plans = self
            .repos
            .plan_repo
            .query_plans(&PlanQuery::new().planned_by(company).that_are_cooperating())?;
        let mut infos = Vec::with_capacity(plans.len());
        for plan in plans {
            let cooperation = match plan.cooperation {
                Some(c) => find_cooperation(&self.repos, &c)?,
                None => continue,
            };
            infos.push(CooperatingPlanInfo {
                plan_id: plan.id,
                plan_name: plan.product_name,
                cooperation_id: cooperation.id,
                cooperation_name: cooperation.name,
            });
        }
        Ok(infos)
    }
}

/// 协调者收到的加入申请 / 计划方发出的加入申请
pub struct ListCooperationRequests {
    repos: LedgerRepositories,
}

impl ListCooperationRequests {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn inbound(&self, coordinator: Uuid) -> CoopResult<Vec<CooperationRequestInfo>> {
        self.describe(
            self.repos
                .plan_repo
                .query_plans(&PlanQuery::new().that_request_cooperation_with_coordinator(coordinator))?,
        )
    }

    pub fn outbound(&self, planner: Uuid) -> CoopResult<Vec<CooperationRequestInfo>> {
        self.describe(
            self.repos
                .plan_repo
                .query_plans(&PlanQuery::new().planned_by(planner).that_are_requesting_cooperation())?,
        )
    }

    fn describe(&self, plans: Vec<Plan>) -> CoopResult<Vec<CooperationRequestInfo>> {
        let mut infos = Vec::with_capacity(plans.len());
        for plan in plans {
            let cooperation = match plan.requested_cooperation {
                Some(c) => find_cooperation(&self.repos, &c)?,
                None => continue,
            };
            let planner_name = self
                .repos
                .company_repo
                .find_by_id(&plan.planner)?
                .map(|c| c.name)
                .unwrap_or_default();
            infos.push(CooperationRequestInfo {
                plan_id: plan.id,
                plan_name: plan.product_name,
                planner_id: plan.planner,
                planner_name,
                cooperation_id: cooperation.id,
                cooperation_name: cooperation.name,
            });
        }
        Ok(infos)
    }
}

/// 企业当前协调的合作
pub struct ListCoordinationsOfCompany {
    repos: LedgerRepositories,
}

impl ListCoordinationsOfCompany {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, company: Uuid) -> CoopResult<Vec<Cooperation>> {
        Ok(self.repos.cooperation_repo.cooperations_coordinated_by(&company)?)
    }
}

// ==========================================
// GetCoopSummary
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoopPlanInfo {
    pub plan_id: Uuid,
    pub plan_name: String,
    pub planner_id: Uuid,
    pub planner_name: String,
    pub individual_price: Decimal,
    pub cooperative_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoopSummary {
    pub cooperation_id: Uuid,
    pub name: String,
    pub definition: String,
    pub requester_is_coordinator: bool,
    pub coordinator_id: Option<Uuid>,
    pub coordinator_name: Option<String>,
    pub plans: Vec<CoopPlanInfo>,
}

pub struct GetCoopSummary {
    repos: LedgerRepositories,
    prices: PriceCalculator,
    datetime: Arc<dyn DatetimeService>,
}

impl GetCoopSummary {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        let prices = PriceCalculator::new(repos.plan_repo.clone(), datetime.clone());
        Self {
            repos,
            prices,
            datetime,
        }
    }

    pub fn execute(&self, requester: Uuid, cooperation_id: Uuid) -> CoopResult<Option<CoopSummary>> {
        let cooperation = match self.repos.cooperation_repo.get_cooperation(&cooperation_id)? {
            Some(c) => c,
            None => return Ok(None),
        };
        let coordinator = self.repos.cooperation_repo.current_coordinator(&cooperation_id)?;

        let plans = self.repos.plan_repo.query_plans(
            &PlanQuery::new()
                .that_are_part_of_cooperation(cooperation_id)
                .that_are_active_as_of(self.datetime.now()),
        )?;
        let mut plan_infos = Vec::with_capacity(plans.len());
        for plan in plans {
            let planner_name = self
                .repos
                .company_repo
                .find_by_id(&plan.planner)?
                .map(|c| c.name)
                .unwrap_or_default();
            plan_infos.push(CoopPlanInfo {
                individual_price: PriceCalculator::calculate_individual_price(&plan)?,
                cooperative_price: self.prices.calculate_cooperative_price(&plan)?,
                plan_id: plan.id,
                plan_name: plan.product_name,
                planner_id: plan.planner,
                planner_name,
            });
        }

        Ok(Some(CoopSummary {
            cooperation_id: cooperation.id,
            name: cooperation.name,
            definition: cooperation.definition,
            requester_is_coordinator: coordinator.as_ref().map_or(false, |c| c.id == requester),
            coordinator_id: coordinator.as_ref().map(|c| c.id),
            coordinator_name: coordinator.map(|c| c.name),
            plans: plan_infos,
        }))
    }
}

// ==========================================
// RequestCoordinationTransfer / AcceptCoordinationTransfer
// ==========================================
pub struct RequestCoordinationTransfer {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl RequestCoordinationTransfer {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    /// 返回转移请求 id
    pub fn execute(&self, requester: Uuid, cooperation_id: Uuid, candidate: Uuid) -> CoopResult<Uuid> {
        find_cooperation(&self.repos, &cooperation_id)?;
        if self.repos.company_repo.find_by_id(&candidate)?.is_none() {
            return Err(CooperationError::CandidateIsNotCompany(candidate));
        }
        let tenure = match self.repos.cooperation_repo.current_tenure(&cooperation_id)? {
            Some(t) if t.company == requester => t,
            _ => return Err(CooperationError::RequesterIsNotCoordinator),
        };
        if tenure.company == candidate {
            return Err(CooperationError::CandidateIsCurrentCoordinator);
        }
        if self.repos.cooperation_repo.has_pending_transfer_request(&cooperation_id)? {
            return Err(CooperationError::TransferAlreadyPending);
        }
        let request = self
            .repos
            .cooperation_repo
            .create_transfer_request(&tenure.id, &candidate, self.datetime.now())?;
        info!(request_id = %request.id, cooperation_id = %cooperation_id, candidate = %candidate, "协调权转移已请求");
        Ok(request.id)
    }
}

pub struct AcceptCoordinationTransfer {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl AcceptCoordinationTransfer {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    /// 返回合作 id
    pub fn execute(&self, request_id: Uuid, accepting_company: Uuid) -> CoopResult<Uuid> {
        let request = self
            .repos
            .cooperation_repo
            .get_transfer_request(&request_id)?
            .ok_or(CooperationError::TransferRequestNotFound(request_id))?;
        if request.is_closed {
            return Err(CooperationError::TransferRequestClosed);
        }
        if request.candidate != accepting_company {
            return Err(CooperationError::AcceptingCompanyIsNotCandidate);
        }
        let old_tenure = self
            .repos
            .cooperation_repo
            .get_tenure(&request.requesting_tenure)?
            .ok_or(CooperationError::TransferRequestNotFound(request_id))?;

        let now = self.datetime.now();
        // 并发接受同一请求时只有一方能关闭请求并开启任期
        self.repos.in_transaction(|conn| -> CoopResult<()> {
            if !close_transfer_request(conn, &request_id)? {
                return Err(CooperationError::TransferRequestClosed);
            }
            insert_coordination_tenure(conn, &accepting_company, &old_tenure.cooperation, now)?;
            Ok(())
        })?;
        info!(
            cooperation_id = %old_tenure.cooperation,
            new_coordinator = %accepting_company,
            "协调权已转移"
        );
        Ok(old_tenure.cooperation)
    }
}
