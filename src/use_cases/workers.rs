// ==========================================
// 劳动时间经济核算系统 - 员工与工时
// ==========================================
// 邀请 → 接受/拒绝 → 员工关系；登记工时: 企业 a 账户 → 成员账户
// ==========================================

use crate::engine::datetime::DatetimeService;
use crate::engine::repositories::LedgerRepositories;
use crate::repository::company_repo::{insert_worker, remove_work_invite};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::NewTransaction;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

// ==========================================
// InviteWorkerToCompany
// ==========================================
#[derive(Error, Debug)]
pub enum InviteWorkerError {
    #[error("企业不存在: {0}")]
    CompanyNotFound(Uuid),

    #[error("成员不存在: {0}")]
    MemberNotFound(Uuid),

    #[error("成员已被邀请")]
    AlreadyInvited,

    #[error("成员已是该企业员工")]
    AlreadyWorksForCompany,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct InviteWorkerToCompany {
    repos: LedgerRepositories,
}

impl InviteWorkerToCompany {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    /// 返回邀请 id
    pub fn execute(&self, company: Uuid, worker: Uuid) -> Result<Uuid, InviteWorkerError> {
        if self.repos.company_repo.find_by_id(&company)?.is_none() {
            return Err(InviteWorkerError::CompanyNotFound(company));
        }
        if self.repos.member_repo.find_by_id(&worker)?.is_none() {
            return Err(InviteWorkerError::MemberNotFound(worker));
        }
        if self.repos.company_repo.is_invited(&company, &worker)? {
            return Err(InviteWorkerError::AlreadyInvited);
        }
        if self.repos.company_repo.is_worker(&company, &worker)? {
            return Err(InviteWorkerError::AlreadyWorksForCompany);
        }
        let invite = self.repos.company_repo.create_work_invite(&company, &worker)?;
        info!(invite_id = %invite.id, company_id = %company, member_id = %worker, "已发出入职邀请");
        Ok(invite.id)
    }
}

// ==========================================
// ShowWorkInvites
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkInviteInfo {
    pub invite_id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
}

pub struct ShowWorkInvites {
    repos: LedgerRepositories,
}

impl ShowWorkInvites {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, member: Uuid) -> RepositoryResult<Vec<WorkInviteInfo>> {
        let mut infos = Vec::new();
        for invite in self.repos.company_repo.find_invites_for_member(&member)? {
            if let Some(company) = self.repos.company_repo.find_by_id(&invite.company)? {
                infos.push(WorkInviteInfo {
                    invite_id: invite.id,
                    company_id: company.id,
                    company_name: company.name,
                });
            }
        }
        Ok(infos)
    }
}

// ==========================================
// AnswerCompanyWorkInvite
// ==========================================
#[derive(Error, Debug)]
pub enum AnswerInviteError {
    #[error("邀请不存在: {0}")]
    InviteNotFound(Uuid),

    #[error("邀请不是发给该成员的")]
    InviteForOtherMember,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerInviteResponse {
    pub is_accepted: bool,
    pub company_name: String,
}

pub struct AnswerCompanyWorkInvite {
    repos: LedgerRepositories,
}

impl AnswerCompanyWorkInvite {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    /// 无论接受与否，邀请都会被删除
    pub fn execute(
        &self,
        member: Uuid,
        invite_id: Uuid,
        accept: bool,
    ) -> Result<AnswerInviteResponse, AnswerInviteError> {
        let invite = self
            .repos
            .company_repo
            .find_work_invite(&invite_id)?
            .ok_or(AnswerInviteError::InviteNotFound(invite_id))?;
        if invite.member != member {
            return Err(AnswerInviteError::InviteForOtherMember);
        }
        let company_name = self
            .repos
            .company_repo
            .find_by_id(&invite.company)?
            .map(|c| c.name)
            .unwrap_or_default();

        self.repos.in_transaction(|conn| -> RepositoryResult<()> {
            if accept {
                insert_worker(conn, &invite.company, &member)?;
            }
            remove_work_invite(conn, &invite_id)
        })?;
        info!(invite_id = %invite_id, accepted = accept, "入职邀请已答复");

        Ok(AnswerInviteResponse {
            is_accepted: accept,
            company_name,
        })
    }
}

// ==========================================
// ListWorkers
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

pub struct ListWorkers {
    repos: LedgerRepositories,
}

impl ListWorkers {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, company: Uuid) -> RepositoryResult<Vec<WorkerInfo>> {
        Ok(self
            .repos
            .member_repo
            .find_workers_of_company(&company)?
            .into_iter()
            .map(|m| WorkerInfo {
                id: m.id,
                name: m.name,
                email: m.email,
            })
            .collect())
    }
}

// ==========================================
// RegisterHoursWorked
// ==========================================
#[derive(Error, Debug)]
pub enum RegisterHoursWorkedError {
    #[error("工时必须为正: {0}")]
    NonPositiveHours(Decimal),

    #[error("企业不存在: {0}")]
    CompanyNotFound(Uuid),

    #[error("成员 {0} 不是该企业员工")]
    WorkerNotAtCompany(Uuid),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct RegisterHoursWorked {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl RegisterHoursWorked {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    /// 返回交易 id
    pub fn execute(
        &self,
        company: Uuid,
        worker: Uuid,
        hours: Decimal,
    ) -> Result<Uuid, RegisterHoursWorkedError> {
        if hours <= Decimal::ZERO {
            return Err(RegisterHoursWorkedError::NonPositiveHours(hours));
        }
        let company = self
            .repos
            .company_repo
            .find_by_id(&company)?
            .ok_or(RegisterHoursWorkedError::CompanyNotFound(company))?;
        if !self.repos.company_repo.is_worker(&company.id, &worker)? {
            return Err(RegisterHoursWorkedError::WorkerNotAtCompany(worker));
        }
        let member = self
            .repos
            .member_repo
            .find_by_id(&worker)?
            .ok_or(RegisterHoursWorkedError::WorkerNotAtCompany(worker))?;

        let tx = self.repos.transaction_repo.create_transaction(NewTransaction {
            date: self.datetime.now(),
            sending_account: company.work_account,
            receiving_account: member.account,
            amount_sent: hours,
            amount_received: hours,
            purpose: "Lohn",
            plan_id: None,
        })?;
        info!(company_id = %company.id, member_id = %worker, hours = %hours, "工时已登记");
        Ok(tx.id)
    }
}
