// ==========================================
// 劳动时间经济核算系统 - 注册与确认
// ==========================================
// 成员注册: 创建成员账户
// 企业注册: 创建 p / r / a / prd 四个账户
// ==========================================

use crate::domain::types::AccountType;
use crate::domain::user::{Company, Member};
use crate::engine::datetime::DatetimeService;
use crate::domain::account::Account;
use crate::engine::repositories::LedgerRepositories;
use crate::repository::account_repo::insert_account;
use crate::repository::company_repo::insert_company;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::member_repo::insert_member;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("邮箱已被注册: {0}")]
    EmailAlreadyExists(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationResponse {
    pub is_confirmed: bool,
    pub user_id: Option<Uuid>,
}

impl ConfirmationResponse {
    fn rejected() -> Self {
        Self {
            is_confirmed: false,
            user_id: None,
        }
    }
}

fn new_account(conn: &Connection, account_type: AccountType) -> RepositoryResult<Uuid> {
    let account = Account {
        id: Uuid::new_v4(),
        account_type,
    };
    insert_account(conn, &account)?;
    Ok(account.id)
}

// ==========================================
// RegisterMember
// ==========================================
pub struct RegisterMember {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl RegisterMember {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    pub fn execute(&self, name: &str, email: &str) -> Result<Uuid, RegistrationError> {
        if self.repos.member_repo.find_by_email(email)?.is_some() {
            return Err(RegistrationError::EmailAlreadyExists(email.to_string()));
        }
        let registered_on = self.datetime.now();
        let member = self.repos.in_transaction(|conn| -> RepositoryResult<Member> {
            let member = Member {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.to_string(),
                account: new_account(conn, AccountType::Member)?,
                registered_on,
                confirmed_on: None,
            };
            insert_member(conn, &member)?;
            Ok(member)
        })?;
        info!(member_id = %member.id, "成员已注册");
        Ok(member.id)
    }
}

// ==========================================
// RegisterCompany
// ==========================================
pub struct RegisterCompany {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl RegisterCompany {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    pub fn execute(&self, name: &str, email: &str) -> Result<Uuid, RegistrationError> {
        if self.repos.company_repo.find_by_email(email)?.is_some() {
            return Err(RegistrationError::EmailAlreadyExists(email.to_string()));
        }
        let registered_on = self.datetime.now();
        // 四个账户与企业同一事务写入，失败时不留下无主账户
        let company = self.repos.in_transaction(|conn| -> RepositoryResult<Company> {
            let company = Company {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.to_string(),
                means_account: new_account(conn, AccountType::Means)?,
                raw_material_account: new_account(conn, AccountType::RawMaterial)?,
                work_account: new_account(conn, AccountType::Labour)?,
                product_account: new_account(conn, AccountType::Product)?,
                registered_on,
                confirmed_on: None,
            };
            insert_company(conn, &company)?;
            Ok(company)
        })?;
        info!(company_id = %company.id, "企业已注册");
        Ok(company.id)
    }
}

// ==========================================
// ConfirmMember / ConfirmCompany
// ==========================================
// 未知邮箱或已确认 → 不确认
pub struct ConfirmMember {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl ConfirmMember {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    pub fn execute(&self, email: &str) -> RepositoryResult<ConfirmationResponse> {
        let member = match self.repos.member_repo.find_by_email(email)? {
            Some(m) if !m.is_confirmed() => m,
            _ => return Ok(ConfirmationResponse::rejected()),
        };
        self.repos
            .member_repo
            .confirm_member(&member.id, self.datetime.now())?;
        info!(member_id = %member.id, "成员已确认");
        Ok(ConfirmationResponse {
            is_confirmed: true,
            user_id: Some(member.id),
        })
    }
}

pub struct ConfirmCompany {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl ConfirmCompany {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    pub fn execute(&self, email: &str) -> RepositoryResult<ConfirmationResponse> {
        let company = match self.repos.company_repo.find_by_email(email)? {
            Some(c) if !c.is_confirmed() => c,
            _ => return Ok(ConfirmationResponse::rejected()),
        };
        self.repos
            .company_repo
            .confirm_company(&company.id, self.datetime.now())?;
        info!(company_id = %company.id, "企业已确认");
        Ok(ConfirmationResponse {
            is_confirmed: true,
            user_id: Some(company.id),
        })
    }
}
