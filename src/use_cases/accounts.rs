// ==========================================
// 劳动时间经济核算系统 - 账户查询
// ==========================================
// 企业四账户余额、对账单、单账户明细（含累计曲线）
// 企业概况（预期/余额/偏差/计划/供应商）与全局统计
// ==========================================

use crate::domain::account::Transaction;
use crate::domain::types::{AccountType, Deviation, TransactionType};
use crate::domain::user::{AccountOwner, Company};
use crate::engine::accounting::{StatementRow, UserAccountingService};
use crate::engine::datetime::DatetimeService;
use crate::engine::error::EngineError;
use crate::engine::repositories::LedgerRepositories;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{PlanAggregates, PlanQuery};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AccountsError {
    #[error("企业不存在: {0}")]
    CompanyNotFound(Uuid),

    #[error("成员不存在: {0}")]
    MemberNotFound(Uuid),

    #[error("企业没有此类账户: {0}")]
    NotACompanyAccount(AccountType),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn find_company(repos: &LedgerRepositories, company: &Uuid) -> Result<Company, AccountsError> {
    repos
        .company_repo
        .find_by_id(company)?
        .ok_or(AccountsError::CompanyNotFound(*company))
}

fn accounting_service(repos: &LedgerRepositories) -> UserAccountingService {
    UserAccountingService::new(repos.account_repo.clone(), repos.transaction_repo.clone())
}

// ==========================================
// ShowMyAccounts
// ==========================================
pub struct ShowMyAccounts {
    repos: LedgerRepositories,
}

impl ShowMyAccounts {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    /// 余额顺序: [p, r, a, prd]
    pub fn execute(&self, company: Uuid) -> Result<[Decimal; 4], AccountsError> {
        let company = find_company(&self.repos, &company)?;
        let accounts = company.accounts();
        let balances = self.repos.account_repo.balances_of(&accounts)?;
        Ok(accounts.map(|a| balances.get(&a).copied().unwrap_or(Decimal::ZERO)))
    }
}

// ==========================================
// GetCompanyTransactions
// ==========================================
pub struct GetCompanyTransactions {
    repos: LedgerRepositories,
}

impl GetCompanyTransactions {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, company: Uuid) -> Result<Vec<StatementRow>, AccountsError> {
        let company = find_company(&self.repos, &company)?;
        Ok(accounting_service(&self.repos).get_statement_of_account(&company.accounts())?)
    }
}

// ==========================================
// ShowAccountDetails
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyerInfo {
    pub buyer_is_member: bool,
    pub buyer_id: Uuid,
    pub buyer_name: String,
}

impl From<AccountOwner> for BuyerInfo {
    fn from(owner: AccountOwner) -> Self {
        Self {
            buyer_is_member: matches!(owner, AccountOwner::Member(_)),
            buyer_id: owner.id(),
            buyer_name: owner.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTransactionInfo {
    pub transaction_type: TransactionType,
    pub date: NaiveDateTime,
    pub volume: Decimal,
    pub purpose: String,
    pub buyer: Option<BuyerInfo>,
}

/// 时间升序的累计曲线
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AccountPlot {
    pub timestamps: Vec<NaiveDateTime>,
    pub accumulated_volumes: Vec<Decimal>,
}

impl AccountPlot {
    /// rows 为新到旧
    fn from_rows(rows: &[AccountTransactionInfo]) -> Self {
        let mut plot = AccountPlot::default();
        let mut running = Decimal::ZERO;
        for row in rows.iter().rev() {
            running += row.volume;
            plot.timestamps.push(row.date);
            plot.accumulated_volumes.push(running);
        }
        plot
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountDetails {
    pub account_type: AccountType,
    pub transactions: Vec<AccountTransactionInfo>,
    pub account_balance: Decimal,
    pub plot: AccountPlot,
}

pub struct ShowAccountDetails {
    repos: LedgerRepositories,
}

impl ShowAccountDetails {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(
        &self,
        company: Uuid,
        account_type: AccountType,
    ) -> Result<AccountDetails, AccountsError> {
        let company = find_company(&self.repos, &company)?;
        let account = match account_type {
            AccountType::Means => company.means_account,
            AccountType::RawMaterial => company.raw_material_account,
            AccountType::Labour => company.work_account,
            AccountType::Product => company.product_account,
            other => return Err(AccountsError::NotACompanyAccount(other)),
        };

        let service = accounting_service(&self.repos);
        let rows = service.get_statement_of_account(&[account])?;
        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let buyer = if account_type == AccountType::Product {
                service
                    .get_buyer(row.transaction_type, &row.transaction)?
                    .map(BuyerInfo::from)
            } else {
                None
            };
            transactions.push(AccountTransactionInfo {
                transaction_type: row.transaction_type,
                date: row.transaction.date,
                volume: row.volume,
                purpose: row.transaction.purpose,
                buyer,
            });
        }

        Ok(AccountDetails {
            account_type,
            plot: AccountPlot::from_rows(&transactions),
            account_balance: self.repos.account_repo.get_account_balance(&account)?,
            transactions,
        })
    }
}

// ==========================================
// GetMemberAccountDetails
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberAccountDetails {
    pub member_id: Uuid,
    pub transactions: Vec<StatementRow>,
    pub balance: Decimal,
}

pub struct GetMemberAccountDetails {
    repos: LedgerRepositories,
}

impl GetMemberAccountDetails {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self, member: Uuid) -> Result<MemberAccountDetails, AccountsError> {
        let member = self
            .repos
            .member_repo
            .find_by_id(&member)?
            .ok_or(AccountsError::MemberNotFound(member))?;
        let transactions = accounting_service(&self.repos).get_statement_of_account(&[member.account])?;
        Ok(MemberAccountDetails {
            member_id: member.id,
            balance: self.repos.account_repo.get_account_balance(&member.account)?,
            transactions,
        })
    }
}

// ==========================================
// GetCompanySummary
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummaryDetails {
    pub plan_id: Uuid,
    pub product_name: String,
    pub is_active: bool,
    pub sales_volume: Decimal,
    pub sales_balance: Decimal,
    pub deviation_relative: Deviation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Supplier {
    pub company_id: Uuid,
    pub company_name: String,
    pub volume_of_sales: Decimal,
}

/// 四账户数值，顺序为 p, r, a, prd
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccountValues<T> {
    pub means: T,
    pub raw_material: T,
    pub work: T,
    pub product: T,
}

impl<T: Copy> AccountValues<T> {
    fn from_fn(mut f: impl FnMut(Uuid) -> T, company: &Company) -> Self {
        Self {
            means: f(company.means_account),
            raw_material: f(company.raw_material_account),
            work: f(company.work_account),
            product: f(company.product_account),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub registered_on: NaiveDateTime,
    pub expectations: AccountValues<Decimal>,
    pub account_balances: AccountValues<Decimal>,
    pub deviations_relative: AccountValues<Deviation>,
    pub plan_details: Vec<PlanSummaryDetails>,
    pub suppliers_ordered_by_volume: Vec<Supplier>,
}

pub struct GetCompanySummary {
    repos: LedgerRepositories,
    datetime: Arc<dyn DatetimeService>,
}

impl GetCompanySummary {
    pub fn new(repos: LedgerRepositories, datetime: Arc<dyn DatetimeService>) -> Self {
        Self { repos, datetime }
    }

    pub fn execute(&self, company: Uuid) -> Result<Option<CompanySummary>, AccountsError> {
        let company = match self.repos.company_repo.find_by_id(&company)? {
            Some(c) => c,
            None => return Ok(None),
        };
        let social_accounting = self
            .repos
            .social_accounting_repo
            .get_or_create_social_accounting()?;

        let mut expected = HashMap::new();
        for account in company.accounts() {
            let credited: Decimal = self
                .repos
                .transaction_repo
                .find_sent_by_social_accounting_to(&social_accounting.account, &account)?
                .iter()
                .map(|t| t.amount_received)
                .sum();
            expected.insert(account, credited);
        }
        let balances = self.repos.account_repo.balances_of(&company.accounts())?;

        let value_of = |map: &HashMap<Uuid, Decimal>, account: Uuid| {
            map.get(&account).copied().unwrap_or(Decimal::ZERO)
        };
        let expectations = AccountValues::from_fn(|a| value_of(&expected, a), &company);
        let account_balances = AccountValues::from_fn(|a| value_of(&balances, a), &company);
        let deviations_relative = AccountValues::from_fn(
            |a| Deviation::relative(value_of(&balances, a), value_of(&expected, a)),
            &company,
        );

        Ok(Some(CompanySummary {
            plan_details: self.plan_details(&company, &social_accounting.account)?,
            suppliers_ordered_by_volume: self.suppliers(&company)?,
            id: company.id,
            name: company.name,
            email: company.email,
            registered_on: company.registered_on,
            expectations,
            account_balances,
            deviations_relative,
        }))
    }

    fn plan_details(
        &self,
        company: &Company,
        social_accounting_account: &Uuid,
    ) -> RepositoryResult<Vec<PlanSummaryDetails>> {
        let now = self.datetime.now();
        let plans = self
            .repos
            .plan_repo
            .query_plans(&PlanQuery::new().planned_by(company.id))?;
        let mut details = Vec::with_capacity(plans.len());
        for plan in plans {
            let sales: Decimal = self
                .repos
                .transaction_repo
                .sales_of_plan(&plan.id, &company.product_account, social_accounting_account)?
                .iter()
                .map(|t: &Transaction| t.amount_received)
                .sum();
            let expected_sales = plan.expected_sales_value();
            let sales_balance = sales - expected_sales;
            details.push(PlanSummaryDetails {
                is_active: plan.is_active_as_of(now),
                deviation_relative: Deviation::relative(sales_balance, expected_sales),
                plan_id: plan.id,
                product_name: plan.product_name,
                sales_volume: expected_sales,
                sales_balance,
            });
        }
        Ok(details)
    }

    fn suppliers(&self, company: &Company) -> RepositoryResult<Vec<Supplier>> {
        let mut volumes: HashMap<Uuid, Decimal> = HashMap::new();
        for purchase in self.repos.purchase_repo.find_by_buyer(&company.id)? {
            if let Some(plan) = self.repos.plan_repo.get_plan(&purchase.plan)? {
                *volumes.entry(plan.planner).or_insert(Decimal::ZERO) += purchase.price_total();
            }
        }
        let mut suppliers = Vec::with_capacity(volumes.len());
        for (supplier_id, volume) in volumes {
            if let Some(supplier) = self.repos.company_repo.find_by_id(&supplier_id)? {
                suppliers.push(Supplier {
                    company_id: supplier.id,
                    company_name: supplier.name,
                    volume_of_sales: volume,
                });
            }
        }
        suppliers.sort_by(|a, b| b.volume_of_sales.cmp(&a.volume_of_sales));
        Ok(suppliers)
    }
}

// ==========================================
// GetStatistics
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsResponse {
    pub registered_companies_count: i64,
    pub registered_members_count: i64,
    pub cooperations_count: i64,
    pub plans: PlanAggregates,
    pub payout_factor: Option<Decimal>,
}

pub struct GetStatistics {
    repos: LedgerRepositories,
}

impl GetStatistics {
    pub fn new(repos: LedgerRepositories) -> Self {
        Self { repos }
    }

    pub fn execute(&self) -> RepositoryResult<StatisticsResponse> {
        Ok(StatisticsResponse {
            registered_companies_count: self.repos.company_repo.count_registered_companies()?,
            registered_members_count: self.repos.member_repo.count_registered_members()?,
            cooperations_count: self.repos.cooperation_repo.count_cooperations()?,
            plans: self.repos.plan_repo.active_plan_aggregates()?,
            payout_factor: self
                .repos
                .payout_factor_repo
                .get_latest_payout_factor()?
                .map(|f| f.value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(day: u32, volume: i64) -> AccountTransactionInfo {
        AccountTransactionInfo {
            transaction_type: TransactionType::CreditForWages,
            date: NaiveDate::from_ymd_opt(2022, 5, day)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            volume: Decimal::from(volume),
            purpose: "".to_string(),
            buyer: None,
        }
    }

    #[test]
    fn test_累计曲线按时间升序() {
        // 新到旧
        let rows = vec![row(3, -2), row(2, 5), row(1, 10)];
        let plot = AccountPlot::from_rows(&rows);
        assert_eq!(plot.timestamps, vec![rows[2].date, rows[1].date, rows[0].date]);
        assert_eq!(
            plot.accumulated_volumes,
            vec![Decimal::from(10), Decimal::from(15), Decimal::from(13)]
        );
    }

    #[test]
    fn test_空账户曲线() {
        assert_eq!(AccountPlot::from_rows(&[]), AccountPlot::default());
    }
}
