// ==========================================
// 劳动时间经济核算系统 - 账户仓储
// ==========================================
// 余额 = Σ 收到金额 − Σ 发出金额；自转账不计入
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::account::Account;
use crate::domain::types::AccountType;
use crate::domain::user::AccountOwner;
use crate::repository::company_repo::map_company_row;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::member_repo::map_member_row;
use crate::repository::row_utils::{build_in_clause, get_decimal, get_uuid};
use crate::domain::user::SocialAccounting;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// AccountRepository - 账户仓储
// ==========================================
pub struct AccountRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AccountRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建账户
    pub fn create_account(&self, account_type: AccountType) -> RepositoryResult<Account> {
        let conn = self.get_conn()?;
        let account = Account {
            id: Uuid::new_v4(),
            account_type,
        };
        insert_account(&conn, &account)?;
        Ok(account)
    }

    pub fn find_by_id(&self, account_id: &Uuid) -> RepositoryResult<Option<Account>> {
        let conn = self.get_conn()?;
        let account = conn
            .query_row(
                "SELECT account_id, account_type FROM account WHERE account_id = ?1",
                params![account_id.to_string()],
                map_account_row,
            )
            .optional()?;
        Ok(account)
    }

    /// 账户余额
    pub fn get_account_balance(&self, account_id: &Uuid) -> RepositoryResult<Decimal> {
        let conn = self.get_conn()?;
        account_balance(&conn, account_id)
    }

    /// 批量余额查询；未出现在任何交易中的账户余额为 0
    pub fn balances_of(&self, accounts: &[Uuid]) -> RepositoryResult<HashMap<Uuid, Decimal>> {
        if accounts.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.get_conn()?;
        balances_with(&conn, accounts)
    }

    /// 查询账户持有者（成员 / 企业 / 社会核算）
    pub fn get_account_owner(&self, account_id: &Uuid) -> RepositoryResult<Option<AccountOwner>> {
        let conn = self.get_conn()?;
        let id = account_id.to_string();

        let member = conn
            .query_row(
                "SELECT member_id, name, email, account_id, registered_on, confirmed_on
                 FROM member WHERE account_id = ?1",
                params![id],
                map_member_row,
            )
            .optional()?;
        if let Some(member) = member {
            return Ok(Some(AccountOwner::Member(member)));
        }

        let company = conn
            .query_row(
                "SELECT company_id, name, email, means_account, raw_material_account,
                        work_account, product_account, registered_on, confirmed_on
                 FROM company
                 WHERE means_account = ?1 OR raw_material_account = ?1
                    OR work_account = ?1 OR product_account = ?1",
                params![id],
                map_company_row,
            )
            .optional()?;
        if let Some(company) = company {
            return Ok(Some(AccountOwner::Company(company)));
        }

        let social = conn
            .query_row(
                "SELECT social_accounting_id, account_id FROM social_accounting WHERE account_id = ?1",
                params![id],
                |row| {
                    Ok(SocialAccounting {
                        id: get_uuid(row, 0)?,
                        account: get_uuid(row, 1)?,
                    })
                },
            )
            .optional()?;
        Ok(social.map(AccountOwner::SocialAccounting))
    }
}

/// 在给定连接（通常是事务）上查询单个账户余额
pub(crate) fn account_balance(conn: &Connection, account_id: &Uuid) -> RepositoryResult<Decimal> {
    let balances = balances_with(conn, &[*account_id])?;
    Ok(balances.get(account_id).copied().unwrap_or(Decimal::ZERO))
}

fn balances_with(conn: &Connection, accounts: &[Uuid]) -> RepositoryResult<HashMap<Uuid, Decimal>> {
    let mut balances: HashMap<Uuid, Decimal> =
        accounts.iter().map(|a| (*a, Decimal::ZERO)).collect();
    let ids: Vec<String> = accounts.iter().map(|a| a.to_string()).collect();

    // 收入
    let sql = format!(
        "SELECT receiving_account, amount_received FROM ledger_transaction \
         WHERE {} AND sending_account <> receiving_account",
        build_in_clause("receiving_account", ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
        Ok((get_uuid(row, 0)?, get_decimal(row, 1)?))
    })?;
    for row in rows {
        let (account, amount) = row?;
        *balances.entry(account).or_insert(Decimal::ZERO) += amount;
    }

    // 支出
    let sql = format!(
        "SELECT sending_account, amount_sent FROM ledger_transaction \
         WHERE {} AND sending_account <> receiving_account",
        build_in_clause("sending_account", ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
        Ok((get_uuid(row, 0)?, get_decimal(row, 1)?))
    })?;
    for row in rows {
        let (account, amount) = row?;
        *balances.entry(account).or_insert(Decimal::ZERO) -= amount;
    }

    Ok(balances)
}

pub(crate) fn insert_account(conn: &Connection, account: &Account) -> RepositoryResult<()> {
    conn.execute(
        "INSERT INTO account (account_id, account_type) VALUES (?1, ?2)",
        params![account.id.to_string(), account.account_type.to_db_str()],
    )?;
    Ok(())
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let raw_type: String = row.get(1)?;
    let account_type = AccountType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("未知账户类型: {}", raw_type).into(),
        )
    })?;
    Ok(Account {
        id: get_uuid(row, 0)?,
        account_type,
    })
}
