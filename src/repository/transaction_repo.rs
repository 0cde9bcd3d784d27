// ==========================================
// 劳动时间经济核算系统 - 交易仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 排序: 日期降序，同一时间按插入顺序（rowid）降序
// ==========================================

use crate::domain::account::Transaction;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    build_in_clause, fmt_datetime, get_datetime, get_decimal, get_opt_uuid, get_uuid,
};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "SELECT transaction_id, date, sending_account, receiving_account, \
     amount_sent, amount_received, purpose, plan_id FROM ledger_transaction";

const ORDER_NEWEST_FIRST: &str = "date DESC, rowid DESC";

/// 新交易参数
#[derive(Debug, Clone)]
pub struct NewTransaction<'a> {
    pub date: NaiveDateTime,
    pub sending_account: Uuid,
    pub receiving_account: Uuid,
    pub amount_sent: Decimal,
    pub amount_received: Decimal,
    pub purpose: &'a str,
    pub plan_id: Option<Uuid>,
}

// ==========================================
// TransactionRepository - 交易仓储
// ==========================================
pub struct TransactionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TransactionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录交易
    pub fn create_transaction(&self, new: NewTransaction<'_>) -> RepositoryResult<Transaction> {
        let conn = self.get_conn()?;
        insert_transaction(&conn, new)
    }

    pub fn find_by_id(&self, transaction_id: &Uuid) -> RepositoryResult<Option<Transaction>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE transaction_id = ?1", SELECT_COLUMNS);
        let tx = conn
            .query_row(&sql, params![transaction_id.to_string()], map_transaction_row)
            .optional()?;
        Ok(tx)
    }

    /// 账户发出的交易
    pub fn find_sent_by(&self, account: &Uuid) -> RepositoryResult<Vec<Transaction>> {
        self.query(
            &format!("{} WHERE sending_account = ? ORDER BY {}", SELECT_COLUMNS, ORDER_NEWEST_FIRST),
            vec![account.to_string()],
        )
    }

    /// 账户收到的交易
    pub fn find_received_by(&self, account: &Uuid) -> RepositoryResult<Vec<Transaction>> {
        self.query(
            &format!("{} WHERE receiving_account = ? ORDER BY {}", SELECT_COLUMNS, ORDER_NEWEST_FIRST),
            vec![account.to_string()],
        )
    }

    /// 涉及任一账户（发出或收到）的交易
    pub fn find_involving(&self, accounts: &[Uuid]) -> RepositoryResult<Vec<Transaction>> {
        if accounts.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = accounts.iter().map(|a| a.to_string()).collect();
        let sql = format!(
            "{} WHERE {} OR {} ORDER BY {}",
            SELECT_COLUMNS,
            build_in_clause("sending_account", ids.len()),
            build_in_clause("receiving_account", ids.len()),
            ORDER_NEWEST_FIRST
        );
        let mut bound = ids.clone();
        bound.extend(ids);
        self.query(&sql, bound)
    }

    /// 社会核算发给某账户的交易
    pub fn find_sent_by_social_accounting_to(
        &self,
        social_accounting_account: &Uuid,
        receiver: &Uuid,
    ) -> RepositoryResult<Vec<Transaction>> {
        self.query(
            &format!(
                "{} WHERE sending_account = ? AND receiving_account = ? ORDER BY {}",
                SELECT_COLUMNS, ORDER_NEWEST_FIRST
            ),
            vec![social_accounting_account.to_string(), receiver.to_string()],
        )
    }

    /// 某计划的销售：计划方产品账户收到、且非社会核算发出的交易
    pub fn sales_of_plan(
        &self,
        plan_id: &Uuid,
        product_account: &Uuid,
        social_accounting_account: &Uuid,
    ) -> RepositoryResult<Vec<Transaction>> {
        self.query(
            &format!(
                "{} WHERE plan_id = ? AND receiving_account = ? AND sending_account <> ? ORDER BY {}",
                SELECT_COLUMNS, ORDER_NEWEST_FIRST
            ),
            vec![
                plan_id.to_string(),
                product_account.to_string(),
                social_accounting_account.to_string(),
            ],
        )
    }

    fn query(&self, sql: &str, bound: Vec<String>) -> RepositoryResult<Vec<Transaction>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(bound.iter()), map_transaction_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// 在给定连接（通常是事务）上记录交易
pub(crate) fn insert_transaction(
    conn: &Connection,
    new: NewTransaction<'_>,
) -> RepositoryResult<Transaction> {
    let tx = Transaction {
        id: Uuid::new_v4(),
        date: new.date,
        sending_account: new.sending_account,
        receiving_account: new.receiving_account,
        amount_sent: new.amount_sent,
        amount_received: new.amount_received,
        purpose: new.purpose.to_string(),
        plan_id: new.plan_id,
    };
    conn.execute(
        r#"INSERT INTO ledger_transaction (
            transaction_id, date, sending_account, receiving_account,
            amount_sent, amount_received, purpose, plan_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        params![
            tx.id.to_string(),
            fmt_datetime(&tx.date),
            tx.sending_account.to_string(),
            tx.receiving_account.to_string(),
            tx.amount_sent.to_string(),
            tx.amount_received.to_string(),
            tx.purpose,
            tx.plan_id.map(|p| p.to_string()),
        ],
    )?;
    Ok(tx)
}

fn map_transaction_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: get_uuid(row, 0)?,
        date: get_datetime(row, 1)?,
        sending_account: get_uuid(row, 2)?,
        receiving_account: get_uuid(row, 3)?,
        amount_sent: get_decimal(row, 4)?,
        amount_received: get_decimal(row, 5)?,
        purpose: row.get(6)?,
        plan_id: get_opt_uuid(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::types::AccountType;
    use crate::repository::account_repo::AccountRepository;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn setup() -> (AccountRepository, TransactionRepository) {
        let conn = Arc::new(Mutex::new(open_in_memory().unwrap()));
        (
            AccountRepository::new(conn.clone()),
            TransactionRepository::new(conn),
        )
    }

    fn new_tx<'a>(date: NaiveDateTime, from: Uuid, to: Uuid, amount: i64) -> NewTransaction<'a> {
        NewTransaction {
            date,
            sending_account: from,
            receiving_account: to,
            amount_sent: Decimal::from(amount),
            amount_received: Decimal::from(amount),
            purpose: "test",
            plan_id: None,
        }
    }

    #[test]
    fn test_创建并按id读回() {
        let (accounts, txs) = setup();
        let a = accounts.create_account(AccountType::Labour).unwrap();
        let b = accounts.create_account(AccountType::Member).unwrap();
        let created = txs.create_transaction(new_tx(at(1), a.id, b.id, 8)).unwrap();
        let found = txs.find_by_id(&created.id).unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_涉及账户_新到旧_同时间按插入顺序() {
        let (accounts, txs) = setup();
        let a = accounts.create_account(AccountType::Labour).unwrap();
        let b = accounts.create_account(AccountType::Member).unwrap();
        let c = accounts.create_account(AccountType::Member).unwrap();

        let first = txs.create_transaction(new_tx(at(1), a.id, b.id, 1)).unwrap();
        let second = txs.create_transaction(new_tx(at(1), a.id, c.id, 2)).unwrap();
        let third = txs.create_transaction(new_tx(at(2), c.id, b.id, 3)).unwrap();

        let ids: Vec<Uuid> = txs.find_involving(&[b.id]).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![third.id, first.id]);

        let ids: Vec<Uuid> = txs.find_sent_by(&a.id).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        assert_eq!(txs.find_received_by(&c.id).unwrap().len(), 1);
        assert!(txs.find_involving(&[]).unwrap().is_empty());
    }
}
