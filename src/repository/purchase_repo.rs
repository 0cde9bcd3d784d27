// ==========================================
// 劳动时间经济核算系统 - 购买记录仓储
// ==========================================

use crate::domain::purchase::Purchase;
use crate::domain::types::PurposeOfPurchase;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, get_datetime, get_decimal, get_uuid};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub struct PurchaseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PurchaseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 某买方（成员或企业）的购买记录，新到旧
    pub fn find_by_buyer(&self, buyer: &Uuid) -> RepositoryResult<Vec<Purchase>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT purchase_id, purchase_date, plan_id, buyer, is_buyer_a_member,
                      price_per_unit, amount, purpose
               FROM purchase
               WHERE buyer = ?1
               ORDER BY purchase_date DESC, rowid DESC"#,
        )?;
        let purchases = stmt
            .query_map(params![buyer.to_string()], map_purchase_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(purchases)
    }
}

pub(crate) fn insert_purchase(conn: &Connection, purchase: &Purchase) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO purchase (
            purchase_id, purchase_date, plan_id, buyer, is_buyer_a_member,
            price_per_unit, amount, purpose
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        params![
            purchase.id.to_string(),
            fmt_datetime(&purchase.purchase_date),
            purchase.plan.to_string(),
            purchase.buyer.to_string(),
            purchase.is_buyer_a_member,
            purchase.price_per_unit.to_string(),
            purchase.amount,
            purchase.purpose.to_db_str(),
        ],
    )?;
    Ok(())
}

fn map_purchase_row(row: &Row<'_>) -> rusqlite::Result<Purchase> {
    let raw_purpose: String = row.get(7)?;
    let purpose = PurposeOfPurchase::parse(&raw_purpose).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("未知购买用途: {}", raw_purpose).into(),
        )
    })?;
    Ok(Purchase {
        id: get_uuid(row, 0)?,
        purchase_date: get_datetime(row, 1)?,
        plan: get_uuid(row, 2)?,
        buyer: get_uuid(row, 3)?,
        is_buyer_a_member: row.get(4)?,
        price_per_unit: get_decimal(row, 5)?,
        amount: row.get(6)?,
        purpose,
    })
}
