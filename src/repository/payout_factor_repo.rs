// ==========================================
// 劳动时间经济核算系统 - 结算系数仓储
// ==========================================
// 每次结算写入一条；最新值按计算时间、插入顺序取
// ==========================================

use crate::domain::account::PayoutFactor;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, get_datetime, get_decimal};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct PayoutFactorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PayoutFactorRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn store_payout_factor(
        &self,
        calculation_date: NaiveDateTime,
        value: Decimal,
    ) -> RepositoryResult<PayoutFactor> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO payout_factor (calculation_date, value) VALUES (?1, ?2)",
            params![fmt_datetime(&calculation_date), value.to_string()],
        )?;
        Ok(PayoutFactor {
            calculation_date,
            value,
        })
    }

    pub fn get_latest_payout_factor(&self) -> RepositoryResult<Option<PayoutFactor>> {
        let conn = self.get_conn()?;
        let factor = conn
            .query_row(
                "SELECT calculation_date, value FROM payout_factor
                 ORDER BY calculation_date DESC, payout_factor_id DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok(PayoutFactor {
                        calculation_date: get_datetime(row, 0)?,
                        value: get_decimal(row, 1)?,
                    })
                },
            )
            .optional()?;
        Ok(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use chrono::NaiveDate;

    #[test]
    fn test_最新系数() {
        let conn = Arc::new(Mutex::new(open_in_memory().unwrap()));
        let repo = PayoutFactorRepository::new(conn);
        assert!(repo.get_latest_payout_factor().unwrap().is_none());

        let day = |d| {
            NaiveDate::from_ymd_opt(2021, 1, d)
                .unwrap()
                .and_hms_opt(2, 0, 0)
                .unwrap()
        };
        repo.store_payout_factor(day(2), Decimal::new(5, 1)).unwrap();
        repo.store_payout_factor(day(1), Decimal::ONE).unwrap();

        let latest = repo.get_latest_payout_factor().unwrap().unwrap();
        assert_eq!(latest.calculation_date, day(2));
        assert_eq!(latest.value, Decimal::new(5, 1));
    }
}
