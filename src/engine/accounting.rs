// ==========================================
// 劳动时间经济核算系统 - 用户账目服务
// ==========================================
// 职责: 从查看者视角对交易分类、计算变动额、生成对账单
// 变动额: 查看者为发出方时 −amount_sent，否则 +amount_received
// ==========================================

use crate::domain::account::Transaction;
use crate::domain::types::{AccountType, TransactionType};
use crate::domain::user::AccountOwner;
use crate::engine::error::EngineResult;
use crate::repository::{AccountRepository, TransactionRepository};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 对账单中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRow {
    pub transaction: Transaction,
    pub transaction_type: TransactionType,
    pub volume: Decimal,
    /// 查看者参与此交易的账户类型
    pub account_type: AccountType,
}

pub struct UserAccountingService {
    account_repo: Arc<AccountRepository>,
    transaction_repo: Arc<TransactionRepository>,
}

impl UserAccountingService {
    pub fn new(account_repo: Arc<AccountRepository>, transaction_repo: Arc<TransactionRepository>) -> Self {
        Self {
            account_repo,
            transaction_repo,
        }
    }

    pub fn user_is_sender(transaction: &Transaction, user_accounts: &[Uuid]) -> bool {
        user_accounts.contains(&transaction.sending_account)
    }

    pub fn get_transaction_volume(transaction: &Transaction, user_is_sender: bool) -> Decimal {
        if user_is_sender {
            -transaction.amount_sent
        } else {
            transaction.amount_received
        }
    }

    /// 按发出/接收账户类型分类；无法归类时返回 None
    pub fn classify(
        sender_type: AccountType,
        receiver_type: AccountType,
        user_is_sender: bool,
    ) -> Option<TransactionType> {
        if sender_type == AccountType::Accounting {
            return match receiver_type {
                AccountType::Labour => Some(TransactionType::CreditForWages),
                AccountType::Means => Some(TransactionType::CreditForFixedMeans),
                AccountType::RawMaterial => Some(TransactionType::CreditForLiquidMeans),
                AccountType::Product => Some(TransactionType::ExpectedSales),
                _ => None,
            };
        }

        if user_is_sender {
            match sender_type {
                AccountType::Labour => Some(TransactionType::PaymentOfWages),
                AccountType::Means => Some(TransactionType::PaymentOfFixedMeans),
                AccountType::RawMaterial => Some(TransactionType::PaymentOfLiquidMeans),
                AccountType::Member => Some(TransactionType::PaymentOfConsumerProduct),
                _ => None,
            }
        } else {
            match (receiver_type, sender_type) {
                (AccountType::Product, AccountType::Member) => Some(TransactionType::SaleOfConsumerProduct),
                (AccountType::Product, AccountType::Means) => Some(TransactionType::SaleOfFixedMeans),
                (AccountType::Product, AccountType::RawMaterial) => Some(TransactionType::SaleOfLiquidMeans),
                (AccountType::Member, AccountType::Labour) => Some(TransactionType::IncomingWages),
                _ => None,
            }
        }
    }

    /// 对账单：涉及任一用户账户的交易，新到旧
    pub fn get_statement_of_account(&self, user_accounts: &[Uuid]) -> EngineResult<Vec<StatementRow>> {
        let transactions = self.transaction_repo.find_involving(user_accounts)?;
        let mut cache: HashMap<Uuid, Option<AccountType>> = HashMap::new();
        let mut rows = Vec::with_capacity(transactions.len());

        for transaction in transactions {
            let is_sender = Self::user_is_sender(&transaction, user_accounts);
            let sender = self.account_type(&transaction.sending_account, &mut cache)?;
            let receiver = self.account_type(&transaction.receiving_account, &mut cache)?;
            let (sender, receiver) = match (sender, receiver) {
                (Some(s), Some(r)) => (s, r),
                _ => continue,
            };
            let transaction_type = match Self::classify(sender, receiver, is_sender) {
                Some(t) => t,
                None => {
                    tracing::debug!(transaction_id = %transaction.id, "交易无法归类，不计入对账单");
                    continue;
                }
            };
            rows.push(StatementRow {
                volume: Self::get_transaction_volume(&transaction, is_sender),
                account_type: if is_sender { sender } else { receiver },
                transaction_type,
                transaction,
            });
        }
        Ok(rows)
    }

    /// 销售交易的付款方
    pub fn get_buyer(
        &self,
        transaction_type: TransactionType,
        transaction: &Transaction,
    ) -> EngineResult<Option<AccountOwner>> {
        if !transaction_type.is_sale() {
            return Ok(None);
        }
        Ok(self.account_repo.get_account_owner(&transaction.sending_account)?)
    }

    fn account_type(
        &self,
        account: &Uuid,
        cache: &mut HashMap<Uuid, Option<AccountType>>,
    ) -> EngineResult<Option<AccountType>> {
        if let Some(cached) = cache.get(account) {
            return Ok(*cached);
        }
        let found = self.account_repo.find_by_id(account)?.map(|a| a.account_type);
        cache.insert(*account, found);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AccountType::*;

    #[test]
    fn test_社会核算发出的分类() {
        assert_eq!(
            UserAccountingService::classify(Accounting, Labour, false),
            Some(TransactionType::CreditForWages)
        );
        assert_eq!(
            UserAccountingService::classify(Accounting, Product, false),
            Some(TransactionType::ExpectedSales)
        );
        assert_eq!(
            UserAccountingService::classify(Accounting, Means, false),
            Some(TransactionType::CreditForFixedMeans)
        );
    }

    #[test]
    fn test_发出方分类() {
        assert_eq!(
            UserAccountingService::classify(Labour, Member, true),
            Some(TransactionType::PaymentOfWages)
        );
        assert_eq!(
            UserAccountingService::classify(Member, Product, true),
            Some(TransactionType::PaymentOfConsumerProduct)
        );
        assert_eq!(
            UserAccountingService::classify(RawMaterial, Product, true),
            Some(TransactionType::PaymentOfLiquidMeans)
        );
    }

    #[test]
    fn test_接收方分类() {
        assert_eq!(
            UserAccountingService::classify(Member, Product, false),
            Some(TransactionType::SaleOfConsumerProduct)
        );
        assert_eq!(
            UserAccountingService::classify(Means, Product, false),
            Some(TransactionType::SaleOfFixedMeans)
        );
        assert_eq!(
            UserAccountingService::classify(Labour, Member, false),
            Some(TransactionType::IncomingWages)
        );
        assert_eq!(UserAccountingService::classify(Member, Member, false), None);
    }

    #[test]
    fn test_变动额符号() {
        let tx = Transaction {
            id: Uuid::new_v4(),
            date: chrono::NaiveDate::from_ymd_opt(2021, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            sending_account: Uuid::new_v4(),
            receiving_account: Uuid::new_v4(),
            amount_sent: Decimal::from(3),
            amount_received: Decimal::from(2),
            purpose: "x".to_string(),
            plan_id: None,
        };
        assert_eq!(UserAccountingService::get_transaction_volume(&tx, true), Decimal::from(-3));
        assert_eq!(UserAccountingService::get_transaction_volume(&tx, false), Decimal::from(2));
        assert!(UserAccountingService::user_is_sender(&tx, &[tx.sending_account]));
    }
}
