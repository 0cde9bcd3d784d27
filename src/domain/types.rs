// ==========================================
// 劳动时间经济核算系统 - 领域类型定义
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 账户类型 (Account Type)
// ==========================================
// 企业四个账户 + 成员账户 + 社会核算账户
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Means,       // p: 固定生产资料
    RawMaterial, // r: 流动生产资料
    Labour,      // a: 劳动
    Product,     // prd: 产品
    Member,      // 成员消费账户
    Accounting,  // 社会核算
}

impl AccountType {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AccountType::Means => "p",
            AccountType::RawMaterial => "r",
            AccountType::Labour => "a",
            AccountType::Product => "prd",
            AccountType::Member => "member",
            AccountType::Accounting => "accounting",
        }
    }

    /// 从数据库字符串解析，未知值返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "p" => Some(AccountType::Means),
            "r" => Some(AccountType::RawMaterial),
            "a" => Some(AccountType::Labour),
            "prd" => Some(AccountType::Product),
            "member" => Some(AccountType::Member),
            "accounting" => Some(AccountType::Accounting),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 购买用途 (Purpose of Purchase)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurposeOfPurchase {
    MeansOfProduction, // 固定生产资料
    RawMaterials,      // 流动生产资料
    Consumption,       // 个人消费
}

impl PurposeOfPurchase {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PurposeOfPurchase::MeansOfProduction => "means_of_prod",
            PurposeOfPurchase::RawMaterials => "raw_materials",
            PurposeOfPurchase::Consumption => "consumption",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "means_of_prod" => Some(PurposeOfPurchase::MeansOfProduction),
            "raw_materials" => Some(PurposeOfPurchase::RawMaterials),
            "consumption" => Some(PurposeOfPurchase::Consumption),
            _ => None,
        }
    }

    /// 是否为生产性消费（企业采购）
    pub fn is_productive(&self) -> bool {
        !matches!(self, PurposeOfPurchase::Consumption)
    }
}

impl fmt::Display for PurposeOfPurchase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 交易类型 (Transaction Type)
// ==========================================
// 账户明细中每笔交易相对于查看者的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    CreditForWages,
    PaymentOfWages,
    IncomingWages,
    CreditForFixedMeans,
    PaymentOfFixedMeans,
    CreditForLiquidMeans,
    PaymentOfLiquidMeans,
    ExpectedSales,
    SaleOfConsumerProduct,
    PaymentOfConsumerProduct,
    SaleOfFixedMeans,
    SaleOfLiquidMeans,
}

impl TransactionType {
    /// 是否为销售（产品账户入账）
    pub fn is_sale(&self) -> bool {
        matches!(
            self,
            TransactionType::SaleOfConsumerProduct
                | TransactionType::SaleOfFixedMeans
                | TransactionType::SaleOfLiquidMeans
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::CreditForWages => "Credit for wages",
            TransactionType::PaymentOfWages => "Payment of wages",
            TransactionType::IncomingWages => "Incoming wages",
            TransactionType::CreditForFixedMeans => "Credit for fixed means of production",
            TransactionType::PaymentOfFixedMeans => "Payment of fixed means of production",
            TransactionType::CreditForLiquidMeans => "Credit for liquid means of production",
            TransactionType::PaymentOfLiquidMeans => "Payment of liquid means of production",
            TransactionType::ExpectedSales => "Debit expected sales",
            TransactionType::SaleOfConsumerProduct => "Sale of consumer product",
            TransactionType::PaymentOfConsumerProduct => "Payment of consumer product",
            TransactionType::SaleOfFixedMeans => "Sale of fixed means of production",
            TransactionType::SaleOfLiquidMeans => "Sale of liquid means of production",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// 相对偏差 (Deviation)
// ==========================================
// 余额相对预期的百分比；预期为 0 而余额非 0 时为无穷
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deviation {
    Finite(Decimal),
    Infinite,
}

impl Deviation {
    /// |balance / expectation| × 100
    pub fn relative(balance: Decimal, expectation: Decimal) -> Self {
        if expectation.is_zero() {
            if balance.is_zero() {
                Deviation::Finite(Decimal::ZERO)
            } else {
                Deviation::Infinite
            }
        } else {
            Deviation::Finite((balance / expectation).abs() * Decimal::ONE_HUNDRED)
        }
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deviation::Finite(v) => write!(f, "{}", v.round_dp(2)),
            Deviation::Infinite => write!(f, "inf"),
        }
    }
}
