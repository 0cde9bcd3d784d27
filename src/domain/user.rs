// ==========================================
// 劳动时间经济核算系统 - 成员 / 企业 / 社会核算
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// SocialAccounting - 社会核算
// ==========================================
// 每个数据库仅一个实例；所有信用发放的发出方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialAccounting {
    pub id: Uuid,
    pub account: Uuid,
}

// ==========================================
// Member - 成员（劳动者/消费者）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub account: Uuid,
    pub registered_on: NaiveDateTime,
    pub confirmed_on: Option<NaiveDateTime>,
}

impl Member {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_on.is_some()
    }
}

// ==========================================
// Company - 企业
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub means_account: Uuid,        // p
    pub raw_material_account: Uuid, // r
    pub work_account: Uuid,         // a
    pub product_account: Uuid,      // prd
    pub registered_on: NaiveDateTime,
    pub confirmed_on: Option<NaiveDateTime>,
}

impl Company {
    /// 企业账户，顺序固定: p, r, a, prd
    pub fn accounts(&self) -> [Uuid; 4] {
        [
            self.means_account,
            self.raw_material_account,
            self.work_account,
            self.product_account,
        ]
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_on.is_some()
    }
}

// ==========================================
// AccountOwner - 账户持有者
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountOwner {
    Member(Member),
    Company(Company),
    SocialAccounting(SocialAccounting),
}

impl AccountOwner {
    pub fn id(&self) -> Uuid {
        match self {
            AccountOwner::Member(m) => m.id,
            AccountOwner::Company(c) => c.id,
            AccountOwner::SocialAccounting(s) => s.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AccountOwner::Member(m) => &m.name,
            AccountOwner::Company(c) => &c.name,
            AccountOwner::SocialAccounting(_) => "Social Accounting",
        }
    }
}

// ==========================================
// CompanyWorkInvite - 入职邀请
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyWorkInvite {
    pub id: Uuid,
    pub company: Uuid,
    pub member: Uuid,
}
