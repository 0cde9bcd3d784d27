// ==========================================
// 劳动时间经济核算系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 以劳动时间计价的计划、账户与结算核算
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 核算规则
pub mod engine;

// 用例层 - 业务操作
pub mod use_cases;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AccountType, Deviation, PurposeOfPurchase, TransactionType};

// 领域实体
pub use domain::{
    Account, Company, Cooperation, Member, Plan, PlanDraft, ProductionCosts, Purchase,
    Transaction,
};

// 引擎
pub use engine::{
    DatetimeService, FakeDatetimeService, LedgerRepositories, PriceCalculator,
    SystemDatetimeService, UpdatePlansAndPayout, UserAccountingService,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "劳动时间经济核算系统";
