// ==========================================
// 劳动时间经济核算系统 - 用例层
// ==========================================
// 职责: 面向用户的业务操作，每个用例一个结构体
// 约束: 拒绝原因用类型化错误表达，不返回字符串
// ==========================================

pub mod accounts;
pub mod cooperation;
pub mod drafts;
pub mod payments;
pub mod plans;
pub mod registration;
pub mod workers;

pub use accounts::{
    AccountDetails, AccountsError, CompanySummary, GetCompanySummary, GetCompanyTransactions,
    GetMemberAccountDetails, GetStatistics, ShowAccountDetails, ShowMyAccounts, StatisticsResponse,
};
pub use cooperation::{
    AcceptCooperation, AcceptCoordinationTransfer, CancelCooperationSolicitation,
    CooperationError, CreateCooperation, DenyCooperation, EndCooperation, GetCoopSummary,
    ListCooperationRequests, ListCoordinationsOfCompany, ListMyCooperatingPlans,
    RequestCooperation, RequestCoordinationTransfer,
};
pub use drafts::{
    CreateDraftRequest, CreatePlanDraft, DeletePlanDraft, DraftError, GetDraftDetails,
    ListDraftsOfCompany, UpdatePlanDraft,
};
pub use payments::{PayConsumerProduct, PayMeansOfProduction, PaymentError, QueryPurchases};
pub use plans::{
    ApprovePlan, GetPlanDetails, HidePlan, ListActivePlansOfCompany, ListExpiredPlansOfCompany,
    PlanError, PlanFilter, PlanSorting, QueryPlans, QueryPlansRequest, TogglePlanAvailability,
};
pub use registration::{
    ConfirmCompany, ConfirmMember, ConfirmationResponse, RegisterCompany, RegisterMember,
    RegistrationError,
};
pub use workers::{
    AnswerCompanyWorkInvite, InviteWorkerToCompany, ListWorkers, RegisterHoursWorked,
    ShowWorkInvites,
};
