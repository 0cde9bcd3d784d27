// ==========================================
// 注册与雇佣集成测试
// ==========================================
// 测试范围:
// 1. 成员/企业注册、邮箱唯一、确认
// 2. 入职邀请与答复
// 3. 工时登记
// ==========================================

mod helpers;

use chrono::Duration;
use rust_decimal::Decimal;
use uuid::Uuid;

use helpers::test_env::*;
use labour_ledger::domain::types::AccountType;
use labour_ledger::use_cases::workers::{
    AnswerInviteError, InviteWorkerError, RegisterHoursWorkedError,
};
use labour_ledger::use_cases::{
    AnswerCompanyWorkInvite, ConfirmCompany, ConfirmMember, InviteWorkerToCompany, ListWorkers,
    RegisterCompany, RegisterHoursWorked, RegisterMember, RegistrationError, ShowWorkInvites,
};

#[test]
fn test_注册企业创建四个账户() {
    let env = TestEnv::new();
    let id = RegisterCompany::new(env.repos(), env.datetime())
        .execute("Bäckerei", "info@baeckerei.example")
        .unwrap();
    let company = env.company(&id);
    assert_eq!(company.registered_on, start_time());
    assert!(company.confirmed_on.is_none());

    let expected = [
        (company.means_account, AccountType::Means),
        (company.raw_material_account, AccountType::RawMaterial),
        (company.work_account, AccountType::Labour),
        (company.product_account, AccountType::Product),
    ];
    for (account, account_type) in expected {
        let stored = env
            .state
            .repos
            .account_repo
            .find_by_id(&account)
            .unwrap()
            .expect("账户不存在");
        assert_eq!(stored.account_type, account_type);
        assert_eq!(env.balance(&account), Decimal::ZERO);
    }
}

#[test]
fn test_邮箱不可重复注册() {
    let env = TestEnv::new();
    let members = RegisterMember::new(env.repos(), env.datetime());
    members.execute("Anna", "anna@example.org").unwrap();
    assert!(matches!(
        members.execute("Anna Zwei", "anna@example.org"),
        Err(RegistrationError::EmailAlreadyExists(email)) if email == "anna@example.org"
    ));

    let companies = RegisterCompany::new(env.repos(), env.datetime());
    companies.execute("Mühle", "kontakt@muehle.example").unwrap();
    assert!(matches!(
        companies.execute("Mühle 2", "kontakt@muehle.example"),
        Err(RegistrationError::EmailAlreadyExists(_))
    ));
}

#[test]
fn test_注册失败不留下账户() {
    let env = TestEnv::new();
    let accounts_before = env.count("SELECT COUNT(*) FROM account");
    env.execute_sql(
        "CREATE TRIGGER reject_company BEFORE INSERT ON company \
         BEGIN SELECT RAISE(ABORT, 'rejected'); END; \
         CREATE TRIGGER reject_member BEFORE INSERT ON member \
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    );

    assert!(RegisterCompany::new(env.repos(), env.datetime())
        .execute("Bäckerei", "info@baeckerei.example")
        .is_err());
    assert!(RegisterMember::new(env.repos(), env.datetime())
        .execute("Anna", "anna@example.org")
        .is_err());
    assert_eq!(env.count("SELECT COUNT(*) FROM account"), accounts_before);

    env.execute_sql("DROP TRIGGER reject_company; DROP TRIGGER reject_member;");
    RegisterCompany::new(env.repos(), env.datetime())
        .execute("Bäckerei", "info@baeckerei.example")
        .unwrap();
    assert_eq!(env.count("SELECT COUNT(*) FROM account"), accounts_before + 4);
}

#[test]
fn test_确认成员() {
    let env = TestEnv::new();
    let id = RegisterMember::new(env.repos(), env.datetime())
        .execute("Anna", "anna@example.org")
        .unwrap();
    let confirm = ConfirmMember::new(env.repos(), env.datetime());

    let unknown = confirm.execute("niemand@example.org").unwrap();
    assert!(!unknown.is_confirmed);
    assert_eq!(unknown.user_id, None);

    env.clock.advance_time(Duration::minutes(30));
    let response = confirm.execute("anna@example.org").unwrap();
    assert!(response.is_confirmed);
    assert_eq!(response.user_id, Some(id));
    assert_eq!(env.member(&id).confirmed_on, Some(env.now()));

    // 重复确认
    assert!(!confirm.execute("anna@example.org").unwrap().is_confirmed);
}

#[test]
fn test_确认企业() {
    let env = TestEnv::new();
    let id = RegisterCompany::new(env.repos(), env.datetime())
        .execute("Mühle", "kontakt@muehle.example")
        .unwrap();
    let confirm = ConfirmCompany::new(env.repos(), env.datetime());

    let response = confirm.execute("kontakt@muehle.example").unwrap();
    assert!(response.is_confirmed);
    assert_eq!(response.user_id, Some(id));
    assert!(env.company(&id).is_confirmed());
    assert!(!confirm.execute("kontakt@muehle.example").unwrap().is_confirmed);
}

// ==========================================
// 入职邀请
// ==========================================

#[test]
fn test_邀请并接受入职() {
    let env = TestEnv::new();
    let company = env.register_company("Bäckerei");
    let member = env.register_member("Anna");

    let invite = InviteWorkerToCompany::new(env.repos())
        .execute(company.id, member.id)
        .unwrap();
    let invites = ShowWorkInvites::new(env.repos()).execute(member.id).unwrap();
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].invite_id, invite);
    assert_eq!(invites[0].company_id, company.id);
    assert_eq!(invites[0].company_name, "Bäckerei");

    let response = AnswerCompanyWorkInvite::new(env.repos())
        .execute(member.id, invite, true)
        .unwrap();
    assert!(response.is_accepted);
    assert_eq!(response.company_name, "Bäckerei");

    assert!(ShowWorkInvites::new(env.repos()).execute(member.id).unwrap().is_empty());
    let workers = ListWorkers::new(env.repos()).execute(company.id).unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].id, member.id);
    assert_eq!(workers[0].name, "Anna");
}

#[test]
fn test_拒绝入职邀请() {
    let env = TestEnv::new();
    let company = env.register_company("Bäckerei");
    let member = env.register_member("Anna");
    let invite = InviteWorkerToCompany::new(env.repos())
        .execute(company.id, member.id)
        .unwrap();

    let response = AnswerCompanyWorkInvite::new(env.repos())
        .execute(member.id, invite, false)
        .unwrap();
    assert!(!response.is_accepted);
    assert!(ListWorkers::new(env.repos()).execute(company.id).unwrap().is_empty());
    // 邀请已删除
    assert!(matches!(
        AnswerCompanyWorkInvite::new(env.repos()).execute(member.id, invite, true),
        Err(AnswerInviteError::InviteNotFound(_))
    ));
}

#[test]
fn test_邀请拒绝原因() {
    let env = TestEnv::new();
    let company = env.register_company("Bäckerei");
    let member = env.register_member("Anna");
    let other = env.register_member("Bernd");
    let uc = InviteWorkerToCompany::new(env.repos());

    assert!(matches!(
        uc.execute(Uuid::new_v4(), member.id),
        Err(InviteWorkerError::CompanyNotFound(_))
    ));
    assert!(matches!(
        uc.execute(company.id, Uuid::new_v4()),
        Err(InviteWorkerError::MemberNotFound(_))
    ));

    let invite = uc.execute(company.id, member.id).unwrap();
    assert!(matches!(
        uc.execute(company.id, member.id),
        Err(InviteWorkerError::AlreadyInvited)
    ));
    assert!(matches!(
        AnswerCompanyWorkInvite::new(env.repos()).execute(other.id, invite, true),
        Err(AnswerInviteError::InviteForOtherMember)
    ));

    AnswerCompanyWorkInvite::new(env.repos())
        .execute(member.id, invite, true)
        .unwrap();
    assert!(matches!(
        uc.execute(company.id, member.id),
        Err(InviteWorkerError::AlreadyWorksForCompany)
    ));
}

// ==========================================
// 工时登记
// ==========================================

#[test]
fn test_登记工时() {
    let env = TestEnv::new();
    let company = env.register_company("Bäckerei");
    let member = env.register_member("Anna");
    env.hire(&company, &member);

    let tx_id = RegisterHoursWorked::new(env.repos(), env.datetime())
        .execute(company.id, member.id, dec("7.5"))
        .unwrap();

    assert_eq!(env.balance(&member.account), dec("7.5"));
    assert_eq!(env.balance(&company.work_account), dec("-7.5"));

    let tx = env
        .state
        .repos
        .transaction_repo
        .find_by_id(&tx_id)
        .unwrap()
        .expect("交易不存在");
    assert_eq!(tx.amount_sent, tx.amount_received);
    assert_eq!(tx.plan_id, None);
}

#[test]
fn test_登记工时拒绝原因() {
    let env = TestEnv::new();
    let company = env.register_company("Bäckerei");
    let member = env.register_member("Anna");
    let uc = RegisterHoursWorked::new(env.repos(), env.datetime());

    assert!(matches!(
        uc.execute(company.id, member.id, Decimal::ZERO),
        Err(RegisterHoursWorkedError::NonPositiveHours(_))
    ));
    assert!(matches!(
        uc.execute(Uuid::new_v4(), member.id, Decimal::ONE),
        Err(RegisterHoursWorkedError::CompanyNotFound(_))
    ));
    assert!(matches!(
        uc.execute(company.id, member.id, Decimal::ONE),
        Err(RegisterHoursWorkedError::WorkerNotAtCompany(id)) if id == member.id
    ));
    assert_eq!(env.balance(&member.account), Decimal::ZERO);
}
