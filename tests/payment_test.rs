// ==========================================
// 支付集成测试
// ==========================================
// 测试范围:
// 1. 生产资料购买: 账户流向、购买记录、拒绝顺序
// 2. 消费品购买: 余额校验与配置放开
// 3. 合作价: 发出额按合作价，收到额按个体价
// ==========================================

mod helpers;

use rust_decimal::Decimal;
use uuid::Uuid;

use helpers::plan_builder::PlanBuilder;
use helpers::test_env::*;
use labour_ledger::config::config_keys;
use labour_ledger::domain::types::PurposeOfPurchase;
use labour_ledger::use_cases::{
    AcceptCooperation, CreateCooperation, PayConsumerProduct, PayMeansOfProduction, PaymentError,
    QueryPurchases, RequestCooperation,
};

fn pay_means(env: &TestEnv) -> PayMeansOfProduction {
    PayMeansOfProduction::new(env.repos(), env.datetime())
}

fn pay_consumer(env: &TestEnv) -> PayConsumerProduct {
    PayConsumerProduct::new(env.repos(), env.state.config.clone(), env.datetime())
}

// ==========================================
// 生产资料
// ==========================================

#[test]
fn test_购买固定生产资料() {
    let env = TestEnv::new();
    let seller = env.register_company("Werkzeugbau");
    let buyer = env.register_company("Bäckerei");
    // 个体价 = 10 / 10 = 1
    let plan = PlanBuilder::new(seller.id).costs(6, 3, 1).amount(10).build(&env);

    pay_means(&env)
        .execute(buyer.id, plan.id, 5, PurposeOfPurchase::MeansOfProduction)
        .unwrap();

    assert_eq!(env.balance(&buyer.means_account), Decimal::from(-5));
    assert_eq!(env.balance(&buyer.raw_material_account), Decimal::ZERO);
    // 预期销售 −10，收入 +5
    assert_eq!(env.balance(&seller.product_account), Decimal::from(-5));

    let purchases = QueryPurchases::new(env.repos()).execute(buyer.id).unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].plan_id, plan.id);
    assert_eq!(purchases[0].purpose, PurposeOfPurchase::MeansOfProduction);
    assert_eq!(purchases[0].price_per_unit, Decimal::ONE);
    assert_eq!(purchases[0].amount, 5);
    assert_eq!(purchases[0].price_total, Decimal::from(5));
}

#[test]
fn test_购买流动生产资料() {
    let env = TestEnv::new();
    let seller = env.register_company("Mühle");
    let buyer = env.register_company("Bäckerei");
    let plan = PlanBuilder::new(seller.id).costs(2, 2, 0).amount(2).build(&env);

    pay_means(&env)
        .execute(buyer.id, plan.id, 3, PurposeOfPurchase::RawMaterials)
        .unwrap();

    assert_eq!(env.balance(&buyer.raw_material_account), Decimal::from(-6));
    assert_eq!(env.balance(&buyer.means_account), Decimal::ZERO);
}

#[test]
fn test_生产资料购买拒绝原因() {
    let env = TestEnv::new();
    let seller = env.register_company("Werkzeugbau");
    let buyer = env.register_company("Bäckerei");
    let member = env.register_member("Mitglied");
    let plan = PlanBuilder::new(seller.id).build(&env);
    let public_plan = PlanBuilder::new(seller.id).public_service().build(&env);
    let uc = pay_means(&env);

    assert!(matches!(
        uc.execute(buyer.id, Uuid::new_v4(), 1, PurposeOfPurchase::MeansOfProduction),
        Err(PaymentError::PlanNotFound(_))
    ));
    assert!(matches!(
        uc.execute(buyer.id, public_plan.id, 1, PurposeOfPurchase::MeansOfProduction),
        Err(PaymentError::PlanIsPublicService)
    ));
    assert!(matches!(
        uc.execute(seller.id, plan.id, 1, PurposeOfPurchase::MeansOfProduction),
        Err(PaymentError::BuyerIsPlanner)
    ));
    assert!(matches!(
        uc.execute(buyer.id, plan.id, 1, PurposeOfPurchase::Consumption),
        Err(PaymentError::InvalidPurpose(PurposeOfPurchase::Consumption))
    ));
    assert!(matches!(
        uc.execute(member.id, plan.id, 1, PurposeOfPurchase::MeansOfProduction),
        Err(PaymentError::BuyerIsNotCompany(_))
    ));
    assert!(matches!(
        uc.execute(buyer.id, plan.id, 0, PurposeOfPurchase::MeansOfProduction),
        Err(PaymentError::NonPositiveAmount(0))
    ));

    // 被拒绝的支付不留痕迹
    assert!(QueryPurchases::new(env.repos()).execute(buyer.id).unwrap().is_empty());
    assert_eq!(env.balance(&buyer.means_account), Decimal::ZERO);
}

#[test]
fn test_未激活计划不能购买() {
    let env = TestEnv::new();
    env.set_config(config_keys::ACTIVATE_ON_APPROVAL, "false");
    let seller = env.register_company("Werkzeugbau");
    let buyer = env.register_company("Bäckerei");
    let plan = PlanBuilder::new(seller.id).build(&env);

    assert!(matches!(
        pay_means(&env).execute(buyer.id, plan.id, 1, PurposeOfPurchase::RawMaterials),
        Err(PaymentError::PlanInactive(id)) if id == plan.id
    ));
}

// ==========================================
// 消费品
// ==========================================

#[test]
fn test_购买消费品() {
    let env = TestEnv::new();
    let seller = env.register_company("Bäckerei");
    let plan = PlanBuilder::new(seller.id).costs(5, 3, 2).amount(10).build(&env);
    let member = env.member_with_balance(&seller, Decimal::from(10));

    pay_consumer(&env).execute(member.id, plan.id, 3).unwrap();

    assert_eq!(env.balance(&member.account), Decimal::from(7));
    assert_eq!(env.balance(&seller.product_account), Decimal::from(-7));

    let purchases = QueryPurchases::new(env.repos()).execute(member.id).unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].purpose, PurposeOfPurchase::Consumption);
    assert_eq!(purchases[0].price_total, Decimal::from(3));
}

#[test]
fn test_记账失败时不留下购买记录() {
    let env = TestEnv::new();
    let seller = env.register_company("Werkzeugbau");
    let buyer = env.register_company("Bäckerei");
    let plan = PlanBuilder::new(seller.id).costs(5, 3, 2).amount(10).build(&env);
    let member = env.member_with_balance(&seller, Decimal::from(10));
    env.execute_sql(
        "CREATE TRIGGER reject_transaction BEFORE INSERT ON ledger_transaction \
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    );

    assert!(pay_means(&env)
        .execute(buyer.id, plan.id, 2, PurposeOfPurchase::MeansOfProduction)
        .is_err());
    assert!(pay_consumer(&env).execute(member.id, plan.id, 2).is_err());

    assert_eq!(env.count("SELECT COUNT(*) FROM purchase"), 0);
    assert_eq!(env.balance(&member.account), Decimal::from(10));
    assert_eq!(env.balance(&buyer.means_account), Decimal::ZERO);
}

#[test]
fn test_购买记录含多个计划() {
    let env = TestEnv::new();
    let seller = env.register_company("Bäckerei");
    let bread = PlanBuilder::new(seller.id)
        .product_name("Brot")
        .costs(5, 3, 2)
        .amount(10)
        .build(&env);
    let cake = PlanBuilder::new(seller.id)
        .product_name("Kuchen")
        .costs(5, 3, 2)
        .amount(10)
        .build(&env);
    let member = env.member_with_balance(&seller, Decimal::from(10));

    let uc = pay_consumer(&env);
    uc.execute(member.id, bread.id, 1).unwrap();
    uc.execute(member.id, cake.id, 2).unwrap();
    uc.execute(member.id, bread.id, 1).unwrap();

    let purchases = QueryPurchases::new(env.repos()).execute(member.id).unwrap();
    assert_eq!(purchases.len(), 3);
    let names: Vec<&str> = purchases.iter().map(|p| p.product_name.as_str()).collect();
    assert_eq!(names.iter().filter(|n| **n == "Brot").count(), 2);
    assert_eq!(names.iter().filter(|n| **n == "Kuchen").count(), 1);
    for purchase in &purchases {
        let expected = if purchase.plan_id == bread.id { "Brot" } else { "Kuchen" };
        assert_eq!(purchase.product_name, expected);
    }
}

#[test]
fn test_余额不足被拒绝() {
    let env = TestEnv::new();
    let seller = env.register_company("Bäckerei");
    let plan = PlanBuilder::new(seller.id).costs(5, 3, 2).amount(10).build(&env);
    let member = env.member_with_balance(&seller, Decimal::from(2));

    let result = pay_consumer(&env).execute(member.id, plan.id, 3);
    match result {
        Err(PaymentError::InsufficientBalance { balance, required }) => {
            assert_eq!(balance, Decimal::from(2));
            assert_eq!(required, Decimal::from(3));
        }
        other => panic!("应拒绝余额不足的支付: {:?}", other),
    }
    assert_eq!(env.balance(&member.account), Decimal::from(2));
}

#[test]
fn test_配置允许透支() {
    let env = TestEnv::new();
    env.set_config(config_keys::ALLOW_NEGATIVE_MEMBER_BALANCE, "true");
    let seller = env.register_company("Bäckerei");
    let plan = PlanBuilder::new(seller.id).costs(5, 3, 2).amount(10).build(&env);
    let member = env.register_member("Mitglied");

    pay_consumer(&env).execute(member.id, plan.id, 4).unwrap();
    assert_eq!(env.balance(&member.account), Decimal::from(-4));
}

#[test]
fn test_消费品购买拒绝原因() {
    let env = TestEnv::new();
    let seller = env.register_company("Bäckerei");
    let buyer_company = env.register_company("Kantine");
    let plan = PlanBuilder::new(seller.id).build(&env);
    let member = env.member_with_balance(&seller, Decimal::from(10));
    let uc = pay_consumer(&env);

    assert!(matches!(
        uc.execute(member.id, Uuid::new_v4(), 1),
        Err(PaymentError::PlanNotFound(_))
    ));
    assert!(matches!(
        uc.execute(buyer_company.id, plan.id, 1),
        Err(PaymentError::BuyerIsNotMember(_))
    ));
    assert!(matches!(
        uc.execute(member.id, plan.id, -1),
        Err(PaymentError::NonPositiveAmount(-1))
    ));
}

// ==========================================
// 合作价
// ==========================================

#[test]
fn test_合作计划按合作价发出按个体价收到() {
    let env = TestEnv::new();
    let coordinator = env.register_company("Koordination");
    let cheap = env.register_company("Bäckerei A");
    let expensive = env.register_company("Bäckerei B");
    // 个体价 1 与 3，合作价 2
    let cheap_plan = PlanBuilder::new(cheap.id).costs(1, 0, 0).amount(1).build(&env);
    let expensive_plan = PlanBuilder::new(expensive.id).costs(3, 0, 0).amount(1).build(&env);

    let coop = CreateCooperation::new(env.repos(), env.datetime())
        .execute(coordinator.id, "Brot", "Brot")
        .unwrap();
    for (planner, plan) in [(cheap.id, cheap_plan.id), (expensive.id, expensive_plan.id)] {
        RequestCooperation::new(env.repos()).execute(planner, plan, coop).unwrap();
        AcceptCooperation::new(env.repos())
            .execute(coordinator.id, plan, coop)
            .unwrap();
    }

    let member = env.member_with_balance(&coordinator, Decimal::from(10));
    let product_before = env.balance(&cheap.product_account);
    pay_consumer(&env).execute(member.id, cheap_plan.id, 1).unwrap();

    assert_eq!(env.balance(&member.account), Decimal::from(8));
    assert_eq!(env.balance(&cheap.product_account) - product_before, Decimal::ONE);

    let purchases = QueryPurchases::new(env.repos()).execute(member.id).unwrap();
    assert_eq!(purchases[0].price_per_unit, Decimal::from(2));
}
