// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证共享连接下多线程支付与结算的一致性
// ==========================================

mod helpers;

use rust_decimal::Decimal;
use std::thread;

use helpers::plan_builder::PlanBuilder;
use helpers::test_env::*;
use labour_ledger::domain::types::PurposeOfPurchase;
use labour_ledger::use_cases::{
    PayConsumerProduct, PayMeansOfProduction, PaymentError, QueryPurchases,
};

const THREADS: usize = 4;
const PURCHASES_PER_THREAD: usize = 5;

#[test]
fn test_并发消费品支付() {
    let env = TestEnv::new();
    let seller = env.register_company("Bäckerei");
    // 个体价 1
    let plan = PlanBuilder::new(seller.id).costs(50, 25, 25).amount(100).build(&env);
    let members: Vec<_> = (0..THREADS)
        .map(|_| env.member_with_balance(&seller, Decimal::from(10)))
        .collect();
    let product_before = env.balance(&seller.product_account);

    let handles: Vec<_> = members
        .iter()
        .map(|member| {
            let uc = PayConsumerProduct::new(env.repos(), env.state.config.clone(), env.datetime());
            let member_id = member.id;
            let plan_id = plan.id;
            thread::spawn(move || {
                for _ in 0..PURCHASES_PER_THREAD {
                    uc.execute(member_id, plan_id, 1).expect("支付失败");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("线程异常退出");
    }

    for member in &members {
        assert_eq!(env.balance(&member.account), Decimal::from(5));
        let purchases = QueryPurchases::new(env.repos()).execute(member.id).unwrap();
        assert_eq!(purchases.len(), PURCHASES_PER_THREAD);
    }
    let total = Decimal::from(THREADS * PURCHASES_PER_THREAD);
    assert_eq!(env.balance(&seller.product_account) - product_before, total);
}

#[test]
fn test_结算与采购并发() {
    let env = TestEnv::new();
    let seller = env.register_company("Werkzeugbau");
    let buyer = env.register_company("Bäckerei");
    let plan = PlanBuilder::new(seller.id).costs(4, 0, 0).amount(4).timeframe(2).build(&env);

    let payout = env.state.payout.clone();
    let payout_handle = thread::spawn(move || payout.run().expect("结算失败"));

    let uc = PayMeansOfProduction::new(env.repos(), env.datetime());
    let plan_id = plan.id;
    let buyer_id = buyer.id;
    let purchase_handle = thread::spawn(move || {
        for _ in 0..3 {
            uc.execute(buyer_id, plan_id, 1, PurposeOfPurchase::RawMaterials)
                .expect("采购失败");
        }
    });

    let report = payout_handle.join().expect("结算线程异常退出");
    purchase_handle.join().expect("采购线程异常退出");

    assert_eq!(report.payouts, 1);
    assert_eq!(env.balance(&seller.work_account), Decimal::from(2));
    assert_eq!(env.balance(&buyer.raw_material_account), Decimal::from(-3));

    // 再次结算不重复发放
    assert_eq!(env.run_payout().payouts, 0);
}

#[test]
fn test_同一成员并发支付不透支() {
    let env = TestEnv::new();
    let seller = env.register_company("Bäckerei");
    // 个体价 10，余额只够买一件
    let plan = PlanBuilder::new(seller.id).costs(50, 25, 25).amount(10).build(&env);
    let member = env.member_with_balance(&seller, Decimal::from(10));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let uc = PayConsumerProduct::new(env.repos(), env.state.config.clone(), env.datetime());
            let member_id = member.id;
            let plan_id = plan.id;
            thread::spawn(move || uc.execute(member_id, plan_id, 1))
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("线程异常退出"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(PaymentError::InsufficientBalance { .. })))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(rejected, THREADS - 1);
    assert_eq!(env.balance(&member.account), Decimal::ZERO);
    assert_eq!(QueryPurchases::new(env.repos()).execute(member.id).unwrap().len(), 1);
}

#[test]
fn test_并发结算不重复发放() {
    let env = TestEnv::new();
    let planner = env.register_company("Werkzeugbau");
    let plan = PlanBuilder::new(planner.id).costs(10, 0, 0).amount(1).timeframe(1).build(&env);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let payout = env.state.payout.clone();
            thread::spawn(move || payout.run().expect("结算失败"))
        })
        .collect();
    let total: usize = handles
        .into_iter()
        .map(|handle| handle.join().expect("线程异常退出").payouts)
        .sum();

    assert_eq!(total, 1);
    assert_eq!(env.plan(&plan.id).payout_count, 1);
    assert_eq!(env.balance(&planner.work_account), Decimal::from(10));
}
