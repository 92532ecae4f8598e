mod common;

use affiliate_core::reward::{chain_from_upline, compute_rewards, round_half_up_yen};
use chrono::Utc;
use common::{fund_table, investment};

#[test]
fn two_tier_example_from_the_rate_card() {
    // {tier1: 5, tier2: 3}, max_tier 2, 100,000 invested,
    // chain [parentX, grandparentY] -> 5000 and 3000.
    let table = fund_table(7, &[(1, 5.0), (2, 3.0)], 2);
    let inv = investment("inv-1", "investor", 100_000.0, 7);
    let chain = vec!["parentX".to_string(), "grandparentY".to_string()];

    let rewards = compute_rewards(&inv, &chain, &table, Utc::now());

    assert_eq!(rewards.len(), 2);
    assert_eq!(rewards[0].user_id, "parentX");
    assert_eq!(rewards[0].tier_level, 1);
    assert_eq!(rewards[0].reward_amount, 5000.0);
    assert_eq!(rewards[1].user_id, "grandparentY");
    assert_eq!(rewards[1].tier_level, 2);
    assert_eq!(rewards[1].reward_amount, 3000.0);
    assert!(rewards.iter().all(|r| !r.is_paid));
    assert!(rewards.iter().all(|r| r.referral_user_id == "investor"));
    assert!(rewards.iter().all(|r| r.investment_id == "inv-1"));
}

#[test]
fn chain_shorter_than_max_tier_yields_fewer_rows() {
    let table = fund_table(7, &[(1, 5.0), (2, 3.0), (3, 1.0)], 3);
    let inv = investment("inv-2", "investor", 50_000.0, 7);
    let chain = vec!["onlyParent".to_string()];

    let rewards = compute_rewards(&inv, &chain, &table, Utc::now());
    assert_eq!(rewards.len(), 1, "no reward fabricated beyond the chain");
    assert_eq!(rewards[0].tier_level, 1);
}

#[test]
fn root_investor_produces_no_rewards() {
    let table = fund_table(7, &[(1, 5.0)], 1);
    let inv = investment("inv-3", "rootUser", 1_000_000.0, 7);
    let rewards = compute_rewards(&inv, &[], &table, Utc::now());
    assert!(rewards.is_empty());
}

#[test]
fn max_tier_caps_a_longer_chain() {
    let table = fund_table(7, &[(1, 5.0), (2, 3.0)], 2);
    let inv = investment("inv-4", "investor", 10_000.0, 7);
    let chain: Vec<String> = (0..5).map(|i| format!("anc{i}")).collect();

    let rewards = compute_rewards(&inv, &chain, &table, Utc::now());
    assert_eq!(rewards.len(), 2);
}

#[test]
fn tier_without_a_rate_emits_no_row() {
    // Rate card skips tier 2 but pays tier 3.
    let table = fund_table(7, &[(1, 5.0), (3, 1.0)], 3);
    let inv = investment("inv-5", "investor", 100_000.0, 7);
    let chain = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];

    let rewards = compute_rewards(&inv, &chain, &table, Utc::now());
    let tiers: Vec<u32> = rewards.iter().map(|r| r.tier_level).collect();
    assert_eq!(tiers, vec![1, 3]);
}

#[test]
fn amounts_round_half_up_to_whole_yen() {
    assert_eq!(round_half_up_yen(4999.5), 5000.0);
    assert_eq!(round_half_up_yen(4999.4), 4999.0);
    assert_eq!(round_half_up_yen(0.5), 1.0);
    assert_eq!(round_half_up_yen(0.0), 0.0);

    // 33,333 * 3% = 999.99 -> 1000; 16,683 * 3% = 500.49 -> 500.
    let table = fund_table(7, &[(1, 3.0)], 1);
    let chain = vec!["p".to_string()];
    let inv = investment("inv-6", "investor", 33_333.0, 7);
    assert_eq!(
        compute_rewards(&inv, &chain, &table, Utc::now())[0].reward_amount,
        1000.0
    );
    let inv = investment("inv-7", "investor", 16_683.0, 7);
    assert_eq!(
        compute_rewards(&inv, &chain, &table, Utc::now())[0].reward_amount,
        500.0
    );
}

#[test]
fn recomputation_yields_identical_tier_amount_pairs() {
    let table = fund_table(7, &[(1, 5.0), (2, 3.0)], 2);
    let inv = investment("inv-8", "investor", 123_456.0, 7);
    let chain = vec!["p1".to_string(), "p2".to_string()];

    let first: Vec<(u32, f64)> = compute_rewards(&inv, &chain, &table, Utc::now())
        .iter()
        .map(|r| (r.tier_level, r.reward_amount))
        .collect();
    let second: Vec<(u32, f64)> = compute_rewards(&inv, &chain, &table, Utc::now())
        .iter()
        .map(|r| (r.tier_level, r.reward_amount))
        .collect();
    assert_eq!(first, second);
}

#[test]
fn chain_from_full_path_upline_is_parent_first() {
    assert_eq!(
        chain_from_upline("D", Some("A-B-C-D")),
        vec!["C".to_string(), "B".to_string(), "A".to_string()]
    );
    assert!(chain_from_upline("D", None).is_empty());
}
