//! Built-in starter catalog, written to an empty store so a fresh deployment can recommend.

use crate::domain::product::{AccountKind, AccountProduct, CardProduct, CatalogSnapshot};
use std::collections::BTreeSet;

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn accounts() -> Vec<AccountProduct> {
    vec![
        AccountProduct {
            id: "acc_kb_salary".to_string(),
            provider: "KB국민은행".to_string(),
            name: "급여우대 플러스 통장".to_string(),
            kind: AccountKind::Checking,
            summary: "급여이체 + 생활비 자동이체 조건에서 수수료/우대 혜택 (기본 0.1% 최고 2.0%)"
                .to_string(),
            official_url: "https://obank.kbstar.com".to_string(),
            tags: set(&["salary", "daily", "cashback"]),
            categories: BTreeSet::new(),
            base_rate_percent: Some(0.1),
            max_rate_percent: Some(2.0),
            monthly_fee_waiver_won: 3_000,
        },
        AccountProduct {
            id: "acc_sh_save".to_string(),
            provider: "신한은행".to_string(),
            name: "목표저축 챌린지 적금".to_string(),
            kind: AccountKind::Savings,
            summary: "저축 목표 달성형 우대금리 제공 (기본 2.5% 최고 4.0%)".to_string(),
            official_url: "https://www.shinhan.com".to_string(),
            tags: set(&["savings", "goal", "auto"]),
            categories: BTreeSet::new(),
            base_rate_percent: None,
            max_rate_percent: None,
            monthly_fee_waiver_won: 0,
        },
        AccountProduct {
            id: "acc_kakao_start".to_string(),
            provider: "카카오뱅크".to_string(),
            name: "스타트업 프렌들리 통장".to_string(),
            kind: AccountKind::Checking,
            summary: "초기 금융 사용자를 위한 수수료 부담 완화".to_string(),
            official_url: "https://www.kakaobank.com".to_string(),
            tags: set(&["starter", "young", "low-fee"]),
            categories: BTreeSet::new(),
            base_rate_percent: Some(0.1),
            max_rate_percent: None,
            monthly_fee_waiver_won: 1_500,
        },
        AccountProduct {
            id: "acc_woori_fx".to_string(),
            provider: "우리은행".to_string(),
            name: "글로벌 트래블 외화통장".to_string(),
            kind: AccountKind::ForeignCurrency,
            summary: "환전 우대와 해외 결제 사용자를 위한 외화 혜택".to_string(),
            official_url: "https://www.wooribank.com".to_string(),
            tags: set(&["travel", "global", "fx"]),
            categories: BTreeSet::new(),
            base_rate_percent: None,
            max_rate_percent: None,
            monthly_fee_waiver_won: 0,
        },
    ]
}

pub fn cards() -> Vec<CardProduct> {
    vec![
        CardProduct {
            id: "card_shopping_plus".to_string(),
            provider: "신한카드".to_string(),
            name: "생활혜택 플러스".to_string(),
            summary: "장보기/교통/외식 중심 캐시백".to_string(),
            official_url: "https://www.shinhancard.com".to_string(),
            annual_fee_text: "국내전용 1.2만원".to_string(),
            annual_fee_won: None,
            cashback_rate_percent: 5.0,
            base_reward_rate_percent: 0.5,
            monthly_cashback_cap_won: Some(20_000),
            min_monthly_spend_won: 300_000,
            tags: set(&["cashback", "daily"]),
            categories: set(&["grocery", "transport", "dining"]),
        },
        CardProduct {
            id: "card_kb_online".to_string(),
            provider: "KB국민카드".to_string(),
            name: "온라인 맥스".to_string(),
            summary: "온라인쇼핑/구독/간편결제 특화".to_string(),
            official_url: "https://card.kbcard.com".to_string(),
            annual_fee_text: "국내전용 1.0만원".to_string(),
            annual_fee_won: None,
            cashback_rate_percent: 7.0,
            base_reward_rate_percent: 0.3,
            monthly_cashback_cap_won: Some(15_000),
            min_monthly_spend_won: 300_000,
            tags: set(&["cashback", "online"]),
            categories: set(&["online", "subscription", "cafe"]),
        },
        CardProduct {
            id: "card_samsung_travel".to_string(),
            provider: "삼성카드".to_string(),
            name: "트래블 마일".to_string(),
            summary: "해외결제 적립 + 여행 보너스".to_string(),
            official_url: "https://www.samsungcard.com".to_string(),
            annual_fee_text: "국내외겸용 2.5만원".to_string(),
            annual_fee_won: None,
            cashback_rate_percent: 2.0,
            base_reward_rate_percent: 1.0,
            monthly_cashback_cap_won: Some(30_000),
            min_monthly_spend_won: 500_000,
            tags: set(&["travel", "mileage"]),
            categories: set(&["online"]),
        },
        CardProduct {
            id: "card_nh_starter".to_string(),
            provider: "NH농협카드".to_string(),
            name: "스타트 제로".to_string(),
            summary: "연회비 부담 최소 + 기본 적립".to_string(),
            official_url: "https://card.nonghyup.com".to_string(),
            annual_fee_text: "국내전용 없음".to_string(),
            annual_fee_won: Some(0),
            cashback_rate_percent: 1.0,
            base_reward_rate_percent: 0.7,
            monthly_cashback_cap_won: Some(10_000),
            min_monthly_spend_won: 0,
            tags: set(&["starter", "no-fee"]),
            categories: set(&["online", "grocery", "transport"]),
        },
    ]
}

pub fn catalog() -> CatalogSnapshot {
    CatalogSnapshot {
        accounts: accounts(),
        cards: cards(),
    }
}
