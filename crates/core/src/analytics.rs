//! Click analytics for one run, recomputed on demand from its redirect events.

use crate::domain::analytics::{AnalyticsReport, CategoryStat, ClickStat, RedirectEvent, ReportMode};
use crate::domain::product::ProductType;
use crate::domain::recommendation::{RankedItem, RecommendationRun};
use crate::engine::category;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const TOP_CLICKED_LIMIT: usize = 5;
const UNCATEGORIZED: &str = "other";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsOptions {
    pub mode: ReportMode,
    /// Repeated clicks on one product closer together than this count once. 0 keeps every click.
    pub dedup_window_secs: u64,
}

type ProductKey<'a> = (ProductType, &'a str);

/// `part / whole × 100` to one decimal; 0 when there is nothing to divide by.
pub fn rate_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64) * 1000.0 / whole as f64).round() / 10.0
}

/// Collapses clicks on the same product that fall inside the window of the last kept click.
pub fn dedup_events(events: &[RedirectEvent], window_secs: u64) -> Vec<&RedirectEvent> {
    let mut ordered: Vec<&RedirectEvent> = events.iter().collect();
    if window_secs == 0 {
        return ordered;
    }
    ordered.sort_by_key(|e| e.clicked_at);

    let window = Duration::seconds(window_secs.min(u32::MAX as u64) as i64);
    let mut last_kept: HashMap<ProductKey<'_>, DateTime<Utc>> = HashMap::new();
    ordered.retain(|&e| {
        let key = (e.product_type, e.product_id.as_str());
        match last_kept.get(&key) {
            Some(prev) if e.clicked_at - *prev < window => false,
            _ => {
                last_kept.insert(key, e.clicked_at);
                true
            }
        }
    });
    ordered
}

#[derive(Default)]
struct Clicks {
    count: u64,
    last: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct CategoryTally {
    recommended: u64,
    redirects: u64,
    clicked: BTreeSet<(ProductType, String)>,
}

fn item_categories(item: &RankedItem) -> Vec<&str> {
    if item.category_keys.is_empty() {
        vec![UNCATEGORIZED]
    } else {
        item.category_keys.iter().map(String::as_str).collect()
    }
}

pub fn aggregate(
    run: &RecommendationRun,
    events: &[RedirectEvent],
    options: &AnalyticsOptions,
) -> AnalyticsReport {
    let events: Vec<&RedirectEvent> = dedup_events(events, options.dedup_window_secs)
        .into_iter()
        .filter(|e| e.run_id == run.run_id)
        .collect();

    let mut clicks: HashMap<(ProductType, String), Clicks> = HashMap::new();
    for e in events.iter().copied() {
        let entry = clicks
            .entry((e.product_type, e.product_id.clone()))
            .or_default();
        entry.count += 1;
        entry.last = entry.last.max(Some(e.clicked_at));
    }

    let items: Vec<&RankedItem> = run.items().collect();
    let clicks_of =
        |item: &RankedItem| clicks.get(&(item.product_type, item.product_id.clone()));

    let unique_clicked = items.iter().filter(|i| clicks_of(i).is_some()).count() as u64;

    let mut top: Vec<ClickStat> = items
        .iter()
        .filter_map(|item| {
            let c = clicks_of(item);
            if c.is_none() && options.mode == ReportMode::ClickedOnly {
                return None;
            }
            Some(ClickStat {
                product_type: item.product_type,
                product_id: item.product_id.clone(),
                name: item.name.clone(),
                rank: item.rank,
                click_count: c.map_or(0, |c| c.count),
                last_clicked_at: c.and_then(|c| c.last),
            })
        })
        .collect();
    // Most clicks, then most recent click (never-clicked last), then recommendation rank.
    top.sort_by(|a, b| {
        b.click_count
            .cmp(&a.click_count)
            .then_with(|| b.last_clicked_at.cmp(&a.last_clicked_at))
            .then_with(|| a.rank.cmp(&b.rank))
            .then_with(|| a.product_type.cmp(&b.product_type))
    });
    top.truncate(TOP_CLICKED_LIMIT);

    let mut tallies: BTreeMap<&str, CategoryTally> = BTreeMap::new();
    for item in &items {
        let c = clicks_of(item);
        for key in item_categories(item) {
            let tally = tallies.entry(key).or_default();
            tally.recommended += 1;
            if let Some(c) = c {
                tally.redirects += c.count;
                tally
                    .clicked
                    .insert((item.product_type, item.product_id.clone()));
            }
        }
    }

    let mut category_stats: Vec<CategoryStat> = tallies
        .into_iter()
        .map(|(key, t)| {
            let unique = t.clicked.len() as u64;
            CategoryStat {
                category_key: key.to_string(),
                category_label: if key == UNCATEGORIZED {
                    "기타".to_string()
                } else {
                    category::label(key).to_string()
                },
                recommended_products: t.recommended,
                total_redirects: t.redirects,
                unique_clicked_products: unique,
                click_rate_percent: rate_percent(t.redirects, t.recommended),
                conversion_rate_percent: rate_percent(unique, t.recommended),
            }
        })
        .collect();
    // BTreeMap order already gives key ascending for the final tie-break.
    category_stats.sort_by(|a, b| {
        b.total_redirects
            .cmp(&a.total_redirects)
            .then_with(|| b.recommended_products.cmp(&a.recommended_products))
    });

    AnalyticsReport {
        run_id: run.run_id,
        total_redirects: events.len() as u64,
        unique_clicked_products: unique_clicked,
        unique_click_rate_percent: rate_percent(unique_clicked, items.len() as u64),
        top_clicked_products: top,
        category_stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed;
    use crate::domain::profile::{
        AccountPriority, CardPriority, Profile, SalaryTransfer, TravelLevel,
    };
    use crate::engine::weights::ScoringWeights;
    use crate::run::build_run;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn profile() -> Profile {
        Profile {
            age: 29,
            income: 300,
            monthly_spend: 120,
            account_priority: AccountPriority::Savings,
            card_priority: CardPriority::Cashback,
            salary_transfer: SalaryTransfer::Yes,
            travel_level: TravelLevel::None,
            account_categories: Default::default(),
            card_categories: Default::default(),
        }
    }

    fn seeded_run() -> RecommendationRun {
        build_run(
            profile(),
            &seed::catalog(),
            &ScoringWeights::default(),
            Uuid::new_v4(),
            Utc::now(),
        )
    }

    fn two_item_run() -> RecommendationRun {
        let mut run = seeded_run();
        run.accounts.truncate(1);
        run.cards.truncate(1);
        run
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn click(run: &RecommendationRun, item: &RankedItem, secs: i64) -> RedirectEvent {
        RedirectEvent {
            id: Uuid::new_v4(),
            run_id: run.run_id,
            product_type: item.product_type,
            product_id: item.product_id.clone(),
            official_url: item.official_url.clone(),
            clicked_at: at(secs),
            user_agent: None,
            ip_address: None,
            referrer: None,
        }
    }

    #[test]
    fn no_events_yield_zeroes() {
        let run = seeded_run();
        let report = aggregate(&run, &[], &AnalyticsOptions::default());

        assert_eq!(report.total_redirects, 0);
        assert_eq!(report.unique_clicked_products, 0);
        assert_eq!(report.unique_click_rate_percent, 0.0);
        assert!(report.top_clicked_products.is_empty());
        assert!(!report.category_stats.is_empty());
        for stat in &report.category_stats {
            assert_eq!(stat.total_redirects, 0);
            assert_eq!(stat.click_rate_percent, 0.0);
            assert_eq!(stat.conversion_rate_percent, 0.0);
        }
    }

    #[test]
    fn three_clicks_on_one_of_two_items() {
        let run = two_item_run();
        let a = run.accounts[0].clone();
        let events = vec![click(&run, &a, 0), click(&run, &a, 10), click(&run, &a, 20)];

        let report = aggregate(&run, &events, &AnalyticsOptions::default());
        assert_eq!(report.total_redirects, 3);
        assert_eq!(report.unique_clicked_products, 1);
        assert_eq!(report.unique_click_rate_percent, 50.0);
        assert_eq!(report.top_clicked_products.len(), 1);
        assert_eq!(report.top_clicked_products[0].click_count, 3);
        assert_eq!(report.top_clicked_products[0].last_clicked_at, Some(at(20)));
    }

    #[test]
    fn dedup_window_collapses_rapid_repeats() {
        let run = two_item_run();
        let a = run.accounts[0].clone();
        let events = vec![click(&run, &a, 0), click(&run, &a, 10), click(&run, &a, 90)];

        let options = AnalyticsOptions {
            dedup_window_secs: 60,
            ..AnalyticsOptions::default()
        };
        let report = aggregate(&run, &events, &options);
        assert_eq!(report.total_redirects, 2);
        assert_eq!(report.top_clicked_products[0].last_clicked_at, Some(at(90)));
    }

    #[test]
    fn top_clicked_orders_by_count_then_recency_then_rank() {
        let run = seeded_run();
        let a1 = run.accounts[0].clone();
        let a2 = run.accounts[1].clone();
        let c1 = run.cards[0].clone();
        let events = vec![
            click(&run, &c1, 5),
            click(&run, &a2, 1),
            click(&run, &a2, 2),
            click(&run, &a1, 3),
        ];

        let report = aggregate(&run, &events, &AnalyticsOptions::default());
        let ids: Vec<_> = report
            .top_clicked_products
            .iter()
            .map(|s| s.product_id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec![a2.product_id.as_str(), c1.product_id.as_str(), a1.product_id.as_str()]
        );
    }

    #[test]
    fn include_unclicked_lists_zero_counts_by_rank() {
        let run = two_item_run();
        let card = run.cards[0].clone();
        let events = vec![click(&run, &card, 0)];

        let options = AnalyticsOptions {
            mode: ReportMode::IncludeUnclicked,
            ..AnalyticsOptions::default()
        };
        let report = aggregate(&run, &events, &options);
        assert_eq!(report.top_clicked_products.len(), 2);
        assert_eq!(report.top_clicked_products[0].product_id, card.product_id);
        assert_eq!(report.top_clicked_products[1].click_count, 0);
        assert_eq!(report.top_clicked_products[1].last_clicked_at, None);
    }

    #[test]
    fn clicks_outside_the_run_items_count_only_as_redirects() {
        let run = two_item_run();
        let mut stray = click(&run, &run.accounts[0].clone(), 0);
        stray.product_id = "not-recommended".to_string();

        let report = aggregate(&run, &[stray], &AnalyticsOptions::default());
        assert_eq!(report.total_redirects, 1);
        assert_eq!(report.unique_clicked_products, 0);
        assert!(report.top_clicked_products.is_empty());
    }

    #[test]
    fn category_stats_rates_and_ordering() {
        let run = two_item_run();
        let card = run.cards[0].clone();
        let events = vec![click(&run, &card, 0), click(&run, &card, 1)];

        let report = aggregate(&run, &events, &AnalyticsOptions::default());
        let first = &report.category_stats[0];
        assert!(card.category_keys.contains(&first.category_key));
        assert_eq!(first.total_redirects, 2);
        assert_eq!(first.unique_clicked_products, 1);
        assert_eq!(first.click_rate_percent, rate_percent(2, first.recommended_products));

        for pair in report.category_stats.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                (a.total_redirects, a.recommended_products) >= (b.total_redirects, b.recommended_products)
            );
            if (a.total_redirects, a.recommended_products) == (b.total_redirects, b.recommended_products) {
                assert!(a.category_key < b.category_key);
            }
        }
    }

    #[test]
    fn rates_round_to_one_decimal() {
        assert_eq!(rate_percent(1, 3), 33.3);
        assert_eq!(rate_percent(2, 3), 66.7);
        assert_eq!(rate_percent(5, 0), 0.0);
    }
}
