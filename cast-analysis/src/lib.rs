//! Keyword-frequency analysis over a user's casts.
//!
//! The analyzer is pure: given the same casts and the same `now` it produces
//! the same `AnalysisResult`. It never fails; a cast whose timestamp cannot
//! be parsed is treated as outside the recency window.

use castlens_core::{AnalysisResult, Cast, KeywordSet, MonthlyActivity};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Width of the recency window, measured as elapsed time rather than
/// calendar months.
pub const MAX_CAST_AGE_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct CastAnalyzer {
    keywords: KeywordSet,
    max_age: Duration,
}

impl CastAnalyzer {
    pub fn new(keywords: KeywordSet) -> Self {
        Self {
            keywords,
            max_age: Duration::days(MAX_CAST_AGE_DAYS),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn analyze(&self, casts: Vec<Cast>) -> AnalysisResult {
        self.analyze_at(casts, Utc::now())
    }

    pub fn analyze_at(&self, casts: Vec<Cast>, now: DateTime<Utc>) -> AnalysisResult {
        let total_casts = casts.len();
        let cutoff = now - self.max_age;

        let mut keyword_distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut monthly: BTreeMap<String, usize> = BTreeMap::new();
        let mut qualifying: Vec<(DateTime<Utc>, Cast)> = Vec::new();
        let mut unparseable = 0usize;

        for cast in casts {
            let Some(published_at) = cast.published_at() else {
                unparseable += 1;
                continue;
            };
            if published_at < cutoff {
                continue;
            }

            let matched = self.keywords.matches(&cast.text);
            if matched.is_empty() {
                continue;
            }

            for keyword in matched {
                *keyword_distribution.entry(keyword.to_string()).or_insert(0) += 1;
            }
            *monthly
                .entry(published_at.format("%Y-%m").to_string())
                .or_insert(0) += 1;
            qualifying.push((published_at, cast));
        }

        if unparseable > 0 {
            debug!(
                "Skipped {} of {} casts with unparseable timestamps",
                unparseable, total_casts
            );
        }

        // Stable sort keeps input order for identical instants.
        qualifying.sort_by_key(|(published_at, _)| *published_at);
        let raw_casts: Vec<Cast> = qualifying.into_iter().map(|(_, cast)| cast).collect();

        let investment_cast_count = raw_casts.len();
        let first_investment_cast_date = raw_casts
            .first()
            .map(|cast| cast.timestamp.clone())
            .unwrap_or_default();
        let last_investment_cast_date = raw_casts
            .last()
            .map(|cast| cast.timestamp.clone())
            .unwrap_or_default();

        let monthly_activity = monthly
            .into_iter()
            .map(|(month, count)| MonthlyActivity { month, count })
            .collect();

        debug!(
            "Analyzed {} casts: {} qualifying",
            total_casts, investment_cast_count
        );

        AnalysisResult {
            total_casts,
            investment_cast_count,
            first_investment_cast_date,
            last_investment_cast_date,
            score: score(investment_cast_count, total_casts),
            keyword_distribution,
            monthly_activity,
            raw_casts,
        }
    }
}

impl Default for CastAnalyzer {
    fn default() -> Self {
        Self::new(KeywordSet::investment())
    }
}

/// Percentage of qualifying casts, rounded down; 0 for an empty input.
pub fn score(qualifying: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (qualifying.min(total) * 100 / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use castlens_core::CastAuthor;
    use chrono::{SecondsFormat, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn iso(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn cast(hash: &str, text: &str, timestamp: impl Into<String>) -> Cast {
        Cast {
            hash: hash.to_string(),
            text: text.to_string(),
            timestamp: timestamp.into(),
            author: CastAuthor { fid: 194 },
        }
    }

    fn days_ago(days: i64) -> String {
        iso(fixed_now() - Duration::days(days))
    }

    #[test]
    fn test_empty_input() {
        let result = CastAnalyzer::default().analyze_at(Vec::new(), fixed_now());
        assert_eq!(result, AnalysisResult::empty());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_single_seed_round_cast() {
        let now = fixed_now();
        let result = CastAnalyzer::default()
            .analyze_at(vec![cast("0x1", "raising a seed round", iso(now))], now);

        assert_eq!(result.total_casts, 1);
        assert_eq!(result.investment_cast_count, 1);
        assert_eq!(result.score, 100);
        assert_eq!(result.keyword_distribution.len(), 2);
        assert_eq!(result.keyword_distribution["seed"], 1);
        assert_eq!(result.keyword_distribution["round"], 1);
        assert_eq!(result.first_investment_cast_date, iso(now));
        assert_eq!(result.last_investment_cast_date, iso(now));
    }

    #[test]
    fn test_three_of_ten_equity_casts() {
        let mut casts = Vec::new();
        for i in 0..3 {
            casts.push(cast(&format!("0xe{}", i), "Talking equity splits", days_ago(i + 1)));
        }
        for i in 0..7 {
            casts.push(cast(&format!("0xu{}", i), "gm frens", days_ago(i + 1)));
        }

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        assert_eq!(result.total_casts, 10);
        assert_eq!(result.investment_cast_count, 3);
        assert_eq!(result.score, 30);
        assert_eq!(
            result.keyword_distribution,
            BTreeMap::from([("equity".to_string(), 3)])
        );
    }

    #[test]
    fn test_old_cast_is_excluded_everywhere() {
        let casts = vec![
            cast("0xold", "cap table cleanup", days_ago(400)),
            cast("0xnew", "nothing to see", days_ago(1)),
        ];

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        assert_eq!(result.total_casts, 2);
        assert_eq!(result.investment_cast_count, 0);
        assert_eq!(result.score, 0);
        assert!(result.keyword_distribution.is_empty());
        assert!(result.monthly_activity.is_empty());
        assert!(result.raw_casts.is_empty());
        assert_eq!(result.first_investment_cast_date, "");
        assert_eq!(result.last_investment_cast_date, "");
    }

    #[test]
    fn test_cutoff_boundary_is_inclusive() {
        let now = fixed_now();
        let cutoff = now - Duration::days(MAX_CAST_AGE_DAYS);
        let casts = vec![
            cast("0xedge", "seed", iso(cutoff)),
            cast("0xpast", "seed", iso(cutoff - Duration::milliseconds(1))),
        ];

        let result = CastAnalyzer::default().analyze_at(casts, now);
        assert_eq!(result.investment_cast_count, 1);
        assert_eq!(result.raw_casts[0].hash, "0xedge");
    }

    #[test]
    fn test_window_is_elapsed_days_not_calendar_months() {
        // 2024 is a leap year: 365 days before 2025-01-15 is 2024-01-16.
        let casts = vec![
            cast("0xin", "valuation", "2024-01-16T12:00:00.000Z"),
            cast("0xout", "valuation", "2024-01-15T12:00:00.000Z"),
        ];

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        assert_eq!(result.investment_cast_count, 1);
        assert_eq!(result.raw_casts[0].hash, "0xin");
    }

    #[test]
    fn test_unparseable_timestamps_are_excluded_but_counted() {
        let casts = vec![
            cast("0xbad", "seed round", "not a date"),
            cast("0xgood", "seed round", days_ago(2)),
        ];

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        assert_eq!(result.total_casts, 2);
        assert_eq!(result.investment_cast_count, 1);
        assert_eq!(result.score, 50);
        assert_eq!(result.raw_casts[0].hash, "0xgood");
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_substring() {
        let casts = vec![
            cast("0x1", "Fighting INEQUITY", days_ago(1)),
            cast("0x2", "Recapping the week", days_ago(1)),
            cast("0x3", "nothing here", days_ago(1)),
        ];

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        assert_eq!(result.investment_cast_count, 2);
        assert_eq!(result.keyword_distribution["equity"], 1);
        assert_eq!(result.keyword_distribution["cap"], 1);
    }

    #[test]
    fn test_raw_casts_sorted_and_ties_stable() {
        let shared = days_ago(10);
        let casts = vec![
            cast("0xlate", "seed", days_ago(1)),
            cast("0xtie-a", "round", shared.clone()),
            cast("0xearly", "cap", days_ago(30)),
            cast("0xtie-b", "equity", shared.clone()),
        ];

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        let order: Vec<&str> = result.raw_casts.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(order, vec!["0xearly", "0xtie-a", "0xtie-b", "0xlate"]);
        assert_eq!(result.first_investment_cast_date, days_ago(30));
        assert_eq!(result.last_investment_cast_date, days_ago(1));
    }

    #[test]
    fn test_sort_uses_instants_not_strings() {
        let casts = vec![
            cast("0xa", "seed", "2024-12-01T10:00:00+05:00"),
            cast("0xb", "seed", "2024-12-01T06:00:00Z"),
        ];

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        assert_eq!(result.raw_casts[0].hash, "0xa");
        assert_eq!(result.first_investment_cast_date, "2024-12-01T10:00:00+05:00");
    }

    #[test]
    fn test_monthly_activity_counts_qualifying_casts_only() {
        let casts = vec![
            cast("0x1", "seed", "2024-11-03T10:00:00Z"),
            cast("0x2", "round", "2024-11-28T10:00:00Z"),
            cast("0x3", "gm", "2024-11-29T10:00:00Z"),
            cast("0x4", "cap", "2024-09-10T10:00:00Z"),
            cast("0x5", "valuation", "2025-01-02T10:00:00Z"),
        ];

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        assert_eq!(
            result.monthly_activity,
            vec![
                MonthlyActivity { month: "2024-09".to_string(), count: 1 },
                MonthlyActivity { month: "2024-11".to_string(), count: 2 },
                MonthlyActivity { month: "2025-01".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_monthly_bucket_uses_utc_month() {
        let casts = vec![cast("0x1", "seed", "2024-12-01T01:00:00+02:00")];

        let result = CastAnalyzer::default().analyze_at(casts, fixed_now());
        assert_eq!(result.monthly_activity[0].month, "2024-11");
    }

    #[test]
    fn test_custom_keywords_and_window() {
        let analyzer = CastAnalyzer::new(KeywordSet::new(["SAFE"]))
            .with_max_age(Duration::days(30));
        let casts = vec![
            cast("0x1", "signed a safe today", days_ago(5)),
            cast("0x2", "signed a safe last quarter", days_ago(90)),
            cast("0x3", "seed round", days_ago(5)),
        ];

        let result = analyzer.analyze_at(casts, fixed_now());
        assert_eq!(result.investment_cast_count, 1);
        assert_eq!(result.keyword_distribution["safe"], 1);
        assert_eq!(result.score, 33);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let casts = vec![
            cast("0x1", "seed and cap", days_ago(3)),
            cast("0x2", "equity", days_ago(40)),
            cast("0x3", "gm", days_ago(2)),
        ];
        let analyzer = CastAnalyzer::default();

        let first = analyzer.analyze_at(casts.clone(), fixed_now());
        let second = analyzer.analyze_at(casts, fixed_now());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_invariants_hold_over_generated_inputs() {
        let texts = [
            "raising a seed round",
            "gm",
            "cap table and valuation",
            "equity",
            "nothing",
            "ROUND two",
        ];
        let analyzer = CastAnalyzer::default();

        for size in 0..40usize {
            let casts: Vec<Cast> = (0..size)
                .map(|i| {
                    let age = ((i * 37 + size * 11) % 500) as i64;
                    let timestamp = if i % 13 == 7 {
                        "garbage".to_string()
                    } else {
                        days_ago(age)
                    };
                    cast(&format!("0x{}-{}", size, i), texts[(i + size) % texts.len()], timestamp)
                })
                .collect();

            let result = analyzer.analyze_at(casts, fixed_now());

            assert_eq!(result.total_casts, size);
            assert!(result.investment_cast_count <= result.total_casts);
            assert!(result.score <= 100);
            if size == 0 {
                assert_eq!(result.score, 0);
            }
            assert_eq!(result.raw_casts.len(), result.investment_cast_count);

            let distribution_total: usize = result.keyword_distribution.values().sum();
            assert!(distribution_total >= result.investment_cast_count);

            let instants: Vec<DateTime<Utc>> = result
                .raw_casts
                .iter()
                .map(|c| c.published_at().unwrap())
                .collect();
            assert!(instants.windows(2).all(|w| w[0] <= w[1]));

            let months: Vec<&str> = result
                .monthly_activity
                .iter()
                .map(|m| m.month.as_str())
                .collect();
            assert!(months.windows(2).all(|w| w[0] < w[1]));
            for bucket in &result.monthly_activity {
                let expected = instants
                    .iter()
                    .filter(|at| at.format("%Y-%m").to_string() == bucket.month)
                    .count();
                assert_eq!(bucket.count, expected);
            }
            let bucket_total: usize = result.monthly_activity.iter().map(|m| m.count).sum();
            assert_eq!(bucket_total, result.investment_cast_count);
        }
    }

    #[test]
    fn test_score_floors() {
        assert_eq!(score(0, 0), 0);
        assert_eq!(score(1, 3), 33);
        assert_eq!(score(2, 3), 66);
        assert_eq!(score(7, 7), 100);
    }
}
