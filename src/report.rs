use castlens_core::{parse_timestamp, AnalysisResult};
use std::fmt;

const BAR_WIDTH: usize = 24;

/// Plain-text summary of an analysis.
pub struct Report<'a> {
    result: &'a AnalysisResult,
    stored_at: Option<&'a str>,
}

impl<'a> Report<'a> {
    pub fn new(result: &'a AnalysisResult, stored_at: Option<&'a str>) -> Self {
        Self { result, stored_at }
    }

    fn write_stored_at(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stored_at {
            Some(stored_at) => writeln!(f, "\n(cached at {})", display_date(stored_at)),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;

        writeln!(f, "Investment score: {}/100", result.score)?;
        writeln!(
            f,
            "Investment casts: {} of {} fetched",
            result.investment_cast_count, result.total_casts
        )?;

        if !result.has_investment_casts() {
            writeln!(f, "No investment casts in the last 12 months.")?;
            return self.write_stored_at(f);
        }

        writeln!(
            f,
            "Active from {} to {}",
            display_date(&result.first_investment_cast_date),
            display_date(&result.last_investment_cast_date)
        )?;

        writeln!(f, "\nKeywords")?;
        let mut keywords: Vec<(&String, &usize)> = result.keyword_distribution.iter().collect();
        keywords.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let max_keyword = keywords.first().map(|(_, count)| **count).unwrap_or(0);
        for (keyword, count) in keywords {
            writeln!(f, "  {:<10} {:>4} {}", keyword, count, bar(*count, max_keyword))?;
        }

        writeln!(f, "\nMonthly activity")?;
        let max_month = result
            .monthly_activity
            .iter()
            .map(|m| m.count)
            .max()
            .unwrap_or(0);
        for bucket in &result.monthly_activity {
            writeln!(
                f,
                "  {:<10} {:>4} {}",
                bucket.month,
                bucket.count,
                bar(bucket.count, max_month)
            )?;
        }

        self.write_stored_at(f)
    }
}

fn display_date(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "#".repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use castlens_core::MonthlyActivity;
    use std::collections::BTreeMap;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            total_casts: 10,
            investment_cast_count: 3,
            first_investment_cast_date: "2024-11-03T10:00:00.000Z".to_string(),
            last_investment_cast_date: "2025-01-02T10:00:00.000Z".to_string(),
            score: 30,
            keyword_distribution: BTreeMap::from([
                ("equity".to_string(), 1),
                ("seed".to_string(), 3),
            ]),
            monthly_activity: vec![
                MonthlyActivity {
                    month: "2024-11".to_string(),
                    count: 2,
                },
                MonthlyActivity {
                    month: "2025-01".to_string(),
                    count: 1,
                },
            ],
            raw_casts: Vec::new(),
        }
    }

    #[test]
    fn test_render_summary() {
        let text = Report::new(&sample(), None).to_string();
        assert!(text.contains("Investment score: 30/100"));
        assert!(text.contains("3 of 10 fetched"));
        assert!(text.contains("Active from 2024-11-03 to 2025-01-02"));
        assert!(!text.contains("cached at"));

        let seed_line = text.lines().position(|l| l.contains("seed")).unwrap();
        let equity_line = text.lines().position(|l| l.contains("equity")).unwrap();
        assert!(seed_line < equity_line);
    }

    #[test]
    fn test_render_empty_result() {
        let text = Report::new(&AnalysisResult::empty(), Some("2025-03-01T08:00:00.000Z")).to_string();
        assert!(text.contains("Investment score: 0/100"));
        assert!(text.contains("No investment casts"));
        assert!(text.contains("(cached at 2025-03-01)"));
        assert!(!text.contains("Monthly activity"));
    }

    #[test]
    fn test_bar_scales_to_max() {
        assert_eq!(bar(0, 0), "");
        assert_eq!(bar(3, 3).len(), BAR_WIDTH);
        assert_eq!(bar(1, 3).len(), BAR_WIDTH / 3);
        assert_eq!(bar(1, 100).len(), 1);
    }
}
