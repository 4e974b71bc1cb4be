use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Keywords that mark a cast as investment talk.
pub const INVESTMENT_KEYWORDS: [&str; 5] = ["seed", "round", "valuation", "cap", "equity"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastAuthor {
    pub fid: u64,
}

/// A single cast as returned by the search API. The timestamp is kept as the
/// raw string so a cached result serializes back to the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cast {
    pub hash: String,
    pub text: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: String,
    pub author: CastAuthor,
}

/// A null, missing or non-string timestamp becomes `""`, which never parses,
/// so the cast is kept but falls outside every time window.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(timestamp) => timestamp,
        _ => String::new(),
    })
}

impl Cast {
    /// Parses `timestamp` as an absolute instant. Zone-less timestamps are
    /// read as UTC; anything else unparseable yields `None`.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Ordered, deduplicated set of lowercase keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    pub fn investment() -> Self {
        Self::new(INVESTMENT_KEYWORDS)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Comma-joined form used for the `keyword` query parameter.
    pub fn query_param(&self) -> String {
        self.keywords.join(",")
    }

    /// Keywords contained in `text`, compared case-insensitively as plain
    /// substrings, in set order.
    pub fn matches<'a>(&'a self, text: &str) -> Vec<&'a str> {
        let lowered = text.to_lowercase();
        self.iter()
            .filter(|keyword| lowered.contains(*keyword))
            .collect()
    }
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::investment()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyActivity {
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub total_casts: usize,
    pub investment_cast_count: usize,
    pub first_investment_cast_date: String,
    pub last_investment_cast_date: String,
    pub score: u8,
    pub keyword_distribution: BTreeMap<String, usize>,
    pub monthly_activity: Vec<MonthlyActivity>,
    pub raw_casts: Vec<Cast>,
}

impl AnalysisResult {
    pub fn empty() -> Self {
        Self {
            total_casts: 0,
            investment_cast_count: 0,
            first_investment_cast_date: String::new(),
            last_investment_cast_date: String::new(),
            score: 0,
            keyword_distribution: BTreeMap::new(),
            monthly_activity: Vec::new(),
            raw_casts: Vec::new(),
        }
    }

    pub fn has_investment_casts(&self) -> bool {
        self.investment_cast_count > 0
    }
}
