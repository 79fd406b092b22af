use crate::models::{AnalyticsEvent, Deal, SavedDeal, UserStats};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Analytics event names that feed badge stats
pub const EVENT_DEAL_USED: &str = "deal_used";
pub const EVENT_SHARE: &str = "share";
pub const EVENT_SEARCH: &str = "search";

/// What a badge or challenge counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalSaves,
    LongestStreak,
    CategoriesSaved,
    DispensariesSaved,
    TopBrandSaves,
    Shares,
    DealsUsed,
    Searches,
}

impl Metric {
    fn read(&self, stats: &UserStats) -> u32 {
        match self {
            Metric::TotalSaves => stats.total_saves,
            Metric::LongestStreak => stats.longest_streak_days,
            Metric::CategoriesSaved => stats.categories_saved.len() as u32,
            Metric::DispensariesSaved => stats.dispensaries_saved.len() as u32,
            Metric::TopBrandSaves => stats.top_brand_saves,
            Metric::Shares => stats.shares,
            Metric::DealsUsed => stats.deals_used,
            Metric::Searches => stats.searches,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub metric: Metric,
    pub target: u32,
}

pub const BADGES: &[BadgeDefinition] = &[
    BadgeDefinition { id: "first_save", name: "First Save", description: "Save your first deal", metric: Metric::TotalSaves, target: 1 },
    BadgeDefinition { id: "deal_hunter", name: "Deal Hunter", description: "Save 10 deals", metric: Metric::TotalSaves, target: 10 },
    BadgeDefinition { id: "deal_master", name: "Deal Master", description: "Save 50 deals", metric: Metric::TotalSaves, target: 50 },
    BadgeDefinition { id: "streak_3", name: "On a Roll", description: "Save deals 3 days in a row", metric: Metric::LongestStreak, target: 3 },
    BadgeDefinition { id: "streak_5", name: "Five Alive", description: "Save deals 5 days in a row", metric: Metric::LongestStreak, target: 5 },
    BadgeDefinition { id: "streak_7", name: "Week Warrior", description: "Save deals 7 days in a row", metric: Metric::LongestStreak, target: 7 },
    BadgeDefinition { id: "explorer", name: "Explorer", description: "Save a deal in every category", metric: Metric::CategoriesSaved, target: 5 },
    BadgeDefinition { id: "dispensary_hopper", name: "Dispensary Hopper", description: "Save deals from 5 dispensaries", metric: Metric::DispensariesSaved, target: 5 },
    BadgeDefinition { id: "brand_loyalist", name: "Brand Loyalist", description: "Save 5 deals from one brand", metric: Metric::TopBrandSaves, target: 5 },
    BadgeDefinition { id: "sharer", name: "Sharer", description: "Share a deal with a friend", metric: Metric::Shares, target: 1 },
    BadgeDefinition { id: "smart_shopper", name: "Smart Shopper", description: "Use 3 deals", metric: Metric::DealsUsed, target: 3 },
];

pub const DAILY_CHALLENGES: &[BadgeDefinition] = &[
    BadgeDefinition { id: "daily_save_3", name: "Triple Save", description: "Save 3 deals today", metric: Metric::TotalSaves, target: 3 },
    BadgeDefinition { id: "daily_search", name: "Seeker", description: "Search for a deal today", metric: Metric::Searches, target: 1 },
    BadgeDefinition { id: "daily_share", name: "Spread the Word", description: "Share a deal today", metric: Metric::Shares, target: 1 },
];

/// Progress toward one badge or challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeProgress {
    pub id: String,
    pub name: String,
    pub description: String,
    pub current: u32,
    pub target: u32,
    pub earned: bool,
    pub fraction: f64,
}

fn progress(definition: &BadgeDefinition, stats: &UserStats) -> BadgeProgress {
    let current = definition.metric.read(stats);
    let fraction = if definition.target == 0 {
        1.0
    } else {
        (current as f64 / definition.target as f64).min(1.0)
    };

    BadgeProgress {
        id: definition.id.to_string(),
        name: definition.name.to_string(),
        description: definition.description.to_string(),
        current,
        target: definition.target,
        earned: current >= definition.target,
        fraction,
    }
}

/// Check every badge against lifetime stats
pub fn evaluate_badges(stats: &UserStats) -> Vec<BadgeProgress> {
    BADGES.iter().map(|b| progress(b, stats)).collect()
}

/// Check the daily challenges against stats for a single day
pub fn evaluate_challenges(day_stats: &UserStats) -> Vec<BadgeProgress> {
    DAILY_CHALLENGES.iter().map(|b| progress(b, day_stats)).collect()
}

/// Current and longest run of consecutive active days.
///
/// The current streak stays alive through today if the user was active
/// yesterday but hasn't done anything yet today.
pub fn compute_streaks(dates: &[NaiveDate], today: NaiveDate) -> (u32, u32) {
    let days: BTreeSet<NaiveDate> = dates.iter().copied().filter(|d| *d <= today).collect();
    if days.is_empty() {
        return (0, 0);
    }

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in &days {
        run = match previous {
            Some(p) if *day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }

    let mut current = 0u32;
    let mut cursor = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt().filter(|y| days.contains(y))
    };
    while let Some(day) = cursor {
        if !days.contains(&day) {
            break;
        }
        current += 1;
        cursor = day.pred_opt();
    }

    (current, longest)
}

/// Calendar day of `at` in the local time given by `offset`
pub fn local_day(at: &DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    at.with_timezone(offset).date_naive()
}

impl UserStats {
    /// Aggregate stats from saves and analytics events.
    ///
    /// `catalog` resolves saved ids to deals for category, dispensary and
    /// brand counts; saves of deals no longer live still count toward totals.
    /// Streak days are split at local midnight per `offset`.
    pub fn from_activity(
        saves: &[SavedDeal],
        events: &[AnalyticsEvent],
        catalog: &HashMap<String, Deal>,
        today: NaiveDate,
        offset: &FixedOffset,
    ) -> Self {
        let mut stats = UserStats {
            total_saves: saves.len() as u32,
            ..Default::default()
        };

        let mut brand_counts: HashMap<String, u32> = HashMap::new();
        for save in saves {
            if let Some(deal) = catalog.get(&save.deal_id) {
                stats.categories_saved.insert(deal.category);
                stats.dispensaries_saved.insert(deal.dispensary.id.clone());
                *brand_counts.entry(deal.brand.to_lowercase()).or_insert(0) += 1;
            }
        }
        stats.top_brand_saves = brand_counts.values().copied().max().unwrap_or(0);

        for event in events {
            match event.event_name.as_str() {
                EVENT_DEAL_USED => stats.deals_used += 1,
                EVENT_SHARE => stats.shares += 1,
                EVENT_SEARCH => stats.searches += 1,
                _ => {}
            }
        }

        let dates: Vec<NaiveDate> = saves.iter().map(|s| local_day(&s.saved_at, offset)).collect();
        let (current, longest) = compute_streaks(&dates, today);
        stats.current_streak_days = current;
        stats.longest_streak_days = longest;

        stats
    }

    /// Stats restricted to activity on `day`
    pub fn for_day(
        saves: &[SavedDeal],
        events: &[AnalyticsEvent],
        catalog: &HashMap<String, Deal>,
        day: NaiveDate,
        offset: &FixedOffset,
    ) -> Self {
        let on_day = |at: &DateTime<Utc>| local_day(at, offset) == day;
        let saves: Vec<SavedDeal> = saves.iter().filter(|s| on_day(&s.saved_at)).cloned().collect();
        let events: Vec<AnalyticsEvent> = events.iter().filter(|e| on_day(&e.created_at)).cloned().collect();
        Self::from_activity(&saves, &events, catalog, day, offset)
    }
}
