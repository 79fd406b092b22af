// Core algorithm exports
pub mod badges;
pub mod dispensaries;
pub mod diversity;
pub mod feed;
pub mod filters;
pub mod normalize;
pub mod personalization;
pub mod social;
pub mod weight;

pub use badges::{compute_streaks, evaluate_badges, evaluate_challenges, local_day, BadgeProgress};
pub use diversity::{apply_diversity_caps, CapStats};
pub use feed::{DealFeed, FeedResult};
pub use filters::{matches_filter, matches_search, DealFilter};
pub use normalize::{infer_brand, infer_category, normalize_for_search, normalize_product};
pub use personalization::{derive_preferences, rank_deals, score_deal};
pub use social::{format_deal_tweet, social_proof_label};
pub use weight::{infer_weight, normalize_weight_str};
