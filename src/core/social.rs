use crate::models::Deal;

/// Hard limit on post length
pub const TWEET_MAX_CHARS: usize = 280;

const HASHTAGS: &str = "#LasVegas #CannabisDeals";

/// Saves before a deal shows social proof
const SOCIAL_PROOF_MIN_SAVES: u32 = 3;
const TRENDING_SAVES: u32 = 25;

fn format_price(price: f64) -> String {
    if (price - price.round()).abs() < 0.005 {
        format!("${}", price.round() as i64)
    } else {
        format!("${:.2}", price)
    }
}

/// Post text for a deal, never longer than 280 characters.
///
/// The product name is shortened first; everything else is kept.
pub fn format_deal_tweet(deal: &Deal, site_url: &str) -> String {
    let mut price = format_price(deal.deal_price);
    if let Some(original) = deal.original_price.filter(|o| *o > deal.deal_price) {
        let pct = deal
            .discount_percent
            .unwrap_or(((original - deal.deal_price) / original * 100.0).round());
        price = format!("{} (was {}, {}% off)", price, format_price(original), pct.round() as i64);
    }

    let weight = deal.weight.as_deref().map(|w| format!(" {}", w)).unwrap_or_default();
    let brand = if deal.brand.eq_ignore_ascii_case(crate::core::normalize::UNKNOWN_BRAND)
        || deal.name.to_lowercase().starts_with(&deal.brand.to_lowercase())
    {
        String::new()
    } else {
        format!("{} ", deal.brand)
    };
    let url = if site_url.is_empty() {
        String::new()
    } else {
        format!(" {}", site_url)
    };

    let render = |name: &str| {
        format!(
            "{}{}{} {} at {}{} {}",
            brand, name, weight, price, deal.dispensary.name, url, HASHTAGS
        )
    };

    let full = render(&deal.name);
    let overflow = full.chars().count().saturating_sub(TWEET_MAX_CHARS);
    if overflow == 0 {
        return full;
    }

    let name_len = deal.name.chars().count();
    let keep = name_len.saturating_sub(overflow + 1);
    let short: String = deal.name.chars().take(keep).collect::<String>().trim_end().to_string() + "…";
    let text = render(&short);

    // Fixed parts alone are too long; hard cut as a last resort
    if text.chars().count() > TWEET_MAX_CHARS {
        return text.chars().take(TWEET_MAX_CHARS).collect();
    }
    text
}

/// "12 people saved this" style label, or `None` below the threshold
pub fn social_proof_label(save_count: u32) -> Option<String> {
    match save_count {
        n if n >= TRENDING_SAVES => Some("🔥 Trending".to_string()),
        n if n >= SOCIAL_PROOF_MIN_SAVES => Some(format!("{} people saved this", n)),
        _ => None,
    }
}
