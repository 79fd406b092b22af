use crate::models::{Category, RawProduct};
use lazy_static::lazy_static;
use regex::Regex;

/// Relative distance within which a weight snaps to a plausible value
const SNAP_TOLERANCE: f64 = 0.15;

/// Grams per ounce, as dispensaries round it
const GRAMS_PER_OUNCE: f64 = 28.0;

lazy_static! {
    static ref FRACTION_RE: Regex = Regex::new(r"(?i)\b(1/8|1/4|1/2)(?:\s*(oz|ounces?|g|grams?)\b)?").unwrap();
    static ref MG_RE: Regex = Regex::new(r"(?i)(\d*\.?\d+)\s*(?:mg|milligrams?)\b").unwrap();
    static ref GRAM_RE: Regex = Regex::new(r"(?i)(\d*\.?\d+)\s*(?:g|gr|grams?)\b").unwrap();
    static ref OZ_RE: Regex = Regex::new(r"(?i)(\d*\.?\d+)\s*(?:oz|ounces?)\b").unwrap();
    static ref BARE_NUMBER_RE: Regex = Regex::new(r"^\s*(\d*\.?\d+)\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightUnit {
    Grams,
    Milligrams,
}

impl WeightUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            WeightUnit::Grams => "g",
            WeightUnit::Milligrams => "mg",
        }
    }
}

/// A parsed weight before category rules are applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub amount: f64,
    pub unit: WeightUnit,
}

impl Quantity {
    fn grams(amount: f64) -> Self {
        Self { amount, unit: WeightUnit::Grams }
    }

    fn milligrams(amount: f64) -> Self {
        Self { amount, unit: WeightUnit::Milligrams }
    }

    /// Express this quantity in `unit`
    pub fn convert(self, unit: WeightUnit) -> f64 {
        match (self.unit, unit) {
            (WeightUnit::Grams, WeightUnit::Milligrams) => self.amount * 1000.0,
            (WeightUnit::Milligrams, WeightUnit::Grams) => self.amount / 1000.0,
            _ => self.amount,
        }
    }
}

/// Unit a category's weights are displayed in
pub fn canonical_unit(category: Category) -> WeightUnit {
    match category {
        Category::Edible => WeightUnit::Milligrams,
        _ => WeightUnit::Grams,
    }
}

/// Weights that actually get sold in each category, in the canonical unit
pub fn plausible_weights(category: Category) -> &'static [f64] {
    match category {
        Category::Flower => &[1.0, 2.0, 3.5, 7.0, 14.0, 28.0],
        Category::Vape => &[0.3, 0.5, 0.85, 1.0, 2.0],
        Category::Concentrate => &[0.5, 1.0, 2.0, 3.5],
        Category::Preroll => &[0.5, 0.7, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 5.0],
        Category::Edible => &[5.0, 10.0, 20.0, 25.0, 50.0, 100.0, 200.0, 250.0, 500.0, 1000.0],
    }
}

/// Weight for a product row: structured fields first, then the product name
pub fn infer_weight(product: &RawProduct, category: Category) -> Option<String> {
    let structured = product
        .weight_value
        .filter(|v| v.is_finite() && *v > 0.0)
        .and_then(|value| {
            let unit = product.weight_unit.as_deref().unwrap_or("g");
            quantity_from_unit(value, unit)
        });

    let quantity = structured.or_else(|| product.name.as_deref().and_then(parse_weight_text))?;
    normalize_quantity(quantity, category)
}

/// Normalize a weight string for display.
///
/// Idempotent: feeding the output back in returns the same string.
pub fn normalize_weight_str(text: &str, category: Category) -> Option<String> {
    let quantity = parse_weight_text(text).or_else(|| {
        // A bare number is taken to be in the category's own unit
        BARE_NUMBER_RE
            .captures(text)
            .and_then(|c| c[1].parse::<f64>().ok())
            .map(|amount| Quantity { amount, unit: canonical_unit(category) })
    })?;
    normalize_quantity(quantity, category)
}

/// Pull a weight out of free text such as a product name
pub fn parse_weight_text(text: &str) -> Option<Quantity> {
    if let Some(caps) = FRACTION_RE.captures(text) {
        let (ounce_grams, fraction) = match &caps[1] {
            "1/8" => (3.5, 0.125),
            "1/4" => (7.0, 0.25),
            _ => (14.0, 0.5),
        };
        // "1/2g" is half a gram, a bare fraction is an ounce fraction
        let in_grams = caps
            .get(2)
            .is_some_and(|unit| unit.as_str().to_ascii_lowercase().starts_with('g'));
        return Some(Quantity::grams(if in_grams { fraction } else { ounce_grams }));
    }

    if let Some(amount) = first_amount(&MG_RE, text) {
        return Some(Quantity::milligrams(amount));
    }

    if let Some(amount) = first_amount(&GRAM_RE, text) {
        return Some(Quantity::grams(amount));
    }

    first_amount(&OZ_RE, text).map(|oz| Quantity::grams(oz * GRAMS_PER_OUNCE))
}

fn first_amount(re: &Regex, text: &str) -> Option<f64> {
    re.captures_iter(text)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .find(|v| v.is_finite() && *v > 0.0)
}

fn quantity_from_unit(value: f64, unit: &str) -> Option<Quantity> {
    match unit.trim().to_lowercase().as_str() {
        "" | "g" | "gr" | "gram" | "grams" => Some(Quantity::grams(value)),
        "mg" | "milligram" | "milligrams" => Some(Quantity::milligrams(value)),
        "oz" | "ounce" | "ounces" => Some(Quantity::grams(value * GRAMS_PER_OUNCE)),
        _ => None,
    }
}

/// Convert, correct and clamp a quantity, then format it
fn normalize_quantity(quantity: Quantity, category: Category) -> Option<String> {
    let unit = canonical_unit(category);
    let mut amount = quantity.convert(unit);
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }

    let plausible = plausible_weights(category);

    // Scrapers regularly lose the decimal point on flower ("35g" for an eighth)
    if category == Category::Flower
        && exact_match(amount, plausible).is_none()
        && exact_match(amount / 10.0, plausible).is_some()
    {
        amount /= 10.0;
    }

    let snapped = snap(amount, plausible)?;
    Some(format!("{}{}", format_amount(snapped), unit.suffix()))
}

fn exact_match(amount: f64, plausible: &[f64]) -> Option<f64> {
    plausible.iter().copied().find(|p| (amount - p).abs() < 1e-6)
}

fn snap(amount: f64, plausible: &[f64]) -> Option<f64> {
    plausible
        .iter()
        .copied()
        .map(|p| (p, (amount - p).abs() / p))
        .filter(|(_, dist)| *dist <= SNAP_TOLERANCE)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(p, _)| p)
}

/// Shortest decimal form: 1 -> "1", 3.5 -> "3.5", 0.85 -> "0.85"
fn format_amount(amount: f64) -> String {
    if (amount - amount.round()).abs() < 1e-9 {
        return format!("{}", amount.round() as i64);
    }
    let fixed = format!("{:.2}", amount);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, value: Option<f64>, unit: Option<&str>) -> RawProduct {
        RawProduct {
            id: "p1".to_string(),
            name: Some(name.to_string()),
            weight_value: value,
            weight_unit: unit.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_structured_weight_wins() {
        let p = product("STIIIZY - Blue Dream 2g Vape", Some(1.0), Some("g"));
        assert_eq!(infer_weight(&p, Category::Vape), Some("1g".to_string()));
    }

    #[test]
    fn test_name_fallback() {
        let p = product("Cookies Gelato 3.5g", None, None);
        assert_eq!(infer_weight(&p, Category::Flower), Some("3.5g".to_string()));

        let p = product("Wyld Gummies 100mg", None, None);
        assert_eq!(infer_weight(&p, Category::Edible), Some("100mg".to_string()));

        let p = product("Live Resin Cart .5 g", None, None);
        assert_eq!(infer_weight(&p, Category::Vape), Some("0.5g".to_string()));
    }

    #[test]
    fn test_fractions() {
        assert_eq!(normalize_weight_str("1/8 oz", Category::Flower), Some("3.5g".to_string()));
        assert_eq!(normalize_weight_str("Kush 1/4", Category::Flower), Some("7g".to_string()));
        assert_eq!(normalize_weight_str("1/2oz", Category::Flower), Some("14g".to_string()));
    }

    #[test]
    fn test_gram_fractions() {
        assert_eq!(normalize_weight_str("Select Cart 1/2g", Category::Vape), Some("0.5g".to_string()));
        assert_eq!(normalize_weight_str("Jeeter 1/2g Preroll", Category::Preroll), Some("0.5g".to_string()));
        assert_eq!(normalize_weight_str("Badder 1/2 gram", Category::Concentrate), Some("0.5g".to_string()));
        assert_eq!(normalize_weight_str("1/8 oz", Category::Flower), Some("3.5g".to_string()));
    }

    #[test]
    fn test_ounces() {
        assert_eq!(normalize_weight_str("1 oz", Category::Flower), Some("28g".to_string()));
    }

    #[test]
    fn test_flower_decimal_correction() {
        let p = product("Runtz", Some(35.0), Some("g"));
        assert_eq!(infer_weight(&p, Category::Flower), Some("3.5g".to_string()));

        let p = product("Runtz", Some(140.0), Some("g"));
        assert_eq!(infer_weight(&p, Category::Flower), Some("14g".to_string()));
    }

    #[test]
    fn test_decimal_correction_is_flower_only() {
        let p = product("Shatter", Some(35.0), Some("g"));
        assert_eq!(infer_weight(&p, Category::Concentrate), None);
    }

    #[test]
    fn test_implausible_weight_dropped() {
        assert_eq!(normalize_weight_str("12g", Category::Vape), None);
        assert_eq!(normalize_weight_str("4000mg", Category::Edible), None);
    }

    #[test]
    fn test_snaps_to_nearby_weight() {
        assert_eq!(normalize_weight_str("0.8g", Category::Vape), Some("0.85g".to_string()));
        assert_eq!(normalize_weight_str("0.95g", Category::Vape), Some("1g".to_string()));
    }

    #[test]
    fn test_edible_grams_to_milligrams() {
        let p = product("Chocolate Bar", Some(0.1), Some("g"));
        assert_eq!(infer_weight(&p, Category::Edible), Some("100mg".to_string()));
    }

    #[test]
    fn test_unknown_unit_falls_back_to_name() {
        let p = product("Pre-Roll Pack 2.5g", Some(5.0), Some("pack"));
        assert_eq!(infer_weight(&p, Category::Preroll), Some("2.5g".to_string()));
    }

    #[test]
    fn test_normalization_idempotent() {
        for category in Category::ALL {
            for value in plausible_weights(category) {
                let once = normalize_weight_str(
                    &format!("{}{}", format_amount(*value), canonical_unit(category).suffix()),
                    category,
                )
                .expect("plausible weight normalizes");
                let twice = normalize_weight_str(&once, category);
                assert_eq!(twice.as_deref(), Some(once.as_str()));
            }
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1.0), "1");
        assert_eq!(format_amount(3.5), "3.5");
        assert_eq!(format_amount(0.85), "0.85");
    }
}
