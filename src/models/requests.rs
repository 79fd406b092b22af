use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Query string for the deal feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub dispensary: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub max_price: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub min_discount: Option<f64>,
    #[serde(default)]
    pub strain_type: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[validate(range(min = 1, max = 200))]
    #[serde(default)]
    pub limit: Option<u16>,
    #[validate(length(min = 1, max = 64))]
    #[serde(default)]
    pub anon_id: Option<String>,
}

/// Query string for free-text search
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[validate(length(min = 1, max = 100))]
    pub q: String,
    #[validate(range(min = 1, max = 200))]
    #[serde(default)]
    pub limit: Option<u16>,
}

/// Save or unsave a deal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveDealRequest {
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "anon_id")]
    pub anon_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "deal_id")]
    pub deal_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnonQuery {
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "anon_id")]
    pub anon_id: String,
}

/// Analytics event
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "anon_id")]
    pub anon_id: String,
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "event_name")]
    pub event_name: String,
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// Email / SMS capture from the signup modals
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_contact"))]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "anon_id")]
    pub anon_id: String,
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "modal".to_string()
}

fn validate_contact(req: &ContactRequest) -> Result<(), ValidationError> {
    let has_email = req.email.as_deref().is_some_and(|e| !e.trim().is_empty());
    if !has_email && req.phone.is_none() {
        return Err(ValidationError::new("email_or_phone_required"));
    }
    if let Some(phone) = &req.phone {
        if normalize_phone(phone).is_none() {
            return Err(ValidationError::new("invalid_phone"));
        }
    }
    Ok(())
}

/// Reduce a US phone number to `+1XXXXXXXXXX`
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        _ => None,
    }
}

/// Share a list of saved deals
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "anon_id")]
    pub anon_id: String,
    #[validate(length(min = 1, max = 50))]
    #[serde(alias = "deal_ids")]
    pub deal_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(702) 555-0199"), Some("+17025550199".to_string()));
        assert_eq!(normalize_phone("1-702-555-0199"), Some("+17025550199".to_string()));
        assert_eq!(normalize_phone("555-0199"), None);
    }

    #[test]
    fn test_contact_requires_email_or_phone() {
        let req = ContactRequest {
            anon_id: "anon-1".to_string(),
            email: None,
            phone: None,
            source: "modal".to_string(),
        };
        assert!(req.validate().is_err());

        let req = ContactRequest {
            email: Some("someone@example.com".to_string()),
            ..req
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_contact_rejects_bad_email() {
        let req = ContactRequest {
            anon_id: "anon-1".to_string(),
            email: Some("not-an-email".to_string()),
            phone: None,
            source: "modal".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_share_requires_deals() {
        let req = CreateShareRequest {
            anon_id: "anon-1".to_string(),
            deal_ids: vec![],
        };
        assert!(req.validate().is_err());
    }
}
