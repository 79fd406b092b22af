use crate::models::DispensaryRef;

/// A dispensary we track, with the chain it belongs to
#[derive(Debug, Clone, Copy)]
pub struct KnownDispensary {
    pub id: &'static str,
    pub name: &'static str,
    pub chain: Option<&'static str>,
    pub zone: &'static str,
}

impl KnownDispensary {
    pub fn to_ref(&self) -> DispensaryRef {
        DispensaryRef {
            id: self.id.to_string(),
            name: self.name.to_string(),
            chain: self.chain.map(str::to_string),
            address: None,
            zone: Some(self.zone.to_string()),
        }
    }
}

/// Las Vegas valley dispensaries
pub const DISPENSARIES: &[KnownDispensary] = &[
    KnownDispensary { id: "planet13", name: "Planet 13", chain: None, zone: "strip" },
    KnownDispensary { id: "curaleaf-strip", name: "Curaleaf Las Vegas Strip", chain: Some("curaleaf"), zone: "strip" },
    KnownDispensary { id: "curaleaf-western", name: "Curaleaf Western", chain: Some("curaleaf"), zone: "downtown" },
    KnownDispensary { id: "curaleaf-north", name: "Curaleaf North Las Vegas", chain: Some("curaleaf"), zone: "north" },
    KnownDispensary { id: "curaleaf-reef", name: "Curaleaf Reef", chain: Some("curaleaf"), zone: "strip" },
    KnownDispensary { id: "thrive-strip", name: "Thrive Las Vegas Strip", chain: Some("thrive"), zone: "strip" },
    KnownDispensary { id: "thrive-sahara", name: "Thrive Sahara", chain: Some("thrive"), zone: "downtown" },
    KnownDispensary { id: "thrive-cheyenne", name: "Thrive Cheyenne", chain: Some("thrive"), zone: "north" },
    KnownDispensary { id: "thrive-southern-highlands", name: "Thrive Southern Highlands", chain: Some("thrive"), zone: "south" },
    KnownDispensary { id: "the-mint-paradise", name: "The Mint Paradise", chain: Some("the-mint"), zone: "strip" },
    KnownDispensary { id: "the-mint-spring-valley", name: "The Mint Spring Valley", chain: Some("the-mint"), zone: "west" },
    KnownDispensary { id: "oasis", name: "Oasis Cannabis", chain: None, zone: "downtown" },
    KnownDispensary { id: "the-grove", name: "The Grove", chain: None, zone: "strip" },
    KnownDispensary { id: "jardin", name: "Jardin", chain: None, zone: "downtown" },
    KnownDispensary { id: "cookies-strip", name: "Cookies on the Strip", chain: Some("cookies"), zone: "strip" },
    KnownDispensary { id: "deep-roots-cheyenne", name: "Deep Roots Harvest Cheyenne", chain: Some("deep-roots"), zone: "north" },
    KnownDispensary { id: "deep-roots-blue-diamond", name: "Deep Roots Harvest Blue Diamond", chain: Some("deep-roots"), zone: "south" },
    KnownDispensary { id: "rise-tropicana", name: "RISE Tropicana", chain: Some("rise"), zone: "west" },
    KnownDispensary { id: "rise-durango", name: "RISE Durango", chain: Some("rise"), zone: "south" },
    KnownDispensary { id: "rise-henderson", name: "RISE Henderson", chain: Some("rise"), zone: "henderson" },
    KnownDispensary { id: "greenleaf-wellness", name: "Greenleaf Wellness", chain: None, zone: "henderson" },
    KnownDispensary { id: "beyond-hello-sahara", name: "Beyond/Hello Sahara", chain: Some("beyond-hello"), zone: "downtown" },
    KnownDispensary { id: "beyond-hello-twain", name: "Beyond/Hello Twain", chain: Some("beyond-hello"), zone: "strip" },
];

/// Look up a tracked dispensary by id
pub fn find(id: &str) -> Option<&'static KnownDispensary> {
    DISPENSARIES.iter().find(|d| d.id == id)
}

/// Chain key for diversity capping.
///
/// Prefers the chain on the row, then the reference table; a dispensary
/// with no chain is its own chain.
pub fn chain_key(dispensary: &DispensaryRef) -> String {
    dispensary
        .chain
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .or_else(|| find(&dispensary.id).and_then(|d| d.chain))
        .map(|c| c.to_lowercase())
        .unwrap_or_else(|| format!("solo:{}", dispensary.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispensary(id: &str, chain: Option<&str>) -> DispensaryRef {
        DispensaryRef {
            id: id.to_string(),
            name: id.to_string(),
            chain: chain.map(str::to_string),
            address: None,
            zone: None,
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<&str> = DISPENSARIES.iter().map(|d| d.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DISPENSARIES.len());
    }

    #[test]
    fn test_chain_from_row_wins() {
        assert_eq!(chain_key(&dispensary("planet13", Some("Planet"))), "planet");
    }

    #[test]
    fn test_chain_from_reference_table() {
        assert_eq!(chain_key(&dispensary("thrive-sahara", None)), "thrive");
    }

    #[test]
    fn test_independent_is_own_chain() {
        assert_eq!(chain_key(&dispensary("planet13", None)), "solo:planet13");
        assert_eq!(chain_key(&dispensary("unlisted", Some("  "))), "solo:unlisted");
    }
}
