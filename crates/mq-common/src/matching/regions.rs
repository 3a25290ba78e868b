use std::collections::HashMap;

/// Canonical form used for all country comparisons: trimmed, lowercased,
/// with common aliases collapsed.
pub fn normalize_country(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let canonical = match lowered.as_str() {
        "usa" | "us" | "united states of america" => "united states",
        "uk" | "great britain" => "united kingdom",
        "uae" => "united arab emirates",
        "viet nam" => "vietnam",
        "korea" | "south korea" | "republic of korea" => "south korea",
        "ksa" => "saudi arabia",
        "png" => "papua new guinea",
        other => other,
    };

    Some(canonical.to_string())
}

/// Injected region-alias table: region name to member countries. The
/// geography scorer awards partial credit when investor and target countries
/// fall inside the same region without matching exactly.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    members: HashMap<String, Vec<String>>,
}

impl RegionTable {
    pub fn new(entries: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        let members = entries
            .into_iter()
            .map(|(region, countries)| {
                let countries = countries
                    .iter()
                    .filter_map(|c| normalize_country(c))
                    .collect();
                (region.trim().to_ascii_uppercase(), countries)
            })
            .collect();
        Self { members }
    }

    pub fn contains(&self, region: &str, country: &str) -> bool {
        let Some(country) = normalize_country(country) else {
            return false;
        };
        self.members
            .get(region.trim().to_ascii_uppercase().as_str())
            .is_some_and(|members| members.contains(&country))
    }

    /// Most specific region containing both countries, if any.
    pub fn shared_region(&self, a: &str, b: &str) -> Option<&str> {
        let a = normalize_country(a)?;
        let b = normalize_country(b)?;
        if a == b {
            return None;
        }
        let mut regions: Vec<_> = self.members.iter().collect();
        regions.sort_by_key(|(name, members)| (members.len(), name.as_str()));
        regions
            .into_iter()
            .find(|(_, members)| members.contains(&a) && members.contains(&b))
            .map(|(name, _)| name.as_str())
    }
}

/// Regions the deal desk actively sources in.
pub fn default_region_table() -> RegionTable {
    let entries = [
        (
            "ASEAN",
            vec![
                "Thailand", "Vietnam", "Indonesia", "Malaysia", "Philippines", "Singapore",
                "Myanmar", "Cambodia", "Laos", "Brunei",
            ],
        ),
        (
            "GCC",
            vec![
                "United Arab Emirates", "Saudi Arabia", "Qatar", "Kuwait", "Bahrain", "Oman",
            ],
        ),
        (
            "APAC",
            vec![
                "Japan", "South Korea", "China", "Taiwan", "Hong Kong", "Australia",
                "New Zealand", "Singapore", "Thailand", "Vietnam", "Indonesia", "Malaysia",
                "Philippines", "India",
            ],
        ),
        (
            "EU",
            vec![
                "Germany", "France", "Italy", "Spain", "Netherlands", "Belgium", "Austria",
                "Ireland", "Portugal", "Poland", "Sweden", "Denmark", "Finland",
            ],
        ),
        (
            "DACH",
            vec!["Germany", "Austria", "Switzerland"],
        ),
        (
            "NORTH_AMERICA",
            vec!["United States", "Canada", "Mexico"],
        ),
        (
            "LATAM",
            vec!["Brazil", "Mexico", "Argentina", "Chile", "Colombia", "Peru"],
        ),
    ];

    RegionTable::new(entries.into_iter().map(|(region, countries)| {
        (
            region.to_string(),
            countries.into_iter().map(str::to_string).collect(),
        )
    }))
}
