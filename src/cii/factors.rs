//! CO2 emission factors (CF) per IMO guidelines for CII calculation.

/// Fuel-name fragment → CF, matched in order against lowercased fuel column
/// names. First match wins.
static IMO_FACTORS: &[(&str, f64)] = &[
    ("hfo", 3.114),
    ("lfo", 3.151),
    ("mgo", 3.206),
    ("mdo", 3.206),
    ("lng", 2.75),
    ("lpg_p", 3.0),
    ("lpg_b", 3.03),
    ("methanol", 1.375),
    ("ethanol", 1.913),
    ("ethane", 2.927),
];

/// Emission factor lookup, passed explicitly into the engine.
///
/// Rebuild (or [`EmissionFactors::from_entries`] with fresh data) to refresh;
/// there is no hidden process-wide table behind it.
#[derive(Debug, Clone)]
pub struct EmissionFactors {
    entries: Vec<(String, f64)>,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self::from_entries(
            IMO_FACTORS
                .iter()
                .map(|(fragment, cf)| (fragment.to_string(), *cf)),
        )
    }
}

impl EmissionFactors {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// CF for a fuel column name, 0.0 when the fuel type is not recognized.
    pub fn cf_for(&self, column: &str) -> f64 {
        let name = column.to_lowercase();
        self.entries
            .iter()
            .find(|(fragment, _)| name.contains(fragment.as_str()))
            .map_or(0.0, |(_, cf)| *cf)
    }
}
