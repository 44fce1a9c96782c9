//! Reference curve & rating engine.
//!
//! Pure functions over the IMO ship categories: required CII per
//! category/year, the four rating boundaries, and the A–E classification.
//! Values follow MEPC guidelines; categories with a zero coefficient or zero
//! capacity are unrateable and classify as "N/A" instead of erroring.

use serde::Serialize;

/// The closed set of rateable ship categories and their registry codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipCategory {
    BulkCarrier,            // I001
    GasCarrier,             // I002
    Tanker,                 // I003
    ContainerShip,          // I004
    GeneralCargo,           // I005
    RefrigeratedCargo,      // I006
    CombinationCarrier,     // I007
    LngCarrier,             // I008
    VehicleCarrier,         // I009
    RoRoCargo,              // I010
    RoRoPassenger,          // I011
    RoRoPassengerHighSpeed, // I011.1
    CruisePassenger,        // I012
}

impl ShipCategory {
    pub const ALL: [ShipCategory; 13] = [
        Self::BulkCarrier,
        Self::GasCarrier,
        Self::Tanker,
        Self::ContainerShip,
        Self::GeneralCargo,
        Self::RefrigeratedCargo,
        Self::CombinationCarrier,
        Self::LngCarrier,
        Self::VehicleCarrier,
        Self::RoRoCargo,
        Self::RoRoPassenger,
        Self::RoRoPassengerHighSpeed,
        Self::CruisePassenger,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "I001" => Self::BulkCarrier,
            "I002" => Self::GasCarrier,
            "I003" => Self::Tanker,
            "I004" => Self::ContainerShip,
            "I005" => Self::GeneralCargo,
            "I006" => Self::RefrigeratedCargo,
            "I007" => Self::CombinationCarrier,
            "I008" => Self::LngCarrier,
            "I009" => Self::VehicleCarrier,
            "I010" => Self::RoRoCargo,
            "I011" => Self::RoRoPassenger,
            "I011.1" => Self::RoRoPassengerHighSpeed,
            "I012" => Self::CruisePassenger,
            _ => return None,
        })
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::BulkCarrier => "I001",
            Self::GasCarrier => "I002",
            Self::Tanker => "I003",
            Self::ContainerShip => "I004",
            Self::GeneralCargo => "I005",
            Self::RefrigeratedCargo => "I006",
            Self::CombinationCarrier => "I007",
            Self::LngCarrier => "I008",
            Self::VehicleCarrier => "I009",
            Self::RoRoCargo => "I010",
            Self::RoRoPassenger => "I011",
            Self::RoRoPassengerHighSpeed => "I011.1",
            Self::CruisePassenger => "I012",
        }
    }
}

/// Capacity and power-law coefficients with tonnage branching applied.
struct RefParams {
    capacity: f64,
    a: f64,
    c: f64,
}

fn reference_params(category: ShipCategory, dwt: f64, gt: f64) -> RefParams {
    use ShipCategory::*;
    match category {
        BulkCarrier => RefParams {
            capacity: dwt.min(279_000.0),
            a: 4745.0,
            c: 0.622,
        },
        GasCarrier => {
            if dwt >= 65_000.0 {
                RefParams { capacity: dwt, a: 14405e7, c: 2.071 }
            } else {
                RefParams { capacity: dwt, a: 8104.0, c: 0.639 }
            }
        }
        Tanker => RefParams { capacity: dwt, a: 5247.0, c: 0.610 },
        ContainerShip => RefParams { capacity: dwt, a: 1984.0, c: 0.489 },
        GeneralCargo => {
            if dwt >= 20_000.0 {
                RefParams { capacity: dwt, a: 31948.0, c: 0.792 }
            } else {
                RefParams { capacity: dwt, a: 588.0, c: 0.3885 }
            }
        }
        RefrigeratedCargo => RefParams { capacity: dwt, a: 4600.0, c: 0.557 },
        CombinationCarrier => RefParams { capacity: dwt, a: 5119.0, c: 0.622 },
        LngCarrier => {
            if dwt >= 100_000.0 {
                RefParams { capacity: dwt, a: 9.827, c: 0.000 }
            } else if dwt >= 65_000.0 {
                RefParams { capacity: dwt, a: 14479e10, c: 2.673 }
            } else {
                // Below 65 000 DWT the regulation fixes the capacity basis.
                RefParams { capacity: 65_000.0, a: 14779e10, c: 2.673 }
            }
        }
        VehicleCarrier => RefParams {
            capacity: if gt >= 30_000.0 { gt.min(57_700.0) } else { gt },
            a: 3627.0,
            c: 0.590,
        },
        RoRoCargo => RefParams { capacity: gt, a: 1967.0, c: 0.485 },
        RoRoPassenger => RefParams { capacity: gt, a: 2023.0, c: 0.460 },
        RoRoPassengerHighSpeed => RefParams { capacity: gt, a: 4196.0, c: 0.460 },
        CruisePassenger => RefParams { capacity: gt, a: 930.0, c: 0.383 },
    }
}

/// The dd boundary multipliers (d1, d2, d3, d4), strictly increasing.
fn dd_vector(category: ShipCategory, dwt: f64) -> [f64; 4] {
    use ShipCategory::*;
    match category {
        BulkCarrier => [0.86, 0.94, 1.06, 1.18],
        GasCarrier => {
            if dwt >= 65_000.0 {
                [0.81, 0.91, 1.12, 1.44]
            } else {
                [0.85, 0.95, 1.06, 1.25]
            }
        }
        Tanker => [0.82, 0.93, 1.08, 1.28],
        ContainerShip => [0.83, 0.94, 1.07, 1.19],
        GeneralCargo => [0.83, 0.94, 1.06, 1.19],
        RefrigeratedCargo => [0.78, 0.91, 1.07, 1.20],
        CombinationCarrier => [0.87, 0.96, 1.06, 1.14],
        LngCarrier => {
            if dwt >= 100_000.0 {
                [0.89, 0.98, 1.06, 1.13]
            } else {
                [0.78, 0.92, 1.10, 1.37]
            }
        }
        VehicleCarrier => [0.86, 0.94, 1.06, 1.16],
        RoRoCargo => [0.76, 0.89, 1.08, 1.27],
        RoRoPassenger | RoRoPassengerHighSpeed => [0.76, 0.92, 1.14, 1.30],
        CruisePassenger => [0.87, 0.95, 1.06, 1.16],
    }
}

/// Annual efficiency reduction factor z. Years outside the table get no
/// reduction; that is the defined behavior, not a fallback.
pub fn reduction_factor(year: i32) -> f64 {
    match year {
        2019 => 0.00,
        2020 => 0.01,
        2021 => 0.02,
        2022 => 0.03,
        2023 => 0.05,
        2024 => 0.07,
        2025 => 0.09,
        2026 => 0.11,
        2027 => 0.13625,
        2028 => 0.16250,
        2029 => 0.18875,
        2030 => 0.21500,
        _ => 0.0,
    }
}

/// Required CII for a category in a given year: `a * capacity^-c * (1 - z)`.
/// 0.0 marks an unrateable combination (zero coefficient or capacity).
pub fn required_cii(year: i32, category: ShipCategory, dwt: f64, gt: f64) -> f64 {
    let RefParams { capacity, a, c } = reference_params(category, dwt, gt);
    if a == 0.0 || capacity == 0.0 {
        return 0.0;
    }
    let reference = a * capacity.powf(-c);
    reference * (1.0 - reduction_factor(year))
}

/// Rating band boundaries: required CII scaled by the dd vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Boundaries {
    pub superior: f64,
    pub lower: f64,
    pub upper: f64,
    pub inferior: f64,
}

pub fn boundaries(year: i32, category: ShipCategory, dwt: f64, gt: f64) -> Boundaries {
    let required = required_cii(year, category, dwt, gt);
    let [d1, d2, d3, d4] = dd_vector(category, dwt);
    Boundaries {
        superior: required * d1,
        lower: required * d2,
        upper: required * d3,
        inferior: required * d4,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    A,
    B,
    C,
    D,
    E,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
            Rating::E => "E",
            Rating::NotApplicable => "N/A",
        };
        f.write_str(s)
    }
}

/// A classification result: the rating plus the boundaries it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub rating: Rating,
    pub required: f64,
    pub boundaries: Boundaries,
}

/// Classifies an observed CII value against the reference curve.
///
/// Unknown ship-type codes and unrateable combinations yield "N/A" with zero
/// boundaries; this never errors.
pub fn classify(value: f64, year: i32, ship_type_code: &str, dwt: f64, gt: f64) -> Classification {
    let Some(category) = ShipCategory::from_code(ship_type_code) else {
        return Classification {
            rating: Rating::NotApplicable,
            required: 0.0,
            boundaries: Boundaries { superior: 0.0, lower: 0.0, upper: 0.0, inferior: 0.0 },
        };
    };

    let required = required_cii(year, category, dwt, gt);
    let bounds = boundaries(year, category, dwt, gt);
    if required <= 0.0 {
        return Classification {
            rating: Rating::NotApplicable,
            required,
            boundaries: bounds,
        };
    }

    let rating = if value <= bounds.superior {
        Rating::A
    } else if value <= bounds.lower {
        Rating::B
    } else if value <= bounds.upper {
        Rating::C
    } else if value <= bounds.inferior {
        Rating::D
    } else {
        Rating::E
    };

    Classification { rating, required, boundaries: bounds }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every category with each of its tonnage branches exercised.
    const BRANCH_CASES: &[(&str, f64, f64)] = &[
        ("I001", 50_000.0, 0.0),
        ("I001", 320_000.0, 0.0),
        ("I002", 45_000.0, 0.0),
        ("I002", 80_000.0, 0.0),
        ("I003", 110_000.0, 0.0),
        ("I004", 150_000.0, 0.0),
        ("I005", 15_000.0, 0.0),
        ("I005", 30_000.0, 0.0),
        ("I006", 8_000.0, 0.0),
        ("I007", 80_000.0, 0.0),
        ("I008", 50_000.0, 0.0),
        ("I008", 80_000.0, 0.0),
        ("I008", 120_000.0, 0.0),
        ("I009", 0.0, 20_000.0),
        ("I009", 0.0, 60_000.0),
        ("I010", 0.0, 30_000.0),
        ("I011", 0.0, 40_000.0),
        ("I011.1", 0.0, 25_000.0),
        ("I012", 0.0, 100_000.0),
    ];

    #[test]
    fn test_all_codes_round_trip() {
        for category in ShipCategory::ALL {
            assert_eq!(ShipCategory::from_code(category.code()), Some(category));
        }
        assert_eq!(ShipCategory::from_code("I999"), None);
    }

    #[test]
    fn test_boundaries_strictly_increasing_for_every_branch() {
        for &(code, dwt, gt) in BRANCH_CASES {
            let category = ShipCategory::from_code(code).unwrap();
            let required = required_cii(2023, category, dwt, gt);
            assert!(required > 0.0, "{code} dwt={dwt} gt={gt}");

            let b = boundaries(2023, category, dwt, gt);
            assert!(
                b.superior < b.lower && b.lower < b.upper && b.upper < b.inferior,
                "{code} dwt={dwt} gt={gt}: {b:?}"
            );
        }
    }

    #[test]
    fn test_half_required_is_a_and_double_required_is_e() {
        for &(code, dwt, gt) in BRANCH_CASES {
            let category = ShipCategory::from_code(code).unwrap();
            let required = required_cii(2023, category, dwt, gt);
            assert_eq!(classify(required * 0.5, 2023, code, dwt, gt).rating, Rating::A, "{code}");
            assert_eq!(classify(required * 2.0, 2023, code, dwt, gt).rating, Rating::E, "{code}");
        }
    }

    #[test]
    fn test_unknown_code_is_not_applicable() {
        for value in [0.0, 1.0, 1e6] {
            let result = classify(value, 2023, "UNKNOWN", 50_000.0, 30_000.0);
            assert_eq!(result.rating, Rating::NotApplicable);
            assert_eq!(result.required, 0.0);
        }
    }

    #[test]
    fn test_zero_capacity_is_not_applicable() {
        // GT-based category with no gross tonnage supplied.
        let result = classify(5.0, 2023, "I012", 50_000.0, 0.0);
        assert_eq!(result.rating, Rating::NotApplicable);
    }

    #[test]
    fn test_bulk_carrier_capacity_cap() {
        // Above the cap both vessels rate against the same curve.
        let at_cap = required_cii(2023, ShipCategory::BulkCarrier, 279_000.0, 0.0);
        let above = required_cii(2023, ShipCategory::BulkCarrier, 400_000.0, 0.0);
        assert_eq!(at_cap, above);
    }

    #[test]
    fn test_vehicle_carrier_gt_cap_applies_only_above_threshold() {
        let capped = required_cii(2023, ShipCategory::VehicleCarrier, 0.0, 60_000.0);
        let at_cap = required_cii(2023, ShipCategory::VehicleCarrier, 0.0, 57_700.0);
        let small = required_cii(2023, ShipCategory::VehicleCarrier, 0.0, 20_000.0);
        assert_eq!(capped, at_cap);
        assert!(small > at_cap);
    }

    #[test]
    fn test_gas_carrier_branches_use_different_curves() {
        let below = required_cii(2019, ShipCategory::GasCarrier, 64_999.0, 0.0);
        let above = required_cii(2019, ShipCategory::GasCarrier, 65_000.0, 0.0);
        assert!((below - 8104.0 * 64_999.0f64.powf(-0.639)).abs() < 1e-9);
        assert!((above - 14405e7 * 65_000.0f64.powf(-2.071)).abs() < 1e-9);
    }

    #[test]
    fn test_reduction_factor_table() {
        assert_eq!(reduction_factor(2019), 0.0);
        assert_eq!(reduction_factor(2023), 0.05);
        assert_eq!(reduction_factor(2030), 0.215);
        // Outside the table: no reduction, by definition.
        assert_eq!(reduction_factor(2018), 0.0);
        assert_eq!(reduction_factor(2031), 0.0);
    }

    #[test]
    fn test_year_reduction_shrinks_required() {
        let base = required_cii(2019, ShipCategory::Tanker, 100_000.0, 0.0);
        let reduced = required_cii(2026, ShipCategory::Tanker, 100_000.0, 0.0);
        assert!((reduced - base * 0.89).abs() < 1e-9);
    }

    #[test]
    fn test_worked_example_bulk_carrier_rates_d() {
        // a=4745, c=0.622, capacity capped at 279000, year 2023 (z=5%).
        let required = required_cii(2023, ShipCategory::BulkCarrier, 279_000.0, 0.0);
        let expected = 4745.0 * 279_000.0f64.powf(-0.622) * 0.95;
        assert!((required - expected).abs() < 1e-9);
        assert!(required > 0.0);

        // required*1.1 sits between d3=1.06 and d4=1.18.
        let result = classify(required * 1.1, 2023, "I001", 279_000.0, 0.0);
        assert_eq!(result.rating, Rating::D);
        assert!(result.boundaries.upper < required * 1.1);
        assert!(required * 1.1 <= result.boundaries.inferior);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let b = boundaries(2023, ShipCategory::Tanker, 100_000.0, 0.0);
        assert_eq!(classify(b.superior, 2023, "I003", 100_000.0, 0.0).rating, Rating::A);
        assert_eq!(classify(b.lower, 2023, "I003", 100_000.0, 0.0).rating, Rating::B);
        assert_eq!(classify(b.upper, 2023, "I003", 100_000.0, 0.0).rating, Rating::C);
        assert_eq!(classify(b.inferior, 2023, "I003", 100_000.0, 0.0).rating, Rating::D);
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(Rating::A.to_string(), "A");
        assert_eq!(Rating::NotApplicable.to_string(), "N/A");
    }
}
