//! Row types and the closed telemetry column model.
//!
//! The sensor export header is fixed and externally defined. Every numeric
//! column the engine knows about is listed exactly once in
//! [`NUMERIC_COLUMNS`]; cleaning rules, storage binding, and aggregation all
//! go through the typed accessors generated from that list, so no runtime
//! string-built expression ever reaches the store.

use serde::Serialize;

/// Text (non-numeric) columns accepted in an upload.
pub const TEXT_COLUMNS: &[&str] = &["date", "time", "latitude", "longitude"];

/// Fuel consumption columns (actual, not accumulated) that contribute to the
/// per-day carbon intensity figure.
pub const CII_FUEL_COLUMNS: &[&str] = &[
    "me_hfo_act_cons",
    "me_mgo_act_cons",
    "blr_hfo_act_cons",
    "blr_mgo_act_cons",
    "dg_hfo_act_cons",
    "dg_mgo_act_cons",
];

macro_rules! telemetry_model {
    ($($col:ident),* $(,)?) => {
        /// One sensor sample. Numeric fields are `None` when the column was
        /// absent from the upload or the cell failed numeric coercion.
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct TelemetryRow {
            pub date: String,
            pub time: Option<String>,
            pub latitude: Option<String>,
            pub longitude: Option<String>,
            $(pub $col: Option<f64>,)*
        }

        /// One row per (vessel, date): the mean of that date's cleaned
        /// samples plus the engine-owned carbon metrics.
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct DailyAggregate {
            pub vessel_id: i64,
            pub date: chrono::NaiveDate,
            $(pub $col: Option<f64>,)*
            pub cii_temp: f64,
            pub cii: f64,
        }

        /// Every numeric telemetry column, in storage order. This is the
        /// allow-list: headers outside it (and [`TEXT_COLUMNS`]) are rejected.
        pub const NUMERIC_COLUMNS: &[&str] = &[$(stringify!($col)),*];

        impl TelemetryRow {
            pub fn numeric_value(&self, column: &str) -> Option<f64> {
                match column {
                    $(stringify!($col) => self.$col,)*
                    _ => None,
                }
            }

            /// Sets a numeric field by column name. Returns false for names
            /// outside the allow-list.
            pub fn set_numeric(&mut self, column: &str, value: Option<f64>) -> bool {
                match column {
                    $(stringify!($col) => { self.$col = value; true })*
                    _ => false,
                }
            }

            /// All numeric fields in [`NUMERIC_COLUMNS`] order, for
            /// column-name-matched bulk appends.
            pub fn numeric_values(&self) -> Vec<Option<f64>> {
                vec![$(self.$col),*]
            }
        }

        impl DailyAggregate {
            pub fn numeric_value(&self, column: &str) -> Option<f64> {
                match column {
                    $(stringify!($col) => self.$col,)*
                    _ => None,
                }
            }

            pub fn set_numeric(&mut self, column: &str, value: Option<f64>) -> bool {
                match column {
                    $(stringify!($col) => { self.$col = value; true })*
                    _ => false,
                }
            }

            pub fn numeric_values(&self) -> Vec<Option<f64>> {
                vec![$(self.$col),*]
            }
        }
    };
}

telemetry_model! {
    speed_ground, speed_water, draft, heel, trim,
    draught_astern, draught_bow, draught_mid_left, draught_mid_right,
    me_rpm, wind_speed, wind_direction, slip_ratio,
    me_fuel_consumption_nmile, me_fuel_consumption_kwh,
    me_shaft_power, me_torque,
    me_hfo_act_cons, me_mgo_act_cons, me_hfo_acc_cons,
    blr_hfo_act_cons, blr_mgo_act_cons,
    dg_hfo_act_cons, dg_mgo_act_cons, dg_hfo_acc_cons, dg_mgo_acc_cons,
    fcm_fo_density, blr_fo_density, blr_mgo_density, dg_fo_density, dg_mgo_density,
    me_fo_in_temp, blr_fo_in_temp, blr_mgo_in_temp, dg_fo_in_temp, dg_mgo_in_temp,
    dg1_power, dg2_power, dg3_power,
    ship_nmile, true_h, total_distance, water_depth, rudder_angle,
    water_temp, swell_height,
}

/// True when the name is an accepted upload header.
pub fn is_known_column(name: &str) -> bool {
    TEXT_COLUMNS.contains(&name) || NUMERIC_COLUMNS.contains(&name)
}
