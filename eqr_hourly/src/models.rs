use serde::{Deserialize, Serialize};
use std::fmt;

/// Rate units reported in the EQR `rate_units` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RateUnit {
    DollarsPerKv,
    DollarsPerKva,
    DollarsPerKvr,
    DollarsPerKw,
    DollarsPerKwh,
    DollarsPerKwDay,
    DollarsPerKwMonth,
    DollarsPerKwWeek,
    DollarsPerKwYear,
    DollarsPerMw,
    DollarsPerMwh,
    DollarsPerMwDay,
    DollarsPerMwMonth,
    DollarsPerMwWeek,
    DollarsPerMwYear,
    DollarsPerMvarYear,
    DollarsPerRkva,
    Cents,
    CentsPerKvr,
    CentsPerKwh,
    FlatRate,
    Other(String),
}

impl RateUnit {
    pub fn code(&self) -> &str {
        match self {
            RateUnit::DollarsPerKv => "$/KV",
            RateUnit::DollarsPerKva => "$/KVA",
            RateUnit::DollarsPerKvr => "$/KVR",
            RateUnit::DollarsPerKw => "$/KW",
            RateUnit::DollarsPerKwh => "$/KWH",
            RateUnit::DollarsPerKwDay => "$/KW-DAY",
            RateUnit::DollarsPerKwMonth => "$/KW-MO",
            RateUnit::DollarsPerKwWeek => "$/KW-WK",
            RateUnit::DollarsPerKwYear => "$/KW-YR",
            RateUnit::DollarsPerMw => "$/MW",
            RateUnit::DollarsPerMwh => "$/MWH",
            RateUnit::DollarsPerMwDay => "$/MW-DAY",
            RateUnit::DollarsPerMwMonth => "$/MW-MO",
            RateUnit::DollarsPerMwWeek => "$/MW-WK",
            RateUnit::DollarsPerMwYear => "$/MW-YR",
            RateUnit::DollarsPerMvarYear => "$/MVAR-YR",
            RateUnit::DollarsPerRkva => "$/RKVA",
            RateUnit::Cents => "CENTS",
            RateUnit::CentsPerKvr => "CENTS/KVR",
            RateUnit::CentsPerKwh => "CENTS/KWH",
            RateUnit::FlatRate => "FLAT RATE",
            RateUnit::Other(code) => code,
        }
    }
}

impl From<String> for RateUnit {
    fn from(code: String) -> Self {
        match code.as_str() {
            "$/KV" => RateUnit::DollarsPerKv,
            "$/KVA" => RateUnit::DollarsPerKva,
            "$/KVR" => RateUnit::DollarsPerKvr,
            "$/KW" => RateUnit::DollarsPerKw,
            "$/KWH" => RateUnit::DollarsPerKwh,
            "$/KW-DAY" => RateUnit::DollarsPerKwDay,
            "$/KW-MO" => RateUnit::DollarsPerKwMonth,
            "$/KW-WK" => RateUnit::DollarsPerKwWeek,
            "$/KW-YR" => RateUnit::DollarsPerKwYear,
            "$/MW" => RateUnit::DollarsPerMw,
            "$/MWH" => RateUnit::DollarsPerMwh,
            "$/MW-DAY" => RateUnit::DollarsPerMwDay,
            "$/MW-MO" => RateUnit::DollarsPerMwMonth,
            "$/MW-WK" => RateUnit::DollarsPerMwWeek,
            "$/MW-YR" => RateUnit::DollarsPerMwYear,
            "$/MVAR-YR" => RateUnit::DollarsPerMvarYear,
            "$/RKVA" => RateUnit::DollarsPerRkva,
            "CENTS" => RateUnit::Cents,
            "CENTS/KVR" => RateUnit::CentsPerKvr,
            "CENTS/KWH" => RateUnit::CentsPerKwh,
            "FLAT RATE" => RateUnit::FlatRate,
            _ => RateUnit::Other(code),
        }
    }
}

impl From<RateUnit> for String {
    fn from(unit: RateUnit) -> Self {
        match unit {
            RateUnit::Other(code) => code,
            known => known.code().to_string(),
        }
    }
}

impl fmt::Display for RateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// `increment_peaking_name` classification of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PeakingClass {
    FullPeriod,
    OffPeak,
    Peak,
    NotApplicable,
    Other(String),
}

impl PeakingClass {
    pub fn code(&self) -> &str {
        match self {
            PeakingClass::FullPeriod => "FP",
            PeakingClass::OffPeak => "OP",
            PeakingClass::Peak => "P",
            PeakingClass::NotApplicable => "N/A",
            PeakingClass::Other(code) => code,
        }
    }
}

impl From<String> for PeakingClass {
    fn from(code: String) -> Self {
        match code.as_str() {
            "FP" => PeakingClass::FullPeriod,
            "OP" => PeakingClass::OffPeak,
            "P" => PeakingClass::Peak,
            "N/A" => PeakingClass::NotApplicable,
            _ => PeakingClass::Other(code),
        }
    }
}

impl From<PeakingClass> for String {
    fn from(class: PeakingClass) -> Self {
        match class {
            PeakingClass::Other(code) => code,
            known => known.code().to_string(),
        }
    }
}

impl fmt::Display for PeakingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of an EQR `transactions.csv` file.
///
/// Field order matches the column order of the filing, so the record can be
/// read with `csv::Reader::deserialize` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_unique_id: String,
    pub seller_company_name: String,
    pub customer_company_name: String,
    pub ferc_tariff_reference: String,
    pub contract_service_agreement: String,
    pub transaction_unique_identifier: String,
    pub transaction_begin_date: String, // YYYYMMDDHHMM
    pub transaction_end_date: String,   // YYYYMMDDHHMM
    pub trade_date: Option<u32>,
    pub exchange_brokerage_service: String,
    pub type_of_rate: String,
    pub time_zone: String,
    pub point_of_delivery_balancing_authority: String,
    pub point_of_delivery_specific_location: String,
    pub class_name: String,
    pub term_name: String,
    pub increment_name: String,
    pub increment_peaking_name: Option<PeakingClass>,
    pub product_name: String,
    pub transaction_quantity: f64,
    pub price: f64,
    pub rate_units: Option<RateUnit>,
    pub standardized_quantity: Option<f64>,
    pub standardized_price: Option<f64>,
    pub total_transmission_charge: Option<f64>,
    pub total_transaction_charge: Option<f64>,
}

impl TransactionRecord {
    pub fn is_mwh_rated(&self) -> bool {
        self.rate_units == Some(RateUnit::DollarsPerMwh)
    }

    /// Backfill the standardized fields from the reported ones.
    ///
    /// Returns a new record; `self` is left untouched.
    pub fn normalized(&self) -> TransactionRecord {
        let mut standardized_quantity = self.standardized_quantity.unwrap_or(0.0);
        if standardized_quantity == 0.0 && self.transaction_quantity != 0.0 && self.is_mwh_rated() {
            standardized_quantity = self.transaction_quantity;
        }

        let standardized_price = match self.standardized_price {
            None if self.is_mwh_rated() => Some(self.price),
            other => other,
        };

        TransactionRecord {
            standardized_quantity: Some(standardized_quantity),
            standardized_price,
            ..self.clone()
        }
    }
}

/// Column header of hourly output, in `HourlyRecord` field order.
pub const HOURLY_COLUMNS: [&str; 27] = [
    "transaction_unique_id",
    "seller_company_name",
    "customer_company_name",
    "ferc_tariff_reference",
    "contract_service_agreement",
    "transaction_unique_identifier",
    "transaction_begin_date",
    "transaction_end_date",
    "trade_date",
    "exchange_brokerage_service",
    "type_of_rate",
    "time_zone",
    "point_of_delivery_balancing_authority",
    "point_of_delivery_specific_location",
    "class_name",
    "term_name",
    "increment_name",
    "increment_peaking_name",
    "product_name",
    "transaction_quantity",
    "price",
    "rate_units",
    "standardized_quantity",
    "standardized_price",
    "total_transmission_charge",
    "total_transaction_charge",
    "hour_duration",
];

/// One clock-hour slice of a transaction.
///
/// Carries the full transaction column set, with the begin/end columns
/// holding the hour window formatted as `YYYY/MM/DD HH:MM`, followed by
/// `hour_duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    pub transaction_unique_id: String,
    pub seller_company_name: String,
    pub customer_company_name: String,
    pub ferc_tariff_reference: String,
    pub contract_service_agreement: String,
    pub transaction_unique_identifier: String,
    pub transaction_begin_date: String,
    pub transaction_end_date: String,
    pub trade_date: Option<u32>,
    pub exchange_brokerage_service: String,
    pub type_of_rate: String,
    pub time_zone: String,
    pub point_of_delivery_balancing_authority: String,
    pub point_of_delivery_specific_location: String,
    pub class_name: String,
    pub term_name: String,
    pub increment_name: String,
    pub increment_peaking_name: Option<PeakingClass>,
    pub product_name: String,
    pub transaction_quantity: f64,
    pub price: f64,
    pub rate_units: Option<RateUnit>,
    pub standardized_quantity: Option<f64>,
    pub standardized_price: Option<f64>,
    pub total_transmission_charge: Option<f64>,
    pub total_transaction_charge: Option<f64>,
    pub hour_duration: u32,
}

/// The per-hour values that differ between slices of the same transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct HourSlice {
    pub hour_begin: String,
    pub hour_end: String,
    pub transaction_quantity: f64,
    pub standardized_quantity: Option<f64>,
    pub total_transaction_charge: Option<f64>,
}

impl HourlyRecord {
    pub fn from_slice(tx: &TransactionRecord, slice: HourSlice, hour_duration: u32) -> Self {
        Self {
            transaction_unique_id: tx.transaction_unique_id.clone(),
            seller_company_name: tx.seller_company_name.clone(),
            customer_company_name: tx.customer_company_name.clone(),
            ferc_tariff_reference: tx.ferc_tariff_reference.clone(),
            contract_service_agreement: tx.contract_service_agreement.clone(),
            transaction_unique_identifier: tx.transaction_unique_identifier.clone(),
            transaction_begin_date: slice.hour_begin,
            transaction_end_date: slice.hour_end,
            trade_date: tx.trade_date,
            exchange_brokerage_service: tx.exchange_brokerage_service.clone(),
            type_of_rate: tx.type_of_rate.clone(),
            time_zone: tx.time_zone.clone(),
            point_of_delivery_balancing_authority: tx.point_of_delivery_balancing_authority.clone(),
            point_of_delivery_specific_location: tx.point_of_delivery_specific_location.clone(),
            class_name: tx.class_name.clone(),
            term_name: tx.term_name.clone(),
            increment_name: tx.increment_name.clone(),
            increment_peaking_name: tx.increment_peaking_name.clone(),
            product_name: tx.product_name.clone(),
            transaction_quantity: slice.transaction_quantity,
            price: tx.price,
            rate_units: tx.rate_units.clone(),
            standardized_quantity: slice.standardized_quantity,
            standardized_price: tx.standardized_price,
            total_transmission_charge: tx.total_transmission_charge,
            total_transaction_charge: slice.total_transaction_charge,
            hour_duration,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A Mid-C energy trade, the shape most filings in the hub filter have.
    pub fn transaction(begin: &str, end: &str, quantity: f64) -> TransactionRecord {
        TransactionRecord {
            transaction_unique_id: "T1".to_string(),
            seller_company_name: "Seller Energy LLC".to_string(),
            customer_company_name: "Buyer Power Co".to_string(),
            ferc_tariff_reference: "MBR Tariff".to_string(),
            contract_service_agreement: "WSPP".to_string(),
            transaction_unique_identifier: "ABC-123".to_string(),
            transaction_begin_date: begin.to_string(),
            transaction_end_date: end.to_string(),
            trade_date: Some(20221230),
            exchange_brokerage_service: "ICE".to_string(),
            type_of_rate: "Fixed".to_string(),
            time_zone: "PP".to_string(),
            point_of_delivery_balancing_authority: "HUB".to_string(),
            point_of_delivery_specific_location: "MID-COLUMBIA (MID-C)".to_string(),
            class_name: "F".to_string(),
            term_name: "ST".to_string(),
            increment_name: "H".to_string(),
            increment_peaking_name: None,
            product_name: "ENERGY".to_string(),
            transaction_quantity: quantity,
            price: 50.0,
            rate_units: Some(RateUnit::DollarsPerMwh),
            standardized_quantity: None,
            standardized_price: None,
            total_transmission_charge: Some(0.0),
            total_transaction_charge: Some(quantity * 50.0),
        }
    }
}
