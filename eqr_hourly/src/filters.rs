use crate::models::TransactionRecord;
use std::fmt;

/// Trade hubs kept by the energy filter.
pub const ENERGY_HUB_LOCATIONS: [&str; 2] = ["MID-COLUMBIA (MID-C)", "COB"];

/// Products kept by the ancillary filter.
pub const ANCILLARY_PRODUCTS: [&str; 3] = [
    "CAPACITY",
    "REGULATION & FREQUENCY RESPONSE",
    "PRIMARY FREQUENCY RESPONSE",
];

/// Product/location categories a quarter can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductFilter {
    /// Energy delivered to the Mid-C or COB trade hub.
    EnergyHubs,
    Ancillary,
}

impl ProductFilter {
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        let product = record.product_name.to_uppercase();
        match self {
            ProductFilter::EnergyHubs => {
                let location = record.point_of_delivery_specific_location.to_uppercase();
                ENERGY_HUB_LOCATIONS.contains(&location.as_str())
                    && record.point_of_delivery_balancing_authority.to_uppercase() == "HUB"
                    && product == "ENERGY"
            }
            ProductFilter::Ancillary => ANCILLARY_PRODUCTS.contains(&product.as_str()),
        }
    }

    /// Keep the matching records, preserving order.
    pub fn apply(&self, records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }

    /// Category name used in output file names.
    pub fn label(&self) -> &'static str {
        match self {
            ProductFilter::EnergyHubs => "energy",
            ProductFilter::Ancillary => "ancillary",
        }
    }
}

impl fmt::Display for ProductFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::transaction;

    #[test]
    fn test_energy_hub_filter() {
        let mut tx = transaction("202301010000", "202301010100", 1.0);
        assert!(ProductFilter::EnergyHubs.matches(&tx));

        tx.point_of_delivery_specific_location = "cob".to_string();
        tx.point_of_delivery_balancing_authority = "Hub".to_string();
        tx.product_name = "Energy".to_string();
        assert!(ProductFilter::EnergyHubs.matches(&tx));

        tx.point_of_delivery_specific_location = "PALO VERDE".to_string();
        assert!(!ProductFilter::EnergyHubs.matches(&tx));
    }

    #[test]
    fn test_energy_filter_requires_hub_delivery() {
        let mut tx = transaction("202301010000", "202301010100", 1.0);
        tx.point_of_delivery_balancing_authority = "BPAT".to_string();
        assert!(!ProductFilter::EnergyHubs.matches(&tx));
    }

    #[test]
    fn test_ancillary_filter() {
        let mut tx = transaction("202301010000", "202301010100", 1.0);
        assert!(!ProductFilter::Ancillary.matches(&tx));

        tx.product_name = "Regulation & Frequency Response".to_string();
        assert!(ProductFilter::Ancillary.matches(&tx));
        // location is irrelevant for ancillary products
        tx.point_of_delivery_specific_location = "PALO VERDE".to_string();
        assert!(ProductFilter::Ancillary.matches(&tx));
    }

    #[test]
    fn test_apply_keeps_order() {
        let mut other = transaction("202301010000", "202301010100", 2.0);
        other.product_name = "CAPACITY".to_string();
        let mut second = transaction("202301010100", "202301010200", 3.0);
        second.transaction_unique_id = "T2".to_string();

        let kept = ProductFilter::EnergyHubs.apply(vec![
            transaction("202301010000", "202301010100", 1.0),
            other,
            second,
        ]);

        let ids: Vec<_> = kept.iter().map(|r| r.transaction_unique_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
    }
}
