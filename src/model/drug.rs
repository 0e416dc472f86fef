use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrugCategory {
    Antibiotics,
    Painkillers,
    Cardiovascular,
    Respiratory,
    Diabetes,
    Vitamins,
    Vaccines,
    Emergency,
    Other,
}

impl DrugCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrugCategory::Antibiotics => "antibiotics",
            DrugCategory::Painkillers => "painkillers",
            DrugCategory::Cardiovascular => "cardiovascular",
            DrugCategory::Respiratory => "respiratory",
            DrugCategory::Diabetes => "diabetes",
            DrugCategory::Vitamins => "vitamins",
            DrugCategory::Vaccines => "vaccines",
            DrugCategory::Emergency => "emergency",
            DrugCategory::Other => "other",
        }
    }
}

impl Default for DrugCategory {
    fn default() -> Self {
        DrugCategory::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrugUnit {
    Tablets,
    Capsules,
    Vials,
    Bottles,
    Boxes,
    Strips,
}

impl Default for DrugUnit {
    fn default() -> Self {
        DrugUnit::Tablets
    }
}

/// Named site that holds stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Location {
    CentralWarehouse,
    CityHospital,
    DistrictPharmacy,
    MobileUnit,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::CentralWarehouse => "central-warehouse",
            Location::CityHospital => "city-hospital",
            Location::DistrictPharmacy => "district-pharmacy",
            Location::MobileUnit => "mobile-unit",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "central-warehouse" => Ok(Location::CentralWarehouse),
            "city-hospital" => Ok(Location::CityHospital),
            "district-pharmacy" => Ok(Location::DistrictPharmacy),
            "mobile-unit" => Ok(Location::MobileUnit),
            other => Err(format!("Unknown location: {}", other)),
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::CentralWarehouse
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageCondition {
    RoomTemperature,
    Refrigerated,
    Frozen,
    Controlled,
}

impl Default for StorageCondition {
    fn default() -> Self {
        StorageCondition::RoomTemperature
    }
}

/// Stock label derived from quantity and the minimum threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn evaluate(quantity: i64, min_threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= min_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in-stock",
            StockStatus::LowStock => "low-stock",
            StockStatus::OutOfStock => "out-of-stock",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drug {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Human-readable code printed on labels and encoded in the QR payload.
    pub drug_id: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: DrugCategory,
    pub batch_no: String,
    pub quantity: i64,
    pub unit: DrugUnit,
    pub price: f64,
    pub manufacturer: String,
    pub supplier: String,
    pub manufacture_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub location: Location,
    pub min_threshold: i64,
    pub max_threshold: i64,
    pub storage_condition: StorageCondition,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub qr_code: Option<String>,
    pub stock_status: StockStatus,
    pub created_by: Option<ObjectId>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Drug {
    /// Recomputes `stock_status` from the current quantity and threshold.
    pub fn refresh_stock_status(&mut self) -> StockStatus {
        self.stock_status = StockStatus::evaluate(self.quantity, self.min_threshold);
        self.stock_status
    }

    /// Days left until expiry; zero or negative once expired.
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.days_to_expiry(today) <= 0
    }

    pub fn stock_value(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_boundaries() {
        assert_eq!(StockStatus::evaluate(0, 50), StockStatus::OutOfStock);
        assert_eq!(StockStatus::evaluate(1, 50), StockStatus::LowStock);
        assert_eq!(StockStatus::evaluate(50, 50), StockStatus::LowStock);
        assert_eq!(StockStatus::evaluate(51, 50), StockStatus::InStock);
        assert_eq!(StockStatus::evaluate(5, 0), StockStatus::InStock);
    }

    #[test]
    fn test_location_parsing_accepts_labels() {
        assert_eq!("Central Warehouse".parse::<Location>(), Ok(Location::CentralWarehouse));
        assert_eq!("mobile_unit".parse::<Location>(), Ok(Location::MobileUnit));
        assert!("moon-base".parse::<Location>().is_err());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(StockStatus::OutOfStock).unwrap(), "out-of-stock");
        assert_eq!(serde_json::to_value(Location::DistrictPharmacy).unwrap(), "district-pharmacy");
        assert_eq!(serde_json::to_value(StorageCondition::RoomTemperature).unwrap(), "room-temperature");
    }
}
