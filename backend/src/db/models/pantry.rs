use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Where a pantry item is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    Fridge,
    Freezer,
    #[default]
    Pantry,
}

impl StorageLocation {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fridge" => Some(StorageLocation::Fridge),
            "freezer" => Some(StorageLocation::Freezer),
            "pantry" => Some(StorageLocation::Pantry),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageLocation::Fridge => "fridge",
            StorageLocation::Freezer => "freezer",
            StorageLocation::Pantry => "pantry",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PantryItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: Option<String>,
    pub location: StorageLocation,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePantryItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    pub category: Option<String>,
    #[serde(default)]
    pub location: StorageLocation,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePantryItem {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub location: Option<StorageLocation>,
    pub expiry_date: Option<NaiveDate>,
}

/// One entry of a bulk update: the item id and the fields to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PantryBulkUpdate {
    pub id: String,
    pub updates: UpdatePantryItem,
}

#[derive(Debug, Clone, Default)]
pub struct PantryFilters {
    pub location: Option<StorageLocation>,
    pub category: Option<String>,
    pub search: Option<String>,
    /// Only items expiring on or before this date.
    pub expiring_before: Option<NaiveDate>,
}

fn default_quantity() -> f64 {
    1.0
}
