// src/models/package.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageDuration {
    pub id: String,
    pub duration: String,
    pub price: Decimal,
}

// Produto administrado (pacote com durações e preços)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub durations: Vec<PackageDuration>,
}

impl Package {
    pub fn duration(&self, duration_id: &str) -> Option<&PackageDuration> {
        self.durations.iter().find(|d| d.id == duration_id)
    }
}
