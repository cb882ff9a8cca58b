//! Medicine catalog, patient cart and self-service medicine orders.
//!
//! Orders are independent of prescriptions: they do not decrement stock and are never
//! reconciled with what a doctor prescribed.

use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use klinik_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category filter value that matches every medicine.
pub const ALL_CATEGORIES: &str = "All";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: RecordId,
    pub name: String,
    pub category: String,
    /// Unit price in whole rupiah.
    pub price: u64,
    pub in_stock: bool,
    pub stock: u32,
    pub description: Option<String>,
}

impl Medicine {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: u64,
        in_stock: bool,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: klinik_uuid::issue_identifier(),
            name: name.into(),
            category: category.into(),
            price,
            in_stock,
            stock: 0,
            description: Some(description.into()),
        }
    }
}

/// The catalog installed into an empty store.
pub fn default_catalog() -> Vec<Medicine> {
    vec![
        Medicine::new("Paracetamol 500mg", "Pain Relief", 5, true, "For fever and mild pain"),
        Medicine::new("Ibuprofen 400mg", "Pain Relief", 8, true, "Anti-inflammatory pain relief"),
        Medicine::new("Amoxicillin 250mg", "Antibiotic", 15, true, "Broad-spectrum antibiotic"),
        Medicine::new("Cetirizine 10mg", "Allergy", 6, true, "Antihistamine for allergies"),
        Medicine::new("Omeprazole 20mg", "Digestive", 12, true, "Reduces stomach acid"),
        Medicine::new("Loratadine 10mg", "Allergy", 7, false, "24-hour allergy relief"),
        Medicine::new("Vitamin C 1000mg", "Supplement", 10, true, "Immune system support"),
        Medicine::new("Cough Syrup", "Cold & Flu", 9, true, "Relieves cough and throat irritation"),
    ]
}

/// Catalog search: free text over name and description, plus an exact category.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub text: Option<String>,
    pub category: Option<String>,
}

impl CatalogQuery {
    pub fn matches(&self, medicine: &Medicine) -> bool {
        let text_ok = match self.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => {
                let needle = text.to_lowercase();
                medicine.name.to_lowercase().contains(&needle)
                    || medicine
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
        };
        let category_ok = match self.category.as_deref().map(str::trim) {
            None | Some("") | Some(ALL_CATEGORIES) => true,
            Some(category) => medicine.category == category,
        };
        text_ok && category_ok
    }

    pub fn apply(&self, medicines: Vec<Medicine>) -> Vec<Medicine> {
        medicines.into_iter().filter(|m| self.matches(m)).collect()
    }
}

/// Distinct categories, sorted.
pub fn categories(medicines: &[Medicine]) -> Vec<String> {
    let mut out: Vec<String> = medicines.iter().map(|m| m.category.clone()).collect();
    out.sort();
    out.dedup();
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartLine {
    pub medicine: Medicine,
    pub quantity: u32,
}

/// A patient's cart before submission. Purely local state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit; adding a medicine already in the cart bumps its quantity.
    pub fn add(&mut self, medicine: &Medicine) -> ClinicResult<()> {
        self.add_quantity(medicine, 1)
    }

    pub fn add_quantity(&mut self, medicine: &Medicine, quantity: u32) -> ClinicResult<()> {
        if !medicine.in_stock {
            return Err(ClinicError::InvalidInput(format!(
                "{} is out of stock",
                medicine.name
            )));
        }
        if quantity == 0 {
            return Err(ClinicError::InvalidInput(
                "quantity must be at least 1".into(),
            ));
        }
        match self.lines.iter_mut().find(|l| l.medicine.id == medicine.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine {
                medicine: medicine.clone(),
                quantity,
            }),
        }
        Ok(())
    }

    pub fn remove(&mut self, medicine_id: &RecordId) {
        self.lines.retain(|l| &l.medicine.id != medicine_id);
    }

    /// Applies `delta` to a line's quantity; lines that reach zero are dropped.
    pub fn change_quantity(&mut self, medicine_id: &RecordId, delta: i64) {
        for line in &mut self.lines {
            if &line.medicine.id == medicine_id {
                let next = i64::from(line.quantity).saturating_add(delta).max(0);
                line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
            }
        }
        self.lines.retain(|l| l.quantity > 0);
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.lines
            .iter()
            .map(|l| l.medicine.price.saturating_mul(u64::from(l.quantity)))
            .sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Collected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Collected => "collected",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "collected" => Ok(Self::Collected),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

/// Snapshot of one cart line at submission time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub medicine_id: RecordId,
    pub medicine_name: String,
    pub unit_price: u64,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineOrder {
    pub id: RecordId,
    pub order_number: u64,
    pub items: Vec<OrderLine>,
    pub total: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub collected_at: Option<DateTime<Utc>>,
}

impl MedicineOrder {
    /// Copies prices and quantities out of the cart; later catalog edits do not affect it.
    pub fn from_cart(cart: &Cart, order_number: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: klinik_uuid::issue_identifier(),
            order_number,
            items: cart
                .lines()
                .iter()
                .map(|l| OrderLine {
                    medicine_id: l.medicine.id,
                    medicine_name: l.medicine.name.clone(),
                    unit_price: l.medicine.price,
                    quantity: l.quantity,
                })
                .collect(),
            total: cart.total(),
            status: OrderStatus::Pending,
            created_at,
            collected_at: None,
        }
    }
}

/// What the patient is told after submitting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: RecordId,
    pub order_number: u64,
    pub total: u64,
}
