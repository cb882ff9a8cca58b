//! Medicine catalog browsing.

use crate::medicine::{categories, default_catalog, CatalogQuery, Medicine};
use crate::store::{ClinicBackend, MedicineCatalog};
use crate::ClinicResult;
use klinik_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ClinicBackend>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ClinicBackend>) -> Self {
        Self { store }
    }

    pub fn search(&self, query: &CatalogQuery) -> ClinicResult<Vec<Medicine>> {
        Ok(query.apply(self.store.list_medicines()?))
    }

    pub fn categories(&self) -> ClinicResult<Vec<String>> {
        Ok(categories(&self.store.list_medicines()?))
    }

    pub fn get(&self, id: &RecordId) -> ClinicResult<Medicine> {
        self.store.get_medicine(id)
    }

    pub fn upsert(&self, medicine: &Medicine) -> ClinicResult<()> {
        self.store.upsert_medicine(medicine)
    }

    /// Installs the default catalog if the catalog is empty. Returns how many were added.
    pub fn seed_default_catalog(&self) -> ClinicResult<usize> {
        if !self.store.list_medicines()?.is_empty() {
            return Ok(0);
        }
        let catalog = default_catalog();
        for medicine in &catalog {
            self.store.upsert_medicine(medicine)?;
        }
        tracing::info!(medicines = catalog.len(), "seeded default medicine catalog");
        Ok(catalog.len())
    }
}
