//! Patient self-service medicine orders.
//!
//! Orders snapshot the cart at submission. They never touch stock and are never reconciled
//! with prescriptions.

use crate::medicine::{Cart, MedicineOrder, OrderReceipt, OrderStatus};
use crate::store::{
    ClinicBackend, MedicineCatalog, MedicineOrderStore, SequenceCounter, SequenceIssuer,
};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use klinik_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct MedicineOrderService {
    store: Arc<dyn ClinicBackend>,
}

impl MedicineOrderService {
    pub fn new(store: Arc<dyn ClinicBackend>) -> Self {
        Self { store }
    }

    /// Builds a cart from `(medicine id, quantity)` pairs against the current catalog.
    ///
    /// # Errors
    ///
    /// [`ClinicError::NotFound`] for an unknown medicine, [`ClinicError::InvalidInput`] for an
    /// out-of-stock medicine or a zero quantity.
    pub fn build_cart(&self, lines: &[(RecordId, u32)]) -> ClinicResult<Cart> {
        let mut cart = Cart::new();
        for (medicine_id, quantity) in lines {
            let medicine = self.store.get_medicine(medicine_id)?;
            cart.add_quantity(&medicine, *quantity)?;
        }
        Ok(cart)
    }

    /// Issues an order number and stores a `pending` order for the cart's contents.
    ///
    /// # Errors
    ///
    /// [`ClinicError::EmptyCart`] before anything is issued or written.
    pub fn submit(&self, cart: &Cart) -> ClinicResult<OrderReceipt> {
        if cart.is_empty() {
            return Err(ClinicError::EmptyCart);
        }

        let order_number = self
            .store
            .issue_sequence_number(SequenceCounter::OrderNumber)?;
        let order = MedicineOrder::from_cart(cart, order_number, Utc::now());
        self.store.insert_order(&order)?;

        tracing::info!(order_id = %order.id, order_number, total = order.total, "medicine order placed");
        Ok(OrderReceipt {
            order_id: order.id,
            order_number,
            total: order.total,
        })
    }

    pub fn collect(&self, id: &RecordId) -> ClinicResult<()> {
        self.store
            .set_order_status(id, OrderStatus::Collected, Utc::now())?;
        tracing::info!(order_id = %id, "medicine order collected");
        Ok(())
    }

    pub fn list(&self) -> ClinicResult<Vec<MedicineOrder>> {
        self.store.list_orders()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medicine::default_catalog;
    use crate::services::testing::both_backends;

    fn seeded(store: &Arc<dyn ClinicBackend>) -> Vec<crate::medicine::Medicine> {
        let catalog = default_catalog();
        for medicine in &catalog {
            store.upsert_medicine(medicine).unwrap();
        }
        catalog
    }

    #[test]
    fn test_empty_cart_is_rejected_without_consuming_a_number() {
        for store in both_backends() {
            let service = MedicineOrderService::new(store.clone());
            let catalog = seeded(&store);

            assert!(matches!(
                service.submit(&Cart::new()),
                Err(ClinicError::EmptyCart)
            ));
            assert!(service.list().unwrap().is_empty());

            let cart = service.build_cart(&[(catalog[0].id, 1)]).unwrap();
            assert_eq!(service.submit(&cart).unwrap().order_number, 1);
        }
    }

    #[test]
    fn test_submit_snapshots_and_collect_stamps() {
        for store in both_backends() {
            let service = MedicineOrderService::new(store.clone());
            let catalog = seeded(&store);
            let paracetamol = &catalog[0];
            let vitamin_c = &catalog[6];

            let cart = service
                .build_cart(&[(paracetamol.id, 2), (vitamin_c.id, 1), (paracetamol.id, 1)])
                .unwrap();
            let receipt = service.submit(&cart).unwrap();
            assert_eq!(receipt.total, 5 * 3 + 10);

            let order = store.get_order(&receipt.order_id).unwrap();
            assert_eq!(order.items.len(), 2);
            assert_eq!(order.items[0].quantity, 3);
            assert_eq!(order.status, OrderStatus::Pending);
            assert!(order.collected_at.is_none());

            service.collect(&receipt.order_id).unwrap();
            let collected = store.get_order(&receipt.order_id).unwrap();
            assert_eq!(collected.status, OrderStatus::Collected);
            assert!(collected.collected_at.is_some());

            // Stock flags and counts are untouched.
            assert_eq!(store.get_medicine(&paracetamol.id).unwrap(), *paracetamol);
        }
    }

    #[test]
    fn test_build_cart_rejects_unknown_and_out_of_stock() {
        for store in both_backends() {
            let service = MedicineOrderService::new(store.clone());
            let catalog = seeded(&store);
            let loratadine = catalog.iter().find(|m| !m.in_stock).unwrap();

            assert!(matches!(
                service.build_cart(&[(RecordId::new(), 1)]),
                Err(ClinicError::NotFound { .. })
            ));
            assert!(matches!(
                service.build_cart(&[(loratadine.id, 1)]),
                Err(ClinicError::InvalidInput(_))
            ));
        }
    }
}
