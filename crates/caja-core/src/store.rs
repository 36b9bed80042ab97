//! # Order Store
//!
//! Single source of truth for orders. The trait is the contract the
//! orchestrator and reconciler program against; `MemoryOrderStore` is the
//! in-process implementation backing the service and its tests.
//!
//! Status transitions are compare-and-set: callers pass the status they
//! observed, and the store refuses the write with `StaleTransition` when the
//! order has moved. That is what makes concurrent webhook deliveries for the
//! same order resolve to exactly one applied transition.

use crate::error::{PaymentError, PaymentResult};
use crate::order::{LineItem, Order, OrderStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Durable order storage contract.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Create a `pending` order with a frozen total.
    /// `InvalidInput` on an empty cart or a zero quantity.
    async fn create_order(&self, user_id: &str, items: Vec<LineItem>) -> PaymentResult<Order>;

    /// Fetch by order id. `OrderNotFound` if absent.
    async fn get_order(&self, order_id: &str) -> PaymentResult<Order>;

    /// Resolve either a stored provider reference or an internal order id.
    async fn find_by_reference(&self, reference: &str) -> PaymentResult<Order>;

    /// Attach a gateway session to the order. Safe to call again with the
    /// same reference; `ReferenceConflict` when a different reference is
    /// already attached.
    async fn attach_session(
        &self,
        order_id: &str,
        gateway: &str,
        reference: &str,
        payment_url: &str,
    ) -> PaymentResult<Order>;

    /// Apply a status change. When `expected` is given and no longer matches
    /// the stored status, fails with `StaleTransition` so the caller can
    /// re-read and re-decide. Edge validity is the reconciler's concern.
    async fn transition_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        expected: Option<OrderStatus>,
    ) -> PaymentResult<Order>;
}

#[derive(Default)]
struct Inner {
    orders: HashMap<String, Order>,
    /// provider reference -> order id
    by_reference: HashMap<String, String>,
}

/// In-memory order store. All mutations happen under a single write lock,
/// which makes per-order transitions linearizable.
#[derive(Default)]
pub struct MemoryOrderStore {
    inner: RwLock<Inner>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders
    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_order(&self, user_id: &str, items: Vec<LineItem>) -> PaymentResult<Order> {
        let order = Order::new(user_id, items)?;
        let mut inner = self.inner.write().await;
        inner.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: &str) -> PaymentResult<Order> {
        let inner = self.inner.read().await;
        inner
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| PaymentError::OrderNotFound {
                reference: order_id.to_string(),
            })
    }

    async fn find_by_reference(&self, reference: &str) -> PaymentResult<Order> {
        let inner = self.inner.read().await;
        let by_ref = inner
            .by_reference
            .get(reference)
            .and_then(|id| inner.orders.get(id));
        by_ref
            .or_else(|| inner.orders.get(reference))
            .cloned()
            .ok_or_else(|| PaymentError::OrderNotFound {
                reference: reference.to_string(),
            })
    }

    async fn attach_session(
        &self,
        order_id: &str,
        gateway: &str,
        reference: &str,
        payment_url: &str,
    ) -> PaymentResult<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound {
                reference: order_id.to_string(),
            })?;

        match order.provider_reference.as_deref() {
            // Idempotent re-attach of the same session
            Some(existing) if existing == reference => Ok(order.clone()),
            Some(existing) => Err(PaymentError::ReferenceConflict {
                order_id: order_id.to_string(),
                existing: existing.to_string(),
                attempted: reference.to_string(),
            }),
            None => {
                order.provider = Some(gateway.to_string());
                order.provider_reference = Some(reference.to_string());
                order.payment_url = Some(payment_url.to_string());
                let snapshot = order.clone();
                inner
                    .by_reference
                    .insert(reference.to_string(), order_id.to_string());
                Ok(snapshot)
            }
        }
    }

    async fn transition_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        expected: Option<OrderStatus>,
    ) -> PaymentResult<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound {
                reference: order_id.to_string(),
            })?;

        if let Some(expected) = expected {
            if order.status != expected {
                return Err(PaymentError::StaleTransition {
                    order_id: order_id.to_string(),
                    expected: expected.to_string(),
                    actual: order.status.to_string(),
                });
            }
        }

        order.status = new_status;
        Ok(order.clone())
    }
}
