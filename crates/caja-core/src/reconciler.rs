//! # Webhook Reconciler
//!
//! Applies asynchronous provider callbacks to orders: adapter-specific
//! parsing and signature verification first, then an idempotent,
//! compare-and-set guarded status transition.
//!
//! Transition table (current status x claimed outcome):
//!
//! | Current                  | Claim       | Action                      |
//! |--------------------------|-------------|-----------------------------|
//! | pending, pending_payment | approved    | -> paid                     |
//! | pending, pending_payment | rejected    | -> cancelled                |
//! | pending, pending_payment | failed      | -> failed                   |
//! | paid/shipped/completed   | any         | no-op                       |
//! | cancelled, failed        | approved    | reject, log for review      |
//! | cancelled, failed        | non-approved| no-op (replay)              |

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{BoxedGatewayAdapter, WebhookNotice};
use crate::order::{ClaimedOutcome, OrderStatus};
use crate::store::OrderStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Retries against compare-and-set contention before giving up
const MAX_CAS_ATTEMPTS: u32 = 4;

/// What happened to the order. All three variants are acknowledged to the
/// provider with a success response; `RejectedStale` is additionally
/// surfaced in logs for operator review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The claimed transition was applied
    Applied {
        order_id: String,
        status: OrderStatus,
    },
    /// The order was already in (or past) the claimed state; nothing changed
    AlreadyApplied {
        order_id: String,
        status: OrderStatus,
    },
    /// The claim would resurrect a cancelled/failed order; refused and kept
    RejectedStale {
        order_id: String,
        status: OrderStatus,
        claimed: ClaimedOutcome,
    },
}

/// Per-order decision for one webhook claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Apply(OrderStatus),
    NoOp,
    Reject,
}

fn decide(current: OrderStatus, claimed: ClaimedOutcome) -> Decision {
    let target = claimed.target_status();
    if current == target {
        // Duplicate delivery of an already-applied outcome
        return Decision::NoOp;
    }

    if current.is_payment_settled() {
        // Paid (and anything fulfillment moved it to) is terminal for
        // payment purposes
        return Decision::NoOp;
    }

    if current.is_payment_open() {
        return Decision::Apply(target);
    }

    // current is cancelled or failed
    match target {
        // A dead order being retroactively marked paid is a suspicious
        // replay and must not silently succeed
        OrderStatus::Paid => Decision::Reject,
        _ => Decision::NoOp,
    }
}

/// Reconciles provider webhooks against the order store.
pub struct WebhookReconciler {
    store: Arc<dyn OrderStore>,
    gateways: Vec<BoxedGatewayAdapter>,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn OrderStore>, gateways: Vec<BoxedGatewayAdapter>) -> Self {
        Self { store, gateways }
    }

    fn adapter(&self, gateway_id: &str) -> PaymentResult<&BoxedGatewayAdapter> {
        self.gateways
            .iter()
            .find(|g| g.id() == gateway_id)
            .ok_or_else(|| {
                PaymentError::Internal(format!("no adapter registered for {gateway_id}"))
            })
    }

    /// Verify, parse, and apply one webhook delivery.
    ///
    /// `InvalidSignature`, parse failures, and `OrderNotFound` propagate;
    /// everything else resolves to a [`ReconcileOutcome`] the HTTP layer
    /// acknowledges.
    #[instrument(skip(self, payload, signature), fields(gateway = gateway_id))]
    pub async fn apply(
        &self,
        gateway_id: &str,
        payload: &[u8],
        signature: Option<&str>,
    ) -> PaymentResult<ReconcileOutcome> {
        let adapter = self.adapter(gateway_id)?;
        let notice = adapter.parse_webhook(payload, signature)?;

        debug!(
            reference = %notice.order_reference,
            claimed = %notice.claimed,
            event_id = ?notice.event_id,
            "webhook parsed"
        );

        self.apply_notice(&notice).await
    }

    async fn apply_notice(&self, notice: &WebhookNotice) -> PaymentResult<ReconcileOutcome> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let order = self.store.find_by_reference(&notice.order_reference).await?;

            match decide(order.status, notice.claimed) {
                Decision::NoOp => {
                    debug!(order_id = %order.id, status = %order.status, claimed = %notice.claimed, "webhook no-op");
                    return Ok(ReconcileOutcome::AlreadyApplied {
                        order_id: order.id,
                        status: order.status,
                    });
                }
                Decision::Reject => {
                    let err = PaymentError::InvalidTransition {
                        from: order.status.to_string(),
                        claimed: notice.claimed.to_string(),
                    };
                    warn!(order_id = %order.id, %err, "webhook rejected, keeping current status for manual review");
                    return Ok(ReconcileOutcome::RejectedStale {
                        order_id: order.id,
                        status: order.status,
                        claimed: notice.claimed,
                    });
                }
                Decision::Apply(target) => {
                    match self
                        .store
                        .transition_status(&order.id, target, Some(order.status))
                        .await
                    {
                        Ok(updated) => {
                            info!(order_id = %updated.id, status = %updated.status, "webhook applied");
                            return Ok(ReconcileOutcome::Applied {
                                order_id: updated.id,
                                status: updated.status,
                            });
                        }
                        // A concurrent delivery won the edge; re-read and
                        // re-decide against the fresh status
                        Err(PaymentError::StaleTransition { .. }) => continue,
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        Err(PaymentError::Internal(format!(
            "transition contention on reference {}",
            notice.order_reference
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayAdapter, GatewaySession};
    use crate::money::{Currency, Money};
    use crate::order::{CustomerInfo, LineItem, PaymentMethod};
    use crate::store::MemoryOrderStore;
    use async_trait::async_trait;

    /// Adapter stub: payloads are "reference:outcome" strings, and a
    /// signature of "bad" fails verification.
    struct StubGateway;

    #[async_trait]
    impl GatewayAdapter for StubGateway {
        fn id(&self) -> &'static str {
            "stub"
        }

        fn label(&self) -> &'static str {
            "Stub"
        }

        fn supports(&self, _method: PaymentMethod) -> bool {
            true
        }

        async fn create_session(
            &self,
            _order: &crate::order::Order,
            _method: PaymentMethod,
            _customer: &CustomerInfo,
        ) -> PaymentResult<GatewaySession> {
            unimplemented!("not used in reconciler tests")
        }

        fn parse_webhook(
            &self,
            payload: &[u8],
            signature: Option<&str>,
        ) -> PaymentResult<WebhookNotice> {
            if signature == Some("bad") {
                return Err(PaymentError::InvalidSignature("mismatch".to_string()));
            }
            let text = String::from_utf8_lossy(payload);
            let (reference, outcome) = text
                .split_once(':')
                .ok_or_else(|| PaymentError::Parse("want reference:outcome".to_string()))?;
            let claimed = match outcome {
                "approved" => ClaimedOutcome::Approved,
                "rejected" => ClaimedOutcome::Rejected,
                "failed" => ClaimedOutcome::Failed,
                "pending" => ClaimedOutcome::Pending,
                other => return Err(PaymentError::Parse(format!("unknown outcome {other}"))),
            };
            Ok(WebhookNotice {
                gateway: "stub",
                event_id: None,
                order_reference: reference.to_string(),
                claimed,
            })
        }
    }

    async fn setup() -> (Arc<MemoryOrderStore>, WebhookReconciler, String) {
        let store = Arc::new(MemoryOrderStore::new());
        let order = store
            .create_order(
                "user-1",
                vec![LineItem::new(
                    "p1",
                    Money::from_minor(50000, Currency::COP),
                    1,
                )],
            )
            .await
            .unwrap();
        store
            .attach_session(&order.id, "stub", "ref-1", "https://pay/1")
            .await
            .unwrap();
        store
            .transition_status(&order.id, OrderStatus::PendingPayment, Some(OrderStatus::Pending))
            .await
            .unwrap();

        let reconciler = WebhookReconciler::new(store.clone(), vec![Arc::new(StubGateway)]);
        (store, reconciler, order.id)
    }

    #[tokio::test]
    async fn test_paid_webhook_applies() {
        let (store, reconciler, order_id) = setup().await;

        let outcome = reconciler
            .apply("stub", b"ref-1:approved", None)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReconcileOutcome::Applied {
                status: OrderStatus::Paid,
                ..
            }
        ));
        assert_eq!(
            store.get_order(&order_id).await.unwrap().status,
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_duplicate_webhook_is_noop() {
        let (store, reconciler, order_id) = setup().await;

        reconciler
            .apply("stub", b"ref-1:approved", None)
            .await
            .unwrap();
        let second = reconciler
            .apply("stub", b"ref-1:approved", None)
            .await
            .unwrap();

        assert!(matches!(second, ReconcileOutcome::AlreadyApplied { .. }));
        assert_eq!(
            store.get_order(&order_id).await.unwrap().status,
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_late_cancel_does_not_regress_paid() {
        let (store, reconciler, order_id) = setup().await;

        reconciler
            .apply("stub", b"ref-1:approved", None)
            .await
            .unwrap();
        let late = reconciler
            .apply("stub", b"ref-1:rejected", None)
            .await
            .unwrap();

        assert!(matches!(late, ReconcileOutcome::AlreadyApplied { .. }));
        assert_eq!(
            store.get_order(&order_id).await.unwrap().status,
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_paid_claim_on_cancelled_order_is_rejected() {
        let (store, reconciler, order_id) = setup().await;

        reconciler
            .apply("stub", b"ref-1:rejected", None)
            .await
            .unwrap();
        let replay = reconciler
            .apply("stub", b"ref-1:approved", None)
            .await
            .unwrap();

        assert!(matches!(
            replay,
            ReconcileOutcome::RejectedStale {
                claimed: ClaimedOutcome::Approved,
                ..
            }
        ));
        // Cancelled is kept, never overwritten
        assert_eq!(
            store.get_order(&order_id).await.unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_invalid_signature_means_no_mutation() {
        let (store, reconciler, order_id) = setup().await;

        let err = reconciler
            .apply("stub", b"ref-1:approved", Some("bad"))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::InvalidSignature(_)));
        assert_eq!(
            store.get_order(&order_id).await.unwrap().status,
            OrderStatus::PendingPayment
        );
    }

    #[tokio::test]
    async fn test_unknown_reference_is_not_found() {
        let (_store, reconciler, _order_id) = setup().await;

        let err = reconciler
            .apply("stub", b"ref-zzz:approved", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::OrderNotFound { .. }));
    }

    #[tokio::test]
    async fn test_pending_claim_then_approval() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = store
            .create_order(
                "user-1",
                vec![LineItem::new(
                    "p1",
                    Money::from_minor(1000, Currency::COP),
                    1,
                )],
            )
            .await
            .unwrap();
        let reconciler = WebhookReconciler::new(store.clone(), vec![Arc::new(StubGateway)]);

        // A pending claim moves pending -> pending_payment, then approval lands
        let payload = format!("{}:pending", order.id);
        reconciler.apply("stub", payload.as_bytes(), None).await.unwrap();
        assert_eq!(
            store.get_order(&order.id).await.unwrap().status,
            OrderStatus::PendingPayment
        );

        let payload = format!("{}:approved", order.id);
        reconciler.apply("stub", payload.as_bytes(), None).await.unwrap();
        assert_eq!(
            store.get_order(&order.id).await.unwrap().status,
            OrderStatus::Paid
        );
    }

    #[test]
    fn test_decision_table() {
        use Decision::*;

        assert_eq!(
            decide(OrderStatus::Pending, ClaimedOutcome::Approved),
            Apply(OrderStatus::Paid)
        );
        assert_eq!(
            decide(OrderStatus::PendingPayment, ClaimedOutcome::Rejected),
            Apply(OrderStatus::Cancelled)
        );
        assert_eq!(
            decide(OrderStatus::PendingPayment, ClaimedOutcome::Failed),
            Apply(OrderStatus::Failed)
        );
        assert_eq!(decide(OrderStatus::Paid, ClaimedOutcome::Rejected), NoOp);
        assert_eq!(decide(OrderStatus::Paid, ClaimedOutcome::Approved), NoOp);
        assert_eq!(decide(OrderStatus::Shipped, ClaimedOutcome::Rejected), NoOp);
        assert_eq!(decide(OrderStatus::Cancelled, ClaimedOutcome::Approved), Reject);
        assert_eq!(decide(OrderStatus::Failed, ClaimedOutcome::Approved), Reject);
        assert_eq!(decide(OrderStatus::Cancelled, ClaimedOutcome::Rejected), NoOp);
        assert_eq!(decide(OrderStatus::Cancelled, ClaimedOutcome::Failed), NoOp);
        assert_eq!(
            decide(OrderStatus::Pending, ClaimedOutcome::Pending),
            Apply(OrderStatus::PendingPayment)
        );
        assert_eq!(
            decide(OrderStatus::PendingPayment, ClaimedOutcome::Pending),
            NoOp
        );
    }
}
