//! # Payment Orchestrator
//!
//! Creates the order, walks the configured gateways in priority order, and
//! returns redirect options to the caller. Per-gateway failures are recovered
//! by trying the next gateway; only order creation itself is fatal.

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::BoxedGatewayAdapter;
use crate::order::{CustomerInfo, LineItem, OrderStatus, PaymentMethod};
use crate::store::OrderStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A checkout request: cart line items with snapshotted prices, the chosen
/// payment method, and customer contact data.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    pub customer: CustomerInfo,
}

/// One redirect option the client may follow
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOption {
    /// Gateway identifier
    pub id: String,
    /// Display label
    pub label: String,
    /// Provider-hosted payment URL
    pub url: String,
}

/// Checkout result. An empty option list is a legitimate outcome (no gateway
/// configured); the order stays `pending` and the caller decides what to show.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub order_id: String,
    pub payment_options: Vec<PaymentOption>,
}

/// Orchestrates order creation and gateway session setup.
///
/// Gateways are long-lived instances injected at startup; iteration order is
/// the fixed provider priority.
pub struct PaymentOrchestrator {
    store: Arc<dyn OrderStore>,
    gateways: Vec<BoxedGatewayAdapter>,
}

impl PaymentOrchestrator {
    pub fn new(store: Arc<dyn OrderStore>, gateways: Vec<BoxedGatewayAdapter>) -> Self {
        Self { store, gateways }
    }

    /// Registered gateway ids, in priority order
    pub fn gateway_ids(&self) -> Vec<&'static str> {
        self.gateways.iter().map(|g| g.id()).collect()
    }

    /// Run a checkout: create the order, then try each gateway until one
    /// produces a session.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, method = %request.payment_method))]
    pub async fn checkout(&self, request: CheckoutRequest) -> PaymentResult<CheckoutOutcome> {
        // Order creation failing is fatal to the call
        let order = self
            .store
            .create_order(&request.user_id, request.items)
            .await?;

        info!(
            order_id = %order.id,
            total = %order.total,
            "order created, trying {} gateway(s)",
            self.gateways.len()
        );

        let mut payment_options = Vec::new();

        for gateway in &self.gateways {
            // The outbound call holds no store lock; slow providers must not
            // serialize unrelated checkouts.
            match gateway
                .create_session(&order, request.payment_method, &request.customer)
                .await
            {
                Ok(session) => {
                    // Reference is written only after a successful response,
                    // never speculatively before the call.
                    self.store
                        .attach_session(
                            &order.id,
                            session.gateway,
                            &session.provider_reference,
                            &session.redirect_url,
                        )
                        .await?;

                    // A webhook may already have raced us past pending; that
                    // is fine, the session is attached either way.
                    if let Err(PaymentError::StaleTransition { actual, .. }) = self
                        .store
                        .transition_status(
                            &order.id,
                            OrderStatus::PendingPayment,
                            Some(OrderStatus::Pending),
                        )
                        .await
                    {
                        debug!(order_id = %order.id, %actual, "order moved before session attach");
                    }

                    info!(
                        order_id = %order.id,
                        gateway = session.gateway,
                        reference = %session.provider_reference,
                        "gateway session created"
                    );

                    payment_options.push(PaymentOption {
                        id: session.gateway.to_string(),
                        label: session.label.to_string(),
                        url: session.redirect_url,
                    });

                    // At most one live gateway session per order
                    break;
                }
                Err(err) if err.is_gateway_skip() => {
                    match err {
                        PaymentError::NotConfigured { .. }
                        | PaymentError::UnsupportedMethod { .. } => {
                            debug!(order_id = %order.id, gateway = gateway.id(), %err, "skipping gateway");
                        }
                        _ => {
                            warn!(order_id = %order.id, gateway = gateway.id(), %err, "gateway failed, trying next");
                        }
                    }
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        if payment_options.is_empty() {
            // Never mark the order failed here: only a gateway webhook
            // carries payment-outcome authority.
            info!(order_id = %order.id, "no gateway produced a session");
        }

        Ok(CheckoutOutcome {
            order_id: order.id,
            payment_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayAdapter, GatewaySession, WebhookNotice};
    use crate::money::{Currency, Money};
    use crate::store::MemoryOrderStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted gateway for orchestrator tests
    struct FakeGateway {
        id: &'static str,
        outcome: FakeOutcome,
        calls: AtomicU32,
    }

    enum FakeOutcome {
        Session,
        NotConfigured,
        ProviderError,
        GarbledBody,
    }

    impl FakeGateway {
        fn new(id: &'static str, outcome: FakeOutcome) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl GatewayAdapter for FakeGateway {
        fn id(&self) -> &'static str {
            self.id
        }

        fn label(&self) -> &'static str {
            "Fake"
        }

        fn supports(&self, _method: PaymentMethod) -> bool {
            true
        }

        async fn create_session(
            &self,
            order: &crate::order::Order,
            _method: PaymentMethod,
            _customer: &CustomerInfo,
        ) -> PaymentResult<GatewaySession> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                FakeOutcome::Session => Ok(GatewaySession {
                    gateway: self.id,
                    label: "Fake",
                    redirect_url: format!("https://pay.test/{}/{}", self.id, order.id),
                    provider_reference: format!("{}-ref-{}", self.id, order.id),
                }),
                FakeOutcome::NotConfigured => {
                    Err(PaymentError::NotConfigured { gateway: self.id })
                }
                FakeOutcome::ProviderError => Err(PaymentError::Provider {
                    gateway: self.id,
                    message: "HTTP 500".to_string(),
                }),
                // Adapters classify a 2xx with an unreadable body this way
                FakeOutcome::GarbledBody => Err(PaymentError::Provider {
                    gateway: self.id,
                    message: "unparseable response body: expected value at line 1".to_string(),
                }),
            }
        }

        fn parse_webhook(
            &self,
            _payload: &[u8],
            _signature: Option<&str>,
        ) -> PaymentResult<WebhookNotice> {
            unimplemented!("not used in orchestrator tests")
        }
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            user_id: "user-1".to_string(),
            items: vec![LineItem::new(
                "p1",
                Money::from_minor(50000, Currency::COP),
                1,
            )],
            payment_method: PaymentMethod::Card,
            customer: CustomerInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_happy_path_single_gateway() {
        let store = Arc::new(MemoryOrderStore::new());
        let gw = FakeGateway::new("epayco", FakeOutcome::Session);
        let orchestrator = PaymentOrchestrator::new(store.clone(), vec![gw.clone()]);

        let outcome = orchestrator.checkout(request()).await.unwrap();

        assert_eq!(outcome.payment_options.len(), 1);
        assert_eq!(outcome.payment_options[0].id, "epayco");

        let order = store.get_order(&outcome.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.total.minor_units, 50000);
        assert_eq!(
            order.provider_reference.as_deref(),
            Some(format!("epayco-ref-{}", order.id).as_str())
        );
    }

    #[tokio::test]
    async fn test_no_gateway_configured() {
        let store = Arc::new(MemoryOrderStore::new());
        let orchestrator = PaymentOrchestrator::new(store.clone(), vec![]);

        let outcome = orchestrator.checkout(request()).await.unwrap();

        assert!(outcome.payment_options.is_empty());
        let order = store.get_order(&outcome.order_id).await.unwrap();
        // Order stays pending, never failed, merely because no gateway exists
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_first_unconfigured_second_succeeds() {
        let store = Arc::new(MemoryOrderStore::new());
        let first = FakeGateway::new("epayco", FakeOutcome::NotConfigured);
        let second = FakeGateway::new("mercadopago", FakeOutcome::Session);
        let orchestrator =
            PaymentOrchestrator::new(store.clone(), vec![first.clone(), second.clone()]);

        let outcome = orchestrator.checkout(request()).await.unwrap();

        assert_eq!(outcome.payment_options.len(), 1);
        assert_eq!(outcome.payment_options[0].id, "mercadopago");

        let order = store.get_order(&outcome.order_id).await.unwrap();
        assert_eq!(order.provider.as_deref(), Some("mercadopago"));
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_error_is_recovered() {
        let store = Arc::new(MemoryOrderStore::new());
        let broken = FakeGateway::new("epayco", FakeOutcome::ProviderError);
        let healthy = FakeGateway::new("mercadopago", FakeOutcome::Session);
        let orchestrator = PaymentOrchestrator::new(store.clone(), vec![broken, healthy]);

        let outcome = orchestrator.checkout(request()).await.unwrap();
        assert_eq!(outcome.payment_options.len(), 1);
        assert_eq!(outcome.payment_options[0].id, "mercadopago");
    }

    #[tokio::test]
    async fn test_garbled_provider_body_skips_to_next_gateway() {
        let store = Arc::new(MemoryOrderStore::new());
        let garbled = FakeGateway::new("epayco", FakeOutcome::GarbledBody);
        let healthy = FakeGateway::new("mercadopago", FakeOutcome::Session);
        let orchestrator =
            PaymentOrchestrator::new(store.clone(), vec![garbled, healthy.clone()]);

        let outcome = orchestrator.checkout(request()).await.unwrap();

        // Checkout never hard-fails on a single gateway's bad response
        assert_eq!(outcome.payment_options.len(), 1);
        assert_eq!(outcome.payment_options[0].id, "mercadopago");
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_gateways_fail_order_stays_pending() {
        let store = Arc::new(MemoryOrderStore::new());
        let broken = FakeGateway::new("epayco", FakeOutcome::ProviderError);
        let orchestrator = PaymentOrchestrator::new(store.clone(), vec![broken]);

        let outcome = orchestrator.checkout(request()).await.unwrap();
        assert!(outcome.payment_options.is_empty());

        let order = store.get_order(&outcome.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.provider_reference.is_none());
    }

    #[tokio::test]
    async fn test_first_success_stops_iteration() {
        let store = Arc::new(MemoryOrderStore::new());
        let first = FakeGateway::new("epayco", FakeOutcome::Session);
        let second = FakeGateway::new("mercadopago", FakeOutcome::Session);
        let orchestrator =
            PaymentOrchestrator::new(store.clone(), vec![first.clone(), second.clone()]);

        let outcome = orchestrator.checkout(request()).await.unwrap();

        // Only one gateway session is ever created per order
        assert_eq!(outcome.payment_options.len(), 1);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_is_fatal() {
        let store = Arc::new(MemoryOrderStore::new());
        let orchestrator = PaymentOrchestrator::new(store, vec![]);

        let mut req = request();
        req.items.clear();
        let err = orchestrator.checkout(req).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidInput(_)));
    }
}
