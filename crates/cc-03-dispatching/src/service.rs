//! Dispatcher service.
//!
//! Demultiplexes envelopes addressed to local participants by message type:
//! calls go to the registered provider, answers go to the correlation table.

use crate::domain::{CorrelationTable, DispatchError, RequestCallerDirectory};
use crate::ports::RequestCaller;
use crate::publication::PublicationManager;
use cc_01_message_routing::MessageRouter;
use serde::Serialize;
use shared_types::{
    Envelope, MessageType, OneWayRequest, RemoteError, Reply, Request, SubscriptionPublication,
    SubscriptionReply, SubscriptionRequest, SubscriptionStop, TimeSource,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Dispatcher {
    router: Arc<dyn MessageRouter>,
    callers: RequestCallerDirectory,
    correlation: Arc<CorrelationTable>,
    publications: PublicationManager,
    time: Arc<dyn TimeSource>,
}

impl Dispatcher {
    pub fn new(router: Arc<dyn MessageRouter>, time: Arc<dyn TimeSource>) -> Self {
        Self {
            correlation: Arc::new(CorrelationTable::new(time.clone())),
            publications: PublicationManager::new(router.clone(), time.clone()),
            callers: RequestCallerDirectory::new(),
            router,
            time,
        }
    }

    /// Make a local provider reachable under `participant_id`.
    pub fn add_request_caller(&self, participant_id: &str, caller: Arc<dyn RequestCaller>) {
        self.callers.add(participant_id, caller);
    }

    /// Remove a local provider and stop the publications it served.
    pub fn remove_request_caller(&self, participant_id: &str) -> bool {
        let removed = self.callers.remove(participant_id).is_some();
        if removed {
            let stopped = self.publications.stop_for_provider(participant_id);
            info!(participant_id = %participant_id, stopped, "provider removed");
        }
        removed
    }

    pub fn correlation(&self) -> Arc<CorrelationTable> {
        self.correlation.clone()
    }

    pub fn publications(&self) -> &PublicationManager {
        &self.publications
    }

    pub fn callers(&self) -> &RequestCallerDirectory {
        &self.callers
    }

    /// Handle one inbound envelope. Failures are logged, never returned.
    pub async fn dispatch(&self, envelope: Envelope) {
        let message_id = envelope.message_id().to_string();
        let msg_type = envelope.msg_type();
        if let Err(e) = self.handle(envelope).await {
            warn!(message_id = %message_id, msg_type = %msg_type, error = %e, "dispatch failed");
        }
    }

    async fn handle(&self, envelope: Envelope) -> Result<(), DispatchError> {
        if envelope.is_expired_at(self.time.now()) {
            debug!(
                message_id = %envelope.message_id(),
                expiry_date = envelope.expiry_date(),
                "dropping expired envelope"
            );
            return Ok(());
        }

        match envelope.msg_type() {
            MessageType::Request => self.handle_request(&envelope).await,
            MessageType::OneWay => self.handle_one_way(&envelope).await,
            MessageType::SubscriptionRequest => self.handle_subscription(&envelope, true).await,
            MessageType::BroadcastSubscriptionRequest => {
                self.handle_subscription(&envelope, false).await
            }
            MessageType::Reply => {
                let reply: Reply = envelope.decode_body()?;
                self.correlation.resolve_reply(reply);
                Ok(())
            }
            MessageType::SubscriptionReply => {
                let reply: SubscriptionReply = envelope.decode_body()?;
                self.correlation.resolve_subscription_reply(reply);
                Ok(())
            }
            MessageType::Publication => {
                let publication: SubscriptionPublication = envelope.decode_body()?;
                self.correlation.handle_publication(publication);
                Ok(())
            }
            MessageType::SubscriptionStop => {
                let stop: SubscriptionStop = envelope.decode_body()?;
                let stopped = self.publications.stop(&stop.subscription_id);
                self.correlation.remove_subscription(&stop.subscription_id);
                debug!(subscription_id = %stop.subscription_id, stopped, "subscription stop handled");
                Ok(())
            }
        }
    }

    async fn handle_request(&self, envelope: &Envelope) -> Result<(), DispatchError> {
        let request: Request = envelope.decode_body()?;
        let reply = match self.callers.get(envelope.to()) {
            Some(caller) => match caller.invoke(&request.method_name, request.params).await {
                Ok(response) => Reply::success(request.request_reply_id, response),
                Err(error) => Reply::failure(request.request_reply_id, error),
            },
            None => {
                warn!(participant_id = %envelope.to(), method = %request.method_name, "request for unknown provider");
                Reply::failure(
                    request.request_reply_id,
                    RemoteError::provider_runtime(format!(
                        "no provider registered for participant {}",
                        envelope.to()
                    )),
                )
            }
        };
        self.send_answer(envelope, MessageType::Reply, &reply).await
    }

    async fn handle_one_way(&self, envelope: &Envelope) -> Result<(), DispatchError> {
        let request: OneWayRequest = envelope.decode_body()?;
        match self.callers.get(envelope.to()) {
            Some(caller) => caller.invoke_one_way(&request.method_name, request.params).await,
            None => {
                warn!(participant_id = %envelope.to(), method = %request.method_name, "one-way request for unknown provider")
            }
        }
        Ok(())
    }

    async fn handle_subscription(
        &self,
        envelope: &Envelope,
        is_attribute: bool,
    ) -> Result<(), DispatchError> {
        let request: SubscriptionRequest = envelope.decode_body()?;
        let subscription_id = request.subscription_id.clone();

        let error = if request.qos.is_expired_at(self.time.now()) {
            Some(RemoteError::subscription(format!(
                "subscription {subscription_id} expired before it was registered"
            )))
        } else {
            match self.callers.get(envelope.to()) {
                Some(caller) => {
                    self.publications
                        .add(envelope.from(), envelope.to(), caller, request, is_attribute)
                        .await;
                    None
                }
                None => Some(RemoteError::subscription(format!(
                    "no provider registered for participant {}",
                    envelope.to()
                ))),
            }
        };

        let reply = SubscriptionReply {
            subscription_id,
            error,
        };
        self.send_answer(envelope, MessageType::SubscriptionReply, &reply)
            .await
    }

    /// Route an answer back to the sender of `envelope`, expiring with it.
    async fn send_answer<T: Serialize>(
        &self,
        envelope: &Envelope,
        msg_type: MessageType,
        body: &T,
    ) -> Result<(), DispatchError> {
        let mut answer = Envelope::with_body(
            msg_type,
            envelope.to(),
            envelope.from(),
            envelope.expiry_date(),
            body,
        )?;
        if let Some(user) = envelope.creator_user_id() {
            answer.set_creator_user_id(user);
        }
        self.router.route(answer).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderListeners, SubscriptionListener};
    use async_trait::async_trait;
    use cc_01_message_routing::RouteOutcome;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_types::{Address, ManualTimeSource, RoutingError, SubscriptionQos, NO_EXPIRY_DATE};

    #[derive(Default)]
    struct CapturingRouter {
        routed: Mutex<Vec<Envelope>>,
    }

    #[async_trait]
    impl MessageRouter for CapturingRouter {
        async fn route(&self, envelope: Envelope) -> Result<RouteOutcome, RoutingError> {
            self.routed.lock().push(envelope);
            Ok(RouteOutcome::Delivered)
        }

        fn add_next_hop(&self, _participant_id: &str, _address: Address) {}

        fn remove_next_hop(&self, _participant_id: &str) -> Option<Address> {
            None
        }
    }

    #[derive(Default)]
    struct Calculator {
        calls: Mutex<Vec<String>>,
        listeners: Arc<ProviderListeners>,
    }

    #[async_trait]
    impl RequestCaller for Calculator {
        async fn invoke(&self, method_name: &str, params: Vec<Value>) -> Result<Vec<Value>, RemoteError> {
            self.calls.lock().push(method_name.to_string());
            match method_name {
                "add" => {
                    let sum: i64 = params.iter().filter_map(Value::as_i64).sum();
                    Ok(vec![json!(sum)])
                }
                "getTotal" => Ok(vec![json!(0)]),
                other => Err(RemoteError::method_invocation(format!("no method {other}"))),
            }
        }

        fn listeners(&self) -> Arc<ProviderListeners> {
            self.listeners.clone()
        }
    }

    #[derive(Default)]
    struct Errors(Mutex<Vec<RemoteError>>);

    impl SubscriptionListener for Errors {
        fn on_receive(&self, _values: Vec<Value>) {}

        fn on_error(&self, error: RemoteError) {
            self.0.lock().push(error);
        }
    }

    fn setup() -> (Dispatcher, Arc<CapturingRouter>, Arc<Calculator>, Arc<ManualTimeSource>) {
        let router = Arc::new(CapturingRouter::default());
        let time = Arc::new(ManualTimeSource::new(1_000));
        let dispatcher = Dispatcher::new(router.clone(), time.clone());
        let calculator = Arc::new(Calculator::default());
        dispatcher.add_request_caller("calc", calculator.clone());
        (dispatcher, router, calculator, time)
    }

    #[tokio::test]
    async fn test_request_produces_reply() {
        let (dispatcher, router, calculator, _) = setup();
        let mut request = Request::new("add", vec![json!(2), json!(3)]);
        request.request_reply_id = "r-1".into();
        let envelope = Envelope::with_body(MessageType::Request, "consumer", "calc", 5_000, &request)
            .unwrap()
            .with_creator_user_id("alice");

        dispatcher.dispatch(envelope).await;

        assert_eq!(*calculator.calls.lock(), vec!["add".to_string()]);
        let routed = router.routed.lock();
        assert_eq!(routed.len(), 1);
        let answer = &routed[0];
        assert_eq!(answer.msg_type(), MessageType::Reply);
        assert_eq!(answer.from(), "calc");
        assert_eq!(answer.to(), "consumer");
        assert_eq!(answer.expiry_date(), 5_000);
        assert_eq!(answer.creator_user_id(), Some("alice"));
        let reply: Reply = answer.decode_body().unwrap();
        assert_eq!(reply.request_reply_id, "r-1");
        assert_eq!(reply.response, vec![json!(5)]);
        assert!(reply.error.is_none());
    }

    #[tokio::test]
    async fn test_request_to_unknown_provider_gets_error_reply() {
        let (dispatcher, router, _, _) = setup();
        let request = Request::new("add", vec![]);
        let envelope =
            Envelope::with_body(MessageType::Request, "consumer", "nobody", 5_000, &request).unwrap();

        dispatcher.dispatch(envelope).await;

        let reply: Reply = router.routed.lock()[0].decode_body().unwrap();
        assert_eq!(
            reply.error.map(|e| e.kind),
            Some(shared_types::RemoteErrorKind::ProviderRuntime)
        );
    }

    #[tokio::test]
    async fn test_expired_envelope_has_no_side_effects() {
        let (dispatcher, router, calculator, _) = setup();
        let request = Request::new("add", vec![json!(1)]);
        let envelope =
            Envelope::with_body(MessageType::Request, "consumer", "calc", 999, &request).unwrap();

        dispatcher.dispatch(envelope).await;

        assert!(calculator.calls.lock().is_empty());
        assert!(router.routed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_reply_resolves_pending_request() {
        let (dispatcher, _, _, _) = setup();
        let rx = dispatcher.correlation().register_reply("r-7", "add", 5_000);
        let envelope = Envelope::with_body(
            MessageType::Reply,
            "calc",
            "consumer",
            5_000,
            &Reply::success("r-7", vec![json!(42)]),
        )
        .unwrap();

        dispatcher.dispatch(envelope).await;

        assert_eq!(rx.await.unwrap().unwrap(), vec![json!(42)]);
    }

    #[tokio::test]
    async fn test_subscription_reply_error_reaches_listener_once() {
        let (dispatcher, _, _, _) = setup();
        let listener = Arc::new(Errors::default());
        let rx = dispatcher
            .correlation()
            .register_subscription("sub1", listener.clone(), NO_EXPIRY_DATE);
        let body = SubscriptionReply {
            subscription_id: "sub1".into(),
            error: Some(RemoteError::subscription("unknown attribute")),
        };
        let envelope =
            Envelope::with_body(MessageType::SubscriptionReply, "calc", "consumer", 5_000, &body)
                .unwrap();

        dispatcher.dispatch(envelope.clone()).await;
        dispatcher.dispatch(envelope).await;

        assert!(rx.await.unwrap().is_err());
        assert_eq!(listener.0.lock().len(), 1);
        assert!(!dispatcher.correlation().has_subscription("sub1"));
    }

    #[tokio::test]
    async fn test_subscription_request_registers_and_replies() {
        let (dispatcher, router, _, _) = setup();
        let mut request = SubscriptionRequest::new("total", SubscriptionQos::default());
        request.subscription_id = "sub9".into();
        let envelope = Envelope::with_body(
            MessageType::SubscriptionRequest,
            "consumer",
            "calc",
            5_000,
            &request,
        )
        .unwrap();

        dispatcher.dispatch(envelope).await;
        tokio::task::yield_now().await;

        assert!(dispatcher.publications().contains("sub9"));
        let routed = router.routed.lock();
        let reply = routed
            .iter()
            .find(|e| e.msg_type() == MessageType::SubscriptionReply)
            .unwrap();
        let reply: SubscriptionReply = reply.decode_body().unwrap();
        assert_eq!(reply.subscription_id, "sub9");
        assert!(reply.error.is_none());
    }

    #[tokio::test]
    async fn test_subscription_stop_ends_publication() {
        let (dispatcher, _, _, _) = setup();
        let mut request = SubscriptionRequest::new("totalChanged", SubscriptionQos::default());
        request.subscription_id = "sub2".into();
        let subscribe = Envelope::with_body(
            MessageType::BroadcastSubscriptionRequest,
            "consumer",
            "calc",
            5_000,
            &request,
        )
        .unwrap();
        dispatcher.dispatch(subscribe).await;
        assert!(dispatcher.publications().contains("sub2"));

        let stop = Envelope::with_body(
            MessageType::SubscriptionStop,
            "consumer",
            "calc",
            5_000,
            &SubscriptionStop {
                subscription_id: "sub2".into(),
            },
        )
        .unwrap();
        dispatcher.dispatch(stop).await;

        assert!(!dispatcher.publications().contains("sub2"));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_dropped() {
        let (dispatcher, router, calculator, _) = setup();
        let envelope = Envelope::new(MessageType::Request, "consumer", "calc", 5_000, "{not json");

        dispatcher.dispatch(envelope).await;

        assert!(calculator.calls.lock().is_empty());
        assert!(router.routed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_remove_request_caller_stops_publications() {
        let (dispatcher, _, _, _) = setup();
        let mut request = SubscriptionRequest::new("totalChanged", SubscriptionQos::default());
        request.subscription_id = "sub3".into();
        let subscribe = Envelope::with_body(
            MessageType::BroadcastSubscriptionRequest,
            "consumer",
            "calc",
            5_000,
            &request,
        )
        .unwrap();
        dispatcher.dispatch(subscribe).await;

        assert!(dispatcher.remove_request_caller("calc"));
        assert!(dispatcher.publications().is_empty());
        assert!(!dispatcher.remove_request_caller("calc"));
    }
}
