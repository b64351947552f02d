//! # Cross-Subsystem Scenarios
//!
//! 1. **Reply-address learning**: an MQTT request teaches the router how to
//!    reach its sender and is queued until its destination is known.
//! 2. **Operation-level permission**: an interface-level `ASK` leads to
//!    exactly one operation lookup before the router decides.
//! 3. **Subscription failure**: an error in a subscription reply tears the
//!    subscription down and reaches the listener once.

#[cfg(test)]
mod tests {
    use crate::fixtures::{RecordingListener, RecordingTransport, NOW};
    use async_trait::async_trait;
    use cc_01_message_routing::{
        InProcessMessagingSkeleton, MessageRouter, MqttMessagingSkeleton, RouteOutcome, Router,
    };
    use cc_02_access_control::{
        AccessController, ConsumerPermissionLookup, InterfacePermission, ProviderDirectory,
    };
    use cc_03_dispatching::{DispatchError, MessagingQos};
    use cluster_controller::{ClusterController, ClusterControllerConfig};
    use parking_lot::Mutex;
    use serde_json::json;
    use shared_types::{
        Address, AddressKind, Envelope, ManualTimeSource, MessageType, Permission, RemoteError,
        RemoteErrorKind, Request, SubscriptionQos, SubscriptionReply, SubscriptionRequest,
        TrustLevel,
    };
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // SCENARIO 1: REPLY-ADDRESS LEARNING
    // =============================================================================

    #[tokio::test]
    async fn test_mqtt_request_learns_sender_and_waits_for_destination() {
        let router = Router::new(Arc::new(ManualTimeSource::new(NOW)));
        let transport = Arc::new(RecordingTransport::default());
        router.register_sender(AddressKind::Mqtt, transport.clone());
        let skeleton = MqttMessagingSkeleton::new(router.clone());

        let sender_address = Address::mqtt("tcp://broker:1883", "consumer-S/low");
        let request = Request::new("add", vec![json!(1), json!(2)]);
        let wire = Envelope::with_body(MessageType::Request, "S", "P", NOW + 60_000, &request)
            .unwrap()
            .with_reply_address(sender_address.to_json())
            .to_json()
            .unwrap();

        skeleton.on_text_message_received(&wire).await;

        assert_eq!(router.resolve_next_hop("S"), Some(sender_address));
        assert_eq!(router.queue().len_for("P"), 1);
        assert!(transport.sent().is_empty());

        // Learning the destination releases the queued request.
        let provider_address = Address::mqtt("tcp://broker:1883", "provider-P/low");
        router.add_next_hop("P", provider_address.clone());
        let (address, envelope) = transport.wait_for(MessageType::Request).await;

        assert_eq!(address, provider_address);
        assert_eq!(envelope.from(), "S");
        assert_eq!(router.queue().len_for("P"), 0);
    }

    // =============================================================================
    // SCENARIO 2: OPERATION-LEVEL PERMISSION
    // =============================================================================

    /// Answers `ASK` at interface level and a fixed permission per operation.
    struct AskingLookup {
        operation_answer: Permission,
        interface_lookups: Mutex<usize>,
        operation_lookups: Mutex<Vec<String>>,
    }

    impl AskingLookup {
        fn new(operation_answer: Permission) -> Self {
            Self {
                operation_answer,
                interface_lookups: Mutex::new(0),
                operation_lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConsumerPermissionLookup for AskingLookup {
        async fn consumer_permission(
            &self,
            _user_id: &str,
            _domain: &str,
            _interface_name: &str,
            _trust_level: TrustLevel,
        ) -> InterfacePermission {
            *self.interface_lookups.lock() += 1;
            InterfacePermission::Permission(Permission::Ask)
        }

        async fn operation_permission(
            &self,
            _user_id: &str,
            _domain: &str,
            _interface_name: &str,
            operation: &str,
            _trust_level: TrustLevel,
        ) -> Permission {
            self.operation_lookups.lock().push(operation.to_string());
            self.operation_answer
        }
    }

    fn gated_router(lookup: Arc<AskingLookup>) -> (Router, Arc<RecordingTransport>) {
        let router = Router::new(Arc::new(ManualTimeSource::new(NOW)));
        let transport = Arc::new(RecordingTransport::default());
        router.register_sender(AddressKind::InProcess, transport.clone());
        router.add_next_hop("P", Address::InProcess);

        let directory = Arc::new(ProviderDirectory::new());
        directory.register("P", "vehicle", "Radio");
        router.set_access_gate(Arc::new(AccessController::new(
            lookup,
            directory,
            TrustLevel::High,
        )));
        (router, transport)
    }

    fn foo_request() -> Envelope {
        Envelope::with_body(
            MessageType::Request,
            "consumer",
            "P",
            NOW + 60_000,
            &Request::new("foo", vec![]),
        )
        .unwrap()
        .with_creator_user_id("alice")
    }

    #[tokio::test]
    async fn test_ask_triggers_exactly_one_operation_lookup() {
        let lookup = Arc::new(AskingLookup::new(Permission::Yes));
        let (router, transport) = gated_router(lookup.clone());
        let skeleton = InProcessMessagingSkeleton::new(router);

        let outcome = skeleton.route(foo_request()).await.unwrap();

        assert_eq!(outcome, RouteOutcome::Delivered);
        assert_eq!(*lookup.interface_lookups.lock(), 1);
        assert_eq!(*lookup.operation_lookups.lock(), vec!["foo".to_string()]);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_operation_denial_drops_request() {
        let lookup = Arc::new(AskingLookup::new(Permission::No));
        let (router, transport) = gated_router(lookup.clone());

        let outcome = router.route(foo_request()).await.unwrap();

        assert_eq!(outcome, RouteOutcome::Denied);
        assert_eq!(lookup.operation_lookups.lock().len(), 1);
        assert!(transport.sent().is_empty());
        assert!(router.queue().is_empty());
    }

    // =============================================================================
    // SCENARIO 3: SUBSCRIPTION FAILURE
    // =============================================================================

    #[tokio::test]
    async fn test_subscription_reply_error_fails_future_and_notifies_once() {
        let controller = ClusterController::start(
            ClusterControllerConfig::default(),
            Arc::new(ManualTimeSource::new(NOW)),
        )
        .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        controller.register_transport(AddressKind::Mqtt, transport.clone());
        controller
            .router()
            .add_next_hop("remote-radio", Address::mqtt("tcp://broker:1883", "radio"));
        controller.register_consumer("consumer-1");

        let listener = Arc::new(RecordingListener::default());
        let mut request = SubscriptionRequest::new("volume", SubscriptionQos::default());
        request.subscription_id = "sub1".into();

        let subscribe = {
            let facade = controller.facade().clone();
            let listener = listener.clone();
            tokio::spawn(async move {
                facade
                    .subscribe(
                        "consumer-1",
                        "remote-radio",
                        request,
                        listener,
                        &MessagingQos::with_ttl(Duration::from_secs(30)),
                        false,
                    )
                    .await
            })
        };
        transport.wait_for(MessageType::SubscriptionRequest).await;

        let error = RemoteError::subscription("attribute volume is not notifiable");
        let reply = SubscriptionReply {
            subscription_id: "sub1".into(),
            error: Some(error.clone()),
        };
        let wire = Envelope::with_body(
            MessageType::SubscriptionReply,
            "remote-radio",
            "consumer-1",
            NOW + 60_000,
            &reply,
        )
        .unwrap()
        .to_json()
        .unwrap();
        let skeleton = controller.mqtt_skeleton();
        skeleton.on_text_message_received(&wire).await;

        let result = subscribe.await.unwrap();
        assert!(matches!(
            result,
            Err(DispatchError::Remote(ref e)) if e.kind == RemoteErrorKind::Subscription
        ));
        assert!(!controller.dispatcher().correlation().has_subscription("sub1"));

        // A late duplicate finds no entry.
        skeleton.on_text_message_received(&wire).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*listener.errors.lock(), vec![error]);
        assert!(listener.subscribed.lock().is_empty());

        controller.shutdown().await;
    }
}
