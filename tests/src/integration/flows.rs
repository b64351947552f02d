//! # Integration Test Flows
//!
//! Round trips through the full cluster controller: transport ingress,
//! access control, routing, the dispatch pool, local providers and back out
//! through the transport the request arrived on.

#[cfg(test)]
mod tests {
    use crate::fixtures::{RadioProvider, RecordingTransport, NOW};
    use cc_01_message_routing::RouteOutcome;
    use cc_03_dispatching::{DispatchError, MessagingQos};
    use cluster_controller::{ClusterController, ClusterControllerConfig};
    use serde_json::json;
    use shared_types::{
        Address, AddressKind, Envelope, ManualTimeSource, MasterAccessControlEntry, MessageType,
        OwnerAccessControlEntry, Permission, Reply, Request, SubscriptionPublication,
        SubscriptionQos, SubscriptionReply, SubscriptionRequest, TrustLevel,
    };
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Node {
        controller: ClusterController,
        transport: Arc<RecordingTransport>,
        radio: Arc<RadioProvider>,
    }

    fn node(access_control: bool) -> Node {
        let mut config = ClusterControllerConfig::default();
        config.access_control.enabled = access_control;
        let controller =
            ClusterController::start(config, Arc::new(ManualTimeSource::new(NOW))).unwrap();

        let transport = Arc::new(RecordingTransport::default());
        controller.register_transport(AddressKind::Mqtt, transport.clone());

        let radio = Arc::new(RadioProvider::new());
        controller.register_provider("radio", "vehicle", "Radio", radio.clone());

        Node {
            controller,
            transport,
            radio,
        }
    }

    fn consumer_address() -> Address {
        Address::mqtt("tcp://broker:1883", "remote-consumer/replies")
    }

    fn inbound_request(method: &str, creator: &str, expiry: u64) -> (Request, String) {
        let request = Request::new(method, vec![json!(4), json!(5)]);
        let wire = Envelope::with_body(
            MessageType::Request,
            "remote-consumer",
            "radio",
            expiry,
            &request,
        )
        .unwrap()
        .with_reply_address(consumer_address().to_json())
        .with_creator_user_id(creator)
        .to_json()
        .unwrap();
        (request, wire)
    }

    // =============================================================================
    // REMOTE CONSUMER → LOCAL PROVIDER
    // =============================================================================

    #[tokio::test]
    async fn test_mqtt_request_is_answered_over_mqtt() {
        let node = node(true);
        node.controller.access_store().update_master(
            MasterAccessControlEntry::new("alice", "vehicle", "Radio", "*")
                .with_permissions(Permission::Yes, Permission::ALL),
        );
        let (request, wire) = inbound_request("add", "alice", NOW + 60_000);

        node.controller
            .mqtt_skeleton()
            .on_text_message_received(&wire)
            .await;
        let (address, envelope) = node.transport.wait_for(MessageType::Reply).await;

        assert_eq!(address, consumer_address());
        assert_eq!(envelope.from(), "radio");
        assert_eq!(envelope.to(), "remote-consumer");
        assert_eq!(envelope.expiry_date(), NOW + 60_000);
        let reply: Reply = envelope.decode_body().unwrap();
        assert_eq!(reply.request_reply_id, request.request_reply_id);
        assert_eq!(reply.response, vec![json!(9)]);
        assert_eq!(node.radio.calls(), vec!["add".to_string()]);

        node.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_owner_entry_denies_mqtt_request() {
        let node = node(true);
        node.controller.access_store().update_master(
            MasterAccessControlEntry::new("*", "vehicle", "Radio", "*")
                .with_permissions(Permission::Yes, Permission::ALL),
        );
        node.controller
            .access_store()
            .update_owner(OwnerAccessControlEntry::new(
                "mallory",
                "vehicle",
                "Radio",
                "*",
                TrustLevel::Low,
                Permission::No,
            ))
            .unwrap();
        let (_, wire) = inbound_request("add", "mallory", NOW + 60_000);

        node.controller
            .mqtt_skeleton()
            .on_text_message_received(&wire)
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(node.radio.calls().is_empty());
        assert!(node.transport.sent().is_empty());
        // The reply path is still learned before the gate decides.
        assert_eq!(
            node.controller.router().resolve_next_hop("remote-consumer"),
            Some(consumer_address())
        );

        node.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_expired_mqtt_request_has_no_effect() {
        let node = node(false);
        let (_, wire) = inbound_request("add", "alice", NOW - 1);

        node.controller
            .mqtt_skeleton()
            .on_text_message_received(&wire)
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(node.radio.calls().is_empty());
        assert!(node.transport.sent().is_empty());
        assert!(node.controller.router().queue().is_empty());
        assert_eq!(node.controller.router().resolve_next_hop("remote-consumer"), None);

        node.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_remote_attribute_subscription_receives_publications() {
        let node = node(false);
        let mut request = SubscriptionRequest::new("volume", SubscriptionQos::default());
        request.subscription_id = "sub-remote".into();
        let wire = Envelope::with_body(
            MessageType::SubscriptionRequest,
            "remote-consumer",
            "radio",
            NOW + 60_000,
            &request,
        )
        .unwrap()
        .with_reply_address(consumer_address().to_json())
        .to_json()
        .unwrap();

        node.controller
            .mqtt_skeleton()
            .on_text_message_received(&wire)
            .await;
        let (_, ack) = node.transport.wait_for(MessageType::SubscriptionReply).await;
        let ack: SubscriptionReply = ack.decode_body().unwrap();
        assert_eq!(ack.subscription_id, "sub-remote");
        assert!(ack.error.is_none());

        // Initial value from getVolume, then a change notification.
        node.transport.wait_for(MessageType::Publication).await;
        node.radio.set_volume(12);
        let publications = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let publications: Vec<SubscriptionPublication> = node
                    .transport
                    .sent()
                    .iter()
                    .filter(|(_, e)| e.msg_type() == MessageType::Publication)
                    .map(|(_, e)| e.decode_body().unwrap())
                    .collect();
                if publications.len() == 2 {
                    return publications;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(publications[0].response, vec![json!(7)]);
        assert_eq!(publications[1].response, vec![json!(12)]);
        assert!(publications.iter().all(|p| p.subscription_id == "sub-remote"));

        node.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_mqtt_messages_are_dropped() {
        let node = node(false);
        let skeleton = node.controller.mqtt_skeleton();

        skeleton.on_text_message_received("not json").await;
        skeleton
            .on_text_message_received(
                r#"{"type":"shout","header":{"from":"x","to":"radio","expiryDate":"9999999999999"},"payload":"{}"}"#,
            )
            .await;
        skeleton.on_raw_message_received(&[0xff, 0xfe]).await;

        assert_eq!(node.controller.router().routing_table_len(), 1);
        assert!(node.controller.router().queue().is_empty());
        assert!(node.radio.calls().is_empty());

        node.controller.shutdown().await;
    }

    // =============================================================================
    // LOCAL CONSUMER → REMOTE PROVIDER
    // =============================================================================

    #[tokio::test]
    async fn test_local_proxy_call_resolved_by_mqtt_reply() {
        let node = node(true);
        node.controller
            .router()
            .add_next_hop("remote-nav", Address::mqtt("tcp://broker:1883", "nav"));
        let proxy = node.controller.create_proxy(
            "nav-proxy",
            "remote-nav",
            MessagingQos::with_ttl(Duration::from_secs(30)),
            Duration::from_secs(10),
        );

        let call = tokio::spawn(async move {
            let first = proxy.get_attribute("destination").await;
            // Served from the cache; no second request goes out.
            let second = proxy.get_attribute("destination").await;
            (first, second)
        });

        let (_, outgoing) = node.transport.wait_for(MessageType::Request).await;
        let request: Request = outgoing.decode_body().unwrap();
        assert_eq!(request.method_name, "getDestination");

        let wire = Envelope::with_body(
            MessageType::Reply,
            "remote-nav",
            "nav-proxy",
            outgoing.expiry_date(),
            &Reply::success(request.request_reply_id, vec![json!("Vienna")]),
        )
        .unwrap()
        .to_json()
        .unwrap();
        node.controller
            .mqtt_skeleton()
            .on_text_message_received(&wire)
            .await;

        let (first, second) = call.await.unwrap();
        assert_eq!(first.unwrap(), json!("Vienna"));
        assert_eq!(second.unwrap(), json!("Vienna"));
        let requests = node
            .transport
            .sent()
            .iter()
            .filter(|(_, e)| e.msg_type() == MessageType::Request)
            .count();
        assert_eq!(requests, 1);

        node.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_local_call_to_unreachable_provider_is_queued_then_times_out() {
        let node = node(true);
        let proxy = node.controller.create_proxy(
            "nav-proxy",
            "unknown-nav",
            MessagingQos::with_ttl(Duration::from_millis(100)),
            Duration::ZERO,
        );

        let err = proxy.call("route", vec![]).await.unwrap_err();

        assert!(matches!(err, DispatchError::Timeout(ref method) if method == "route"));
        assert_eq!(node.controller.router().queue().len_for("unknown-nav"), 1);

        node.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_access_control_only_guards_local_providers() {
        let node = node(true);
        let router = node.controller.router();
        router.add_next_hop("remote-nav", Address::mqtt("tcp://broker:1883", "nav"));

        let call = |to: &str| {
            Envelope::with_body(
                MessageType::Request,
                "local-consumer",
                to,
                NOW + 60_000,
                &Request::new("route", vec![]),
            )
            .unwrap()
            .with_creator_user_id("alice")
        };

        // The controller hosting the provider decides on remote calls.
        assert_eq!(
            router.route(call("remote-nav")).await.unwrap(),
            RouteOutcome::Delivered
        );
        assert_eq!(
            router.route(call("not-yet-known")).await.unwrap(),
            RouteOutcome::Queued
        );
        // No entry grants alice anything on the local radio.
        assert_eq!(
            router.route(call("radio")).await.unwrap(),
            RouteOutcome::Denied
        );

        assert_eq!(router.queue().len_for("not-yet-known"), 1);
        assert_eq!(node.transport.sent().len(), 1);
        assert!(node.radio.calls().is_empty());

        node.controller.shutdown().await;
    }
}
