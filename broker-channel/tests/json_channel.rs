/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use broker_channel::{
    BrokerChannel, BrokerError, ChannelEvent, ConsumeOptions, Error, GetOptions, JsonChannel,
    PublishOptions, Simplify, JSON_CONTENT_TYPE,
};
use integration_test_utils::{
    delivery, EventRecorder, MockChannel, RecordingHandler, Settlement,
};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
struct Job {
    id: u32,
}

struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("refusing to serialize"))
    }
}

fn simplified() -> (Arc<MockChannel>, Arc<JsonChannel>) {
    integration_test_utils::init_logging();
    let channel = Arc::new(MockChannel::new());
    let raw: Arc<dyn BrokerChannel> = channel.clone();
    (channel, raw.simplify())
}

#[tokio::test]
async fn simplifying_twice_returns_the_same_channel() {
    let (channel, json_channel) = simplified();

    let again = json_channel.clone().simplify();

    assert!(Arc::ptr_eq(&json_channel, &again));
    assert_eq!(channel.listener_count(), 1);
}

#[tokio::test]
async fn simplifying_the_same_raw_channel_twice_wraps_it_once() {
    integration_test_utils::init_logging();
    let channel = Arc::new(MockChannel::new());
    let raw: Arc<dyn BrokerChannel> = channel.clone();

    let first = raw.clone().simplify();
    let second = raw.simplify();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(channel.listener_count(), 1);
}

#[tokio::test]
async fn raw_channel_is_wrapped_again_after_its_wrapper_is_dropped() {
    let (channel, json_channel) = simplified();
    drop(json_channel);

    let raw: Arc<dyn BrokerChannel> = channel.clone();
    let rewrapped = raw.simplify();
    channel
        .emit(ChannelEvent::Blocked {
            reason: "low on memory".to_string(),
        })
        .await;

    assert!(rewrapped.is_blocked());
    assert_eq!(channel.listener_count(), 2);
}

#[tokio::test]
async fn publish_writes_json_and_resolves_on_ack() {
    let (channel, json_channel) = simplified();
    channel.hold_confirms();

    let outcome = json_channel
        .publish("events", "job.created", &Job { id: 7 }, PublishOptions::default())
        .expect("payload should encode");
    assert!(outcome.ok());

    let writes = channel.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].exchange, "events");
    assert_eq!(writes[0].routing_key, "job.created");
    assert_eq!(writes[0].content, br#"{"id":7}"#.to_vec());
    assert_eq!(
        writes[0].options.properties.content_type.as_deref(),
        Some(JSON_CONTENT_TYPE)
    );

    assert!(channel.confirm_next(Ok(())));
    outcome.await.expect("acked write should resolve");
}

#[tokio::test]
async fn a_rejected_write_does_not_affect_other_writes() {
    let (channel, json_channel) = simplified();
    channel.hold_confirms();

    let first = json_channel
        .publish("events", "job.created", &json!({ "id": 1 }), PublishOptions::default())
        .unwrap();
    let second = json_channel
        .publish("events", "job.created", &json!({ "id": 2 }), PublishOptions::default())
        .unwrap();

    channel.confirm_next(Err(BrokerError::new("message nacked")));
    channel.confirm_next(Ok(()));

    match first.await {
        Err(Error::Write(err)) => assert_eq!(err.message, "message nacked"),
        other => panic!("expected rejected write, got {other:?}"),
    }
    second.await.expect("second write should still be acked");
}

#[tokio::test]
async fn saturated_buffer_is_reported_but_write_still_resolves() {
    let (channel, json_channel) = simplified();
    channel.set_write_hint(false);

    let outcome = json_channel
        .send_to_queue("jobs", &Job { id: 3 }, PublishOptions::persistent())
        .unwrap();

    assert!(!outcome.ok());
    outcome.await.expect("acked write should resolve");

    let writes = channel.writes();
    assert_eq!(writes[0].exchange, "");
    assert_eq!(writes[0].routing_key, "jobs");
    assert!(writes[0].options.persistent);
    assert_eq!(
        writes[0].options.properties.content_type.as_deref(),
        Some(JSON_CONTENT_TYPE)
    );
}

#[tokio::test]
async fn unencodable_payload_is_rejected_without_writing() {
    let (channel, json_channel) = simplified();

    let result = json_channel.publish("events", "x", &Unserializable, PublishOptions::default());

    assert!(matches!(result, Err(Error::Encode(_))));
    assert!(channel.writes().is_empty());
}

#[tokio::test]
async fn pending_write_fails_when_channel_drops_the_confirm() {
    let (channel, json_channel) = simplified();
    channel.hold_confirms();

    let outcome = json_channel
        .send_to_queue("jobs", &Job { id: 4 }, PublishOptions::default())
        .unwrap();
    channel.drop_pending_confirms();

    assert!(matches!(outcome.await, Err(Error::ChannelClosed)));
}

#[tokio::test]
async fn get_decodes_payload_and_keeps_the_envelope() {
    let (channel, json_channel) = simplified();
    channel.push_get(Ok(Some(delivery(11, "jobs", br#"{"id":5}"#))));

    let (job, envelope) = json_channel
        .get::<Job>("jobs", &GetOptions::default())
        .await
        .unwrap()
        .expect("a message should be fetched");

    assert_eq!(job, Job { id: 5 });
    assert_eq!(envelope.delivery_tag(), 11);
    assert_eq!(envelope.fields.routing_key, "jobs");
}

#[tokio::test]
async fn get_on_empty_queue_returns_none() {
    let (_channel, json_channel) = simplified();

    let fetched = json_channel
        .get::<Job>("jobs", &GetOptions::default())
        .await
        .unwrap();

    assert!(fetched.is_none());
}

#[tokio::test]
async fn get_surfaces_decode_and_broker_failures() {
    let (channel, json_channel) = simplified();
    channel.push_get(Ok(Some(delivery(1, "jobs", b"<xml/>"))));
    channel.push_get(Err(BrokerError::with_code(404, "NOT_FOUND")));

    let undecodable = json_channel.get::<Job>("jobs", &GetOptions::default()).await;
    let rejected = json_channel.get::<Job>("jobs", &GetOptions::default()).await;

    assert!(matches!(undecodable, Err(Error::Decode(_))));
    match rejected {
        Err(Error::Rpc(err)) => assert_eq!(err.code, Some(404)),
        other => panic!("expected rpc failure, got {other:?}"),
    }
}

#[tokio::test]
async fn consume_hands_decoded_payloads_to_the_handler() {
    let (channel, json_channel) = simplified();
    let handler = Arc::new(RecordingHandler::<Job>::new());

    let consume_ok = json_channel
        .consume("jobs", handler.clone(), &ConsumeOptions::default())
        .await
        .unwrap();

    channel
        .deliver(&consume_ok.consumer_tag, Some(delivery(1, "jobs", br#"{"id":1}"#)))
        .await;
    channel
        .deliver(&consume_ok.consumer_tag, Some(delivery(2, "jobs", b"not json")))
        .await;

    let messages = handler.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, Job { id: 1 });
    assert_eq!(messages[0].1.delivery_tag(), 1);
    assert_eq!(handler.rejected()[0].delivery_tag(), 2);

    json_channel.ack(&messages[0].1).await.unwrap();
    json_channel.nack(&handler.rejected()[0], false).await.unwrap();
    assert_eq!(
        channel.settlements(),
        vec![
            Settlement::Ack { delivery_tag: 1 },
            Settlement::Nack {
                delivery_tag: 2,
                requeue: false
            },
        ]
    );
}

#[tokio::test]
async fn broker_cancel_emits_cancelled_and_allows_resubscribe() {
    let (channel, json_channel) = simplified();
    let recorder = Arc::new(EventRecorder::new());
    json_channel.register_listener(recorder.clone());
    let handler = Arc::new(RecordingHandler::<Job>::new());
    let options = ConsumeOptions {
        exclusive: true,
        ..ConsumeOptions::default()
    };

    let first = json_channel
        .consume("jobs", handler.clone(), &options)
        .await
        .unwrap();
    channel.deliver(&first.consumer_tag, None).await;

    assert!(handler.messages().is_empty());
    assert!(handler.rejected().is_empty());
    let cancelled = match recorder.events().as_slice() {
        [ChannelEvent::Cancelled(cancelled)] => cancelled.clone(),
        other => panic!("expected one cancelled event, got {other:?}"),
    };
    assert_eq!(cancelled.queue, "jobs");
    assert_eq!(cancelled.options, options);

    let second = json_channel.resubscribe(&cancelled).await.unwrap();
    channel
        .deliver(&second.consumer_tag, Some(delivery(9, "jobs", br#"{"id":9}"#)))
        .await;

    let consumes = channel.consumes();
    assert_eq!(consumes.len(), 2);
    assert_eq!(consumes[1].queue, "jobs");
    assert_eq!(consumes[1].options, options);
    assert_eq!(handler.messages()[0].0, Job { id: 9 });
}

#[tokio::test]
async fn cancel_and_close_pass_through() {
    let (channel, json_channel) = simplified();

    json_channel.cancel("amq.ctag-1").await.unwrap();
    json_channel.close().await.unwrap();

    assert_eq!(channel.cancelled_tags(), vec!["amq.ctag-1".to_string()]);
    assert_eq!(channel.close_count(), 1);
}

#[tokio::test]
async fn flow_control_follows_blocked_and_unblocked() {
    let (channel, json_channel) = simplified();
    let flow_control = json_channel.flow_control();
    let recorder = Arc::new(EventRecorder::new());
    json_channel.register_listener(recorder.clone());

    assert!(!json_channel.is_blocked());

    channel
        .emit(ChannelEvent::Blocked {
            reason: "low on memory".to_string(),
        })
        .await;
    assert!(json_channel.is_blocked());
    assert!(flow_control.is_blocked());

    channel.emit(ChannelEvent::Drain).await;
    channel.emit(ChannelEvent::Error(BrokerError::new("boom"))).await;
    assert!(json_channel.is_blocked());

    channel.emit(ChannelEvent::Unblocked).await;
    assert!(!json_channel.is_blocked());

    assert_eq!(recorder.events().len(), 4);
}
