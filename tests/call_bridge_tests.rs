//! End-to-end tests for the call bridge
//!
//! Both call legs are in-memory channels: the test plays Twilio on one side
//! and the Realtime API on the other, and checks what the bridge sends to
//! each and how the call ends.

use std::time::Duration;

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use call_bridge::core::bridge::{
    BridgeError, BridgeOptions, BridgeResult, CallBridge, CallOutcome, Peer,
};
use call_bridge::core::channel::Channel;
use call_bridge::run_call_bridge;

const STEP: Duration = Duration::from_secs(5);

/// The far end of one in-memory socket.
struct Remote {
    tx: mpsc::UnboundedSender<Result<String, BridgeError>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Remote {
    fn send(&self, event: Value) {
        self.tx.unbounded_send(Ok(event.to_string())).unwrap();
    }

    fn send_raw(&self, text: &str) {
        self.tx.unbounded_send(Ok(text.to_string())).unwrap();
    }

    async fn recv(&mut self) -> Value {
        let text = timeout(STEP, self.rx.next())
            .await
            .expect("timed out waiting for the bridge")
            .expect("socket closed");
        serde_json::from_str(&text).unwrap()
    }

    /// Receive until an event with the given type tag arrives.
    async fn recv_until(&mut self, tag: &str, key: &str) -> Value {
        loop {
            let event = self.recv().await;
            if event[tag] == key {
                return event;
            }
        }
    }

    /// Wait for the bridge to close this socket.
    async fn closed(&mut self) {
        loop {
            match timeout(STEP, self.rx.next()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return,
                Err(_) => panic!("socket was not closed"),
            }
        }
    }
}

fn socket(peer: Peer) -> (Channel, Remote) {
    let (out_tx, out_rx) = mpsc::unbounded::<String>();
    let (in_tx, in_rx) = mpsc::unbounded::<Result<String, BridgeError>>();
    let channel = Channel::new(
        out_tx.sink_map_err(move |e| BridgeError::transport(peer, e)),
        in_rx,
    );
    (
        channel,
        Remote {
            tx: in_tx,
            rx: out_rx,
        },
    )
}

fn test_options() -> BridgeOptions {
    BridgeOptions {
        hangup_grace: Duration::from_millis(50),
        show_timing_math: true,
        ..BridgeOptions::default()
    }
}

struct Call {
    twilio: Remote,
    openai: Remote,
    handle: JoinHandle<BridgeResult<CallOutcome>>,
}

impl Call {
    /// Start a call and consume the handshake.
    async fn start(options: BridgeOptions) -> Self {
        let (telephony, twilio) = socket(Peer::Telephony);
        let (model, mut openai) = socket(Peer::Model);
        let greeting = options.greeting.is_some();

        let handle = tokio::spawn(async move {
            CallBridge::new(options)
                .run(telephony, model, "You are a test assistant.")
                .await
        });

        let update = openai.recv().await;
        assert_eq!(update["type"], "session.update");
        if greeting {
            assert_eq!(openai.recv().await["type"], "conversation.item.create");
            assert_eq!(openai.recv().await["type"], "response.create");
        }
        openai.send(json!({"type": "session.updated", "session": {"id": "sess_1"}}));

        Self {
            twilio,
            openai,
            handle,
        }
    }

    async fn outcome(self) -> BridgeResult<CallOutcome> {
        timeout(STEP, self.handle)
            .await
            .expect("bridge did not finish")
            .unwrap()
    }

    fn stream_start(&self) {
        self.twilio.send(json!({
            "event": "start",
            "sequenceNumber": "1",
            "start": {"streamSid": "MZ1", "callSid": "CA1", "tracks": ["inbound"]},
            "streamSid": "MZ1"
        }));
    }

    /// Send caller frames and wait until all of them reached the model.
    async fn caller_audio(&mut self, timestamps: impl IntoIterator<Item = u64>) {
        let mut sent = 0;
        for ts in timestamps {
            self.twilio.send(json!({
                "event": "media",
                "streamSid": "MZ1",
                "media": {"track": "inbound", "timestamp": ts.to_string(), "payload": "//8A"}
            }));
            sent += 1;
        }
        for _ in 0..sent {
            let append = self.openai.recv_until("type", "input_audio_buffer.append").await;
            assert_eq!(append["audio"], "//8A");
        }
    }

    fn assistant_audio(&self, item_id: &str) {
        self.openai.send(json!({
            "type": "response.audio.delta",
            "response_id": "resp_1",
            "item_id": item_id,
            "output_index": 0,
            "content_index": 0,
            "delta": "AAAA"
        }));
    }

    fn response_done(&self, transcript: &str) {
        self.openai.send(json!({
            "type": "response.done",
            "response": {
                "id": "resp_1",
                "status": "completed",
                "output": [{
                    "id": "item_X",
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "audio", "transcript": transcript}]
                }]
            }
        }));
    }
}

#[tokio::test]
async fn test_handshake_configures_telephony_audio() {
    let (telephony, twilio) = socket(Peer::Telephony);
    let (model, mut openai) = socket(Peer::Model);

    let handle =
        tokio::spawn(async move { run_call_bridge(telephony, model, "Be brief.").await });

    let update = openai.recv().await;
    assert_eq!(update["type"], "session.update");
    let session = &update["session"];
    assert_eq!(session["instructions"], "Be brief.");
    assert_eq!(session["input_audio_format"], "g711_ulaw");
    assert_eq!(session["output_audio_format"], "g711_ulaw");
    assert_eq!(session["voice"], "alloy");
    assert_eq!(session["turn_detection"]["type"], "server_vad");
    assert_eq!(session["modalities"], json!(["text", "audio"]));
    assert!(session.get("tools").is_none());

    twilio.send(json!({"event": "stop", "streamSid": "MZ1"}));
    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_greeting_seeds_first_response() {
    let options = BridgeOptions {
        greeting: Some("Greet the caller.".to_string()),
        ..test_options()
    };
    let call = Call::start(options).await;

    call.twilio.send(json!({"event": "stop"}));
    assert_eq!(call.outcome().await.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_caller_audio_is_forwarded_in_order() {
    let mut call = Call::start(test_options()).await;
    call.twilio.send(json!({"event": "connected", "protocol": "Call", "version": "1.0.0"}));
    call.stream_start();

    call.caller_audio([0, 20, 40]).await;

    call.twilio.send(json!({"event": "stop"}));
    assert_eq!(call.outcome().await.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_assistant_audio_is_played_with_marks() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.caller_audio((0..=500).step_by(20)).await;

    call.assistant_audio("item_X");

    let media = call.twilio.recv().await;
    assert_eq!(
        media,
        json!({"event": "media", "streamSid": "MZ1", "media": {"payload": "AAAA"}})
    );
    let mark = call.twilio.recv().await;
    assert_eq!(
        mark,
        json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "responsePart"}})
    );

    call.twilio.send(json!({"event": "stop"}));
    assert_eq!(call.outcome().await.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_barge_in_truncates_at_played_offset() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.caller_audio((0..=500).step_by(20)).await;

    call.assistant_audio("item_X");
    call.twilio.recv_until("event", "mark").await;

    call.caller_audio((520..=900).step_by(20)).await;
    call.openai.send(json!({
        "type": "input_audio_buffer.speech_started",
        "audio_start_ms": 880,
        "item_id": "item_user"
    }));

    let truncate = call
        .openai
        .recv_until("type", "conversation.item.truncate")
        .await;
    assert_eq!(truncate["item_id"], "item_X");
    assert_eq!(truncate["content_index"], 0);
    assert_eq!(truncate["audio_end_ms"], 400);

    let clear = call.twilio.recv().await;
    assert_eq!(clear, json!({"event": "clear", "streamSid": "MZ1"}));

    // Late audio for the truncated item never reaches the caller.
    call.assistant_audio("item_X");
    call.assistant_audio("item_Y");
    let media = call.twilio.recv().await;
    assert_eq!(media["event"], "media");
    let mark = call.twilio.recv().await;
    assert_eq!(mark["event"], "mark");

    // A second speech_started interrupts the new item, not the old one.
    call.openai.send(json!({"type": "input_audio_buffer.speech_started", "audio_start_ms": 900}));
    let truncate = call
        .openai
        .recv_until("type", "conversation.item.truncate")
        .await;
    assert_eq!(truncate["item_id"], "item_Y");
    assert_eq!(truncate["audio_end_ms"], 0);

    call.twilio.send(json!({"event": "stop"}));
    assert_eq!(call.outcome().await.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_speech_started_while_idle_sends_nothing() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.caller_audio([0, 20]).await;

    call.openai.send(json!({"type": "input_audio_buffer.speech_started", "audio_start_ms": 20}));
    call.twilio.send(json!({"event": "stop"}));

    let Call {
        mut twilio,
        mut openai,
        handle,
    } = call;
    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), CallOutcome::CallerHangup);

    // No clear and no truncate before the sockets close.
    while let Some(text) = twilio.rx.next().await {
        let event: Value = serde_json::from_str(&text).unwrap();
        assert_ne!(event["event"], "clear");
    }
    while let Some(text) = openai.rx.next().await {
        let event: Value = serde_json::from_str(&text).unwrap();
        assert_ne!(event["type"], "conversation.item.truncate");
    }
}

#[tokio::test]
async fn test_barge_in_after_response_done_truncates_unplayed_audio() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.caller_audio((0..=500).step_by(20)).await;

    for _ in 0..3 {
        call.assistant_audio("item_X");
        assert_eq!(call.twilio.recv().await["event"], "media");
        assert_eq!(call.twilio.recv().await["event"], "mark");
    }
    call.response_done("Anything else?");

    // None of the marks came back, so the caller is still hearing item_X.
    call.caller_audio((520..=900).step_by(20)).await;
    call.openai.send(json!({
        "type": "input_audio_buffer.speech_started",
        "audio_start_ms": 900,
        "item_id": "item_user"
    }));

    let truncate = call
        .openai
        .recv_until("type", "conversation.item.truncate")
        .await;
    assert_eq!(truncate["item_id"], "item_X");
    assert_eq!(truncate["audio_end_ms"], 400);
    let clear = call.twilio.recv().await;
    assert_eq!(clear, json!({"event": "clear", "streamSid": "MZ1"}));

    call.twilio.send(json!({"event": "stop"}));
    assert_eq!(call.outcome().await.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_marks_acked_after_response_done_end_the_utterance() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.caller_audio([0, 20]).await;

    call.assistant_audio("item_X");
    call.twilio.recv_until("event", "mark").await;
    call.response_done("Anything else?");
    call.twilio
        .send(json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "responsePart"}}));
    call.caller_audio([40]).await;

    call.openai.send(json!({"type": "input_audio_buffer.speech_started", "audio_start_ms": 40}));
    call.twilio.send(json!({"event": "stop"}));

    let Call {
        mut twilio,
        mut openai,
        handle,
    } = call;
    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), CallOutcome::CallerHangup);

    // Fully played audio is not truncated.
    while let Some(text) = twilio.rx.next().await {
        let event: Value = serde_json::from_str(&text).unwrap();
        assert_ne!(event["event"], "clear");
    }
    while let Some(text) = openai.rx.next().await {
        let event: Value = serde_json::from_str(&text).unwrap();
        assert_ne!(event["type"], "conversation.item.truncate");
    }
}

#[tokio::test]
async fn test_sentinel_hangs_up_after_grace_period() {
    let options = BridgeOptions {
        hangup_grace: Duration::from_millis(300),
        ..test_options()
    };
    let mut call = Call::start(options).await;
    call.stream_start();
    call.caller_audio([0]).await;

    call.assistant_audio("item_X");
    call.twilio.recv_until("event", "mark").await;
    call.response_done("Thanks for calling, goodbye! [END_CALL]");

    // Audio still arriving during the grace period is played out, and
    // both legs stay open.
    call.assistant_audio("item_X");
    let media = call.twilio.recv().await;
    assert_eq!(media["event"], "media");
    assert_eq!(media["media"]["payload"], "AAAA");
    assert_eq!(call.twilio.recv().await["event"], "mark");
    call.caller_audio([20]).await;
    assert!(!call.handle.is_finished());

    let Call {
        mut twilio,
        mut openai,
        handle,
    } = call;

    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), CallOutcome::AssistantHangup);
    twilio.closed().await;
    openai.closed().await;
}

#[tokio::test]
async fn test_transcript_without_sentinel_keeps_call_open() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.caller_audio([0]).await;

    call.response_done("How else can I help?");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!call.handle.is_finished());

    call.twilio.send(json!({"event": "stop"}));
    assert_eq!(call.outcome().await.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_end_call_function_hangs_up() {
    let mut options = test_options();
    options.session.end_call_tool = true;

    let (telephony, twilio) = socket(Peer::Telephony);
    let (model, mut openai) = socket(Peer::Model);
    let handle =
        tokio::spawn(async move { CallBridge::new(options).run(telephony, model, "hi").await });

    let update = openai.recv().await;
    assert_eq!(update["session"]["tools"][0]["name"], "end_call");
    openai.send(json!({"type": "session.updated", "session": {"id": "sess_1"}}));
    twilio.send(json!({"event": "start", "start": {"streamSid": "MZ1"}}));

    openai.send(json!({
        "type": "response.done",
        "response": {
            "id": "resp_2",
            "output": [{"id": "fc_1", "type": "function_call", "name": "end_call", "call_id": "call_1", "arguments": "{}"}]
        }
    }));

    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), CallOutcome::AssistantHangup);
}

#[tokio::test]
async fn test_mark_with_empty_queue_is_noop() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.twilio
        .send(json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "responsePart"}}));
    call.caller_audio([0, 20]).await;

    assert!(!call.handle.is_finished());
    call.twilio.send(json!({"event": "stop"}));
    assert_eq!(call.outcome().await.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_upstream_error_mid_utterance_ends_call() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.caller_audio([0, 20]).await;
    call.assistant_audio("item_X");
    call.twilio.recv_until("event", "mark").await;

    call.openai.send(json!({
        "type": "error",
        "event_id": "evt_9",
        "error": {"type": "server_error", "code": "server_error", "message": "Internal failure"}
    }));

    let Call {
        mut twilio,
        handle,
        ..
    } = call;
    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    match outcome {
        Err(BridgeError::UpstreamProtocol { code, message }) => {
            assert_eq!(code, "server_error");
            assert_eq!(message, "Internal failure");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    twilio.closed().await;
}

#[tokio::test]
async fn test_error_before_session_updated_is_configuration_failure() {
    let (telephony, mut twilio) = socket(Peer::Telephony);
    let (model, mut openai) = socket(Peer::Model);
    let handle = tokio::spawn(async move { run_call_bridge(telephony, model, "hi").await });

    assert_eq!(openai.recv().await["type"], "session.update");
    openai.send(json!({
        "type": "error",
        "error": {"type": "invalid_request_error", "code": "invalid_value", "message": "Invalid voice"}
    }));

    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert!(matches!(outcome, Err(BridgeError::Configuration(_))));
    twilio.closed().await;
}

#[tokio::test]
async fn test_stop_twice_tears_down_once() {
    let mut call = Call::start(test_options()).await;
    call.stream_start();
    call.twilio.send(json!({"event": "stop"}));
    call.twilio.send(json!({"event": "stop"}));

    let Call {
        mut twilio,
        mut openai,
        handle,
    } = call;
    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), CallOutcome::CallerHangup);
    twilio.closed().await;
    openai.closed().await;
}

#[tokio::test]
async fn test_caller_disconnect_without_stop() {
    let call = Call::start(test_options()).await;
    call.stream_start();

    let Call {
        twilio,
        mut openai,
        handle,
    } = call;
    drop(twilio.tx);

    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), CallOutcome::CallerDisconnected);
    openai.closed().await;
}

#[tokio::test]
async fn test_model_disconnect_ends_call_with_error() {
    let call = Call::start(test_options()).await;
    call.stream_start();

    let Call {
        mut twilio,
        openai,
        handle,
    } = call;
    drop(openai.tx);

    let outcome = timeout(STEP, handle).await.unwrap().unwrap();
    assert!(matches!(
        outcome,
        Err(BridgeError::TransportClosed { peer: Peer::Model })
    ));
    twilio.closed().await;
}

#[tokio::test]
async fn test_malformed_events_are_skipped() {
    let mut call = Call::start(test_options()).await;
    call.twilio.send_raw("not json");
    call.twilio
        .send(json!({"event": "media", "media": {"timestamp": "0", "payload": "***"}}));
    call.openai
        .send(json!({"type": "response.audio.delta", "item_id": "x", "delta": "***"}));
    call.openai.send_raw(r#"{"type":"response.audio.delta"}"#);
    call.openai
        .send(json!({"type": "response.content_part.added", "item_id": "x"}));

    call.stream_start();
    call.caller_audio([0]).await;
    assert!(!call.handle.is_finished());

    call.twilio.send(json!({"event": "stop"}));
    assert_eq!(call.outcome().await.unwrap(), CallOutcome::CallerHangup);
}

#[tokio::test]
async fn test_handshake_send_failure_is_configuration_failure() {
    let (telephony, mut twilio) = socket(Peer::Telephony);
    let (model, openai) = socket(Peer::Model);
    drop(openai.rx);

    let outcome = run_call_bridge(telephony, model, "hi").await;
    assert!(matches!(outcome, Err(BridgeError::Configuration(_))));
    twilio.closed().await;
}
