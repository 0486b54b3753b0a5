mod common;

use std::sync::{Arc, Mutex};

use common::*;
use hw_wallet_client::messages::{
    self, ButtonRequestType, FailureType, InputScriptType, Message, PinMatrixRequestType,
};
use hw_wallet_client::{CancelHandle, ClientError, DeviceProfile, KEEPKEY, TREZOR_ONE};

fn expect_prompt(ui: &mut MockUi, expected: &'static str, cancellable: bool) {
    ui.expect_show_message()
        .withf(move |message: &str, cancel: &Option<CancelHandle>| {
            message == expected && cancel.is_some() == cancellable
        })
        .times(1)
        .return_const(());
}

#[test]
fn button_request_shows_prompt_and_acks() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm address on KeepKey device to continue", false);

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            button_request(ButtonRequestType::Address),
            messages::Address {
                address: "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2".to_owned(),
            }
            .into(),
        ],
        ui,
    );

    let path = [0x8000_002c, 0x8000_0000, 0x8000_0000, 0, 0];
    let address = client
        .get_address(&path, "Bitcoin", true, InputScriptType::SpendAddress)
        .unwrap();
    assert_eq!(address, "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2");

    let sent = device.sent();
    assert_eq!(sent.len(), 2);
    match &sent[0] {
        Message::GetAddress(req) => {
            assert_eq!(req.address_n.len(), 5);
            assert_eq!(req.coin_name.as_deref(), Some("Bitcoin"));
            assert_eq!(req.show_display, Some(true));
        }
        other => panic!("expected GetAddress, got {:?}", other),
    }
    assert_eq!(sent[1], messages::ButtonAck {}.into());
    assert!(!client.is_bad());
}

#[test]
fn change_label_uses_label_prompt_then_clears_override() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm label change on KeepKey device to continue", false);
    expect_prompt(&mut ui, "Confirm message to sign on KeepKey device to continue", false);

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            button_request(ButtonRequestType::Other),
            success("Settings applied"),
            features(7, 10, 0),
            button_request(ButtonRequestType::ProtectCall),
            success("hello"),
        ],
        ui,
    );

    client.change_label("Cold storage").unwrap();
    assert_eq!(client.ping("hello", true).unwrap(), "hello");

    let sent = device.sent();
    match &sent[0] {
        Message::ApplySettings(settings) => {
            assert_eq!(settings.label.as_deref(), Some("Cold storage"))
        }
        other => panic!("expected ApplySettings, got {:?}", other),
    }
    assert_eq!(sent[2], messages::Initialize {}.into());
    assert_eq!(device.pending_replies(), 0);
}

#[test]
fn override_is_cleared_when_operation_fails() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm PIN change on KeepKey device to continue", false);
    expect_prompt(&mut ui, "Check KeepKey device to continue", false);

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            button_request(ButtonRequestType::Other),
            failure(FailureType::Other, "boom"),
        ],
        ui,
    );

    let err = client.set_pin(false).unwrap_err();
    assert!(
        matches!(&err, ClientError::Failure { code: Some(9), message } if message == "boom"),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(err.failure_type(), Some(FailureType::Other));
    // A device-reported failure is not a broken connection.
    assert!(!client.is_bad());

    device.push_replies([button_request(ButtonRequestType::Other), success("")]);
    client.ping("", true).unwrap();
}

#[test]
fn pin_mismatch_keeps_its_failure_code() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm PIN change on TREZOR device to continue", false);
    let mut pins = vec!["8642", "2468"];
    ui.expect_get_pin()
        .times(2)
        .returning(move |_| pins.pop().map(str::to_owned));

    let (mut client, _device) = client_with(
        TREZOR_ONE,
        [
            button_request(ButtonRequestType::ProtectCall),
            pin_request(PinMatrixRequestType::NewFirst),
            pin_request(PinMatrixRequestType::NewSecond),
            messages::Failure {
                code: Some(12),
                message: Some("PIN mismatch".to_owned()),
            }
            .into(),
        ],
        ui,
    );

    let err = client.set_pin(false).unwrap_err();
    match &err {
        ClientError::Failure { code, message } => {
            assert_eq!(*code, Some(12));
            assert_eq!(message, "PIN mismatch");
        }
        other => panic!("expected Failure, got {:?}", other),
    }
    assert_eq!(err.failure_type(), Some(FailureType::PinMismatch));
    assert!(!client.is_bad());
}

#[test]
fn unnamed_failure_codes_are_passed_through() {
    let (mut client, _device) = client_with(
        KEEPKEY,
        [
            messages::Failure {
                code: Some(77),
                message: Some("newer firmware".to_owned()),
            }
            .into(),
            messages::Failure {
                code: None,
                message: None,
            }
            .into(),
        ],
        MockUi::new(),
    );

    let err = client.ping("", false).unwrap_err();
    assert!(matches!(err, ClientError::Failure { code: Some(77), .. }));
    assert_eq!(err.failure_type(), None);

    let err = client.ping("", false).unwrap_err();
    assert!(matches!(err, ClientError::Failure { code: None, ref message } if message.is_empty()));
}

#[test]
fn remove_pin_prompts_for_current_pin() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm removal of PIN on KeepKey device to continue", false);
    ui.expect_get_pin()
        .withf(|prompt: &str| prompt == "Enter your current KeepKey PIN:")
        .times(1)
        .returning(|_| Some("1397".to_owned()));

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            button_request(ButtonRequestType::Other),
            pin_request(PinMatrixRequestType::Current),
            success("PIN removed"),
            features(7, 10, 0),
        ],
        ui,
    );

    client.set_pin(true).unwrap();

    let sent = device.sent();
    assert_eq!(
        sent,
        vec![
            messages::ChangePin { remove: Some(true) }.into(),
            messages::ButtonAck {}.into(),
            messages::PinMatrixAck {
                pin: "1397".to_owned()
            }
            .into(),
            messages::Initialize {}.into(),
        ]
    );
}

#[test]
fn new_pin_is_entered_twice() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm PIN change on TREZOR device to continue", false);
    ui.expect_get_pin()
        .withf(|prompt: &str| prompt == "Enter a new TREZOR PIN:")
        .times(1)
        .returning(|_| Some("2468".to_owned()));
    ui.expect_get_pin()
        .withf(|prompt: &str| prompt.starts_with("Please re-enter your new TREZOR PIN."))
        .times(1)
        .returning(|_| Some("8642".to_owned()));

    let (mut client, device) = client_with(
        TREZOR_ONE,
        [
            button_request(ButtonRequestType::ProtectCall),
            pin_request(PinMatrixRequestType::NewFirst),
            pin_request(PinMatrixRequestType::NewSecond),
            success("PIN changed"),
            features(1, 9, 0),
        ],
        ui,
    );

    client.set_pin(false).unwrap();
    let pins: Vec<String> = device
        .sent()
        .into_iter()
        .filter_map(|m| match m {
            Message::PinMatrixAck(ack) => Some(ack.pin),
            _ => None,
        })
        .collect();
    assert_eq!(pins, vec!["2468", "8642"]);
}

#[test]
fn empty_pin_cancels() {
    let mut ui = MockUi::new();
    ui.expect_get_pin()
        .withf(|prompt: &str| prompt == "Please enter KeepKey PIN")
        .times(1)
        .returning(|_| Some(String::new()));

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            messages::PinMatrixRequest { r#type: None }.into(),
            failure(FailureType::PinCancelled, "PIN cancelled"),
        ],
        ui,
    );

    let err = client
        .get_address(&[0], "Bitcoin", false, InputScriptType::SpendAddress)
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(device.sent()[1], messages::Cancel {}.into());
    assert!(!client.is_bad());
}

#[test]
fn dismissed_passphrase_cancels() {
    let mut ui = MockUi::new();
    ui.expect_get_passphrase()
        .withf(|prompt: &str| prompt == "Please enter your KeepKey passphrase")
        .times(1)
        .returning(|_| None);

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            messages::PassphraseRequest {}.into(),
            failure(FailureType::ActionCancelled, "Cancelled"),
        ],
        ui,
    );

    let err = client
        .get_address(&[0], "Bitcoin", false, InputScriptType::SpendAddress)
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(device.sent()[1], messages::Cancel {}.into());
}

#[test]
fn empty_passphrase_is_acknowledged() {
    let mut ui = MockUi::new();
    ui.expect_get_passphrase()
        .times(1)
        .returning(|_| Some(String::new()));

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            messages::PassphraseRequest {}.into(),
            messages::Address {
                address: "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh".to_owned(),
            }
            .into(),
        ],
        ui,
    );

    client
        .get_address(&[0], "Bitcoin", false, InputScriptType::SpendWitness)
        .unwrap();
    assert_eq!(
        device.sent()[1],
        messages::PassphraseAck {
            passphrase: String::new()
        }
        .into()
    );
}

#[test]
fn recovery_forwards_each_word() {
    let mut ui = MockUi::new();
    let mut words = vec!["zoo", "abandon"];
    ui.expect_get_word()
        .withf(|prompt: &str| prompt == "Enter one word of mnemonic:")
        .times(2)
        .returning(move |_| words.pop().map(str::to_owned));

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            messages::WordRequest {}.into(),
            messages::WordRequest {}.into(),
            success("Device recovered"),
            features(7, 10, 0),
        ],
        ui,
    );

    client
        .recovery_device(messages::RecoveryDevice {
            word_count: Some(12),
            ..Default::default()
        })
        .unwrap();

    let sent = device.sent();
    assert!(matches!(sent[0], Message::RecoveryDevice(ref r) if r.word_count == Some(12)));
    assert_eq!(sent[1], messages::WordAck { word: "abandon".to_owned() }.into());
    assert_eq!(sent[2], messages::WordAck { word: "zoo".to_owned() }.into());
    assert_eq!(sent[3], messages::Initialize {}.into());
    assert_eq!(client.features().and_then(|f| f.label.as_deref()), Some("My Wallet"));
}

#[test]
fn missing_word_cancels_recovery() {
    let mut ui = MockUi::new();
    ui.expect_get_word().times(1).returning(|_| None);

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            messages::WordRequest {}.into(),
            failure(FailureType::ActionCancelled, "Cancelled"),
        ],
        ui,
    );

    let err = client
        .recovery_device(messages::RecoveryDevice::default())
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(device.sent()[1], messages::Cancel {}.into());
}

#[test]
fn transaction_confirmation_can_be_cancelled_from_host() {
    let mut ui = MockUi::new();
    ui.expect_show_message()
        .withf(|message: &str, cancel: &Option<CancelHandle>| {
            message == "Confirm transaction outputs on KeepKey device to continue"
                && cancel.is_some()
        })
        .times(1)
        .returning(|_, cancel| {
            if let Some(cancel) = cancel {
                cancel.cancel();
            }
        });

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            button_request(ButtonRequestType::ConfirmOutput),
            failure(FailureType::ActionCancelled, "Cancelled"),
        ],
        ui,
    );

    let err = client.call(messages::Ping::default().into()).unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(device.sent()[1], messages::Cancel {}.into());
}

#[test]
fn stale_cancel_does_not_abort_next_exchange() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm transaction fee on KeepKey device to continue", true);

    let (mut client, device) = client_with(
        KEEPKEY,
        [button_request(ButtonRequestType::SignTx), success("")],
        ui,
    );

    client.cancel_handle().cancel();
    client.call(messages::Ping::default().into()).unwrap();
    assert_eq!(device.sent()[1], messages::ButtonAck {}.into());
}

#[test]
fn cancel_after_prompt_returns_is_not_applied() {
    let kept: Arc<Mutex<Option<CancelHandle>>> = Arc::default();
    let slot = kept.clone();
    let mut ui = MockUi::new();
    ui.expect_show_message()
        .times(2)
        .returning(move |_, cancel| *slot.lock().unwrap() = cancel);

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            button_request(ButtonRequestType::ConfirmOutput),
            success(""),
            button_request(ButtonRequestType::ConfirmOutput),
            success(""),
        ],
        ui,
    );

    client.call(messages::Ping::default().into()).unwrap();
    // The ack has already been sent; a late cancel only reaches the next call.
    kept.lock().unwrap().take().unwrap().cancel();
    client.call(messages::Ping::default().into()).unwrap();

    let sent = device.sent();
    assert_eq!(sent[1], messages::ButtonAck {}.into());
    assert_eq!(sent[3], messages::ButtonAck {}.into());
}

#[test]
fn no_cancel_offered_without_protocol_support() {
    let profile = DeviceProfile {
        supports_cancel: false,
        ..KEEPKEY
    };
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm transaction outputs on KeepKey device to continue", false);

    let (mut client, _device) = client_with(
        profile,
        [button_request(ButtonRequestType::ConfirmOutput), success("")],
        ui,
    );

    client.call(messages::Ping::default().into()).unwrap();
}

#[test]
fn transport_failure_marks_client_bad() {
    let (mut client, device) = client_with(KEEPKEY, [], MockUi::new());

    let err = client.ping("", false).unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(client.is_bad());

    // A bad client does not try the device again.
    assert!(!client.has_usable_connection());
    assert_eq!(device.sent().len(), 1);
}

#[test]
fn lost_reply_after_ack_marks_client_bad() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Confirm address on KeepKey device to continue", false);

    let (mut client, device) =
        client_with(KEEPKEY, [button_request(ButtonRequestType::Address)], ui);

    let err = client
        .get_address(&[0], "Bitcoin", true, InputScriptType::SpendAddress)
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(client.is_bad());
    assert_eq!(device.sent()[1], messages::ButtonAck {}.into());
}

#[test]
fn unknown_reply_type_after_ack_marks_client_bad() {
    let mut ui = MockUi::new();
    ui.expect_get_pin().times(1).returning(|_| Some("1234".to_owned()));

    let (mut client, device) = client_with(
        KEEPKEY,
        [pin_request(PinMatrixRequestType::Current)],
        ui,
    );
    device.push_raw(&[b'#', b'#', 0x7f, 0xff, 0, 0, 0, 0]);

    let err = client.ping("", false).unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(client.is_bad());
    assert!(matches!(device.sent()[1], Message::PinMatrixAck(_)));
}

#[test]
fn bad_magic_reply_marks_client_bad() {
    let (mut client, device) = client_with(KEEPKEY, [], MockUi::new());
    device.push_raw(&[b'?', b'?', 0, 2, 0, 0, 0, 0]);

    let err = client.call_raw(messages::Ping::default().into()).unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(client.is_bad());
}

#[test]
fn usable_connection_pings_device() {
    let (mut client, device) = client_with(KEEPKEY, [success("")], MockUi::new());
    assert!(client.has_usable_connection());
    assert!(matches!(device.sent()[0], Message::Ping(_)));
}

#[test]
fn firmware_version_comes_from_features() {
    let (mut client, _device) = client_with(TREZOR_ONE, [features(1, 4, 0)], MockUi::new());

    assert!(matches!(client.firmware_version(), Err(ClientError::FeaturesUnavailable)));

    client.init_device().unwrap();
    assert_eq!(client.firmware_version().unwrap(), (1, 4, 0));
    assert!(client.atleast_version(1, 3, 9).unwrap());
    assert!(client.atleast_version(1, 4, 0).unwrap());
    assert!(!client.atleast_version(1, 4, 1).unwrap());
    assert!(!client.atleast_version(2, 0, 0).unwrap());
    // TREZOR One needs 1.5.2 or newer.
    assert!(!client.firmware_supported().unwrap());
}

#[test]
fn unexpected_reply_is_reported() {
    let (mut client, _device) = client_with(KEEPKEY, [success("")], MockUi::new());
    let err = client.init_device().unwrap_err();
    assert!(matches!(
        err,
        ClientError::UnexpectedMessage(messages::MessageType::Success)
    ));
}

#[test]
fn reset_device_supplies_host_entropy() {
    let mut ui = MockUi::new();
    expect_prompt(&mut ui, "Check KeepKey device to continue", false);

    let (mut client, device) = client_with(
        KEEPKEY,
        [
            button_request(ButtonRequestType::ResetDevice),
            messages::EntropyRequest {}.into(),
            success("Device reset"),
            features(7, 10, 0),
        ],
        ui,
    );

    client
        .reset_device(messages::ResetDevice {
            strength: Some(256),
            ..Default::default()
        })
        .unwrap();

    match &device.sent()[2] {
        Message::EntropyAck(ack) => assert_eq!(ack.entropy.as_ref().map(Vec::len), Some(32)),
        other => panic!("expected EntropyAck, got {:?}", other),
    }
}

#[test]
fn call_raw_leaves_requests_unanswered() {
    let (mut client, device) = client_with(
        KEEPKEY,
        [button_request(ButtonRequestType::Address)],
        MockUi::new(),
    );

    let reply = client.call_raw(messages::GetAddress::default().into()).unwrap();
    assert!(matches!(reply, Message::ButtonRequest(_)));
    assert_eq!(device.sent().len(), 1);
}
