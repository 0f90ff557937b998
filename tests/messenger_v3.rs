//! SNMPv3 tests against the scripted USM agent.

mod common;

use common::{
    AUTH_PHRASE, ENGINE_ID, PRIV_PHRASE, USER, V3Agent, auth_priv_user, decode_request, sys_descr,
    system_subtree, v3_messenger,
};
use snmp_messenger::message::{Message, SecurityLevel, V3Message, V3MessageData};
use snmp_messenger::security::UsmSecurityParams;
use snmp_messenger::security::engine::report_oids;
use snmp_messenger::{Error, UserSecurity, Value};

fn v3_message(message: Message) -> V3Message {
    match message {
        Message::V3(msg) => msg,
        Message::Community(_) => panic!("expected a v3 message"),
    }
}

#[tokio::test]
async fn auth_priv_get_end_to_end() {
    let agent = V3Agent::auth_priv();
    let transport = agent.transport();
    let messenger = v3_messenger(transport.clone(), auth_priv_user(AUTH_PHRASE, PRIV_PHRASE));

    let variables = messenger.get(&[sys_descr()]).await.unwrap();
    assert_eq!(variables[0].data, Value::from("Test SNMP Agent"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);

    let probe = v3_message(decode_request(&requests[0].data));
    assert_eq!(probe.security_level(), SecurityLevel::NoAuthNoPriv);

    let request = v3_message(decode_request(&requests[1].data));
    assert_eq!(request.security_level(), SecurityLevel::AuthPriv);
    assert!(matches!(request.data, V3MessageData::Encrypted(_)));
    let params = UsmSecurityParams::decode(request.security_params.clone()).unwrap();
    assert_eq!(&params.engine_id[..], ENGINE_ID);
    assert_eq!(&params.username[..], USER.as_bytes());
    assert_eq!(params.auth_params.len(), 12);
    assert_eq!(params.priv_params.len(), 8);
    // Encrypted requests hide the request ID from observers.
    assert_eq!(requests[1].request_id, None);
}

#[tokio::test]
async fn auth_no_priv_walk() {
    let md5_user = || UserSecurity::from_names(USER, Some(("MD5", AUTH_PHRASE)), None).unwrap();
    let agent = V3Agent::new(md5_user());
    let messenger = v3_messenger(agent.transport(), md5_user());

    let variables = messenger.bulk_walk(&system_subtree()).await.unwrap();
    assert_eq!(variables.len(), 7);
}

#[tokio::test]
async fn discovery_happens_once() {
    let agent = V3Agent::auth_priv();
    let transport = agent.transport();
    let messenger = v3_messenger(transport.clone(), auth_priv_user(AUTH_PHRASE, PRIV_PHRASE));

    messenger.get(&[sys_descr()]).await.unwrap();
    messenger.get(&[sys_descr()]).await.unwrap();
    assert_eq!(transport.requests().len(), 3);

    let state = messenger.engine_state().unwrap();
    assert_eq!(&state.engine_id[..], ENGINE_ID);
    assert_eq!(state.engine_boots, 5);
}

#[tokio::test]
async fn not_in_time_window_is_resent_exactly_once() {
    let agent = V3Agent::auth_priv();
    let transport = agent.transport();
    let messenger = v3_messenger(transport.clone(), auth_priv_user(AUTH_PHRASE, PRIV_PHRASE));
    messenger.discover().await.unwrap();

    agent.set_clock(6, 10);
    agent.queue_report(report_oids::not_in_time_windows());

    let variables = messenger.get(&[sys_descr()]).await.unwrap();
    assert_eq!(variables.len(), 1);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    let resent = v3_message(decode_request(&requests[2].data));
    let params = UsmSecurityParams::decode(resent.security_params).unwrap();
    assert_eq!(params.engine_boots, 6);
    assert_eq!(messenger.engine_state().unwrap().engine_boots, 6);
}

#[tokio::test]
async fn discovery_answered_with_not_in_time_window() {
    let agent = V3Agent::auth_priv();
    agent.set_clock(9, 120);
    agent.set_discovery_report(report_oids::not_in_time_windows());
    let transport = agent.transport();
    let messenger = v3_messenger(transport.clone(), auth_priv_user(AUTH_PHRASE, PRIV_PHRASE));

    let variables = messenger.get(&[sys_descr()]).await.unwrap();
    assert_eq!(variables[0].data, Value::from("Test SNMP Agent"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let probe = v3_message(decode_request(&requests[0].data));
    assert_eq!(probe.security_level(), SecurityLevel::NoAuthNoPriv);
    let request = v3_message(decode_request(&requests[1].data));
    assert_eq!(request.security_level(), SecurityLevel::AuthPriv);
    let params = UsmSecurityParams::decode(request.security_params).unwrap();
    assert_eq!(params.engine_boots, 9);
    assert_eq!(messenger.engine_state().unwrap().engine_boots, 9);
}

#[tokio::test]
async fn second_not_in_time_window_fails() {
    let agent = V3Agent::auth_priv();
    let transport = agent.transport();
    let messenger = v3_messenger(transport.clone(), auth_priv_user(AUTH_PHRASE, PRIV_PHRASE));
    messenger.discover().await.unwrap();

    agent.queue_report(report_oids::not_in_time_windows());
    agent.queue_report(report_oids::not_in_time_windows());

    let err = messenger.get(&[sys_descr()]).await.unwrap_err();
    assert!(matches!(
        *err,
        Error::Report {
            message: "notInTimeWindows",
            ..
        }
    ));
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn other_reports_are_not_followed_up() {
    let agent = V3Agent::auth_priv();
    let transport = agent.transport();
    let messenger = v3_messenger(transport.clone(), auth_priv_user(AUTH_PHRASE, PRIV_PHRASE));
    messenger.discover().await.unwrap();

    agent.queue_report(report_oids::unknown_user_names());

    let err = messenger.get(&[sys_descr()]).await.unwrap_err();
    match *err {
        Error::Report { oid, message, .. } => {
            assert_eq!(oid, Some(report_oids::unknown_user_names()));
            assert_eq!(message, "unknownUserNames");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn wrong_auth_phrase_is_reported() {
    let agent = V3Agent::auth_priv();
    let messenger = v3_messenger(agent.transport(), auth_priv_user("wrongpass123", PRIV_PHRASE));

    let err = messenger.get(&[sys_descr()]).await.unwrap_err();
    assert!(matches!(
        *err,
        Error::Report {
            message: "wrongDigests",
            ..
        }
    ));
}

#[tokio::test]
async fn wrong_priv_phrase_is_reported() {
    let agent = V3Agent::auth_priv();
    let messenger = v3_messenger(agent.transport(), auth_priv_user(AUTH_PHRASE, "wrongpass456"));

    let err = messenger.get(&[sys_descr()]).await.unwrap_err();
    assert!(matches!(
        *err,
        Error::Report {
            message: "decryptionErrors",
            ..
        }
    ));
}

#[tokio::test]
async fn tampered_response_fails_authentication() {
    let agent = V3Agent::auth_priv();
    let transport = agent.transport();
    let messenger = v3_messenger(transport.clone(), auth_priv_user(AUTH_PHRASE, PRIV_PHRASE));
    agent.corrupt_digests();

    let err = messenger.get(&[sys_descr()]).await.unwrap_err();
    assert!(matches!(*err, Error::Auth { target } if target == common::target()));
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn level_mismatch_is_reported() {
    let agent = V3Agent::auth_priv();
    let messenger = v3_messenger(agent.transport(), UserSecurity::no_auth(USER));

    let err = messenger.get(&[sys_descr()]).await.unwrap_err();
    assert!(matches!(
        *err,
        Error::Report {
            message: "unsupportedSecLevels",
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_algorithm_fails_before_sending() {
    let err = UserSecurity::from_names(USER, Some(("SHA512", AUTH_PHRASE)), None).unwrap_err();
    assert!(matches!(*err, Error::InvalidArgument { .. }));
}
