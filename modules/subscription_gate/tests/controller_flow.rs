//! End-to-end conversations through the controller with port doubles.

mod common;

use std::sync::Arc;

use common::{anna, message_in_private_chat, FailingLedger, Harness, Outbound};
use subscription_gate::contract::{
    CallbackAction, CallbackEvent, ConversationId, MemberStatus, Screen, StartEvent,
    TransportError, UnknownCallback, UserId,
};
use subscription_gate::domain::menu::NOT_SUBSCRIBED_ALERT;
use subscription_gate::domain::ports::UserLedger;
use tracing_test::traced_test;

fn press(action: CallbackAction, message_id: i32) -> CallbackEvent {
    let user = anna();
    CallbackEvent {
        query_id: format!("q-{message_id}"),
        message: Some(message_in_private_chat(&user, message_id)),
        user,
        action,
    }
}

fn start() -> StartEvent {
    let user = anna();
    StartEvent {
        chat: ConversationId::from(user.id),
        user,
    }
}

#[tokio::test]
async fn unsubscribed_start_shows_gate_and_records_nothing() {
    let h = Harness::new();

    h.service.handle_start(start()).await;

    assert_eq!(
        h.messenger.screens(),
        vec![Screen::WelcomeGate {
            name: "Анна".into()
        }]
    );
    assert_eq!(h.ledger.count().await.unwrap(), 0);
}

#[tokio::test]
async fn subscribed_start_records_user_and_greets() {
    let h = Harness::new();
    h.directory.set(1001, MemberStatus::Member);

    h.service.handle_start(start()).await;

    assert_eq!(
        h.messenger.outbound(),
        vec![Outbound::Sent {
            chat: ConversationId(1001),
            screen: Screen::MainMenu {
                greeting: Some("Анна".into())
            },
        }]
    );
    let entry = h.ledger.get(UserId(1001)).expect("user recorded");
    assert_eq!(entry.username.as_deref(), Some("anna_om"));
    assert_eq!(entry.display_name.as_deref(), Some("Анна"));
}

#[tokio::test]
async fn repeated_start_keeps_a_single_ledger_entry() {
    let h = Harness::new();
    h.directory.set(1001, MemberStatus::Administrator);

    h.service.handle_start(start()).await;
    let first = h.ledger.get(UserId(1001)).unwrap();
    h.service.handle_start(start()).await;

    assert_eq!(h.ledger.count().await.unwrap(), 1);
    assert_eq!(h.ledger.get(UserId(1001)).unwrap(), first);
    assert_eq!(h.messenger.screens().len(), 2);
}

#[tokio::test]
async fn check_while_unsubscribed_alerts_and_leaves_message_alone() {
    let h = Harness::new();

    h.service
        .handle_callback(press(CallbackAction::CheckSubscription, 10))
        .await;

    assert_eq!(
        h.messenger.outbound(),
        vec![Outbound::Answered {
            query_id: "q-10".into(),
            alert: Some(NOT_SUBSCRIBED_ALERT.into()),
        }]
    );
    assert_eq!(h.ledger.count().await.unwrap(), 0);
}

#[tokio::test]
async fn check_after_subscribing_confirms_in_place() {
    let h = Harness::new();

    h.service.handle_start(start()).await;
    h.directory.set(1001, MemberStatus::Member);
    h.service
        .handle_callback(press(CallbackAction::CheckSubscription, 11))
        .await;

    let out = h.messenger.outbound();
    assert_eq!(
        out[1],
        Outbound::Edited {
            message: message_in_private_chat(&anna(), 11),
            screen: Screen::SubscriptionConfirmed {
                name: "Анна".into()
            },
        }
    );
    assert_eq!(
        out[2],
        Outbound::Answered {
            query_id: "q-11".into(),
            alert: None
        }
    );
    assert_eq!(h.ledger.count().await.unwrap(), 1);
}

#[tokio::test]
async fn menu_navigation_round_trip() {
    let h = Harness::new();
    h.directory.set(1001, MemberStatus::Creator);

    h.service.handle_callback(press(CallbackAction::About, 20)).await;
    h.service
        .handle_callback(press(CallbackAction::BackToMenu, 20))
        .await;
    h.service
        .handle_callback(press(CallbackAction::MyResults, 20))
        .await;

    assert_eq!(
        h.messenger.screens(),
        vec![
            Screen::About,
            Screen::MainMenu { greeting: None },
            Screen::Results
        ]
    );
    // Every press is acknowledged without a popup.
    assert_eq!(
        h.messenger.answers(),
        vec![("q-20".to_string(), None); 3]
    );
}

#[tokio::test]
async fn back_to_menu_always_lands_on_plain_menu() {
    let h = Harness::new();

    for (id, action) in [(31, CallbackAction::About), (32, CallbackAction::MyResults)] {
        h.service.handle_callback(press(action, id)).await;
        h.service
            .handle_callback(press(CallbackAction::BackToMenu, id))
            .await;
    }

    let screens = h.messenger.screens();
    assert_eq!(screens.len(), 4);
    assert!(screens
        .iter()
        .skip(1)
        .step_by(2)
        .all(|s| *s == Screen::MainMenu { greeting: None }));
}

#[tokio::test]
async fn menu_buttons_do_not_recheck_membership() {
    let h = Harness::new();

    h.service.handle_callback(press(CallbackAction::About, 40)).await;
    h.service
        .handle_callback(press(CallbackAction::MyResults, 40))
        .await;

    assert_eq!(h.directory.calls(), 0);
    assert_eq!(h.ledger.count().await.unwrap(), 0);
}

#[tokio::test]
async fn restricted_and_banned_members_stay_gated() {
    for status in [MemberStatus::Restricted, MemberStatus::Kicked, MemberStatus::Left] {
        let h = Harness::new();
        h.directory.set(1001, status);

        h.service.handle_start(start()).await;

        assert!(
            matches!(h.messenger.screens()[0], Screen::WelcomeGate { .. }),
            "{status:?} must be gated"
        );
    }
}

#[tokio::test]
#[traced_test]
async fn membership_failure_fails_closed() {
    let h = Harness::new();
    h.directory
        .fail(1001, TransportError::api("Bad Request: member list is inaccessible"));

    h.service
        .handle_callback(press(CallbackAction::CheckSubscription, 50))
        .await;

    assert_eq!(
        h.messenger.answers(),
        vec![("q-50".to_string(), Some(NOT_SUBSCRIBED_ALERT.to_string()))]
    );
    assert!(logs_contain("treating as not subscribed"));
}

#[tokio::test]
#[traced_test]
async fn ledger_failure_does_not_block_the_menu() {
    let (h, service) = Harness::with_ledger(Arc::new(FailingLedger));
    h.directory.set(1001, MemberStatus::Member);

    service.handle_start(start()).await;

    assert_eq!(
        h.messenger.screens(),
        vec![Screen::MainMenu {
            greeting: Some("Анна".into())
        }]
    );
    assert!(logs_contain("failed to record user"));
}

#[tokio::test]
#[traced_test]
async fn unknown_callback_is_acknowledged_and_logged() {
    let h = Harness::new();

    h.service
        .handle_unknown_callback("q-60", &UnknownCallback("drop_table".into()))
        .await;

    assert_eq!(
        h.messenger.outbound(),
        vec![Outbound::Answered {
            query_id: "q-60".into(),
            alert: None
        }]
    );
    assert!(logs_contain("ignoring callback"));
}

#[tokio::test]
async fn missing_callback_message_sends_to_private_chat() {
    let h = Harness::new();
    let mut event = press(CallbackAction::About, 70);
    event.message = None;

    h.service.handle_callback(event).await;

    assert_eq!(
        h.messenger.outbound()[0],
        Outbound::Sent {
            chat: ConversationId(1001),
            screen: Screen::About,
        }
    );
}

#[tokio::test]
#[traced_test]
async fn transport_failures_are_swallowed() {
    let h = Harness::new();
    h.messenger.break_transport();

    h.service.handle_start(start()).await;
    h.service.handle_callback(press(CallbackAction::About, 80)).await;
    h.service.handle_help(ConversationId(1001)).await;

    assert_eq!(h.messenger.outbound().len(), 4);
    assert!(logs_contain("failed to send message"));
    assert!(logs_contain("failed to edit message"));
    assert!(logs_contain("failed to answer callback query"));
}

#[tokio::test]
async fn help_points_to_start() {
    let h = Harness::new();

    h.service.handle_help(ConversationId(1001)).await;

    assert_eq!(h.messenger.screens(), vec![Screen::Help]);
}
