//! Tests for the chat service.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::rstest;

use super::*;
use crate::domain::ports::{
    ChannelDeliveryError, MockChannelDelivery, MockPresenceRegistry, MockStudyGroupRepository,
    StudyGroupRepositoryError,
};
use crate::domain::{ErrorCode, GroupInfo, RecruitingPolicy, StudyGroup};

struct FixtureClock;

fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 2, 18, 30, 0)
        .single()
        .expect("valid fixture timestamp")
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        fixture_now().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        fixture_now()
    }
}

type TestService = ChatService<MockStudyGroupRepository, MockPresenceRegistry, MockChannelDelivery>;

struct Room {
    group: StudyGroup,
    member: UserId,
    applicant: UserId,
}

fn room() -> Room {
    let info = GroupInfo::create("Chat room", 5, fixture_now(), RecruitingPolicy::Approval)
        .expect("valid info");
    let mut group = StudyGroup::create(StudyGroupId::random(), UserId::random(), info, fixture_now());
    let member = UserId::random();
    let applicant = UserId::random();
    group.apply(member).expect("application");
    group
        .approve_participant(group.host_id(), member)
        .expect("approval");
    group.apply(applicant).expect("pending application");
    Room {
        group,
        member,
        applicant,
    }
}

fn name(value: &str) -> DisplayName {
    DisplayName::new(value).expect("valid display name")
}

fn entry(group_id: StudyGroupId, user_id: UserId, display: &str) -> PresenceEntry {
    PresenceEntry {
        group_id,
        user_id,
        display_name: name(display),
        connection_id: ConnectionId::random(),
    }
}

fn repo_returning(group: StudyGroup) -> MockStudyGroupRepository {
    let mut repo = MockStudyGroupRepository::new();
    repo.expect_load_with_participants()
        .returning(move |_| Ok(group.clone()));
    repo
}

fn service(
    repo: MockStudyGroupRepository,
    presence: MockPresenceRegistry,
    delivery: MockChannelDelivery,
) -> TestService {
    ChatService::new(
        Arc::new(repo),
        Arc::new(presence),
        Arc::new(delivery),
        Arc::new(FixtureClock),
    )
}

#[tokio::test]
async fn enter_registers_presence_and_announces_arrival() {
    let Room { group, member, .. } = room();
    let group_id = group.id();
    let connection_id = ConnectionId::random();
    let joined = PresenceEntry {
        group_id,
        user_id: member,
        display_name: name("ada"),
        connection_id,
    };
    let roster = vec![entry(group_id, group.host_id(), "host"), joined.clone()];

    let mut presence = MockPresenceRegistry::new();
    let expected_join = joined.clone();
    presence
        .expect_join()
        .withf(move |candidate| *candidate == expected_join)
        .times(1)
        .returning(|_| None);
    presence
        .expect_participants()
        .return_const(roster.clone());

    let mut delivery = MockChannelDelivery::new();
    delivery
        .expect_deliver()
        .withf(|_, event| {
            matches!(event, ChannelEvent::Chat(message) if message.kind == ChatMessageKind::Enter)
        })
        .times(2)
        .returning(|_, _| Ok(()));
    delivery
        .expect_deliver()
        .withf(|_, event| {
            matches!(event, ChannelEvent::Roster(roster) if roster.participants.len() == 2)
        })
        .times(2)
        .returning(|_, _| Ok(()));

    let present = service(repo_returning(group), presence, delivery)
        .enter(EnterChannelRequest {
            group_id,
            user_id: member,
            display_name: name("ada"),
            connection_id,
        })
        .await
        .expect("member enters");

    assert_eq!(present, roster);
}

#[tokio::test]
async fn enter_refuses_pending_applicant_without_touching_presence() {
    let Room {
        group, applicant, ..
    } = room();
    let group_id = group.id();
    let mut presence = MockPresenceRegistry::new();
    presence.expect_join().times(0);
    let mut delivery = MockChannelDelivery::new();
    delivery.expect_deliver().times(0);

    let err = service(repo_returning(group), presence, delivery)
        .enter(EnterChannelRequest {
            group_id,
            user_id: applicant,
            display_name: name("eve"),
            connection_id: ConnectionId::random(),
        })
        .await
        .expect_err("pending applicant refused");

    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert_eq!(err.message(), "channel access denied");
}

#[rstest]
#[case::blank("   ".to_owned(), "blank_message")]
#[case::too_long("x".repeat(CHAT_CONTENT_MAX_CHARS + 1), "message_too_long")]
#[tokio::test]
async fn send_message_rejects_invalid_content(#[case] content: String, #[case] reason: &str) {
    let Room { group, member, .. } = room();
    let group_id = group.id();
    let mut delivery = MockChannelDelivery::new();
    delivery.expect_deliver().times(0);

    let err = service(repo_returning(group), MockPresenceRegistry::new(), delivery)
        .send_message(SendChatMessageRequest {
            group_id,
            sender_id: member,
            sender_name: name("ada"),
            content,
        })
        .await
        .expect_err("content refused");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        err.details().and_then(|details| details["reason"].as_str()),
        Some(reason)
    );
}

#[tokio::test]
async fn send_message_reaches_room_and_skips_dead_connections() {
    let Room { group, member, .. } = room();
    let group_id = group.id();
    let alive = entry(group_id, group.host_id(), "host");
    let dead = entry(group_id, member, "ada");
    let dead_connection = dead.connection_id;

    let mut presence = MockPresenceRegistry::new();
    presence
        .expect_participants()
        .return_const(vec![alive, dead]);
    let mut delivery = MockChannelDelivery::new();
    delivery
        .expect_deliver()
        .times(2)
        .returning(move |connection_id, _| {
            if connection_id == dead_connection {
                Err(ChannelDeliveryError::connection_closed(connection_id))
            } else {
                Ok(())
            }
        });

    let message = service(repo_returning(group), presence, delivery)
        .send_message(SendChatMessageRequest {
            group_id,
            sender_id: member,
            sender_name: name("ada"),
            content: "hello".to_owned(),
        })
        .await
        .expect("message sent");

    assert_eq!(message.kind, ChatMessageKind::Chat);
    assert_eq!(message.content, "hello");
    assert_eq!(message.sent_at, fixture_now());
}

#[tokio::test]
async fn leave_without_presence_is_silent() {
    let mut presence = MockPresenceRegistry::new();
    presence.expect_leave().returning(|_| None);
    let mut delivery = MockChannelDelivery::new();
    delivery.expect_deliver().times(0);

    let left = service(MockStudyGroupRepository::new(), presence, delivery)
        .leave(ConnectionId::random())
        .await
        .expect("leave succeeds");

    assert!(left.is_none());
}

#[tokio::test]
async fn send_message_skips_and_evicts_revoked_members() {
    let Room { group, member, .. } = room();
    let group_id = group.id();
    let host = entry(group_id, group.host_id(), "host");
    let kicked = entry(group_id, UserId::random(), "gone");
    let (host_connection, kicked_connection) = (host.connection_id, kicked.connection_id);

    let mut presence = MockPresenceRegistry::new();
    presence
        .expect_participants()
        .return_const(vec![host, kicked.clone()]);
    presence
        .expect_leave()
        .withf(move |connection_id| *connection_id == kicked_connection)
        .times(1)
        .return_const(Some(kicked));

    let mut delivery = MockChannelDelivery::new();
    delivery
        .expect_deliver()
        .withf(move |connection_id, event| {
            *connection_id == kicked_connection && matches!(event, ChannelEvent::AccessRevoked)
        })
        .times(1)
        .returning(|_, _| Ok(()));
    delivery
        .expect_deliver()
        .withf(move |connection_id, event| {
            *connection_id == host_connection && matches!(event, ChannelEvent::Chat(_))
        })
        .times(1)
        .returning(|_, _| Ok(()));
    delivery
        .expect_deliver()
        .withf(move |connection_id, event| {
            *connection_id == host_connection
                && matches!(event, ChannelEvent::Roster(roster) if roster.participants.len() == 1)
        })
        .times(1)
        .returning(|_, _| Ok(()));

    service(repo_returning(group), presence, delivery)
        .send_message(SendChatMessageRequest {
            group_id,
            sender_id: member,
            sender_name: name("ada"),
            content: "secret plan".to_owned(),
        })
        .await
        .expect("message sent");
}

#[tokio::test]
async fn participants_lists_members_only() {
    let Room {
        group,
        member,
        applicant,
    } = room();
    let group_id = group.id();
    let host = entry(group_id, group.host_id(), "host");
    let present = entry(group_id, member, "ada");
    let pending = entry(group_id, applicant, "eve");

    let mut presence = MockPresenceRegistry::new();
    presence
        .expect_participants()
        .return_const(vec![host.clone(), present.clone(), pending.clone()]);
    presence
        .expect_leave()
        .times(1)
        .return_const(Some(pending));
    let mut delivery = MockChannelDelivery::new();
    delivery
        .expect_deliver()
        .withf(|_, event| matches!(event, ChannelEvent::AccessRevoked))
        .times(1)
        .returning(|_, _| Ok(()));
    delivery
        .expect_deliver()
        .withf(|_, event| matches!(event, ChannelEvent::Roster(_)))
        .times(2)
        .returning(|_, _| Ok(()));

    let listed = service(repo_returning(group), presence, delivery)
        .participants(group_id, member)
        .await
        .expect("member may list the room");

    assert_eq!(listed, vec![host, present]);
}

#[tokio::test]
async fn participants_refuses_non_members() {
    let Room {
        group, applicant, ..
    } = room();
    let group_id = group.id();
    let mut presence = MockPresenceRegistry::new();
    presence.expect_participants().times(0);

    let err = service(repo_returning(group), presence, MockChannelDelivery::new())
        .participants(group_id, applicant)
        .await
        .expect_err("pending applicant refused");

    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn leave_announces_departure_to_remaining_members() {
    let Room { group, member, .. } = room();
    let group_id = group.id();
    let leaving = entry(group_id, member, "ada");
    let remaining = entry(group_id, group.host_id(), "host");

    let mut presence = MockPresenceRegistry::new();
    presence
        .expect_leave()
        .return_const(Some(leaving.clone()));
    presence
        .expect_participants()
        .return_const(vec![remaining]);
    let mut delivery = MockChannelDelivery::new();
    delivery
        .expect_deliver()
        .withf(|_, event| {
            matches!(event, ChannelEvent::Chat(message) if message.kind == ChatMessageKind::Leave)
        })
        .times(1)
        .returning(|_, _| Ok(()));
    delivery
        .expect_deliver()
        .withf(|_, event| {
            matches!(event, ChannelEvent::Roster(roster) if roster.participants.len() == 1)
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let left = service(repo_returning(group), presence, delivery)
        .leave(leaving.connection_id)
        .await
        .expect("leave succeeds");

    assert_eq!(left, Some(leaving));
}

#[tokio::test]
async fn leave_from_deleted_group_is_not_announced() {
    let leaving = entry(StudyGroupId::random(), UserId::random(), "ada");
    let mut repo = MockStudyGroupRepository::new();
    repo.expect_load_with_participants()
        .return_once(|id| Err(StudyGroupRepositoryError::not_found(id)));
    let mut presence = MockPresenceRegistry::new();
    presence
        .expect_leave()
        .return_const(Some(leaving.clone()));
    presence.expect_participants().times(0);
    let mut delivery = MockChannelDelivery::new();
    delivery.expect_deliver().times(0);

    let left = service(repo, presence, delivery)
        .leave(leaving.connection_id)
        .await
        .expect("leave succeeds");

    assert_eq!(left, Some(leaving));
}
