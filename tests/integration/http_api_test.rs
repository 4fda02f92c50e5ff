//! REST client integration tests
//!
//! Runs `HttpPortalApi` against a wiremock backend.

use maternity_messaging::client::api::{ApiError, HttpPortalApi, PortalApi};
use maternity_messaging::client::Config;
use maternity_messaging::shared::messaging::{
    ConversationKey, MessageId, PregnancyId, Role, SendMessageRequest, UserId,
};
use maternity_messaging::shared::AppConfig;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn api_for(server: &MockServer) -> HttpPortalApi {
    let mut config =
        crate::assert_ok!(Config::with_builder(AppConfig::builder().server_url(server.uri())));
    config.set_token(Some(TOKEN.to_string()));
    crate::assert_ok!(HttpPortalApi::new(config))
}

fn message_json(id: u64, key: ConversationKey, from: UserId, to: UserId) -> serde_json::Value {
    json!({
        "id": id,
        "pregnancyId": key.pregnancy_id,
        "fromUserId": from,
        "toUserId": to,
        "message": format!("message {}", id),
        "timestamp": "2024-03-01T09:00:00Z",
        "read": false
    })
}

#[tokio::test]
async fn test_list_contacts_queries_complementary_role() {
    let server = MockServer::start().await;
    let patient = UserId::new_v4();
    let pregnancy = PregnancyId::new_v4();

    Mock::given(method("GET"))
        .and(path("/contacts"))
        .and(query_param("role", "patient"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "userId": patient,
                "role": "patient",
                "displayName": "Amina Hassan",
                "pregnancyId": pregnancy
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let contacts = crate::assert_ok!(api_for(&server).list_contacts(Role::Patient).await);
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].user_id, patient);
    assert_eq!(contacts[0].pregnancy_id, Some(pregnancy));
    assert_eq!(contacts[0].label(), "Amina Hassan");
}

#[tokio::test]
async fn test_fetch_messages_accepts_wrapped_list() {
    let server = MockServer::start().await;
    let (me, clinician) = (UserId::new_v4(), UserId::new_v4());
    let key = ConversationKey::new(PregnancyId::new_v4(), clinician);

    Mock::given(method("GET"))
        .and(path("/messages"))
        .and(query_param("pregnancyId", key.pregnancy_id.to_string()))
        .and(query_param("otherUserId", clinician.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                message_json(1, key, clinician, me),
                message_json(2, key, me, clinician)
            ]
        })))
        .mount(&server)
        .await;

    let messages = crate::assert_ok!(api_for(&server).fetch_messages(key).await);
    assert_eq!(
        messages.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![MessageId(1), MessageId(2)]
    );
    assert_eq!(messages[0].body, "message 1");
    assert!(messages[0].is_inbound_for(me));
}

#[tokio::test]
async fn test_send_message_posts_request_body() {
    let server = MockServer::start().await;
    let (me, clinician) = (UserId::new_v4(), UserId::new_v4());
    let key = ConversationKey::new(PregnancyId::new_v4(), clinician);
    let request = crate::assert_ok!(SendMessageRequest::new(
        key.pregnancy_id,
        clinician,
        " Any news on my bloods? "
    ));

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_json(json!({
            "pregnancyId": key.pregnancy_id,
            "toUserId": clinician,
            "message": "Any news on my bloods?"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(message_json(42, key, me, clinician)))
        .expect(1)
        .mount(&server)
        .await;

    let created = crate::assert_ok!(api_for(&server).send_message(&request).await);
    assert_eq!(created.id, MessageId(42));
    assert_eq!(created.from_user_id, me);
}

#[tokio::test]
async fn test_mark_read_hits_message_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/17/read"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    crate::assert_ok!(api_for(&server).mark_read(MessageId(17)).await);
}

#[tokio::test]
async fn test_unauthorized_maps_to_not_authenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    crate::assert_err!(
        api_for(&server).list_contacts(Role::Clinician).await,
        ApiError::NotAuthenticated
    );
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&server)
        .await;

    let key = ConversationKey::new(PregnancyId::new_v4(), UserId::new_v4());
    let error = api_for(&server).fetch_messages(key).await.unwrap_err();
    assert_eq!(
        error,
        ApiError::Status {
            status: 500,
            body: "database down".into()
        }
    );
    assert!(error.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    crate::assert_err!(
        api_for(&server).list_contacts(Role::Patient).await,
        ApiError::Decode(_)
    );
}

#[tokio::test]
async fn test_entries_with_foreign_ids_are_skipped() {
    let server = MockServer::start().await;
    let clinician = UserId::new_v4();

    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "userId": "legacy-42", "role": "clinician", "displayName": "Dr Imported" },
                { "userId": clinician, "role": "clinician", "displayName": "Dr Okafor" }
            ]
        })))
        .mount(&server)
        .await;

    let contacts = crate::assert_ok!(api_for(&server).list_contacts(Role::Clinician).await);
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].user_id, clinician);
}

#[tokio::test]
async fn test_malformed_message_does_not_hide_the_thread() {
    let server = MockServer::start().await;
    let (me, clinician) = (UserId::new_v4(), UserId::new_v4());
    let key = ConversationKey::new(PregnancyId::new_v4(), clinician);
    let mut broken = message_json(2, key, clinician, me);
    broken["pregnancyId"] = json!("pregnancy-2");

    Mock::given(method("GET"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            message_json(1, key, clinician, me),
            broken,
            message_json(3, key, me, clinician)
        ])))
        .mount(&server)
        .await;

    let messages = crate::assert_ok!(api_for(&server).fetch_messages(key).await);
    assert_eq!(
        messages.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![MessageId(1), MessageId(3)]
    );
}
