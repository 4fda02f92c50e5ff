//! Users, contacts and messages for tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use maternity_messaging::shared::messaging::{
    Contact, ConversationKey, CurrentUser, Message, MessageId, PregnancyId, Role, UserId,
};

/// A patient with two clinicians, X and Y
pub struct PatientWorld {
    pub me: CurrentUser,
    pub pregnancy: PregnancyId,
    pub x: Contact,
    pub y: Contact,
}

impl PatientWorld {
    pub fn new() -> Self {
        let pregnancy = PregnancyId::new_v4();
        Self {
            me: CurrentUser::patient(UserId::new_v4(), pregnancy),
            pregnancy,
            x: Contact::new(UserId::new_v4(), Role::Clinician).with_display_name("Dr. X"),
            y: Contact::new(UserId::new_v4(), Role::Clinician).with_display_name("Midwife Y"),
        }
    }

    pub fn key_x(&self) -> ConversationKey {
        ConversationKey::new(self.pregnancy, self.x.user_id)
    }

    pub fn key_y(&self) -> ConversationKey {
        ConversationKey::new(self.pregnancy, self.y.user_id)
    }

    pub fn contacts(&self) -> Vec<Contact> {
        vec![self.x.clone(), self.y.clone()]
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Message `id` sent by the counterpart of `key` to `me`, `id` minutes after base time
pub fn inbound(id: u64, key: ConversationKey, me: UserId) -> Message {
    Message {
        id: MessageId(id),
        pregnancy_id: key.pregnancy_id,
        from_user_id: key.counterpart_id,
        to_user_id: me,
        body: format!("inbound {}", id),
        timestamp: base_time() + Duration::minutes(id as i64),
        read: false,
    }
}

/// Message `id` sent by `me` to the counterpart of `key`
pub fn outbound(id: u64, key: ConversationKey, me: UserId) -> Message {
    Message {
        id: MessageId(id),
        pregnancy_id: key.pregnancy_id,
        from_user_id: me,
        to_user_id: key.counterpart_id,
        body: format!("outbound {}", id),
        timestamp: base_time() + Duration::minutes(id as i64),
        read: false,
    }
}
