use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::device::DeviceType;

/// One browsing context, correlated across page loads by its session token.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Visitor {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: String, // Opaque token, unique across visitors
    pub ip_address: String, // Salted hash of the client address
    pub user_agent: String,
    pub device: DeviceType,
    pub first_visit: i64, // Timestamps in milliseconds
    pub last_visit: i64,
}

impl Visitor {
    pub fn new(session_id: String, ip_address: String, user_agent: String, now: i64) -> Self {
        let device = DeviceType::from_user_agent(&user_agent);

        Self {
            id: None,
            session_id,
            ip_address,
            user_agent,
            device,
            first_visit: now,
            last_visit: now,
        }
    }
}
