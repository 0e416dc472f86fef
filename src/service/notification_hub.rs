//! In-process fan-out of realtime events to connected WebSocket clients.
//!
//! Every connection subscribes to one broadcast channel and keeps only the
//! dispatches addressed to everyone or to a room it joined.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::model::user::Role;

pub const NEW_ALERT: &str = "newAlert";
pub const STOCK_UPDATE: &str = "stockUpdate";
pub const MOVEMENT_UPDATED: &str = "movementUpdated";
pub const MOVEMENT_STATUS_CHANGED: &str = "movementStatusChanged";
pub const DRIVER_LOCATION_UPDATE: &str = "driverLocationUpdate";

pub const JOIN_USER_ROOM: &str = "joinUserRoom";
pub const JOIN_ROLE_ROOM: &str = "joinRoleRoom";
pub const UPDATE_DRIVER_LOCATION: &str = "updateDriverLocation";

const DEFAULT_CAPACITY: usize = 256;

/// Wire frame in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    All,
    /// Room named after a user's hex id.
    User(String),
    Role(Role),
}

#[derive(Debug, Clone)]
pub struct Dispatch {
    pub audience: Audience,
    pub envelope: Envelope,
}

/// Rooms one connection has joined.
#[derive(Debug, Clone, Default)]
pub struct Rooms {
    users: HashSet<String>,
    roles: HashSet<Role>,
}

impl Rooms {
    pub fn join_user(&mut self, user_id: impl Into<String>) {
        self.users.insert(user_id.into());
    }

    pub fn join_role(&mut self, role: Role) {
        self.roles.insert(role);
    }

    pub fn admits(&self, audience: &Audience) -> bool {
        match audience {
            Audience::All => true,
            Audience::User(id) => self.users.contains(id),
            Audience::Role(role) => self.roles.contains(role),
        }
    }
}

pub struct NotificationHub {
    sender: broadcast::Sender<Dispatch>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        NotificationHub { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Dispatch> {
        self.sender.subscribe()
    }

    pub fn publish<T: Serialize>(&self, audience: Audience, event: &str, data: &T) {
        let data = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                error!(event, "Failed to serialize realtime payload: {}", e);
                return;
            }
        };
        let dispatch = Dispatch {
            audience,
            envelope: Envelope { event: event.to_string(), data },
        };
        match self.sender.send(dispatch) {
            Ok(receivers) => debug!(event, receivers, "Realtime event published"),
            Err(_) => debug!(event, "Realtime event dropped, no subscribers"),
        }
    }

    pub fn broadcast<T: Serialize>(&self, event: &str, data: &T) {
        self.publish(Audience::All, event, data);
    }

    pub fn to_user<T: Serialize>(&self, user_id: &str, event: &str, data: &T) {
        self.publish(Audience::User(user_id.to_string()), event, data);
    }

    pub fn to_role<T: Serialize>(&self, role: Role, event: &str, data: &T) {
        self.publish(Audience::Role(role), event, data);
    }

    /// Applies a client frame to `rooms`, relaying driver positions to everyone.
    pub fn handle_client_event(&self, rooms: &mut Rooms, envelope: Envelope) {
        match envelope.event.as_str() {
            JOIN_USER_ROOM => match envelope.data.as_str() {
                Some(user_id) if !user_id.is_empty() => rooms.join_user(user_id),
                _ => debug!("joinUserRoom without a user id"),
            },
            JOIN_ROLE_ROOM => match envelope.data.as_str().and_then(|r| r.parse::<Role>().ok()) {
                Some(role) => rooms.join_role(role),
                None => debug!("joinRoleRoom with an unknown role"),
            },
            UPDATE_DRIVER_LOCATION => self.broadcast(DRIVER_LOCATION_UPDATE, &envelope.data),
            other => debug!(event = other, "Ignoring unknown client event"),
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        NotificationHub::new(DEFAULT_CAPACITY)
    }
}
