//! Notification settings matrix
//!
//! A lookup table keyed by `(event, recipient role)`. The engine only
//! reads it; mutation comes from the admin surface. Absence of a row is
//! treated as "enabled" on both channels, so a freshly added event kind
//! is never silently suppressed by missing configuration.

use staffdesk_types::{ChannelPrefs, EventKey, NotificationSetting, Role};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory settings matrix with fail-open semantics.
#[derive(Default)]
pub struct SettingsMatrix {
    rows: RwLock<HashMap<(EventKey, Role), ChannelPrefs>>,
}

impl SettingsMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel switches for an `(event, role)` pair.
    ///
    /// Missing row → both channels enabled.
    pub fn channels(&self, event_key: EventKey, role: Role) -> ChannelPrefs {
        let rows = self.rows.read().expect("settings lock poisoned");
        rows.get(&(event_key, role))
            .copied()
            .unwrap_or_else(ChannelPrefs::enabled)
    }

    /// Upsert one row of the matrix.
    pub fn set(&self, event_key: EventKey, role: Role, inapp_enabled: bool, email_enabled: bool) {
        let mut rows = self.rows.write().expect("settings lock poisoned");
        rows.insert(
            (event_key, role),
            ChannelPrefs {
                inapp_enabled,
                email_enabled,
            },
        );
        tracing::debug!(
            event_key = %event_key,
            role = %role,
            inapp_enabled,
            email_enabled,
            "Notification setting updated"
        );
    }

    /// All explicitly configured rows, sorted by event key then role.
    pub fn list(&self) -> Vec<NotificationSetting> {
        let rows = self.rows.read().expect("settings lock poisoned");
        let mut settings: Vec<NotificationSetting> = rows
            .iter()
            .map(|(&(event_key, role), prefs)| NotificationSetting {
                event_key,
                role,
                inapp_enabled: prefs.inapp_enabled,
                email_enabled: prefs.email_enabled,
            })
            .collect();
        settings.sort_by(|a, b| {
            (a.event_key.as_str(), a.role.as_str()).cmp(&(b.event_key.as_str(), b.role.as_str()))
        });
        settings
    }
}
