//! Editor client configuration.

/// Default number of undo steps kept.
pub const DEFAULT_MAX_UNDO_ITEMS: usize = 50;

/// Configuration for an [`EditorClient`](crate::EditorClient).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Identifies this user to the backend and other clients.
    pub user_id: String,
    /// Display name shown next to this user's cursor elsewhere.
    pub user_name: Option<String>,
    /// Cursor color shown elsewhere.
    pub user_color: Option<String>,
    /// Maximum undo steps kept; the oldest are dropped first.
    pub max_undo_items: usize,
    /// Text placed in a document whose history is empty.
    pub default_text: Option<String>,
    /// Capacity of the client event channel.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            user_name: None,
            user_color: None,
            max_undo_items: DEFAULT_MAX_UNDO_ITEMS,
            default_text: None,
            event_capacity: 100,
        }
    }
}

/// Builder for client configuration.
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Id the backend knows this user by.
    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.config.user_id = id.into();
        self
    }

    /// Name shown next to this user's cursor.
    pub fn user_name(mut self, name: impl Into<String>) -> Self {
        self.config.user_name = Some(name.into());
        self
    }

    /// Colour of this user's cursor.
    pub fn user_color(mut self, color: impl Into<String>) -> Self {
        self.config.user_color = Some(color.into());
        self
    }

    /// Steps kept per undo stack.
    pub fn max_undo_items(mut self, items: usize) -> Self {
        self.config.max_undo_items = items;
        self
    }

    /// Text to seed an empty document with.
    pub fn default_text(mut self, text: impl Into<String>) -> Self {
        self.config.default_text = Some(text.into());
        self
    }

    /// Capacity of the client event channel.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.max_undo_items, 50);
        assert_eq!(config.event_capacity, 100);
        assert!(config.default_text.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfigBuilder::new()
            .user_id("alice")
            .user_name("Alice")
            .user_color("#ff0000")
            .max_undo_items(10)
            .default_text("Hello")
            .event_capacity(0)
            .build();

        assert_eq!(config.user_id, "alice");
        assert_eq!(config.user_name.as_deref(), Some("Alice"));
        assert_eq!(config.user_color.as_deref(), Some("#ff0000"));
        assert_eq!(config.max_undo_items, 10);
        assert_eq!(config.default_text.as_deref(), Some("Hello"));
        assert_eq!(config.event_capacity, 1);
    }
}
