//! Application options.

use serde::Deserialize;

/// Options owned by the application root.
///
/// Every field has a default, so a partial document is enough:
///
/// ```
/// use meguri::AppOptions;
///
/// let options = AppOptions::from_json(r#"{ "command_prefix": "!" }"#).unwrap();
/// assert_eq!(options.command_prefix, "!");
/// assert_eq!(options.self_id, None);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppOptions {
    /// The bot's own account id, copied onto inbound events lacking one.
    pub self_id: Option<i64>,
    /// Messages starting with this prefix are treated as command invocations.
    pub command_prefix: String,
    /// Reply sent when `run_command` cannot resolve a name. `{name}` is
    /// replaced by the requested command name.
    pub not_found_reply: String,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            self_id: None,
            command_prefix: "/".to_string(),
            not_found_reply: "command \"{name}\" not found".to_string(),
        }
    }
}

impl AppOptions {
    /// Parse options from a JSON document.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub(crate) fn not_found(&self, name: &str) -> String {
        self.not_found_reply.replace("{name}", name)
    }
}
