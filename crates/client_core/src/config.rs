use std::{collections::HashMap, fs, time::Duration};

#[derive(Debug, Clone)]
pub struct RealtimeSettings {
    /// Base websocket endpoint, e.g. `wss://host/ws`. The channel kind and
    /// id are appended as path segments at connect time.
    pub ws_base_url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    /// Minimum gap between outbound typing frames.
    pub typing_throttle: Duration,
    /// A typing entry with no fresh signal for this long is pruned.
    pub typing_stale_after: Duration,
    pub typing_sweep_interval: Duration,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            ws_base_url: "wss://127.0.0.1:8443/ws".into(),
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_millis(1000),
            reconnect_max_delay: Duration::from_millis(30_000),
            typing_throttle: Duration::from_millis(500),
            typing_stale_after: Duration::from_millis(3000),
            typing_sweep_interval: Duration::from_millis(1000),
        }
    }
}

pub fn load_settings() -> RealtimeSettings {
    let mut settings = RealtimeSettings::default();

    if let Ok(raw) = fs::read_to_string("realtime.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply_file_settings(&mut settings, &file_cfg);
        }
    }

    if let Ok(v) = std::env::var("CHAT_WS_URL") {
        settings.ws_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__WS_BASE_URL") {
        settings.ws_base_url = v;
    }

    if let Ok(v) = std::env::var("APP__MAX_RECONNECT_ATTEMPTS") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.max_reconnect_attempts = parsed;
        }
    }

    settings
}

fn apply_file_settings(settings: &mut RealtimeSettings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("ws_base_url") {
        settings.ws_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("max_reconnect_attempts") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.max_reconnect_attempts = parsed;
        }
    }
    if let Some(v) = file_cfg.get("reconnect_base_delay_ms") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.reconnect_base_delay = Duration::from_millis(parsed);
        }
    }
    if let Some(v) = file_cfg.get("reconnect_max_delay_ms") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.reconnect_max_delay = Duration::from_millis(parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_production_constants() {
        let settings = RealtimeSettings::default();
        assert_eq!(settings.max_reconnect_attempts, 5);
        assert_eq!(settings.reconnect_base_delay, Duration::from_millis(1000));
        assert_eq!(settings.reconnect_max_delay, Duration::from_millis(30_000));
        assert_eq!(settings.typing_throttle, Duration::from_millis(500));
        assert_eq!(settings.typing_stale_after, Duration::from_millis(3000));
        assert_eq!(settings.typing_sweep_interval, Duration::from_millis(1000));
    }

    #[test]
    fn file_settings_override_defaults() {
        let mut settings = RealtimeSettings::default();
        let file_cfg: HashMap<String, String> = toml::from_str(
            "ws_base_url = \"wss://chat.example/ws\"\nreconnect_base_delay_ms = \"250\"\n",
        )
        .expect("parse toml");

        apply_file_settings(&mut settings, &file_cfg);

        assert_eq!(settings.ws_base_url, "wss://chat.example/ws");
        assert_eq!(settings.reconnect_base_delay, Duration::from_millis(250));
        assert_eq!(settings.max_reconnect_attempts, 5);
    }

    #[test]
    fn unparseable_file_values_are_ignored() {
        let mut settings = RealtimeSettings::default();
        let mut file_cfg = HashMap::new();
        file_cfg.insert("max_reconnect_attempts".to_string(), "lots".to_string());

        apply_file_settings(&mut settings, &file_cfg);

        assert_eq!(settings.max_reconnect_attempts, 5);
    }
}
