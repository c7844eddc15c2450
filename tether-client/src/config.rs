use std::env;
use std::time::Duration;
use tether_core::IceServerConfig;

const DEFAULT_SIGNALING_URL: &str = "ws://localhost:3000/ws";
const DEFAULT_STUN_SERVERS: [&str; 2] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

/// How many times the initial signaling connect is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub signaling_url: String,
    pub ice_servers: Vec<IceServerConfig>,
    /// Upper bound for a single connect attempt.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_owned(),
            ice_servers: DEFAULT_STUN_SERVERS
                .iter()
                .map(|url| IceServerConfig::stun(*url))
                .collect(),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_signaling_url(mut self, url: impl Into<String>) -> Self {
        self.signaling_url = url.into();
        self
    }

    /// Appends a TURN server, but only when all three parts are present.
    pub fn with_turn(
        mut self,
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        if let (Some(url), Some(username), Some(password)) = (url, username, password)
            && !url.is_empty()
            && !username.is_empty()
            && !password.is_empty()
        {
            self.ice_servers.push(IceServerConfig {
                urls: vec![url],
                username: Some(username),
                credential: Some(password),
            });
        }
        self
    }

    /// Defaults overridden by `TETHER_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("TETHER_SIGNALING_URL")
            && !url.is_empty()
        {
            config.signaling_url = url;
        }
        config.with_turn(
            env::var("TETHER_TURN_URL").ok(),
            env::var("TETHER_TURN_USERNAME").ok(),
            env::var("TETHER_TURN_PASSWORD").ok(),
        )
    }
}
