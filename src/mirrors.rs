use crate::config::MirrorConfig;

/// One independently hosted instance of the Piped API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEndpoint {
    base_url: String,
}

impl MirrorEndpoint {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the stream-listing endpoint for a video on this mirror.
    pub fn streams_url(&self, video_id: &str) -> String {
        format!("{}/streams/{}", self.base_url, video_id)
    }
}

impl std::fmt::Display for MirrorEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// Ordered, immutable pool of equivalent API mirrors. The order is the
/// failover order: resolution tries each endpoint in sequence.
#[derive(Debug, Clone)]
pub struct MirrorRegistry {
    endpoints: Vec<MirrorEndpoint>,
}

impl MirrorRegistry {
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self {
            endpoints: config.endpoints.iter().map(MirrorEndpoint::new).collect(),
        }
    }

    pub fn endpoints(&self) -> &[MirrorEndpoint] {
        &self.endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }
}
