#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Naver Maps API credentials are not configured on the server.")]
    MissingCredentials,
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Geocoding provider responded with status {status}")]
    Upstream { status: u16 },
    #[error("Failed to parse geocoding response: {0}")]
    Parse(String),
}
