use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("backend base URL '{base_url}' is invalid: {details}"))]
    InvalidBaseUrl {
        stage: &'static str,
        base_url: String,
        details: String,
    },
    #[snafu(display("failed to build HTTP client on `{stage}`: {source}"))]
    BuildHttpClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("{method} {path} failed on `{stage}`: {source}"))]
    Network {
        stage: &'static str,
        method: &'static str,
        path: String,
        source: reqwest::Error,
    },
    #[snafu(display("{method} {path} returned status {status}: {body}"))]
    Status {
        stage: &'static str,
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },
    #[snafu(display("{method} {path} returned a malformed payload: {source}"))]
    MalformedPayload {
        stage: &'static str,
        method: &'static str,
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("backend id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        source: std::num::ParseIntError,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Coarse failure class, for rendering distinct error states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    Configuration,
    Network,
    Status,
    MalformedPayload,
}

impl ClientError {
    pub fn kind(&self) -> ClientErrorKind {
        match self {
            Self::InvalidBaseUrl { .. } | Self::BuildHttpClient { .. } | Self::InvalidId { .. } => {
                ClientErrorKind::Configuration
            }
            Self::Network { .. } => ClientErrorKind::Network,
            Self::Status { .. } => ClientErrorKind::Status,
            Self::MalformedPayload { .. } => ClientErrorKind::MalformedPayload,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
