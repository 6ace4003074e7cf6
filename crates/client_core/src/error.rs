use shared::error::ApiException;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url: {0}")]
    InvalidServerUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {source}")]
    Api {
        status: u16,
        #[source]
        source: ApiException,
    },
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("form is missing the '{0}' field")]
    MissingField(&'static str),
    #[error("slot controller must be bound inside a tokio runtime")]
    NoRuntime,
}
