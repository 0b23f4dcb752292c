use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use super::ChatBackend;
use super::credentials::{API_KEY_HEADER, SessionCredentials};
use super::error::{
    BuildHttpClientSnafu, ClientError, ClientResult, MalformedPayloadSnafu, NetworkSnafu,
    StatusSnafu,
};
use super::ids::ChatId;
use super::types::{ChatSummary, ForkRequest, NewMessage};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout,
        }
    }
}

/// REST implementation of [`ChatBackend`].
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: Client,
    base_url: String,
    credentials: SessionCredentials,
}

impl HttpChatBackend {
    pub fn new(config: ClientConfig, credentials: SessionCredentials) -> ClientResult<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if let Err(error) = reqwest::Url::parse(&base_url) {
            return Err(ClientError::InvalidBaseUrl {
                stage: "http-backend-new",
                base_url,
                details: error.to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context(BuildHttpClientSnafu {
                stage: "http-backend-new",
            })?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(format!("{}{path}", self.base_url)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(format!("{}{path}", self.base_url)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credentials.api_key() {
            Some(api_key) => builder.header(API_KEY_HEADER, api_key.as_str()),
            None => builder,
        }
    }

    async fn execute<T>(
        &self,
        builder: RequestBuilder,
        method: &'static str,
        path: String,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await.context(NetworkSnafu {
            stage: "send-request",
            method,
            path: path.clone(),
        })?;

        let status = response.status();
        let body = response.text().await.context(NetworkSnafu {
            stage: "read-response-body",
            method,
            path: path.clone(),
        })?;

        tracing::debug!(method, path = %path, status = status.as_u16(), "backend responded");

        if !status.is_success() {
            return StatusSnafu {
                stage: "check-response-status",
                method,
                path,
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        serde_json::from_str(&body).context(MalformedPayloadSnafu {
            stage: "decode-response-body",
            method,
            path,
        })
    }
}

impl ChatBackend for HttpChatBackend {
    fn list_chats(&self) -> BoxFuture<'_, ClientResult<Vec<ChatSummary>>> {
        async move {
            let path = "/chats/".to_string();
            self.execute(self.get(&path), "GET", path).await
        }
        .boxed()
    }

    fn create_chat(&self) -> BoxFuture<'_, ClientResult<ChatSummary>> {
        async move {
            let path = "/chats/".to_string();
            self.execute(self.post(&path), "POST", path).await
        }
        .boxed()
    }

    fn get_chat(&self, chat_id: ChatId) -> BoxFuture<'_, ClientResult<ChatSummary>> {
        async move {
            let path = format!("/chats/{chat_id}");
            self.execute(self.get(&path), "GET", path).await
        }
        .boxed()
    }

    fn append_message(
        &self,
        chat_id: ChatId,
        message: NewMessage,
    ) -> BoxFuture<'_, ClientResult<ChatSummary>> {
        async move {
            let path = format!("/chats/{chat_id}/messages");
            let builder = self.post(&path).json(&message);
            self.execute(builder, "POST", path).await
        }
        .boxed()
    }

    fn create_fork(&self, request: ForkRequest) -> BoxFuture<'_, ClientResult<ChatSummary>> {
        async move {
            let path = "/chats/fork".to_string();
            let builder = self.post(&path).json(&request);
            self.execute(builder, "POST", path).await
        }
        .boxed()
    }
}
