//! WhatsApp delivery through the Interakt public message API.

use super::{normalize_address, MessageChannel};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

const MESSAGE_PATH: &str = "/v1/public/message/";

pub struct InteraktChannel {
    client: reqwest::Client,
    url: String,
    api_key: String,
    language_code: String,
    default_country_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest<'a> {
    full_phone_number: String,
    #[serde(rename = "type")]
    kind: &'static str,
    template: TemplateBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateBody<'a> {
    name: &'a str,
    language_code: &'a str,
    body_values: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    result: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl InteraktChannel {
    /// No request timeout is set; the API's own limit applies.
    pub fn new(base_url: &str, api_key: String, language_code: &str, default_country_code: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}{}", base_url.trim_end_matches('/'), MESSAGE_PATH),
            api_key,
            language_code: language_code.to_string(),
            default_country_code: default_country_code.to_string(),
        }
    }

    fn request<'a>(&'a self, address: &str, channel_template: &'a str, params: &'a [String]) -> MessageRequest<'a> {
        MessageRequest {
            full_phone_number: normalize_address(address, &self.default_country_code),
            kind: "Template",
            template: TemplateBody {
                name: channel_template,
                language_code: &self.language_code,
                body_values: params,
            },
        }
    }
}

#[async_trait]
impl MessageChannel for InteraktChannel {
    async fn send(&self, address: &str, channel_template: &str, params: &[String]) -> Result<bool> {
        let body = self.request(address, channel_template, params);

        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Basic {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::ChannelFault(e.to_string()))?;

        let status = response.status();
        // Any answer from the API is a delivery verdict, even an unreadable one.
        let reply: MessageResponse = response.json().await.unwrap_or_default();
        let delivered = status.is_success() && reply.result;

        if delivered {
            debug!(
                "interakt accepted message {} for {}",
                reply.id.as_deref().unwrap_or("-"),
                body.full_phone_number
            );
        } else {
            warn!(
                "interakt rejected message for {} ({}): {}",
                body.full_phone_number,
                status,
                reply.message.as_deref().unwrap_or("no message")
            );
        }
        Ok(delivered)
    }

    fn name(&self) -> &str {
        "interakt"
    }
}
