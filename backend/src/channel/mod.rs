//! Messaging channels.
//!
//! A channel sends one templated message to one address and reports whether it
//! was accepted for delivery. It makes exactly one attempt: retries, backoff
//! and timeouts are not its concern.

mod interakt;

pub use interakt::InteraktChannel;

use crate::config::{ChannelConfig, ChannelKind};
use crate::error::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send `params` as the positional body values of `channel_template` to
    /// `address`.
    ///
    /// `Ok(false)` means the channel answered but did not accept the message.
    /// `Err(PipelineError::ChannelFault)` means it could not be reached.
    async fn send(&self, address: &str, channel_template: &str, params: &[String]) -> Result<bool>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Writes every message to the log and reports it delivered.
#[derive(Debug, Default, Clone)]
pub struct LogChannel;

#[async_trait]
impl MessageChannel for LogChannel {
    async fn send(&self, address: &str, channel_template: &str, params: &[String]) -> Result<bool> {
        info!(
            "[log channel] to={} template={} params={:?}",
            address, channel_template, params
        );
        Ok(true)
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Build the channel selected in the configuration.
pub fn from_config(config: &ChannelConfig) -> std::result::Result<Arc<dyn MessageChannel>, String> {
    match config.kind {
        ChannelKind::Log => Ok(Arc::new(LogChannel)),
        ChannelKind::Interakt => {
            let api_key = config
                .api_key
                .clone()
                .ok_or("channel.api_key (or INTERAKT_API_KEY) is required for the interakt channel")?;
            Ok(Arc::new(InteraktChannel::new(
                &config.base_url,
                api_key,
                &config.language_code,
                &config.default_country_code,
            )))
        }
    }
}

/// Reduce a contact to digits, prefixing `default_country_code` to 10-digit
/// national numbers.
///
/// Returns an empty string when the contact holds no digits.
pub fn normalize_address(raw: &str, default_country_code: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let national = digits.len() == 10 && !raw.trim_start().starts_with('+');
    if national {
        let country: String = default_country_code
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        format!("{}{}", country, digits)
    } else {
        digits
    }
}
