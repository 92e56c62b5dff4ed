//! Queue backend on Amazon SQS.
//!
//! Implements [`WorkSource`]: `poll` is a long-polling `ReceiveMessage`, `acknowledge`
//! is `DeleteMessage` with the receipt handle.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;
use robin_core::contract::{AckToken, ReceiveParams, WorkItem, WorkSource};
use robin_core::{HandlerError, HandlerResult};

pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Load AWS shared config for `profile` in `region` and bind a client to `queue_url`.
    pub async fn connect(queue_url: &str, region: &str, profile: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .profile_name(profile)
            .load()
            .await;

        tracing::info!(queue_url, region, profile, "Created SQS client");
        SqsQueue {
            client: Client::new(&sdk_config),
            queue_url: queue_url.to_string(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl WorkSource for SqsQueue {
    async fn poll(&self, params: &ReceiveParams) -> HandlerResult<Vec<WorkItem>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(params.max_messages)
            .visibility_timeout(params.visibility_timeout)
            .wait_time_seconds(params.wait_time)
            .send()
            .await
            .map_err(|e| {
                HandlerError::Poll(format!(
                    "failed to receive messages: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let mut items = Vec::new();
        for message in output.messages.unwrap_or_default() {
            let Some(receipt_handle) = message.receipt_handle else {
                tracing::warn!(message_id = ?message.message_id, "Skipping message without receipt handle");
                continue;
            };
            items.push(WorkItem {
                id: message.message_id,
                body: message.body.unwrap_or_default(),
                token: AckToken::new(receipt_handle),
            });
        }
        Ok(items)
    }

    async fn acknowledge(&self, token: &AckToken) -> HandlerResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(token.as_str())
            .send()
            .await
            .map_err(|e| {
                HandlerError::Acknowledgment(format!(
                    "failed to delete message: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}
