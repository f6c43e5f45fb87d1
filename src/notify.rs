//! Outbound notifications over the messaging channel. Delivery is best
//! effort: failures are logged and never propagate into the pipeline or
//! the review workflow.

use std::time::Duration;

pub trait Notifier: Send + Sync {
    /// Push a message to one resident.
    fn notify_resident(&self, recipient_id: &str, text: &str);

    /// Push a message to the staff review group.
    fn notify_staff(&self, text: &str);
}

/// LINE push-message client.
pub struct LineNotifier {
    client: reqwest::blocking::Client,
    push_url: String,
    channel_token: String,
    staff_group_id: String,
}

impl LineNotifier {
    pub fn new(
        push_url: String,
        channel_token: String,
        staff_group_id: String,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            push_url,
            channel_token,
            staff_group_id,
        })
    }

    fn push(&self, to: &str, text: &str) {
        let body = serde_json::json!({
            "to": to,
            "messages": [{ "type": "text", "text": text }],
        });
        let result = self
            .client
            .post(&self.push_url)
            .bearer_auth(&self.channel_token)
            .json(&body)
            .send();
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(to, "notification delivered");
            }
            Ok(response) => {
                tracing::warn!(to, status = %response.status(), "notification rejected");
            }
            Err(err) => {
                tracing::warn!(to, error = %err, "notification failed");
            }
        }
    }
}

impl Notifier for LineNotifier {
    fn notify_resident(&self, recipient_id: &str, text: &str) {
        self.push(recipient_id, text);
    }

    fn notify_staff(&self, text: &str) {
        self.push(&self.staff_group_id, text);
    }
}

/// Recording double for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryNotifier {
    pub resident_messages: std::sync::Mutex<Vec<(String, String)>>,
    pub staff_messages: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl Notifier for MemoryNotifier {
    fn notify_resident(&self, recipient_id: &str, text: &str) {
        self.resident_messages
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), text.to_string()));
    }

    fn notify_staff(&self, text: &str) {
        self.staff_messages.lock().unwrap().push(text.to_string());
    }
}
