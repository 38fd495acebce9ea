//! Outcome aggregation: partitions per-channel results and derives the
//! overall verdict and summary message for the response.

use relay_common::types::{Channel, ChannelResult, ChannelStatus};

/// Appended when no channel produced a success or a failure.
pub const NOTHING_SENT_NOTE: &str =
    "Nothing was sent; check the requested channels or provider configuration.";

/// Overall classification of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// At least one channel succeeded.
    Delivered,
    /// Nothing succeeded and at least one channel failed.
    Failed,
    /// Nothing succeeded or failed; every channel was skipped.
    NothingSent,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        !matches!(self, Verdict::Failed)
    }

    /// HTTP status the response should carry.
    pub fn status_code(&self) -> u16 {
        match self {
            Verdict::Delivered | Verdict::NothingSent => 200,
            Verdict::Failed => 400,
        }
    }
}

/// Ordered per-channel results of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub results: Vec<ChannelResult>,
}

impl DispatchOutcome {
    pub fn new(results: Vec<ChannelResult>) -> Self {
        Self { results }
    }

    fn channels_with(&self, status: ChannelStatus) -> Vec<Channel> {
        self.results
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.channel)
            .collect()
    }

    pub fn success_channels(&self) -> Vec<Channel> {
        self.channels_with(ChannelStatus::Success)
    }

    pub fn failed_channels(&self) -> Vec<Channel> {
        self.channels_with(ChannelStatus::Failed)
    }

    pub fn skipped_channels(&self) -> Vec<Channel> {
        self.channels_with(ChannelStatus::Skipped)
    }

    pub fn verdict(&self) -> Verdict {
        if !self.success_channels().is_empty() {
            Verdict::Delivered
        } else if !self.failed_channels().is_empty() {
            Verdict::Failed
        } else {
            Verdict::NothingSent
        }
    }

    /// Human-readable summary listing channels per partition.
    pub fn summary(&self) -> String {
        let mut summary = String::from("Notification processed.");
        let partitions = [
            ("Sent via", self.success_channels()),
            ("Failed on", self.failed_channels()),
            ("Skipped on", self.skipped_channels()),
        ];
        for (label, channels) in partitions {
            if channels.is_empty() {
                continue;
            }
            let names: Vec<&str> = channels.iter().map(Channel::as_str).collect();
            summary.push_str(&format!(" {}: {}.", label, names.join(", ")));
        }
        if self.verdict() == Verdict::NothingSent {
            summary.push(' ');
            summary.push_str(NOTHING_SENT_NOTE);
        }
        summary
    }
}
