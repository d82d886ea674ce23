use serde::{Deserialize, Serialize};
use std::fmt;

/// Order payment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting payment
    Pending,
    /// Payment confirmed; `paid_at` must be set
    Paid,
    /// Payment failed
    Failed,
    /// Payment reversed; `paid_at` cleared
    Refunded,
    /// Abandoned or operator-cancelled
    Cancelled,
}

impl OrderStatus {
    /// States from which no automatic transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refunded | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Generation job lifecycle, from lyrics generation through synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, waiting to start lyrics generation
    Pending,
    /// Lyrics generation in progress
    Processing,
    /// Synthesis submitted to the provider
    GeneratingAudio,
    /// Provider accepted; awaiting callback
    AudioProcessing,
    /// Deliverable produced
    Completed,
    /// Terminal failure; `last_error` records the provider message
    Failed,
    /// Parked for the retry queue
    RetryPending,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// States counted by the duplicate-submission guard: the job has (or is
    /// about to get) a billable external task in flight.
    pub fn is_synthesis_in_flight(&self) -> bool {
        matches!(self, Self::GeneratingAudio | Self::AudioProcessing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::GeneratingAudio => write!(f, "generating_audio"),
            Self::AudioProcessing => write!(f, "audio_processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::RetryPending => write!(f, "retry_pending"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "generating_audio" => Ok(Self::GeneratingAudio),
            "audio_processing" => Ok(Self::AudioProcessing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "retry_pending" => Ok(Self::RetryPending),
            _ => Err(format!("invalid job status: {s}")),
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Lyrics review gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("invalid approval status: {s}")),
        }
    }
}

/// Deliverable lifecycle. `Released` requires non-empty media URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongStatus {
    Pending,
    Ready,
    Approved,
    Released,
}

impl SongStatus {
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }
}

impl fmt::Display for SongStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Approved => write!(f, "approved"),
            Self::Released => write!(f, "released"),
        }
    }
}

impl std::str::FromStr for SongStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "approved" => Ok(Self::Approved),
            "released" => Ok(Self::Released),
            _ => Err(format!("invalid song status: {s}")),
        }
    }
}

/// Retry queue item lifecycle. `Failed` is terminal and excluded from all
/// subsequent sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RetryItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RetryItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for RetryItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid retry item status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_terminality() {
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
    }

    #[test]
    fn job_in_flight_states() {
        assert!(JobStatus::GeneratingAudio.is_synthesis_in_flight());
        assert!(JobStatus::AudioProcessing.is_synthesis_in_flight());
        assert!(!JobStatus::Processing.is_synthesis_in_flight());
        assert!(!JobStatus::Completed.is_synthesis_in_flight());
    }

    #[test]
    fn status_string_round_trips() {
        assert_eq!(JobStatus::GeneratingAudio.to_string(), "generating_audio");
        assert_eq!(
            "audio_processing".parse::<JobStatus>().unwrap(),
            JobStatus::AudioProcessing
        );
        assert_eq!("paid".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert_eq!(SongStatus::Released.to_string(), "released");
        assert_eq!(
            "failed".parse::<RetryItemStatus>().unwrap(),
            RetryItemStatus::Failed
        );
        assert!("bogus".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_serde_uses_snake_case() {
        let json = serde_json::to_string(&JobStatus::AudioProcessing).unwrap();
        assert_eq!(json, "\"audio_processing\"");
        let parsed: JobStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, JobStatus::AudioProcessing);
    }
}
