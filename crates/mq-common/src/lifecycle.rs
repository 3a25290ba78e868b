use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Review status of a match record. `Dismissed` and `Converted` are terminal;
/// rescans never move a record between statuses, only explicit user actions do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Reviewed,
    Dismissed,
    Converted,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Reviewed => "reviewed",
            MatchStatus::Dismissed => "dismissed",
            MatchStatus::Converted => "converted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Dismissed | MatchStatus::Converted)
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(MatchStatus::Pending),
            "reviewed" => Ok(MatchStatus::Reviewed),
            "dismissed" => Ok(MatchStatus::Dismissed),
            "converted" => Ok(MatchStatus::Converted),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Review,
    Dismiss,
    Convert,
}

impl std::str::FromStr for TransitionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "review" | "approve" => Ok(TransitionAction::Review),
            "dismiss" => Ok(TransitionAction::Dismiss),
            "convert" => Ok(TransitionAction::Convert),
            other => Err(format!("unknown transition action: {other}")),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error("no transition allowed out of terminal status {current:?}")]
    InvalidTransition { current: MatchStatus },
    #[error("convert requires a deal_id")]
    MissingDeal,
}

/// Resolve the next status for a user action. The caller applies the side
/// fields (reviewed_by on review, deal_id on convert) atomically with the
/// status write.
pub fn apply_transition(
    current: MatchStatus,
    action: TransitionAction,
    deal_id: Option<i64>,
) -> Result<MatchStatus, LifecycleError> {
    if current.is_terminal() {
        return Err(LifecycleError::InvalidTransition { current });
    }

    match action {
        TransitionAction::Review => Ok(MatchStatus::Reviewed),
        TransitionAction::Dismiss => Ok(MatchStatus::Dismissed),
        TransitionAction::Convert => {
            if deal_id.is_none() {
                return Err(LifecycleError::MissingDeal);
            }
            Ok(MatchStatus::Converted)
        }
    }
}
