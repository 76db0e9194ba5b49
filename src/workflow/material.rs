use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::TransitionError;

const ENTITY: &str = "material";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaterialStatus {
    Pending,
    SentToClient,
    Approved,
    Rejected,
}

impl MaterialStatus {
    pub fn parse(raw: &str) -> Result<Self, TransitionError> {
        Self::from_str(raw).map_err(|_| TransitionError::unknown(ENTITY, raw))
    }

    /// A rejected material is replaced by a new one, never reopened.
    pub fn is_terminal(self) -> bool {
        matches!(self, MaterialStatus::Approved | MaterialStatus::Rejected)
    }
}

/// Decision recorded against a material sample.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaterialDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialAction {
    SendToClient,
    Decide(MaterialDecision),
}

impl MaterialAction {
    pub fn name(self) -> &'static str {
        match self {
            MaterialAction::SendToClient => "send_to_client",
            MaterialAction::Decide(MaterialDecision::Approve) => "approve",
            MaterialAction::Decide(MaterialDecision::Reject) => "reject",
        }
    }
}

/// Material approval transitions:
/// `pending → sent_to_client → {approved | rejected}`, with a direct decision
/// from `pending` also permitted. Who may take that shortcut is decided by the
/// caller's capabilities, not here.
pub fn next_status(
    from: MaterialStatus,
    action: MaterialAction,
) -> Result<MaterialStatus, TransitionError> {
    use MaterialStatus::*;

    if from.is_terminal() {
        return Err(TransitionError::Terminal {
            entity: ENTITY,
            status: from.to_string(),
        });
    }

    let next = match (from, action) {
        (Pending, MaterialAction::SendToClient) => SentToClient,
        (Pending | SentToClient, MaterialAction::Decide(MaterialDecision::Approve)) => Approved,
        (Pending | SentToClient, MaterialAction::Decide(MaterialDecision::Reject)) => Rejected,
        (status, action) => {
            return Err(TransitionError::NotAllowed {
                entity: ENTITY,
                action: action.name(),
                from: status.to_string(),
            })
        }
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use MaterialStatus::*;

    const APPROVE: MaterialAction = MaterialAction::Decide(MaterialDecision::Approve);
    const REJECT: MaterialAction = MaterialAction::Decide(MaterialDecision::Reject);

    #[rstest]
    #[case(Pending, MaterialAction::SendToClient, SentToClient)]
    #[case(SentToClient, APPROVE, Approved)]
    #[case(SentToClient, REJECT, Rejected)]
    #[case(Pending, APPROVE, Approved)]
    #[case(Pending, REJECT, Rejected)]
    fn allowed_transitions(
        #[case] from: MaterialStatus,
        #[case] action: MaterialAction,
        #[case] expected: MaterialStatus,
    ) {
        assert_eq!(next_status(from, action).unwrap(), expected);
    }

    #[test]
    fn resending_is_not_allowed() {
        assert_matches!(
            next_status(SentToClient, MaterialAction::SendToClient),
            Err(TransitionError::NotAllowed { .. })
        );
    }

    #[rstest]
    #[case(Approved, REJECT)]
    #[case(Rejected, APPROVE)]
    #[case(Approved, MaterialAction::SendToClient)]
    #[case(Rejected, MaterialAction::SendToClient)]
    fn terminal_statuses_stay_put(#[case] from: MaterialStatus, #[case] action: MaterialAction) {
        assert_matches!(next_status(from, action), Err(TransitionError::Terminal { .. }));
    }
}
