use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::TransitionError;

const ENTITY: &str = "drawing";

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
pub enum DrawingStatus {
    NotUploaded,
    Uploaded,
    SentToClient,
    Approved,
    Rejected,
    ApprovedWithComments,
}

impl DrawingStatus {
    pub fn parse(raw: &str) -> Result<Self, TransitionError> {
        Self::from_str(raw).map_err(|_| TransitionError::unknown(ENTITY, raw))
    }

    pub fn is_approved(self) -> bool {
        matches!(
            self,
            DrawingStatus::Approved | DrawingStatus::ApprovedWithComments
        )
    }
}

/// Outcome a client can return for a drawing under review.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientDecision {
    Approved,
    Rejected,
    ApprovedWithComments,
}

impl From<ClientDecision> for DrawingStatus {
    fn from(decision: ClientDecision) -> Self {
        match decision {
            ClientDecision::Approved => DrawingStatus::Approved,
            ClientDecision::Rejected => DrawingStatus::Rejected,
            ClientDecision::ApprovedWithComments => DrawingStatus::ApprovedWithComments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingAction {
    Upload,
    SendToClient,
    RecordDecision(ClientDecision),
    Override,
}

impl DrawingAction {
    pub fn name(self) -> &'static str {
        match self {
            DrawingAction::Upload => "upload",
            DrawingAction::SendToClient => "send_to_client",
            DrawingAction::RecordDecision(_) => "record_client_decision",
            DrawingAction::Override => "pm_override",
        }
    }
}

/// Drawing approval transitions.
///
/// ```text
/// not_uploaded ──upload──▶ uploaded ──send──▶ sent_to_client ──decision──▶ approved
///                  ▲           │                                        ├▶ approved_with_comments
///                  └─upload── rejected ◀────────────────────────────────┘
/// ```
///
/// The PM override jumps to `approved` from any status that is not already
/// approved; it is the only route that skips the client.
pub fn next_status(
    from: DrawingStatus,
    action: DrawingAction,
) -> Result<DrawingStatus, TransitionError> {
    use DrawingStatus::*;

    let next = match (from, action) {
        (NotUploaded | Uploaded | Rejected, DrawingAction::Upload) => Uploaded,
        (Uploaded | Rejected, DrawingAction::SendToClient) => SentToClient,
        (SentToClient, DrawingAction::RecordDecision(decision)) => decision.into(),
        (status, DrawingAction::Override) if !status.is_approved() => Approved,
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

/// Actions permitted from `from`, ignoring who is asking.
pub fn available_actions(from: DrawingStatus) -> Vec<DrawingAction> {
    let candidates = [
        DrawingAction::Upload,
        DrawingAction::SendToClient,
        DrawingAction::RecordDecision(ClientDecision::Approved),
        DrawingAction::RecordDecision(ClientDecision::Rejected),
        DrawingAction::RecordDecision(ClientDecision::ApprovedWithComments),
        DrawingAction::Override,
    ];
    candidates
        .into_iter()
        .filter(|action| next_status(from, *action).is_ok())
        .collect()
}

/// Revision code for the `n`th upload, 1-based: A, B, … Z, AA, AB, …
pub fn revision_code(n: u32) -> String {
    let mut n = n.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use DrawingStatus::*;

    #[rstest]
    #[case(NotUploaded, DrawingAction::Upload, Uploaded)]
    #[case(Uploaded, DrawingAction::Upload, Uploaded)]
    #[case(Rejected, DrawingAction::Upload, Uploaded)]
    #[case(Uploaded, DrawingAction::SendToClient, SentToClient)]
    #[case(Rejected, DrawingAction::SendToClient, SentToClient)]
    #[case(SentToClient, DrawingAction::RecordDecision(ClientDecision::Approved), Approved)]
    #[case(SentToClient, DrawingAction::RecordDecision(ClientDecision::Rejected), Rejected)]
    #[case(
        SentToClient,
        DrawingAction::RecordDecision(ClientDecision::ApprovedWithComments),
        ApprovedWithComments
    )]
    #[case(NotUploaded, DrawingAction::Override, Approved)]
    #[case(SentToClient, DrawingAction::Override, Approved)]
    #[case(Rejected, DrawingAction::Override, Approved)]
    fn allowed_transitions(
        #[case] from: DrawingStatus,
        #[case] action: DrawingAction,
        #[case] expected: DrawingStatus,
    ) {
        assert_eq!(next_status(from, action).unwrap(), expected);
    }

    #[rstest]
    #[case(NotUploaded, DrawingAction::SendToClient)]
    #[case(NotUploaded, DrawingAction::RecordDecision(ClientDecision::Approved))]
    #[case(Uploaded, DrawingAction::RecordDecision(ClientDecision::Approved))]
    #[case(SentToClient, DrawingAction::Upload)]
    #[case(SentToClient, DrawingAction::SendToClient)]
    #[case(Approved, DrawingAction::Upload)]
    #[case(Approved, DrawingAction::Override)]
    #[case(ApprovedWithComments, DrawingAction::Override)]
    #[case(ApprovedWithComments, DrawingAction::SendToClient)]
    fn rejected_transitions(#[case] from: DrawingStatus, #[case] action: DrawingAction) {
        assert_matches!(
            next_status(from, action),
            Err(TransitionError::NotAllowed { entity: "drawing", .. })
        );
    }

    #[test]
    fn only_override_reaches_approved_from_not_uploaded() {
        for action in available_actions(NotUploaded) {
            let next = next_status(NotUploaded, action).unwrap();
            if next.is_approved() {
                assert_eq!(action, DrawingAction::Override);
            }
        }
    }

    #[test]
    fn approved_drawings_are_frozen() {
        assert!(available_actions(Approved).is_empty());
        assert!(available_actions(ApprovedWithComments).is_empty());
    }

    #[test]
    fn stored_status_parsing() {
        assert_eq!(DrawingStatus::parse("sent_to_client").unwrap(), SentToClient);
        assert_matches!(
            DrawingStatus::parse("lost"),
            Err(TransitionError::UnknownStatus { .. })
        );
    }

    #[rstest]
    #[case(1, "A")]
    #[case(2, "B")]
    #[case(26, "Z")]
    #[case(27, "AA")]
    #[case(28, "AB")]
    #[case(52, "AZ")]
    #[case(53, "BA")]
    #[case(702, "ZZ")]
    #[case(703, "AAA")]
    fn revision_codes(#[case] n: u32, #[case] expected: &str) {
        assert_eq!(revision_code(n), expected);
    }
}
