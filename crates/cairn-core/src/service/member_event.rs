// Member change event handling
// Provides broadcast notifications for cluster membership changes

use cairn_api::{Member, NodeState};

/// Type of member change event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberChangeType {
    /// A new member joined the cluster
    MemberJoin,
    /// A member left the cluster
    MemberLeave,
    /// A member's state changed (e.g., UP -> DOWN)
    MemberStateChange,
}

impl std::fmt::Display for MemberChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberChangeType::MemberJoin => write!(f, "MEMBER_JOIN"),
            MemberChangeType::MemberLeave => write!(f, "MEMBER_LEAVE"),
            MemberChangeType::MemberStateChange => write!(f, "MEMBER_STATE_CHANGE"),
        }
    }
}

/// Member change event
#[derive(Clone, Debug)]
pub struct MemberChangeEvent {
    pub change_type: MemberChangeType,
    pub member: Member,
    /// Previous state (for state changes)
    pub previous_state: Option<NodeState>,
    /// Unix millis
    pub timestamp: i64,
}

impl MemberChangeEvent {
    pub fn member_join(member: Member) -> Self {
        Self::new(MemberChangeType::MemberJoin, member, None)
    }

    pub fn member_leave(member: Member) -> Self {
        Self::new(MemberChangeType::MemberLeave, member, None)
    }

    pub fn member_state_change(member: Member, previous_state: NodeState) -> Self {
        Self::new(
            MemberChangeType::MemberStateChange,
            member,
            Some(previous_state),
        )
    }

    fn new(change_type: MemberChangeType, member: Member, previous_state: Option<NodeState>) -> Self {
        Self {
            change_type,
            member,
            previous_state,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
