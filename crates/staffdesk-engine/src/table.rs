//! The declarative transition table
//!
//! One row per permitted edge: `(kind, from, to)` mapped to the roles
//! allowed to traverse it, the notification event it raises, and
//! whether reviewer community scoping applies. The engine consults
//! this table once per operation; no role check lives anywhere else.

use staffdesk_types::{EventKey, RequestKind, RequestState, Role};
use std::collections::HashMap;

/// A permitted edge in a kind's state graph.
#[derive(Clone, Debug)]
pub struct EdgeRule {
    pub from: RequestState,
    pub to: RequestState,
    /// Roles allowed to traverse this edge.
    pub roles: Vec<Role>,
    /// Notification event raised when the edge commits.
    pub event_key: EventKey,
    /// Whether a reviewer must cover the request's community.
    pub reviewer_scoped: bool,
}

impl EdgeRule {
    fn new(
        from: RequestState,
        to: RequestState,
        roles: &[Role],
        event_key: EventKey,
        reviewer_scoped: bool,
    ) -> Self {
        Self {
            from,
            to,
            roles: roles.to_vec(),
            event_key,
            reviewer_scoped,
        }
    }
}

/// The full edge table for every request kind.
#[derive(Clone, Debug)]
pub struct TransitionTable {
    edges: HashMap<RequestKind, Vec<EdgeRule>>,
    editable: HashMap<RequestKind, Vec<RequestState>>,
}

impl TransitionTable {
    /// The standard Staffdesk graphs.
    pub fn new() -> Self {
        use RequestState::*;
        use Role::*;

        let mut edges: HashMap<RequestKind, Vec<EdgeRule>> = HashMap::new();

        // Compensation: drafted privately, submitted by the owner, then
        // reviewer pre-approval, admin approval, payment. Rejection is
        // a side-exit from every non-terminal post-submission state.
        edges.insert(
            RequestKind::Compensation,
            vec![
                EdgeRule::new(
                    Draft,
                    Submitted,
                    &[Collaborator],
                    EventKey::CompensationSubmitted,
                    false,
                ),
                EdgeRule::new(
                    Submitted,
                    PreApprovedByReviewer,
                    &[Reviewer],
                    EventKey::RequestPreApproved,
                    true,
                ),
                EdgeRule::new(Submitted, Rejected, &[Reviewer], EventKey::RequestRejected, true),
                EdgeRule::new(
                    PreApprovedByReviewer,
                    ApprovedByAdmin,
                    &[Admin],
                    EventKey::RequestApproved,
                    false,
                ),
                EdgeRule::new(
                    PreApprovedByReviewer,
                    Rejected,
                    &[Admin],
                    EventKey::RequestRejected,
                    false,
                ),
                EdgeRule::new(ApprovedByAdmin, Paid, &[Admin], EventKey::RequestPaid, false),
                EdgeRule::new(
                    ApprovedByAdmin,
                    Rejected,
                    &[Admin],
                    EventKey::RequestRejected,
                    false,
                ),
            ],
        );

        // Expense: born submitted (Pending); same approval chain.
        edges.insert(
            RequestKind::Expense,
            vec![
                EdgeRule::new(
                    Pending,
                    PreApprovedByReviewer,
                    &[Reviewer],
                    EventKey::RequestPreApproved,
                    true,
                ),
                EdgeRule::new(Pending, Rejected, &[Reviewer], EventKey::RequestRejected, true),
                EdgeRule::new(
                    PreApprovedByReviewer,
                    ApprovedByAdmin,
                    &[Admin],
                    EventKey::RequestApproved,
                    false,
                ),
                EdgeRule::new(
                    PreApprovedByReviewer,
                    Rejected,
                    &[Admin],
                    EventKey::RequestRejected,
                    false,
                ),
                EdgeRule::new(ApprovedByAdmin, Paid, &[Admin], EventKey::RequestPaid, false),
                EdgeRule::new(
                    ApprovedByAdmin,
                    Rejected,
                    &[Admin],
                    EventKey::RequestRejected,
                    false,
                ),
            ],
        );

        // Ticket: linear chain worked by reviewers and admins. The
        // reopen edge is the only backward edge in the system. The
        // originating collaborator never moves a ticket.
        edges.insert(
            RequestKind::Ticket,
            vec![
                EdgeRule::new(
                    Open,
                    InProgress,
                    &[Reviewer, Admin],
                    EventKey::TicketStatusChanged,
                    false,
                ),
                EdgeRule::new(
                    InProgress,
                    Closed,
                    &[Reviewer, Admin],
                    EventKey::TicketStatusChanged,
                    false,
                ),
                EdgeRule::new(
                    Closed,
                    Open,
                    &[Reviewer, Admin],
                    EventKey::TicketStatusChanged,
                    false,
                ),
            ],
        );

        let mut editable = HashMap::new();
        editable.insert(RequestKind::Compensation, vec![Draft]);
        editable.insert(RequestKind::Expense, vec![Pending]);
        editable.insert(RequestKind::Ticket, Vec::new());

        Self { edges, editable }
    }

    /// Where a freshly created request of this kind starts.
    pub fn initial_state(&self, kind: RequestKind) -> RequestState {
        match kind {
            RequestKind::Compensation => RequestState::Draft,
            RequestKind::Expense => RequestState::Pending,
            RequestKind::Ticket => RequestState::Open,
        }
    }

    /// Notification raised when a request of this kind is created.
    ///
    /// Compensation drafts are private until submitted.
    pub fn creation_event(&self, kind: RequestKind) -> Option<EventKey> {
        match kind {
            RequestKind::Compensation => None,
            RequestKind::Expense => Some(EventKey::ExpenseSubmitted),
            RequestKind::Ticket => Some(EventKey::TicketOpened),
        }
    }

    /// The rule for a specific edge, if the edge exists.
    pub fn edge(
        &self,
        kind: RequestKind,
        from: RequestState,
        to: RequestState,
    ) -> Option<&EdgeRule> {
        self.edges_for(kind)
            .iter()
            .find(|rule| rule.from == from && rule.to == to)
    }

    /// All rules for a kind.
    pub fn edges_for(&self, kind: RequestKind) -> &[EdgeRule] {
        self.edges.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct successors of a state within a kind's graph.
    pub fn successors(&self, kind: RequestKind, from: RequestState) -> Vec<RequestState> {
        self.edges_for(kind)
            .iter()
            .filter(|rule| rule.from == from)
            .map(|rule| rule.to)
            .collect()
    }

    /// Whether attachments may still be added in this state.
    pub fn is_editable(&self, kind: RequestKind, state: RequestState) -> bool {
        self.editable
            .get(&kind)
            .is_some_and(|states| states.contains(&state))
    }

    /// A state with no outgoing edges. Ticket `Closed` is retained for
    /// audit like the others but stays reopenable, so it is not
    /// terminal by this definition.
    pub fn is_terminal(&self, kind: RequestKind, state: RequestState) -> bool {
        self.successors(kind, state).is_empty()
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::new()
    }
}
