//! Event selection within a period
//!
//! Selection runs per variable, per patient:
//!
//! ```text
//! Unresolved --offer--> CandidateSelected --offer--> CandidateSelected
//!     |                        |
//!   finish                   finish
//!     v                        v
//! ResolvedEmpty            Resolved
//! ```
//!
//! Each qualifying event is offered once, in input order. Under
//! [`Selection::FirstMatch`] a later offer replaces the candidate only if
//! strictly earlier; under [`Selection::LastMatch`] an offer on the same or a
//! later date replaces it. Ties therefore go to the first listed event for
//! *first* and to the last listed for *last*.

use crate::variable::Selection;
use chrono::NaiveDate;

/// Selection in progress
#[derive(Debug)]
pub enum SelectionState<'a, E> {
    /// Nothing offered yet
    Unresolved,
    /// At least one qualifying event seen
    CandidateSelected {
        event: &'a E,
        date: NaiveDate,
        matches: usize,
    },
}

/// Final outcome of a selection
#[derive(Debug, PartialEq)]
pub enum Resolution<'a, E> {
    /// The selected event and how many events qualified
    Resolved {
        event: &'a E,
        date: NaiveDate,
        matches: usize,
    },
    /// No event qualified
    ResolvedEmpty,
}

impl<'a, E> Resolution<'a, E> {
    pub fn matches(&self) -> usize {
        match self {
            Self::Resolved { matches, .. } => *matches,
            Self::ResolvedEmpty => 0,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Resolved { date, .. } => Some(*date),
            Self::ResolvedEmpty => None,
        }
    }

    pub fn event(&self) -> Option<&'a E> {
        match self {
            Self::Resolved { event, .. } => Some(*event),
            Self::ResolvedEmpty => None,
        }
    }
}

impl<'a, E> SelectionState<'a, E> {
    /// Offer a qualifying event
    pub fn offer(self, policy: Selection, event: &'a E, date: NaiveDate) -> Self {
        match self {
            Self::Unresolved => Self::CandidateSelected {
                event,
                date,
                matches: 1,
            },
            Self::CandidateSelected {
                event: current,
                date: current_date,
                matches,
            } => {
                let replace = match policy {
                    Selection::LastMatch => date >= current_date,
                    Selection::FirstMatch | Selection::Unspecified => date < current_date,
                };
                if replace {
                    Self::CandidateSelected {
                        event,
                        date,
                        matches: matches + 1,
                    }
                } else {
                    Self::CandidateSelected {
                        event: current,
                        date: current_date,
                        matches: matches + 1,
                    }
                }
            }
        }
    }

    pub fn finish(self) -> Resolution<'a, E> {
        match self {
            Self::Unresolved => Resolution::ResolvedEmpty,
            Self::CandidateSelected {
                event,
                date,
                matches,
            } => Resolution::Resolved {
                event,
                date,
                matches,
            },
        }
    }
}

/// Offer every `(event, date)` pair and resolve
pub fn select<'a, E>(
    policy: Selection,
    candidates: impl IntoIterator<Item = (&'a E, NaiveDate)>,
) -> Resolution<'a, E> {
    candidates
        .into_iter()
        .fold(SelectionState::Unresolved, |state, (event, date)| {
            state.offer(policy, event, date)
        })
        .finish()
}
