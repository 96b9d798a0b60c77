/// One of the two directories taking part in a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Copy the file from `from` to the other side.
    CopyFile { from: Side },
    DeleteFile { from: Side },
    /// Delete the stale copy on the other side, then copy from `from`.
    ReplaceFile { from: Side },
    /// Keep both versions under timestamped names on both sides.
    ResolveConflict,
    CreateDir { on: Side },
    RemoveTree { from: Side },
}

/// What is known about one relative path going into the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub is_file: bool,
    pub in_first: bool,
    pub in_second: bool,
    pub updated_first: bool,
    pub updated_second: bool,
}

impl Attributes {
    fn bits(&self) -> [bool; 5] {
        [
            self.is_file,
            self.in_first,
            self.in_second,
            self.updated_first,
            self.updated_second,
        ]
    }

    pub fn is_conflict(&self) -> bool {
        self.bits().iter().all(|bit| *bit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bit {
    Set,
    Clear,
    Any,
}

impl Bit {
    const fn matches(self, value: bool) -> bool {
        match self {
            Bit::Set => value,
            Bit::Clear => !value,
            Bit::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// `[is_file, in_first, in_second, updated_first, updated_second]`
    pub pattern: [Bit; 5],
    pub action: Action,
}

impl Rule {
    pub fn matches(&self, attributes: Attributes) -> bool {
        self.pattern
            .iter()
            .zip(attributes.bits())
            .all(|(bit, value)| bit.matches(value))
    }
}

use Bit::{Any, Clear, Set};

/// Evaluated top to bottom, first match wins. A path matching no row needs
/// no work.
pub const DECISION_TABLE: [Rule; 11] = [
    Rule {
        pattern: [Set, Set, Clear, Set, Any],
        action: Action::CopyFile { from: Side::First },
    },
    Rule {
        pattern: [Set, Set, Clear, Clear, Any],
        action: Action::DeleteFile { from: Side::First },
    },
    Rule {
        pattern: [Set, Clear, Set, Any, Set],
        action: Action::CopyFile { from: Side::Second },
    },
    Rule {
        pattern: [Set, Clear, Set, Any, Clear],
        action: Action::DeleteFile { from: Side::Second },
    },
    Rule {
        pattern: [Set, Set, Set, Set, Clear],
        action: Action::ReplaceFile { from: Side::First },
    },
    Rule {
        pattern: [Set, Set, Set, Clear, Set],
        action: Action::ReplaceFile { from: Side::Second },
    },
    Rule {
        pattern: [Set, Set, Set, Set, Set],
        action: Action::ResolveConflict,
    },
    Rule {
        pattern: [Clear, Set, Clear, Set, Any],
        action: Action::CreateDir { on: Side::Second },
    },
    Rule {
        pattern: [Clear, Clear, Set, Any, Set],
        action: Action::CreateDir { on: Side::First },
    },
    Rule {
        pattern: [Clear, Set, Clear, Clear, Any],
        action: Action::RemoveTree { from: Side::First },
    },
    Rule {
        pattern: [Clear, Clear, Set, Any, Clear],
        action: Action::RemoveTree { from: Side::Second },
    },
];

pub fn decide(attributes: Attributes) -> Option<Action> {
    DECISION_TABLE
        .iter()
        .find(|rule| rule.matches(attributes))
        .map(|rule| rule.action)
}
