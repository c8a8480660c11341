//! Account-name validation for `@mention` linkification.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Localization;

static SEGMENT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]").expect("SEGMENT_START: hardcoded regex is valid"));

static SEGMENT_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]*$").expect("SEGMENT_CHARS: hardcoded regex is valid"));

static SEGMENT_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]$").expect("SEGMENT_END: hardcoded regex is valid"));

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 16;

/// Names that imitate exchanges and well-known accounts.
const DEFAULT_BAD_ACTORS: &[&str] = &[
    "aalpha", "abit", "ahiive", "binanse", "binnance", "bitrex", "bittex", "bittrexx",
    "bittrx", "blocktades", "blocktradd", "blocktrade", "deepcrypto", "deepcrypt8",
    "hiveblog", "hive-wallet", "hivewallet", "hiivesigner", "hivesigner-com", "honey-swap",
    "huobii", "ionomy-com", "kucoinn", "orinoco", "peakdd", "poloiniex", "polonex",
    "poloniexx", "probitt", "steemit-com", "upbitt", "user-balance",
];

/// Account names that are never linked, checked by exact membership.
///
/// The default table ships a fixed list; tests and deployments can swap in
/// their own with [`BadActorList::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BadActorList {
    names: HashSet<String>,
}

impl BadActorList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

impl Default for BadActorList {
    fn default() -> Self {
        Self::new(DEFAULT_BAD_ACTORS.iter().copied())
    }
}

/// Why an account name was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AccountNameError {
    #[error("{0}not be empty.")]
    Empty(String),
    #[error("{0}be longer.")]
    TooShort(String),
    #[error("{0}be shorter.")]
    TooLong(String),
    #[error("{0}")]
    BadActor(String),
    #[error("{0}start with a lowercase letter.")]
    SegmentStart(String),
    #[error("{0}have only lowercase letters, digits, or dashes.")]
    SegmentChars(String),
    #[error("{0}end with a lowercase letter or digit.")]
    SegmentEnd(String),
}

/// Validates blockchain account names: 3 to 16 characters, dot-separated
/// segments of `[a-z][a-z0-9-]*[a-z0-9]` with at least 3 characters each,
/// and not on the bad-actor list.
#[derive(Clone, Debug)]
pub struct AccountNameValidator<'a> {
    bad_actors: &'a BadActorList,
    localization: &'a Localization,
}

impl<'a> AccountNameValidator<'a> {
    pub fn new(bad_actors: &'a BadActorList, localization: &'a Localization) -> Self {
        Self {
            bad_actors,
            localization,
        }
    }

    /// Validate an already-lowercased account name.
    pub fn validate(&self, name: &str) -> Result<(), AccountNameError> {
        let should = || self.localization.account_name_should.clone();

        if name.is_empty() {
            return Err(AccountNameError::Empty(should()));
        }
        let length = name.chars().count();
        if length < MIN_LENGTH {
            return Err(AccountNameError::TooShort(should()));
        }
        if length > MAX_LENGTH {
            return Err(AccountNameError::TooLong(should()));
        }
        if self.bad_actors.contains(name) {
            return Err(AccountNameError::BadActor(
                self.localization.account_name_bad_actor.clone(),
            ));
        }

        for segment in name.split('.') {
            if !SEGMENT_START.is_match(segment) {
                return Err(AccountNameError::SegmentStart(should()));
            }
            if !SEGMENT_CHARS.is_match(segment) {
                return Err(AccountNameError::SegmentChars(should()));
            }
            if !SEGMENT_END.is_match(segment) {
                return Err(AccountNameError::SegmentEnd(should()));
            }
            if segment.len() < MIN_LENGTH {
                return Err(AccountNameError::TooShort(should()));
            }
        }
        Ok(())
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.validate(name).is_ok()
    }
}
