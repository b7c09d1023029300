//! Trust gate: decides whether a gist may run without asking.

use crate::config::{Settings, TrustMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustReason {
    /// `--yes` or `--trust-always` on the command line.
    Override,
    TrustAll,
    TrustedGist,
    TrustedOwner,
    CurrentUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustVerdict {
    Trusted(TrustReason),
    /// Mode `mine` with a known owner; needs the authenticated login.
    NeedsCurrentUser,
    Untrusted,
}

/// Pure decision over stored settings. Checks run in a fixed order.
pub fn evaluate(settings: &Settings, owner: &str, gist_id: &str, force_yes: bool) -> TrustVerdict {
    if force_yes {
        return TrustVerdict::Trusted(TrustReason::Override);
    }
    if settings.mode == TrustMode::All {
        return TrustVerdict::Trusted(TrustReason::TrustAll);
    }
    if settings.trusted_gists.contains(gist_id) {
        return TrustVerdict::Trusted(TrustReason::TrustedGist);
    }
    let owner = owner.trim();
    if !owner.is_empty() && settings.trusted_owners.contains(&owner.to_lowercase()) {
        return TrustVerdict::Trusted(TrustReason::TrustedOwner);
    }
    if settings.mode == TrustMode::Mine && !owner.is_empty() {
        return TrustVerdict::NeedsCurrentUser;
    }
    TrustVerdict::Untrusted
}

impl TrustVerdict {
    /// Final answer once the authenticated login (if any) is known.
    pub fn allows(self, owner: &str, current_login: Option<&str>) -> bool {
        match self {
            Self::Trusted(_) => true,
            Self::NeedsCurrentUser => {
                current_login.is_some_and(|login| login.trim().eq_ignore_ascii_case(owner.trim()))
            }
            Self::Untrusted => false,
        }
    }
}
