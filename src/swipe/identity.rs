use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Who is looking at the screen. Read fresh at the start of every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Option<String>,
    pub couple_id: Option<String>,
    pub partner_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub has_couple: bool,
    pub has_partner: bool,
}

impl Identity {
    pub fn has_partner(&self) -> bool {
        self.partner_id.is_some()
    }

    pub fn has_couple(&self) -> bool {
        self.couple_id.is_some()
    }

    /// Couple fully formed: both a couple row and a partner.
    pub fn is_paired(&self) -> bool {
        self.has_couple() && self.has_partner()
    }

    pub fn pairing(&self) -> Pairing {
        Pairing {
            has_couple: self.has_couple(),
            has_partner: self.has_partner(),
        }
    }
}

/// Narrow read-only view of the auth state.
pub trait IdentitySource: Send + Sync {
    fn identity(&self) -> Identity;
}

impl IdentitySource for Identity {
    fn identity(&self) -> Identity {
        self.clone()
    }
}

/// Identity the host app can update in place, e.g. after pairing completes.
#[derive(Debug, Default)]
pub struct SharedIdentity {
    inner: RwLock<Identity>,
}

impl SharedIdentity {
    pub fn new(identity: Identity) -> Self {
        Self { inner: RwLock::new(identity) }
    }

    pub fn set(&self, identity: Identity) {
        *self.inner.write() = identity;
    }
}

impl IdentitySource for SharedIdentity {
    fn identity(&self) -> Identity {
        self.inner.read().clone()
    }
}
