use uuid::Uuid;

use crate::model::user_profile::UserProfile;

/// The logged in user acting on a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
}

impl Principal {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }

    pub fn from_user(user: &UserProfile) -> Self {
        Self { id: user.id }
    }

    pub fn is_self(&self, target: &UserProfile) -> bool {
        self.id == target.id
    }

    pub fn manages(&self, target: &UserProfile) -> bool {
        target.is_managed_by(&self.id)
    }

    /// Self or the target's manager may edit every tab.
    pub fn can_edit(&self, target: &UserProfile) -> bool {
        self.is_self(target) || self.manages(target)
    }

    pub fn can_upload_photo(&self, target: &UserProfile) -> bool {
        self.is_self(target)
    }
}
