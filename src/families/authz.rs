use uuid::Uuid;

use crate::families::repo::Family;

/// The single elevated permission in the system: delete, invite and
/// member removal are all gated on owning the family.
pub fn is_owner(family: &Family, user_id: Uuid) -> bool {
    family.owner_id == user_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn family_owned_by(owner_id: Uuid) -> Family {
        Family {
            id: Uuid::new_v4(),
            name: "Smith Family".into(),
            owner_id,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn owner_is_recognized() {
        let owner = Uuid::new_v4();
        assert!(is_owner(&family_owned_by(owner), owner));
    }

    #[test]
    fn non_owner_is_rejected() {
        assert!(!is_owner(&family_owned_by(Uuid::new_v4()), Uuid::new_v4()));
    }
}
