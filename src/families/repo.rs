use anyhow::bail;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::families::code::generate_invite_code;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "family_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FamilyRole {
    Owner,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// One roster row joined with the member's user record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FamilyMember {
    #[serde(skip_serializing)]
    pub family_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: FamilyRole,
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct FamilyInvitation {
    pub id: Uuid,
    pub family_id: Uuid,
    pub code: String,
    pub email: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub used_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl FamilyInvitation {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }

    /// Redeemable = never used and not past its expiry. Both terminal
    /// states are indistinguishable from a missing code to callers.
    pub fn is_valid(&self, now: OffsetDateTime) -> bool {
        !self.is_used() && !self.is_expired(now)
    }
}

impl Family {
    /// Creates the family and seats the owner on the roster in one
    /// transaction, so no reader ever sees a family without its owner.
    pub async fn create(db: &PgPool, name: &str, owner_id: Uuid) -> anyhow::Result<Family> {
        let mut tx = db.begin().await?;
        let family = sqlx::query_as::<_, Family>(
            r#"
            INSERT INTO families (name, owner_id)
            VALUES ($1, $2)
            RETURNING id, name, owner_id, created_at
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            INSERT INTO family_members (family_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, now())
            "#,
        )
        .bind(family.id)
        .bind(owner_id)
        .bind(FamilyRole::Owner)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(family)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Family>> {
        let family = sqlx::query_as::<_, Family>(
            r#"
            SELECT id, name, owner_id, created_at
            FROM families
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(family)
    }

    /// Roster rows and invitations go with it via `ON DELETE CASCADE`.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM families WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Every family the user sits on the roster of, owner or member.
    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Family>> {
        let families = sqlx::query_as::<_, Family>(
            r#"
            SELECT f.id, f.name, f.owner_id, f.created_at
            FROM families f
            JOIN family_members m ON m.family_id = f.id
            WHERE m.user_id = $1
            ORDER BY f.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(families)
    }

    /// Batch-fetches the rosters for a set of families in one query,
    /// so composing a family listing never loops back to the database.
    pub async fn members_for(
        db: &PgPool,
        family_ids: &[Uuid],
    ) -> anyhow::Result<Vec<FamilyMember>> {
        let members = sqlx::query_as::<_, FamilyMember>(
            r#"
            SELECT m.family_id, u.id, u.name, u.email, m.role, m.joined_at
            FROM family_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.family_id = ANY($1)
            ORDER BY m.joined_at
            "#,
        )
        .bind(family_ids)
        .fetch_all(db)
        .await?;
        Ok(members)
    }

    pub async fn is_member(db: &PgPool, family_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM family_members
                WHERE family_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    /// Detaches one user from the roster. Returns the rows removed,
    /// which the composite primary key caps at 1.
    pub async fn remove_member(
        db: &PgPool,
        family_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM family_members
            WHERE family_id = $1 AND user_id = $2
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(res.rows_affected())
    }
}

impl FamilyInvitation {
    /// Persists a new single-use code. On a code collision the unique
    /// constraint rejects the insert and we regenerate; the 32-bit code
    /// space makes more than a couple of attempts vanishingly unlikely.
    pub async fn create(
        db: &PgPool,
        family_id: Uuid,
        email: Option<&str>,
        ttl_days: i64,
    ) -> anyhow::Result<FamilyInvitation> {
        let expires_at = OffsetDateTime::now_utc() + Duration::days(ttl_days);
        for _ in 0..5 {
            let code = generate_invite_code();
            let inserted = sqlx::query_as::<_, FamilyInvitation>(
                r#"
                INSERT INTO family_invitations (family_id, code, email, expires_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, family_id, code, email, expires_at, used_at, created_at
                "#,
            )
            .bind(family_id)
            .bind(&code)
            .bind(email)
            .bind(expires_at)
            .fetch_one(db)
            .await;
            match inserted {
                Ok(invitation) => return Ok(invitation),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    tracing::warn!(code = %code, "invitation code collision, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        bail!("could not generate a unique invitation code")
    }

    /// Consumes a valid code and seats the redeemer on the roster, in
    /// one transaction. `FOR UPDATE` serializes concurrent redemptions
    /// of the same code; the loser of the race re-runs the validity
    /// check and sees the code as gone. The roster insert is an upsert,
    /// so redeeming into a family the user already belongs to does not
    /// duplicate their row.
    pub async fn redeem(
        db: &PgPool,
        code: &str,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Family>> {
        let mut tx = db.begin().await?;
        let invitation = sqlx::query_as::<_, FamilyInvitation>(
            r#"
            SELECT id, family_id, code, email, expires_at, used_at, created_at
            FROM family_invitations
            WHERE code = $1
            FOR UPDATE
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        // Used and expired codes fall out here the same way a missing
        // code does; the caller cannot tell them apart.
        let Some(invitation) = invitation else {
            return Ok(None);
        };
        if !invitation.is_valid(OffsetDateTime::now_utc()) {
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO family_members (family_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (family_id, user_id) DO NOTHING
            "#,
        )
        .bind(invitation.family_id)
        .bind(user_id)
        .bind(FamilyRole::Member)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE family_invitations SET used_at = now() WHERE id = $1")
            .bind(invitation.id)
            .execute(&mut *tx)
            .await?;

        let family = sqlx::query_as::<_, Family>(
            r#"
            SELECT id, name, owner_id, created_at
            FROM families
            WHERE id = $1
            "#,
        )
        .bind(invitation.family_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(family))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(
        expires_at: Option<OffsetDateTime>,
        used_at: Option<OffsetDateTime>,
    ) -> FamilyInvitation {
        FamilyInvitation {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            code: "A1B2C3D4".into(),
            email: None,
            expires_at,
            used_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn pending_invitation_is_valid() {
        let now = OffsetDateTime::now_utc();
        let inv = invitation(Some(now + Duration::days(3)), None);
        assert!(inv.is_valid(now));
    }

    #[test]
    fn invitation_without_expiry_never_expires() {
        let now = OffsetDateTime::now_utc();
        let inv = invitation(None, None);
        assert!(inv.is_valid(now + Duration::days(365)));
    }

    #[test]
    fn used_invitation_is_terminal() {
        let now = OffsetDateTime::now_utc();
        let inv = invitation(Some(now + Duration::days(3)), Some(now));
        assert!(!inv.is_valid(now));
    }

    #[test]
    fn expired_invitation_is_never_redeemable() {
        let now = OffsetDateTime::now_utc();
        let inv = invitation(Some(now - Duration::seconds(1)), None);
        assert!(!inv.is_valid(now));
        assert!(inv.is_expired(now));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = OffsetDateTime::now_utc();
        let inv = invitation(Some(now), None);
        assert!(!inv.is_valid(now));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FamilyRole::Owner).unwrap(), "\"owner\"");
        assert_eq!(serde_json::to_string(&FamilyRole::Member).unwrap(), "\"member\"");
    }
}
