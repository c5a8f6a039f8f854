use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::families::repo::FamilyMember;

#[derive(Debug, Deserialize)]
pub struct CreateFamilyRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub family_id: Uuid,
    /// Informational tag only; redemption never checks it against the
    /// redeemer's address.
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct InviteCodeData {
    pub code: String,
}

/// Family summary with owner and roster expanded, so clients render it
/// without follow-up requests.
#[derive(Debug, Serialize)]
pub struct FamilyWithMembers {
    pub id: Uuid,
    pub name: String,
    pub owner: PublicUser,
    pub members: Vec<FamilyMember>,
    pub created_at: OffsetDateTime,
}
