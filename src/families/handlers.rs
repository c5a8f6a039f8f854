use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::auth::extractors::CurrentUser;
use crate::auth::repo::User;
use crate::auth::validate::is_valid_email;
use crate::error::ApiError;
use crate::families::{
    authz::is_owner,
    dto::{
        AcceptInvitationRequest, CreateFamilyRequest, FamilyWithMembers, InviteCodeData,
        InviteRequest,
    },
    repo::{Family, FamilyInvitation, FamilyMember},
};
use crate::response::{self, ApiResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/families", post(create_family).get(list_families))
        .route("/families/:id", delete(delete_family))
        .route("/families/invite", post(invite))
        .route("/families/accept-invitation", post(accept_invitation))
        .route("/families/:id/members/:user_id", delete(remove_member))
        .route("/families/:id/leave", post(leave_family))
}

#[instrument(skip(state, current, payload))]
pub async fn create_family(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<CreateFamilyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Family>>), ApiError> {
    let name = payload.name.trim();
    if name.len() < 3 || name.len() > 255 {
        return Err(ApiError::validation(
            "name",
            "The name must be between 3 and 255 characters.",
        ));
    }

    let family = Family::create(&state.db, name, current.user.id).await?;
    info!(family_id = %family.id, owner_id = %current.user.id, "family created");
    Ok((
        StatusCode::CREATED,
        response::ok("Family created successfully.", family),
    ))
}

#[instrument(skip(state, current))]
pub async fn list_families(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<Vec<FamilyWithMembers>>>, ApiError> {
    let families = Family::list_for_user(&state.db, current.user.id).await?;

    // Two batch fetches cover every family in the listing; nothing here
    // issues per-family queries.
    let family_ids: Vec<Uuid> = families.iter().map(|f| f.id).collect();
    let owner_ids: Vec<Uuid> = families.iter().map(|f| f.owner_id).collect();
    let members = Family::members_for(&state.db, &family_ids).await?;
    let owners: HashMap<Uuid, User> = User::find_many(&state.db, &owner_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut rosters: HashMap<Uuid, Vec<FamilyMember>> = HashMap::new();
    for member in members {
        rosters.entry(member.family_id).or_default().push(member);
    }

    let mut data = Vec::with_capacity(families.len());
    for family in families {
        let owner = owners
            .get(&family.owner_id)
            .ok_or_else(|| anyhow::anyhow!("family {} has no owner record", family.id))?;
        data.push(FamilyWithMembers {
            id: family.id,
            name: family.name,
            owner: PublicUser::from(owner),
            members: rosters.remove(&family.id).unwrap_or_default(),
            created_at: family.created_at,
        });
    }

    Ok(response::ok("Families retrieved successfully.", data))
}

#[instrument(skip(state, current))]
pub async fn delete_family(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(family_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let family = Family::find(&state.db, family_id)
        .await?
        .ok_or(ApiError::NotFound("Family"))?;

    if !is_owner(&family, current.user.id) {
        warn!(family_id = %family.id, user_id = %current.user.id, "delete denied");
        return Err(ApiError::Authorization(
            "You are not authorized to delete this family.".into(),
        ));
    }

    Family::delete(&state.db, family.id).await?;
    info!(family_id = %family.id, "family deleted");
    Ok(response::message_only("Family deleted successfully."))
}

#[instrument(skip(state, current, payload))]
pub async fn invite(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<InviteRequest>,
) -> Result<Json<ApiResponse<InviteCodeData>>, ApiError> {
    let family = Family::find(&state.db, payload.family_id)
        .await?
        .ok_or(ApiError::NotFound("Family"))?;

    if !is_owner(&family, current.user.id) {
        warn!(family_id = %family.id, user_id = %current.user.id, "invite denied");
        return Err(ApiError::Authorization(
            "You are not authorized to invite members to this family.".into(),
        ));
    }

    if let Some(email) = payload.email.as_deref() {
        if !is_valid_email(email) {
            return Err(ApiError::validation(
                "email",
                "The email must be a valid email address.",
            ));
        }
    }

    let invitation = FamilyInvitation::create(
        &state.db,
        family.id,
        payload.email.as_deref(),
        state.config.invitation_ttl_days,
    )
    .await?;

    info!(family_id = %family.id, code = %invitation.code, "invitation created");
    Ok(response::ok(
        "Invitation created.",
        InviteCodeData {
            code: invitation.code,
        },
    ))
}

#[instrument(skip(state, current, payload))]
pub async fn accept_invitation(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<AcceptInvitationRequest>,
) -> Result<Json<ApiResponse<Family>>, ApiError> {
    let family = FamilyInvitation::redeem(&state.db, &payload.code, current.user.id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %current.user.id, "invitation code invalid, used or expired");
            ApiError::NotFound("Invitation")
        })?;

    info!(family_id = %family.id, user_id = %current.user.id, "invitation redeemed");
    Ok(response::ok("Joined family successfully.", family))
}

#[instrument(skip(state, current))]
pub async fn remove_member(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((family_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let family = Family::find(&state.db, family_id)
        .await?
        .ok_or(ApiError::NotFound("Family"))?;

    if !is_owner(&family, current.user.id) {
        warn!(family_id = %family.id, user_id = %current.user.id, "remove member denied");
        return Err(ApiError::Authorization(
            "You are not authorized to remove members from this family.".into(),
        ));
    }

    if family.owner_id == user_id {
        return Err(ApiError::domain(
            "user",
            "Cannot remove the owner from the family.",
        ));
    }

    if !Family::is_member(&state.db, family.id, user_id).await? {
        return Err(ApiError::domain(
            "user",
            "User is not a member of this family.",
        ));
    }

    let removed = Family::remove_member(&state.db, family.id, user_id).await?;
    info!(family_id = %family.id, target = %user_id, removed, "member removed");
    Ok(response::message_only("Member removed successfully."))
}

#[instrument(skip(state, current))]
pub async fn leave_family(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(family_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let family = Family::find(&state.db, family_id)
        .await?
        .ok_or(ApiError::NotFound("Family"))?;

    if family.owner_id == current.user.id {
        return Err(ApiError::domain(
            "family",
            "The owner of the family cannot leave the family. \
             Please transfer ownership or delete the family.",
        ));
    }

    if !Family::is_member(&state.db, family.id, current.user.id).await? {
        return Err(ApiError::domain(
            "family",
            "You are not a member of this family.",
        ));
    }

    Family::remove_member(&state.db, family.id, current.user.id).await?;
    info!(family_id = %family.id, user_id = %current.user.id, "member left");
    Ok(response::message_only("You have left the family successfully."))
}
