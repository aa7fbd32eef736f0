//! Marker operations: authorization, validation and moderation in one place.
//!
//! Every operation takes the caller's identity explicitly (`None` for an
//! anonymous request) and consults `access::authorize` before touching the
//! store. Handlers stay thin wrappers around these calls.

use crate::{
    access::{self, Operation},
    auth::AuthUser,
    error::AppError,
    models::{CreateMarkerRequest, Marker, MarkerId, NewMarker, UserId},
    moderation::{Effect, ModerationState, Transition},
    nearby,
    repository::Repository,
};

pub struct MarkerService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> MarkerService<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// create_marker
    ///
    /// Any authenticated user may report a condition. The report starts
    /// pending and stays invisible to the public until an admin approves it.
    pub async fn create_marker(
        &self,
        caller: Option<&AuthUser>,
        request: CreateMarkerRequest,
    ) -> Result<Marker, AppError> {
        access::authorize(caller, Operation::CreateMarker)?;
        let owner = access::require_identity(caller)?;

        let new_marker = NewMarker::try_from(request)?;
        let marker = self.repo.create_marker(owner.id, new_marker).await?;

        tracing::info!(
            marker_id = marker.id,
            owner_id = owner.id,
            category = %marker.category,
            "marker submitted for moderation"
        );
        Ok(marker)
    }

    /// delete_marker
    ///
    /// Owner withdrawal, or admin removal, from any state. The delete itself
    /// is a single store operation: if another delete or a reject removes the
    /// marker between the lookup and this call, the caller gets `NotFound`.
    /// A concurrent approval is harmless: withdrawal is valid from both states.
    pub async fn delete_marker(
        &self,
        caller: Option<&AuthUser>,
        id: MarkerId,
    ) -> Result<(), AppError> {
        let caller = access::require_identity(caller)?;
        let marker = self.repo.get_marker(id).await?;

        access::authorize(
            Some(caller),
            Operation::DeleteMarker {
                owner_id: marker.user_id,
            },
        )?;

        ModerationState::of(&marker).apply(Transition::Withdraw)?;
        self.repo
            .delete_marker(id, caller.id, caller.is_admin)
            .await?;

        tracing::info!(
            marker_id = id,
            by = caller.id,
            admin = caller.is_admin,
            "marker deleted"
        );
        Ok(())
    }

    /// approve_marker
    ///
    /// Idempotent: approving an already approved marker returns it unchanged.
    pub async fn approve_marker(
        &self,
        caller: Option<&AuthUser>,
        id: MarkerId,
    ) -> Result<Marker, AppError> {
        access::authorize(caller, Operation::ApproveMarker)?;

        let marker = self.repo.get_marker(id).await?;
        match ModerationState::of(&marker).apply(Transition::Approve)? {
            Effect::MarkApproved => {
                let approved = self.repo.set_approved(id, true).await?;
                tracing::info!(marker_id = id, "marker approved");
                Ok(approved)
            }
            _ => Ok(marker),
        }
    }

    /// reject_marker
    ///
    /// Removes a pending marker. Rejecting a marker that is already public is a
    /// `Conflict`; an admin who wants it gone uses `delete_marker`.
    pub async fn reject_marker(
        &self,
        caller: Option<&AuthUser>,
        id: MarkerId,
    ) -> Result<(), AppError> {
        access::authorize(caller, Operation::RejectMarker)?;

        let marker = self.repo.get_marker(id).await?;
        if ModerationState::of(&marker).apply(Transition::Reject)? == Effect::Remove {
            // Matches only while still pending; a concurrent approval wins.
            self.repo.remove_pending(id).await?;
            tracing::info!(marker_id = id, "marker rejected");
        }
        Ok(())
    }

    pub async fn list_public_markers(&self) -> Result<Vec<Marker>, AppError> {
        access::authorize(None, Operation::ListApproved)?;
        Ok(self.repo.list_approved().await?)
    }

    /// Oldest submission first, so the review queue is worked in order.
    pub async fn list_pending_markers(
        &self,
        caller: Option<&AuthUser>,
    ) -> Result<Vec<Marker>, AppError> {
        access::authorize(caller, Operation::ListPending)?;
        Ok(self.repo.list_pending().await?)
    }

    /// A user's own reports in every state, newest first.
    pub async fn list_markers_by_owner(
        &self,
        caller: Option<&AuthUser>,
        owner_id: UserId,
    ) -> Result<Vec<Marker>, AppError> {
        access::authorize(caller, Operation::ListByOwner { owner_id })?;
        Ok(self.repo.list_by_owner(owner_id).await?)
    }

    pub async fn query_near(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Result<Vec<Marker>, AppError> {
        access::authorize(None, Operation::QueryNear)?;
        nearby::find_near(self.repo, lat, lng, radius_km).await
    }
}
