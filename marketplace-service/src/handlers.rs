use anyhow::Result;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use shared::{AppEvent, IdentityEvent, UserDeletedPayload, UserSyncPayload};

use crate::models::{Credential, Listing, NewUser, User, UserSyncChanges};
use crate::schema::{chats, credentials, listings, transactions, users};
use crate::DbPool;

pub struct LifecycleHandler {
    pool: DbPool,
}

impl LifecycleHandler {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn handle(&self, event: IdentityEvent) -> Result<()> {
        match event {
            IdentityEvent::Created(payload) => self.sync_user_created(payload).await,
            IdentityEvent::Updated(payload) => self.sync_user_updated(payload).await,
            IdentityEvent::Deleted(payload) => self.sync_user_deleted(payload).await,
        }
    }

    async fn sync_user_created(&self, payload: UserSyncPayload) -> Result<()> {
        let mut conn = self.pool.get().await?;

        let new_user = NewUser {
            id: payload.id.clone(),
            email: payload.primary_email(),
            name: payload.display_name(),
            image: payload.image_url.clone(),
        };
        let changes = UserSyncChanges {
            email: payload.primary_email(),
            name: payload.display_name(),
            image: payload.image_url.clone(),
            updated_at: Utc::now(),
        };

        diesel::insert_into(users::table)
            .values(&new_user)
            .on_conflict(users::id)
            .do_update()
            .set(&changes)
            .execute(&mut conn)
            .await?;

        info!("Synced user {}", payload.id);
        Ok(())
    }

    // No upsert fallback here: an update for a user that was never
    // synced is a delivery-order problem we want to surface.
    async fn sync_user_updated(&self, payload: UserSyncPayload) -> Result<()> {
        let mut conn = self.pool.get().await?;

        let changes = UserSyncChanges {
            email: payload.primary_email(),
            name: payload.display_name(),
            image: payload.image_url.clone(),
            updated_at: Utc::now(),
        };

        let updated_rows = diesel::update(users::table.filter(users::id.eq(&payload.id)))
            .set(&changes)
            .execute(&mut conn)
            .await?;

        if updated_rows == 0 {
            anyhow::bail!("user {} does not exist", payload.id);
        }

        info!("Updated user {}", payload.id);
        Ok(())
    }

    async fn sync_user_deleted(&self, payload: UserDeletedPayload) -> Result<()> {
        let (mut listings_conn, mut chats_conn, mut transactions_conn) =
            futures::try_join!(self.pool.get(), self.pool.get(), self.pool.get())?;

        let listings_count = listings::table
            .filter(listings::owner_id.eq(&payload.id))
            .count()
            .get_result::<i64>(&mut listings_conn)
            .boxed();
        let chats_count = chats::table
            .filter(
                chats::owner_user_id
                    .eq(&payload.id)
                    .or(chats::chat_user_id.eq(&payload.id)),
            )
            .count()
            .get_result::<i64>(&mut chats_conn)
            .boxed();
        let transactions_count = transactions::table
            .filter(transactions::user_id.eq(&payload.id))
            .count()
            .get_result::<i64>(&mut transactions_conn)
            .boxed();

        let (listings_count, chats_count, transactions_count) =
            futures::try_join!(listings_count, chats_count, transactions_count)?;

        match deletion_outcome(listings_count, chats_count, transactions_count) {
            DeletionOutcome::HardDelete => {
                diesel::delete(users::table.filter(users::id.eq(&payload.id)))
                    .execute(&mut listings_conn)
                    .await?;
                info!("Deleted user {}", payload.id);
            }
            DeletionOutcome::DeactivateListings => {
                let updated_rows =
                    diesel::update(listings::table.filter(listings::owner_id.eq(&payload.id)))
                        .set((
                            listings::status.eq("inactive"),
                            listings::updated_at.eq(Utc::now()),
                        ))
                        .execute(&mut listings_conn)
                        .await?;

                if updated_rows == 0 {
                    warn!(
                        "User {} has chats or transactions but no listings to deactivate",
                        payload.id
                    );
                } else {
                    info!("Deactivated {} listings for user {}", updated_rows, payload.id);
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DeletionOutcome {
    HardDelete,
    DeactivateListings,
}

pub fn deletion_outcome(listings: i64, chats: i64, transactions: i64) -> DeletionOutcome {
    if listings == 0 && chats == 0 && transactions == 0 {
        DeletionOutcome::HardDelete
    } else {
        DeletionOutcome::DeactivateListings
    }
}

pub struct AppEventWorker {
    pool: DbPool,
}

impl AppEventWorker {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn run(self, mut events: mpsc::Receiver<AppEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(event).await {
                error!("Error handling app event: {}", e);
            }
        }
    }

    async fn handle(&self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Purchase {
                transaction_id,
                user_id,
                listing_id,
            } => self.process_purchase(transaction_id, user_id, listing_id).await,
            AppEvent::ListingDeleted { listing_id } => {
                self.handle_listing_deleted(listing_id).await
            }
        }
    }

    async fn process_purchase(
        &self,
        transaction_id: Uuid,
        user_id: String,
        listing_id: Uuid,
    ) -> Result<()> {
        let mut conn = self.pool.get().await?;

        let customer = users::table
            .filter(users::id.eq(&user_id))
            .first::<User>(&mut conn)
            .await
            .optional()?;
        let listing = listings::table
            .filter(listings::id.eq(listing_id))
            .first::<Listing>(&mut conn)
            .await
            .optional()?;
        let credential = credentials::table
            .filter(credentials::listing_id.eq(listing_id))
            .first::<Credential>(&mut conn)
            .await
            .optional()?;

        info!(
            "Purchase {}: customer_email={:?} listing_title={:?} credential_on_file={}",
            transaction_id,
            customer.and_then(|customer| customer.email),
            listing.map(|listing| listing.title),
            credential.is_some()
        );
        Ok(())
    }

    async fn handle_listing_deleted(&self, listing_id: Uuid) -> Result<()> {
        let mut conn = self.pool.get().await?;

        let credential = credentials::table
            .filter(credentials::listing_id.eq(listing_id))
            .first::<Credential>(&mut conn)
            .await
            .optional()?;

        match credential {
            Some(credential) => info!(
                "Listing {} deleted; credential {} retained for follow-up",
                listing_id, credential.id
            ),
            None => info!("Listing {} deleted; no credential on file", listing_id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_with_no_references_is_hard_deleted() {
        assert_eq!(deletion_outcome(0, 0, 0), DeletionOutcome::HardDelete);
    }

    #[test]
    fn any_reference_degrades_to_deactivation() {
        assert_eq!(deletion_outcome(3, 0, 0), DeletionOutcome::DeactivateListings);
        assert_eq!(deletion_outcome(0, 1, 0), DeletionOutcome::DeactivateListings);
        assert_eq!(deletion_outcome(0, 0, 2), DeletionOutcome::DeactivateListings);
        assert_eq!(deletion_outcome(1, 1, 1), DeletionOutcome::DeactivateListings);
    }
}
