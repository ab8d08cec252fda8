use serde::Serialize;
use uuid::Uuid;

use crate::store::{RosterTx, StoreResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PermissionContext {
    #[serde(rename = "hasPermission")]
    pub has_permission: bool,
    #[serde(rename = "isGlobalAdmin")]
    pub is_global_admin: bool,
    #[serde(rename = "isMatchAdmin")]
    pub is_match_admin: bool,
}

/// Resolves whether `user_id` may run privileged operations on `match_id`.
///
/// Read from the store on every call, inside the caller's transaction. Token
/// claims are never consulted.
pub async fn check_permission(
    tx: &mut dyn RosterTx,
    user_id: Uuid,
    match_id: Uuid,
) -> StoreResult<PermissionContext> {
    let is_global_admin = tx
        .find_user(user_id)
        .await?
        .map(|u| u.is_admin)
        .unwrap_or(false);

    if is_global_admin {
        return Ok(PermissionContext {
            has_permission: true,
            is_global_admin: true,
            is_match_admin: false,
        });
    }

    let is_match_admin = tx
        .find_player(match_id, user_id)
        .await?
        .map(|p| p.has_match_admin)
        .unwrap_or(false);

    Ok(PermissionContext {
        has_permission: is_match_admin,
        is_global_admin: false,
        is_match_admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RegularPlayer, UserAccount};
    use crate::store::{MemoryRosterStore, RosterStore};

    async fn store_with(user: UserAccount) -> MemoryRosterStore {
        let store = MemoryRosterStore::new();
        store.seed_user(user).await;
        store
    }

    fn account(is_admin: bool) -> UserAccount {
        UserAccount {
            id: Uuid::new_v4(),
            display_name: "Pau".into(),
            balance_cents: 0,
            is_admin,
        }
    }

    #[tokio::test]
    async fn global_admin_short_circuits() {
        let user = account(true);
        let store = store_with(user.clone()).await;
        let mut tx = store.begin().await.unwrap();
        let ctx = check_permission(tx.as_mut(), user.id, Uuid::new_v4())
            .await
            .unwrap();
        assert!(ctx.has_permission && ctx.is_global_admin && !ctx.is_match_admin);
    }

    #[tokio::test]
    async fn match_admin_flag_grants_permission() {
        let user = account(false);
        let store = store_with(user.clone()).await;
        let match_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        let mut player = RegularPlayer::new(match_id, user.id, 1);
        player.has_match_admin = true;
        tx.insert_player(player).await.unwrap();

        let ctx = check_permission(tx.as_mut(), user.id, match_id).await.unwrap();
        assert!(ctx.has_permission && ctx.is_match_admin && !ctx.is_global_admin);

        let elsewhere = check_permission(tx.as_mut(), user.id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(elsewhere, PermissionContext::default());
    }

    #[tokio::test]
    async fn unknown_user_has_no_permission() {
        let store = MemoryRosterStore::new();
        let mut tx = store.begin().await.unwrap();
        let ctx = check_permission(tx.as_mut(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        assert!(!ctx.has_permission);
    }
}
