use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

/// Friend ids of a user, derived from accepted requests in either direction.
///
/// Friendship is never stored as its own edge; it is recomputed from the
/// friend_requests rows on every call so there is no cache to go stale.
pub async fn friend_ids_of(pool: &PgPool, user_id: Uuid) -> Result<HashSet<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        r#"
        SELECT sender_id, receiver_id FROM friend_requests
        WHERE status = 'accepted' AND (sender_id = $1 OR receiver_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(collect_friend_ids(user_id, &rows))
}

/// True iff an accepted request exists between the two users, in either
/// direction. Symmetric even though the stored row is directional.
pub async fn are_friends(pool: &PgPool, user_a: Uuid, user_b: Uuid) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT 1 FROM friend_requests
        WHERE status = 'accepted'
          AND ((sender_id = $1 AND receiver_id = $2)
            OR (sender_id = $2 AND receiver_id = $1))
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Folds accepted (sender, receiver) rows into the set of counterparties of
/// `user_id`.
fn collect_friend_ids(user_id: Uuid, rows: &[(Uuid, Uuid)]) -> HashSet<Uuid> {
    rows.iter()
        .map(|&(sender_id, receiver_id)| {
            if sender_id == user_id {
                receiver_id
            } else {
                sender_id
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_both_directions() {
        let me = Uuid::new_v4();
        let sent_to = Uuid::new_v4();
        let received_from = Uuid::new_v4();

        let rows = vec![(me, sent_to), (received_from, me)];
        let friends = collect_friend_ids(me, &rows);

        assert_eq!(friends.len(), 2);
        assert!(friends.contains(&sent_to));
        assert!(friends.contains(&received_from));
    }

    #[test]
    fn symmetric_for_either_participant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![(a, b)];

        assert!(collect_friend_ids(a, &rows).contains(&b));
        assert!(collect_friend_ids(b, &rows).contains(&a));
    }

    #[test]
    fn empty_rows_yield_empty_set() {
        assert!(collect_friend_ids(Uuid::new_v4(), &[]).is_empty());
    }
}
