//! Social graph: directed `follow` edges, `user_id` follows `follows_id`.
//!
//! Both writes are single conditional statements backed by the
//! `UNIQUE (user_id, follows_id)` constraint, so two identical concurrent
//! requests cannot produce a duplicate edge or a lost delete.

use serde::Serialize;

use super::users::UserRecord;
use super::Db;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

/// Add `follower -> followed`. Returns true when a new edge was written.
pub async fn follow(db: &Db, follower: i64, followed: i64) -> sqlx::Result<bool> {
    let done = sqlx::query("INSERT OR IGNORE INTO follow (user_id, follows_id) VALUES (?, ?)")
        .bind(follower)
        .bind(followed)
        .execute(db.pool())
        .await?;
    Ok(done.rows_affected() == 1)
}

/// Remove `follower -> followed`. Returns true when an edge existed.
pub async fn unfollow(db: &Db, follower: i64, followed: i64) -> sqlx::Result<bool> {
    let done = sqlx::query("DELETE FROM follow WHERE user_id = ? AND follows_id = ?")
        .bind(follower)
        .bind(followed)
        .execute(db.pool())
        .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn is_following(db: &Db, follower: i64, followed: i64) -> sqlx::Result<bool> {
    let hit: Option<i64> = sqlx::query_scalar("SELECT 1 FROM follow WHERE user_id = ? AND follows_id = ?")
        .bind(follower)
        .bind(followed)
        .fetch_optional(db.pool())
        .await?;
    Ok(hit.is_some())
}

/// Users that `user_id` follows.
pub async fn following(db: &Db, user_id: i64) -> sqlx::Result<Vec<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(
        "SELECT u.id, u.username, u.password, u.useremail, u.nickname, u.website, u.About AS about, \
                u.pfp, u.user_type, u.last_login \
         FROM follow f JOIN user u ON f.follows_id = u.id \
         WHERE f.user_id = ? ORDER BY u.username",
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await
}

/// Users following `user_id`.
pub async fn followers(db: &Db, user_id: i64) -> sqlx::Result<Vec<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(
        "SELECT u.id, u.username, u.password, u.useremail, u.nickname, u.website, u.About AS about, \
                u.pfp, u.user_type, u.last_login \
         FROM follow f JOIN user u ON f.user_id = u.id \
         WHERE f.follows_id = ? ORDER BY u.username",
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await
}

pub async fn counts(db: &Db, user_id: i64) -> sqlx::Result<FollowCounts> {
    let (followers, following): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM follow WHERE follows_id = ?), \
                (SELECT COUNT(*) FROM follow WHERE user_id = ?)",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_one(db.pool())
    .await?;
    Ok(FollowCounts { followers, following })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::users::insert_user;

    async fn db_with_users(names: &[&str]) -> (Db, Vec<i64>) {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.init_schema().await.unwrap();
        let mut ids = Vec::new();
        for n in names {
            ids.push(insert_user(&db, n, "h", "e@x").await.unwrap().unwrap());
        }
        (db, ids)
    }

    #[tokio::test]
    async fn follow_is_idempotent() {
        let (db, ids) = db_with_users(&["a", "b"]).await;
        assert!(follow(&db, ids[0], ids[1]).await.unwrap());
        assert!(!follow(&db, ids[0], ids[1]).await.unwrap());
        let edges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follow").fetch_one(db.pool()).await.unwrap();
        assert_eq!(edges, 1);
    }

    #[tokio::test]
    async fn unfollow_restores_prior_state() {
        let (db, ids) = db_with_users(&["a", "b"]).await;
        assert!(!unfollow(&db, ids[0], ids[1]).await.unwrap());
        follow(&db, ids[0], ids[1]).await.unwrap();
        assert!(is_following(&db, ids[0], ids[1]).await.unwrap());
        assert!(unfollow(&db, ids[0], ids[1]).await.unwrap());
        assert!(!unfollow(&db, ids[0], ids[1]).await.unwrap());
        assert!(!is_following(&db, ids[0], ids[1]).await.unwrap());
        assert_eq!(counts(&db, ids[1]).await.unwrap(), FollowCounts::default());
    }

    #[tokio::test]
    async fn listings_join_the_right_side() {
        let (db, ids) = db_with_users(&["ann", "ben", "cat"]).await;
        let (ann, ben, cat) = (ids[0], ids[1], ids[2]);
        follow(&db, ann, ben).await.unwrap();
        follow(&db, ann, cat).await.unwrap();
        follow(&db, cat, ben).await.unwrap();

        let ann_follows: Vec<String> = following(&db, ann).await.unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(ann_follows, vec!["ben", "cat"]);
        let ben_followers: Vec<String> = followers(&db, ben).await.unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(ben_followers, vec!["ann", "cat"]);
        assert!(followers(&db, ann).await.unwrap().is_empty());

        assert_eq!(counts(&db, ben).await.unwrap(), FollowCounts { followers: 2, following: 0 });
        assert_eq!(counts(&db, ann).await.unwrap(), FollowCounts { followers: 0, following: 2 });
    }

    #[tokio::test]
    async fn edge_to_missing_user_is_rejected_by_foreign_key() {
        let (db, ids) = db_with_users(&["solo"]).await;
        assert!(follow(&db, ids[0], 9999).await.is_err());
    }
}
