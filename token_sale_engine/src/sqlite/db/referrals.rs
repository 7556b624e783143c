use sqlx::SqliteConnection;

use crate::db_types::{Referral, UserId};

/// Records (or re-levels) a referral relationship.
pub async fn upsert_referral(
    user_id: &UserId,
    referrer_user_id: &UserId,
    level: i64,
    conn: &mut SqliteConnection,
) -> Result<Referral, sqlx::Error> {
    let referral = sqlx::query_as(
        r#"
        INSERT INTO referrals (user_id, referrer_user_id, level) VALUES ($1, $2, $3)
        ON CONFLICT (user_id, referrer_user_id) DO UPDATE SET level = excluded.level
        RETURNING *
        "#,
    )
    .bind(user_id.as_str())
    .bind(referrer_user_id.as_str())
    .bind(level)
    .fetch_one(conn)
    .await?;
    Ok(referral)
}

/// Everyone who recruited the given user, best (lowest) level first.
pub async fn referrers_for_user(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Referral>, sqlx::Error> {
    let referrals = sqlx::query_as("SELECT * FROM referrals WHERE user_id = $1 ORDER BY level ASC, id ASC")
        .bind(user_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(referrals)
}
