#[cfg(test)]
mod tests {
    use crate::{
        auth::UserSession,
        db::{
            clean_expired_sessions, create_user_session, get_session_by_token, invalidate_session,
        },
        error::AppError,
        test::test_db::TestDbBuilder,
    };
    use chrono::{Duration, NaiveDateTime, Utc};
    use rocket::tokio;
    use sqlx::{Pool, Sqlite, SqlitePool};
    use uuid::Uuid;

    async fn create_test_session() -> (i64, String, NaiveDateTime, Pool<Sqlite>) {
        let test_db = TestDbBuilder::new()
            .player("test_session_user")
            .build()
            .await
            .expect("Failed to build test database");

        let user_id = test_db
            .user_id("test_session_user")
            .expect("User not found");

        let token = format!("test_token_{}", Uuid::new_v4());

        let expires_at = (Utc::now() + Duration::hours(1)).naive_utc();

        (user_id, token, expires_at, test_db.pool)
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (user_id, token, expires_at, pool) = create_test_session().await;

        let session_id = create_user_session(&pool, user_id, &token, expires_at)
            .await
            .expect("Failed to create session");

        assert!(session_id > 0, "Session ID should be positive");

        let session = get_session_by_token(&pool, &token)
            .await
            .expect("Failed to get session");

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.token, token);

        let expires_diff =
            (session.expires_at.and_utc().timestamp() - expires_at.and_utc().timestamp()).abs();
        assert!(
            expires_diff <= 1,
            "Expiration timestamps should match within 1 second"
        );
    }

    #[tokio::test]
    async fn test_get_nonexistent_session() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        match get_session_by_token(&pool, "nonexistent_token").await {
            Err(AppError::Authentication(msg)) => assert_eq!(msg, "Invalid session token"),
            other => panic!("Expected Authentication error, got {:?}", other.map(|s| s.id)),
        }
    }

    #[tokio::test]
    async fn test_invalidate_session() {
        let (user_id, token, expires_at, pool) = create_test_session().await;

        create_user_session(&pool, user_id, &token, expires_at)
            .await
            .expect("Failed to create session");

        assert!(
            get_session_by_token(&pool, &token).await.is_ok(),
            "Session should exist before invalidation"
        );

        invalidate_session(&pool, &token)
            .await
            .expect("Failed to invalidate session");

        assert!(
            get_session_by_token(&pool, &token).await.is_err(),
            "Session should not exist after invalidation"
        );
    }

    #[tokio::test]
    async fn test_clean_expired_sessions() {
        let (user_id, _, _, pool) = create_test_session().await;

        let expired = format!("test_token_expired_{}", Uuid::new_v4());
        let soon = format!("test_token_soon_{}", Uuid::new_v4());
        let later = format!("test_token_later_{}", Uuid::new_v4());

        create_user_session(&pool, user_id, &expired, (Utc::now() - Duration::hours(1)).naive_utc())
            .await
            .expect("Failed to create expired session");
        create_user_session(&pool, user_id, &soon, (Utc::now() + Duration::minutes(1)).naive_utc())
            .await
            .expect("Failed to create expiring soon session");
        create_user_session(&pool, user_id, &later, (Utc::now() + Duration::days(1)).naive_utc())
            .await
            .expect("Failed to create future session");

        let cleaned_count = clean_expired_sessions(&pool)
            .await
            .expect("Failed to clean expired sessions");

        assert_eq!(cleaned_count, 1, "Should have cleaned exactly 1 expired session");
        assert!(get_session_by_token(&pool, &expired).await.is_err());
        assert!(get_session_by_token(&pool, &soon).await.is_ok());
        assert!(get_session_by_token(&pool, &later).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_validity() {
        let (user_id, token, expires_at, pool) = create_test_session().await;

        let expired_token = format!("test_token_expired_{}", Uuid::new_v4());
        create_user_session(
            &pool,
            user_id,
            &expired_token,
            (Utc::now() - Duration::hours(1)).naive_utc(),
        )
        .await
        .expect("Failed to create expired session");

        let session = get_session_by_token(&pool, &expired_token)
            .await
            .expect("Should be able to retrieve expired session");
        assert!(!session.is_valid(), "Expired session should be invalid");

        create_user_session(&pool, user_id, &token, expires_at)
            .await
            .expect("Failed to create valid session");

        let valid_session = get_session_by_token(&pool, &token)
            .await
            .expect("Should be able to retrieve valid session");
        assert!(valid_session.is_valid(), "Future session should be valid");
    }

    #[test]
    fn test_generated_tokens_are_distinct() {
        let first = UserSession::generate_token();
        let second = UserSession::generate_token();

        assert_eq!(first.len(), 48);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
