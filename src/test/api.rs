#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Header, Status};
    use serde_json::{Value, json};

    use crate::api::users::{MessageResponse, UserData};
    use crate::import::normalize::{KemonoFile, KemonoPost};
    use crate::test::test_db::create_standard_test_db;
    use crate::test::test_utils::{login_test_user, setup_test_client, setup_test_client_with_feed};
    use crate::validation::{ToValidationResponse, ValidationResponse};

    #[rocket::async_test]
    async fn test_index_and_health() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client.get("/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "OK");

        let response = client.get("/").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["message"], "Welcome to the LoL Improve API");
    }

    #[rocket::async_test]
    async fn test_auth_required_apis() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let endpoints = vec![
            "/users/me",
            "/goals",
            "/game-sessions",
            "/champion-pools",
            "/videos",
            "/videos/categories",
        ];

        for endpoint in endpoints {
            let response = client.get(endpoint).dispatch().await;
            assert_eq!(
                response.status(),
                Status::Unauthorized,
                "Endpoint {} did not require authentication",
                endpoint
            );

            let body: ValidationResponse = response.into_json().await.unwrap();
            assert_eq!(body.status, "error");
            assert_eq!(
                body.message_for("authentication"),
                Some("Could not validate credentials")
            );
        }

        let response = client
            .get("/users/me")
            .header(Header::new("Authorization", "Bearer not-a-real-token"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_token_login() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let auth = login_test_user(&client, "player_user").await;

        let response = client.get("/users/me").header(auth).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let me: UserData = response.into_json().await.unwrap();
        assert_eq!(me.username, "player_user");
        assert_eq!(me.role, "player");
        assert!(!me.is_admin);

        let response = client
            .post("/token")
            .header(ContentType::Form)
            .body("username=player_user&password=wrong_password")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
        let body: ValidationResponse = response.into_json().await.unwrap();
        assert_eq!(
            body.message_for("authentication"),
            Some("Incorrect username or password")
        );
    }

    #[rocket::async_test]
    async fn test_logout_revokes_token() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let auth = login_test_user(&client, "player_user").await;

        let response = client.post("/logout").header(auth.clone()).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: MessageResponse = response.into_json().await.unwrap();
        assert_eq!(body.message, "Logged out");

        let response = client.get("/users/me").header(auth).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_admin_only_endpoints() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user").await;
        let other_id = test_db.user_id("other_player").unwrap();

        let forbidden = vec![
            client.get("/users").header(player.clone()),
            client.get(format!("/users/{}", other_id)).header(player.clone()),
            client.post("/videos/update-categories").header(player.clone()),
            client
                .post("/videos/creators/migrate-from-videos")
                .header(player.clone()),
        ];
        for request in forbidden {
            let response = request.dispatch().await;
            assert_eq!(response.status(), Status::Forbidden);
        }

        let admin = login_test_user(&client, "admin_user").await;

        let response = client.get("/users").header(admin.clone()).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let users: Vec<UserData> = response.into_json().await.unwrap();
        assert_eq!(users.len(), 3);

        let response = client
            .post("/users")
            .header(admin.clone())
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": "new_player",
                    "email": "new_player@example.com",
                    "password": "long-enough"
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let response = client
            .post("/users")
            .header(admin)
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": "x",
                    "email": "not-an-email",
                    "password": "short"
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: ValidationResponse = response.into_json().await.unwrap();
        assert!(body.errors.contains_key("username"));
        assert!(body.errors.contains_key("email"));
        assert!(body.errors.contains_key("password"));
    }

    #[rocket::async_test]
    async fn test_user_can_read_own_record() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user").await;
        let own_id = test_db.user_id("player_user").unwrap();

        let response = client
            .get(format!("/users/{}", own_id))
            .header(player)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn test_goals_are_private() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        let other = login_test_user(&client, "other_player").await;
        let goal_id = test_db.goal_id("Track the enemy jungler").unwrap();

        let response = client
            .get(format!("/goals/{}", goal_id))
            .header(other.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .get("/goals?status=paused")
            .header(other.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let player = login_test_user(&client, "player_user").await;
        let response = client
            .patch(format!("/goals/{}/status", goal_id))
            .header(player)
            .header(ContentType::JSON)
            .body(json!({"status": "completed"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let goal: Value = response.into_json().await.unwrap();
        assert_eq!(goal["status"], "completed");
    }

    #[rocket::async_test]
    async fn test_game_session_with_foreign_goal_is_rejected() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user").await;
        let foreign_goal = test_db.goal_id("Ward more").unwrap();

        let response = client
            .post("/game-sessions")
            .header(player)
            .header(ContentType::JSON)
            .body(
                json!({
                    "player_character": "Lee Sin",
                    "enemy_character": "Elise",
                    "result": "win",
                    "mood_rating": 4,
                    "goal_progress": [
                        {"goal_id": foreign_goal, "title": "Ward more", "progress_rating": 3}
                    ]
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let body: ValidationResponse = response.into_json().await.unwrap();
        assert_eq!(
            body.message_for("request"),
            Some("One or more goals in goal_progress do not belong to the user")
        );
    }

    #[rocket::async_test]
    async fn test_champion_pool_duplicate_champion() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user").await;

        let response = client
            .post("/champion-pools")
            .header(player.clone())
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": "Jungle",
                    "category": "main",
                    "champions": [{"champion_id": "64", "champion_name": "Lee Sin"}]
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let pool: Value = response.into_json().await.unwrap();
        let pool_id = pool["id"].as_i64().unwrap();

        let response = client
            .post(format!("/champion-pools/{}/champions", pool_id))
            .header(player.clone())
            .header(ContentType::JSON)
            .body(json!({"champion_id": "64", "champion_name": "Lee Sin"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .delete(format!("/champion-pools/{}/champions/999", pool_id))
            .header(player.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .get("/champion-pools/champions/all")
            .header(player)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let champions: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(champions.len(), 1);
    }

    #[rocket::async_test]
    async fn test_progress_accepts_frontend_aliases() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user").await;
        let video_id = test_db.video_id("Baron usage").unwrap();

        let response = client
            .get(format!("/videos/progress/{}", video_id))
            .header(player.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .post(format!("/videos/{}/progress", video_id))
            .header(player.clone())
            .header(ContentType::JSON)
            .body(
                json!({
                    "is_watched": false,
                    "is_completed": true,
                    "position_seconds": 95.0,
                    "notes": "Rewatch the baron setup"
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .get(format!("/videos/progress/{}", video_id))
            .header(player.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let progress: Value = response.into_json().await.unwrap();
        assert_eq!(progress["is_watched"], true);
        assert_eq!(progress["is_completed"], true);
        assert_eq!(progress["watch_progress"], 95.0);
        assert_eq!(progress["position_seconds"], 95.0);
        assert_eq!(progress["personal_notes"], "Rewatch the baron setup");
        assert_eq!(progress["notes"], "Rewatch the baron setup");

        let response = client
            .get("/videos/recently-watched")
            .header(player)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let recent: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0]["title"], "Baron usage");
    }

    #[rocket::async_test]
    async fn test_video_listing_expands_category() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user").await;

        let response = client
            .get("/videos/search?q=snowball")
            .header(player.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let videos: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0]["title"], "Snowball fundamentals");
        assert_eq!(videos[0]["category"]["name"], "Fundamentals");
        assert!(videos[0]["progress_data"].is_null());

        let response = client
            .get("/videos/search?min_published_date=someday")
            .header(player)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_bulk_import_defaults_video_type() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user").await;

        let response = client
            .post("/videos/import")
            .header(player.clone())
            .header(ContentType::JSON)
            .body(
                json!([
                    {"title": "Drake windows", "creator": "Coach C", "url": "https://video.test/3"},
                    {"title": "Level lead", "url": "https://video.test/4", "video_type": "direct",
                     "upload_date": "2024-05-01", "ignored": 1}
                ])
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let body: MessageResponse = response.into_json().await.unwrap();
        assert_eq!(body.message, "Successfully imported 2 videos");

        let response = client
            .get("/videos?title=Drake")
            .header(player)
            .dispatch()
            .await;
        let videos: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0]["video_type"], "YouTube");
    }

    #[rocket::async_test]
    async fn test_kemono_import_endpoint() {
        let test_db = create_standard_test_db().await;
        let posts = vec![
            KemonoPost {
                id: Some("1".to_string()),
                title: Some("Snowball fundamentals part 2".to_string()),
                user: Some("66222987".to_string()),
                file: Some(KemonoFile {
                    name: None,
                    path: Some("/clips/part2.mp4".to_string()),
                }),
                ..Default::default()
            },
            KemonoPost {
                id: Some("2".to_string()),
                title: Some("Announcement".to_string()),
                ..Default::default()
            },
        ];
        let (client, test_db) = setup_test_client_with_feed(test_db, posts).await;

        let player = login_test_user(&client, "player_user").await;

        let response = client
            .post("/videos/kemono/import")
            .header(player.clone())
            .header(ContentType::JSON)
            .body(json!({"creator_id": ""}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);

        let response = client
            .get("/videos/kemono/preview/66222987")
            .header(player.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let preview: Value = response.into_json().await.unwrap();
        assert_eq!(preview["Fundamentals"].as_array().unwrap().len(), 1);
        assert_eq!(preview["Uncategorized"].as_array().unwrap().len(), 1);

        let response = client
            .post("/videos/kemono/import")
            .header(player)
            .header(ContentType::JSON)
            .body(json!({"creator_id": "66222987"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let report: Value = response.into_json().await.unwrap();
        assert_eq!(report["total_videos"], 2);
        assert_eq!(report["imported_videos"], 1);
        assert_eq!(report["skipped_videos"], 1);
        assert_eq!(report["creators_processed"], true);
        assert_eq!(report["videos"][0]["video_type"], "direct");
        assert_eq!(
            report["videos"][0]["category_id"],
            test_db.category_id("Fundamentals").unwrap()
        );
    }

    #[rocket::async_test]
    async fn test_category_crud_and_creator_migration() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user").await;

        let response = client
            .post("/videos/categories")
            .header(player.clone())
            .header(ContentType::JSON)
            .body(json!({"name": "Fundamentals"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post("/videos/categories")
            .header(player.clone())
            .header(ContentType::JSON)
            .body(json!({"name": "Classes", "description": "Live classes"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let admin = login_test_user(&client, "admin_user").await;
        let response = client
            .post("/videos/creators/migrate-from-videos")
            .header(admin.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let creators: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(creators.len(), 2);

        let response = client
            .get("/videos/creators")
            .header(admin)
            .dispatch()
            .await;
        let listed: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn test_status_bodies() {
        let cases = [
            (Status::Unauthorized, "authentication", "Could not validate credentials"),
            (
                Status::Forbidden,
                "permission",
                "You don't have permission to perform this action",
            ),
            (Status::NotFound, "resource", "Resource not found"),
            (Status::UnprocessableEntity, "validation", "Validation failed"),
            (Status::ServiceUnavailable, "service", "Service unavailable"),
            (Status::ImATeapot, "error", "An error occurred"),
        ];

        for (status, field, message) in cases {
            let response = status.to_validation_response();
            assert_eq!(response.0, status);
            assert_eq!(response.1.message_for(field), Some(message));
        }
    }
}
