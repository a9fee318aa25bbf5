#[cfg(test)]
pub mod test_db {
    use crate::auth::Role;
    use crate::db::{GoalFields, NewVideo, create_category, create_goal, create_user, create_video};
    use crate::error::AppError;
    use crate::models::GoalStatus;
    use sqlx::{Pool, Sqlite, SqlitePool};
    use std::collections::HashMap;
    use std::sync::Once;
    use tracing::log::LevelFilter;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        categories: Vec<TestCategory>,
        videos: Vec<TestVideo>,
        goals: Vec<TestGoal>,
    }

    pub struct TestUser {
        pub username: String,
        pub role: Role,
        pub password: String,
    }

    pub struct TestCategory {
        pub name: String,
        pub description: Option<String>,
    }

    pub struct TestVideo {
        pub title: String,
        pub creator: Option<String>,
        pub url: String,
        pub category_name: Option<String>,
        pub tags: Vec<String>,
    }

    pub struct TestGoal {
        pub username: String,
        pub title: String,
        pub status: GoalStatus,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn player(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Player,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn admin(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Admin,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn category(mut self, name: &str, description: Option<&str>) -> Self {
            self.categories.push(TestCategory {
                name: name.to_string(),
                description: description.map(String::from),
            });
            self
        }

        pub fn video(
            mut self,
            title: &str,
            creator: Option<&str>,
            url: &str,
            category_name: Option<&str>,
        ) -> Self {
            self.videos.push(TestVideo {
                title: title.to_string(),
                creator: creator.map(String::from),
                url: url.to_string(),
                category_name: category_name.map(String::from),
                tags: Vec::new(),
            });
            self
        }

        pub fn tagged_video(mut self, title: &str, url: &str, tags: &[&str]) -> Self {
            self.videos.push(TestVideo {
                title: title.to_string(),
                creator: None,
                url: url.to_string(),
                category_name: None,
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
            });
            self
        }

        pub fn goal(mut self, username: &str, title: &str, status: GoalStatus) -> Self {
            self.goals.push(TestGoal {
                username: username.to_string(),
                title: title.to_string(),
                status,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .filter_level(LevelFilter::Debug)
                    .is_test(true)
                    .try_init();
            });

            let pool = SqlitePool::connect("sqlite::memory:").await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut category_id_map: HashMap<String, i64> = HashMap::new();
            let mut video_id_map: HashMap<String, i64> = HashMap::new();
            let mut goal_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let email = format!("{}@example.com", user.username);
                let user_id =
                    create_user(&pool, &user.username, &email, &user.password, user.role).await?;

                user_id_map.insert(user.username.clone(), user_id);
            }

            for category in &self.categories {
                let created =
                    create_category(&pool, &category.name, category.description.as_deref())
                        .await?;

                category_id_map.insert(category.name.clone(), created.id);
            }

            for video in &self.videos {
                let category_id = video
                    .category_name
                    .as_ref()
                    .and_then(|name| category_id_map.get(name).copied());

                let created = create_video(
                    &pool,
                    NewVideo {
                        title: video.title.clone(),
                        creator: video.creator.clone(),
                        url: video.url.clone(),
                        video_type: "embed".to_string(),
                        category_id,
                        tags: video.tags.clone(),
                        ..Default::default()
                    },
                )
                .await?;

                video_id_map.insert(video.title.clone(), created.id);
            }

            for goal in &self.goals {
                let Some(user_id) = user_id_map.get(&goal.username).copied() else {
                    continue;
                };

                let created = create_goal(
                    &pool,
                    user_id,
                    GoalFields {
                        title: goal.title.clone(),
                        description: None,
                        status: goal.status,
                    },
                )
                .await?;

                goal_id_map.insert(goal.title.clone(), created.id);
            }

            Ok(TestDb {
                pool,
                user_id_map,
                category_id_map,
                video_id_map,
                goal_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub category_id_map: HashMap<String, i64>,
        pub video_id_map: HashMap<String, i64>,
        pub goal_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        pub fn category_id(&self, name: &str) -> Option<i64> {
            self.category_id_map.get(name).copied()
        }

        pub fn video_id(&self, title: &str) -> Option<i64> {
            self.video_id_map.get(title).copied()
        }

        pub fn goal_id(&self, title: &str) -> Option<i64> {
            self.goal_id_map.get(title).copied()
        }
    }

    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .player("player_user")
            .player("other_player")
            .admin("admin_user")
            .category("Fundamentals", Some("Core concepts"))
            .category("Midgame Course", None)
            .video(
                "Snowball fundamentals",
                Some("Coach A"),
                "https://video.test/1",
                Some("Fundamentals"),
            )
            .video("Baron usage", Some("Coach B"), "https://video.test/2", None)
            .goal("player_user", "Track the enemy jungler", GoalStatus::Active)
            .goal("other_player", "Ward more", GoalStatus::Active)
            .build()
            .await
            .expect("Failed to build standard test database")
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;

    use super::test_db::{STANDARD_PASSWORD, TestDb};
    use crate::api::users::TokenResponse;
    use crate::env::AppConfig;
    use crate::import::{CategoryTable, ContentSource, ContentSourceHandle, KemonoPost};
    use crate::init_rocket;

    pub const TEST_FILE_URL: &str = "https://files.test";

    /// A content source that hands out a fixed list of posts.
    pub struct StaticFeed {
        pub posts: Vec<KemonoPost>,
    }

    #[rocket::async_trait]
    impl ContentSource for StaticFeed {
        async fn fetch_all(&self, _account_id: &str, _service: &str) -> Vec<KemonoPost> {
            self.posts.clone()
        }

        fn file_base_url(&self) -> &str {
            TEST_FILE_URL
        }
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        setup_test_client_with_feed(test_db, Vec::new()).await
    }

    pub async fn setup_test_client_with_feed(
        test_db: TestDb,
        posts: Vec<KemonoPost>,
    ) -> (Client, TestDb) {
        let source: ContentSourceHandle = Arc::new(StaticFeed { posts });
        let table = CategoryTable::embedded().expect("embedded category table is valid");

        let rocket = init_rocket(test_db.pool.clone(), source, table, AppConfig::default());

        let client = Client::tracked(rocket)
            .await
            .expect("Failed to create test client");

        (client, test_db)
    }

    /// Logs in with the standard password and returns the Authorization header.
    pub async fn login_test_user(client: &Client, username: &str) -> Header<'static> {
        let response = client
            .post("/token")
            .header(ContentType::Form)
            .body(format!(
                "username={}&password={}",
                username, STANDARD_PASSWORD
            ))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "login failed for {}", username);

        let token: TokenResponse = response
            .into_json()
            .await
            .expect("token response should be JSON");

        Header::new("Authorization", format!("Bearer {}", token.access_token))
    }
}
