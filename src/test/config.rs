#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serial_test::serial;

    use crate::env::{AppConfig, DEFAULT_KEMONO_PAGE_SIZE};
    use crate::error::AppError;

    const KEYS: [&str; 6] = [
        "DATABASE_URL",
        "KEMONO_API_URL",
        "KEMONO_FILE_URL",
        "KEMONO_PAGE_SIZE",
        "CATEGORY_TABLE_PATH",
        "TOKEN_TTL_MINUTES",
    ];

    fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
        KEYS.iter().map(|key| (*key, None)).collect()
    }

    fn with(overrides: &[(&'static str, &'static str)]) -> Vec<(&'static str, Option<&'static str>)> {
        let mut vars = cleared();
        for (key, value) in overrides {
            if let Some(slot) = vars.iter_mut().find(|(k, _)| k == key) {
                slot.1 = Some(*value);
            }
        }
        vars
    }

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        temp_env::with_vars(cleared(), || {
            let config = AppConfig::from_env().expect("defaults should load");
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.kemono_page_size, DEFAULT_KEMONO_PAGE_SIZE);
            assert!(config.category_table_path.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_overrides_are_read_and_urls_trimmed() {
        let vars = with(&[
            ("DATABASE_URL", "sqlite://other.db"),
            ("KEMONO_API_URL", "https://mirror.test/api/v1/"),
            ("KEMONO_FILE_URL", "https://files.mirror.test//"),
            ("KEMONO_PAGE_SIZE", "25"),
            ("CATEGORY_TABLE_PATH", "config/custom.json"),
            ("TOKEN_TTL_MINUTES", "90"),
        ]);

        temp_env::with_vars(vars, || {
            let config = AppConfig::from_env().expect("overrides should load");

            assert_eq!(config.database_url, "sqlite://other.db");
            assert_eq!(config.kemono_api_url, "https://mirror.test/api/v1");
            assert_eq!(config.kemono_file_url, "https://files.mirror.test");
            assert_eq!(config.kemono_page_size, 25);
            assert_eq!(
                config.category_table_path,
                Some(PathBuf::from("config/custom.json"))
            );
            assert_eq!(config.token_ttl_minutes, 90);
        });
    }

    #[test]
    #[serial]
    fn test_blank_category_table_path_is_ignored() {
        temp_env::with_vars(with(&[("CATEGORY_TABLE_PATH", "  ")]), || {
            let config = AppConfig::from_env().unwrap();
            assert!(config.category_table_path.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_non_positive_numbers_are_rejected() {
        for raw in ["0", "-3", "many"] {
            temp_env::with_vars(with(&[("KEMONO_PAGE_SIZE", raw)]), || {
                match AppConfig::from_env() {
                    Err(AppError::Validation(msg)) => assert!(msg.contains("KEMONO_PAGE_SIZE")),
                    other => panic!("expected validation error for {}, got {:?}", raw, other),
                }
            });
        }

        temp_env::with_vars(with(&[("TOKEN_TTL_MINUTES", "0")]), || {
            assert!(matches!(
                AppConfig::from_env(),
                Err(AppError::Validation(_))
            ));
        });
    }
}
