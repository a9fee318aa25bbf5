#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::error::AppError;
    use crate::import::client::{KemonoClient, collect_pages};
    use crate::import::ContentSource;

    #[tokio::test]
    async fn test_collect_pages_stops_on_empty_page() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let seen = offsets.clone();

        let items = collect_pages(2, move |offset| {
            seen.lock().unwrap().push(offset);
            async move {
                Ok(match offset {
                    0 => vec![1, 2],
                    2 => vec![3, 4],
                    4 => vec![5],
                    _ => Vec::new(),
                })
            }
        })
        .await;

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(*offsets.lock().unwrap(), vec![0, 2, 4, 6]);
    }

    #[tokio::test]
    async fn test_collect_pages_keeps_partial_results_on_error() {
        let items = collect_pages(50, |offset| async move {
            if offset == 0 {
                Ok(vec!["a", "b"])
            } else {
                Err(AppError::ExternalService("upstream unavailable".to_string()))
            }
        })
        .await;

        assert_eq!(items, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_collect_pages_first_page_failure_yields_nothing() {
        let items: Vec<u8> = collect_pages(50, |_| async {
            Err(AppError::ExternalService("down".to_string()))
        })
        .await;

        assert!(items.is_empty());
    }

    #[test]
    fn test_client_normalizes_base_urls() {
        let client = KemonoClient::new("https://api.test/v1/", "https://files.test/", 0)
            .expect("client should build");

        assert_eq!(client.file_base_url(), "https://files.test");
    }
}
