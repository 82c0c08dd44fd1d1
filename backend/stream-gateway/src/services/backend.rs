/// Storage backend selection and redirect URL construction
use url::form_urlencoded;

use crate::config::BackendConfig;
use crate::utils::build_full_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub base_url: String,
    pub storage_base_path: String,
}

impl Backend {
    /// `{base_url}?path={path}&signature={token}`
    pub fn stream_url(&self, path: &str, signature: &str) -> String {
        let encoded_path: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
        format!(
            "{}?path={}&signature={}",
            self.base_url, encoded_path, signature
        )
    }
}

/// Picks a backend by the storage prefix of an origin path.
/// The first configured backend is the default.
#[derive(Debug, Clone)]
pub struct BackendRouter {
    backends: Vec<Backend>,
}

impl BackendRouter {
    /// `configs` must not be empty (config validation guarantees it)
    pub fn new(configs: &[BackendConfig]) -> Self {
        let backends = configs
            .iter()
            .map(|cfg| Backend {
                base_url: build_full_url(&cfg.url, 0),
                storage_base_path: cfg.storage_base_path.clone(),
            })
            .collect();
        Self { backends }
    }

    pub fn default_backend(&self) -> Option<&Backend> {
        self.backends.first()
    }

    /// Choose the backend whose storage base path is the longest prefix of
    /// `origin_path`, and return the path relative to it.
    ///
    /// Falls back to the default backend with the path untouched.
    pub fn route_origin_path(&self, origin_path: &str) -> Option<(&Backend, String)> {
        let matched = self
            .backends
            .iter()
            .filter(|b| {
                !b.storage_base_path.is_empty() && origin_path.starts_with(&b.storage_base_path)
            })
            .max_by_key(|b| b.storage_base_path.len());

        match matched {
            Some(backend) => {
                let relative = &origin_path[backend.storage_base_path.len()..];
                let relative = relative.strip_prefix('/').unwrap_or(relative);
                Some((backend, relative.to_string()))
            }
            None => self
                .default_backend()
                .map(|backend| (backend, origin_path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> BackendRouter {
        BackendRouter::new(&[
            BackendConfig {
                url: "https://stream-a.example.com/stream/".into(),
                storage_base_path: "/storage".into(),
            },
            BackendConfig {
                url: "stream-b.example.com".into(),
                storage_base_path: "/storage/anime".into(),
            },
        ])
    }

    #[test]
    fn test_strips_base_path_and_one_separator() {
        let router = router();
        let (backend, path) = router.route_origin_path("/storage/movies/a.mkv").unwrap();
        assert_eq!(backend.base_url, "https://stream-a.example.com/stream");
        assert_eq!(path, "movies/a.mkv");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let router = router();
        let (backend, path) = router.route_origin_path("/storage/anime/b/ep1.mkv").unwrap();
        assert_eq!(backend.base_url, "http://stream-b.example.com");
        assert_eq!(path, "b/ep1.mkv");
    }

    #[test]
    fn test_unmatched_path_uses_default_unchanged() {
        let router = router();
        let (backend, path) = router.route_origin_path("/mnt/other/c.mkv").unwrap();
        assert_eq!(backend.base_url, "https://stream-a.example.com/stream");
        assert_eq!(path, "/mnt/other/c.mkv");
    }

    #[test]
    fn test_empty_base_path_never_strips() {
        let router = BackendRouter::new(&[BackendConfig {
            url: "http://backend".into(),
            storage_base_path: String::new(),
        }]);
        let (_, path) = router.route_origin_path("/storage/a.mkv").unwrap();
        assert_eq!(path, "/storage/a.mkv");
    }

    #[test]
    fn test_stream_url_encoding() {
        let backend = Backend {
            base_url: "https://stream.example.com/stream".into(),
            storage_base_path: String::new(),
        };
        assert_eq!(
            backend.stream_url("movies/a b&c.mkv", "tok-en_1"),
            "https://stream.example.com/stream?path=movies%2Fa+b%26c.mkv&signature=tok-en_1"
        );
    }
}
