//! Longest-prefix-match router from URL path to load balancer.

use super::balancer::LoadBalancer;
use std::sync::Arc;

pub struct Router {
    /// Sorted once at construction, descending by prefix length.
    routes: Vec<(String, Arc<LoadBalancer>)>,
}

impl Router {
    pub fn new(mut routes: Vec<(String, Arc<LoadBalancer>)>) -> Self {
        routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { routes }
    }

    pub fn resolve(&self, path: &str) -> Option<Arc<LoadBalancer>> {
        self.routes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, lb)| lb.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lb() -> Arc<LoadBalancer> {
        Arc::new(LoadBalancer::new(&["http://backend:80".to_string()], reqwest::Client::new()).unwrap())
    }

    #[test]
    fn longest_prefix_wins() {
        let root = lb();
        let api = lb();
        let router = Router::new(vec![("/".to_string(), root.clone()), ("/api/v2".to_string(), api.clone())]);

        assert!(Arc::ptr_eq(&router.resolve("/api/v2/x").unwrap(), &api));
        assert!(Arc::ptr_eq(&router.resolve("/home").unwrap(), &root));
    }

    #[test]
    fn no_match_returns_none() {
        let router: Router = Router::new(vec![("/api".to_string(), lb())]);
        assert!(router.resolve("/other").is_none());
    }
}
