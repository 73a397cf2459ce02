// Rotating proxy pool: one endpoint picked uniformly at random per fetch.

use rand::Rng;

use crate::error::ConfigError;

/// Non-empty list of proxy endpoints.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    /// Build a pool. An empty list is a fatal configuration error.
    pub fn new(proxies: Vec<String>) -> Result<Self, ConfigError> {
        if proxies.is_empty() {
            return Err(ConfigError::EmptyProxyList);
        }
        Ok(Self { proxies })
    }

    /// Pick one proxy at random.
    pub fn pick(&self) -> &str {
        let idx = rand::thread_rng().gen_range(0..self.proxies.len());
        &self.proxies[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            ProxyPool::new(Vec::new()),
            Err(ConfigError::EmptyProxyList)
        ));
    }

    #[test]
    fn test_single_proxy_always_picked() {
        let pool = ProxyPool::new(vec!["http://10.0.0.1:8080".into()]).unwrap();
        for _ in 0..20 {
            assert_eq!(pool.pick(), "http://10.0.0.1:8080");
        }
    }

    #[test]
    fn test_pick_covers_all_proxies() {
        let proxies: Vec<String> = (1..=3).map(|i| format!("http://10.0.0.{i}:8080")).collect();
        let pool = ProxyPool::new(proxies.clone()).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..500 {
            let p = pool.pick();
            assert!(proxies.iter().any(|x| x == p));
            seen.insert(p.to_string());
        }
        assert_eq!(seen.len(), 3, "every proxy should be picked eventually");
    }
}
