use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

const POOL_SIZE: usize = 8;

const FALLBACK_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Rotating `User-Agent` values. Workers share one pool and advance it without
/// coordination; two workers landing on the same agent is fine.
pub struct IdentityPool {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl Default for IdentityPool {
    fn default() -> Self {
        IdentityPool::new()
    }
}

impl IdentityPool {
    pub fn new() -> Self {
        let mut agents: Vec<String> = Vec::with_capacity(POOL_SIZE);
        for _ in 0..POOL_SIZE * 4 {
            if agents.len() == POOL_SIZE {
                break;
            }
            let agent = fake_user_agent::get_rua().to_string();
            if !agents.contains(&agent) {
                agents.push(agent);
            }
        }
        for agent in FALLBACK_AGENTS {
            if agents.len() >= POOL_SIZE {
                break;
            }
            if !agents.iter().any(|a| a == agent) {
                agents.push(agent.to_string());
            }
        }
        agents.shuffle(&mut rand::thread_rng());

        IdentityPool::from_agents(agents)
    }

    pub fn from_agents(agents: Vec<String>) -> Self {
        let agents = match agents.is_empty() {
            true => FALLBACK_AGENTS.iter().map(|a| a.to_string()).collect(),
            false => agents,
        };

        IdentityPool {
            agents,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn next(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[index]
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_identities_differ() {
        let pool = IdentityPool::new();
        assert!(pool.len() >= 2);

        let first = pool.next().to_string();
        let second = pool.next().to_string();
        assert_ne!(first, second);
    }

    #[test]
    fn rotation_wraps_around() {
        let pool = IdentityPool::from_agents(vec!["a".to_string(), "b".to_string()]);
        let seen: Vec<&str> = (0..5).map(|_| pool.next()).collect();
        assert_eq!(seen, vec!["a", "b", "a", "b", "a"]);
    }

    #[test]
    fn empty_pool_falls_back_to_builtin_agents() {
        let pool = IdentityPool::from_agents(vec![]);
        assert_eq!(pool.len(), FALLBACK_AGENTS.len());
    }
}
