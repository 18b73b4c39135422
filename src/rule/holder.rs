use super::ShardingRule;
use crate::config::ShardingRuleConfig;
use crate::core::Result;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Publishes the current [`ShardingRule`] snapshot.
///
/// Readers clone the `Arc` and route against it for the whole statement, so a
/// concurrent [`replace`](Self::replace) never exposes a half-built rule.
#[derive(Debug)]
pub struct ShardingRuleHolder {
    current: RwLock<Arc<ShardingRule>>,
}

impl ShardingRuleHolder {
    pub fn new(rule: ShardingRule) -> Self {
        Self {
            current: RwLock::new(Arc::new(rule)),
        }
    }

    pub fn snapshot(&self) -> Result<Arc<ShardingRule>> {
        Ok(self.current.read()?.clone())
    }

    /// Swap in a fully built rule, returning the previous snapshot.
    pub fn replace(&self, rule: ShardingRule) -> Result<Arc<ShardingRule>> {
        let next = Arc::new(rule);
        let mut current = self.current.write()?;
        let previous = std::mem::replace(&mut *current, next);
        info!(
            data_sources = current.data_source_names().len(),
            "Sharding rule snapshot replaced"
        );
        Ok(previous)
    }

    /// Build a rule from `config` and swap it in; the old rule stays
    /// published when the config is invalid.
    pub fn reload(&self, config: &ShardingRuleConfig) -> Result<Arc<ShardingRule>> {
        let rule = ShardingRule::new(config)?;
        self.replace(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(data_sources: &[&str]) -> ShardingRuleConfig {
        ShardingRuleConfig::new(data_sources.iter().copied())
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let holder = ShardingRuleHolder::new(ShardingRule::new(&config(&["ds_0"])).unwrap());
        let before = holder.snapshot().unwrap();

        let previous = holder.reload(&config(&["ds_0", "ds_1"])).unwrap();

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.data_source_names(), ["ds_0"]);
        assert_eq!(holder.snapshot().unwrap().data_source_names(), ["ds_0", "ds_1"]);
    }

    #[test]
    fn test_invalid_reload_keeps_current_rule() {
        let holder = ShardingRuleHolder::new(ShardingRule::new(&config(&["ds_0"])).unwrap());
        assert!(holder.reload(&config(&[])).is_err());
        assert_eq!(holder.snapshot().unwrap().data_source_names(), ["ds_0"]);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let holder = Arc::new(ShardingRuleHolder::new(
            ShardingRule::new(&config(&["ds_0"])).unwrap(),
        ));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let holder = Arc::clone(&holder);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let rule = holder.snapshot().unwrap();
                        let len = rule.data_source_names().len();
                        assert!(len == 1 || len == 2);
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            holder.reload(&config(&["ds_0", "ds_1"])).unwrap();
            holder.reload(&config(&["ds_0"])).unwrap();
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
