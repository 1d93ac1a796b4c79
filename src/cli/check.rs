//! Check command implementation

use crate::registry::SubscriptionRegistry;
use crate::rules::RuleKind;
use crate::store::FileSubscriptionStore;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Subscriptions JSON file
    pub path: PathBuf,
}

impl CheckArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let store = FileSubscriptionStore::new(&self.path);
        let subscriptions = store.load_all().await?;
        let registry = SubscriptionRegistry::new();
        let mut invalid = 0;

        println!("{}: {} subscriptions", self.path.display(), subscriptions.len());
        for subscription in subscriptions {
            let summary = format!(
                "{} user={} status={} symbols={} rules={}/{}",
                subscription.id,
                subscription.user_id,
                subscription.status.as_str(),
                subscription.symbols.len(),
                subscription.enabled_rules().count(),
                subscription.rules.len(),
            );
            match registry.add(subscription).await {
                Ok(()) => println!("  ok       {}", summary),
                Err(e) => {
                    invalid += 1;
                    println!("  invalid  {} ({})", summary, e);
                }
            }
        }

        let stats = registry.stats().await;
        println!(
            "valid={} active={} paused={} expired={} cancelled={} symbols={}",
            stats.total, stats.active, stats.paused, stats.expired, stats.cancelled, stats.indexed_symbols
        );
        for kind in RuleKind::ALL {
            let count = stats.rules_by_kind.get(&kind).copied().unwrap_or(0);
            println!("  {:<13} {}", kind.as_str(), count);
        }

        if invalid > 0 {
            anyhow::bail!("{} invalid subscription(s)", invalid);
        }
        Ok(())
    }
}
