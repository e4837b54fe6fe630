use super::{SourceDescriptor, WordlistSource};

/// Source tiers in preference order. Built per run and handed to the
/// controller; nothing here is shared between runs.
#[derive(Default)]
pub struct SourceChain {
    tiers: Vec<Box<dyn WordlistSource>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, tier: Box<dyn WordlistSource>) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn tiers(&self) -> &[Box<dyn WordlistSource>] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Every descriptor of every tier with its entry count where known.
    /// Unavailable tiers are reported instead of failing the listing.
    pub async fn describe(&self) -> Vec<(SourceDescriptor, Option<u64>)> {
        let mut listing = Vec::new();
        for tier in &self.tiers {
            match tier.sources().await {
                Ok(descriptors) => {
                    for descriptor in descriptors {
                        let count = tier.count(&descriptor).await;
                        listing.push((descriptor, count));
                    }
                }
                Err(e) => tracing::warn!("{} wordlists unavailable: {}", tier.origin(), e),
            }
        }
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordlists::SourceOrigin;
    use crate::wordlists::testing::StaticSource;

    #[tokio::test]
    async fn test_describe_lists_tiers_in_order() {
        let chain = SourceChain::new()
            .with_tier(Box::new(StaticSource::new(SourceOrigin::Remote, &[("r1", &["a"])])))
            .with_tier(Box::new(StaticSource::new(
                SourceOrigin::Local,
                &[("l1", &["b"]), ("l2", &["c"])],
            )));

        let listing = chain.describe().await;
        let names: Vec<_> = listing.iter().map(|(d, _)| d.name.as_str()).collect();
        assert_eq!(names, vec!["r1", "l1", "l2"]);
        assert!(!chain.is_empty());
    }
}
