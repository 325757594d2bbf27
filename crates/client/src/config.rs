use std::fmt;
use std::sync::Arc;

use crate::feature::{Feature, FeatureKey, FeatureScope, FnFeature};

/// The features of a client, in installation order.
///
/// Cloning a config is cheap, the features themselves are shared.
#[derive(Clone, Default)]
pub struct ClientConfig {
    features: Vec<(FeatureKey, Arc<dyn Feature>)>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `feature`. A feature already installed under the same key is replaced
    /// and keeps its position.
    pub fn install<F: Feature + 'static>(&mut self, feature: F) -> &mut Self {
        let key = feature.key();
        let feature: Arc<dyn Feature> = Arc::new(feature);

        match self.features.iter_mut().find(|(installed, _)| *installed == key) {
            Some((_, installed)) => *installed = feature,
            None => self.features.push((key, feature)),
        }
        self
    }

    /// Installs a feature named `key` whose installation is `install`.
    pub fn install_fn<K, F>(&mut self, key: K, install: F) -> &mut Self
    where
        K: Into<FeatureKey>,
        F: Fn(&mut FeatureScope) + Send + Sync + 'static,
    {
        self.install(FnFeature::new(key.into(), install))
    }

    pub fn contains(&self, key: &FeatureKey) -> bool {
        self.features.iter().any(|(installed, _)| installed == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FeatureKey> {
        self.features.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub(crate) fn install_into(&self, scope: &mut FeatureScope) {
        for (_, feature) in &self.features {
            feature.install(scope);
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{DefaultRequest, UserAgent};
    use crate::AttributeKey;

    const ORDER: AttributeKey<Vec<&'static str>> = AttributeKey::new("order");

    fn record(name: &'static str) -> impl Fn(&mut FeatureScope) + Send + Sync + 'static {
        move |scope: &mut FeatureScope| {
            let mut order = scope.attributes_mut().remove(ORDER).unwrap_or_default();
            order.push(name);
            scope.put(ORDER, order);
        }
    }

    #[test]
    fn reinstalling_replaces_in_place() {
        let mut config = ClientConfig::new();
        config.install(DefaultRequest::new(|_| {})).install(UserAgent::default()).install(DefaultRequest::new(|_| {}));

        assert_eq!(config.len(), 2);
        let keys: Vec<_> = config.keys().map(FeatureKey::as_str).collect();
        assert_eq!(keys, ["DefaultRequest", "UserAgent"]);
    }

    #[test]
    fn features_install_in_order() {
        let mut config = ClientConfig::new();
        config.install_fn("first", record("first")).install_fn("second", record("second"));
        config.install_fn("first", record("first again"));

        let mut scope = FeatureScope::new();
        config.install_into(&mut scope);
        assert_eq!(scope.attributes().get(ORDER), Some(&vec!["first again", "second"]));
    }

    #[test]
    fn clones_are_independent() {
        let mut parent = ClientConfig::new();
        parent.install(UserAgent::default());

        let mut child = parent.clone();
        child.install_fn("extra", |_| {});

        assert!(!parent.contains(&FeatureKey::new("extra")));
        assert!(child.contains(&FeatureKey::new("extra")));
        assert!(child.contains(&UserAgent::KEY));
    }
}
