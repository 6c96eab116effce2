//! Route class → strategy mapping.

use waystation_core::RouteClass;

use super::Strategy;

/// Which strategy serves each route class.
///
/// `ImmutableAsset` has no slot: those requests are never intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyTable {
    pub navigation: Strategy,
    pub directory_query: Strategy,
    pub generic_api: Strategy,
    pub content_snapshot: Strategy,
    pub other: Strategy,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self {
            navigation: Strategy::NetworkFirstNoStore,
            directory_query: Strategy::CacheFirstPopulate,
            generic_api: Strategy::NetworkFirstCachePut,
            content_snapshot: Strategy::CacheFirstWithNetworkFallback,
            other: Strategy::StaleWhileRevalidate,
        }
    }
}

impl StrategyTable {
    /// `None` means passthrough.
    pub fn lookup(&self, class: RouteClass) -> Option<Strategy> {
        match class {
            RouteClass::ImmutableAsset => None,
            RouteClass::Navigation => Some(self.navigation),
            RouteClass::DirectoryQuery => Some(self.directory_query),
            RouteClass::GenericApi => Some(self.generic_api),
            RouteClass::ContentSnapshot => Some(self.content_snapshot),
            RouteClass::Other => Some(self.other),
        }
    }
}

/// Lookup in the default table.
pub fn strategy_for(class: RouteClass) -> Option<Strategy> {
    StrategyTable::default().lookup(class)
}
