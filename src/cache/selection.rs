use std::sync::Arc;

use tracing::debug;

use super::provider::CacheProvider;

/// Choose a provider among the candidates discovered at startup.
///
/// 1. A provider whose name matches `preferred_name` (ignoring case) and
///    that is available.
/// 2. Otherwise the sole candidate, if available.
/// 3. Otherwise, with exactly two candidates, the available non-default one,
///    falling back to any available one.
///
/// Returns `None` when no rule applies; the caller keeps its built-in
/// provider.
pub fn select_cache_provider(
    candidates: &[Arc<dyn CacheProvider>],
    preferred_name: Option<&str>,
) -> Option<Arc<dyn CacheProvider>> {
    if let Some(name) = preferred_name.filter(|n| !n.is_empty()) {
        let named = candidates
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name) && p.is_available());
        if let Some(provider) = named {
            debug!(provider = provider.name(), "Selected cache provider by name");
            return Some(provider.clone());
        }
    }

    let selected = match candidates {
        [only] if only.is_available() => Some(only.clone()),
        [_, _] => candidates
            .iter()
            .find(|p| !p.is_default() && p.is_available())
            .or_else(|| candidates.iter().find(|p| p.is_available()))
            .cloned(),
        _ => None,
    };

    match selected {
        Some(ref provider) => debug!(provider = provider.name(), "Selected cache provider"),
        None => debug!(
            candidates = candidates.len(),
            "No cache provider selected, keeping the built-in one"
        ),
    }
    selected
}
