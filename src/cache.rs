//! Cache keys for request-scoped memoization.
//!
//! The executor stores nothing. A hosting framework may memoize identical calls
//! made within one execution context, and asks for the key here.

use crate::request::RequestSpec;

/// Derives the cache key of a call.
///
/// * `None` when caching is disabled.
/// * The canonical form of the request URL when caching is enabled and an
///   execution context is active.
/// * `None`, with a warning, when caching is enabled but no context is active.
///   The call itself still proceeds, just uncached.
///
/// # Examples
///
/// ```
/// use interlink::{cache::cache_key, RequestSpec};
///
/// # fn example() -> Result<(), interlink::Error> {
/// let spec = RequestSpec::parse_get("http://ways.internal/ways/7")?;
///
/// assert_eq!(cache_key(&spec, true, true).as_deref(), Some("http://ways.internal/ways/7"));
/// assert_eq!(cache_key(&spec, false, true), None);
/// assert_eq!(cache_key(&spec, true, false), None);
/// # Ok(())
/// # }
/// ```
pub fn cache_key(spec: &RequestSpec, caching_enabled: bool, context_active: bool) -> Option<String> {
    if !caching_enabled {
        return None;
    }

    if !context_active {
        tracing::warn!(
            url = %spec.url(),
            "Caching is enabled but no execution context is active, caching is disabled for this call"
        );
        return None;
    }

    Some(spec.url().to_string())
}
