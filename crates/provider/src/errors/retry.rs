/// Classification for retry policy.
///
/// Used by the retry policy to decide whether a failed provider call
/// should be attempted again.
///
/// # Behavior Summary
///
/// | Class | Retry? | Typical cause |
/// |-------|--------|---------------|
/// | `Never` | No | bad credentials, malformed request, undecodable body |
/// | `WithBackoff` | Yes, after an exponential wait | connection reset, timeout, HTTP 5xx/429 |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the request is fundamentally invalid or unauthorized.
    Never,

    /// Transient failure - retry after waiting.
    WithBackoff,
}

/// A failure that knows whether it is worth retrying.
///
/// The retry policy only consults this predicate; it never inspects
/// concrete error variants.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}
