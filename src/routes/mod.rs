/// Router Module Index
///
/// Groups the API surface by domain. Access control is not applied per module: every
/// `/api` route passes through the single authorization interceptor, which consults the
/// policy table. A route added here without a matching policy entry is denied.

/// Unauthenticated gateway routes and the caller's own profile.
pub mod public;

/// Shares and payments, the ownership-sensitive reads.
pub mod portfolio;

/// Trailers and their tracking feeds.
pub mod fleet;

/// Payout generation.
pub mod finance;
