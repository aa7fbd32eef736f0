/// Router Module Index
///
/// Splits the HTTP surface by who may call it. The split mirrors the access
/// table: the public router needs no identity, the authenticated router runs
/// behind the `AuthUser` extraction layer, and the admin router additionally
/// relies on the role check inside every moderation operation.

/// Routes reachable without an identity (health, accounts, approved markers, weather).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// Moderation routes, nested under `/api/admin`.
pub mod admin;
