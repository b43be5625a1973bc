/// Router Module Index
///
/// Splits the HTTP surface by the access it needs. Authentication is applied per module
/// with a route layer in `create_router`; capability checks stay inside the services, so a
/// handler can never skip them.

/// Routes open to anonymous clients (read-only, published content only).
pub mod public;

/// Routes requiring a validated session: authoring, previews and engagement.
pub mod authenticated;

/// Routes for moderators and admins, nested under `/moderation`.
pub mod moderation;
