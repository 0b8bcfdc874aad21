/// Router Module Index
///
/// Routes are grouped by the access they require, and the gate for each group
/// is applied once in `create_router` as a route layer. All paths here are
/// relative to the `/api` prefix.

/// Routes open to anonymous clients.
pub mod public;

/// Routes requiring a valid token, with any role.
pub mod authenticated;

/// Routes requiring a token with the `Student` role.
pub mod student;

/// Routes requiring a token with the `Admin` role (admin users and experts).
pub mod admin;
