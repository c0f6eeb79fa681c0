//! Page access permissions.

/// Access level requested when fetching a page.
///
/// Maps one-to-one onto lock modes: `ReadOnly` takes a shared lock,
/// `ReadWrite` an exclusive one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}
