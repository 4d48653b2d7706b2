//! Realm discovery and address resolution for Realmgate.
//!
//! Given an authenticated account, this crate answers "where do I
//! connect?":
//!
//! 1. **List** the account's realms through the [`RealmDirectory`]
//!    (bounded retry).
//! 2. **Select** one by exact, case-sensitive name ([`select_realm`]).
//!    Missing and duplicate names come back as values
//!    ([`RealmSelection::NotFound`], [`RealmSelection::Ambiguous`]),
//!    never as a silent "first match".
//! 3. **Resolve** the chosen realm's address and normalize whatever
//!    shape the directory returned ([`RawAddress`]) into a
//!    [`ResolvedAddress`](realmgate_protocol::ResolvedAddress).
//!
//! # Key types
//!
//! - [`RealmResolver`]: runs the three steps against a directory
//! - [`RealmDescriptor`] / [`RealmState`]: a realm listing entry
//! - [`RawAddress`] / [`normalize_address`]: address shape handling

mod address;
mod directory;
mod error;
mod realm;
mod resolver;

pub use address::{normalize_address, RawAddress};
pub use directory::{DirectoryError, RealmDirectory};
pub use error::RealmError;
pub use realm::{RealmDescriptor, RealmState};
pub use resolver::{
    default_directory_retry, select_realm, RealmResolver, RealmSelection,
    SelectionPolicy,
};
