//! Names of the remote-call methods.
//!
//! Every method is served at `POST /v1/<Name>`. The auth middleware resolves
//! the method from the request path to decide whether a token is required.

use std::fmt;

const PATH_PREFIX: &str = "/v1/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    Create,
    Enter,
    InsertCredential,
    InsertCard,
    InsertText,
    InsertBinary,
    GetCredential,
    GetCard,
    GetText,
    GetBinary,
    UpdateCredential,
    UpdateCard,
    UpdateText,
    UpdateBinary,
    DeleteItem,
    DeleteAll,
    ListInfo,
}

impl RpcMethod {
    pub const ALL: [Self; 17] = [
        Self::Create,
        Self::Enter,
        Self::InsertCredential,
        Self::InsertCard,
        Self::InsertText,
        Self::InsertBinary,
        Self::GetCredential,
        Self::GetCard,
        Self::GetText,
        Self::GetBinary,
        Self::UpdateCredential,
        Self::UpdateCard,
        Self::UpdateText,
        Self::UpdateBinary,
        Self::DeleteItem,
        Self::DeleteAll,
        Self::ListInfo,
    ];

    /// Route path for this method.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Create => "/v1/Create",
            Self::Enter => "/v1/Enter",
            Self::InsertCredential => "/v1/InsertCredential",
            Self::InsertCard => "/v1/InsertCard",
            Self::InsertText => "/v1/InsertText",
            Self::InsertBinary => "/v1/InsertBinary",
            Self::GetCredential => "/v1/GetCredential",
            Self::GetCard => "/v1/GetCard",
            Self::GetText => "/v1/GetText",
            Self::GetBinary => "/v1/GetBinary",
            Self::UpdateCredential => "/v1/UpdateCredential",
            Self::UpdateCard => "/v1/UpdateCard",
            Self::UpdateText => "/v1/UpdateText",
            Self::UpdateBinary => "/v1/UpdateBinary",
            Self::DeleteItem => "/v1/DeleteItem",
            Self::DeleteAll => "/v1/DeleteAll",
            Self::ListInfo => "/v1/ListInfo",
        }
    }

    /// Bare method name, e.g. `InsertCard`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.path().trim_start_matches(PATH_PREFIX)
    }

    /// Resolve a request path to a method.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.path() == path)
    }

    /// Create and Enter are how a caller obtains a token, so they run
    /// without one.
    #[must_use]
    pub const fn is_bootstrap(self) -> bool {
        matches!(self, Self::Create | Self::Enter)
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
