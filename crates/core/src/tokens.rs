//! Kinds of bearer token the server issues.

use serde::{Deserialize, Serialize};

/// Version of the claims layout embedded in every token.
pub const CLAIMS_VERSION: u8 = 1;

/// Which half of a token pair a token is.
///
/// Only [`TokenKind::Access`] may authorize a request; [`TokenKind::Refresh`]
/// is accepted solely by the refresh flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
