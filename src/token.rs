use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// How a token contract relates to the avatar whose value it carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    /// A personal token held directly under the avatar's own address.
    Avatar,
    /// An ERC-20 wrapper whose economic owner is a different avatar.
    WrappedErc20,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub kind: TokenKind,
    pub owner: Address,
}

/// The one place wrapped-token ownership is decided.
pub trait TokenClassifier {
    fn classify(&self, token: Address) -> Option<TokenInfo>;
}

/// In-memory classifier backed by a token → info table.
#[derive(Clone, Debug, Default)]
pub struct TokenRegistry {
    entries: BTreeMap<Address, TokenInfo>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: Address, info: TokenInfo) {
        self.entries.insert(token, info);
    }

    /// Registers a personal token owned by its own address.
    pub fn register_avatar(&mut self, token: Address) {
        self.insert(
            token,
            TokenInfo {
                kind: TokenKind::Avatar,
                owner: token,
            },
        );
    }

    /// Registers a wrapper contract owned by `owner`.
    pub fn register_wrapped(&mut self, token: Address, owner: Address) {
        self.insert(
            token,
            TokenInfo {
                kind: TokenKind::WrappedErc20,
                owner,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TokenClassifier for TokenRegistry {
    fn classify(&self, token: Address) -> Option<TokenInfo> {
        self.entries.get(&token).copied()
    }
}

/// Resolves each distinct token to its owning avatar address.
///
/// A classifier miss degrades to the token owning itself; it is logged and
/// never fails the caller.
pub fn resolve_owners(
    tokens: impl IntoIterator<Item = Address>,
    classifier: &impl TokenClassifier,
) -> BTreeMap<Address, Address> {
    tokens
        .into_iter()
        .map(|token| {
            let owner = match classifier.classify(token) {
                Some(info) => info.owner,
                None => {
                    log::warn!("no wrapper info for token {token}, defaulting owner to itself");
                    token
                }
            };
            (token, owner)
        })
        .collect()
}
