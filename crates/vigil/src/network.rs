//! Networks selectable from the wallet's network dropdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::result::VigilError;

/// A network the wallet can be pointed at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Network {
    /// POA core network
    Poa,
    /// Sokol test network
    Sokol,
    /// Ethereum mainnet
    Mainnet,
    /// Ropsten test network
    Ropsten,
    /// Kovan test network
    Kovan,
    /// Rinkeby test network
    Rinkeby,
    /// Local node (e.g. ganache)
    Localhost,
    /// Custom RPC endpoint
    Custom(String),
}

impl Network {
    /// Built-in networks in dropdown order
    pub const BUILTIN: [Self; 7] = [
        Self::Poa,
        Self::Sokol,
        Self::Mainnet,
        Self::Ropsten,
        Self::Kovan,
        Self::Rinkeby,
        Self::Localhost,
    ];

    /// Provider type string understood by `setProviderType`
    #[must_use]
    pub fn provider_type(&self) -> &str {
        match self {
            Self::Poa => "poa",
            Self::Sokol => "sokol",
            Self::Mainnet => "mainnet",
            Self::Ropsten => "ropsten",
            Self::Kovan => "kovan",
            Self::Rinkeby => "rinkeby",
            Self::Localhost => "localhost",
            Self::Custom(url) => url,
        }
    }

    /// Position of the network in the dropdown menu
    #[must_use]
    pub const fn dropdown_index(&self) -> usize {
        match self {
            Self::Poa => 0,
            Self::Sokol => 1,
            Self::Mainnet => 2,
            Self::Ropsten => 3,
            Self::Kovan => 4,
            Self::Rinkeby => 5,
            Self::Localhost => 6,
            Self::Custom(_) => 7,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_type())
    }
}

impl FromStr for Network {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let network = match s.trim().to_ascii_lowercase().as_str() {
            "poa" => Self::Poa,
            "sokol" => Self::Sokol,
            "mainnet" => Self::Mainnet,
            "ropsten" => Self::Ropsten,
            "kovan" => Self::Kovan,
            "rinkeby" => Self::Rinkeby,
            "localhost" => Self::Localhost,
            lower if lower.starts_with("http://") || lower.starts_with("https://") => {
                Self::Custom(s.trim().to_string())
            }
            _ => {
                return Err(VigilError::Config {
                    message: format!("unknown network: {s}"),
                })
            }
        };
        Ok(network)
    }
}

impl TryFrom<String> for Network {
    type Error = VigilError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.provider_type().to_string()
    }
}
