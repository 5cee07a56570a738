use std::fmt;

use crate::address::Address;
use crate::units::from_nano;

/// Milestones a flow reports to its operator as it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Wallet address derived, before any network call.
    WalletDerived { address: Address },
    WalletFunded { address: Address, amount_nano: u64 },
    SenderRegistered { address: Address },
    OwnerDeployed { address: Address },
    OwnershipTransferred { resource: Address, owner: Address },
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WalletDerived { address } => write!(f, "EverWallet address {address}"),
            Self::WalletFunded {
                address,
                amount_nano,
            } => write!(
                f,
                "EverWallet {address} funded with {} tokens",
                from_nano(*amount_nano)
            ),
            Self::SenderRegistered { address } => write!(f, "sender wallet {address}"),
            Self::OwnerDeployed { address } => write!(f, "anyOwner deployed {address}"),
            Self::OwnershipTransferred { resource, owner } => {
                write!(f, "ownership of {resource} transferred to {owner}")
            }
        }
    }
}

/// Callback receiving [`Progress`] events.
pub type ProgressFn = Box<dyn Fn(&Progress) + Send + Sync>;

pub(crate) fn silent() -> ProgressFn {
    Box::new(|_| {})
}
