/// Wallet contract every signer's address is derived against.
pub const EVER_WALLET: &str = "EverWallet";

/// Owner contract deployed to hold authority over a token root.
pub const ANY_OWNER: &str = "AnyOwner";

/// Upgradeable TIP-3 token root whose ownership is transferred.
pub const TOKEN_ROOT_UPGRADEABLE: &str = "TokenRootUpgradeable";

/// Code hash of the EverWallet contract.
pub const EVER_WALLET_CODE_HASH: [u8; 32] = [
    0x3b, 0xa6, 0x52, 0x8a, 0xb2, 0x69, 0x4c, 0x11, 0x81, 0x80, 0xaa, 0x3b, 0xd1, 0x0d, 0xd1, 0x9f,
    0xf4, 0x00, 0xb9, 0x09, 0xab, 0x4d, 0xcf, 0x58, 0xfc, 0x69, 0x92, 0x5b, 0x2c, 0x7b, 0x12, 0xa6,
];

/// Static variable of [`ANY_OWNER`] naming the token root it guards.
pub const ANY_OWNER_TOKEN_ROOT_PARAM: &str = "tokenRoot_";

pub const TRANSFER_OWNERSHIP: &str = "transferOwnership";
pub const OWNER_GETTER: &str = "rootOwner";

/// ABI fragment for a contract template, forwarded to the toolkit so it can
/// encode calls against deployed instances.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    pub name: &'static str,
    pub abi: serde_json::Value,
}

impl ContractAbi {
    /// Whether the ABI declares a function called `method`.
    pub fn has_function(&self, method: &str) -> bool {
        self.abi["functions"]
            .as_array()
            .is_some_and(|fns| fns.iter().any(|f| f["name"] == method))
    }
}

/// Returns the ABI fragment for a known template, or `None`.
pub fn get_contract_abi(template: &str) -> Option<ContractAbi> {
    match template {
        TOKEN_ROOT_UPGRADEABLE => Some(token_root_abi()),
        ANY_OWNER => Some(any_owner_abi()),
        _ => None,
    }
}

/// The subset of the token root ABI used for ownership management.
fn token_root_abi() -> ContractAbi {
    let abi = serde_json::json!({
        "ABI version": 2,
        "version": "2.2",
        "header": ["pubkey", "time", "expire"],
        "functions": [
            {
                "name": TRANSFER_OWNERSHIP,
                "inputs": [
                    { "name": "newOwner", "type": "address" },
                    { "name": "remainingGasTo", "type": "address" },
                    {
                        "name": "callbacks",
                        "type": "map(address,tuple)",
                        "components": [
                            { "name": "value", "type": "uint128" },
                            { "name": "payload", "type": "cell" }
                        ]
                    }
                ],
                "outputs": []
            },
            {
                "name": OWNER_GETTER,
                "inputs": [{ "name": "answerId", "type": "uint32" }],
                "outputs": [{ "name": "value0", "type": "address" }]
            }
        ],
        "events": []
    });
    ContractAbi {
        name: TOKEN_ROOT_UPGRADEABLE,
        abi,
    }
}

fn any_owner_abi() -> ContractAbi {
    let abi = serde_json::json!({
        "ABI version": 2,
        "version": "2.2",
        "header": ["pubkey", "time", "expire"],
        "functions": [
            { "name": "constructor", "inputs": [], "outputs": [] }
        ],
        "fields": [
            { "name": "_pubkey", "type": "uint256" },
            { "name": ANY_OWNER_TOKEN_ROOT_PARAM, "type": "address" }
        ],
        "events": []
    });
    ContractAbi {
        name: ANY_OWNER,
        abi,
    }
}
