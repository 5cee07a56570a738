use crate::error::DeployError;

/// Nano-units per whole native token.
pub const NANO_PER_TOKEN: u64 = 1_000_000_000;

/// Convert whole tokens to nano-units.
pub fn to_nano(tokens: u64) -> Result<u64, DeployError> {
    tokens
        .checked_mul(NANO_PER_TOKEN)
        .ok_or(DeployError::AmountOverflow(tokens))
}

/// Render a nano amount as a decimal token string, e.g. `2.5`.
pub fn from_nano(nano: u64) -> String {
    let whole = nano / NANO_PER_TOKEN;
    let frac = nano % NANO_PER_TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:09}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
