use uuid::Uuid;

/// Mint a fresh opaque session token.
pub fn mint() -> String {
    Uuid::new_v4().to_string()
}

/// Tokens minted here are hyphenated UUIDs; anything else was never ours.
pub fn is_well_formed(token: &str) -> bool {
    Uuid::try_parse(token).is_ok()
}
