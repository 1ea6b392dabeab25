//! The delegated scheme: build a `$2a$NN$<22 symbols>` setting, hand the
//! actual stretching to the host's adaptive primitive, and trust nothing
//! about the result beyond its shape.

use std::error::Error;
use std::fmt;

use bcrypt::Version;

use crate::b64;
use crate::{MAX_COST, MIN_COST};

pub(crate) const HASH_LEN: usize = 60;
pub(crate) const SETTING_LEN: usize = 29;
pub(crate) const SALT_LEN: usize = 16;
const SALT_SYMBOLS: usize = 22;

// The primitive reads salt symbols in bcrypt's own order, which differs
// from the portable alphabet.
const BCRYPT_ALPHABET: &[u8; 64] =
    b"./ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug)]
pub(crate) enum SettingError {
    UnknownScheme,
    InvalidCost,
    InvalidSalt,
    Backend,
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SettingError::UnknownScheme => write!(f, "unrecognized scheme identifier"),
            SettingError::InvalidCost => write!(f, "cost digits missing or out of range"),
            SettingError::InvalidSalt => write!(f, "salt is not 22 bcrypt base64 symbols"),
            SettingError::Backend => write!(f, "bcrypt backend refused the input"),
        }
    }
}

impl Error for SettingError {}

/// `"$2a$"` + zero-padded two-digit cost + `"$"` + 22 salt symbols.
///
/// Cost digits come from integer arithmetic only; the salt keeps the first
/// 22 symbols of the encoding, the defined salt width for this format.
pub(crate) fn build_setting(cost: u32, salt: &[u8; SALT_LEN]) -> String {
    let cost = cost.clamp(MIN_COST, MAX_COST);
    let mut setting = String::with_capacity(SETTING_LEN);
    setting.push_str("$2a$");
    setting.push_str(&format!("{:02}", cost));
    setting.push('$');
    let encoded = b64::encode(salt);
    setting.push_str(&encoded[..SALT_SYMBOLS]);
    setting
}

/// Fresh setting from 16 bytes of CSPRNG output.
pub(crate) fn gen_setting(cost: u32) -> String {
    use rand::RngCore;

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    build_setting(cost, &salt)
}

/// The built-in host primitive, `crypt(3)`-shaped: takes a secret and a
/// setting, returns either a full hash sharing the setting's scheme and
/// cost, or the failure token. Never panics on attacker-controlled input.
pub(crate) fn system_crypt(secret: &str, setting: &str) -> String {
    match delegate(secret, setting) {
        Ok(hash) => hash,
        Err(_) => crate::FAILURE_TOKEN.to_string(),
    }
}

fn delegate(secret: &str, setting: &str) -> Result<String, SettingError> {
    let (version, cost, salt) = parse_setting(setting)?;
    let parts = bcrypt::hash_with_salt(secret, cost, salt).map_err(|_| SettingError::Backend)?;
    Ok(parts.format_for_version(version))
}

/// Re-run the primitive with the stored hash as its own setting and compare.
/// Anything that is not exactly 60 characters is a failure, not an error.
pub(crate) fn verify<C>(secret: &str, stored: &str, crypt: C) -> bool
where
    C: Fn(&str, &str) -> String,
{
    let computed = crypt(secret, stored);
    if computed.len() != HASH_LEN {
        return false;
    }
    crate::constant_time_compare(computed.as_bytes(), stored.as_bytes())
}

fn parse_setting(setting: &str) -> Result<(Version, u32, [u8; SALT_LEN]), SettingError> {
    let bytes = setting.as_bytes();
    if bytes.len() < SETTING_LEN || bytes[0] != b'$' || bytes[3] != b'$' || bytes[6] != b'$' {
        return Err(SettingError::UnknownScheme);
    }

    let version = match &bytes[1..3] {
        b"2a" => Version::TwoA,
        b"2b" => Version::TwoB,
        b"2x" => Version::TwoX,
        b"2y" => Version::TwoY,
        _ => return Err(SettingError::UnknownScheme),
    };

    let cost = match (bytes[4], bytes[5]) {
        (tens @ b'0'..=b'9', ones @ b'0'..=b'9') => {
            u32::from(tens - b'0') * 10 + u32::from(ones - b'0')
        }
        _ => return Err(SettingError::InvalidCost),
    };
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        return Err(SettingError::InvalidCost);
    }

    let salt = decode_salt(&bytes[7..SETTING_LEN])?;
    Ok((version, cost, salt))
}

// 22 symbols carry 132 bits; the last 4 are dangling and discarded.
fn decode_salt(symbols: &[u8]) -> Result<[u8; SALT_LEN], SettingError> {
    let mut salt = [0u8; SALT_LEN];
    let mut filled = 0;
    let mut buf = 0u32;
    let mut bits = 0;

    for &symbol in symbols {
        let value = BCRYPT_ALPHABET
            .iter()
            .position(|&c| c == symbol)
            .ok_or(SettingError::InvalidSalt)? as u32;

        buf = (buf << 6) | value;
        bits += 6;

        if bits >= 8 {
            bits -= 8;
            if filled < SALT_LEN {
                salt[filled] = (buf >> bits) as u8;
                filled += 1;
            }
            buf &= (1 << bits) - 1;
        }
    }

    if filled != SALT_LEN {
        return Err(SettingError::InvalidSalt);
    }
    Ok(salt)
}
