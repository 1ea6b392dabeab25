//! The self-contained portable scheme: `$P$` (or the phpBB3-era `$H$`
//! alias), a salted MD5 stretched through `1 << count_log2` rounds.
//!
//! Output layout is fixed at 34 characters: 3-char prefix, 1 cost symbol,
//! 8 salt symbols, 22 digest symbols. The digest is computed over the salt
//! *symbols*, not their decoded bytes, so hashes written by older
//! deployments keep verifying.

use md5::{Digest, Md5};

use crate::b64;
use crate::{MAX_COST, MIN_COST};

pub(crate) const HASH_LEN: usize = 34;
pub(crate) const SETTING_LEN: usize = 12;
pub(crate) const SALT_LEN: usize = 6;
pub(crate) const PREFIX: &str = "$P$";
pub(crate) const LEGACY_PREFIX: &str = "$H$";

/// `"$P$"` + cost symbol + 8 encoded salt symbols, 10 characters.
pub(crate) fn build_setting(count_log2: u32, salt: &[u8; SALT_LEN]) -> String {
    let count_log2 = count_log2.clamp(MIN_COST, MAX_COST);
    let mut setting = String::with_capacity(SETTING_LEN - 2);
    setting.push_str(PREFIX);
    setting.push(b64::ALPHABET[count_log2 as usize] as char);
    setting.push_str(&b64::encode(salt));
    setting
}

/// Fresh setting from 6 bytes of CSPRNG output.
pub(crate) fn gen_setting(count_log2: u32) -> String {
    use rand::RngCore;

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    build_setting(count_log2, &salt)
}

/// Run the stretch for `setting` and return the full 34-char hash, echoing
/// the first 12 setting characters. `None` on any malformed setting.
pub(crate) fn crypt(secret: &str, setting: &str) -> Option<String> {
    let bytes = setting.as_bytes();
    if bytes.len() < SETTING_LEN {
        return None;
    }
    let prefix = &bytes[..3];
    if prefix != PREFIX.as_bytes() && prefix != LEGACY_PREFIX.as_bytes() {
        return None;
    }

    // An in-alphabet cost symbol outside [4,31] is clamped, never rejected;
    // hand-edited settings from old installs stay verifiable.
    let count_log2 = u32::from(b64::index_of(bytes[3])?).clamp(MIN_COST, MAX_COST);

    let salt = &bytes[4..SETTING_LEN];
    if salt.iter().any(|&c| b64::index_of(c).is_none()) {
        return None;
    }

    let mut state = digest(salt, secret.as_bytes());
    let mut count = 1u64 << count_log2;
    while count > 0 {
        state = digest(&state, secret.as_bytes());
        count -= 1;
    }

    let mut output = String::with_capacity(HASH_LEN);
    output.push_str(std::str::from_utf8(&bytes[..SETTING_LEN]).ok()?);
    output.push_str(&b64::encode(&state));
    Some(output)
}

pub(crate) fn verify(secret: &str, stored: &str) -> bool {
    if stored.len() != HASH_LEN {
        return false;
    }
    match crypt(secret, stored) {
        Some(computed) => crate::constant_time_compare(computed.as_bytes(), stored.as_bytes()),
        None => false,
    }
}

/// Format sniff used by the facade: exact length plus a known prefix.
pub(crate) fn recognizes(stored: &str) -> bool {
    let bytes = stored.as_bytes();
    bytes.len() == HASH_LEN
        && (bytes.starts_with(PREFIX.as_bytes()) || bytes.starts_with(LEGACY_PREFIX.as_bytes()))
}

fn digest(head: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(head);
    hasher.update(secret);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published vector from the original phpass test program.
    const KNOWN_HASH: &str = "$P$9IQRaTwmfeRo7ud9Fh4E2PdI0S3r.L0";

    #[test]
    fn known_vector() {
        assert_eq!(crypt("test12345", KNOWN_HASH).as_deref(), Some(KNOWN_HASH));
        assert!(verify("test12345", KNOWN_HASH));
        assert!(!verify("test12346", KNOWN_HASH));
    }

    #[test]
    fn legacy_prefix_alias() {
        let legacy = KNOWN_HASH.replacen("$P$", "$H$", 1);
        assert!(verify("test12345", &legacy));
        assert!(recognizes(&legacy));
    }

    #[test]
    fn fixed_salt_is_deterministic() {
        let setting = build_setting(8, b"abcdef");
        assert_eq!(setting.len(), SETTING_LEN - 2);

        let first = crypt("correct horse", &setting).unwrap();
        let second = crypt("correct horse", &setting).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), HASH_LEN);
        assert!(first.starts_with(&setting));
    }

    #[test]
    fn setting_cost_symbol_clamps() {
        let salt = *b"abcdef";
        assert_eq!(build_setting(8, &salt).as_bytes()[3], b'6');
        assert_eq!(build_setting(2, &salt).as_bytes()[3], b'2'); // clamped to 4
        assert_eq!(build_setting(40, &salt).as_bytes()[3], b'T'); // clamped to 31
    }

    #[test]
    fn out_of_range_cost_symbol_is_clamped_on_parse() {
        // '.' decodes to 0 and is clamped to 4, the same cost '2' encodes.
        let low = crypt("secret", "$P$.abcdefgh").unwrap();
        let floor = crypt("secret", "$P$2abcdefgh").unwrap();
        assert_eq!(&low[SETTING_LEN..], &floor[SETTING_LEN..]);
    }

    #[test]
    fn recomputes_suffix_from_embedded_setting() {
        let setting = gen_setting(8);
        let hash = crypt("correct horse", &setting).unwrap();
        assert_eq!(hash.len(), HASH_LEN);
        assert!(hash.starts_with("$P$"));

        let recomputed = crypt("correct horse", &hash).unwrap();
        assert_eq!(recomputed, hash);
    }

    #[test]
    fn malformed_settings_fail() {
        assert!(crypt("x", "").is_none());
        assert!(crypt("x", "$P$").is_none());
        assert!(crypt("x", "$Q$9IQRaTwmfeRo7ud9Fh4E2PdI0S3r.L0").is_none());
        // '!' is not an alphabet symbol.
        assert!(crypt("x", "$P$!IQRaTwmf").is_none());
        assert!(crypt("x", "$P$9IQRaTw!feRo7ud9Fh4E2PdI0S3r.L0").is_none());
        // Multi-byte input must be rejected, not panicked on.
        assert!(crypt("x", "$P$щщщщщщщщщ").is_none());

        assert!(!verify("x", "$P$9IQRaTwmfeRo7ud9Fh4E2PdI0S3r.L")); // 33 chars
        assert!(!verify("x", &format!("{}0", KNOWN_HASH))); // 35 chars
    }
}
