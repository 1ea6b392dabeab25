//! Salted, stretched password hashing with two interoperable text formats:
//! a self-contained portable scheme (`$P$`, iterated MD5) and delegation to
//! a bcrypt-style adaptive primitive (`$2a$`).
//!
//! New hashes prefer the adaptive primitive when one is available and fall
//! back to the portable scheme otherwise. Verification dispatches on the
//! stored hash's format tag, so hashes written years ago with different
//! cost parameters keep verifying. Malformed or attacker-controlled stored
//! hashes never raise; they simply fail to verify.

mod b64;
mod blowfish;
mod portable;

pub(crate) const MIN_COST: u32 = 4;
pub(crate) const MAX_COST: u32 = 31;

/// Stretch exponent used when none is configured.
pub const DEFAULT_COST: u32 = 8;

/// `crypt(3)`-style failure tokens. Two distinct values so a failed hash
/// attempt can never equal another failed attempt, and neither can be made
/// to verify by storing the token itself.
pub const FAILURE_TOKEN: &str = "*0";
pub const FAILURE_TOKEN_ALT: &str = "*1";

/// Host adaptive hashing capability: `(secret, setting) -> hash`.
///
/// The setting follows the `$2a$NN$<22 symbols>` shape; the returned text
/// is either a 60-character hash sharing that setting prefix, or a short
/// failure string. Callers only ever check the output's shape.
pub type CryptFn = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Hashes secrets and verifies them against previously stored hashes.
///
/// Configuration is fixed at construction: the stretch exponent is clamped
/// into [4,31] (never rejected), and `portable_only` pins new hashes to the
/// portable format. Calls share no mutable state, so one hasher can serve
/// any number of threads.
///
/// ```
/// use phpass::PasswordHasher;
///
/// let hasher = PasswordHasher::new(8, true);
/// let hash = hasher.hash_secret("correct horse");
/// assert!(hasher.verify_secret("correct horse", &hash));
/// assert!(!hasher.verify_secret("battery staple", &hash));
/// ```
pub struct PasswordHasher {
    count_log2: u32,
    portable_only: bool,
    crypt: Option<CryptFn>,
}

enum StoredFormat {
    Sentinel,
    Portable,
    Delegated,
}

impl PasswordHasher {
    /// Hasher backed by the built-in adaptive primitive. `portable_only`
    /// affects new hashes only; delegated hashes always stay verifiable.
    pub fn new(count_log2: u32, portable_only: bool) -> Self {
        PasswordHasher {
            count_log2: count_log2.clamp(MIN_COST, MAX_COST),
            portable_only,
            crypt: Some(Box::new(blowfish::system_crypt)),
        }
    }

    /// Hasher with a caller-supplied crypt capability, or `None` for an
    /// environment that has no adaptive primitive at all.
    pub fn with_crypt(count_log2: u32, crypt: Option<CryptFn>) -> Self {
        PasswordHasher {
            count_log2: count_log2.clamp(MIN_COST, MAX_COST),
            portable_only: false,
            crypt,
        }
    }

    /// The clamped stretch exponent this hasher was constructed with.
    pub fn iteration_count_log2(&self) -> u32 {
        self.count_log2
    }

    /// Hash `secret` under a fresh random salt.
    ///
    /// Returns a 60-character delegated hash when the adaptive primitive is
    /// available and behaves, otherwise a 34-character portable hash. Never
    /// returns an empty string; if hashing itself misbehaves the result is
    /// [`FAILURE_TOKEN`], which no verification will ever accept.
    pub fn hash_secret(&self, secret: &str) -> String {
        if !self.portable_only {
            if let Some(crypt) = &self.crypt {
                let setting = blowfish::gen_setting(self.count_log2);
                let hash = crypt(secret, &setting);
                if hash.len() == blowfish::HASH_LEN {
                    return hash;
                }
            }
        }

        let setting = portable::gen_setting(self.count_log2);
        match portable::crypt(secret, &setting) {
            Some(hash) if hash.len() == portable::HASH_LEN => hash,
            _ => FAILURE_TOKEN.to_string(),
        }
    }

    /// Check `secret` against a stored hash in either format.
    ///
    /// Malformed input, unknown formats, and the failure tokens all return
    /// `false`; nothing here panics or reports partial matches.
    pub fn verify_secret(&self, secret: &str, stored: &str) -> bool {
        match classify(stored) {
            StoredFormat::Sentinel => false,
            StoredFormat::Portable => portable::verify(secret, stored),
            StoredFormat::Delegated => match &self.crypt {
                Some(crypt) => blowfish::verify(secret, stored, crypt),
                None => false,
            },
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        PasswordHasher::new(DEFAULT_COST, false)
    }
}

fn classify(stored: &str) -> StoredFormat {
    if stored == FAILURE_TOKEN || stored == FAILURE_TOKEN_ALT {
        StoredFormat::Sentinel
    } else if portable::recognizes(stored) {
        StoredFormat::Portable
    } else {
        StoredFormat::Delegated
    }
}

// Full-length comparison; never short-circuits on the first mismatch.
pub(crate) fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
