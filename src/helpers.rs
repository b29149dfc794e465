//! Small helpers shared by the agent's step runner.

use std::ffi::OsString;
use std::path::PathBuf;

use rand::Rng;

/// Reported when the host name cannot be read or is not valid UTF-8.
pub const UNKNOWN_HOSTNAME: &str = "UNKNOWN_HOSTNAME";

/// Environment variables consulted for the scratch directory, in order.
const TEMP_DIR_VARS: [&str; 4] = ["TMPDIR", "TMP", "TEMP", "TEMPDIR"];

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// `len` random ASCII letters, used to name temporary script files.
#[must_use]
pub fn random_string(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(LETTERS[rng.random_range(0..LETTERS.len())]))
        .collect()
}

/// Directory for temporary step scripts: the first non-empty of `TMPDIR`,
/// `TMP`, `TEMP` and `TEMPDIR`, else the platform default (`/tmp` on Unix).
#[must_use]
pub fn temp_dir_path() -> PathBuf {
    temp_dir_from(|name| std::env::var_os(name))
}

fn temp_dir_from(lookup: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    TEMP_DIR_VARS
        .iter()
        .filter_map(|name| lookup(*name))
        .find(|value| !value.is_empty())
        .map_or_else(std::env::temp_dir, PathBuf::from)
}

/// Name this machine registers under, or [`UNKNOWN_HOSTNAME`].
#[must_use]
pub fn host_name() -> String {
    host_name_from(gethostname::gethostname())
}

fn host_name_from(raw: OsString) -> String {
    match raw.into_string() {
        Ok(name) if !name.is_empty() => name,
        _ => UNKNOWN_HOSTNAME.to_string(),
    }
}
