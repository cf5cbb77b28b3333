use rand::Rng;
use sha2::{Digest, Sha256};

/// Reduces a raw target (profile URL or bare handle) to a plain handle.
/// Returns `None` for inputs that do not name a single profile.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let mut rest = raw.trim();
    for scheme in ["https://", "http://"] {
        if let Some(stripped) = rest.strip_prefix(scheme) {
            rest = stripped;
            break;
        }
    }
    for host in ["www.instagram.com/", "instagram.com/"] {
        if let Some(stripped) = rest.strip_prefix(host) {
            rest = stripped;
            break;
        }
    }
    let rest = rest.trim_matches('/');
    let rest = rest.strip_prefix('@').unwrap_or(rest);

    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Stable android device identifier derived from a seed string. Same seed,
/// same device across runs.
pub fn android_device_id(seed: &str) -> String {
    let hash = Sha256::digest(seed.as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in hash.iter().take(8) {
        hex.push_str(&format!("{:02x}", byte));
    }
    format!("android-{hex}")
}

/// Uniform sample from `[min, max]` seconds. Inverted bounds are swapped
/// rather than rejected.
pub fn uniform_secs(min: u64, max: u64) -> f64 {
    let (lo, hi) = if min <= max {
        (min as f64, max as f64)
    } else {
        (max as f64, min as f64)
    };
    rand::rng().random_range(lo..=hi)
}
