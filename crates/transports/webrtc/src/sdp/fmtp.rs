//! Helpers for `a=fmtp` parameter strings (`key=value;key=value`)

use super::policy::ProfileLevelId;

pub const MIN_BITRATE: &str = "x-google-min-bitrate";
pub const MAX_BITRATE: &str = "x-google-max-bitrate";
pub const PROFILE_LEVEL_ID: &str = "profile-level-id";

fn entries(params: &str) -> impl Iterator<Item = &str> {
    params.split(';').map(str::trim).filter(|e| !e.is_empty())
}

fn key_of(entry: &str) -> &str {
    entry.split_once('=').map_or(entry, |(key, _)| key).trim()
}

/// Value of `key`, matched case-insensitively
pub fn param<'a>(params: &'a str, key: &str) -> Option<&'a str> {
    entries(params).find_map(|entry| {
        let (k, v) = entry.split_once('=')?;
        k.trim().eq_ignore_ascii_case(key).then(|| v.trim())
    })
}

/// Replace any bitrate bounds with exactly one min and one max of `kbps`
pub fn with_bitrate_bounds(params: &str, kbps: u32) -> String {
    let mut kept: Vec<String> = entries(params)
        .filter(|entry| {
            let key = key_of(entry);
            !key.eq_ignore_ascii_case(MIN_BITRATE) && !key.eq_ignore_ascii_case(MAX_BITRATE)
        })
        .map(str::to_string)
        .collect();

    kept.push(format!("{}={}", MIN_BITRATE, kbps));
    kept.push(format!("{}={}", MAX_BITRATE, kbps));
    kept.join(";")
}

/// Downgrade the `profile-level-id` token in place
///
/// Returns None when there is no parsable token or it is already acceptable.
pub fn downgrade_profile_level_id(params: &str) -> Option<String> {
    let mut changed = false;

    let rewritten: Vec<String> = params
        .split(';')
        .map(|entry| {
            let Some((key, value)) = entry.split_once('=') else {
                return entry.to_string();
            };
            if !key.trim().eq_ignore_ascii_case(PROFILE_LEVEL_ID) {
                return entry.to_string();
            }
            match value.trim().parse::<ProfileLevelId>() {
                Ok(id) if id.downgrade() != id => {
                    changed = true;
                    format!("{}={}", key, id.downgrade())
                }
                _ => entry.to_string(),
            }
        })
        .collect();

    changed.then(|| rewritten.join(";"))
}
