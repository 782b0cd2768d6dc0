// ─── Version Ordering ───
// A deliberately loose ordering: not semver precedence. Build metadata is
// ignored and every hyphenated suffix counts the same as any other.

use std::cmp::Ordering;

/// Compare two version strings numerically.
///
/// One leading `v` is stripped, the rest is split on `.` and compared
/// component-wise. Each component contributes its leading digits (so `0-beta`
/// is 0 and `rc1` is 0); missing trailing components count as 0.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = strip_v(a).split('.').collect();
    let right: Vec<&str> = strip_v(b).split('.').collect();
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).map_or(0, |c| numeric_component(c));
        let r = right.get(i).map_or(0, |c| numeric_component(c));
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// A version with a literal hyphen is treated as a pre-release.
pub fn is_prerelease(version: &str) -> bool {
    version.contains('-')
}

/// Pick the latest version out of `versions`.
///
/// Folds left to right keeping a running best: a stable version always beats
/// a pre-release, otherwise the numerically larger one wins. Exact numeric
/// ties keep whichever came first.
pub fn pick_latest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().reduce(|best, candidate| {
        match (is_prerelease(best), is_prerelease(candidate)) {
            (false, true) => best,
            (true, false) => candidate,
            _ if compare_versions(candidate, best) == Ordering::Greater => candidate,
            _ => best,
        }
    })
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

fn numeric_component(component: &str) -> u64 {
    let digits = component
        .find(|c: char| !c.is_ascii_digit())
        .map_or(component, |end| &component[..end]);
    digits.parse().unwrap_or(0)
}
