//! Applying a [`Patch`] to a text that may have drifted from the one it was
//! computed against.
//!
//! Each hunk's old side (context + removed lines) must appear verbatim in the
//! target. The search starts where the hunk is expected, adjusted by the
//! drift of previously applied hunks, and widens one line at a time in both
//! directions. There is no fuzz: context is never partially matched. Hunks
//! apply in order and never overlap.

use crate::error::ApplyError;
use crate::patch::Patch;

/// Apply `patch` to `target`.
///
/// All hunks must apply; otherwise the indices of the rejected hunks are
/// returned and no partial result is produced.
pub fn apply(patch: &Patch, target: &str) -> Result<String, ApplyError> {
    let lines: Vec<&str> = target.split_inclusive('\n').collect();
    let mut out = String::with_capacity(target.len());
    let mut cursor = 0usize;
    let mut drift = 0isize;
    let mut rejected = Vec::new();

    for (index, hunk) in patch.hunks.iter().enumerate() {
        let old_side: Vec<&str> = hunk.old_side().collect();
        let expected = (hunk.old_start as isize + drift).max(0) as usize;

        match locate(&lines, &old_side, expected, cursor) {
            Some(at) => {
                out.extend(lines[cursor..at].iter().copied());
                out.extend(hunk.new_side());
                cursor = at + old_side.len();
                drift = at as isize - hunk.old_start as isize;
            }
            None => rejected.push(index),
        }
    }

    if !rejected.is_empty() {
        return Err(ApplyError::Rejected {
            rejected,
            total: patch.hunks.len(),
        });
    }

    out.extend(lines[cursor..].iter().copied());
    Ok(out)
}

/// Find where `needle` occurs in `lines`, no earlier than `floor`, closest to
/// `expected` (ties go to the later position).
fn locate(lines: &[&str], needle: &[&str], expected: usize, floor: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(expected.clamp(floor, lines.len()));
    }
    if lines.len() < needle.len() {
        return None;
    }
    let last = lines.len() - needle.len();
    if floor > last {
        return None;
    }

    let expected = expected.clamp(floor, last);
    let matches_at = |at: usize| lines[at..at + needle.len()] == *needle;

    for distance in 0..=(last - floor) {
        let above = expected + distance;
        if above <= last && matches_at(above) {
            return Some(above);
        }
        let below = expected.checked_sub(distance).filter(|b| *b >= floor);
        if distance > 0 {
            if let Some(below) = below {
                if matches_at(below) {
                    return Some(below);
                }
            }
        }
        if above > last && below.is_none() {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{diff_lines, DEFAULT_CONTEXT};
    use proptest::prelude::*;

    const BASE: &str = "\
interface=wlan0
driver=nl80211
ssid=factory
hw_mode=g
channel=6
wmm_enabled=1
macaddr_acl=0
auth_algs=1
ignore_broadcast_ssid=0
wpa=2
wpa_key_mgmt=WPA-PSK
rsn_pairwise=CCMP
";

    #[test]
    fn applies_to_its_own_source() {
        let user = BASE.replace("channel=6", "channel=11");
        let patch = diff_lines(BASE, &user, DEFAULT_CONTEXT);
        assert_eq!(apply(&patch, BASE).unwrap(), user);
    }

    #[test]
    fn carries_edit_onto_compatible_upgrade() {
        let user = BASE.replace("channel=6", "channel=11");
        let upgraded = BASE.replace("rsn_pairwise=CCMP", "rsn_pairwise=CCMP GCMP");
        let patch = diff_lines(BASE, &user, DEFAULT_CONTEXT);

        let merged = apply(&patch, &upgraded).unwrap();
        assert!(merged.contains("channel=11\n"));
        assert!(merged.contains("rsn_pairwise=CCMP GCMP\n"));
        assert!(!merged.contains("channel=6\n"));
    }

    #[test]
    fn follows_lines_shifted_by_upgrade() {
        let user = BASE.replace("wpa=2", "wpa=3");
        let upgraded = format!("# generated by factory image 2.0\nctrl_interface=/var/run/hostapd\n{BASE}");
        let patch = diff_lines(BASE, &user, DEFAULT_CONTEXT);

        let merged = apply(&patch, &upgraded).unwrap();
        assert_eq!(merged, upgraded.replace("wpa=2", "wpa=3"));
    }

    #[test]
    fn rejects_when_context_changed() {
        let user = BASE.replace("channel=6", "channel=11");
        let upgraded = BASE.replace("wmm_enabled=1", "wmm_enabled=0");
        let patch = diff_lines(BASE, &user, DEFAULT_CONTEXT);

        let err = apply(&patch, &upgraded).unwrap_err();
        assert_eq!(
            err,
            ApplyError::Rejected {
                rejected: vec![0],
                total: 1
            }
        );
    }

    #[test]
    fn one_rejected_hunk_fails_everything() {
        let user = BASE
            .replace("interface=wlan0", "interface=wlan1")
            .replace("rsn_pairwise=CCMP", "rsn_pairwise=TKIP");
        let patch = diff_lines(BASE, &user, 1);
        assert_eq!(patch.hunks.len(), 2);

        let upgraded = BASE.replace("wpa_key_mgmt=WPA-PSK", "wpa_key_mgmt=SAE");
        match apply(&patch, &upgraded) {
            Err(ApplyError::Rejected { rejected, total }) => {
                assert_eq!(rejected, vec![1]);
                assert_eq!(total, 2);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn preserves_missing_trailing_newline() {
        let base = "a=1\nb=2";
        let user = "a=1\nb=3";
        let patch = diff_lines(base, user, DEFAULT_CONTEXT);
        assert_eq!(apply(&patch, base).unwrap(), user);
    }

    #[test]
    fn already_applied_removal_is_rejected() {
        let user = BASE.replace("ignore_broadcast_ssid=0\n", "");
        let patch = diff_lines(BASE, &user, DEFAULT_CONTEXT);
        assert!(apply(&patch, &user).is_err());
    }

    #[test]
    fn empty_patch_is_identity() {
        let patch = diff_lines(BASE, BASE, DEFAULT_CONTEXT);
        assert_eq!(apply(&patch, "anything\n").unwrap(), "anything\n");
    }

    #[test]
    fn insertion_into_empty_base() {
        let patch = diff_lines("", "x=1\n", DEFAULT_CONTEXT);
        assert_eq!(apply(&patch, "").unwrap(), "x=1\n");
        assert_eq!(apply(&patch, "y=2\n").unwrap(), "x=1\ny=2\n");
    }

    #[test]
    fn locate_prefers_nearest() {
        let lines = ["x\n", "a\n", "x\n", "x\n", "a\n"];
        assert_eq!(locate(&lines, &["a\n"], 3, 0), Some(4));
        assert_eq!(locate(&lines, &["a\n"], 2, 0), Some(1));
        assert_eq!(locate(&lines, &["a\n"], 0, 2), Some(4));
        assert_eq!(locate(&lines, &["b\n"], 0, 0), None);
        assert_eq!(locate(&lines, &["a\n"], 0, 5), None);
    }

    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a=1\n", "b=2\n", "c=3\n", "d=4\n", "# note\n"]), 0..24)
            .prop_map(|lines| lines.concat())
    }

    proptest! {
        #[test]
        fn diff_then_apply_reproduces_target(old in text(), new in text(), context in 0usize..4) {
            let patch = diff_lines(&old, &new, context);
            prop_assert_eq!(apply(&patch, &old).unwrap(), new);
        }
    }
}
