//! Raw-text repair of over-escaped JSON, applied before parsing.
//!
//! Documents that went through a stringify step twice carry `\\"`, `\\n`
//! and friends where a single escape belongs. Each rule collapses one
//! doubled escape; the whole set is iterated to a fixpoint so triple and
//! deeper escaping also resolves.

use super::AppliedFix;

const RULES: &[(&str, &str, &str)] = &[
    ("\\\\\"", "\\\"", "collapsed double-escaped quotes"),
    ("\\\\n", "\\n", "collapsed double-escaped newlines"),
    ("\\\\t", "\\t", "collapsed double-escaped tabs"),
    ("\\\\r", "\\r", "collapsed double-escaped carriage returns"),
    ("\\\\/", "\\/", "collapsed double-escaped slashes"),
];

pub fn fix_source(text: &str) -> (String, Vec<AppliedFix>) {
    let mut current = text.to_string();
    let mut counts = vec![0usize; RULES.len()];

    loop {
        let mut changed = false;
        for (i, (from, to, _)) in RULES.iter().enumerate() {
            let occurrences = current.matches(from).count();
            if occurrences > 0 {
                current = current.replace(from, to);
                counts[i] += occurrences;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let fixes = RULES
        .iter()
        .zip(&counts)
        .filter(|&(_, &count)| count > 0)
        .map(|((_, _, what), &count)| {
            AppliedFix::new("escaping", format!("{what} ({count} occurrence(s))"), None)
        })
        .collect();

    (current, fixes)
}
