//! Change detection.
//!
//! One pure function, [`changed`], compares the prior snapshot against this
//! run's freshly scanned listing and answers a single question: does this
//! directory's index need regenerating? The same signal decides whether the
//! snapshot itself is rewritten, so an unchanged directory performs zero
//! writes.
//!
//! Aside from debug narration through the [`Reporter`], the result depends
//! only on the inputs — no filesystem access, no clock.

use crate::output::Reporter;
use crate::snapshot::DirectorySnapshot;
use crate::types::DirectoryListing;
use std::collections::BTreeSet;

/// Does the freshly scanned state differ from the prior snapshot?
///
/// True when the subdirectory sets differ, the file sets differ, a file's
/// preview was regenerated this run, or the prior snapshot was entirely
/// empty (first run) while the current state is not.
pub fn changed(prior: &DirectorySnapshot, listing: &DirectoryListing, reporter: &Reporter) -> bool {
    if prior.is_empty() && !listing.is_empty() {
        reporter.debug("   No prior snapshot -- changed");
        return true;
    }
    dirs_changed(prior, listing, reporter) || files_changed(prior, listing, reporter)
}

/// Compare subdirectory name sets. Order is irrelevant.
fn dirs_changed(
    prior: &DirectorySnapshot,
    listing: &DirectoryListing,
    reporter: &Reporter,
) -> bool {
    // Different cardinality means *something* differs, no matter what.
    if listing.subdirs.len() != prior.dirs.len() {
        reporter.debug("   Subdirectory sets have different sizes -- changed");
        return true;
    }
    if listing.subdirs.is_empty() {
        reporter.debug("   Subdirectory sets both empty -- no change");
        return false;
    }

    let current: BTreeSet<&str> = listing.subdirs.iter().map(String::as_str).collect();
    let previous: BTreeSet<&str> = prior.dirs.iter().map(String::as_str).collect();
    if current != previous {
        reporter.debug("   Subdirectory sets differ -- changed");
        return true;
    }

    reporter.debug("   Subdirectory sets identical -- no change");
    false
}

/// Compare file sets, including preview regeneration and the optional
/// content fingerprint.
fn files_changed(
    prior: &DirectorySnapshot,
    listing: &DirectoryListing,
    reporter: &Reporter,
) -> bool {
    if listing.files.len() != prior.files.len() {
        reporter.debug("   File sets have different sizes -- changed");
        return true;
    }
    if listing.files.is_empty() {
        reporter.debug("   File sets both empty -- no change");
        return false;
    }

    for (name, record) in &listing.files {
        let Some(state) = prior.files.get(name) else {
            reporter.debug(format!("   New file {name} -- changed"));
            return true;
        };

        // A preview regenerated this run counts as a content change, even
        // if the source's own timestamp did not move.
        if record.preview_generated && record.preview_mtime > state.mtime {
            reporter.debug(format!("   Newly generated preview for {name} -- changed"));
            return true;
        }

        if let (Some(current), Some(previous)) = (&record.fingerprint, &state.fingerprint) {
            if current != previous {
                reporter.debug(format!("   Content fingerprint of {name} differs -- changed"));
                return true;
            }
        }
    }

    for name in prior.files.keys() {
        if !listing.files.contains_key(name) {
            reporter.debug(format!("   File {name} vanished -- changed"));
            return true;
        }
    }

    reporter.debug("   File sets identical -- no change");
    false
}
