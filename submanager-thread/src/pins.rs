//! Moving the sticky slot from a retiring thread to its replacement.

use std::time::Duration;

use submanager_core::platform::Submission;
use submanager_core::{PinMode, Platform, PlatformError, ThreadItem};

use crate::error::{platform_err, ThreadError};

/// Number of sticky slots the site offers.
const STICKY_SLOTS: u8 = 2;

/// Pin `new` according to `item.pin_mode`. Returns whether it was pinned.
///
/// Only runs when a previous thread exists. In `top`/`bottom` mode the old
/// thread is unstickied first and, after the settle delay, the slots are
/// re-read; a slot still reporting the old thread is ignored. In `auto` mode
/// the new thread takes the old thread's slot and nothing is pinned if the
/// old thread was not pinned. Pinning to the top pushes the bottom slot out,
/// so an unrelated thread there is re-pinned at the bottom afterwards.
pub(crate) fn pin_new_thread(
    platform: &dyn Platform,
    item: &ThreadItem,
    old: Option<&Submission>,
    new: &Submission,
) -> Result<bool, ThreadError> {
    let uid = item.uid.as_str();
    let subreddit = item.context.subreddit.as_str();
    let Some(old) = old else {
        return Ok(false);
    };
    if item.pin_mode == PinMode::Disabled {
        return Ok(false);
    }
    let auto = item.pin_mode == PinMode::Auto;

    if !auto {
        platform
            .set_sticky(&old.id, false, false)
            .map_err(platform_err(uid))?;
        std::thread::sleep(Duration::from_millis(item.pin_settle_ms));
    }

    let mut pins = Vec::with_capacity(usize::from(STICKY_SLOTS));
    for slot in 1..=STICKY_SLOTS {
        match platform.sticky(subreddit, slot) {
            Ok(post) => pins.push(post.id),
            Err(PlatformError::NotFound(_)) => {}
            Err(err) => return Err(platform_err(uid)(err)),
        }
    }

    let bottom = if auto {
        match pins.iter().position(|id| id == &old.id) {
            Some(index) => index != 0,
            None => {
                tracing::debug!("{uid}: previous thread {} was not pinned", old.id);
                return Ok(false);
            }
        }
    } else {
        item.pin_mode == PinMode::Bottom
    };

    let keep = match pins.get(1) {
        Some(id) if !bottom && id != &old.id && id != &new.id => Some(id.clone()),
        _ => None,
    };

    sticky_with_retry(platform, uid, new, bottom)?;
    if let Some(id) = keep {
        platform.set_sticky(&id, true, true).map_err(platform_err(uid))?;
    }
    tracing::info!(
        "{uid}: pinned {} to the {} slot",
        new.id,
        if bottom { "bottom" } else { "top" }
    );
    Ok(true)
}

/// A fresh post may be rejected until approved; approve and retry once.
fn sticky_with_retry(
    platform: &dyn Platform,
    uid: &str,
    thread: &Submission,
    bottom: bool,
) -> Result<(), ThreadError> {
    match platform.set_sticky(&thread.id, true, bottom) {
        Err(PlatformError::BadRequest(message)) => {
            tracing::warn!(
                "{uid}: pinning {:?} failed ({message}); approving and retrying",
                thread.title
            );
            platform.approve(&thread.id).map_err(platform_err(uid))?;
            platform
                .set_sticky(&thread.id, true, bottom)
                .map_err(platform_err(uid))
        }
        other => other.map_err(platform_err(uid)),
    }
}
