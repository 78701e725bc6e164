//! Files copied into every container before it starts.

use std::time::{SystemTime, UNIX_EPOCH};

use stagehand_types::container::Overlay;
use stagehand_types::error::RunError;

/// Mount point of the overlay inside the container.
pub const OVERLAY_ROOT: &str = "/github";

/// Path of the event payload relative to [`OVERLAY_ROOT`].
pub const EVENT_FILE: &str = "workflow/event.json";

/// Build a tar archive holding `workflow/event.json`, extracted at `/github`.
pub fn event_overlay(event_payload: &str) -> Result<Overlay, RunError> {
    let mtime = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut builder = tar::Builder::new(Vec::new());

    let mut dir = tar::Header::new_gnu();
    dir.set_entry_type(tar::EntryType::Directory);
    dir.set_mode(0o755);
    dir.set_size(0);
    dir.set_mtime(mtime);
    builder.append_data(&mut dir, "workflow/", std::io::empty())?;

    let bytes = event_payload.as_bytes();
    let mut file = tar::Header::new_gnu();
    file.set_mode(0o644);
    file.set_size(bytes.len() as u64);
    file.set_mtime(mtime);
    builder.append_data(&mut file, EVENT_FILE, bytes)?;

    Ok(Overlay {
        destination: OVERLAY_ROOT.to_string(),
        archive: builder.into_inner()?,
    })
}
