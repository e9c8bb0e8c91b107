//! Skip and undo against a located video.
//!
//! Both operations try the player's control surface first and fall back to
//! writing the element's playback position directly. Failures are absorbed
//! and reported in the returned [`SeekOutcome`]; nothing propagates.

use serde::Serialize;

use crate::dom::{Expando, Page, PlayerId};
use crate::error::SkipperError;
use crate::locator::VideoHandle;

/// Container class of the player whose instance exposes `currentTime` / `seek`.
const CONTROL_SURFACE_CONTAINER: &str = ".artplayer-app";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekPath {
    ControlSurface,
    Native,
}

#[derive(Debug)]
pub enum SeekOutcome {
    Applied { via: SeekPath, position: f64 },
    /// Nothing changed; the absorbed reason.
    Ignored(SkipperError),
}

impl SeekOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SeekOutcome::Applied { .. })
    }

    pub fn position(&self) -> Option<f64> {
        match self {
            SeekOutcome::Applied { position, .. } => Some(*position),
            SeekOutcome::Ignored(_) => None,
        }
    }
}

/// Owns the single-slot undo position.
#[derive(Debug, Clone, Default)]
pub struct SkipEngine {
    last_position: Option<f64>,
}

impl SkipEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position recorded by the last skip and not yet undone.
    pub fn last_position(&self) -> Option<f64> {
        self.last_position
    }

    pub fn can_undo(&self) -> bool {
        self.last_position.is_some()
    }

    /// Jump `seconds` forward from the current position.
    pub fn skip(&mut self, page: &mut Page, handle: &VideoHandle, seconds: f64) -> SeekOutcome {
        if seconds.is_nan() || seconds <= 0.0 {
            return SeekOutcome::Ignored(SkipperError::InvalidConfiguration(format!(
                "skip duration must be positive, got {}",
                seconds
            )));
        }
        let Some(before) = page.current_time(handle.video) else {
            tracing::info!("Video element has no playback state, skip ignored");
            return SeekOutcome::Ignored(SkipperError::NativeMutation(
                "video element has no playback state".to_string(),
            ));
        };

        self.last_position = Some(before);
        tracing::debug!("Recorded position before skip: {}s", before);

        if let Some(surface) = control_surface(page, handle) {
            let seek = page
                .player_current_time(surface)
                .and_then(|current| page.player_seek(surface, current + seconds));
            match seek {
                Ok(position) => {
                    tracing::debug!("Skipped via player API to {}s", position);
                    return SeekOutcome::Applied {
                        via: SeekPath::ControlSurface,
                        position,
                    };
                }
                Err(e) => tracing::debug!("Player API skip failed, using native seek: {}", e),
            }
        }

        match page.set_current_time(handle.video, before + seconds) {
            Ok(position) => {
                tracing::debug!("Skipped natively to {}s", position);
                SeekOutcome::Applied {
                    via: SeekPath::Native,
                    position,
                }
            }
            Err(e) => {
                tracing::info!("Skip failed: {}", e);
                SeekOutcome::Ignored(e)
            }
        }
    }

    /// Restore the position recorded by the last skip. Single level: the slot
    /// is cleared once the restore lands.
    pub fn undo(&mut self, page: &mut Page, handle: &VideoHandle) -> SeekOutcome {
        let Some(target) = self.last_position else {
            tracing::info!("No recorded position to undo to");
            return SeekOutcome::Ignored(SkipperError::InvalidConfiguration(
                "no recorded position to undo to".to_string(),
            ));
        };

        if let Some(surface) = control_surface(page, handle) {
            match page.player_seek(surface, target) {
                Ok(position) => {
                    tracing::debug!("Undid skip via player API to {}s", position);
                    self.last_position = None;
                    return SeekOutcome::Applied {
                        via: SeekPath::ControlSurface,
                        position,
                    };
                }
                Err(e) => tracing::debug!("Player API undo failed, using native seek: {}", e),
            }
        }

        match page.set_current_time(handle.video, target) {
            Ok(position) => {
                tracing::debug!("Undid skip natively to {}s", position);
                self.last_position = None;
                SeekOutcome::Applied {
                    via: SeekPath::Native,
                    position,
                }
            }
            Err(e) => {
                tracing::info!("Undo failed: {}", e);
                SeekOutcome::Ignored(e)
            }
        }
    }
}

/// The handle's own player, else the `art` instance of the enclosing player container.
fn control_surface(page: &Page, handle: &VideoHandle) -> Option<PlayerId> {
    if handle.surface.is_some() {
        return handle.surface;
    }
    let container = page
        .closest(handle.video, CONTROL_SURFACE_CONTAINER)
        .ok()
        .flatten()?;
    page.probe(container, &["art"]).and_then(Expando::as_player)
}
