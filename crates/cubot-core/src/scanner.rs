//! Webcam cube recognition seam.
//!
//! Recognition itself lives outside this crate; the session only needs the
//! colours it saw and the definition string it derived.

use thiserror::Error;

use crate::cube::{CubeState, DefinitionError, FACELET_COUNT};
use crate::settings::CamSettings;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Camera failed: {0}")]
    Camera(String),

    #[error("Expected 6 face colours, got {0}")]
    WrongColourCount(usize),

    #[error("Only {found} of 54 facelets were read")]
    IncompleteRead { found: usize },

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Raw result of a webcam read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// One colour name per face, in definition order.
    pub colours: Vec<String>,
    pub definition: String,
}

/// External webcam reader.
pub trait CubeScanner {
    fn scan(&mut self, settings: &CamSettings) -> Result<ScanOutcome, ScanError>;
}

/// Run a scan and validate what came back.
pub fn scan_cube(
    scanner: &mut dyn CubeScanner,
    settings: &CamSettings,
) -> Result<(Vec<String>, CubeState), ScanError> {
    let outcome = scanner.scan(settings)?;
    if outcome.colours.len() != 6 {
        return Err(ScanError::WrongColourCount(outcome.colours.len()));
    }
    let found = outcome.definition.trim().chars().count();
    if found < FACELET_COUNT {
        return Err(ScanError::IncompleteRead { found });
    }
    let state = CubeState::from_definition(&outcome.definition)?;
    Ok((outcome.colours, state))
}
