//! Landmark sources feeding the per-frame control loop.
//!
//! Camera capture and face-mesh inference live outside this crate; a source
//! only has to hand over at most one `LandmarkSet` per frame.

use crate::{landmarks::LandmarkSet, Error, Result};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Outcome of polling a source for one frame
#[derive(Debug, Clone)]
pub enum Frame {
    /// A face was detected
    Landmarks(LandmarkSet),
    /// The frame arrived but no face was found
    NoDetection,
    /// The source has no more frames
    EndOfStream,
}

/// Anything that can deliver face landmarks frame by frame
pub trait LandmarkSource {
    /// Poll the next frame
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream fails or is malformed.
    fn next_frame(&mut self) -> Result<Frame>;
}

/// Replays landmarks recorded as JSON lines.
///
/// Each line is either `null` (no face) or an array of `[x, y]` pairs in
/// normalized image coordinates. Blank lines are skipped.
pub struct ReplaySource<R> {
    reader: R,
    line_number: usize,
    line: String,
}

impl ReplaySource<BufReader<File>> {
    /// Open a recording on disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening landmark recording: {}", path.as_ref().display());
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            line: String::new(),
        }
    }
}

impl<R: BufRead> LandmarkSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Frame> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                debug!("Landmark recording exhausted after {} lines", self.line_number);
                return Ok(Frame::EndOfStream);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: Option<Vec<(f32, f32)>> = serde_json::from_str(trimmed).map_err(|e| {
                Error::Serialization(format!("line {}: {e}", self.line_number))
            })?;

            return Ok(match parsed {
                None => Frame::NoDetection,
                Some(points) => match LandmarkSet::new(points) {
                    Ok(set) => Frame::Landmarks(set),
                    Err(e) => {
                        warn!("Skipping landmarks on line {}: {}", self.line_number, e);
                        Frame::NoDetection
                    }
                },
            });
        }
    }
}

/// In-memory source, mostly useful for tests and benchmarks
pub struct VecSource {
    frames: std::vec::IntoIter<Option<LandmarkSet>>,
}

impl VecSource {
    #[must_use]
    pub fn new(frames: Vec<Option<LandmarkSet>>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl LandmarkSource for VecSource {
    fn next_frame(&mut self) -> Result<Frame> {
        Ok(match self.frames.next() {
            Some(Some(set)) => Frame::Landmarks(set),
            Some(None) => Frame::NoDetection,
            None => Frame::EndOfStream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NUM_FACE_MESH_LANDMARKS;
    use std::io::Cursor;

    fn face_line() -> String {
        serde_json::to_string(&vec![(0.5f32, 0.5f32); NUM_FACE_MESH_LANDMARKS]).unwrap()
    }

    #[test]
    fn test_replay_frames() {
        let data = format!("{}\nnull\n\n[[0.1,0.2]]\n", face_line());
        let mut source = ReplaySource::new(Cursor::new(data));
        assert!(matches!(source.next_frame().unwrap(), Frame::Landmarks(_)));
        assert!(matches!(source.next_frame().unwrap(), Frame::NoDetection));
        // Too few points is a detection miss, not a stream error
        assert!(matches!(source.next_frame().unwrap(), Frame::NoDetection));
        assert!(matches!(source.next_frame().unwrap(), Frame::EndOfStream));
    }

    #[test]
    fn test_replay_malformed_line() {
        let mut source = ReplaySource::new(Cursor::new("not json\n"));
        assert!(matches!(source.next_frame(), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_vec_source() {
        let mut source = VecSource::new(vec![None]);
        assert!(matches!(source.next_frame().unwrap(), Frame::NoDetection));
        assert!(matches!(source.next_frame().unwrap(), Frame::EndOfStream));
    }
}
