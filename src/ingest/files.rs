use super::{parse_lines, ArrivalEvent, LineFormat};
use crate::error::IngestError;
use crate::event_log::EventLog;
use crate::lane::{LaneId, Road};
use log::Level;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Tails the lane files in a data directory.
///
/// There is one file per lane (`lane_a1.txt` to `lane_d3.txt`) and one per
/// road (`laneA.txt` to `laneD.txt`). Each file is read from where the previous
/// poll stopped, so every complete line is consumed exactly once. A trailing
/// line without a newline is held back until it is completed.
#[derive(Debug)]
pub struct LaneFileSource {
    dir: PathBuf,
    files: Vec<TailedFile>,
}

#[derive(Debug)]
struct TailedFile {
    path: PathBuf,
    format: LineFormat,
    /// The number of bytes already read.
    offset: u64,
    /// Text read after the last newline.
    partial: String,
}

impl LaneFileSource {
    /// Opens the lane files in `dir`, creating the directory and any missing files.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, IngestError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| IngestError::Io {
            path: dir.clone(),
            source,
        })?;

        let lane_files = LaneId::ALL.into_iter().map(|lane| {
            let name = format!(
                "lane_{}{}.txt",
                lane.road().letter().to_ascii_lowercase(),
                lane.slot()
            );
            (name, LineFormat::LaneFile(lane))
        });
        let road_files = Road::ALL
            .into_iter()
            .map(|road| (format!("lane{road}.txt"), LineFormat::RoadFile));

        let files = lane_files
            .chain(road_files)
            .map(|(name, format)| -> Result<TailedFile, IngestError> {
                let path = dir.join(name);
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|source| IngestError::Io {
                        path: path.clone(),
                        source,
                    })?;
                Ok(TailedFile {
                    path,
                    format,
                    offset: 0,
                    partial: String::new(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dir, files })
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path of the file dedicated to the given lane.
    pub fn lane_path(&self, lane: LaneId) -> Option<&Path> {
        self.files
            .iter()
            .find(|file| file.format == LineFormat::LaneFile(lane))
            .map(|file| file.path.as_path())
    }

    /// The path of the file shared by the given road's lanes.
    pub fn road_path(&self, road: Road) -> PathBuf {
        self.dir.join(format!("lane{road}.txt"))
    }

    /// Reads the arrivals appended since the last poll.
    ///
    /// Malformed records are skipped and reported to `log`. A file that cannot
    /// be read is reported to `log` as an error and retried on the next poll;
    /// the other files are still read.
    pub fn poll(&mut self, log: &dyn EventLog) -> Vec<ArrivalEvent> {
        let mut events = vec![];
        for file in &mut self.files {
            match file.read_new() {
                Ok(text) if text.is_empty() => {}
                Ok(text) => events.extend(parse_lines(&text, file.format, log)),
                Err(source) => {
                    let err = IngestError::Io {
                        path: file.path.clone(),
                        source,
                    };
                    log.log(Level::Error, &err.to_string());
                }
            }
        }
        events
    }

    /// Truncates every lane file.
    pub fn clear(&mut self) -> Result<(), IngestError> {
        for file in &mut self.files {
            File::create(&file.path).map_err(|source| IngestError::Io {
                path: file.path.clone(),
                source,
            })?;
            file.offset = 0;
            file.partial.clear();
        }
        Ok(())
    }
}

impl TailedFile {
    /// Reads the complete lines appended since the last read.
    fn read_new(&mut self) -> io::Result<String> {
        let mut handle = match File::open(&self.path) {
            Ok(handle) => handle,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
            Err(err) => return Err(err),
        };
        let metadata = handle.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }
        let len = metadata.len();
        if len < self.offset {
            // The file was truncated; start again from the top.
            self.offset = 0;
            self.partial.clear();
        }
        if len == self.offset {
            return Ok(String::new());
        }

        handle.seek(SeekFrom::Start(self.offset))?;
        let mut bytes = vec![];
        handle.take(len - self.offset).read_to_end(&mut bytes)?;
        self.offset += bytes.len() as u64;
        self.partial.push_str(&String::from_utf8_lossy(&bytes));

        Ok(match self.partial.rfind('\n') {
            Some(end) => {
                let rest = self.partial.split_off(end + 1);
                std::mem::replace(&mut self.partial, rest)
            }
            None => String::new(),
        })
    }
}
