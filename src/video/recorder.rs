//! MJPEG/AVI video recorder
//!
//! The receiver does not know the stream resolution in advance, so the
//! recorder is an explicit state machine: `Uninitialized` until the first
//! decoded frame fixes the dimensions, then `Recording`, then `Finished`
//! once. Frames are stored as one JPEG per `00dc` chunk (MJPG fourcc) at
//! a fixed frame rate; `finish` writes the `idx1` index and patches the
//! RIFF sizes.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};

use crate::error::RecordError;
use crate::video::{RawFrame, VideoRecorder};

const AVIF_HASINDEX: u32 = 0x10;
const AVIIF_KEYFRAME: u32 = 0x10;

// Fixed header layout offsets (bytes from start of file)
const RIFF_SIZE_POS: u64 = 4;
const TOTAL_FRAMES_POS: u64 = 48;
const STREAM_LENGTH_POS: u64 = 140;
const MOVI_SIZE_POS: u64 = 216;
const MOVI_FOURCC_POS: u64 = 220;

/// Low-level RIFF/AVI container writer for pre-encoded JPEG frames
struct AviWriter {
    file: BufWriter<File>,
    frames: u32,
    /// (offset from 'movi' fourcc, chunk data size) per frame
    index: Vec<(u32, u32)>,
    next_chunk_pos: u64,
}

impl AviWriter {
    fn create(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self, RecordError> {
        let file = File::create(path).map_err(|e| RecordError::VideoWrite(e.to_string()))?;
        let mut file = BufWriter::new(file);

        let header = Self::build_header(width, height, fps);
        file.write_all(&header)
            .map_err(|e| RecordError::VideoWrite(e.to_string()))?;

        Ok(Self {
            file,
            frames: 0,
            index: Vec::new(),
            next_chunk_pos: header.len() as u64,
        })
    }

    /// Fixed 224-byte header with size fields zeroed for later patching
    fn build_header(width: u32, height: u32, fps: f64) -> BytesMut {
        let mut buf = BytesMut::with_capacity(224);

        buf.put_slice(b"RIFF");
        buf.put_u32_le(0); // riff size, patched in finish
        buf.put_slice(b"AVI ");

        // hdrl list: avih + one video stream
        buf.put_slice(b"LIST");
        buf.put_u32_le(192);
        buf.put_slice(b"hdrl");

        buf.put_slice(b"avih");
        buf.put_u32_le(56);
        buf.put_u32_le((1_000_000.0 / fps) as u32); // microseconds per frame
        buf.put_u32_le(0); // max bytes per sec
        buf.put_u32_le(0); // padding granularity
        buf.put_u32_le(AVIF_HASINDEX);
        buf.put_u32_le(0); // total frames, patched in finish
        buf.put_u32_le(0); // initial frames
        buf.put_u32_le(1); // streams
        buf.put_u32_le(0); // suggested buffer size
        buf.put_u32_le(width);
        buf.put_u32_le(height);
        buf.put_bytes(0, 16); // reserved

        buf.put_slice(b"LIST");
        buf.put_u32_le(116);
        buf.put_slice(b"strl");

        buf.put_slice(b"strh");
        buf.put_u32_le(56);
        buf.put_slice(b"vids");
        buf.put_slice(b"MJPG");
        buf.put_u32_le(0); // flags
        buf.put_u16_le(0); // priority
        buf.put_u16_le(0); // language
        buf.put_u32_le(0); // initial frames
        buf.put_u32_le(1000); // scale
        buf.put_u32_le((fps * 1000.0).round() as u32); // rate: rate/scale = fps
        buf.put_u32_le(0); // start
        buf.put_u32_le(0); // length in frames, patched in finish
        buf.put_u32_le(0); // suggested buffer size
        buf.put_u32_le(u32::MAX); // quality: default
        buf.put_u32_le(0); // sample size
        buf.put_u16_le(0); // rcFrame left
        buf.put_u16_le(0); // rcFrame top
        buf.put_u16_le(width as u16); // rcFrame right
        buf.put_u16_le(height as u16); // rcFrame bottom

        buf.put_slice(b"strf");
        buf.put_u32_le(40);
        buf.put_u32_le(40); // biSize
        buf.put_i32_le(width as i32);
        buf.put_i32_le(height as i32);
        buf.put_u16_le(1); // planes
        buf.put_u16_le(24); // bit count
        buf.put_slice(b"MJPG"); // compression
        buf.put_u32_le(width * height * 3); // size image
        buf.put_u32_le(0); // x pels per meter
        buf.put_u32_le(0); // y pels per meter
        buf.put_u32_le(0); // colors used
        buf.put_u32_le(0); // colors important

        // movi list, size patched in finish
        buf.put_slice(b"LIST");
        buf.put_u32_le(0);
        buf.put_slice(b"movi");

        debug_assert_eq!(buf.len() as u64, MOVI_FOURCC_POS + 4);
        buf
    }

    fn write_jpeg(&mut self, jpeg: &[u8]) -> Result<(), RecordError> {
        let offset = (self.next_chunk_pos - MOVI_FOURCC_POS) as u32;

        let mut chunk = BytesMut::with_capacity(8 + jpeg.len() + 1);
        chunk.put_slice(b"00dc");
        chunk.put_u32_le(jpeg.len() as u32);
        chunk.put_slice(jpeg);
        if jpeg.len() % 2 != 0 {
            chunk.put_u8(0); // RIFF chunks are word-aligned
        }

        self.file
            .write_all(&chunk)
            .map_err(|e| RecordError::VideoWrite(e.to_string()))?;

        self.index.push((offset, jpeg.len() as u32));
        self.frames += 1;
        self.next_chunk_pos += chunk.len() as u64;
        Ok(())
    }

    fn finish(mut self) -> Result<(), RecordError> {
        let movi_end = self.next_chunk_pos;

        // idx1: one entry per frame chunk
        let mut idx = BytesMut::with_capacity(8 + self.index.len() * 16);
        idx.put_slice(b"idx1");
        idx.put_u32_le(self.index.len() as u32 * 16);
        for &(offset, size) in &self.index {
            idx.put_slice(b"00dc");
            idx.put_u32_le(AVIIF_KEYFRAME);
            idx.put_u32_le(offset);
            idx.put_u32_le(size);
        }
        self.file
            .write_all(&idx)
            .map_err(|e| RecordError::VideoWrite(e.to_string()))?;

        let file_len = movi_end + idx.len() as u64;
        self.patch_u32(RIFF_SIZE_POS, (file_len - 8) as u32)?;
        self.patch_u32(TOTAL_FRAMES_POS, self.frames)?;
        self.patch_u32(STREAM_LENGTH_POS, self.frames)?;
        self.patch_u32(MOVI_SIZE_POS, (movi_end - MOVI_FOURCC_POS) as u32)?;

        self.file
            .flush()
            .map_err(|e| RecordError::VideoWrite(e.to_string()))
    }

    fn patch_u32(&mut self, pos: u64, value: u32) -> Result<(), RecordError> {
        self.file
            .seek(SeekFrom::Start(pos))
            .map_err(|e| RecordError::VideoWrite(e.to_string()))?;
        self.file
            .write_all(&value.to_le_bytes())
            .map_err(|e| RecordError::VideoWrite(e.to_string()))
    }
}

enum RecorderState {
    Uninitialized,
    Recording {
        writer: AviWriter,
        width: u32,
        height: u32,
    },
    Finished(Option<PathBuf>),
}

/// Lazily-initialized MJPEG/AVI [`VideoRecorder`]
pub struct AviRecorder {
    path: PathBuf,
    fps: f64,
    quality: u8,
    frames: u64,
    state: RecorderState,
}

impl AviRecorder {
    /// Prepare a recorder; no file is created until the first frame
    pub fn new(path: PathBuf, fps: f64, quality: u8) -> Self {
        Self {
            path,
            fps,
            quality,
            frames: 0,
            state: RecorderState::Uninitialized,
        }
    }
}

impl VideoRecorder for AviRecorder {
    fn record(&mut self, frame: &RawFrame) -> Result<(), RecordError> {
        if let RecorderState::Uninitialized = self.state {
            let (width, height) = frame.dimensions();
            let writer = AviWriter::create(&self.path, width, height, self.fps)?;
            tracing::info!(
                "video recorder initialized: {}x{} @ {} fps -> {}",
                width,
                height,
                self.fps,
                self.path.display()
            );
            self.state = RecorderState::Recording {
                writer,
                width,
                height,
            };
        }

        match &mut self.state {
            RecorderState::Recording {
                writer,
                width,
                height,
            } => {
                // Dimensions were fixed by the first frame; coerce any
                // stray odd-sized frame instead of corrupting the file
                let coerced;
                let frame = if frame.dimensions() == (*width, *height) {
                    frame
                } else {
                    coerced = imageops::resize(frame, *width, *height, FilterType::Triangle);
                    &coerced
                };

                let mut jpeg = Vec::new();
                JpegEncoder::new_with_quality(&mut jpeg, self.quality)
                    .encode_image(frame)
                    .map_err(|e| RecordError::VideoWrite(e.to_string()))?;

                writer.write_jpeg(&jpeg)?;
                self.frames += 1;
                Ok(())
            }
            RecorderState::Finished(_) => Err(RecordError::AlreadyFinalized),
            RecorderState::Uninitialized => unreachable!("initialized above"),
        }
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finish(&mut self) -> Result<Option<PathBuf>, RecordError> {
        match std::mem::replace(&mut self.state, RecorderState::Finished(None)) {
            RecorderState::Uninitialized => Ok(None),
            RecorderState::Recording { writer, .. } => {
                writer.finish()?;
                self.state = RecorderState::Finished(Some(self.path.clone()));
                Ok(Some(self.path.clone()))
            }
            RecorderState::Finished(path) => {
                self.state = RecorderState::Finished(path.clone());
                Ok(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frame(width: u32, height: u32, shade: u8) -> RawFrame {
        RawFrame::from_pixel(width, height, Rgb([shade, shade, shade]))
    }

    fn u32_at(buf: &[u8], pos: usize) -> u32 {
        u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap())
    }

    #[test]
    fn test_records_and_finalizes_valid_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");
        let mut recorder = AviRecorder::new(path.clone(), 20.0, 50);

        for shade in [10u8, 120, 240] {
            recorder.record(&frame(32, 24, shade)).unwrap();
        }
        assert_eq!(recorder.frames_written(), 3);

        let written = recorder.finish().unwrap().unwrap();
        assert_eq!(written, path);

        let buf = std::fs::read(&path).unwrap();
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(&buf[8..12], b"AVI ");
        assert_eq!(u32_at(&buf, 4) as usize, buf.len() - 8);
        // total frames patched into avih and strh
        assert_eq!(u32_at(&buf, TOTAL_FRAMES_POS as usize), 3);
        assert_eq!(u32_at(&buf, STREAM_LENGTH_POS as usize), 3);
        // first frame chunk sits right after the movi fourcc
        assert_eq!(&buf[MOVI_FOURCC_POS as usize..MOVI_FOURCC_POS as usize + 4], b"movi");
        assert_eq!(
            &buf[MOVI_FOURCC_POS as usize + 4..MOVI_FOURCC_POS as usize + 8],
            b"00dc"
        );
        // index present
        let idx_pos = buf.len() - 8 - 3 * 16;
        assert_eq!(&buf[idx_pos..idx_pos + 4], b"idx1");
    }

    #[test]
    fn test_lazy_init_from_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");
        let mut recorder = AviRecorder::new(path.clone(), 20.0, 50);

        // No file until a frame arrives
        assert!(!path.exists());
        recorder.record(&frame(48, 32, 128)).unwrap();
        assert!(path.exists());

        recorder.finish().unwrap();
        let buf = std::fs::read(&path).unwrap();
        // width/height in avih came from the first frame
        assert_eq!(u32_at(&buf, 64), 48);
        assert_eq!(u32_at(&buf, 68), 32);
    }

    #[test]
    fn test_finish_without_frames_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");
        let mut recorder = AviRecorder::new(path.clone(), 20.0, 50);

        assert!(recorder.finish().unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_finish_is_repeat_safe_and_record_after_finish_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");
        let mut recorder = AviRecorder::new(path.clone(), 20.0, 50);

        recorder.record(&frame(32, 24, 50)).unwrap();
        assert_eq!(recorder.finish().unwrap(), Some(path.clone()));
        assert_eq!(recorder.finish().unwrap(), Some(path));

        let err = recorder.record(&frame(32, 24, 50)).unwrap_err();
        assert!(matches!(err, RecordError::AlreadyFinalized));
    }

    #[test]
    fn test_mismatched_frame_is_coerced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");
        let mut recorder = AviRecorder::new(path, 20.0, 50);

        recorder.record(&frame(32, 24, 10)).unwrap();
        // Different dimensions than the first frame: resized, not refused
        recorder.record(&frame(64, 64, 20)).unwrap();
        assert_eq!(recorder.frames_written(), 2);
        recorder.finish().unwrap();
    }
}
