//! Minimal RIFF/AVI muxer: an MJPEG video stream interleaved with a mono
//! PCM16 audio stream, plus the idx1 index most players expect.

/// AVIF_HASINDEX
const AVI_HAS_INDEX: u32 = 0x10;
/// AVIIF_KEYFRAME; every MJPEG frame is independently decodable.
const INDEX_KEYFRAME: u32 = 0x10;

pub struct AviConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub audio_rate: u32,
}

/// Build the complete AVI byte stream from encoded JPEG frames and the
/// recorded mono PCM track. Audio is interleaved per video frame.
pub fn mux(cfg: &AviConfig, frames: &[Vec<u8>], audio: &[i16]) -> Vec<u8> {
    let fps = cfg.fps.max(1);
    let samples_per_frame = (cfg.audio_rate / fps) as usize;
    let max_frame_bytes = frames.iter().map(Vec::len).max().unwrap_or(0) as u32;

    // movi body and its index are built together; index offsets count from
    // the 'movi' fourcc, so the first chunk sits at offset 4.
    let mut movi = Vec::new();
    let mut index = Vec::new();
    let mut audio_cursor = 0usize;
    for (i, frame) in frames.iter().enumerate() {
        push_indexed_chunk(&mut movi, &mut index, b"00dc", frame);
        let end = if i + 1 == frames.len() {
            audio.len() // remainder rides on the last frame
        } else {
            (audio_cursor + samples_per_frame).min(audio.len())
        };
        if end > audio_cursor {
            push_indexed_chunk(&mut movi, &mut index, b"01wb", &pcm_bytes(&audio[audio_cursor..end]));
            audio_cursor = end;
        }
    }
    if audio_cursor < audio.len() {
        push_indexed_chunk(&mut movi, &mut index, b"01wb", &pcm_bytes(&audio[audio_cursor..]));
    }

    let mut hdrl = Vec::new();
    push_chunk(&mut hdrl, b"avih", &main_header(cfg, frames.len() as u32, max_frame_bytes));
    push_list(&mut hdrl, b"strl", &video_stream_list(cfg, frames.len() as u32, max_frame_bytes));
    push_list(&mut hdrl, b"strl", &audio_stream_list(cfg, audio.len() as u32));

    let mut body = Vec::new();
    push_list(&mut body, b"hdrl", &hdrl);
    push_list(&mut body, b"movi", &movi);
    push_chunk(&mut body, b"idx1", &index);

    let mut out = Vec::with_capacity(body.len() + 12);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
    out.extend_from_slice(b"AVI ");
    out.extend_from_slice(&body);
    out
}

fn main_header(cfg: &AviConfig, total_frames: u32, max_frame_bytes: u32) -> Vec<u8> {
    let fps = cfg.fps.max(1);
    let mut h = Vec::with_capacity(56);
    put_u32(&mut h, 1_000_000 / fps); // dwMicroSecPerFrame
    put_u32(&mut h, max_frame_bytes.saturating_mul(fps) + cfg.audio_rate * 2); // dwMaxBytesPerSec
    put_u32(&mut h, 0); // dwPaddingGranularity
    put_u32(&mut h, AVI_HAS_INDEX); // dwFlags
    put_u32(&mut h, total_frames);
    put_u32(&mut h, 0); // dwInitialFrames
    put_u32(&mut h, 2); // dwStreams
    put_u32(&mut h, max_frame_bytes); // dwSuggestedBufferSize
    put_u32(&mut h, cfg.width);
    put_u32(&mut h, cfg.height);
    h.extend_from_slice(&[0u8; 16]); // dwReserved[4]
    h
}

fn video_stream_list(cfg: &AviConfig, total_frames: u32, max_frame_bytes: u32) -> Vec<u8> {
    let mut strh = Vec::with_capacity(56);
    strh.extend_from_slice(b"vids");
    strh.extend_from_slice(b"MJPG");
    put_u32(&mut strh, 0); // dwFlags
    put_u32(&mut strh, 0); // wPriority + wLanguage
    put_u32(&mut strh, 0); // dwInitialFrames
    put_u32(&mut strh, 1); // dwScale
    put_u32(&mut strh, cfg.fps.max(1)); // dwRate
    put_u32(&mut strh, 0); // dwStart
    put_u32(&mut strh, total_frames); // dwLength
    put_u32(&mut strh, max_frame_bytes); // dwSuggestedBufferSize
    put_u32(&mut strh, u32::MAX); // dwQuality (default)
    put_u32(&mut strh, 0); // dwSampleSize
    put_u16(&mut strh, 0); // rcFrame
    put_u16(&mut strh, 0);
    put_u16(&mut strh, cfg.width as u16);
    put_u16(&mut strh, cfg.height as u16);

    // BITMAPINFOHEADER
    let mut strf = Vec::with_capacity(40);
    put_u32(&mut strf, 40); // biSize
    put_u32(&mut strf, cfg.width);
    put_u32(&mut strf, cfg.height);
    put_u16(&mut strf, 1); // biPlanes
    put_u16(&mut strf, 24); // biBitCount
    strf.extend_from_slice(b"MJPG"); // biCompression
    put_u32(&mut strf, cfg.width * cfg.height * 3); // biSizeImage
    strf.extend_from_slice(&[0u8; 16]); // resolution/palette fields

    let mut list = Vec::new();
    push_chunk(&mut list, b"strh", &strh);
    push_chunk(&mut list, b"strf", &strf);
    list
}

fn audio_stream_list(cfg: &AviConfig, total_samples: u32) -> Vec<u8> {
    let block_align = 2u32; // mono PCM16
    let mut strh = Vec::with_capacity(56);
    strh.extend_from_slice(b"auds");
    put_u32(&mut strh, 0); // no handler fourcc for PCM
    put_u32(&mut strh, 0); // dwFlags
    put_u32(&mut strh, 0); // wPriority + wLanguage
    put_u32(&mut strh, 0); // dwInitialFrames
    put_u32(&mut strh, 1); // dwScale
    put_u32(&mut strh, cfg.audio_rate); // dwRate
    put_u32(&mut strh, 0); // dwStart
    put_u32(&mut strh, total_samples); // dwLength
    put_u32(&mut strh, cfg.audio_rate * block_align); // dwSuggestedBufferSize
    put_u32(&mut strh, u32::MAX); // dwQuality
    put_u32(&mut strh, block_align); // dwSampleSize
    strh.extend_from_slice(&[0u8; 8]); // rcFrame

    // PCMWAVEFORMAT
    let mut strf = Vec::with_capacity(16);
    put_u16(&mut strf, 1); // WAVE_FORMAT_PCM
    put_u16(&mut strf, 1); // nChannels
    put_u32(&mut strf, cfg.audio_rate); // nSamplesPerSec
    put_u32(&mut strf, cfg.audio_rate * block_align); // nAvgBytesPerSec
    put_u16(&mut strf, block_align as u16); // nBlockAlign
    put_u16(&mut strf, 16); // wBitsPerSample

    let mut list = Vec::new();
    push_chunk(&mut list, b"strh", &strh);
    push_chunk(&mut list, b"strf", &strf);
    list
}

fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// RIFF chunk: fourcc, little-endian size, payload, even padding.
fn push_chunk(out: &mut Vec<u8>, id: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
}

/// LIST wrapper: the list kind counts toward the declared size.
fn push_list(out: &mut Vec<u8>, kind: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(b"LIST");
    out.extend_from_slice(&((payload.len() + 4) as u32).to_le_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
}

fn push_indexed_chunk(movi: &mut Vec<u8>, index: &mut Vec<u8>, id: &[u8; 4], payload: &[u8]) {
    let offset = movi.len() as u32 + 4;
    index.extend_from_slice(id);
    index.extend_from_slice(&INDEX_KEYFRAME.to_le_bytes());
    index.extend_from_slice(&offset.to_le_bytes());
    index.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    push_chunk(movi, id, payload);
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AviConfig {
        AviConfig {
            width: 64,
            height: 48,
            fps: 30,
            audio_rate: 90,
        }
    }

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn find(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap_or_else(|| panic!("{:?} not found", String::from_utf8_lossy(needle)))
    }

    #[test]
    fn riff_header_and_declared_size_match() {
        let frames = vec![vec![0xFFu8; 10], vec![0xEEu8; 12]];
        let audio = vec![0i16; 100];
        let out = mux(&test_config(), &frames, &audio);

        assert_eq!(&out[..4], b"RIFF");
        assert_eq!(&out[8..12], b"AVI ");
        assert_eq!(read_u32(&out, 4) as usize, out.len() - 8);
    }

    #[test]
    fn streams_and_index_are_present() {
        let frames = vec![vec![1u8; 9]]; // odd payload exercises padding
        let audio = vec![0i16; 7];
        let out = mux(&test_config(), &frames, &audio);

        for marker in [&b"hdrl"[..], b"movi", b"idx1", b"avih", b"vids", b"MJPG", b"auds"] {
            find(&out, marker);
        }

        // One video chunk, one audio chunk, 16 bytes per index entry.
        let idx_at = find(&out, b"idx1");
        let idx_len = read_u32(&out, idx_at + 4) as usize;
        assert_eq!(idx_len, 2 * 16);

        // First index entry points at the first movi chunk (offset 4 from
        // the 'movi' fourcc).
        assert_eq!(&out[idx_at + 8..idx_at + 12], b"00dc");
        assert_eq!(read_u32(&out, idx_at + 16), 4);
        let movi_at = find(&out, b"movi");
        assert_eq!(&out[movi_at + 4..movi_at + 8], b"00dc");
    }

    #[test]
    fn audio_is_interleaved_per_frame() {
        // 90 Hz at 30 fps = 3 samples per frame; 10 samples over 3 frames
        // leaves the remainder on the last frame.
        let frames = vec![vec![0u8; 4]; 3];
        let audio: Vec<i16> = (0..10).collect();
        let out = mux(&test_config(), &frames, &audio);

        let idx_at = find(&out, b"idx1");
        let idx_len = read_u32(&out, idx_at + 4) as usize;
        assert_eq!(idx_len / 16, 6); // dc, wb, dc, wb, dc, wb

        // Sizes recorded in the index: 3, 3, then 4 samples (x2 bytes).
        let sizes: Vec<u32> = (0..6)
            .map(|i| read_u32(&out, idx_at + 8 + i * 16 + 12))
            .collect();
        assert_eq!(sizes, vec![4, 6, 4, 6, 4, 8]);
    }

    #[test]
    fn video_only_recording_still_muxes() {
        let frames = vec![vec![0xAAu8; 6]];
        let out = mux(&test_config(), &frames, &[]);
        assert_eq!(&out[..4], b"RIFF");
        let idx_at = find(&out, b"idx1");
        assert_eq!(read_u32(&out, idx_at + 4), 16);
    }

    #[test]
    fn header_frame_counts() {
        let frames = vec![vec![0u8; 2]; 5];
        let out = mux(&test_config(), &frames, &[0i16; 30]);
        let avih_at = find(&out, b"avih");
        // dwTotalFrames is the 5th dword of the header payload.
        assert_eq!(read_u32(&out, avih_at + 8 + 16), 5);
        // dwStreams
        assert_eq!(read_u32(&out, avih_at + 8 + 24), 2);
    }
}
