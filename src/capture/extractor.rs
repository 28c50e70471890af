use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

/// JPEG start-of-image marker, matched as a raw byte pair.
const SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker.
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Bytes held while waiting for a frame to complete. A stream that never
/// produces markers would otherwise grow the buffer without bound.
const MAX_PENDING_BYTES: usize = 8 * 1024 * 1024;

/// Turns the raw bytes of one marker-delimited frame into a decoded image.
pub trait FrameDecoder {
    type Frame;

    /// Returns `None` when the bytes do not form a decodable image.
    fn decode(&self, raw: &[u8]) -> Option<Self::Frame>;
}

/// Production decoder backed by the jpeg support of the `image` crate.
pub struct JpegDecoder;

impl FrameDecoder for JpegDecoder {
    type Frame = image::DynamicImage;

    fn decode(&self, raw: &[u8]) -> Option<image::DynamicImage> {
        match image::load_from_memory_with_format(raw, image::ImageFormat::Jpeg) {
            Ok(image) => Some(image),
            Err(e) => {
                debug!("Skipping undecodable frame ({} bytes): {}", raw.len(), e);
                None
            }
        }
    }
}

/// Pulls marker-delimited JPEG frames out of a byte-chunk stream, up to a
/// fixed count.
pub struct FrameExtractor<D> {
    decoder: D,
    limit: usize,
    buffer: Vec<u8>,
}

impl<D: FrameDecoder> FrameExtractor<D> {
    pub fn new(decoder: D, limit: usize) -> Self {
        FrameExtractor {
            decoder,
            limit,
            buffer: Vec::new(),
        }
    }

    /// Drains the stream until `limit` frames have decoded or it ends.
    ///
    /// The stream ending early yields whatever frames were captured; a
    /// transport error is logged and treated the same way. A trailing frame
    /// without its end marker is dropped undecoded. Frames that fail to
    /// decode are skipped and do not count toward the limit.
    pub async fn collect<S, E>(mut self, mut chunks: S) -> Vec<D::Frame>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let mut frames = Vec::new();
        while frames.len() < self.limit {
            match chunks.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.extend_from_slice(&chunk);
                    // A single chunk can carry several frames. Drain them all
                    // before pulling more bytes.
                    while frames.len() < self.limit {
                        match self.next_complete_frame() {
                            Some(raw) => {
                                if let Some(frame) = self.decoder.decode(&raw) {
                                    frames.push(frame);
                                }
                            }
                            None => break,
                        }
                    }
                    self.enforce_pending_cap();
                }
                Some(Err(e)) => {
                    warn!("Stream read failed, ending capture: {}", e);
                    break;
                }
                None => break,
            }
        }
        frames
    }

    /// Slices out `[SOI ..= EOI]` and drains everything up to the end
    /// marker, leading garbage included.
    fn next_complete_frame(&mut self) -> Option<Vec<u8>> {
        let start = find_marker(&self.buffer, SOI)?;
        let end = start + 2 + find_marker(&self.buffer[start + 2..], EOI)?;
        let raw = self.buffer[start..end + 2].to_vec();
        self.buffer.drain(..end + 2);
        Some(raw)
    }

    fn enforce_pending_cap(&mut self) {
        if self.buffer.len() > MAX_PENDING_BYTES {
            warn!(
                "Discarding {} buffered bytes without a complete frame",
                self.buffer.len()
            );
            // Keep the last two bytes so a split marker pair survives.
            let drain_len = self.buffer.len() - 2;
            self.buffer.drain(..drain_len);
        }
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use futures::StreamExt;

    use super::{FrameDecoder, FrameExtractor, JpegDecoder};

    /// Accepts any payload, returning the bytes between the markers as text.
    struct TextDecoder;

    impl FrameDecoder for TextDecoder {
        type Frame = String;

        fn decode(&self, raw: &[u8]) -> Option<String> {
            String::from_utf8(raw[2..raw.len() - 2].to_vec()).ok()
        }
    }

    /// Rejects payloads starting with `X`.
    struct PickyDecoder;

    impl FrameDecoder for PickyDecoder {
        type Frame = String;

        fn decode(&self, raw: &[u8]) -> Option<String> {
            let payload = String::from_utf8(raw[2..raw.len() - 2].to_vec()).ok()?;
            if payload.starts_with('X') {
                None
            } else {
                Some(payload)
            }
        }
    }

    fn chunks(
        parts: &[&'static [u8]],
    ) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<Result<Bytes, std::io::Error>>>(),
        )
    }

    #[tokio::test]
    async fn test_one_frame_per_chunk() {
        let frames = FrameExtractor::new(TextDecoder, 8)
            .collect(chunks(&[b"\xff\xd8AA\xff\xd9", b"\xff\xd8BB\xff\xd9"]))
            .await;
        insta::assert_yaml_snapshot!(frames, @r###"
        ---
        - AA
        - BB
        "###);
    }

    #[tokio::test]
    async fn test_marker_pair_split_across_chunks() {
        let frames = FrameExtractor::new(TextDecoder, 8)
            .collect(chunks(&[b"\xff", b"\xd8AA\xff", b"\xd9"]))
            .await;
        assert_eq!(frames, vec!["AA".to_string()]);
    }

    #[tokio::test]
    async fn test_leading_garbage_discarded() {
        let frames = FrameExtractor::new(TextDecoder, 8)
            .collect(chunks(&[b"boundary noise\xff\xd8AA\xff\xd9"]))
            .await;
        assert_eq!(frames, vec!["AA".to_string()]);
    }

    #[tokio::test]
    async fn test_truncated_trailing_frame_dropped() {
        let frames = FrameExtractor::new(TextDecoder, 8)
            .collect(chunks(&[b"\xff\xd8AA\xff\xd9\xff\xd8BB"]))
            .await;
        assert_eq!(frames, vec!["AA".to_string()]);
    }

    #[tokio::test]
    async fn test_markerless_stream_yields_nothing() {
        let frames = FrameExtractor::new(TextDecoder, 8)
            .collect(chunks(&[b"no markers in here"]))
            .await;
        assert!(frames.is_empty());

        let frames = FrameExtractor::new(TextDecoder, 8).collect(chunks(&[])).await;
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_cap_applies_within_one_chunk() {
        let mut body = Vec::new();
        for i in 0..9 {
            body.extend_from_slice(b"\xff\xd8");
            body.extend_from_slice(format!("F{}", i).as_bytes());
            body.extend_from_slice(b"\xff\xd9");
        }
        let stream =
            futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(body))]);

        let frames = FrameExtractor::new(TextDecoder, 8).collect(stream).await;
        let expected: Vec<String> = (0..8).map(|i| format!("F{}", i)).collect();
        assert_eq!(frames, expected);
    }

    #[tokio::test]
    async fn test_undecodable_frames_not_counted() {
        let frames = FrameExtractor::new(PickyDecoder, 1)
            .collect(chunks(&[b"\xff\xd8XX\xff\xd9\xff\xd8AA\xff\xd9"]))
            .await;
        assert_eq!(frames, vec!["AA".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_error_ends_capture() {
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"\xff\xd8AA\xff\xd9")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )),
        ];
        let frames = FrameExtractor::new(TextDecoder, 8)
            .collect(futures::stream::iter(items))
            .await;
        assert_eq!(frames, vec!["AA".to_string()]);
    }

    #[tokio::test]
    async fn test_no_chunks_pulled_past_limit() {
        // A stream that never ends: reaching the limit must stop the pull,
        // not the stream.
        let stream = chunks(&[b"\xff\xd8AA\xff\xd9"]).chain(futures::stream::pending());
        let frames = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            FrameExtractor::new(TextDecoder, 1).collect(stream),
        )
        .await
        .expect("extractor kept waiting for chunks past its limit");
        assert_eq!(frames, vec!["AA".to_string()]);
    }

    #[test]
    fn test_jpeg_decoder_round_trip() {
        let img = image::RgbImage::from_pixel(1, 1, image::Rgb([200, 100, 50]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, image::ImageFormat::Jpeg)
            .unwrap();

        assert!(JpegDecoder.decode(&cursor.into_inner()).is_some());
    }

    #[test]
    fn test_jpeg_decoder_rejects_garbage() {
        assert!(JpegDecoder.decode(b"\xff\xd8not an image\xff\xd9").is_none());
    }
}
