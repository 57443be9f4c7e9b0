//! Shared test helpers.
//!
//! Synthetic videos are generated on the fly with FFmpeg's MPEG-4 Part 2
//! encoder so sampler tests do not depend on checked-in fixtures. Builds of
//! FFmpeg without that encoder make [`write_test_video`] return an error, and
//! the calling test skips.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ffmpeg_next::codec::Id;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::format::{Flags as FormatFlags, Pixel};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Packet, Rational};
use image::{DynamicImage, Rgb, RgbImage};
use secondsight::{EncodedFrame, InferenceClient, InferenceError, InferenceReply, SampledFrame};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

/// Write `frame_count` frames at `fps` to `path` (container from extension).
///
/// Each frame is a flat colour derived from its index.
pub fn write_test_video(path: &Path, fps: i32, frame_count: usize) -> Result<(), String> {
    ffmpeg_next::init().map_err(|e| format!("init: {e}"))?;

    let mut output = ffmpeg_next::format::output(path).map_err(|e| format!("output: {e}"))?;
    let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

    let codec = ffmpeg_next::encoder::find(Id::MPEG4).ok_or("codec MPEG4 not available")?;
    let time_base = Rational::new(1, fps);

    let (stream_index, mut encoder) = {
        let mut stream = output.add_stream(codec).map_err(|e| format!("stream: {e}"))?;
        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.encoder().video())
            .map_err(|e| format!("codec context: {e}"))?;

        encoder.set_width(WIDTH);
        encoder.set_height(HEIGHT);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(Rational::new(fps, 1)));
        encoder.set_bit_rate(400_000);
        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let encoder = encoder
            .open_as(codec)
            .map_err(|e| format!("cannot open encoder: {e}"))?;
        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);
        (stream.index(), encoder)
    };

    output.write_header().map_err(|e| format!("header: {e}"))?;
    let stream_time_base = output
        .stream(stream_index)
        .map(|stream| stream.time_base())
        .ok_or("stream vanished")?;

    let mut scaler = ScalingContext::get(
        Pixel::RGB24,
        WIDTH,
        HEIGHT,
        Pixel::YUV420P,
        WIDTH,
        HEIGHT,
        ScalingFlags::BILINEAR,
    )
    .map_err(|e| format!("scaler: {e}"))?;

    for index in 0..frame_count {
        let mut source = VideoFrame::new(Pixel::RGB24, WIDTH, HEIGHT);
        let stride = source.stride(0);
        let shade = ((index * 37) % 256) as u8;
        let data = source.data_mut(0);
        for row in 0..HEIGHT as usize {
            for column in 0..WIDTH as usize {
                let offset = row * stride + column * 3;
                data[offset] = shade;
                data[offset + 1] = 255 - shade;
                data[offset + 2] = (column * 4) as u8;
            }
        }

        let mut converted = VideoFrame::empty();
        scaler
            .run(&source, &mut converted)
            .map_err(|e| format!("scale: {e}"))?;
        converted.set_pts(Some(index as i64));

        encoder
            .send_frame(&converted)
            .map_err(|e| format!("send_frame: {e}"))?;
        drain_packets(&mut encoder, &mut output, stream_index, time_base, stream_time_base)?;
    }

    encoder.send_eof().map_err(|e| format!("send_eof: {e}"))?;
    drain_packets(&mut encoder, &mut output, stream_index, time_base, stream_time_base)?;
    output.write_trailer().map_err(|e| format!("trailer: {e}"))?;
    Ok(())
}

fn drain_packets(
    encoder: &mut ffmpeg_next::encoder::video::Encoder,
    output: &mut ffmpeg_next::format::context::Output,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
) -> Result<(), String> {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(stream_index);
        packet.rescale_ts(encoder_time_base, stream_time_base);
        packet
            .write_interleaved(output)
            .map_err(|e| format!("write packet: {e}"))?;
    }
    Ok(())
}

/// Generate a video or explain why the test should skip.
pub fn video_or_skip(path: &Path, fps: i32, frame_count: usize) -> bool {
    match write_test_video(path, fps, frame_count) {
        Ok(()) => true,
        Err(reason) => {
            eprintln!("Skipping: cannot generate test video ({reason})");
            false
        }
    }
}

/// A small solid-colour frame.
pub fn solid_frame(second: u64, colour: [u8; 3]) -> SampledFrame {
    let image = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb(colour));
    SampledFrame {
        second,
        image: DynamicImage::ImageRgb8(image),
    }
}

/// Encoded frames for seconds `0..count`. Stub clients ignore the bytes.
pub fn fake_encoded(count: u64) -> Vec<EncodedFrame> {
    (0..count)
        .map(|second| EncodedFrame {
            second,
            bytes: vec![0xFF, 0xD8, second as u8, 0xFF, 0xD9],
            width: WIDTH,
            height: HEIGHT,
        })
        .collect()
}

/// Reply text for a well-formed record.
pub fn reply_for(second: u64, action: &str) -> String {
    format!(
        r#"{{"second": {second}, "overall_action": "{action}", "sub_action": "", "description": "frame {second}"}}"#
    )
}

/// What a [`StubClient`] does for a given second.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Reply(String),
    Fail,
    Panic,
}

/// Scripted inference client.
///
/// Each call sleeps for the second's delay (10 ms by default), tracks the
/// number of calls in flight, and answers according to the script.
pub struct StubClient {
    script: Box<dyn Fn(u64) -> Behaviour + Send + Sync>,
    delay: Box<dyn Fn(u64) -> Duration + Send + Sync>,
    in_flight: std::sync::atomic::AtomicUsize,
    pub max_in_flight: std::sync::atomic::AtomicUsize,
    pub prompts: Mutex<Vec<(u64, String)>>,
    pub uploads: Mutex<Vec<EncodedFrame>>,
}

impl StubClient {
    pub fn new(script: impl Fn(u64) -> Behaviour + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: Box::new(|_| Duration::from_millis(10)),
            in_flight: Default::default(),
            max_in_flight: Default::default(),
            prompts: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: impl Fn(u64) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    /// Every second answers with a valid `leisure` record.
    pub fn always_ok() -> Self {
        Self::new(|second| Behaviour::Reply(reply_for(second, "leisure")))
    }
}

#[async_trait]
impl InferenceClient for StubClient {
    async fn analyze(
        &self,
        frame: &EncodedFrame,
        prompt: &str,
    ) -> Result<InferenceReply, InferenceError> {
        use std::sync::atomic::Ordering;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((frame.second, prompt.to_string()));
        self.uploads.lock().unwrap().push(frame.clone());

        tokio::time::sleep((self.delay)(frame.second)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match (self.script)(frame.second) {
            Behaviour::Reply(text) => Ok(InferenceReply {
                text,
                tokens_used: Some(100),
            }),
            Behaviour::Fail => Err(InferenceError::Status {
                status: 500,
                body: "upstream exploded".to_string(),
            }),
            Behaviour::Panic => panic!("stub panic for second {}", frame.second),
        }
    }
}
