//! GStreamer camera capture

use super::platform::{self, PlatformInfo};
use super::{CaptureError, FrameSource};
use crate::config::CameraConfig;
use crate::frame::{Frame, RGB_CHANNELS};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use tracing::{debug, info};

/// Camera that pulls raw RGB frames synchronously from an `appsink`
pub struct CameraSource {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    platform: PlatformInfo,
    device: String,
    width: u32,
    height: u32,
}

impl CameraSource {
    /// Builds the capture pipeline for this platform and starts it
    pub fn open(config: &CameraConfig) -> Result<Self, CaptureError> {
        gst::init().map_err(|e| CaptureError::Gst(e.to_string()))?;

        let platform = platform::detect_platform();
        let pipeline_desc = platform::pipeline_description(
            platform,
            &config.device,
            config.width,
            config.height,
            config.fps,
        );

        info!(
            device = %config.device,
            platform = ?platform,
            resolution = %format!("{}x{}", config.width, config.height),
            "Opening camera"
        );
        debug!(pipeline = %pipeline_desc, "Creating GStreamer pipeline");

        let pipeline = gst::parse::launch(&pipeline_desc)
            .map_err(|e| CaptureError::Gst(e.to_string()))?
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| CaptureError::Pipeline("Not a pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CaptureError::Pipeline("No appsink found".to_string()))?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| CaptureError::Pipeline("Not an appsink".to_string()))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| CaptureError::StateChange(format!("{:?}", e)))?;

        Ok(Self {
            pipeline,
            appsink,
            platform,
            device: config.device.clone(),
            width: config.width,
            height: config.height,
        })
    }

    /// Copies a mapped buffer into a packed RGB frame, dropping row padding
    ///
    /// GStreamer aligns RGB rows to 4 bytes, so widths whose `width * 3` is
    /// not a multiple of 4 arrive with trailing bytes on every row.
    fn unpack(&self, data: &[u8]) -> Result<Vec<u8>, CaptureError> {
        let row = self.width as usize * RGB_CHANNELS;
        let stride = (row + 3) & !3;
        let rows = self.height as usize;

        if data.len() == row * rows {
            return Ok(data.to_vec());
        }

        if data.len() < stride * (rows.saturating_sub(1)) + row {
            return Err(CaptureError::MalformedFrame {
                expected: stride * rows,
                actual: data.len(),
            });
        }

        let mut pixels = Vec::with_capacity(row * rows);
        for y in 0..rows {
            let start = y * stride;
            pixels.extend_from_slice(&data[start..start + row]);
        }
        Ok(pixels)
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let sample = self.appsink.pull_sample().map_err(|_| {
            if self.appsink.is_eos() {
                CaptureError::EndOfStream
            } else {
                CaptureError::Device("failed to pull sample from appsink".to_string())
            }
        })?;

        let buffer = sample
            .buffer()
            .ok_or_else(|| CaptureError::Device("sample had no buffer".to_string()))?;
        let map = buffer
            .map_readable()
            .map_err(|_| CaptureError::Device("unable to map buffer".to_string()))?;

        let pixels = self.unpack(map.as_slice())?;
        Ok(Frame::new(self.width, self.height, pixels))
    }

    fn describe(&self) -> String {
        format!("camera {} ({})", self.device, source_name(self.platform))
    }
}

/// GStreamer element that reads the camera on `platform`
fn source_name(platform: PlatformInfo) -> &'static str {
    match platform {
        PlatformInfo::MacOS => "avfvideosrc",
        PlatformInfo::RaspberryPi => "libcamerasrc",
        PlatformInfo::Linux => "v4l2src",
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
